//! The three disjoint parts of the dataset.

use serde::{Deserialize, Serialize};

use crate::Error;

/// One of the three disjoint parts of the dataset.
///
/// Each partition has a fixed, known sample count and is sharded
/// independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// The training partition.
    Train,
    /// The validation partition.
    Validation,
    /// The held-out test partition.
    Test,
}

impl Partition {
    /// All partitions, in their conventional order.
    pub const ALL: [Self; 3] = [Self::Train, Self::Validation, Self::Test];

    /// The name used in shard file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "validation",
            Self::Test => "test",
        }
    }

    /// Parses a partition from its name.
    ///
    /// # Errors
    ///
    /// * If `name` is not one of `train`, `validation` or `test`.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "train" => Ok(Self::Train),
            "validation" => Ok(Self::Validation),
            "test" => Ok(Self::Test),
            _ => Err(Error::UnknownPartition(name.to_string())),
        }
    }
}

impl core::fmt::Display for Partition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::Partition;

    #[test]
    fn names_round_trip() -> Result<(), crate::Error> {
        for partition in Partition::ALL {
            assert_eq!(Partition::from_name(partition.name())?, partition);
        }
        Ok(())
    }

    #[test]
    fn unknown_name() {
        let err = Partition::from_name("eval");
        assert!(matches!(err, Err(crate::Error::UnknownPartition(_))));
    }
}
