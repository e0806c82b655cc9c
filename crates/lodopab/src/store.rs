//! Read-only access to the shard files on disk.
//!
//! Each shard is an HDF5 file holding a single 3-d dataset named `data`,
//! with samples along the leading axis. Files are opened and closed within
//! the scope of a single read; no handles persist across calls.

use std::path::{Path, PathBuf};

use ndarray::{s, Array3};

use crate::{locate::ShardSlice, Error, Layout, Partition};

/// The name of the array dataset inside each shard file.
const DATA_NAME: &str = "data";

/// The two paired fields stored for every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The low-dose measurement (sinogram).
    Observation,
    /// The reference reconstruction the measurement was simulated from.
    GroundTruth,
}

impl Field {
    /// The prefix used in shard file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Observation => "observation",
            Self::GroundTruth => "ground_truth",
        }
    }

    /// The trailing shape of one sample of this field under `layout`.
    #[must_use]
    pub const fn shape(self, layout: &Layout) -> (usize, usize) {
        match self {
            Self::Observation => layout.observation_shape,
            Self::GroundTruth => layout.ground_truth_shape,
        }
    }
}

/// Read-only access to the two parallel collections of shard files.
#[derive(Debug, Clone)]
pub struct ShardStore {
    /// The storage root holding all shard files.
    root: PathBuf,
    /// The shard layout.
    layout: Layout,
}

impl ShardStore {
    /// Creates a store over the given root.
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P, layout: Layout) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            layout,
        }
    }

    /// The shard layout.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The path of one shard file: `{field}_{partition}_{shard:03}.hdf5`.
    #[must_use]
    pub fn shard_path(&self, field: Field, partition: Partition, shard: usize) -> PathBuf {
        self.root
            .join(format!("{}_{}_{shard:03}.hdf5", field.name(), partition.name()))
    }

    /// Reads the rows selected by `slice` from one shard.
    ///
    /// Only the selected hyperslab is read; the rest of the shard is never
    /// materialized. The file is closed when this call returns, on every
    /// exit path.
    ///
    /// # Returns
    ///
    /// An array of shape `(slice.dst.len(), rows, cols)` for the field's
    /// trailing shape.
    ///
    /// # Errors
    ///
    /// * [`Error::DataNotFound`] if the shard file is absent.
    /// * [`Error::Hdf5`] if the file cannot be read.
    pub fn read(&self, field: Field, partition: Partition, slice: &ShardSlice) -> Result<Array3<f32>, Error> {
        let path = self.shard_path(field, partition, slice.shard);
        if !path.exists() {
            return Err(Error::DataNotFound { path });
        }
        let file = hdf5::File::open(&path)?;
        let data = file.dataset(DATA_NAME)?;
        let chunk = data.read_slice::<f32, _, ndarray::Ix3>(s![slice.start..slice.stop;slice.step, .., ..])?;
        Ok(chunk)
    }

    /// Reads every row of one shard.
    ///
    /// # Errors
    ///
    /// * [`Error::DataNotFound`] if the shard file is absent.
    /// * [`Error::Hdf5`] if the file cannot be read.
    pub fn read_full_shard(&self, field: Field, partition: Partition, shard: usize) -> Result<Array3<f32>, Error> {
        let rows = self.layout.rows_in_shard(partition, shard);
        let slice = ShardSlice {
            shard,
            start: 0,
            stop: rows,
            step: 1,
            dst: 0..rows,
        };
        self.read(field, partition, &slice)
    }

    /// Fast check whether the dataset appears present: the first and last
    /// expected observation shard file of every partition must exist.
    ///
    /// # Errors
    ///
    /// * [`Error::DataNotFound`] naming the first missing file.
    pub fn check_presence(&self) -> Result<(), Error> {
        for partition in Partition::ALL {
            let num_shards = self.layout.num_shards(partition);
            // A zero-length partition has no shard files to check.
            let Some(last_shard) = num_shards.checked_sub(1) else {
                continue;
            };
            for shard in [0, last_shard] {
                let path = self.shard_path(Field::Observation, partition, shard);
                if !path.exists() {
                    return Err(Error::DataNotFound { path });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, ShardStore};
    use crate::{Layout, Partition};

    #[test]
    fn empty_partitions_have_no_presence_requirements() {
        // `Layout` fields are public, so zero-length partitions are
        // constructible; they must not trip the presence check.
        let layout = Layout {
            train_len: 0,
            validation_len: 0,
            test_len: 0,
            ..Layout::lodopab()
        };
        let store = ShardStore::new("/nonexistent", layout);
        assert!(store.check_presence().is_ok());
    }

    #[test]
    fn shard_file_names() {
        let store = ShardStore::new("/data/lodopab", Layout::lodopab());
        assert_eq!(
            store.shard_path(Field::Observation, Partition::Train, 0),
            std::path::Path::new("/data/lodopab/observation_train_000.hdf5")
        );
        assert_eq!(
            store.shard_path(Field::GroundTruth, Partition::Validation, 27),
            std::path::Path::new("/data/lodopab/ground_truth_validation_027.hdf5")
        );
        assert_eq!(
            store.shard_path(Field::Observation, Partition::Test, 7),
            std::path::Path::new("/data/lodopab/observation_test_007.hdf5")
        );
    }
}
