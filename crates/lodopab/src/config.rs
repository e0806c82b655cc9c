//! Construction-time configuration for the dataset accessor.
//!
//! All configuration is an explicit value passed to
//! [`LodopabDataset::new`](crate::LodopabDataset::new). There is no global
//! mutable storage-root path; any interactive reconfiguration belongs to
//! whatever acquires the dataset, not to this crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{constants, Error, Partition};

/// The two representations in which observations can be returned.
///
/// They differ by an exponential (Beer-Lambert) relationship; see
/// [`ObservationTransform`](crate::ObservationTransform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationModel {
    /// Observations are linearly related to the normalized ground truth via
    /// the ray transform. This is the domain in which the data is stored.
    #[serde(rename = "post-log")]
    PostLog,
    /// Observations are non-linearly related to the ground truth, as given
    /// by the Beer-Lambert law.
    #[serde(rename = "pre-log")]
    PreLog,
}

impl ObservationModel {
    /// Parses an observation model from its selector string.
    ///
    /// # Errors
    ///
    /// * If `name` is neither `post-log` nor `pre-log`.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "post-log" => Ok(Self::PostLog),
            "pre-log" => Ok(Self::PreLog),
            _ => Err(Error::UnknownObservationModel(name.to_string())),
        }
    }

    /// Whether this is the post-log (stored) domain.
    #[must_use]
    pub const fn is_post_log(self) -> bool {
        matches!(self, Self::PostLog)
    }
}

/// The physical layout of the sharded dataset.
///
/// The defaults describe LoDoPaB-CT. Tests substitute small layouts so that
/// fixtures stay tiny; the arithmetic is identical at every scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Samples per shard file along the leading axis.
    pub num_samples_per_file: usize,
    /// Trailing shape of one observation.
    pub observation_shape: (usize, usize),
    /// Trailing shape of one ground truth image.
    pub ground_truth_shape: (usize, usize),
    /// Sample count of the training partition.
    pub train_len: usize,
    /// Sample count of the validation partition.
    pub validation_len: usize,
    /// Sample count of the test partition.
    pub test_len: usize,
}

impl Layout {
    /// The layout of the published LoDoPaB-CT dataset.
    #[must_use]
    pub const fn lodopab() -> Self {
        Self {
            num_samples_per_file: constants::NUM_SAMPLES_PER_FILE,
            observation_shape: constants::OBSERVATION_SHAPE,
            ground_truth_shape: constants::GROUND_TRUTH_SHAPE,
            train_len: constants::TRAIN_LEN,
            validation_len: constants::VALIDATION_LEN,
            test_len: constants::TEST_LEN,
        }
    }

    /// The number of samples in the given partition.
    #[must_use]
    pub const fn len(&self, partition: Partition) -> usize {
        match partition {
            Partition::Train => self.train_len,
            Partition::Validation => self.validation_len,
            Partition::Test => self.test_len,
        }
    }

    /// The number of shard files holding the given partition.
    #[must_use]
    pub const fn num_shards(&self, partition: Partition) -> usize {
        self.len(partition).div_ceil(self.num_samples_per_file)
    }

    /// The number of rows stored in the given shard.
    ///
    /// All shards hold `num_samples_per_file` rows except possibly the last
    /// one, which holds the residual.
    #[must_use]
    pub const fn rows_in_shard(&self, partition: Partition, shard: usize) -> usize {
        let remaining = self.len(partition) - shard * self.num_samples_per_file;
        if remaining < self.num_samples_per_file {
            remaining
        } else {
            self.num_samples_per_file
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::lodopab()
    }
}

/// Configuration for [`LodopabDataset`](crate::LodopabDataset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LodopabConfig {
    /// The storage root holding the shard files.
    pub data_path: PathBuf,
    /// The observation model to return observations in.
    pub observation_model: ObservationModel,
    /// Replacement value for a simulated photon count of zero.
    ///
    /// `None` keeps the floor the dataset was simulated with. Values greater
    /// than one are clamped to one at construction time, with a warning.
    pub min_photon_count: Option<f32>,
    /// The shard layout.
    #[serde(default)]
    pub layout: Layout,
}

impl LodopabConfig {
    /// Creates a configuration with the default observation model
    /// (`post-log`), the original noise floor, and the LoDoPaB layout.
    #[must_use]
    pub fn new<P: AsRef<Path>>(data_path: P) -> Self {
        Self {
            data_path: data_path.as_ref().to_path_buf(),
            observation_model: ObservationModel::PostLog,
            min_photon_count: None,
            layout: Layout::lodopab(),
        }
    }

    /// Sets the observation model from its selector string.
    ///
    /// # Errors
    ///
    /// * If `name` is neither `post-log` nor `pre-log`.
    pub fn with_observation_model(mut self, name: &str) -> Result<Self, Error> {
        self.observation_model = ObservationModel::from_name(name)?;
        Ok(self)
    }

    /// Sets the noise-floor replacement value.
    #[must_use]
    pub const fn with_min_photon_count(mut self, min_photon_count: f32) -> Self {
        self.min_photon_count = Some(min_photon_count);
        self
    }

    /// Sets the shard layout.
    #[must_use]
    pub const fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read.
    /// * If the contents are not a valid configuration.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes the configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// * If the configuration cannot be serialized or the file written.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let contents = serde_json::to_string_pretty(self)?;
        Ok(std::fs::write(path, contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{Layout, LodopabConfig, ObservationModel};
    use crate::Partition;

    #[test]
    fn model_names() -> Result<(), crate::Error> {
        assert_eq!(ObservationModel::from_name("post-log")?, ObservationModel::PostLog);
        assert_eq!(ObservationModel::from_name("pre-log")?, ObservationModel::PreLog);
        assert!(matches!(
            ObservationModel::from_name("log"),
            Err(crate::Error::UnknownObservationModel(_))
        ));
        Ok(())
    }

    #[test]
    fn lodopab_shard_counts() {
        let layout = Layout::lodopab();
        // 35820 = 279 * 128 + 108
        assert_eq!(layout.num_shards(Partition::Train), 280);
        assert_eq!(layout.rows_in_shard(Partition::Train, 0), 128);
        assert_eq!(layout.rows_in_shard(Partition::Train, 279), 108);
        // 3522 = 27 * 128 + 66
        assert_eq!(layout.num_shards(Partition::Validation), 28);
        assert_eq!(layout.rows_in_shard(Partition::Validation, 27), 66);
        // 3553 = 27 * 128 + 97
        assert_eq!(layout.num_shards(Partition::Test), 28);
        assert_eq!(layout.rows_in_shard(Partition::Test, 27), 97);
    }

    #[test]
    fn json_round_trip() -> Result<(), crate::Error> {
        let tmp_dir = tempdir::TempDir::new("lodopab-config")?;
        let path = tmp_dir.path().join("config.json");

        let config = LodopabConfig::new("/data/lodopab")
            .with_observation_model("pre-log")?
            .with_min_photon_count(0.5);
        config.to_json_file(&path)?;

        let other = LodopabConfig::from_json_file(&path)?;
        assert_eq!(other.data_path, config.data_path);
        assert_eq!(other.observation_model, ObservationModel::PreLog);
        assert_eq!(other.min_photon_count, Some(0.5));
        assert_eq!(other.layout, Layout::lodopab());

        Ok(())
    }
}
