//! Error types for dataset access.
//!
//! The variants keep index errors, configuration errors and
//! data-availability errors distinct: an out-of-bounds index is a caller
//! bug, while a missing shard file may be recoverable by re-acquiring the
//! dataset. Nothing in this crate retries.

use crate::Partition;

/// Errors produced by the sharded dataset layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A logical sample index fell outside `[-len, len)`.
    #[error("index {index} out of bounds for part '{partition}' ({len})")]
    IndexOutOfBounds {
        /// The offending index, before normalization.
        index: isize,
        /// The partition that was addressed.
        partition: Partition,
        /// The length of that partition.
        len: usize,
    },

    /// The last index of a range query fell outside the partition.
    #[error("range {start}..{stop} (step {step}) out of bounds for part '{partition}' ({len})")]
    RangeOutOfBounds {
        /// Normalized range start.
        start: usize,
        /// Normalized range stop (exclusive).
        stop: usize,
        /// Range step.
        step: isize,
        /// The partition that was addressed.
        partition: Partition,
        /// The length of that partition.
        len: usize,
    },

    /// A range query used a step for which no decomposition is defined.
    #[error("step {step} is not supported, only positive steps are implemented")]
    UnsupportedStep {
        /// The offending step.
        step: isize,
    },

    /// The observation model selector was neither `post-log` nor `pre-log`.
    #[error("`observation_model` must be 'post-log' or 'pre-log', not '{0}'")]
    UnknownObservationModel(String),

    /// A partition name was not one of `train`, `validation` or `test`.
    #[error("unknown partition name '{0}'")]
    UnknownPartition(String),

    /// A measure short-name had no registered measure.
    #[error("unknown measure name '{0}'")]
    UnknownMeasure(String),

    /// A measure was applied to a result slot without a stored reconstruction.
    #[error("no reconstruction was saved for task {index}")]
    MissingReconstruction {
        /// The task index in the result table.
        index: usize,
    },

    /// An expected shard file is absent from the storage root.
    ///
    /// This is distinct from an index error: the index was valid, but the
    /// data is not (or no longer) present. Fetch the archives from Zenodo
    /// record `3384092` and unpack them into the configured data path.
    #[error("expected shard file {path:?} is missing; the dataset may need to be (re-)acquired")]
    DataNotFound {
        /// The path of the missing shard file.
        path: std::path::PathBuf,
    },

    /// A caller-supplied output buffer had the wrong shape.
    #[error("output buffer has shape {found:?}, expected {expected:?}")]
    Shape {
        /// The shape the operation required.
        expected: Vec<usize>,
        /// The shape the caller supplied.
        found: Vec<usize>,
    },

    /// An HDF5 operation failed for a reason other than a missing file.
    #[error("hdf5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// An I/O operation outside HDF5 failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration (de)serialization failed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
