#![deny(clippy::correctness)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::nursery,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::cast_lossless
)]
#![doc = include_str!("../README.md")]

pub mod constants;
pub mod eval;

mod config;
mod dataset;
mod error;
mod locate;
mod partition;
mod store;
mod train;
mod transform;

pub use config::{Layout, LodopabConfig, ObservationModel};
pub use dataset::{LodopabDataset, Out, PairIter};
pub use error::Error;
pub use locate::{locate, plan_range, strided_len, RangeSpec, ShardSlice};
pub use partition::Partition;
pub use store::{Field, ShardStore};
pub use train::{PartitionView, TrainingDataset};
pub use transform::ObservationTransform;

/// The current version of the crate.
pub const VERSION: &str = "0.1.0";
