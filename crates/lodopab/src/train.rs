//! Length-and-index access for training-loop integration.
//!
//! Tensor frameworks only need `len` and `item-at-index` semantics over one
//! partition. [`PartitionView`] provides exactly that, allocating fresh
//! arrays per item so a loader can move them into whatever tensor type it
//! batches with.

use ndarray::{Array2, Ix2};

use crate::{dataset::Out, Error, LodopabDataset, Partition};

/// An indexed collection of training pairs.
pub trait TrainingDataset {
    /// The number of samples.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieves the `(observation, ground_truth)` pair at `index`.
    ///
    /// # Errors
    ///
    /// * If the index is out of bounds or the underlying data is missing.
    fn get(&self, index: usize) -> Result<(Array2<f32>, Array2<f32>), Error>;
}

/// One partition of a [`LodopabDataset`], exposed as a training dataset.
pub struct PartitionView<'a> {
    /// The dataset read from.
    dataset: &'a LodopabDataset,
    /// The partition this view covers.
    partition: Partition,
}

impl<'a> PartitionView<'a> {
    /// Creates a view over one partition.
    #[must_use]
    pub const fn new(dataset: &'a LodopabDataset, partition: Partition) -> Self {
        Self { dataset, partition }
    }

    /// The partition this view covers.
    #[must_use]
    pub const fn partition(&self) -> Partition {
        self.partition
    }
}

impl TrainingDataset for PartitionView<'_> {
    fn len(&self) -> usize {
        self.dataset.len(self.partition)
    }

    fn get(&self, index: usize) -> Result<(Array2<f32>, Array2<f32>), Error> {
        let index = isize::try_from(index).unwrap_or(isize::MAX);
        let (observation, ground_truth) =
            self.dataset
                .get_sample(index, self.partition, (Out::<Ix2>::Allocate, Out::<Ix2>::Allocate))?;
        match (observation, ground_truth) {
            (Some(observation), Some(ground_truth)) => Ok((observation, ground_truth)),
            // `Out::Allocate` always yields both fields.
            _ => unreachable!("get_sample with Allocate must return both fields"),
        }
    }
}
