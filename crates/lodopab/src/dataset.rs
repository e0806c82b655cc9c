//! The dataset accessor: random access to paired samples across shards.

use ndarray::{Array2, Array3, ArrayViewMut, Axis, Dimension, Ix2, Ix3};

use crate::{
    locate::{self, RangeSpec, ShardSlice},
    store::{Field, ShardStore},
    Error, Layout, LodopabConfig, ObservationTransform, Partition,
};

/// Per-field output policy for [`LodopabDataset::get_sample`] and
/// [`LodopabDataset::get_range`].
///
/// Makes the side effects of each call site explicit: either the call
/// allocates and returns a fresh array, writes into a caller-supplied
/// buffer (and returns `None` for that field, since the caller already
/// holds the data), or skips the field entirely (no read is issued).
pub enum Out<'a, D: Dimension> {
    /// Allocate a new array and return it.
    Allocate,
    /// Write into the given buffer; the result slot for this field is
    /// `None`.
    WriteInto(ArrayViewMut<'a, f32, D>),
    /// Do not retrieve this field; no shard file is touched for it.
    Skip,
}

/// Random access to pairs of low-dose observations and ground truth images.
///
/// Constructed once per configuration; all state is read-only afterwards,
/// so independent reads may be issued from parallel threads. Every read
/// opens, reads and closes the shard files it touches; nothing is cached.
#[derive(Debug)]
pub struct LodopabDataset {
    /// Shard file access.
    store: ShardStore,
    /// The transform applied to retrieved observations.
    transform: ObservationTransform,
    /// The configuration the dataset was constructed with, after
    /// validation.
    config: LodopabConfig,
}

impl LodopabDataset {
    /// Opens the dataset under the configured storage root.
    ///
    /// A `min_photon_count` greater than one is clamped to one, with a
    /// warning. The presence check requires the first and last observation
    /// shard file of every partition to exist.
    ///
    /// # Errors
    ///
    /// * [`Error::DataNotFound`] if the dataset does not appear to be
    ///   present under the configured path.
    pub fn new(mut config: LodopabConfig) -> Result<Self, Error> {
        if let Some(count) = config.min_photon_count {
            if count > 1.0 {
                ftlog::warn!("`min_photon_count` changed from {count} to 1.");
                config.min_photon_count = Some(1.0);
            }
        }
        let transform = ObservationTransform::new(config.observation_model, config.min_photon_count);
        let store = ShardStore::new(&config.data_path, config.layout);
        store.check_presence()?;
        ftlog::info!(
            "Opened LoDoPaB dataset at {:?} ({:?} observations, {}/{}/{} samples).",
            config.data_path,
            config.observation_model,
            config.layout.train_len,
            config.layout.validation_len,
            config.layout.test_len,
        );
        Ok(Self {
            store,
            transform,
            config,
        })
    }

    /// The number of samples in the given partition.
    #[must_use]
    pub const fn len(&self, partition: Partition) -> usize {
        self.config.layout.len(partition)
    }

    /// The shard layout.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.config.layout
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &LodopabConfig {
        &self.config
    }

    /// The transform applied to retrieved observations.
    #[must_use]
    pub const fn transform(&self) -> &ObservationTransform {
        &self.transform
    }

    /// Retrieves a single sample pair.
    ///
    /// # Parameters
    ///
    /// - `index`: The logical index; negative values count from the end.
    /// - `partition`: The partition to read from.
    /// - `out`: Per-field output policy, `(observation, ground_truth)`.
    ///
    /// # Returns
    ///
    /// One slot per field: `Some(array)` for [`Out::Allocate`], `None` for
    /// [`Out::WriteInto`] (the buffer was filled) and [`Out::Skip`]. The
    /// observation transform is applied only if the observation was
    /// requested.
    ///
    /// # Errors
    ///
    /// * [`Error::IndexOutOfBounds`] if the index is invalid.
    /// * [`Error::DataNotFound`] if the shard file is absent.
    /// * [`Error::Shape`] if a supplied buffer has the wrong shape.
    pub fn get_sample(
        &self,
        index: isize,
        partition: Partition,
        out: (Out<'_, Ix2>, Out<'_, Ix2>),
    ) -> Result<(Option<Array2<f32>>, Option<Array2<f32>>), Error> {
        let layout = &self.config.layout;
        let (shard, offset) = locate::locate(layout.len(partition), layout.num_samples_per_file, index, partition)?;
        let slice = ShardSlice {
            shard,
            start: offset,
            stop: offset + 1,
            step: 1,
            dst: 0..1,
        };
        let (out_observation, out_ground_truth) = out;
        let observation = self.read_sample_field(Field::Observation, partition, &slice, out_observation)?;
        let ground_truth = self.read_sample_field(Field::GroundTruth, partition, &slice, out_ground_truth)?;
        Ok((observation, ground_truth))
    }

    /// Retrieves a strided range of sample pairs as stacked batches.
    ///
    /// The range is decomposed into one read per touched shard per
    /// requested field, and the observation transform is applied once over
    /// the whole assembled batch.
    ///
    /// # Parameters
    ///
    /// - `range`: The `(start, stop, step)` range; negative endpoints count
    ///   from the end, the step must be positive.
    /// - `partition`: The partition to read from.
    /// - `out`: Per-field output policy, `(observation, ground_truth)`,
    ///   with batch-shaped buffers for [`Out::WriteInto`].
    ///
    /// # Returns
    ///
    /// One slot per field, as in [`Self::get_sample`], with arrays of shape
    /// `(samples, rows, cols)`.
    ///
    /// # Errors
    ///
    /// * [`Error::UnsupportedStep`] for a zero or negative step.
    /// * [`Error::RangeOutOfBounds`] if the last selected index is out of
    ///   bounds.
    /// * [`Error::DataNotFound`] if a shard file is absent.
    /// * [`Error::Shape`] if a supplied buffer has the wrong shape.
    pub fn get_range<R: Into<RangeSpec>>(
        &self,
        range: R,
        partition: Partition,
        out: (Out<'_, Ix3>, Out<'_, Ix3>),
    ) -> Result<(Option<Array3<f32>>, Option<Array3<f32>>), Error> {
        let layout = &self.config.layout;
        let len = layout.len(partition);
        let (start, stop, step) = range.into().normalize(len)?;
        let plan = locate::plan_range(len, layout.num_samples_per_file, start, stop, step, partition)?;
        let count = locate::strided_len(start, stop, step);

        let (out_observation, out_ground_truth) = out;
        let observation = self.read_range_field(Field::Observation, partition, &plan, count, out_observation)?;
        let ground_truth = self.read_range_field(Field::GroundTruth, partition, &plan, count, out_ground_truth)?;
        Ok((observation, ground_truth))
    }

    /// Iterates over all `(observation, ground_truth)` pairs of a partition
    /// in order, reading each shard once.
    #[must_use]
    pub const fn iter_pairs(&self, partition: Partition) -> PairIter<'_> {
        PairIter {
            dataset: self,
            partition,
            shard: 0,
            buffer: None,
            row: 0,
        }
    }

    /// Reads one field of a single sample according to the output policy.
    fn read_sample_field(
        &self,
        field: Field,
        partition: Partition,
        slice: &ShardSlice,
        out: Out<'_, Ix2>,
    ) -> Result<Option<Array2<f32>>, Error> {
        let (rows, cols) = field.shape(&self.config.layout);
        match out {
            Out::Skip => Ok(None),
            Out::Allocate => {
                let chunk = self.store.read(field, partition, slice)?;
                let mut sample = chunk.index_axis_move(Axis(0), 0);
                if field == Field::Observation {
                    self.transform.apply(sample.view_mut());
                }
                Ok(Some(sample))
            }
            Out::WriteInto(mut buffer) => {
                if buffer.dim() != (rows, cols) {
                    return Err(Error::Shape {
                        expected: vec![rows, cols],
                        found: buffer.shape().to_vec(),
                    });
                }
                let chunk = self.store.read(field, partition, slice)?;
                buffer.assign(&chunk.index_axis(Axis(0), 0));
                if field == Field::Observation {
                    self.transform.apply(buffer);
                }
                Ok(None)
            }
        }
    }

    /// Reads one field of a range query according to the output policy,
    /// assembling the per-shard chunks into a stacked batch.
    fn read_range_field(
        &self,
        field: Field,
        partition: Partition,
        plan: &[ShardSlice],
        count: usize,
        out: Out<'_, Ix3>,
    ) -> Result<Option<Array3<f32>>, Error> {
        let (rows, cols) = field.shape(&self.config.layout);
        match out {
            Out::Skip => Ok(None),
            Out::Allocate => {
                let mut batch = Array3::zeros((count, rows, cols));
                self.assemble(field, partition, plan, batch.view_mut())?;
                if field == Field::Observation {
                    self.transform.apply(batch.view_mut());
                }
                Ok(Some(batch))
            }
            Out::WriteInto(mut buffer) => {
                if buffer.dim() != (count, rows, cols) {
                    return Err(Error::Shape {
                        expected: vec![count, rows, cols],
                        found: buffer.shape().to_vec(),
                    });
                }
                self.assemble(field, partition, plan, buffer.view_mut())?;
                if field == Field::Observation {
                    self.transform.apply(buffer);
                }
                Ok(None)
            }
        }
    }

    /// Executes a range plan for one field into the destination batch.
    fn assemble(
        &self,
        field: Field,
        partition: Partition,
        plan: &[ShardSlice],
        mut dst: ArrayViewMut<'_, f32, Ix3>,
    ) -> Result<(), Error> {
        for slice in plan {
            let chunk = self.store.read(field, partition, slice)?;
            dst.slice_mut(ndarray::s![slice.dst.start..slice.dst.end, .., ..])
                .assign(&chunk);
        }
        Ok(())
    }
}

/// Iterator over the sample pairs of one partition, in storage order.
///
/// Loads one shard of each field at a time and applies the observation
/// transform per shard batch.
pub struct PairIter<'a> {
    /// The dataset being iterated.
    dataset: &'a LodopabDataset,
    /// The partition being iterated.
    partition: Partition,
    /// The next shard to load.
    shard: usize,
    /// The currently loaded shard pair, transform already applied.
    buffer: Option<(Array3<f32>, Array3<f32>)>,
    /// The next row to yield from the loaded shard pair.
    row: usize,
}

impl PairIter<'_> {
    /// Loads the next shard pair into the buffer.
    fn load_next_shard(&mut self) -> Result<(), Error> {
        let store = &self.dataset.store;
        let ground_truth = store.read_full_shard(Field::GroundTruth, self.partition, self.shard)?;
        let mut observation = store.read_full_shard(Field::Observation, self.partition, self.shard)?;
        self.dataset.transform.apply(observation.view_mut());
        self.buffer = Some((observation, ground_truth));
        self.row = 0;
        self.shard += 1;
        Ok(())
    }
}

impl Iterator for PairIter<'_> {
    type Item = Result<(Array2<f32>, Array2<f32>), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((observation, ground_truth)) = &self.buffer {
                if self.row < observation.len_of(Axis(0)) {
                    let pair = (
                        observation.index_axis(Axis(0), self.row).to_owned(),
                        ground_truth.index_axis(Axis(0), self.row).to_owned(),
                    );
                    self.row += 1;
                    return Some(Ok(pair));
                }
                self.buffer = None;
            }
            if self.shard >= self.dataset.layout().num_shards(self.partition) {
                return None;
            }
            if let Err(e) = self.load_next_shard() {
                // Stop after surfacing the failure.
                self.shard = self.dataset.layout().num_shards(self.partition);
                return Some(Err(e));
            }
        }
    }
}
