//! Pure arithmetic mapping logical sample indices onto shard files.
//!
//! A partition of length `len` is stored across `ceil(len / shard_size)`
//! shard files, each holding `shard_size` consecutive samples (fewer in the
//! last one). [`locate`] resolves a single index; [`plan_range`] decomposes
//! a strided range into one stride-preserving slice per touched shard.

use crate::{Error, Partition};

/// A contiguous-stride read from one shard, with its destination in the
/// assembled output batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSlice {
    /// The shard file index within the partition.
    pub shard: usize,
    /// First selected row within the shard.
    pub start: usize,
    /// Exclusive upper bound of the selection within the shard.
    pub stop: usize,
    /// The stride of the selection, shared with the global range.
    pub step: usize,
    /// The rows of the output batch this slice fills.
    pub dst: core::ops::Range<usize>,
}

/// A `(start, stop, step)` range over the logical index space of one
/// partition, before normalization.
///
/// Negative `start`/`stop` count from the end of the partition, with the
/// usual slice semantics. Only positive steps are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    /// Range start, inclusive.
    pub start: isize,
    /// Range stop, exclusive.
    pub stop: isize,
    /// Range step.
    pub step: isize,
}

impl RangeSpec {
    /// Creates a range spec.
    #[must_use]
    pub const fn new(start: isize, stop: isize, step: isize) -> Self {
        Self { start, stop, step }
    }

    /// Resolves negative endpoints against the partition length.
    ///
    /// # Errors
    ///
    /// * If the step is zero or negative.
    pub fn normalize(self, len: usize) -> Result<(usize, usize, usize), Error> {
        if self.step < 1 {
            return Err(Error::UnsupportedStep { step: self.step });
        }
        let resolve = |bound: isize| -> usize {
            if bound < 0 {
                let len = isize::try_from(len).unwrap_or(isize::MAX);
                usize::try_from((len + bound).max(0)).unwrap_or(0)
            } else {
                bound.unsigned_abs()
            }
        };
        #[allow(clippy::cast_sign_loss)]
        Ok((resolve(self.start), resolve(self.stop), self.step as usize))
    }
}

impl From<core::ops::Range<isize>> for RangeSpec {
    fn from(range: core::ops::Range<isize>) -> Self {
        Self::new(range.start, range.end, 1)
    }
}

impl From<core::ops::Range<usize>> for RangeSpec {
    fn from(range: core::ops::Range<usize>) -> Self {
        Self::new(
            isize::try_from(range.start).unwrap_or(isize::MAX),
            isize::try_from(range.end).unwrap_or(isize::MAX),
            1,
        )
    }
}

/// The number of elements selected by `start..stop` with the given step.
#[must_use]
pub const fn strided_len(start: usize, stop: usize, step: usize) -> usize {
    if stop > start {
        (stop - start).div_ceil(step)
    } else {
        0
    }
}

/// Normalizes a single logical index and resolves it to a shard and an
/// in-shard offset.
///
/// # Parameters
///
/// - `len`: The partition length.
/// - `shard_size`: Samples per shard file.
/// - `index`: The logical index; negative values count from the end.
/// - `partition`: The partition being addressed, for error reporting only.
///
/// # Errors
///
/// * If the index is outside `[-len, len)`.
pub fn locate(len: usize, shard_size: usize, index: isize, partition: Partition) -> Result<(usize, usize), Error> {
    let ilen = isize::try_from(len).unwrap_or(isize::MAX);
    if index >= ilen || index < -ilen {
        return Err(Error::IndexOutOfBounds { index, partition, len });
    }
    let index = if index < 0 { index + ilen } else { index }.unsigned_abs();
    Ok((index / shard_size, index % shard_size))
}

/// Decomposes a normalized strided range into per-shard slices.
///
/// The slices preserve the global stride: the in-shard start of every shard
/// after the first is the smallest offset congruent to the global
/// progression modulo `step`. Concatenating the selected rows in shard order
/// reproduces `start, start + step, ..` up to `stop`, exclusive, with no
/// duplication or gap. Shards that the progression jumps over entirely
/// (possible when `step > shard_size`) contribute no slice.
///
/// # Parameters
///
/// - `len`: The partition length.
/// - `shard_size`: Samples per shard file.
/// - `start`, `stop`, `step`: The normalized range; `step >= 1`.
/// - `partition`: The partition being addressed, for error reporting only.
///
/// # Errors
///
/// * If the last selected index is `>= len`.
pub fn plan_range(
    len: usize,
    shard_size: usize,
    start: usize,
    stop: usize,
    step: usize,
    partition: Partition,
) -> Result<Vec<ShardSlice>, Error> {
    if start >= stop {
        return Ok(Vec::new());
    }
    // Largest selected index, i.e. the last element of the progression.
    let last = start + ((stop - 1 - start) / step) * step;
    if last >= len {
        return Err(Error::RangeOutOfBounds {
            start,
            stop,
            step: isize::try_from(step).unwrap_or(isize::MAX),
            partition,
            len,
        });
    }

    let first_shard = start / shard_size;
    let last_shard = last / shard_size;
    // Signed copies for the congruence arithmetic below, which subtracts
    // shard offsets that can exceed `start`.
    let (sstart, sstep, ssize) = (as_signed(start), as_signed(step), as_signed(shard_size));

    let mut slices = Vec::with_capacity(last_shard - first_shard + 1);
    let mut data_count = 0;
    for shard in first_shard..=last_shard {
        let slice_start = if shard == first_shard {
            start % shard_size
        } else {
            // Smallest offset in this shard congruent to the global
            // progression. Taken modulo `step`, not `shard_size`, so the
            // alignment survives steps that do not divide the shard size.
            unsigned_rem(sstart - as_signed(shard) * ssize, sstep)
        };
        let slice_stop = if shard == last_shard {
            last % shard_size + 1
        } else {
            // One past the last congruent offset that still lands in this
            // shard: derived from the next shard's congruent start.
            let next_start = unsigned_rem(sstart - as_signed(shard + 1) * ssize, sstep);
            unsigned_rem(as_signed(next_start) - sstep, ssize) + 1
        };
        let count = strided_len(slice_start, slice_stop, step);
        if count == 0 {
            // The progression skipped this shard entirely.
            continue;
        }
        slices.push(ShardSlice {
            shard,
            start: slice_start,
            stop: slice_stop,
            step,
            dst: data_count..data_count + count,
        });
        data_count += count;
    }

    Ok(slices)
}

/// Lossless widening of shard arithmetic to signed values.
const fn as_signed(value: usize) -> i64 {
    #[allow(clippy::cast_possible_wrap)]
    (value as i64)
}

/// Euclidean remainder, mapped back to `usize`.
const fn unsigned_rem(value: i64, modulus: i64) -> usize {
    #[allow(clippy::cast_sign_loss)]
    (value.rem_euclid(modulus) as usize)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{locate, plan_range, strided_len, RangeSpec};
    use crate::{Error, Partition};

    /// Applies a plan to the synthetic sequence `0..len` and collects the
    /// selected values in shard order.
    fn select(len: usize, shard_size: usize, start: usize, stop: usize, step: usize) -> Result<Vec<usize>, Error> {
        let plan = plan_range(len, shard_size, start, stop, step, Partition::Train)?;
        let mut out = Vec::new();
        for slice in &plan {
            assert!(slice.start < shard_size, "in-shard start out of bounds: {slice:?}");
            assert!(slice.stop <= shard_size, "in-shard stop out of bounds: {slice:?}");
            assert_eq!(slice.dst.len(), strided_len(slice.start, slice.stop, slice.step));
            assert_eq!(slice.dst.start, out.len(), "destination ranges must tile the batch");
            let base = slice.shard * shard_size;
            out.extend((slice.start..slice.stop).step_by(slice.step).map(|i| base + i));
        }
        Ok(out)
    }

    #[test]
    fn single_index() -> Result<(), Error> {
        assert_eq!(locate(100, 16, 0, Partition::Train)?, (0, 0));
        assert_eq!(locate(100, 16, 15, Partition::Train)?, (0, 15));
        assert_eq!(locate(100, 16, 16, Partition::Train)?, (1, 0));
        assert_eq!(locate(100, 16, 99, Partition::Train)?, (6, 3));
        // Negative indices count from the end.
        assert_eq!(locate(100, 16, -1, Partition::Train)?, (6, 3));
        assert_eq!(locate(100, 16, -100, Partition::Train)?, (0, 0));
        Ok(())
    }

    #[test_case(100, 100; "index equal to len")]
    #[test_case(100, 101; "index beyond len")]
    #[test_case(100, -101; "index below negative len")]
    fn single_index_out_of_bounds(len: usize, index: isize) {
        let err = locate(len, 16, index, Partition::Test);
        assert!(matches!(err, Err(Error::IndexOutOfBounds { .. })), "{err:?}");
    }

    /// The alignment case from the contract: a stride that does not divide
    /// the shard size, crossing two shard boundaries.
    #[test]
    fn stride_crossing_shards() -> Result<(), Error> {
        let plan = plan_range(30, 10, 3, 27, 4, Partition::Train)?;

        let per_shard = plan
            .iter()
            .map(|s| (s.shard, (s.start..s.stop).step_by(s.step).collect::<Vec<_>>()))
            .collect::<Vec<_>>();
        assert_eq!(
            per_shard,
            vec![(0, vec![3, 7]), (1, vec![1, 5, 9]), (2, vec![3])],
            "expected shard assignment {{0: [3, 7], 1: [11, 15, 19], 2: [23]}}"
        );

        assert_eq!(select(30, 10, 3, 27, 4)?, vec![3, 7, 11, 15, 19, 23]);
        Ok(())
    }

    #[test]
    fn stride_larger_than_shard() -> Result<(), Error> {
        // Step 25 with shard size 10: shard 1 is skipped entirely.
        assert_eq!(select(30, 10, 3, 30, 25)?, vec![3, 28]);
        let plan = plan_range(30, 10, 3, 30, 25, Partition::Train)?;
        assert_eq!(plan.iter().map(|s| s.shard).collect::<Vec<_>>(), vec![0, 2]);
        Ok(())
    }

    #[test]
    fn round_trip_exhaustive() -> Result<(), Error> {
        // Every strided range over small partitions must reproduce the
        // arithmetic progression exactly, for shard sizes that the stride
        // divides, does not divide, and exceeds.
        for shard_size in [1, 2, 3, 4, 5, 7, 10] {
            for len in [1, 2, 7, 19, 24] {
                for start in 0..len {
                    for stop in start..=len {
                        for step in 1..=7 {
                            let expected = (start..stop).step_by(step).collect::<Vec<_>>();
                            assert_eq!(
                                select(len, shard_size, start, stop, step)?,
                                expected,
                                "len={len} shard_size={shard_size} range=({start},{stop},{step})"
                            );
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn empty_range() -> Result<(), Error> {
        assert!(plan_range(10, 4, 5, 5, 1, Partition::Train)?.is_empty());
        assert!(plan_range(10, 4, 7, 3, 2, Partition::Train)?.is_empty());
        Ok(())
    }

    #[test]
    fn range_out_of_bounds() {
        let err = plan_range(10, 4, 8, 11, 1, Partition::Validation);
        assert!(matches!(err, Err(Error::RangeOutOfBounds { .. })), "{err:?}");
        // The last *selected* index is what matters, not `stop`.
        assert!(plan_range(10, 4, 8, 11, 3, Partition::Validation).is_ok());
    }

    #[test_case(0; "zero step")]
    #[test_case(-1; "negative step")]
    fn unsupported_step(step: isize) {
        let err = RangeSpec::new(0, 10, step).normalize(10);
        assert!(matches!(err, Err(Error::UnsupportedStep { .. })), "{err:?}");
    }

    #[test]
    fn normalize_negative_bounds() -> Result<(), Error> {
        assert_eq!(RangeSpec::new(-4, -1, 1).normalize(10)?, (6, 9, 1));
        assert_eq!(RangeSpec::new(-20, 5, 1).normalize(10)?, (0, 5, 1));
        assert_eq!(RangeSpec::new(2, 8, 3).normalize(10)?, (2, 8, 3));
        Ok(())
    }
}
