//! The configurable, in-place transform applied to retrieved observations.
//!
//! Observations are stored post-log, already clamped at the noise floor the
//! dataset was simulated with. Depending on the configured
//! [`ObservationModel`] and `min_photon_count`, retrieval either leaves the
//! stored values alone, re-derives the pre-log values via the Beer-Lambert
//! law, or substitutes a different noise floor for the entries that were
//! clamped during simulation. Ground truth values are never transformed.

use ndarray::{ArrayViewMut, Dimension};

use crate::{
    constants::{MU_MAX, ORIG_MIN_PHOTON_COUNT, PHOTONS_PER_PIXEL},
    ObservationModel,
};

/// The transform applied in place to observation buffers, resolved once at
/// dataset construction from the observation model and the noise floor.
///
/// The four cases correspond to the two observation models crossed with
/// whether `min_photon_count` is at its no-op value (`None` or equal to the
/// floor the dataset was simulated with).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObservationTransform {
    /// Post-log with the original floor: stored values are returned as-is.
    Identity,
    /// Pre-log with the original floor: `x <- exp(-x * MU_MAX)`.
    Exponential,
    /// Post-log with a custom floor: entries at or above `threshold` were
    /// clamped during simulation and are replaced with `replacement`.
    ClampPostLog {
        /// Stored values at or above this were clamped during simulation.
        threshold: f32,
        /// The post-log value of the requested floor.
        replacement: f32,
    },
    /// Pre-log with a custom floor: the mask is computed on the stored
    /// (post-log) values, the exponential is applied everywhere, and masked
    /// entries are overwritten with `replacement`.
    ClampPreLog {
        /// Stored values at or above this were clamped during simulation.
        threshold: f32,
        /// The pre-log value of the requested floor.
        replacement: f32,
    },
}

impl ObservationTransform {
    /// Resolves the transform for the given model and noise floor.
    ///
    /// `min_photon_count` is assumed validated (clamped to at most 1) by the
    /// caller.
    #[must_use]
    pub fn new(model: ObservationModel, min_photon_count: Option<f32>) -> Self {
        // The comparison must happen in f32: widening the caller's value
        // would turn 0.1_f32 into 0.10000000149.., which never equals the
        // f64 constant.
        #[allow(clippy::cast_possible_truncation)]
        let orig_floor = ORIG_MIN_PHOTON_COUNT as f32;
        let is_default_floor = min_photon_count.is_none() || min_photon_count.is_some_and(|c| c == orig_floor);
        if is_default_floor {
            if model.is_post_log() {
                Self::Identity
            } else {
                Self::Exponential
            }
        } else {
            let count = f64::from(min_photon_count.unwrap_or(0.0));
            // Midpoint (in the post-log domain) between the original floor
            // and a photon count of one: everything at or above it was
            // clamped during simulation.
            #[allow(clippy::cast_possible_truncation)]
            let threshold = (0.5 * (-(ORIG_MIN_PHOTON_COUNT / PHOTONS_PER_PIXEL).ln() - (1.0 / PHOTONS_PER_PIXEL).ln())
                / MU_MAX) as f32;
            if model.is_post_log() {
                #[allow(clippy::cast_possible_truncation)]
                let replacement = (-(count / PHOTONS_PER_PIXEL).ln() / MU_MAX) as f32;
                Self::ClampPostLog { threshold, replacement }
            } else {
                #[allow(clippy::cast_possible_truncation)]
                let replacement = (count / PHOTONS_PER_PIXEL) as f32;
                Self::ClampPreLog { threshold, replacement }
            }
        }
    }

    /// Applies the transform in place to an observation buffer.
    ///
    /// The buffer may hold a single sample or a stacked batch; the transform
    /// is element-wise either way.
    pub fn apply<D: Dimension>(&self, mut observation: ArrayViewMut<'_, f32, D>) {
        #[allow(clippy::cast_possible_truncation)]
        let mu_max = MU_MAX as f32;
        match *self {
            Self::Identity => {}
            Self::Exponential => observation.mapv_inplace(|x| (-x * mu_max).exp()),
            Self::ClampPostLog { threshold, replacement } => {
                observation.mapv_inplace(|x| if x >= threshold { replacement } else { x });
            }
            Self::ClampPreLog { threshold, replacement } => {
                // The mask is evaluated on the raw stored value, before the
                // exponential rewrites it.
                observation.mapv_inplace(|x| {
                    if x >= threshold {
                        replacement
                    } else {
                        (-x * mu_max).exp()
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use ndarray::{array, Array2};

    use super::ObservationTransform;
    use crate::{
        constants::{MU_MAX, PHOTONS_PER_PIXEL},
        ObservationModel,
    };

    #[test]
    fn default_floor_resolution() {
        // `None` and the original floor value are both no-op floors.
        for floor in [None, Some(0.1)] {
            assert_eq!(
                ObservationTransform::new(ObservationModel::PostLog, floor),
                ObservationTransform::Identity
            );
            assert_eq!(
                ObservationTransform::new(ObservationModel::PreLog, floor),
                ObservationTransform::Exponential
            );
        }
    }

    #[test]
    fn original_floor_matches_in_f32() {
        // 0.1 has no exact binary representation; the f32 the caller passes
        // must still be recognized as the original floor and leave even
        // values above the clamp threshold untouched.
        let transform = ObservationTransform::new(ObservationModel::PostLog, Some(0.1));
        assert_eq!(transform, ObservationTransform::Identity);

        let mut obs = array![[1.0_f32, 0.5]];
        let expected = obs.clone();
        transform.apply(obs.view_mut());
        assert_eq!(obs, expected);
    }

    #[test]
    fn identity_leaves_buffer_unchanged() {
        let transform = ObservationTransform::new(ObservationModel::PostLog, None);
        let mut obs = array![[0.0_f32, 0.25, 0.5], [1.0, 2.0, 4.0]];
        let expected = obs.clone();
        transform.apply(obs.view_mut());
        assert_eq!(obs, expected);
    }

    #[test]
    fn exponential_of_zero_is_one() {
        let transform = ObservationTransform::new(ObservationModel::PreLog, None);
        let mut obs = Array2::<f32>::zeros((2, 3));
        transform.apply(obs.view_mut());
        for &x in &obs {
            assert!(approx_eq!(f32, x, 1.0));
        }
    }

    #[test]
    fn exponential_is_beer_lambert() {
        let transform = ObservationTransform::new(ObservationModel::PreLog, None);
        let mut obs = array![[0.01_f32, 0.05]];
        transform.apply(obs.view_mut());
        #[allow(clippy::cast_possible_truncation)]
        let mu_max = MU_MAX as f32;
        assert!(approx_eq!(f32, obs[[0, 0]], (-0.01 * mu_max).exp()));
        assert!(approx_eq!(f32, obs[[0, 1]], (-0.05 * mu_max).exp()));
    }

    #[test]
    fn post_log_clamp_replaces_masked_entries() {
        let min_photon_count = 0.5_f64;
        #[allow(clippy::cast_possible_truncation)]
        let transform = ObservationTransform::new(ObservationModel::PostLog, Some(min_photon_count as f32));

        let expected = -(min_photon_count / PHOTONS_PER_PIXEL).ln() / MU_MAX;
        // A stored value well above the threshold must be replaced with
        // exactly -ln(min_photon_count / 4096) / MU_MAX; a small one must
        // pass through untouched.
        let mut obs = array![[1.0_f32, 0.001]];
        transform.apply(obs.view_mut());
        #[allow(clippy::cast_possible_truncation)]
        let expected = expected as f32;
        assert!(approx_eq!(f32, obs[[0, 0]], expected));
        assert!(approx_eq!(f32, obs[[0, 1]], 0.001));
    }

    #[test]
    fn pre_log_clamp_masks_on_raw_values() {
        let transform = ObservationTransform::new(ObservationModel::PreLog, Some(0.5));
        let ObservationTransform::ClampPreLog { threshold, replacement } = transform else {
            panic!("expected the pre-log clamp case, got {transform:?}");
        };
        #[allow(clippy::cast_possible_truncation)]
        let expected_replacement = (0.5 / PHOTONS_PER_PIXEL) as f32;
        assert!(approx_eq!(f32, replacement, expected_replacement));

        // One entry above the threshold, one below.
        let below = threshold / 2.0;
        let mut obs = array![[threshold + 0.01, below]];
        transform.apply(obs.view_mut());
        assert!(approx_eq!(f32, obs[[0, 0]], replacement));
        #[allow(clippy::cast_possible_truncation)]
        let mu_max = MU_MAX as f32;
        assert!(approx_eq!(f32, obs[[0, 1]], (-below * mu_max).exp()));
    }

    #[test]
    fn batch_and_single_shapes_agree() {
        let transform = ObservationTransform::new(ObservationModel::PreLog, Some(0.3));
        let single = array![[0.0_f32, 0.02, 5.0]];
        let mut batch = ndarray::stack![ndarray::Axis(0), single, single];
        let mut one = single.clone();
        transform.apply(one.view_mut());
        transform.apply(batch.view_mut());
        for row in batch.outer_iter() {
            assert_eq!(row, one.view());
        }
    }
}
