//! Physical and layout constants shared across the crate.
//!
//! These values are fixed properties of the LoDoPaB-CT dataset and of the
//! simulation that produced it. They must not drift between calls, so they
//! live here instead of being recomputed at call sites.

/// Number of samples stored along the leading axis of each shard file.
pub const NUM_SAMPLES_PER_FILE: usize = 128;

/// Incident photons per detector pixel before attenuation.
pub const PHOTONS_PER_PIXEL: f64 = 4096.0;

/// The noise-floor replacement value used when the dataset was simulated.
///
/// Stored observations already satisfy this floor, so requesting it again is
/// a no-op.
pub const ORIG_MIN_PHOTON_COUNT: f64 = 0.1;

/// Linear attenuation coefficient of water, in 1/m.
pub const MU_WATER: f64 = 20.0;

/// Linear attenuation coefficient of air, in 1/m.
pub const MU_AIR: f64 = 0.02;

/// The linear attenuation of 3071 HU, by which the ground truth images were
/// normalized.
pub const MU_MAX: f64 = 3071.0 * (MU_WATER - MU_AIR) / 1000.0 + MU_WATER;

/// Shape of one observation (sinogram): 1000 angles by 513 detector pixels.
pub const OBSERVATION_SHAPE: (usize, usize) = (1000, 513);

/// Shape of one ground truth image in pixels.
pub const GROUND_TRUTH_SHAPE: (usize, usize) = (362, 362);

/// Number of samples in the training partition.
pub const TRAIN_LEN: usize = 35820;

/// Number of samples in the validation partition.
pub const VALIDATION_LEN: usize = 3522;

/// Number of samples in the test partition.
pub const TEST_LEN: usize = 3553;

/// The Zenodo record from which the dataset archives can be obtained.
pub const ZENODO_RECORD_ID: &str = "3384092";
