/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Gaussian sigma per unit of FWHM: 1 / (2 * sqrt(2 * ln 2)).
pub const FWHM_TO_SIGMA: f64 = 0.424_660_900_144_009_5;

/// Matched-filter kernel half-width as a multiple of the configured FWHM.
pub const KERNEL_HALF_WIDTH_FWHM: f64 = 2.0;

/// Smallest allowed kernel half-width, so the shape windows around a peak
/// always contain neighbors.
pub const MIN_KERNEL_HALF_WIDTH: usize = 2;

/// Radius of the sharpness neighborhood in sigma units. Classic DAOFIND
/// footprint sizing: the ring hugs the core so star wings count against
/// the peak.
pub const SHARPNESS_RADIUS_SIGMA: f64 = 1.5;

/// Small epsilon guarding divisions and convergence checks in f64 statistics.
pub const EPSILON: f64 = 1e-12;

/// Minimum row count of one detection band in tiled runs.
pub const MIN_TILE_HEIGHT: usize = 32;

/// Default expected stellar FWHM in pixels.
pub const DEFAULT_FWHM: f64 = 3.0;

/// Default detection threshold in background-sigma units above the mean.
pub const DEFAULT_THRESHOLD_NSIGMA: f64 = 5.0;

/// Default sigma-clipping rejection threshold around the median.
pub const DEFAULT_CLIP_SIGMA: f64 = 3.0;

/// Default cap on sigma-clipping iterations.
pub const DEFAULT_CLIP_MAX_ITERATIONS: usize = 5;

/// Default lower sharpness acceptance bound.
pub const DEFAULT_SHARP_LO: f64 = 0.2;

/// Default upper sharpness acceptance bound.
pub const DEFAULT_SHARP_HI: f64 = 1.0;

/// Default lower roundness acceptance bound.
pub const DEFAULT_ROUND_LO: f64 = -1.0;

/// Default upper roundness acceptance bound.
pub const DEFAULT_ROUND_HI: f64 = 1.0;

/// Default minimum separation between accepted peaks in pixels.
pub const DEFAULT_MIN_SEPARATION: f64 = 3.0;

/// Default photometry aperture radius in pixels.
pub const DEFAULT_APERTURE_RADIUS: f64 = 8.0;

/// Default inner radius of the background annulus in pixels.
pub const DEFAULT_BG_INNER_RADIUS: f64 = 10.0;

/// Default outer radius of the background annulus in pixels.
pub const DEFAULT_BG_OUTER_RADIUS: f64 = 15.0;

/// Default cap on centroid refinement iterations.
pub const DEFAULT_MAX_CENTROID_ITERATIONS: usize = 10;

/// Default centroid convergence epsilon in pixels.
pub const DEFAULT_CENTROID_EPSILON: f64 = 0.01;
