use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_APERTURE_RADIUS, DEFAULT_BG_INNER_RADIUS, DEFAULT_BG_OUTER_RADIUS,
    DEFAULT_CENTROID_EPSILON, DEFAULT_CLIP_MAX_ITERATIONS, DEFAULT_CLIP_SIGMA, DEFAULT_FWHM,
    DEFAULT_MAX_CENTROID_ITERATIONS, DEFAULT_MIN_SEPARATION, DEFAULT_ROUND_HI, DEFAULT_ROUND_LO,
    DEFAULT_SHARP_HI, DEFAULT_SHARP_LO, DEFAULT_THRESHOLD_NSIGMA,
};
use crate::error::{Result, VegaError};

/// Configuration for one detection and photometry run.
///
/// Built from `Default` or deserialized with missing fields, every value
/// falls back to the documented default and the whole set validates. The
/// pipeline calls `validate()` before touching any pixel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Expected full width at half maximum of stellar profiles, in pixels.
    /// Sizes the matched-filter kernel and the centroid window.
    #[serde(default = "default_fwhm")]
    pub fwhm: f64,
    /// Detection threshold in background-sigma units above the mean.
    #[serde(default = "default_threshold_nsigma")]
    pub threshold_nsigma: f64,
    /// Sigma-clipping rejection threshold for background statistics.
    #[serde(default = "default_clip_sigma")]
    pub clip_sigma: f64,
    /// Cap on sigma-clipping iterations.
    #[serde(default = "default_clip_max_iterations")]
    pub clip_max_iterations: usize,
    /// Lower sharpness acceptance bound.
    #[serde(default = "default_sharp_lo")]
    pub sharp_lo: f64,
    /// Upper sharpness acceptance bound.
    #[serde(default = "default_sharp_hi")]
    pub sharp_hi: f64,
    /// Lower roundness acceptance bound, applied to both roundness values.
    #[serde(default = "default_round_lo")]
    pub round_lo: f64,
    /// Upper roundness acceptance bound, applied to both roundness values.
    #[serde(default = "default_round_hi")]
    pub round_hi: f64,
    /// Minimum separation between accepted peaks in pixels. Closer
    /// detections collapse onto the brightest one.
    #[serde(default = "default_min_separation")]
    pub min_separation: f64,
    /// Photometry aperture radius in pixels.
    #[serde(default = "default_aperture_radius")]
    pub aperture_radius: f64,
    /// Inner radius of the background annulus in pixels.
    #[serde(default = "default_bg_inner_radius")]
    pub bg_inner_radius: f64,
    /// Outer radius of the background annulus in pixels.
    #[serde(default = "default_bg_outer_radius")]
    pub bg_outer_radius: f64,
    /// Cap on centroid refinement iterations.
    #[serde(default = "default_max_centroid_iterations")]
    pub max_centroid_iterations: usize,
    /// Centroid convergence epsilon in pixels.
    #[serde(default = "default_centroid_epsilon")]
    pub centroid_epsilon: f64,
}

fn default_fwhm() -> f64 {
    DEFAULT_FWHM
}
fn default_threshold_nsigma() -> f64 {
    DEFAULT_THRESHOLD_NSIGMA
}
fn default_clip_sigma() -> f64 {
    DEFAULT_CLIP_SIGMA
}
fn default_clip_max_iterations() -> usize {
    DEFAULT_CLIP_MAX_ITERATIONS
}
fn default_sharp_lo() -> f64 {
    DEFAULT_SHARP_LO
}
fn default_sharp_hi() -> f64 {
    DEFAULT_SHARP_HI
}
fn default_round_lo() -> f64 {
    DEFAULT_ROUND_LO
}
fn default_round_hi() -> f64 {
    DEFAULT_ROUND_HI
}
fn default_min_separation() -> f64 {
    DEFAULT_MIN_SEPARATION
}
fn default_aperture_radius() -> f64 {
    DEFAULT_APERTURE_RADIUS
}
fn default_bg_inner_radius() -> f64 {
    DEFAULT_BG_INNER_RADIUS
}
fn default_bg_outer_radius() -> f64 {
    DEFAULT_BG_OUTER_RADIUS
}
fn default_max_centroid_iterations() -> usize {
    DEFAULT_MAX_CENTROID_ITERATIONS
}
fn default_centroid_epsilon() -> f64 {
    DEFAULT_CENTROID_EPSILON
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fwhm: DEFAULT_FWHM,
            threshold_nsigma: DEFAULT_THRESHOLD_NSIGMA,
            clip_sigma: DEFAULT_CLIP_SIGMA,
            clip_max_iterations: DEFAULT_CLIP_MAX_ITERATIONS,
            sharp_lo: DEFAULT_SHARP_LO,
            sharp_hi: DEFAULT_SHARP_HI,
            round_lo: DEFAULT_ROUND_LO,
            round_hi: DEFAULT_ROUND_HI,
            min_separation: DEFAULT_MIN_SEPARATION,
            aperture_radius: DEFAULT_APERTURE_RADIUS,
            bg_inner_radius: DEFAULT_BG_INNER_RADIUS,
            bg_outer_radius: DEFAULT_BG_OUTER_RADIUS,
            max_centroid_iterations: DEFAULT_MAX_CENTROID_ITERATIONS,
            centroid_epsilon: DEFAULT_CENTROID_EPSILON,
        }
    }
}

impl PipelineConfig {
    /// Check every field against its documented range.
    ///
    /// Reports the first offending field by name.
    pub fn validate(&self) -> Result<()> {
        positive("fwhm", self.fwhm)?;
        positive("threshold_nsigma", self.threshold_nsigma)?;
        positive("clip_sigma", self.clip_sigma)?;
        at_least_one("clip_max_iterations", self.clip_max_iterations)?;
        ordered("sharp_lo", "sharp_hi", self.sharp_lo, self.sharp_hi)?;
        ordered("round_lo", "round_hi", self.round_lo, self.round_hi)?;
        if !self.min_separation.is_finite() || self.min_separation < 0.0 {
            return Err(VegaError::InvalidConfiguration(format!(
                "min_separation must be zero or positive, got {}",
                self.min_separation
            )));
        }
        positive("aperture_radius", self.aperture_radius)?;
        positive("bg_inner_radius", self.bg_inner_radius)?;
        positive("bg_outer_radius", self.bg_outer_radius)?;
        if self.bg_inner_radius >= self.bg_outer_radius {
            return Err(VegaError::InvalidConfiguration(format!(
                "bg_inner_radius ({}) must be below bg_outer_radius ({})",
                self.bg_inner_radius, self.bg_outer_radius
            )));
        }
        at_least_one("max_centroid_iterations", self.max_centroid_iterations)?;
        positive("centroid_epsilon", self.centroid_epsilon)?;
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(VegaError::InvalidConfiguration(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn at_least_one(name: &str, value: usize) -> Result<()> {
    if value >= 1 {
        Ok(())
    } else {
        Err(VegaError::InvalidConfiguration(format!(
            "{name} must be at least 1"
        )))
    }
}

fn ordered(lo_name: &str, hi_name: &str, lo: f64, hi: f64) -> Result<()> {
    if lo.is_finite() && hi.is_finite() && lo < hi {
        Ok(())
    } else {
        Err(VegaError::InvalidConfiguration(format!(
            "{lo_name} ({lo}) must be finite and below {hi_name} ({hi})"
        )))
    }
}
