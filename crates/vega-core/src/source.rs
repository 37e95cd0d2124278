use serde::{Deserialize, Serialize};

/// Why a detection was rejected rather than accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Sharpness or roundness outside the configured acceptance bounds.
    Shape,
    /// A brighter detection sits within the minimum separation distance.
    Duplicate,
    /// Centroid refinement found no positive signal in its window.
    CentroidFailed,
    /// No usable background annulus around the source.
    PhotometryFailed,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape => write!(f, "shape"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::CentroidFailed => write!(f, "centroid failed"),
            Self::PhotometryFailed => write!(f, "photometry failed"),
        }
    }
}

/// One raw hit on the matched-filter response surface.
///
/// Positions are integer pixel indices (x = column, y = row). Consumed by the
/// centroid stage; the shape statistics ride along into the final `Source`.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Peak column index.
    pub peak_x: usize,
    /// Peak row index.
    pub peak_y: usize,
    /// Raw image value at the peak.
    pub peak_value: f64,
    /// Matched-filter response at the peak.
    pub response: f64,
    pub sharpness: f64,
    pub roundness1: f64,
    pub roundness2: f64,
    /// Set by shape rejection or duplicate suppression; None while in play.
    pub reject_reason: Option<RejectReason>,
}

/// A detected source with its refined sub-pixel position.
///
/// Rejected sources stay in the output with their reason so callers can audit
/// what was thrown away; only non-rejected sources carry photometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Stable id, assigned in output order (descending peak flux).
    pub id: usize,
    /// Sub-pixel column position.
    pub x: f64,
    /// Sub-pixel row position.
    pub y: f64,
    /// Raw image value at the detection peak.
    pub peak_flux: f64,
    pub sharpness: f64,
    pub roundness1: f64,
    pub roundness2: f64,
    pub rejected: bool,
    pub reject_reason: Option<RejectReason>,
}

impl Source {
    /// True when the source survived every rejection stage.
    pub fn is_accepted(&self) -> bool {
        !self.rejected
    }
}

/// Aperture photometry measurements for one accepted source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotometryResult {
    /// Id of the measured `Source`.
    pub source_id: usize,
    /// Flux integrated inside the aperture, background included.
    pub raw_flux: f64,
    /// Per-pixel background level from the annulus.
    pub background_level: f64,
    /// Background-subtracted flux.
    pub net_flux: f64,
    /// Poisson plus background noise estimate.
    pub flux_uncertainty: f64,
    /// Aperture area actually integrated, in square pixels. Smaller than the
    /// full circle when the aperture is clipped by the image edge.
    pub aperture_area: f64,
}

impl PhotometryResult {
    /// Instrumental magnitude, `-2.5 * log10(net_flux)`.
    ///
    /// None when the net flux is not positive.
    pub fn instrumental_mag(&self) -> Option<f64> {
        (self.net_flux > 0.0).then(|| -2.5 * self.net_flux.log10())
    }
}
