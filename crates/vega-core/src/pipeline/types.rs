use serde::{Deserialize, Serialize};

use crate::source::{PhotometryResult, Source};

/// Non-fatal conditions recorded during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    /// No source survived every rejection stage.
    NoSourcesFound,
    /// Global background clipping hit its iteration cap while still
    /// rejecting samples.
    BackgroundClipCap,
    /// Annulus background clipping for one source hit its iteration cap.
    AnnulusClipCap { source_id: usize },
    /// Centroid refinement for one source hit its iteration cap before the
    /// shift dropped below epsilon.
    CentroidIterationCap { source_id: usize },
    /// Photometry for an accepted source failed; the source was rejected.
    PhotometryFailed { source_id: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSourcesFound => write!(f, "no sources survived detection and filtering"),
            Self::BackgroundClipCap => {
                write!(f, "global background clipping stopped at the iteration cap")
            }
            Self::AnnulusClipCap { source_id } => write!(
                f,
                "background annulus clipping for source {source_id} stopped at the iteration cap"
            ),
            Self::CentroidIterationCap { source_id } => write!(
                f,
                "centroid for source {source_id} stopped at the iteration cap"
            ),
            Self::PhotometryFailed { source_id } => {
                write!(f, "photometry failed for source {source_id}")
            }
        }
    }
}

/// Everything one run produces.
///
/// `sources` is ordered by descending peak flux and includes rejected
/// entries with their reasons. `photometry` holds one result per accepted
/// source, in the same order, linked by `source_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub sources: Vec<Source>,
    pub photometry: Vec<PhotometryResult>,
    pub warnings: Vec<Warning>,
}

impl PipelineResult {
    /// Sources that survived every rejection stage, brightest first.
    pub fn accepted(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.is_accepted())
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted().count()
    }
}
