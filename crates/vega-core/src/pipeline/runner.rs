use ndarray::s;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::centroid::refine_centroid;
use crate::config::PipelineConfig;
use crate::consts::MIN_TILE_HEIGHT;
use crate::detect::convolve::convolve_response;
use crate::detect::finder::{apply_min_separation, apply_shape_bounds, scan_peak_rows};
use crate::detect::{self, GaussianKernel};
use crate::error::Result;
use crate::image::PixelImage;
use crate::photometry;
use crate::source::{Candidate, RejectReason, Source};
use crate::stats::{image_background, BackgroundStats};

use super::types::{PipelineResult, Warning};

/// Run detection, centroiding and photometry on one image.
///
/// Fails fast on invalid configuration; everything after that is recorded
/// per source or as a warning instead of aborting the run.
pub fn run(image: &PixelImage, config: &PipelineConfig) -> Result<PipelineResult> {
    config.validate()?;
    info!(
        width = image.width(),
        height = image.height(),
        "starting source extraction"
    );

    let mut warnings = Vec::new();
    let stats = global_background(image, config, &mut warnings)?;
    let candidates = detect::detect(image, &stats, config);
    finish(image, config, candidates, warnings)
}

/// Run the pipeline with detection split over horizontal bands of roughly
/// `band_rows` rows, processed in parallel.
///
/// Each band is convolved and scanned with enough overlap that the rows it
/// owns see exactly the data the whole-image path sees, and duplicate
/// suppression runs globally after the merge, so the result is identical to
/// `run` for any band height.
pub fn run_tiled(
    image: &PixelImage,
    config: &PipelineConfig,
    band_rows: usize,
) -> Result<PipelineResult> {
    config.validate()?;
    let height = image.height();
    let band_rows = band_rows.max(MIN_TILE_HEIGHT);
    if band_rows >= height {
        return run(image, config);
    }
    info!(
        width = image.width(),
        height,
        band_rows,
        "starting banded source extraction"
    );

    let mut warnings = Vec::new();
    let stats = global_background(image, config, &mut warnings)?;
    let kernel = GaussianKernel::new(config.fwhm);
    let threshold = stats.mean + config.threshold_nsigma * stats.stddev;
    // Overlap covers the convolution window of every owned row plus the
    // neighbor rows consulted by the local-maximum test.
    let pad = kernel.half_width + 1;

    let starts: Vec<usize> = (0..height).step_by(band_rows).collect();
    let per_band: Vec<Vec<Candidate>> = starts
        .par_iter()
        .map(|&start| {
            let end = (start + band_rows).min(height);
            let lo = start.saturating_sub(pad);
            let hi = (end + pad).min(height);
            let band = image.data.slice(s![lo..hi, ..]).to_owned();
            let response = convolve_response(&band, &kernel);
            let mut found = scan_peak_rows(
                &band,
                &response,
                &kernel,
                threshold,
                stats.median,
                (start - lo)..(end - lo),
            );
            for candidate in &mut found {
                candidate.peak_y += lo;
            }
            found
        })
        .collect();

    let mut candidates: Vec<Candidate> = per_band.into_iter().flatten().collect();
    debug!(
        raw = candidates.len(),
        bands = starts.len(),
        "banded peak scan complete"
    );
    apply_shape_bounds(&mut candidates, config);
    apply_min_separation(&mut candidates, config.min_separation);
    finish(image, config, candidates, warnings)
}

fn global_background(
    image: &PixelImage,
    config: &PipelineConfig,
    warnings: &mut Vec<Warning>,
) -> Result<BackgroundStats> {
    let stats = image_background(&image.data, config.clip_sigma, config.clip_max_iterations)?;
    debug!(
        mean = stats.mean,
        median = stats.median,
        stddev = stats.stddev,
        masked = stats.pixels_masked,
        "global background estimated"
    );
    if !stats.converged {
        warnings.push(Warning::BackgroundClipCap);
    }
    Ok(stats)
}

struct PendingSource {
    source: Source,
    centroid_converged: bool,
}

/// Back half shared by both entry points: centroid refinement, ordering,
/// id assignment and photometry.
fn finish(
    image: &PixelImage,
    config: &PipelineConfig,
    candidates: Vec<Candidate>,
    mut warnings: Vec<Warning>,
) -> Result<PipelineResult> {
    let mut pending: Vec<PendingSource> = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let mut reject = candidate.reject_reason;
        let mut x = candidate.peak_x as f64;
        let mut y = candidate.peak_y as f64;
        let mut centroid_converged = true;
        if reject.is_none() {
            match refine_centroid(image, candidate, config) {
                Some(fit) => {
                    x = fit.x;
                    y = fit.y;
                    centroid_converged = fit.converged;
                }
                // The integer peak stays as the fallback position.
                None => reject = Some(RejectReason::CentroidFailed),
            }
        }
        pending.push(PendingSource {
            source: Source {
                id: 0,
                x,
                y,
                peak_flux: candidate.peak_value,
                sharpness: candidate.sharpness,
                roundness1: candidate.roundness1,
                roundness2: candidate.roundness2,
                rejected: reject.is_some(),
                reject_reason: reject,
            },
            centroid_converged,
        });
    }

    // Brightest first; ties resolve toward the origin for a stable order.
    pending.sort_by(|a, b| {
        b.source
            .peak_flux
            .partial_cmp(&a.source.peak_flux)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.source
                    .y
                    .partial_cmp(&b.source.y)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(
                a.source
                    .x
                    .partial_cmp(&b.source.x)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    for (id, p) in pending.iter_mut().enumerate() {
        p.source.id = id;
    }
    for p in &pending {
        if !p.centroid_converged {
            warnings.push(Warning::CentroidIterationCap {
                source_id: p.source.id,
            });
        }
    }

    let mut sources: Vec<Source> = pending.into_iter().map(|p| p.source).collect();
    let mut photometry = Vec::new();
    for source in sources.iter_mut().filter(|s| s.is_accepted()) {
        match photometry::measure(image, source, config) {
            Ok((result, background)) => {
                if !background.converged {
                    warnings.push(Warning::AnnulusClipCap {
                        source_id: source.id,
                    });
                }
                photometry.push(result);
            }
            Err(err) => {
                warn!(source_id = source.id, error = %err, "photometry failed, rejecting source");
                source.rejected = true;
                source.reject_reason = Some(RejectReason::PhotometryFailed);
                warnings.push(Warning::PhotometryFailed {
                    source_id: source.id,
                });
            }
        }
    }

    let accepted = sources.iter().filter(|s| s.is_accepted()).count();
    if accepted == 0 {
        warnings.push(Warning::NoSourcesFound);
    }
    info!(
        total = sources.len(),
        accepted,
        measured = photometry.len(),
        warnings = warnings.len(),
        "source extraction complete"
    );
    Ok(PipelineResult {
        sources,
        photometry,
        warnings,
    })
}
