use ndarray::Array2;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::consts::{EPSILON, SHARPNESS_RADIUS_SIGMA};
use crate::image::PixelImage;
use crate::source::{Candidate, RejectReason};
use crate::stats::BackgroundStats;

use super::convolve::convolve_response;
use super::kernel::GaussianKernel;

/// Detect candidate point sources on the matched-filter response surface.
///
/// Expects a validated config. Returns candidates in row-major scan order
/// with shape and duplicate rejection already applied; rejected candidates
/// stay in the list with their reason set.
pub fn detect(
    image: &PixelImage,
    stats: &BackgroundStats,
    config: &PipelineConfig,
) -> Vec<Candidate> {
    let kernel = GaussianKernel::new(config.fwhm);
    let response = convolve_response(&image.data, &kernel);
    let threshold = stats.mean + config.threshold_nsigma * stats.stddev;

    let mut candidates = scan_peaks(&image.data, &response, &kernel, threshold, stats.median);
    debug!(raw = candidates.len(), threshold, "peak scan complete");

    apply_shape_bounds(&mut candidates, config);
    apply_min_separation(&mut candidates, config.min_separation);
    candidates
}

/// Scan the whole response surface for thresholded strict local maxima and
/// compute each peak's shape statistics.
pub(crate) fn scan_peaks(
    data: &Array2<f32>,
    response: &Array2<f64>,
    kernel: &GaussianKernel,
    threshold: f64,
    background_median: f64,
) -> Vec<Candidate> {
    let rows = 0..data.dim().0;
    scan_peak_rows(data, response, kernel, threshold, background_median, rows)
}

/// Peak scan restricted to a row range. The tiled runner scans only the rows
/// a band owns while its neighbors cover the band's overlap.
pub(crate) fn scan_peak_rows(
    data: &Array2<f32>,
    response: &Array2<f64>,
    kernel: &GaussianKernel,
    threshold: f64,
    background_median: f64,
    rows: std::ops::Range<usize>,
) -> Vec<Candidate> {
    let w = data.dim().1;
    let mut candidates = Vec::new();

    for row in rows {
        for col in 0..w {
            let peak_response = response[[row, col]];
            if peak_response <= threshold || !is_local_max(response, row, col) {
                continue;
            }

            let (sharpness, roundness1, roundness2) =
                shape_stats(data, kernel, background_median, peak_response, row, col);
            candidates.push(Candidate {
                peak_x: col,
                peak_y: row,
                peak_value: data[[row, col]] as f64,
                response: peak_response,
                sharpness,
                roundness1,
                roundness2,
                reject_reason: None,
            });
        }
    }
    candidates
}

/// Strict maximum over the in-bounds 8-neighborhood of the response surface.
fn is_local_max(response: &Array2<f64>, row: usize, col: usize) -> bool {
    let (h, w) = response.dim();
    let center = response[[row, col]];

    for dy in -1..=1_isize {
        for dx in -1..=1_isize {
            if dy == 0 && dx == 0 {
                continue;
            }
            let r = row as isize + dy;
            let c = col as isize + dx;
            if r < 0 || c < 0 || r >= h as isize || c >= w as isize {
                continue;
            }
            if response[[r as usize, c as usize]] >= center {
                return false;
            }
        }
    }
    true
}

/// Sharpness and roundness statistics for one peak.
///
/// Sharpness compares the raw peak against the mean of the punctured disk of
/// raw neighbors hugging the core (radius ~1.5 sigma), scaled by the
/// matched-filter response: flat blobs score near zero, single hot pixels
/// score far above one. Roundness compares background-subtracted second
/// moments along the pixel axes (roundness1) and along the diagonals
/// (roundness2); a circularly symmetric source scores near zero on both,
/// while streaks push one of the two ratios away from zero.
fn shape_stats(
    data: &Array2<f32>,
    kernel: &GaussianKernel,
    background_median: f64,
    peak_response: f64,
    row: usize,
    col: usize,
) -> (f64, f64, f64) {
    let (h, w) = data.dim();
    let hw = kernel.half_width as isize;
    let ring_radius =
        ((SHARPNESS_RADIUS_SIGMA * kernel.sigma).ceil() as usize).clamp(1, kernel.half_width);
    let ring_r2 = (ring_radius * ring_radius) as f64;

    let mut ring_sum = 0.0;
    let mut ring_count = 0usize;

    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sd1 = 0.0;
    let mut sd2 = 0.0;
    let mut weight_sum = 0.0;

    for dy in -hw..=hw {
        let r = row as isize + dy;
        if r < 0 || r >= h as isize {
            continue;
        }
        for dx in -hw..=hw {
            let c = col as isize + dx;
            if c < 0 || c >= w as isize {
                continue;
            }
            let v = data[[r as usize, c as usize]] as f64;
            if !v.is_finite() {
                continue;
            }

            let d2 = (dx * dx + dy * dy) as f64;
            if d2 > 0.0 && d2 <= ring_r2 {
                ring_sum += v;
                ring_count += 1;
            }

            let weight = (v - background_median).max(0.0);
            let fx = dx as f64;
            let fy = dy as f64;
            sx += weight * fx * fx;
            sy += weight * fy * fy;
            // Diagonal axes; the common sqrt(2) scale cancels in the ratio.
            let u = fx + fy;
            let t = fx - fy;
            sd1 += weight * u * u;
            sd2 += weight * t * t;
            weight_sum += weight;
        }
    }

    let sharpness = if ring_count > 0 && peak_response.abs() > EPSILON {
        let ring_mean = ring_sum / ring_count as f64;
        (data[[row, col]] as f64 - ring_mean) / peak_response
    } else {
        0.0
    };

    (
        sharpness,
        moment_ratio(sx, sy, weight_sum),
        moment_ratio(sd1, sd2, weight_sum),
    )
}

/// Normalized spread asymmetry between two perpendicular axes, in [-2, 2].
fn moment_ratio(a: f64, b: f64, weight_sum: f64) -> f64 {
    if weight_sum <= EPSILON || a + b <= EPSILON {
        return 0.0;
    }
    2.0 * (a - b) / (a + b)
}

/// Mark candidates whose sharpness or roundness falls outside the configured
/// acceptance bounds.
pub(crate) fn apply_shape_bounds(candidates: &mut [Candidate], config: &PipelineConfig) {
    for c in candidates.iter_mut() {
        let sharp_ok = c.sharpness >= config.sharp_lo && c.sharpness <= config.sharp_hi;
        let round_ok = c.roundness1 >= config.round_lo
            && c.roundness1 <= config.round_hi
            && c.roundness2 >= config.round_lo
            && c.roundness2 <= config.round_hi;
        if !(sharp_ok && round_ok) {
            c.reject_reason = Some(RejectReason::Shape);
        }
    }
}

/// Suppress near-coincident detections, keeping the brightest.
///
/// Precedence among surviving candidates: higher peak value, then lower row,
/// then lower column. Candidates already rejected for shape do not suppress
/// their neighbors.
pub(crate) fn apply_min_separation(candidates: &mut [Candidate], min_separation: f64) {
    if min_separation <= 0.0 {
        return;
    }
    let sep2 = min_separation * min_separation;

    let mut order: Vec<usize> = (0..candidates.len())
        .filter(|&i| candidates[i].reject_reason.is_none())
        .collect();
    order.sort_by(|&a, &b| {
        let ca = &candidates[a];
        let cb = &candidates[b];
        cb.peak_value
            .partial_cmp(&ca.peak_value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ca.peak_y.cmp(&cb.peak_y))
            .then(ca.peak_x.cmp(&cb.peak_x))
    });

    let mut kept: Vec<(f64, f64)> = Vec::new();
    for idx in order {
        let px = candidates[idx].peak_x as f64;
        let py = candidates[idx].peak_y as f64;
        let crowded = kept.iter().any(|&(kx, ky)| {
            let dx = px - kx;
            let dy = py - ky;
            dx * dx + dy * dy < sep2
        });
        if crowded {
            candidates[idx].reject_reason = Some(RejectReason::Duplicate);
        } else {
            kept.push((px, py));
        }
    }
}
