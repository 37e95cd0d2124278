use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::EPSILON;
use crate::error::{Result, VegaError};

/// Robust background statistics produced by iterative sigma-clipping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackgroundStats {
    /// Mean of the surviving samples.
    pub mean: f64,
    /// Median of the surviving samples.
    pub median: f64,
    /// Standard deviation of the surviving samples. Always >= 0.
    pub stddev: f64,
    /// Number of clipping passes performed.
    pub iterations_used: usize,
    /// Number of samples rejected by clipping.
    pub pixels_masked: usize,
    /// False when the iteration cap cut clipping short while samples were
    /// still being rejected.
    pub converged: bool,
}

/// Sigma-clipped statistics over a whole image.
///
/// Non-finite pixels are dropped before clipping starts.
pub fn image_background(
    data: &Array2<f32>,
    clip_sigma: f64,
    max_iterations: usize,
) -> Result<BackgroundStats> {
    let values: Vec<f64> = data
        .iter()
        .map(|&v| v as f64)
        .filter(|v| v.is_finite())
        .collect();
    sigma_clipped_stats(&values, clip_sigma, max_iterations)
}

/// Sigma-clipped statistics over an explicit sample set.
///
/// Each pass computes mean, median and standard deviation over the unmasked
/// samples, then masks every sample whose deviation from the median exceeds
/// `clip_sigma * stddev`. Iteration stops once a pass masks nothing new or
/// `max_iterations` is reached. Fails with `InsufficientData` if a pass masks
/// every remaining sample.
pub fn sigma_clipped_stats(
    values: &[f64],
    clip_sigma: f64,
    max_iterations: usize,
) -> Result<BackgroundStats> {
    if values.is_empty() {
        return Err(VegaError::EmptySelection);
    }

    let mut mask = vec![true; values.len()];
    let (mut mean, mut median, mut stddev) = masked_moments(values, &mask);
    let mut iterations_used = 0;
    let mut converged = false;

    while iterations_used < max_iterations {
        // A zero spread cannot mask anything further.
        if stddev < EPSILON {
            converged = true;
            break;
        }

        let lo = median - clip_sigma * stddev;
        let hi = median + clip_sigma * stddev;
        let mut rejected_any = false;
        for (i, &v) in values.iter().enumerate() {
            if mask[i] && (v < lo || v > hi) {
                mask[i] = false;
                rejected_any = true;
            }
        }
        iterations_used += 1;

        if !rejected_any {
            converged = true;
            break;
        }
        if mask.iter().all(|&m| !m) {
            return Err(VegaError::InsufficientData {
                total: values.len(),
                iterations: iterations_used,
            });
        }

        let (m, md, sd) = masked_moments(values, &mask);
        mean = m;
        median = md;
        stddev = sd;
    }

    let pixels_masked = mask.iter().filter(|&&m| !m).count();
    Ok(BackgroundStats {
        mean,
        median,
        stddev,
        iterations_used,
        pixels_masked,
        converged,
    })
}

/// Mean, median and standard deviation over the unmasked samples.
fn masked_moments(values: &[f64], mask: &[bool]) -> (f64, f64, f64) {
    let mut survivors: Vec<f64> = values
        .iter()
        .zip(mask.iter())
        .filter_map(|(&v, &m)| m.then_some(v))
        .collect();
    if survivors.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let n = survivors.len() as f64;
    let mean = survivors.iter().sum::<f64>() / n;

    survivors.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = survivors.len() / 2;
    let median = if survivors.len() % 2 == 0 {
        (survivors[mid - 1] + survivors[mid]) / 2.0
    } else {
        survivors[mid]
    };

    let var = survivors.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, median, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_input_converges_immediately() {
        let values = vec![7.5; 64];
        let stats = sigma_clipped_stats(&values, 3.0, 5).unwrap();
        assert_eq!(stats.mean, 7.5);
        assert_eq!(stats.median, 7.5);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.iterations_used, 0);
        assert_eq!(stats.pixels_masked, 0);
        assert!(stats.converged);
    }

    #[test]
    fn single_outlier_is_masked() {
        let mut values = vec![10.0; 100];
        values[42] = 10_000.0;
        let stats = sigma_clipped_stats(&values, 3.0, 5).unwrap();
        assert_eq!(stats.pixels_masked, 1);
        assert!((stats.mean - 10.0).abs() < 1e-9);
        assert!(stats.converged);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = sigma_clipped_stats(&[], 3.0, 5).unwrap_err();
        assert!(matches!(err, VegaError::EmptySelection));
    }

    #[test]
    fn two_samples_with_tight_clip_mask_everything() {
        // Both samples sit exactly one stddev from the median, so a clip
        // threshold below 1 rejects the pair at once.
        let err = sigma_clipped_stats(&[0.0, 10.0], 0.5, 5).unwrap_err();
        assert!(matches!(err, VegaError::InsufficientData { total: 2, .. }));
    }

    #[test]
    fn even_count_median_averages_middle_pair() {
        let values = vec![1.0, 2.0, 3.0, 10.0];
        let stats = sigma_clipped_stats(&values, 100.0, 1).unwrap();
        assert!((stats.median - 2.5).abs() < 1e-12);
    }

    #[test]
    fn non_finite_pixels_are_dropped_from_image_stats() {
        let mut data = Array2::from_elem((8, 8), 5.0f32);
        data[[3, 3]] = f32::NAN;
        data[[4, 4]] = f32::INFINITY;
        let stats = image_background(&data, 3.0, 5).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.pixels_masked, 0);
    }
}
