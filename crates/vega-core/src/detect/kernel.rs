use ndarray::Array2;

use crate::consts::{FWHM_TO_SIGMA, KERNEL_HALF_WIDTH_FWHM, MIN_KERNEL_HALF_WIDTH};

/// Normalized circular Gaussian kernel used as the matched filter.
///
/// The kernel is square with side `2 * half_width + 1` and its weights sum
/// to 1, so convolving a flat field leaves the level unchanged.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    /// Kernel weights, shape = (size, size).
    pub values: Array2<f64>,
    /// Distance from the center tap to the edge, in pixels.
    pub half_width: usize,
    /// Gaussian sigma derived from the configured FWHM.
    pub sigma: f64,
}

impl GaussianKernel {
    /// Build the kernel for the expected stellar FWHM.
    ///
    /// Expects a validated, positive FWHM; the half-width is about twice the
    /// FWHM so the footprint covers the full profile.
    pub fn new(fwhm: f64) -> Self {
        let sigma = fwhm * FWHM_TO_SIGMA;
        let half_width =
            ((fwhm * KERNEL_HALF_WIDTH_FWHM).ceil() as usize).max(MIN_KERNEL_HALF_WIDTH);
        let size = 2 * half_width + 1;
        let s2 = 2.0 * sigma * sigma;

        let mut values = Array2::<f64>::zeros((size, size));
        let mut sum = 0.0;
        for row in 0..size {
            for col in 0..size {
                let dy = row as f64 - half_width as f64;
                let dx = col as f64 - half_width as f64;
                let v = (-(dx * dx + dy * dy) / s2).exp();
                values[[row, col]] = v;
                sum += v;
            }
        }
        values.mapv_inplace(|v| v / sum);

        Self {
            values,
            half_width,
            sigma,
        }
    }

    /// Kernel side length in pixels.
    pub fn size(&self) -> usize {
        2 * self.half_width + 1
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let kernel = GaussianKernel::new(3.0);
        assert_relative_eq!(kernel.values.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn fwhm_3_gives_13x13() {
        let kernel = GaussianKernel::new(3.0);
        assert_eq!(kernel.half_width, 6);
        assert_eq!(kernel.size(), 13);
        assert_eq!(kernel.values.dim(), (13, 13));
    }

    #[test]
    fn tiny_fwhm_still_has_a_neighborhood() {
        let kernel = GaussianKernel::new(0.4);
        assert_eq!(kernel.half_width, 2);
    }

    #[test]
    fn kernel_is_symmetric_and_peaks_at_center() {
        let kernel = GaussianKernel::new(2.5);
        let hw = kernel.half_width;
        let center = kernel.values[[hw, hw]];
        for row in 0..kernel.size() {
            for col in 0..kernel.size() {
                let mirrored = kernel.values[[2 * hw - row, 2 * hw - col]];
                assert_relative_eq!(kernel.values[[row, col]], mirrored, epsilon = 1e-15);
                assert!(kernel.values[[row, col]] <= center);
            }
        }
    }

    #[test]
    fn sigma_tracks_fwhm() {
        let kernel = GaussianKernel::new(2.354_820_045_030_949);
        assert_relative_eq!(kernel.sigma, 1.0, epsilon = 1e-12);
    }
}
