use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::consts::FWHM_TO_SIGMA;
use crate::image::PixelImage;

/// Image filled with a uniform background level.
pub fn flat_field(width: usize, height: usize, level: f32) -> PixelImage {
    PixelImage::new(Array2::from_elem((height, width), level))
}

/// Add a circular Gaussian profile with the given peak amplitude centered
/// on sub-pixel coordinates (x, y).
pub fn add_star(image: &mut PixelImage, x: f64, y: f64, amplitude: f64, fwhm: f64) {
    let sigma = fwhm * FWHM_TO_SIGMA;
    let denom = 2.0 * sigma * sigma;
    let (h, w) = image.data.dim();

    for row in 0..h {
        let dy = row as f64 - y;
        for col in 0..w {
            let dx = col as f64 - x;
            let value = amplitude * (-(dx * dx + dy * dy) / denom).exp();
            image.data[[row, col]] += value as f32;
        }
    }
}

/// Add zero-mean Gaussian noise from a seeded generator, so test images
/// are reproducible across runs and platforms.
///
/// A non-finite or negative sigma leaves the image unchanged.
pub fn add_noise(image: &mut PixelImage, sigma: f64, seed: u64) {
    let normal = match Normal::new(0.0, sigma) {
        Ok(n) => n,
        Err(_) => return,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for v in image.data.iter_mut() {
        *v += normal.sample(&mut rng) as f32;
    }
}

/// Total flux of a circular Gaussian profile: amplitude * 2 * pi * sigma^2.
pub fn gaussian_total_flux(amplitude: f64, fwhm: f64) -> f64 {
    let sigma = fwhm * FWHM_TO_SIGMA;
    amplitude * 2.0 * std::f64::consts::PI * sigma * sigma
}
