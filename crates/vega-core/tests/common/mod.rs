use vega_core::image::PixelImage;
use vega_core::synth;

/// Build a synthetic star field.
///
/// Starts from a flat background at `background`, adds zero-mean Gaussian
/// noise with `noise_sigma` (skipped when zero) from the seeded generator,
/// then injects one Gaussian star per `(x, y, amplitude, fwhm)` tuple.
pub fn star_field(
    width: usize,
    height: usize,
    background: f32,
    noise_sigma: f64,
    seed: u64,
    stars: &[(f64, f64, f64, f64)],
) -> PixelImage {
    let mut image = synth::flat_field(width, height, background);
    if noise_sigma > 0.0 {
        synth::add_noise(&mut image, noise_sigma, seed);
    }
    for &(x, y, amplitude, fwhm) in stars {
        synth::add_star(&mut image, x, y, amplitude, fwhm);
    }
    image
}

/// The 200x200 single-star field most tests share: background 100 with
/// sigma-5 noise and one FWHM-3 star of amplitude 500 at (100.3, 120.7).
pub fn single_star_field() -> PixelImage {
    star_field(200, 200, 100.0, 5.0, 42, &[(100.3, 120.7, 500.0, 3.0)])
}
