use std::f64::consts::PI;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::image::PixelImage;
use crate::source::{PhotometryResult, Source};
use crate::stats::{sigma_clipped_stats, BackgroundStats};

/// Measure one source: annulus background, exact aperture flux, net flux
/// and its uncertainty. Returns the annulus statistics alongside the
/// photometry so the caller can inspect clipping convergence.
pub fn measure(
    image: &PixelImage,
    source: &Source,
    config: &PipelineConfig,
) -> Result<(PhotometryResult, BackgroundStats)> {
    let values = annulus_values(
        image,
        source.x,
        source.y,
        config.bg_inner_radius,
        config.bg_outer_radius,
    );
    let background = sigma_clipped_stats(&values, config.clip_sigma, config.clip_max_iterations)?;

    let aperture = aperture_flux(image, source.x, source.y, config.aperture_radius);
    let net_flux = aperture.flux - background.median * aperture.area;
    let background_variance = background.stddev * background.stddev;
    let flux_uncertainty = (net_flux.max(0.0) + aperture.area * background_variance).sqrt();

    Ok((
        PhotometryResult {
            source_id: source.id,
            raw_flux: aperture.flux,
            background_level: background.median,
            net_flux,
            flux_uncertainty,
            aperture_area: aperture.area,
        },
        background,
    ))
}

/// Weighted flux and effective pixel area inside a circular aperture.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ApertureSum {
    pub flux: f64,
    pub area: f64,
}

/// Sum pixel values inside the aperture, weighting each pixel by its exact
/// geometric overlap with the circle. Pixels beyond the image border and
/// non-finite pixels contribute neither flux nor area, so the reported area
/// shrinks for edge-clipped apertures.
pub(crate) fn aperture_flux(image: &PixelImage, cx: f64, cy: f64, radius: f64) -> ApertureSum {
    let (h, w) = image.data.dim();
    let r_lo = (cy - radius).floor() as isize;
    let r_hi = (cy + radius).ceil() as isize;
    let c_lo = (cx - radius).floor() as isize;
    let c_hi = (cx + radius).ceil() as isize;

    let mut flux = 0.0;
    let mut area = 0.0;
    for row in r_lo.max(0)..=r_hi.min(h as isize - 1) {
        for col in c_lo.max(0)..=c_hi.min(w as isize - 1) {
            let fraction = pixel_overlap(cx, cy, radius, col as usize, row as usize);
            if fraction <= 0.0 {
                continue;
            }
            let v = image.data[[row as usize, col as usize]] as f64;
            if !v.is_finite() {
                continue;
            }
            flux += fraction * v;
            area += fraction;
        }
    }
    ApertureSum { flux, area }
}

/// Finite pixel values whose centers fall inside the background annulus.
pub(crate) fn annulus_values(
    image: &PixelImage,
    cx: f64,
    cy: f64,
    inner: f64,
    outer: f64,
) -> Vec<f64> {
    let (h, w) = image.data.dim();
    let r_lo = (cy - outer).floor() as isize;
    let r_hi = (cy + outer).ceil() as isize;
    let c_lo = (cx - outer).floor() as isize;
    let c_hi = (cx + outer).ceil() as isize;
    let inner2 = inner * inner;
    let outer2 = outer * outer;

    let mut values = Vec::new();
    for row in r_lo.max(0)..=r_hi.min(h as isize - 1) {
        for col in c_lo.max(0)..=c_hi.min(w as isize - 1) {
            let dx = col as f64 - cx;
            let dy = row as f64 - cy;
            let d2 = dx * dx + dy * dy;
            if d2 < inner2 || d2 > outer2 {
                continue;
            }
            let v = image.data[[row as usize, col as usize]] as f64;
            if v.is_finite() {
                values.push(v);
            }
        }
    }
    values
}

/// Exact overlap fraction between the unit pixel centered on (col, row) and
/// a circle of the given radius centered on (cx, cy).
pub(crate) fn pixel_overlap(cx: f64, cy: f64, radius: f64, col: usize, row: usize) -> f64 {
    let x0 = col as f64 - 0.5 - cx;
    let y0 = row as f64 - 0.5 - cy;
    rect_overlap(x0, x0 + 1.0, y0, y0 + 1.0, radius)
}

/// Area of the intersection of the rectangle [x0, x1] x [y0, y1] with a disk
/// of the given radius centered on the origin.
fn rect_overlap(x0: f64, x1: f64, y0: f64, y1: f64, r: f64) -> f64 {
    let r2 = r * r;

    // Nearest point of the rectangle lies outside the disk.
    let dx = if x0 > 0.0 {
        x0
    } else if x1 < 0.0 {
        -x1
    } else {
        0.0
    };
    let dy = if y0 > 0.0 {
        y0
    } else if y1 < 0.0 {
        -y1
    } else {
        0.0
    };
    if dx * dx + dy * dy >= r2 {
        return 0.0;
    }

    // Farthest corner lies inside the disk.
    let fx = x0.abs().max(x1.abs());
    let fy = y0.abs().max(y1.abs());
    if fx * fx + fy * fy <= r2 {
        return (x1 - x0) * (y1 - y0);
    }

    corner_area(x1, y1, r) - corner_area(x0, y1, r) - corner_area(x1, y0, r)
        + corner_area(x0, y0, r)
}

/// Area of the disk region { X <= a, Y <= b } for a disk of radius r at the
/// origin. Inclusion-exclusion over four of these corners yields any
/// axis-aligned rectangle's overlap.
fn corner_area(a: f64, b: f64, r: f64) -> f64 {
    if a <= -r || b <= -r {
        return 0.0;
    }
    if a >= r && b >= r {
        return PI * r * r;
    }
    let a = a.min(r);
    if b >= r {
        return chord_area(a, r);
    }

    // |b| < r: the horizontal cut meets the circle at +/- xb.
    let xb = (r * r - b * b).sqrt();
    if b >= 0.0 {
        if a <= -xb {
            return chord_area(a, r);
        }
        let mut area =
            chord_area(-xb, r) + strip_area(a.min(xb), b, r) - strip_area(-xb, b, r);
        if a > xb {
            area += chord_area(a, r) - chord_area(xb, r);
        }
        area
    } else if a <= -xb {
        0.0
    } else {
        strip_area(a.min(xb), b, r) - strip_area(-xb, b, r)
    }
}

/// Area of the disk left of the vertical line X = x. Zero at x = -r, the
/// full disk at x = r.
fn chord_area(x: f64, r: f64) -> f64 {
    let g = (r * r - x * x).max(0.0).sqrt();
    x * g + r * r * clamped_asin(x / r) + 0.5 * PI * r * r
}

/// Antiderivative of (b + sqrt(r^2 - X^2)) in X, valid for |x| <= r.
fn strip_area(x: f64, b: f64, r: f64) -> f64 {
    let g = (r * r - x * x).max(0.0).sqrt();
    b * x + 0.5 * (x * g + r * r * clamped_asin(x / r))
}

/// Rounding can push the ratio a hair past 1 at the circle's extremes.
fn clamped_asin(t: f64) -> f64 {
    t.clamp(-1.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::config::PipelineConfig;
    use crate::consts::FWHM_TO_SIGMA;
    use crate::error::VegaError;
    use crate::source::{RejectReason, Source};
    use crate::synth;

    fn source_at(x: f64, y: f64) -> Source {
        Source {
            id: 0,
            x,
            y,
            peak_flux: 0.0,
            sharpness: 0.5,
            roundness1: 0.0,
            roundness2: 0.0,
            rejected: false,
            reject_reason: None,
        }
    }

    #[test]
    fn corner_area_matches_circular_segment() {
        // { X <= 1, Y <= -0.5 } of the unit disk is the segment below -0.5.
        let d: f64 = 0.5;
        let expected = d.acos() - d * (1.0 - d * d).sqrt();
        assert_relative_eq!(corner_area(1.0, -0.5, 1.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn corner_area_limit_cases() {
        assert_relative_eq!(corner_area(2.0, 2.0, 1.0), PI, epsilon = 1e-12);
        assert_relative_eq!(corner_area(0.0, 0.0, 1.0), PI / 4.0, epsilon = 1e-12);
        assert_eq!(corner_area(-1.5, 0.0, 1.0), 0.0);
        assert_eq!(corner_area(0.0, -1.0, 1.0), 0.0);
    }

    #[test]
    fn overlaps_tile_the_circle_exactly() {
        for &(cx, cy, r) in &[(10.0, 10.0, 2.5), (10.25, 9.6, 2.5), (9.5, 10.5, 3.7)] {
            let mut total = 0.0;
            for row in 0..20 {
                for col in 0..20 {
                    total += pixel_overlap(cx, cy, r, col, row);
                }
            }
            assert_relative_eq!(total, PI * r * r, epsilon = 1e-9);
        }
    }

    #[test]
    fn pixel_inside_and_outside() {
        assert_relative_eq!(pixel_overlap(5.3, 5.7, 3.0, 5, 6), 1.0, epsilon = 1e-12);
        assert_eq!(pixel_overlap(5.3, 5.7, 3.0, 15, 15), 0.0);
    }

    #[test]
    fn flat_field_aperture_integrates_to_circle_area() {
        let image = synth::flat_field(32, 32, 100.0);
        let sum = aperture_flux(&image, 15.2, 14.8, 4.0);
        assert_relative_eq!(sum.area, PI * 16.0, epsilon = 1e-9);
        assert_relative_eq!(sum.flux, 100.0 * PI * 16.0, epsilon = 1e-6);
    }

    #[test]
    fn measure_recovers_injected_flux() {
        let mut image = synth::flat_field(48, 48, 100.0);
        synth::add_star(&mut image, 20.3, 19.6, 500.0, 3.0);

        let config = PipelineConfig::default();
        let (phot, background) = measure(&image, &source_at(20.3, 19.6), &config).unwrap();

        let sigma = 3.0 * FWHM_TO_SIGMA;
        let injected = 500.0 * 2.0 * PI * sigma * sigma;
        assert_relative_eq!(background.median, 100.0, epsilon = 1e-3);
        assert_relative_eq!(phot.net_flux, injected, max_relative = 1e-3);
        assert!(phot.flux_uncertainty >= 0.0);
        assert!(phot.instrumental_mag().is_some());
    }

    #[test]
    fn background_offset_is_subtracted() {
        let mut image = synth::flat_field(48, 48, 250.0);
        synth::add_star(&mut image, 24.0, 24.0, 300.0, 3.0);

        let config = PipelineConfig::default();
        let (phot, _) = measure(&image, &source_at(24.0, 24.0), &config).unwrap();

        let sigma = 3.0 * FWHM_TO_SIGMA;
        let injected = 300.0 * 2.0 * PI * sigma * sigma;
        assert_relative_eq!(phot.net_flux, injected, max_relative = 1e-3);
        assert!(phot.raw_flux > phot.net_flux);
    }

    #[test]
    fn empty_annulus_is_an_error() {
        let image = synth::flat_field(8, 8, 100.0);
        let config = PipelineConfig::default();
        let result = measure(&image, &source_at(2.0, 2.0), &config);
        assert!(matches!(result, Err(VegaError::EmptySelection)));
    }

    #[test]
    fn reject_reason_display_for_failed_photometry() {
        assert_eq!(RejectReason::PhotometryFailed.to_string(), "photometry failed");
    }
}
