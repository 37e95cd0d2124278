use crate::config::PipelineConfig;
use crate::image::PixelImage;
use crate::source::Candidate;
use crate::stats::sigma_clipped_stats;

/// Outcome of iterative centroid refinement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CentroidFit {
    pub x: f64,
    pub y: f64,
    pub iterations: usize,
    /// False when the iteration cap was reached before the shift dropped
    /// below the configured epsilon.
    pub converged: bool,
}

/// Refine a candidate's integer peak to sub-pixel precision.
///
/// Computes the intensity-weighted first moment of the positive signal in a
/// window around the current position, after subtracting the window's
/// sigma-clipped median, then re-centers the window and repeats. Returns
/// `None` when the window holds no positive signal above the local
/// background, which marks the detection as unfittable.
pub fn refine_centroid(
    image: &PixelImage,
    candidate: &Candidate,
    config: &PipelineConfig,
) -> Option<CentroidFit> {
    let (h, w) = image.data.dim();
    let half_width = (config.fwhm.ceil() as isize).max(2);

    let mut cx = candidate.peak_x as f64;
    let mut cy = candidate.peak_y as f64;
    let mut iterations = 0;
    let mut converged = false;

    for iter in 1..=config.max_centroid_iterations {
        iterations = iter;
        let row = cy.round() as isize;
        let col = cx.round() as isize;
        let r0 = (row - half_width).max(0) as usize;
        let r1 = (row + half_width).min(h as isize - 1) as usize;
        let c0 = (col - half_width).max(0) as usize;
        let c1 = (col + half_width).min(w as isize - 1) as usize;

        let mut window = Vec::with_capacity((r1 - r0 + 1) * (c1 - c0 + 1));
        for r in r0..=r1 {
            for c in c0..=c1 {
                let v = image.data[[r, c]] as f64;
                if v.is_finite() {
                    window.push(v);
                }
            }
        }
        let local =
            sigma_clipped_stats(&window, config.clip_sigma, config.clip_max_iterations).ok()?;

        let mut weight_sum = 0.0;
        let mut x_sum = 0.0;
        let mut y_sum = 0.0;
        for r in r0..=r1 {
            for c in c0..=c1 {
                let v = image.data[[r, c]] as f64;
                if !v.is_finite() {
                    continue;
                }
                let weight = (v - local.median).max(0.0);
                weight_sum += weight;
                x_sum += weight * c as f64;
                y_sum += weight * r as f64;
            }
        }
        if weight_sum <= 0.0 {
            return None;
        }

        let nx = x_sum / weight_sum;
        let ny = y_sum / weight_sum;
        let shift = ((nx - cx).powi(2) + (ny - cy).powi(2)).sqrt();
        cx = nx;
        cy = ny;
        if shift < config.centroid_epsilon {
            converged = true;
            break;
        }
    }

    Some(CentroidFit {
        x: cx,
        y: cy,
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Candidate;
    use crate::synth;

    fn peak_at(x: usize, y: usize) -> Candidate {
        Candidate {
            peak_x: x,
            peak_y: y,
            peak_value: 0.0,
            response: 0.0,
            sharpness: 0.5,
            roundness1: 0.0,
            roundness2: 0.0,
            reject_reason: None,
        }
    }

    #[test]
    fn recovers_subpixel_position_of_clean_star() {
        let mut image = synth::flat_field(40, 40, 100.0);
        synth::add_star(&mut image, 20.3, 18.6, 500.0, 3.0);

        let config = PipelineConfig::default();
        let fit = refine_centroid(&image, &peak_at(20, 19), &config).unwrap();

        assert!(fit.converged);
        assert!((fit.x - 20.3).abs() < 0.1, "x = {}", fit.x);
        assert!((fit.y - 18.6).abs() < 0.1, "y = {}", fit.y);
    }

    #[test]
    fn flat_window_has_no_signal_to_fit() {
        let image = synth::flat_field(30, 30, 100.0);
        let config = PipelineConfig::default();
        assert!(refine_centroid(&image, &peak_at(15, 15), &config).is_none());
    }

    #[test]
    fn iteration_cap_reported_as_unconverged() {
        let mut image = synth::flat_field(40, 40, 100.0);
        synth::add_star(&mut image, 20.4, 20.0, 500.0, 3.0);

        let config = PipelineConfig {
            max_centroid_iterations: 1,
            centroid_epsilon: 1e-9,
            ..PipelineConfig::default()
        };
        let fit = refine_centroid(&image, &peak_at(20, 20), &config).unwrap();

        assert_eq!(fit.iterations, 1);
        assert!(!fit.converged);
    }

    #[test]
    fn window_clips_at_image_border() {
        let mut image = synth::flat_field(30, 30, 100.0);
        synth::add_star(&mut image, 1.2, 1.4, 400.0, 3.0);

        let config = PipelineConfig::default();
        let fit = refine_centroid(&image, &peak_at(1, 1), &config).unwrap();

        assert!(fit.x >= 0.0 && fit.y >= 0.0);
        assert!((fit.x - 1.2).abs() < 0.5, "x = {}", fit.x);
        assert!((fit.y - 1.4).abs() < 0.5, "y = {}", fit.y);
    }
}
