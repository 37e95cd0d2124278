use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

use super::kernel::GaussianKernel;

/// Convolve an image with the matched-filter kernel.
///
/// Out-of-bounds taps mirror about the image edge without repeating the edge
/// pixel, so border responses stay comparable to the interior. Large images
/// convolve rows in parallel; both paths produce identical output.
pub fn convolve_response(data: &Array2<f32>, kernel: &GaussianKernel) -> Array2<f64> {
    let (h, w) = data.dim();

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f64>> = (0..h)
            .into_par_iter()
            .map(|row| convolve_row(data, kernel, row))
            .collect();

        let mut result = Array2::<f64>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    } else {
        let mut result = Array2::<f64>::zeros((h, w));
        for row in 0..h {
            for (col, val) in convolve_row(data, kernel, row).into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    }
}

fn convolve_row(data: &Array2<f32>, kernel: &GaussianKernel, row: usize) -> Vec<f64> {
    let (h, w) = data.dim();
    let hw = kernel.half_width as isize;

    (0..w)
        .map(|col| {
            let mut sum = 0.0_f64;
            for ky in -hw..=hw {
                let src_row = reflect_index(row as isize + ky, h);
                for kx in -hw..=hw {
                    let src_col = reflect_index(col as isize + kx, w);
                    let kv = kernel.values[[(ky + hw) as usize, (kx + hw) as usize]];
                    sum += data[[src_row, src_col]] as f64 * kv;
                }
            }
            sum
        })
        .collect()
}

/// Mirror an index about the array edges without repeating the edge element.
///
/// For n = 5: -2 -> 2, -1 -> 1, 5 -> 3, 6 -> 2. Folds repeatedly when the
/// kernel is wider than the array.
fn reflect_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}
