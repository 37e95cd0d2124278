use ndarray::Array2;

/// A single grayscale image.
///
/// Pixel values are real-valued intensities in arbitrary units. The origin
/// sits at the bottom-left corner: row 0 is the bottom row, x increases to
/// the right along columns, y increases upward along rows. Display-oriented
/// consumers with a top-left origin map a position `(x, y)` to
/// `(x, height - y)`; nothing in this crate performs that flip.
#[derive(Clone, Debug)]
pub struct PixelImage {
    /// Pixel data, row-major, shape = (height, width).
    pub data: Array2<f32>,
}

impl PixelImage {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Pixel value at integer coordinates (x = column, y = row).
    pub fn value(&self, x: usize, y: usize) -> f32 {
        self.data[[y, x]]
    }
}
