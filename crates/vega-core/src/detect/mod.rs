pub mod convolve;
pub mod finder;
pub mod kernel;

pub use finder::detect;
pub use kernel::GaussianKernel;
