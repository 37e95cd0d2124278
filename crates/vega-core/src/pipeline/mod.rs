mod runner;
mod types;

pub use runner::{run, run_tiled};
pub use types::{PipelineResult, Warning};
