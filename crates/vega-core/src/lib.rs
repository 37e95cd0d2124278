pub mod error;
pub mod consts;
pub mod image;
pub mod config;
pub mod stats;
pub mod source;
pub mod detect;
pub mod centroid;
pub mod photometry;
pub mod pipeline;
pub mod export;
pub mod synth;
