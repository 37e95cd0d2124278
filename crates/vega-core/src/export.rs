use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::pipeline::PipelineResult;

/// Write accepted source positions as `x,y` lines, brightest first.
///
/// Three decimal places hold more than the sub-pixel precision the centroid
/// stage delivers.
pub fn write_positions(result: &PipelineResult, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for source in result.accepted() {
        writeln!(writer, "{:.3},{:.3}", source.x, source.y)?;
    }
    writer.flush()?;
    info!(
        path = %path.display(),
        sources = result.accepted_count(),
        "positions exported"
    );
    Ok(())
}
