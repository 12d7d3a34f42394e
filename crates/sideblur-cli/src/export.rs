use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE_NAME: &str = "export.json";

/// Summary written next to an exported frame sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub effect: String,
    pub renderer: String,
    pub output_format: String,
    pub fps: u32,
    pub frames: Vec<FrameRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub index: usize,
    pub source: String,
    pub output: String,
    pub width: u32,
    pub height: u32,
    pub presentation_time_us: i64,
    /// True when the engine was re-configured for this frame.
    pub configured: bool,
}

/// Timestamp of frame `index` at a constant `fps`, in microseconds.
pub fn presentation_time_us(index: usize, fps: u32) -> i64 {
    index as i64 * 1_000_000 / i64::from(fps.max(1))
}

impl ExportManifest {
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("failed to write {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;
        tracing::debug!(path = %path.display(), frames = self.frames.len(), "wrote export manifest");
        Ok(())
    }
}
