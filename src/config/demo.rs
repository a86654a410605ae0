use crate::error::{Error, Result};
use crate::pipeline::PipelineParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Both,
}

impl OutputFormat {
    pub fn includes_text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }

    pub fn includes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_out: Option<PathBuf>,
    /// Directory receiving per-stage JSON files and DEM images.
    pub debug_dir: Option<PathBuf>,
    pub format: OutputFormat,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DemoConfig {
    /// Text file with one `x y z` point per line.
    pub input_path: PathBuf,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineParams,
}

pub fn load_config(path: &Path) -> Result<DemoConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read config {}: {e}", path.display())))?;
    let config: DemoConfig = serde_json::from_str(&contents)
        .map_err(|e| Error::Config(format!("failed to parse config {}: {e}", path.display())))?;
    config.pipeline.validate()?;
    Ok(config)
}
