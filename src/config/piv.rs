use crate::pass::ParallelOptions;
use crate::PivParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to write the result (or the full report with `diagnostics`).
    pub json_out: Option<PathBuf>,
    /// Write the per-pass trace alongside the result.
    pub diagnostics: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    pub enabled: bool,
    pub min_points: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: cfg!(feature = "parallel"),
            min_points: 64,
        }
    }
}

impl ParallelConfig {
    pub fn to_options(&self) -> ParallelOptions {
        ParallelOptions::new(self.enabled, self.min_points)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    pub image_a: PathBuf,
    pub image_b: PathBuf,
    #[serde(default)]
    pub mask: Option<PathBuf>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub piv_params: PivParams,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&contents).map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

fn parse_config(contents: &str) -> Result<RuntimeConfig, serde_json::Error> {
    serde_json::from_str(contents)
}
