//! Result artifact generation.
//!
//! Renders a request's final item set into a CSV file under the configured
//! output directory and returns its path for storage on the request.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::request::ProcessingRequest;

/// Header row of the generated artifact.
const ARTIFACT_HEADER: [&str; 4] = [
    "S. No.",
    "Product Name",
    "Input Image Urls",
    "Output Image Urls",
];

/// Error type for artifact generation.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Artifact generation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactConfig {
    /// Directory where generated CSV files are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

/// Renders completed requests into downloadable CSV artifacts.
pub struct ArtifactGenerator {
    config: ArtifactConfig,
}

impl ArtifactGenerator {
    pub fn new(config: ArtifactConfig) -> Self {
        Self { config }
    }

    /// Render the request's items into `output_<request_id>.csv` and return
    /// the file path. Item order matches manifest row order.
    pub fn generate(&self, request: &ProcessingRequest) -> Result<String, ArtifactError> {
        fs::create_dir_all(&self.config.output_dir)?;

        let mut content = String::new();
        content.push_str(&render_row(&ARTIFACT_HEADER));
        for item in &request.items {
            content.push_str(&render_row(&[
                &item.serial_number,
                &item.display_name,
                &item.input_refs.join(", "),
                &item.output_refs.join(", "),
            ]));
        }

        let path = self
            .config
            .output_dir
            .join(format!("output_{}.csv", request.id));
        fs::write(&path, content)?;

        Ok(path.display().to_string())
    }
}

/// Render one CSV row with a trailing newline, quoting fields that need it.
fn render_row(fields: &[&str]) -> String {
    let mut line = String::new();
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            line.push(',');
        }
        line.push_str(&escape_field(field));
    }
    line.push('\n');
    line
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
