use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use super::{Tool, ToolDefinition};
use crate::utils::pdf::DocumentLoader;

/// Upper bound on the characters handed back to the model.
pub const MAX_TEXT_CHARS: usize = 8000;

pub static READ_DATA_TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: "read_data_tool".to_string(),
    description:
        "Extracts text from a LOCAL PDF. The path must be a local string, not a URL.".to_string(),
    input_schema: json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "The absolute LOCAL file path to the PDF."
            }
        },
        "required": ["path"]
    }),
});

#[derive(Debug, Deserialize)]
struct ReadDataParams {
    path: String,
}

#[derive(Debug, Error)]
pub enum ReadDataError {
    #[error("Error: This tool only reads local PDFs. Do not use URLs.")]
    InvalidUrl,

    #[error("Error: File not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Error reading PDF: {0}")]
    ParseFailure(String),

    #[error("The document is empty.")]
    Empty,
}

pub struct ReadDataTool {
    loader: Arc<dyn DocumentLoader>,
}

impl ReadDataTool {
    pub fn with_loader(loader: Arc<dyn DocumentLoader>) -> Self {
        Self { loader }
    }

    /// Extracts at most [`MAX_TEXT_CHARS`] characters of text from the PDF at `path`.
    pub fn read(&self, path: &str) -> Result<String, ReadDataError> {
        let clean_path = clean_path(path);

        if clean_path.starts_with("http") {
            warn!("Refusing to read remote document: {}", clean_path);
            return Err(ReadDataError::InvalidUrl);
        }

        let normalized_path = PathBuf::from(clean_path);
        if !normalized_path.exists() {
            return Err(ReadDataError::NotFound(normalized_path));
        }

        let pages = self
            .loader
            .load(&normalized_path)
            .map_err(|e| ReadDataError::ParseFailure(e.to_string()))?;

        let full_text = pages
            .iter()
            .map(|page| page.page_content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if full_text.trim().is_empty() {
            return Err(ReadDataError::Empty);
        }

        info!(
            "Extracted {} pages from {}",
            pages.len(),
            normalized_path.display()
        );

        Ok(truncate_chars(&full_text, MAX_TEXT_CHARS))
    }

    /// Same as [`ReadDataTool::read`], flattened into the text the model sees.
    pub fn invoke(&self, path: &str) -> String {
        match self.read(path) {
            Ok(text) => text,
            Err(e) => {
                if matches!(e, ReadDataError::ParseFailure(_)) {
                    error!("PDF extraction failed for {}: {}", path, e);
                }
                e.to_string()
            }
        }
    }
}

impl Tool for ReadDataTool {
    fn definition(&self) -> &ToolDefinition {
        &READ_DATA_TOOL_DEFINITION
    }

    fn call(&self, arguments: Option<serde_json::Value>) -> String {
        let params = match arguments {
            Some(args) => match serde_json::from_value::<ReadDataParams>(args) {
                Ok(params) => params,
                Err(e) => {
                    error!("Invalid read_data_tool parameters: {}", e);
                    return format!("Error: Invalid parameters: {}", e);
                }
            },
            None => return "Error: Missing required parameters".to_string(),
        };

        self.invoke(&params.path)
    }
}

/// Strips surrounding whitespace and every quote character the model may have added.
fn clean_path(path: &str) -> String {
    path.trim().replace(['"', '\''], "")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
