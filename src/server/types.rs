use serde::{Deserialize, Serialize};

pub const DEFAULT_QUERY: &str = "Analyze for investment insights";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Error,
}

/// Body of every `/analyze` response. Failures are reported here, never as HTTP errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    pub file_name: String,
    pub analysis_summary: String,
}

impl AnalysisResult {
    pub fn success(file_name: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Success,
            file_name: file_name.into(),
            analysis_summary: summary.into(),
        }
    }

    pub fn error(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Error,
            file_name: file_name.into(),
            analysis_summary: message.into(),
        }
    }
}
