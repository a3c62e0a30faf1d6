use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::Json;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use super::staging::StagedFile;
use super::types::{AnalysisResult, DEFAULT_QUERY};
use super::AppState;
use crate::crew::definitions::{analyze_task, financial_analyst};
use crate::crew::{Crew, Process};
use crate::tools::read_data_tool::ReadDataTool;
use crate::utils::pdf::{has_pdf_signature, PdfError};

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Invalid upload: {0}")]
    Multipart(String),

    #[error("No file was uploaded in the 'file' field")]
    MissingFile,

    #[error("Failed to stage upload: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Uploaded file is not a PDF document")]
    NotPdf,

    #[error("Uploaded PDF could not be read: {0}")]
    UnreadablePdf(#[from] PdfError),

    #[error("{0:#}")]
    Pipeline(#[from] anyhow::Error),

    #[error("Analysis worker failed: {0}")]
    Worker(#[from] JoinError),
}

impl From<MultipartError> for AnalyzeError {
    fn from(e: MultipartError) -> Self {
        AnalyzeError::Multipart(e.body_text())
    }
}

impl From<MultipartRejection> for AnalyzeError {
    fn from(e: MultipartRejection) -> Self {
        AnalyzeError::Multipart(e.body_text())
    }
}

#[derive(Debug, Default)]
struct UploadForm {
    file_name: Option<String>,
    content: Option<Bytes>,
    query: Option<String>,
}

struct Upload {
    file_name: String,
    content: Bytes,
    query: String,
}

/// `POST /analyze`: runs the financial analyst crew over an uploaded PDF.
///
/// Always answers 200; failures are reported through the `status` field.
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<AnalysisResult> {
    let mut form = UploadForm::default();

    let upload = match read_form(multipart, &mut form).await {
        Ok(()) => match form.into_upload() {
            Ok(upload) => upload,
            Err((file_name, e)) => return Json(failure(file_name, e)),
        },
        Err(e) => return Json(failure(form.file_name.unwrap_or_default(), e)),
    };

    let file_name = upload.file_name.clone();
    info!(
        "Analyzing {} ({} bytes) for query: {}",
        file_name,
        upload.content.len(),
        upload.query
    );

    match run_analysis(&state, upload).await {
        Ok(summary) => {
            info!("Analysis of {} completed", file_name);
            Json(AnalysisResult::success(file_name, summary))
        }
        Err(e) => Json(failure(file_name, e)),
    }
}

fn failure(file_name: String, e: AnalyzeError) -> AnalysisResult {
    match &e {
        AnalyzeError::Pipeline(_) | AnalyzeError::Worker(_) | AnalyzeError::Staging(_) => {
            error!("Analysis of '{}' failed: {}", file_name, e)
        }
        _ => warn!("Rejected upload '{}': {}", file_name, e),
    }
    AnalysisResult::error(file_name, e.to_string())
}

async fn read_form(
    multipart: Result<Multipart, MultipartRejection>,
    form: &mut UploadForm,
) -> Result<(), AnalyzeError> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = Some(field.file_name().unwrap_or("upload.pdf").to_string());
                form.content = Some(field.bytes().await?);
            }
            "query" => {
                form.query = Some(field.text().await?);
            }
            other => {
                warn!("Ignoring unexpected form field: {}", other);
            }
        }
    }

    Ok(())
}

impl UploadForm {
    fn into_upload(self) -> Result<Upload, (String, AnalyzeError)> {
        let file_name = self.file_name.unwrap_or_default();
        let Some(content) = self.content else {
            return Err((file_name, AnalyzeError::MissingFile));
        };

        let query = self
            .query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());

        Ok(Upload {
            file_name,
            content,
            query,
        })
    }
}

async fn run_analysis(state: &AppState, upload: Upload) -> Result<String, AnalyzeError> {
    let staged = StagedFile::create(&state.scratch_dir, &upload.file_name, &upload.content).await?;

    validate_pdf(state, &staged, &upload.content).await?;

    let read_data_tool = Arc::new(ReadDataTool::with_loader(state.loader.clone()));
    let crew = Crew::new(
        vec![financial_analyst(
            state.llm.clone(),
            read_data_tool,
            state.max_iterations,
        )],
        vec![analyze_task()],
        Process::Sequential,
    )?;

    let inputs = HashMap::from([
        ("query".to_string(), upload.query),
        ("file_path".to_string(), staged.posix_path()),
    ]);

    // Runs on its own task; a panic in there comes back as a JoinError.
    // The staged file moves in with the crew and is removed only once the run
    // ends, even if the request future is dropped first.
    let output = tokio::spawn(async move {
        let output = crew.kickoff(&inputs).await;
        drop(staged);
        output
    })
    .await??;

    for task in &output.tasks_output {
        debug!("Agent '{}' produced {} chars", task.agent, task.raw.len());
    }

    Ok(output.to_string())
}

/// Rejects uploads that are not openable PDFs before any model time is spent.
async fn validate_pdf(
    state: &AppState,
    staged: &StagedFile,
    content: &[u8],
) -> Result<(), AnalyzeError> {
    if !has_pdf_signature(content) {
        return Err(AnalyzeError::NotPdf);
    }

    let loader = state.loader.clone();
    let path = staged.path().to_path_buf();
    let pages = tokio::task::spawn_blocking(move || loader.check(&path)).await??;
    debug!("Upload has {} pages", pages);

    Ok(())
}
