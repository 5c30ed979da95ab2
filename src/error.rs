//! Error types for the report2docx library.
//!
//! Every stage of report generation returns `Result<_, ReportError>`. A
//! failing stage halts the whole flow: no partial document is ever written,
//! and nothing is retried beyond the job client's fixed poll budget.
//!
//! The variants mirror the stages a report passes through:
//!
//! * input: the uploaded PDF yields no usable text
//! * upstream: token, job submission, job status, JSON extraction
//! * output: the `.docx` could not be written
//!
//! Front ends decide how to surface them: the CLI prints the message and
//! exits non-zero, the web UI maps [`ReportError::is_upstream`] failures to
//! `502 Bad Gateway`.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the report2docx library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The uploaded file does not start with the `%PDF` magic bytes.
    #[error("Uploaded file '{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// No usable text could be extracted from the source PDF.
    #[error("No text could be extracted from '{name}': {detail}")]
    InputFailed { name: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs libpdfium at runtime. Either:\n\
  • Place libpdfium next to the binary / in the working directory, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Upstream (LLM job service) errors ─────────────────────────────────
    /// The client-credentials token request failed or returned no token.
    #[error("Authentication against '{url}' failed: {detail}")]
    AuthenticationFailed { url: String, detail: String },

    /// The job-creation request failed or returned no job id.
    #[error("Job submission failed: {detail}")]
    SubmissionFailed { detail: String },

    /// The remote service reported `FAILED` for the job.
    #[error("Job {job_id} reported FAILED")]
    JobFailed { job_id: String },

    /// No terminal status was observed within the poll budget.
    #[error("Job {job_id} did not finish after {attempts} polls")]
    PollTimeout { job_id: String, attempts: u32 },

    /// The job finished but no JSON object could be recovered from its output.
    #[error("Could not extract a JSON object from the output of job {job_id}")]
    NormalizationFailed { job_id: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The `.docx` could not be assembled or written.
    #[error("Failed to write report '{path}': {detail}")]
    RenderFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// True for failures caused by the remote LLM job service.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ReportError::AuthenticationFailed { .. }
                | ReportError::SubmissionFailed { .. }
                | ReportError::JobFailed { .. }
                | ReportError::PollTimeout { .. }
                | ReportError::NormalizationFailed { .. }
        )
    }

    /// True for failures caused by the uploaded input.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            ReportError::NotAPdf { .. } | ReportError::InputFailed { .. }
        )
    }
}
