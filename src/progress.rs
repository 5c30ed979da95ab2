//! Progress-callback trait for report-generation events.
//!
//! A report takes two LLM jobs of up to two minutes each, so front ends need
//! something to show while the flow is blocked on polling. Inject an
//! [`Arc<dyn ReportProgressCallback>`] via
//! [`crate::config::ServiceConfigBuilder::progress_callback`] to receive
//! stage boundaries, job submissions and every poll attempt.
//!
//! # Example
//!
//! ```rust
//! use report2docx::{ReportProgressCallback, ServiceConfig};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter {
//!     polls: AtomicU32,
//! }
//!
//! impl ReportProgressCallback for PollCounter {
//!     fn on_poll(&self, job_id: &str, attempt: u32, max_attempts: u32, status: Option<&str>) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{job_id}: poll {attempt}/{max_attempts} → {status:?}");
//!     }
//! }
//!
//! let config = ServiceConfig::builder()
//!     .progress_callback(Arc::new(PollCounter { polls: AtomicU32::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// The stages a report passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pull plain text out of the uploaded PDF.
    ExtractText,
    /// LLM job #1: analyst extraction.
    AnalystPass,
    /// LLM job #2: editor / formatting.
    EditorPass,
    /// Write the `.docx`.
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ExtractText => "Reading PDF",
            Stage::AnalystPass => "Step 1: extracting key data",
            Stage::EditorPass => "Step 2: formatting and highlighting",
            Stage::Render => "Writing Word document",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline and the job client as a report is generated.
///
/// Implementations must be `Send + Sync`: the web server runs requests on
/// multiple worker threads. All methods have default no-op implementations
/// so callers only override what they care about.
pub trait ReportProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finished successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once the job service accepted a job.
    fn on_job_submitted(&self, job_id: &str) {
        let _ = job_id;
    }

    /// Called after every status poll.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed poll number
    /// * `max_attempts`: poll budget for this job
    /// * `status`: observed status, `None` when the poll itself failed
    fn on_poll(&self, job_id: &str, attempt: u32, max_attempts: u32, status: Option<&str>) {
        let _ = (job_id, attempt, max_attempts, status);
    }

    /// Called once the report file has been written.
    fn on_report_complete(&self, file_name: &str) {
        let _ = file_name;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ServiceConfig`].
pub type ProgressCallback = Arc<dyn ReportProgressCallback>;
