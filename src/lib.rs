//! # report2docx
//!
//! Turn broker research PDFs into house-style Word reports with two LLM
//! passes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     pull the text layer via pdfium (spawn_blocking)
//!  ├─ 2. Analyst   job #1: extract institution, ticker, rating, thesis
//!  ├─ 3. Editor    job #2: rewrite into header / body / footer JSON
//!  ├─ 4. Polish    stamp today's date, scrub fund-flow headers, name the file
//!  └─ 5. Render    styled .docx (highlights in red, optional cover image)
//! ```
//!
//! Both jobs go through an asynchronous job service: a client-credentials
//! token, one submission, then a bounded poll loop (2 s × 60 by default).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report2docx::{ReportCategory, ReportPipeline, ReportRequest, ServiceConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .credentials("client-id", "client-secret")
//!         .build()?;
//!     let pipeline = ReportPipeline::new(Arc::new(config))?;
//!
//!     let request = ReportRequest::new(std::fs::read("report1.pdf")?, "report1.pdf")
//!         .user_name("Charlotte")
//!         .category(ReportCategory::Equity);
//!     let report = pipeline.generate(&request, Path::new(".")).await?;
//!     println!("{}", report.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `report2docx` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | Enables the axum upload UI in [`server`] |
//!
//! Disable both when using only the library:
//! ```toml
//! report2docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{JobMetadata, RenderStyle, ReportCategory, ServiceConfig, ServiceConfigBuilder};
pub use document::{GeneratedReport, ReportDocument};
pub use error::ReportError;
pub use generate::{ReportPipeline, ReportRequest};
pub use pipeline::input::{PdfiumTextSource, TextSource};
pub use pipeline::job::{JobClient, JobRunner};
pub use pipeline::normalize::{normalize, BraceScanExtractor, JsonExtractor};
pub use pipeline::render::{render, RenderOptions};
pub use progress::{NoopProgressCallback, ProgressCallback, ReportProgressCallback, Stage};
