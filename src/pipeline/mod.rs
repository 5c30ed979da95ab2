//! Pipeline stages for PDF-to-report generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped behind its trait.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ job (analyst) ──▶ job (editor) ──▶ postprocess ──▶ render ──▶ encode
//! (pdfium)   (auth + poll)     (auth + poll)    (date, name)   (layout)   (.docx)
//! ```
//!
//! 1. [`input`]: PDF bytes to plain text; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 2. [`auth`]: client-credentials token, fetched fresh for every job
//! 3. [`job`]: submit one prompt and poll it to a terminal status; the
//!    client retries nothing beyond the poll budget
//! 4. [`normalize`]: recover the JSON object from whatever the model wrapped
//!    it in
//! 5. [`postprocess`]: deterministic header fix-ups and the file name
//! 6. [`render`]: decide paragraphs, runs and colours per report style
//! 7. [`encode`]: serialise the layout to `.docx` and write it atomically

pub mod auth;
pub mod encode;
pub mod input;
pub mod job;
pub mod normalize;
pub mod postprocess;
pub mod render;
