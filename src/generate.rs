//! Report generation entry point: PDF bytes in, styled `.docx` out.
//!
//! A report is one sequential flow. Nothing runs concurrently inside it and
//! the first failing stage ends it; no partial document is written.
//!
//! ```text
//! extract text ─▶ analyst job ─▶ editor job ─▶ post-process ─▶ render
//! ```
//!
//! The LLM back end and the PDF reader are trait objects
//! ([`JobRunner`], [`TextSource`]), so the whole flow can run against fakes.

use crate::config::{ReportCategory, ServiceConfig};
use crate::document::{GeneratedReport, ReportDocument};
use crate::error::ReportError;
use crate::pipeline::input::{PdfiumTextSource, TextSource};
use crate::pipeline::job::{JobClient, JobRunner};
use crate::pipeline::postprocess::{finalize_document, institution_of, report_file_name};
use crate::pipeline::render::{render, RenderOptions};
use crate::progress::{ProgressCallback, Stage};
use crate::prompts::{analyst_prompt, editor_prompt};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// One report to generate.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// Raw bytes of the uploaded PDF.
    pub pdf_bytes: Vec<u8>,
    /// Upload file name (`report1.pdf`); its stem ends up in the output name.
    pub source_name: String,
    pub user_name: String,
    pub category: ReportCategory,
    /// Optional cover image. Ignored for Weekly Fund Flow.
    pub image_path: Option<PathBuf>,
}

impl ReportRequest {
    pub fn new(pdf_bytes: Vec<u8>, source_name: impl Into<String>) -> Self {
        Self {
            pdf_bytes,
            source_name: source_name.into(),
            user_name: "Charlotte".to_string(),
            category: ReportCategory::default(),
            image_path: None,
        }
    }

    pub fn user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self
    }

    pub fn category(mut self, category: ReportCategory) -> Self {
        self.category = category;
        self
    }

    pub fn image(mut self, path: Option<PathBuf>) -> Self {
        self.image_path = path;
        self
    }
}

/// The report generation flow with its collaborators.
#[derive(Clone)]
pub struct ReportPipeline {
    runner: Arc<dyn JobRunner>,
    text_source: Arc<dyn TextSource>,
    progress: Option<ProgressCallback>,
}

impl ReportPipeline {
    /// Production pipeline: [`JobClient`] over HTTP and pdfium text extraction.
    pub fn new(config: Arc<ServiceConfig>) -> Result<Self, ReportError> {
        let progress = config.progress_callback.clone();
        let client = JobClient::new(config)?;
        Ok(Self {
            runner: Arc::new(client),
            text_source: Arc::new(PdfiumTextSource),
            progress,
        })
    }

    /// Pipeline over arbitrary collaborators.
    pub fn with_components(runner: Arc<dyn JobRunner>, text_source: Arc<dyn TextSource>) -> Self {
        Self {
            runner,
            text_source,
            progress: None,
        }
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    /// Generate the report for `request` into `output_dir`, dated today.
    pub async fn generate(
        &self,
        request: &ReportRequest,
        output_dir: &Path,
    ) -> Result<GeneratedReport, ReportError> {
        self.generate_on(request, output_dir, Local::now().date_naive())
            .await
    }

    /// [`Self::generate`] with an explicit report date.
    pub async fn generate_on(
        &self,
        request: &ReportRequest,
        output_dir: &Path,
        today: NaiveDate,
    ) -> Result<GeneratedReport, ReportError> {
        let started = Instant::now();
        let category = request.category;
        info!(
            "Generating {} report from '{}' for {}",
            category, request.source_name, request.user_name
        );

        // ── Step 1: PDF text ─────────────────────────────────────────────
        self.stage_start(Stage::ExtractText);
        let text = self.extract_text(request).await?;
        info!("Extracted {} chars of text", text.chars().count());
        self.stage_complete(Stage::ExtractText);

        // ── Step 2: analyst pass ─────────────────────────────────────────
        self.stage_start(Stage::AnalystPass);
        let analysis = self
            .runner
            .run_job(&analyst_prompt(category), &text)
            .await?;
        self.stage_complete(Stage::AnalystPass);

        // ── Step 3: editor pass ──────────────────────────────────────────
        self.stage_start(Stage::EditorPass);
        let editor_input = serde_json::to_string_pretty(&analysis)
            .map_err(|e| ReportError::Internal(format!("cannot serialise analyst output: {e}")))?;
        let edited = self
            .runner
            .run_job(&editor_prompt(category), &editor_input)
            .await?;
        self.stage_complete(Stage::EditorPass);

        // ── Step 4: post-process ─────────────────────────────────────────
        let mut document = ReportDocument::from_value(&edited);
        finalize_document(&mut document, category, today);
        let file_name = report_file_name(
            category,
            &request.user_name,
            institution_of(&analysis),
            &request.source_name,
            today,
        );
        debug!("Output file name: {file_name}");

        // ── Step 5: render ───────────────────────────────────────────────
        self.stage_start(Stage::Render);
        let path = output_dir.join(&file_name);
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| ReportError::RenderFailed {
                path: path.clone(),
                detail: format!("cannot create output directory: {e}"),
            })?;

        let options = render_options(request);
        let doc = document.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || render(&doc, &target, &options))
            .await
            .map_err(|e| ReportError::Internal(format!("Render task panicked: {e}")))??;
        self.stage_complete(Stage::Render);

        if let Some(ref cb) = self.progress {
            cb.on_report_complete(&file_name);
        }
        info!(
            "Report {} ready in {:.1}s",
            file_name,
            started.elapsed().as_secs_f64()
        );

        Ok(GeneratedReport {
            file_name,
            path,
            document,
        })
    }

    async fn extract_text(&self, request: &ReportRequest) -> Result<String, ReportError> {
        let source = Arc::clone(&self.text_source);
        let name = request.source_name.clone();
        let bytes = request.pdf_bytes.clone();
        tokio::task::spawn_blocking(move || source.extract_text(&name, &bytes))
            .await
            .map_err(|e| ReportError::Internal(format!("Text extraction task panicked: {e}")))?
    }

    fn stage_start(&self, stage: Stage) {
        info!("{stage}");
        if let Some(ref cb) = self.progress {
            cb.on_stage_start(stage);
        }
    }

    fn stage_complete(&self, stage: Stage) {
        if let Some(ref cb) = self.progress {
            cb.on_stage_complete(stage);
        }
    }
}

fn render_options(request: &ReportRequest) -> RenderOptions {
    let category = request.category;
    if category.is_fund_flow() {
        return RenderOptions {
            style: category.render_style(),
            category_override: None,
            image: None,
        };
    }
    RenderOptions {
        style: category.render_style(),
        category_override: Some(category.label().to_string()),
        image: request.image_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderStyle;
    use crate::pipeline::input::check_pdf_magic;
    use crate::progress::ReportProgressCallback;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Returns canned responses in order and records every call.
    struct ScriptedRunner {
        responses: Mutex<Vec<Result<Value, ReportError>>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedRunner {
        fn new(responses: Vec<Result<Value, ReportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl JobRunner for ScriptedRunner {
        async fn run_job(&self, prompt: &str, content: &str) -> Result<Value, ReportError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), content.to_string()));
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ReportError::Internal("no more responses".into())))
        }
    }

    struct FixedText(&'static str);

    impl TextSource for FixedText {
        fn extract_text(&self, name: &str, pdf: &[u8]) -> Result<String, ReportError> {
            check_pdf_magic(name, pdf)?;
            crate::pipeline::input::ensure_usable(name, self.0.to_string())
        }
    }

    #[derive(Default)]
    struct StageLog(Mutex<Vec<String>>);

    impl ReportProgressCallback for StageLog {
        fn on_stage_start(&self, stage: Stage) {
            self.0.lock().unwrap().push(format!("start {stage:?}"));
        }
        fn on_report_complete(&self, file_name: &str) {
            self.0.lock().unwrap().push(format!("done {file_name}"));
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    fn request(category: ReportCategory) -> ReportRequest {
        ReportRequest::new(b"%PDF-1.7 fake".to_vec(), "report1.pdf").category(category)
    }

    fn editor_output() -> Value {
        json!({
            "header_info": {"category": "Wall Street Highlights-Equity", "date": "1999/01/01", "title": "GS: Tencent"},
            "body_content": ["Intro. **GS expect growth.**"],
            "footer_info": {"stock": "700.HK"}
        })
    }

    #[tokio::test]
    async fn equity_report_end_to_end() {
        let runner = ScriptedRunner::new(vec![
            Ok(json!({"meta": {"institution": "Goldman Sachs", "analyst": "李明"}})),
            Ok(editor_output()),
        ]);
        let log = Arc::new(StageLog::default());
        let pipeline = ReportPipeline::with_components(runner.clone(), Arc::new(FixedText("Revenue up")))
            .with_progress(log.clone());
        let dir = tempfile::tempdir().unwrap();

        let report = pipeline
            .generate_on(&request(ReportCategory::Equity), dir.path(), day())
            .await
            .unwrap();

        assert_eq!(report.file_name, "Equity_Charlotte_GS_report1.docx");
        assert!(report.path.is_file());
        assert_eq!(report.document.header_info["date"], "2026/03/09");

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, analyst_prompt(ReportCategory::Equity));
        assert_eq!(calls[0].1, "Revenue up");
        // Editor input is the pretty-printed analyst JSON with non-ASCII kept.
        assert!(calls[1].1.contains("\n  \"meta\""));
        assert!(calls[1].1.contains("李明"));

        let log = log.0.lock().unwrap();
        assert_eq!(log[0], "start ExtractText");
        assert_eq!(log.last().unwrap(), "done Equity_Charlotte_GS_report1.docx");
    }

    #[tokio::test]
    async fn fund_flow_scrubs_header_and_names_by_date() {
        let runner = ScriptedRunner::new(vec![
            Ok(json!({"meta": {}})),
            Ok(json!({
                "header_info": {"Title": "【市场动态】", "Stock": "700.HK", "From": "CIO Office"},
                "body_content": ["资金流入"]
            })),
        ]);
        let pipeline = ReportPipeline::with_components(runner, Arc::new(FixedText("flows")));
        let dir = tempfile::tempdir().unwrap();

        let report = pipeline
            .generate_on(
                &request(ReportCategory::WeeklyFundFlow).user_name("Ann"),
                dir.path(),
                day(),
            )
            .await
            .unwrap();

        assert_eq!(report.file_name, "WeeklyFlow_Ann_GS_20260309.docx");
        assert_eq!(report.document.header_info["Stock"], "");
        assert_eq!(report.document.header_info["From"], "CIO Office");
    }

    #[tokio::test]
    async fn slash_in_user_name_stays_inside_output_dir() {
        let runner = ScriptedRunner::new(vec![Ok(json!({"meta": {}})), Ok(editor_output())]);
        let pipeline = ReportPipeline::with_components(runner, Arc::new(FixedText("flows")));
        let dir = tempfile::tempdir().unwrap();

        let report = pipeline
            .generate_on(
                &request(ReportCategory::WeeklyFundFlow).user_name("Ann/Lee"),
                dir.path(),
                day(),
            )
            .await
            .unwrap();

        assert_eq!(report.file_name, "WeeklyFlow_Ann-Lee_GS_20260309.docx");
        assert_eq!(report.path.parent(), Some(dir.path()));
        assert!(report.path.is_file());
    }

    #[tokio::test]
    async fn first_job_failure_stops_the_flow() {
        let runner = ScriptedRunner::new(vec![Err(ReportError::JobFailed {
            job_id: "j1".into(),
        })]);
        let pipeline = ReportPipeline::with_components(runner.clone(), Arc::new(FixedText("text")));
        let dir = tempfile::tempdir().unwrap();

        let err = pipeline
            .generate_on(&request(ReportCategory::Macro), dir.path(), day())
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::JobFailed { .. }));
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn non_pdf_never_reaches_the_runner() {
        let runner = ScriptedRunner::new(vec![]);
        let pipeline = ReportPipeline::with_components(runner.clone(), Arc::new(FixedText("text")));
        let dir = tempfile::tempdir().unwrap();
        let req = ReportRequest::new(b"PK\x03\x04".to_vec(), "notes.docx");

        let err = pipeline.generate_on(&req, dir.path(), day()).await.unwrap_err();
        assert!(matches!(err, ReportError::NotAPdf { .. }));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn fund_flow_ignores_cover_image() {
        let req = request(ReportCategory::WeeklyFundFlow).image(Some(PathBuf::from("cover.png")));
        let opts = render_options(&req);
        assert_eq!(opts.style, RenderStyle::FundFlow);
        assert!(opts.image.is_none());

        let req = request(ReportCategory::FxCommodity).image(Some(PathBuf::from("cover.png")));
        let opts = render_options(&req);
        assert_eq!(opts.category_override.as_deref(), Some("FX&Commodity"));
        assert_eq!(opts.image, Some(PathBuf::from("cover.png")));
    }
}
