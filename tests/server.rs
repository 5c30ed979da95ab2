//! Web UI tests: the axum router on an ephemeral port, driven with reqwest.

#![cfg(feature = "server")]

use async_trait::async_trait;
use report2docx::server::{router, AppState, DOCX_MIME};
use report2docx::{JobRunner, ReportError, ReportPipeline, TextSource};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers the analyst prompt with `meta` and the editor prompt with a
/// small finished document.
struct StubRunner {
    calls: AtomicUsize,
    fail_with_timeout: bool,
}

#[async_trait]
impl JobRunner for StubRunner {
    async fn run_job(&self, prompt: &str, _content: &str) -> Result<Value, ReportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_with_timeout {
            return Err(ReportError::PollTimeout {
                job_id: "job-1".into(),
                attempts: 60,
            });
        }
        if prompt.contains("Strict Financial Editor") || prompt.contains("translator") {
            Ok(json!({
                "header_info": {"title": "JPMorgan: Alibaba(9988.HK)"},
                "body_content": ["**JPM expect upside.**"]
            }))
        } else {
            Ok(json!({"meta": {"institution": "J.P. Morgan"}}))
        }
    }
}

struct CannedText;

impl TextSource for CannedText {
    fn extract_text(&self, name: &str, pdf: &[u8]) -> Result<String, ReportError> {
        if pdf.starts_with(b"%PDF") {
            Ok("Alibaba cloud revenue".into())
        } else {
            Err(ReportError::NotAPdf {
                name: name.into(),
                magic: pdf.iter().take(4).copied().collect(),
            })
        }
    }
}

struct TestApp {
    address: String,
    client: reqwest::Client,
    runner: Arc<StubRunner>,
}

impl TestApp {
    async fn spawn(fail_with_timeout: bool) -> Self {
        let runner = Arc::new(StubRunner {
            calls: AtomicUsize::new(0),
            fail_with_timeout,
        });
        let pipeline = ReportPipeline::with_components(runner.clone(), Arc::new(CannedText));
        let app = router(AppState::new(pipeline));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            address,
            client: reqwest::Client::new(),
            runner,
        }
    }

    async fn post_form(&self, form: Form) -> reqwest::Response {
        self.client
            .post(format!("{}/generate", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request to /generate")
    }
}

fn pdf_part() -> Part {
    Part::bytes(b"%PDF-1.7 test".to_vec())
        .file_name("report1.pdf")
        .mime_str("application/pdf")
        .unwrap()
}

#[tokio::test]
async fn health_and_index() {
    let app = TestApp::spawn(false).await;

    let health = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert!(health.status().is_success());
    assert_eq!(health.text().await.unwrap(), "ok");

    let index = app.client.get(&app.address).send().await.unwrap();
    assert!(index.status().is_success());
    let html = index.text().await.unwrap();
    assert!(html.contains("name=\"pdf\""));
    assert!(html.contains("Weekly Fund Flow"));
    assert!(html.contains("FX&amp;Commodity"));
}

#[tokio::test]
async fn generate_returns_docx_attachment() {
    let app = TestApp::spawn(false).await;
    let form = Form::new()
        .part("pdf", pdf_part())
        .text("user_name", "Charlotte")
        .text("category", "Equity");

    let response = app.post_form(form).await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        DOCX_MIME
    );
    let disposition = response.headers()["content-disposition"].to_str().unwrap();
    assert!(
        disposition.contains("filename=\"Equity_Charlotte_JPM_report1.docx\""),
        "got: {disposition}"
    );
    let body = response.bytes().await.unwrap();
    // .docx is a zip archive
    assert!(body.starts_with(b"PK"));
    assert_eq!(app.runner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fund_flow_defaults_user_and_names_by_date() {
    let app = TestApp::spawn(false).await;
    let form = Form::new()
        .part("pdf", pdf_part())
        .text("user_name", "   ")
        .text("category", "Weekly Fund Flow");

    let response = app.post_form(form).await;

    assert_eq!(response.status().as_u16(), 200);
    let disposition = response.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.contains("WeeklyFlow_Charlotte_JPM_"), "got: {disposition}");
}

#[tokio::test]
async fn missing_pdf_is_bad_request() {
    let app = TestApp::spawn(false).await;
    let form = Form::new().text("user_name", "Charlotte");

    let response = app.post_form(form).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("pdf"));
    assert_eq!(app.runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_category_is_bad_request() {
    let app = TestApp::spawn(false).await;
    let form = Form::new()
        .part("pdf", pdf_part())
        .text("category", "Crypto");

    let response = app.post_form(form).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn non_pdf_upload_is_unprocessable() {
    let app = TestApp::spawn(false).await;
    let form = Form::new().part(
        "pdf",
        Part::bytes(b"hello world".to_vec()).file_name("notes.pdf"),
    );

    let response = app.post_form(form).await;

    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("notes.pdf"));
}

#[tokio::test]
async fn upstream_timeout_is_bad_gateway() {
    let app = TestApp::spawn(true).await;
    let form = Form::new().part("pdf", pdf_part());

    let response = app.post_form(form).await;

    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("60 polls"));
}
