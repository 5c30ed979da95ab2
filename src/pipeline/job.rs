//! Job client: submit a prompt as an asynchronous LLM job and poll it to
//! completion.
//!
//! ## Status contract
//!
//! `GET {base}/job/JOB_ID/{id}` returns `{"status": ...}` where status is one
//! of `PENDING`, `SUCCESS`, `COMPLETED` or `FAILED`, plus `output` or
//! `result` once finished. Polling is lenient:
//!
//! | Poll outcome                         | Action                                  |
//! |--------------------------------------|-----------------------------------------|
//! | transport error / non-2xx / bad body | ignored, counts as one attempt          |
//! | `SUCCESS` / `COMPLETED`              | normalise payload, return               |
//! | `FAILED`                             | stop, [`ReportError::JobFailed`]        |
//! | anything else                        | keep polling                            |
//!
//! Exhausting `max_poll_attempts` yields [`ReportError::PollTimeout`].
//! Nothing is retried: a failed token request or submission ends the job.

use crate::config::ServiceConfig;
use crate::error::ReportError;
use crate::pipeline::auth::fetch_access_token;
use crate::pipeline::normalize::{BraceScanExtractor, JsonExtractor};
use crate::prompts::compose_job_prompt;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Anything that can turn `(prompt, content)` into a normalized JSON result.
///
/// [`JobClient`] is the production implementation; tests and alternative
/// back ends plug in here.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run_job(&self, prompt: &str, content: &str) -> Result<Value, ReportError>;
}

/// Terminal or intermediate state of a remote job, as far as we care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING" => JobStatus::Pending,
            "SUCCESS" | "COMPLETED" => JobStatus::Succeeded,
            "FAILED" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct JobRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    metadata: &'a crate::config::JobMetadata,
    input: JobInput<'a>,
}

#[derive(Serialize)]
struct JobInput<'a> {
    parameter: JobParameter<'a>,
}

#[derive(Serialize)]
struct JobParameter<'a> {
    model_name: &'a str,
    prompt: &'a str,
}

/// HTTP client for the LLM job service.
#[derive(Clone)]
pub struct JobClient {
    http: reqwest::Client,
    config: Arc<ServiceConfig>,
    extractor: Arc<dyn JsonExtractor>,
}

impl JobClient {
    pub fn new(config: Arc<ServiceConfig>) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ReportError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            extractor: Arc::new(BraceScanExtractor),
        })
    }

    /// Replace the default brace-scanning extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn JsonExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Authenticate, submit one job and wait for its normalized result.
    pub async fn submit_and_wait(&self, prompt: &str, content: &str) -> Result<Value, ReportError> {
        let token = fetch_access_token(&self.http, &self.config).await?;
        let job_id = self.submit(&token, prompt, content).await?;
        self.wait_for(&token, &job_id).await
    }

    /// Create the job and return its id.
    pub async fn submit(
        &self,
        token: &str,
        prompt: &str,
        content: &str,
    ) -> Result<String, ReportError> {
        let full_prompt = compose_job_prompt(prompt, content);
        let body = JobRequest {
            kind: "callLlm",
            metadata: &self.config.metadata,
            input: JobInput {
                parameter: JobParameter {
                    model_name: &self.config.model_name,
                    prompt: &full_prompt,
                },
            },
        };

        info!(
            "Submitting job ({} chars, model {})",
            full_prompt.len(),
            self.config.model_name
        );

        let response = self
            .http
            .post(self.config.job_url())
            .bearer_auth(token)
            .json(&body)
            .timeout(Duration::from_secs(self.config.submit_timeout_secs))
            .send()
            .await
            .map_err(|e| ReportError::SubmissionFailed {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReportError::SubmissionFailed {
                detail: format!("HTTP {status}: {}", truncate(&text, 200)),
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ReportError::SubmissionFailed {
                detail: format!("unreadable submission response: {e}"),
            })?;

        let job_id = job_id_from(&json).ok_or_else(|| ReportError::SubmissionFailed {
            detail: "response contained neither 'id' nor 'uuid'".into(),
        })?;

        info!("Job accepted: {job_id}");
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_job_submitted(&job_id);
        }
        Ok(job_id)
    }

    /// Poll `job_id` until it reaches a terminal status or the budget runs out.
    pub async fn wait_for(&self, token: &str, job_id: &str) -> Result<Value, ReportError> {
        let max_attempts = self.config.max_poll_attempts;
        let url = self.config.job_status_url(job_id);

        for attempt in 1..=max_attempts {
            sleep(self.config.poll_interval()).await;

            let body = self.poll_once(token, &url).await;
            let status = body
                .as_ref()
                .and_then(|b| b.get("status"))
                .and_then(Value::as_str);

            debug!("Job {job_id}: poll {attempt}/{max_attempts} → {status:?}");
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_poll(job_id, attempt, max_attempts, status);
            }

            let Some(status) = status else { continue };
            match JobStatus::parse(status) {
                JobStatus::Succeeded => {
                    info!("Job {job_id} finished after {attempt} polls");
                    let payload = body
                        .as_ref()
                        .map(result_payload)
                        .unwrap_or(Value::Null);
                    return self.extractor.extract(&payload).ok_or_else(|| {
                        ReportError::NormalizationFailed {
                            job_id: job_id.to_string(),
                        }
                    });
                }
                JobStatus::Failed => {
                    warn!("Job {job_id} reported FAILED");
                    return Err(ReportError::JobFailed {
                        job_id: job_id.to_string(),
                    });
                }
                JobStatus::Pending | JobStatus::Other(_) => {}
            }
        }

        warn!("Job {job_id} still unfinished after {max_attempts} polls");
        Err(ReportError::PollTimeout {
            job_id: job_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// One best-effort status request. Any failure is `None`.
    async fn poll_once(&self, token: &str, url: &str) -> Option<Value> {
        let response = match self
            .http
            .get(url)
            .bearer_auth(token)
            .timeout(Duration::from_secs(self.config.poll_timeout_secs))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!("Status poll failed: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Status poll returned HTTP {}", response.status());
            return None;
        }

        response.json::<Value>().await.ok()
    }
}

#[async_trait]
impl JobRunner for JobClient {
    async fn run_job(&self, prompt: &str, content: &str) -> Result<Value, ReportError> {
        self.submit_and_wait(prompt, content).await
    }
}

/// First non-empty of `id` / `uuid`, accepting string or numeric ids.
fn job_id_from(json: &Value) -> Option<String> {
    ["id", "uuid"].iter().find_map(|key| match json.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The `output` field of a finished job, falling back to `result`.
fn result_payload(body: &Value) -> Value {
    ["output", "result"]
        .iter()
        .filter_map(|k| body.get(*k))
        .find(|v| !is_blank(v))
        .cloned()
        .unwrap_or(Value::Null)
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}
