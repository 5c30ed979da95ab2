//! Configuration types for report generation.
//!
//! Everything the job client needs (endpoints, credentials, model, the fixed
//! request metadata and the poll budget) lives in one [`ServiceConfig`],
//! built once at startup and passed by reference into the clients. There is
//! no process-wide global: the web server shares it behind an `Arc`.

use crate::error::ReportError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default OAuth2 client-credentials token endpoint.
pub const DEFAULT_AUTH_URL: &str =
    "https://auth-v2.easyview.xyz/realms/evhk/protocol/openid-connect/token";

/// Default base URL of the LLM job service.
pub const DEFAULT_API_BASE_URL: &str = "https://api-v2.easyview.xyz/v3/ai";

/// Default model requested for every job.
pub const DEFAULT_MODEL: &str = "deepseek-r1";

/// Connection settings for the token endpoint and the LLM job service.
///
/// Built via [`ServiceConfig::builder()`] or using
/// [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use report2docx::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .credentials("my-client", "my-secret")
///     .model("deepseek-r1")
///     .max_poll_attempts(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.poll_interval_ms, 2000);
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// OAuth2 token endpoint (client-credentials grant).
    pub auth_url: String,

    /// Base URL of the job API; `/job` and `/job/JOB_ID/{id}` are appended.
    pub api_base_url: String,

    /// OAuth2 client id.
    pub client_id: String,

    /// OAuth2 client secret. Redacted from `Debug` output.
    pub client_secret: String,

    /// Model name sent as `input.parameter.model_name`.
    pub model_name: String,

    /// Fixed envelope sent as `metadata` with every job.
    pub metadata: JobMetadata,

    /// Delay before each status poll, in milliseconds. Default: 2000.
    pub poll_interval_ms: u64,

    /// Maximum number of status polls before giving up. Default: 60.
    ///
    /// Together with the interval this bounds a single job at two minutes.
    pub max_poll_attempts: u32,

    /// Timeout for the token request in seconds. Default: 10.
    pub auth_timeout_secs: u64,

    /// Timeout for the job-creation request in seconds. Default: 30.
    pub submit_timeout_secs: u64,

    /// Timeout for a single status poll in seconds. Default: 30.
    pub poll_timeout_secs: u64,

    /// Optional receiver of stage / poll events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            model_name: DEFAULT_MODEL.to_string(),
            metadata: JobMetadata::default(),
            poll_interval_ms: 2000,
            max_poll_attempts: 60,
            auth_timeout_secs: 10,
            submit_timeout_secs: 30,
            poll_timeout_secs: 30,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("auth_url", &self.auth_url)
            .field("api_base_url", &self.api_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("model_name", &self.model_name)
            .field("metadata", &self.metadata)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ReportProgressCallback>"),
            )
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// `POST` target for job creation.
    pub fn job_url(&self) -> String {
        format!("{}/job", self.api_base_url.trim_end_matches('/'))
    }

    /// `GET` target for the status of `job_id`.
    pub fn job_status_url(&self, job_id: &str) -> String {
        format!(
            "{}/job/JOB_ID/{}",
            self.api_base_url.trim_end_matches('/'),
            job_id
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.config.auth_url = url.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn credentials(mut self, client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.config.client_id = client_id.into();
        self.config.client_secret = secret.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model_name = model.into();
        self
    }

    pub fn metadata(mut self, metadata: JobMetadata) -> Self {
        self.config.metadata = metadata;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.max_poll_attempts = n;
        self
    }

    pub fn auth_timeout_secs(mut self, secs: u64) -> Self {
        self.config.auth_timeout_secs = secs.max(1);
        self
    }

    pub fn submit_timeout_secs(mut self, secs: u64) -> Self {
        self.config.submit_timeout_secs = secs.max(1);
        self
    }

    pub fn poll_timeout_secs(mut self, secs: u64) -> Self {
        self.config.poll_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ReportError> {
        let c = &self.config;
        if c.auth_url.trim().is_empty() {
            return Err(ReportError::InvalidConfig("auth URL must not be empty".into()));
        }
        if c.api_base_url.trim().is_empty() {
            return Err(ReportError::InvalidConfig(
                "API base URL must not be empty".into(),
            ));
        }
        if c.max_poll_attempts == 0 {
            return Err(ReportError::InvalidConfig(
                "max poll attempts must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// The fixed `metadata` envelope attached to every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    pub tenant_id: String,
    pub client_id: String,
    pub user_id: String,
    pub priority: u32,
    #[serde(default)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl Default for JobMetadata {
    fn default() -> Self {
        Self {
            tenant_id: "GOLDHORSE".into(),
            client_id: "CIO".into(),
            user_id: "script_runner".into(),
            priority: 1,
            custom: serde_json::Map::new(),
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Report type selected by the user.
///
/// The category picks the prompt pair, the file-name pattern and the
/// [`RenderStyle`]. Only `WeeklyFundFlow` switches to the fund-flow layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReportCategory {
    #[default]
    Equity,
    Macro,
    #[serde(rename = "FX&Commodity")]
    FxCommodity,
    #[serde(rename = "Weekly Fund Flow")]
    WeeklyFundFlow,
}

impl ReportCategory {
    pub const ALL: [ReportCategory; 4] = [
        ReportCategory::Equity,
        ReportCategory::Macro,
        ReportCategory::FxCommodity,
        ReportCategory::WeeklyFundFlow,
    ];

    /// Human-facing label; also substituted into the prompt templates and
    /// used as the file-name prefix.
    pub fn label(self) -> &'static str {
        match self {
            ReportCategory::Equity => "Equity",
            ReportCategory::Macro => "Macro",
            ReportCategory::FxCommodity => "FX&Commodity",
            ReportCategory::WeeklyFundFlow => "Weekly Fund Flow",
        }
    }

    pub fn is_fund_flow(self) -> bool {
        self == ReportCategory::WeeklyFundFlow
    }

    pub fn render_style(self) -> RenderStyle {
        if self.is_fund_flow() {
            RenderStyle::FundFlow
        } else {
            RenderStyle::Standard
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportCategory {
    type Err = ReportError;

    /// Accepts the display label or a lowercase slug
    /// (`equity`, `macro`, `fx-commodity`, `weekly-fund-flow`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slug: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match slug.as_str() {
            "equity" => Ok(ReportCategory::Equity),
            "macro" => Ok(ReportCategory::Macro),
            "fxcommodity" | "fx" | "commodity" => Ok(ReportCategory::FxCommodity),
            "weeklyfundflow" | "fundflow" | "weeklyflow" => Ok(ReportCategory::WeeklyFundFlow),
            _ => Err(ReportError::InvalidConfig(format!(
                "unknown report category '{s}' (expected Equity, Macro, FX&Commodity or Weekly Fund Flow)"
            ))),
        }
    }
}

/// Layout mode of the rendered document.
///
/// The per-mode differences (font size, spacing, label emission, footer,
/// run colouring) are data in [`crate::pipeline::render::StyleProfile`],
/// looked up once per render call via `RenderStyle::profile()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderStyle {
    /// Wall Street Highlights layout used by Equity / Macro / FX&Commodity.
    #[default]
    Standard,
    /// Numeric-only fixed template used by Weekly Fund Flow.
    FundFlow,
}
