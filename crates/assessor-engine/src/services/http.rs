use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use assessor_config::Config;
use assessor_utils::error::{ServiceError, ServiceKind};
use assessor_utils::redaction::redact_error_message;

use super::{
    QuestionRequest, QuestionResponse, QuestionService, ReportRequest, ReportResponse,
    ReportService,
};
use crate::ledger::HistoryEntry;

/// One POST + JSON round-trip with a hard timeout. No retries.
#[derive(Clone)]
struct JsonEndpoint {
    client: Client,
    url: String,
    timeout: Duration,
    kind: ServiceKind,
}

impl JsonEndpoint {
    fn new(url: String, timeout: Duration, kind: ServiceKind) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServiceError::Transport {
                service: kind,
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            url,
            timeout,
            kind,
        })
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        body: &B,
    ) -> Result<R, ServiceError> {
        debug!(service = %self.kind, url = %self.url, "POST");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: self.kind,
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| self.transport_error(&e))?;
        serde_json::from_str(&text).map_err(|e| ServiceError::malformed(self.kind, e.to_string()))
    }

    fn transport_error(&self, err: &reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::Timeout {
                service: self.kind,
                duration: self.timeout,
            }
        } else {
            ServiceError::Transport {
                service: self.kind,
                message: redact_error_message(&err.to_string()),
            }
        }
    }
}

/// Question Service reached over HTTP.
#[derive(Clone)]
pub struct HttpQuestionService {
    endpoint: JsonEndpoint,
}

impl HttpQuestionService {
    /// # Errors
    ///
    /// Returns `ServiceError::Transport` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: JsonEndpoint::new(url.into(), timeout, ServiceKind::Question)?,
        })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Transport` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(config.services.question_url.clone(), config.services.timeout())
    }
}

#[async_trait]
impl QuestionService for HttpQuestionService {
    async fn next_question(
        &self,
        phase: &str,
        history: &[HistoryEntry],
    ) -> Result<QuestionResponse, ServiceError> {
        self.endpoint.post(&QuestionRequest { phase, history }).await
    }
}

/// Report Service reached over HTTP.
#[derive(Clone)]
pub struct HttpReportService {
    endpoint: JsonEndpoint,
}

impl HttpReportService {
    /// # Errors
    ///
    /// Returns `ServiceError::Transport` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: JsonEndpoint::new(url.into(), timeout, ServiceKind::Report)?,
        })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::Transport` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        Self::new(config.services.report_url.clone(), config.services.timeout())
    }
}

#[async_trait]
impl ReportService for HttpReportService {
    async fn generate_report(
        &self,
        history: &[HistoryEntry],
        industry: &str,
    ) -> Result<String, ServiceError> {
        let response: ReportResponse = self
            .endpoint
            .post(&ReportRequest { history, industry })
            .await?;

        response
            .report_markdown
            .filter(|md| !md.trim().is_empty())
            .ok_or_else(|| ServiceError::malformed(ServiceKind::Report, "missing reportMarkdown"))
    }
}
