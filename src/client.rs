//! HTTP collaborator: the image-processing backend.

use crate::error::{ClientError, DEFAULT_FAILURE_MESSAGE};
use crate::model::{HealthStatus, Phase, ProcessResponse, ProcessedImage, SelectedFile};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct ProcessClient {
    pub(crate) http: reqwest::Client,
    base_url: String,
}

impl ProcessClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn process_url(&self) -> String {
        format!("{}/process", self.base_url)
    }

    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }

    /// Submit `file` for processing in `phase`. One attempt, no retries.
    ///
    /// Any non-2xx status is a transport failure regardless of the body.
    pub async fn process(
        &self,
        file: &SelectedFile,
        phase: Phase,
    ) -> Result<ProcessResponse, ClientError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(file.media_type.as_mime())?;
        let form = Form::new()
            .part("image", part)
            .text("phase", phase.as_form_value());

        debug!(url = %self.process_url(), name = %file.name, %phase, "submitting image");
        let resp = self
            .http
            .post(self.process_url())
            .multipart(form)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "process request rejected");
            return Err(ClientError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(classify)?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let resp = self
            .http
            .get(self.health_url())
            .send()
            .await
            .map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        let body = resp.bytes().await.map_err(classify)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetch the bytes behind an `http(s)` image reference.
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let resp = self.http.get(url).send().await.map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(resp.bytes().await.map_err(classify)?.to_vec())
    }
}

fn classify(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Transport(e)
    }
}

/// Interpret a 2xx `/process` body.
pub fn interpret_response(
    response: ProcessResponse,
    phase: Phase,
) -> Result<ProcessedImage, ClientError> {
    if !response.success {
        let message = response
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
        return Err(ClientError::Application(message));
    }
    let source = response
        .processed_image
        .filter(|s| !s.is_empty())
        .ok_or(ClientError::MissingImage)?;
    Ok(ProcessedImage {
        phase,
        title: phase.display_title(),
        source,
    })
}
