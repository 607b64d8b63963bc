//! HTTP client for the broker's submit endpoint.

use std::time::Duration;

use gatehouse_core::{PermissionDecision, PermissionSubmission};
use tracing::debug;

use crate::errors::ProxyError;

/// Path of the blocking submit endpoint.
pub const SUBMIT_PATH: &str = "/api/permissions/request";

const MAX_ERROR_BODY: usize = 500;

/// Submits permission requests to the broker.
#[derive(Clone)]
pub struct BrokerClient {
    http: reqwest::Client,
    submit_url: String,
}

impl BrokerClient {
    /// Create a client. `timeout` must exceed the broker's own deadline.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            submit_url: format!("{}{SUBMIT_PATH}", base_url.trim_end_matches('/')),
        })
    }

    /// Submit and wait for the decision.
    pub async fn request_permission(
        &self,
        submission: &PermissionSubmission,
    ) -> Result<PermissionDecision, ProxyError> {
        debug!(url = %self.submit_url, action = %submission.action, "submitting permission request");
        let resp = self.http.post(&self.submit_url).json(submission).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ProxyError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        serde_json::from_str(&body).map_err(|e| ProxyError::Malformed(e.to_string()))
    }
}
