//! HTTP client for the workflow engine.

use crate::error::{DispatchError, OracleError};
use async_trait::async_trait;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Configuration for the workflow engine client.
#[derive(Debug, Clone, Deserialize)]
pub struct ConductorConfig {
    /// Base URL of the workflow engine API.
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout_seconds() -> u64 {
    10
}

/// A started run, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    /// The engine-assigned run identifier.
    pub run_id: String,
}

/// Parameters for a workflow start call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartWorkflowRequest {
    /// Workflow name registered in the engine.
    pub name: String,
    /// Workflow version.
    pub version: i32,
    /// Input payload forwarded verbatim.
    pub input: JsonValue,
}

/// One-attempt workflow start with a classified outcome.
///
/// Implementations make exactly one call and never retry: the engine is
/// not guaranteed idempotent.
#[async_trait]
pub trait TriggerDispatcher: Send + Sync {
    /// Starts a workflow run.
    async fn start_workflow(
        &self,
        request: StartWorkflowRequest,
    ) -> Result<RunHandle, DispatchError>;
}

/// Best-effort snapshot of currently active runs.
///
/// The count is inherently stale: the engine may start or finish runs
/// between this read and a subsequent dispatch.
#[async_trait]
pub trait ConcurrencyOracle: Send + Sync {
    /// Counts active runs of `workflow_name` within `namespace`.
    async fn count_active_runs(
        &self,
        namespace: &str,
        workflow_name: &str,
    ) -> Result<u32, OracleError>;
}

/// HTTP implementation of both engine contracts.
///
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct ConductorClient {
    http: reqwest::Client,
    base_url: String,
}

impl ConductorClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ConductorConfig) -> Result<Self, Report<DispatchError>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| DispatchError::Transport {
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TriggerDispatcher for ConductorClient {
    async fn start_workflow(
        &self,
        request: StartWorkflowRequest,
    ) -> Result<RunHandle, DispatchError> {
        let url = format!("{}/workflow", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DispatchError::Transport {
                reason: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        // The engine answers the start call with the new run ID as plain text.
        Ok(RunHandle {
            run_id: body.trim().trim_matches('"').to_string(),
        })
    }
}

#[async_trait]
impl ConcurrencyOracle for ConductorClient {
    async fn count_active_runs(
        &self,
        namespace: &str,
        workflow_name: &str,
    ) -> Result<u32, OracleError> {
        let url = format!("{}/workflow/running/{workflow_name}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("namespace", namespace)])
            .send()
            .await
            .map_err(|e| OracleError::Transient {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Transient {
                reason: format!("HTTP {status}"),
            });
        }

        // The running-workflows endpoint returns the list of active run IDs.
        let run_ids: Vec<String> = response.json().await.map_err(|e| OracleError::Transient {
            reason: e.to_string(),
        })?;

        Ok(u32::try_from(run_ids.len()).unwrap_or(u32::MAX))
    }
}
