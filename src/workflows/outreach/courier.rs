use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::CourierConfig;

use super::domain::{CancellationToken, RunId};
use super::program::AutomationProgram;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which outbound call failed, so callers can tell enroll, cancel, and
/// status failures apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOperation {
    Invoke,
    Cancel,
    Status,
}

impl fmt::Display for GatewayOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GatewayOperation::Invoke => "invoke",
            GatewayOperation::Cancel => "cancel",
            GatewayOperation::Status => "status",
        };
        f.write_str(label)
    }
}

/// An external call that did not complete successfully. Never retried by
/// this layer; the caller decides whether to try again.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("automation client could not be constructed: {0}")]
    ClientBuild(String),
    #[error("automation {operation} request failed: {detail}")]
    Network {
        operation: GatewayOperation,
        detail: String,
    },
    #[error("automation {operation} request was rejected with status {status}: {detail}")]
    Rejected {
        operation: GatewayOperation,
        status: u16,
        detail: String,
    },
    #[error("automation {operation} response could not be decoded: {detail}")]
    Payload {
        operation: GatewayOperation,
        detail: String,
    },
}

/// Outbound operations against the automation service, abstracted so the
/// lifecycle service can be exercised without a network.
#[async_trait]
pub trait AutomationGateway: Send + Sync {
    /// Start a run for the given program. The recipient rides inside the
    /// program's send instructions.
    async fn invoke(&self, program: &AutomationProgram) -> Result<RunId, TransportError>;

    /// Stop the run registered under `token`.
    async fn cancel(&self, token: &CancellationToken) -> Result<(), TransportError>;

    /// Fetch the remote state of a run. Returns the service's raw status
    /// string; mapping into the local vocabulary happens in the lifecycle
    /// service.
    async fn run_status(&self, run_id: &RunId) -> Result<String, TransportError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeResponse {
    run_id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
struct CancelRequest<'a> {
    cancelation_token: &'a CancellationToken,
}

/// Courier ad hoc automation API client.
pub struct CourierClient {
    http: Client,
    api_base: String,
    api_key: String,
}

impl CourierClient {
    pub fn new(config: &CourierConfig) -> Result<Self, TransportError> {
        if config.api_key.trim().is_empty() {
            return Err(TransportError::ClientBuild(
                "COURIER_API_KEY is not configured".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TransportError::ClientBuild(err.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn ensure_success(
        operation: GatewayOperation,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Rejected {
            operation,
            status: status.as_u16(),
            detail: body.chars().take(200).collect(),
        })
    }
}

impl fmt::Debug for CourierClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourierClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AutomationGateway for CourierClient {
    async fn invoke(&self, program: &AutomationProgram) -> Result<RunId, TransportError> {
        let operation = GatewayOperation::Invoke;
        let url = format!("{}/automations/invoke", self.api_base);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(program)
            .send()
            .await
            .map_err(|err| TransportError::Network {
                operation,
                detail: err.to_string(),
            })?;

        let response = Self::ensure_success(operation, response).await?;
        let payload: InvokeResponse =
            response
                .json()
                .await
                .map_err(|err| TransportError::Payload {
                    operation,
                    detail: err.to_string(),
                })?;

        Ok(RunId(payload.run_id))
    }

    async fn cancel(&self, token: &CancellationToken) -> Result<(), TransportError> {
        let operation = GatewayOperation::Cancel;
        let url = format!("{}/automations/cancel", self.api_base);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CancelRequest {
                cancelation_token: token,
            })
            .send()
            .await
            .map_err(|err| TransportError::Network {
                operation,
                detail: err.to_string(),
            })?;

        Self::ensure_success(operation, response).await?;
        Ok(())
    }

    async fn run_status(&self, run_id: &RunId) -> Result<String, TransportError> {
        let operation = GatewayOperation::Status;
        let url = format!("{}/automations/runs/{}", self.api_base, run_id.0);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| TransportError::Network {
                operation,
                detail: err.to_string(),
            })?;

        let response = Self::ensure_success(operation, response).await?;
        let payload: StatusResponse =
            response
                .json()
                .await
                .map_err(|err| TransportError::Payload {
                    operation,
                    detail: err.to_string(),
                })?;

        Ok(payload.status)
    }
}
