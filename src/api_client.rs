use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::configure::AppConfig;
use crate::models::errors::VerifyError;
use crate::models::order::OrderCreationPayload;
use crate::models::verification::{RemoteOrder, VerificationResult};

/// Response code the service returns when an order already has a
/// verification request. Must surface as a duplicate dispatch, never as a
/// generic rejection.
pub const ALREADY_VERIFIED_CODE: i64 = 4409;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, VerifyError>> + Send + 'a>>;

/// The three remote operations. One blocking call each, no internal retries;
/// retrying is a decision for the calling layer.
pub trait VerificationApi: Send + Sync {
    fn create_remote_order(&self, payload: OrderCreationPayload) -> ApiFuture<'_, RemoteOrder>;

    fn verify_remote_order(&self, remote_order_id: String) -> ApiFuture<'_, VerificationResult>;

    /// Absent result means there is nothing to update.
    fn retrieve_verification_status(
        &self,
        remote_order_id: String,
    ) -> ApiFuture<'_, Option<VerificationResult>>;
}

/// Classify a non-success verify response.
pub fn classify_rejection(code: i64, message: String, remote_order_id: &str) -> VerifyError {
    if code == ALREADY_VERIFIED_CODE {
        VerifyError::DuplicateDispatch {
            id: remote_order_id.to_string(),
        }
    } else {
        VerifyError::RemoteRejection { code, message }
    }
}

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: bool,
    code: i64,
    message: Option<String>,
    data: Option<T>,
}

/// Verification fields nested under the envelope's data.
#[derive(Debug, Default, Deserialize)]
struct VerificationFields {
    verification_state: Option<String>,
    verification_status: Option<String>,
    verification_strategy: Option<String>,
    verification_date: Option<i64>,
    is_verified: Option<bool>,
}

fn to_result(envelope: ApiEnvelope<VerificationFields>) -> VerificationResult {
    let fields = envelope.data.unwrap_or_default();
    VerificationResult {
        status: envelope.status,
        code: envelope.code,
        verification_state: fields.verification_state,
        verification_status: fields.verification_status,
        verification_strategy: fields.verification_strategy,
        verification_date: fields.verification_date,
        is_verified: fields.is_verified,
    }
}

/// HTTP client for the remote verification service.
pub struct RemoteApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RemoteApiClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.api_url, &config.api_key)
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiEnvelope<T>, VerifyError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        if status.is_server_error() {
            return Err(VerifyError::Transport(format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| VerifyError::Transport(format!("bad response body: {}", e)))
    }

    async fn do_create(&self, payload: OrderCreationPayload) -> Result<RemoteOrder, VerifyError> {
        let url = format!("{}/v1/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let envelope: ApiEnvelope<RemoteOrder> = Self::decode(response).await?;
        if !envelope.status {
            return Err(VerifyError::RemoteRejection {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }

        envelope.data.ok_or_else(|| VerifyError::RemoteRejection {
            code: envelope.code,
            message: "order creation response carried no order".to_string(),
        })
    }

    async fn do_verify(&self, remote_order_id: String) -> Result<VerificationResult, VerifyError> {
        let url = format!("{}/v1/orders/{}/verify", self.base_url, remote_order_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        let envelope: ApiEnvelope<VerificationFields> = Self::decode(response).await?;
        if !envelope.status {
            let message = envelope.message.clone().unwrap_or_default();
            return Err(classify_rejection(envelope.code, message, &remote_order_id));
        }

        Ok(to_result(envelope))
    }

    async fn do_retrieve(
        &self,
        remote_order_id: String,
    ) -> Result<Option<VerificationResult>, VerifyError> {
        let url = format!("{}/v1/orders/{}", self.base_url, remote_order_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| VerifyError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: ApiEnvelope<VerificationFields> = Self::decode(response).await?;
        if !envelope.status || envelope.data.is_none() {
            return Ok(None);
        }

        Ok(Some(to_result(envelope)))
    }
}

impl VerificationApi for RemoteApiClient {
    fn create_remote_order(&self, payload: OrderCreationPayload) -> ApiFuture<'_, RemoteOrder> {
        Box::pin(self.do_create(payload))
    }

    fn verify_remote_order(&self, remote_order_id: String) -> ApiFuture<'_, VerificationResult> {
        Box::pin(self.do_verify(remote_order_id))
    }

    fn retrieve_verification_status(
        &self,
        remote_order_id: String,
    ) -> ApiFuture<'_, Option<VerificationResult>> {
        Box::pin(self.do_retrieve(remote_order_id))
    }
}
