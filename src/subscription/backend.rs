use async_trait::async_trait;
use serde_json::Value;

use super::model::SubscriptionPayload;
use crate::{
    error::TransmissionError,
    http_client::{HttpClient, HttpMethod},
};

/// Decoded reply of the subscription endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait SubscriptionBackend: Send + Sync {
    async fn send_subscription(
        &self,
        payload: &SubscriptionPayload,
        token: &str,
    ) -> Result<BackendReply, TransmissionError>;
}

/// Posts subscriptions to `<base_url><path>` with a bearer token.
pub struct HttpSubscriptionBackend {
    url: String,
}

impl HttpSubscriptionBackend {
    pub fn new(base_url: &str, path: &str) -> Self {
        Self {
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SubscriptionBackend for HttpSubscriptionBackend {
    async fn send_subscription(
        &self,
        payload: &SubscriptionPayload,
        token: &str,
    ) -> Result<BackendReply, TransmissionError> {
        let body = serde_json::to_string(payload).map_err(TransmissionError::Encode)?;
        let authorization = format!("Bearer {}", token);
        let headers = [
            ("Content-Type", "application/json"),
            ("Authorization", authorization.as_str()),
        ];

        let response = HttpClient::fetch(HttpMethod::POST, &self.url, &headers, Some(&body))
            .await
            .map_err(TransmissionError::Network)?;

        let text = response.body.clone().unwrap_or_default();
        if !response.is_success() {
            return Err(TransmissionError::Rejected {
                status: response.status,
                body: text,
            });
        }

        let body = serde_json::from_str(&text).map_err(TransmissionError::InvalidResponse)?;
        Ok(BackendReply {
            status: response.status,
            body,
        })
    }
}
