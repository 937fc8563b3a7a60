use std::time::Duration;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::AiConfig;
use crate::error::{AppError, AppResult};

/// One earlier exchange sent to the AI service as context.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HistoryTurn {
    pub user_message: String,
    pub ai_response: String,
}

#[async_trait]
pub trait AiClient: Send + Sync {
    async fn generate_response(&self, message: &str, history: &[HistoryTurn]) -> AppResult<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "no_history")]
    history: &'a [HistoryTurn],
}

fn no_history(history: &&[HistoryTurn]) -> bool {
    history.is_empty()
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Talks to the `/generate-response` endpoint of the AI microservice.
#[derive(Clone)]
pub struct HttpAiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAiClient {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/generate-response", config.base_url),
        })
    }
}

#[async_trait]
impl AiClient for HttpAiClient {
    async fn generate_response(&self, message: &str, history: &[HistoryTurn]) -> AppResult<String> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest { message, history })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %self.endpoint, "ai service unreachable");
                AppError::Upstream(format!("ai service request failed: {e}"))
            })?;

        let status = res.status();
        if !status.is_success() {
            error!(%status, endpoint = %self.endpoint, "ai service returned error status");
            return Err(AppError::Upstream(format!("ai service returned {status}")));
        }

        let body: GenerateResponse = res.json().await.map_err(|e| {
            error!(error = %e, "ai service returned malformed body");
            AppError::Upstream(format!("ai service body: {e}"))
        })?;
        debug!(history = history.len(), "ai response received");
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_empty_history() {
        let json = serde_json::to_value(GenerateRequest {
            message: "hello",
            history: &[],
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "message": "hello" }));
    }

    #[test]
    fn request_carries_history_turns() {
        let history = vec![HistoryTurn {
            user_message: "hi".into(),
            ai_response: "hello there".into(),
        }];
        let json = serde_json::to_value(GenerateRequest {
            message: "again",
            history: &history,
        })
        .unwrap();
        assert_eq!(json["history"][0]["ai_response"], "hello there");
    }

    #[tokio::test]
    async fn unreachable_service_is_upstream_error() {
        let client = HttpAiClient::new(&AiConfig {
            // port 9 (discard) on localhost is not expected to serve HTTP
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: 2,
            history_turns: 0,
        })
        .unwrap();
        let err = client.generate_response("hi", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
