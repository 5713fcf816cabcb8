use std::time::Duration;

use log::warn;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;

use crate::error::{IngestError, Result};
use crate::llm::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Total attempts for a rate-limited request before surfacing a terminal
/// error. Only rate-limit signals are retried; every other failure surfaces
/// immediately.
const RATE_LIMIT_ATTEMPTS: u32 = 3;
const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(30);

/// HTTP client for the extraction model.
#[derive(Clone)]
pub struct OracleClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    rate_limit_cooldown: Duration,
}

impl OracleClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    pub fn with_rate_limit_cooldown(mut self, cooldown: Duration) -> Self {
        self.rate_limit_cooldown = cooldown;
        self
    }

    /// Sends one system + user instruction pair and returns the model's text
    /// response. Retries only on a rate-limit signal, with a fixed cooldown
    /// between attempts.
    pub(crate) async fn generate_content(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: vec![Content::user(user_prompt)],
            system_instruction: Some(Content::user(system_prompt)),
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let mut attempt = 0;
        loop {
            attempt += 1;

            let res = self
                .client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| IngestError::OracleUnavailable(e.to_string()))?;
            let status = res.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= RATE_LIMIT_ATTEMPTS {
                    return Err(IngestError::OracleRateLimited { attempts: attempt });
                }
                warn!(
                    "extraction model rate limited (attempt {attempt}/{RATE_LIMIT_ATTEMPTS}), cooling down for {}s",
                    self.rate_limit_cooldown.as_secs()
                );
                sleep(self.rate_limit_cooldown).await;
                continue;
            }

            if !status.is_success() {
                let err_text = res.text().await.unwrap_or_default();
                return Err(IngestError::OracleUnavailable(format!(
                    "extraction model returned status {status}: {err_text}"
                )));
            }

            let body: GenerateContentResponse = res
                .json()
                .await
                .map_err(|e| IngestError::MalformedOracleResponse(e.to_string()))?;

            let text = body
                .candidates
                .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
                .and_then(|c| c.content.parts.into_iter().next())
                .map(|p| p.text)
                .ok_or_else(|| {
                    IngestError::MalformedOracleResponse(
                        "response carried no candidate text".to_string(),
                    )
                })?;

            return Ok(text);
        }
    }
}

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}
