use crate::error::ModelError;
use async_trait::async_trait;
use helpdesk_core::ModelSettings;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One request to the model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPrompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Generative model seam
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &CompletionPrompt,
        timeout: Duration,
    ) -> Result<String, ModelError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(endpoint: &str, model: &str, api_key: &str) -> Result<Self, ModelError> {
        if api_key.trim().is_empty() {
            return Err(ModelError::MissingApiKey("api key".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| ModelError::InvalidResponse(format!("invalid API key header: {e}")))?,
        );

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        let base = endpoint.trim().trim_end_matches('/');
        let url = if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{base}/chat/completions")
        };

        Ok(Self {
            client,
            url,
            model: model.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ModelClient for ChatCompletionsClient {
    async fn complete(
        &self,
        prompt: &CompletionPrompt,
        timeout: Duration,
    ) -> Result<String, ModelError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "max_tokens": prompt.max_tokens,
            "temperature": prompt.temperature,
        });

        let response = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ModelError::InvalidResponse("missing choices[0].message.content".into()))
    }
}

/// Model used when no endpoint is configured. Every call is unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledModel;

#[async_trait]
impl ModelClient for DisabledModel {
    async fn complete(
        &self,
        _prompt: &CompletionPrompt,
        _timeout: Duration,
    ) -> Result<String, ModelError> {
        Err(ModelError::Disabled)
    }
}

/// Build the configured model client. A missing endpoint disables the
/// model; an endpoint without an API key is a startup error.
pub fn model_from_settings(settings: &ModelSettings) -> Result<Arc<dyn ModelClient>, ModelError> {
    let Some(endpoint) = settings.endpoint.as_deref() else {
        warn!("no model endpoint configured, unmatched questions get the fallback answer");
        return Ok(Arc::new(DisabledModel));
    };
    let api_key = settings
        .api_key()
        .ok_or_else(|| ModelError::MissingApiKey(settings.api_key_env.clone()))?;

    let client = ChatCompletionsClient::new(endpoint, &settings.model, &api_key)?;
    info!(url = client.url(), model = %settings.model, "model client ready");
    Ok(Arc::new(client))
}
