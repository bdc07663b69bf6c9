//! Chat-completions client for the extraction service

use crate::extract::{ExtractError, ExtractResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the API key
const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Default OpenAI-compatible endpoint
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default extraction model
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

/// Default instruction prepended to the page text
pub const DEFAULT_PROMPT: &str =
    "Extract the product name, price, and description and the product attributes from the following text";

/// Request timeout for one API call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// API call attempts before giving up
const MAX_ATTEMPTS: u32 = 4;

/// Initial backoff between attempts; doubles each retry
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Token counts reported by the service for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// One successful extraction: the model's answer plus its token usage
#[derive(Debug, Clone)]
pub struct Extraction {
    pub content: String,
    pub usage: TokenUsage,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: UsageBody,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct UsageBody {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Client for an OpenAI-compatible chat-completions extraction endpoint
#[derive(Debug)]
pub struct ExtractClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_attempts: u32,
}

impl ExtractClient {
    /// Creates a client with an explicit API key and the default model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Creates a client from the `GROQ_API_KEY` environment variable
    pub fn from_env() -> ExtractResult<Self> {
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| ExtractError::MissingApiKey(API_KEY_ENV))?;
        Ok(Self::new(api_key))
    }

    /// Overrides the endpoint base URL (proxies, self-hosted gateways, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The model this client sends requests for
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Extracts structured product information from page text
    ///
    /// `prompt` replaces the default instruction when given; the page text is
    /// appended after a colon either way. Transient API failures are retried
    /// with doubling backoff up to the attempt limit.
    pub async fn extract(&self, text: &str, prompt: Option<&str>) -> ExtractResult<Extraction> {
        let full_prompt = format!("{}: {}", prompt.unwrap_or(DEFAULT_PROMPT), text);

        let mut backoff = BACKOFF_BASE;
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tracing::info!("Retrying extraction in {:?} (attempt {})", backoff, attempt);
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.call_api(&full_prompt).await {
                Ok(extraction) => return Ok(extraction),
                Err(ExtractError::Api { status, message }) if status < 500 && status != 429 => {
                    // Client errors will not improve on retry
                    return Err(ExtractError::Api { status, message });
                }
                Err(e) => {
                    tracing::warn!("Extraction attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(ExtractError::Exhausted {
            attempts: self.max_attempts,
            last: last_error,
        })
    }

    async fn call_api(&self, prompt: &str) -> ExtractResult<Extraction> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::MalformedResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractError::MalformedResponse("no choices in response".into()))?;

        Ok(Extraction {
            content,
            usage: TokenUsage {
                input_tokens: body.usage.prompt_tokens,
                output_tokens: body.usage.completion_tokens,
                total_tokens: body.usage.total_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        })
    }

    #[tokio::test]
    async fn test_extract_parses_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Name: Widget")))
            .mount(&server)
            .await;

        let client = ExtractClient::new("test-key").with_base_url(server.uri());
        let extraction = client.extract("widget page text", None).await.unwrap();

        assert_eq!(extraction.content, "Name: Widget");
        assert_eq!(extraction.usage.input_tokens, 120);
        assert_eq!(extraction.usage.output_tokens, 30);
        assert_eq!(extraction.usage.total_tokens, 150);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ExtractClient::new("test-key").with_base_url(server.uri());
        let result = client.extract("text", None).await;

        assert!(matches!(
            result.unwrap_err(),
            ExtractError::Api { status: 400, .. }
        ));
    }

    #[tokio::test]
    async fn test_custom_prompt_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(wiremock::matchers::body_string_contains(
                "Summarize the reviews",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("ok")))
            .mount(&server)
            .await;

        let client = ExtractClient::new("test-key").with_base_url(server.uri());
        let extraction = client
            .extract("review text", Some("Summarize the reviews"))
            .await
            .unwrap();
        assert_eq!(extraction.content, "ok");
    }

    #[test]
    fn test_from_env_missing_key() {
        // The variable is absent in the test environment
        std::env::remove_var("GROQ_API_KEY");
        assert!(matches!(
            ExtractClient::from_env().unwrap_err(),
            ExtractError::MissingApiKey(_)
        ));
    }
}
