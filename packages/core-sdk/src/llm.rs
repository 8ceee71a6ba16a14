use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::Message;

/** \brief Groq's OpenAI-compatible API root. */
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai";
pub const GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/**
 * \brief One chat completion request: system + user turns and sampling limits.
 */
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(model: &str, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![Message::system(system), Message::user(user)],
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/**
 * \brief Something that can turn a chat request into reply text.
 */
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/**
 * \brief HTTP client bound to one API key.
 */
#[derive(Debug, Clone)]
pub struct GroqClient {
    api_base: String,
    client: reqwest::Client,
}

impl GroqClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base(GROQ_API_BASE, api_key)
    }

    /**
     * \brief Build a client for an OpenAI-compatible base URL.
     * \details Fails on an empty key or a key that cannot be sent as a header.
     */
    pub fn with_base(api_base: &str, api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("api key is empty");
        }
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| anyhow!("api key contains characters not allowed in a header"))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.api_base)
    }
}

#[async_trait]
impl ChatBackend for GroqClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let resp = self
            .client
            .post(self.completions_url())
            .json(&request_body(request))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("request failed: {} -> {}", status, text));
        }
        let v: Value = resp.json().await?;
        Ok(extract_openai_content(&v))
    }
}

fn request_body(request: &ChatRequest) -> Value {
    json!({
        "model": request.model,
        "messages": request.messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "stream": false
    })
}

fn extract_openai_content(v: &Value) -> String {
    v.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}

/**
 * \brief Coarse category of a failed chat call, derived from its error text.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    RateLimited,
    ModelUnavailable,
    Unknown,
}

/**
 * \brief Case-insensitive substring match on the error text; first matching class wins.
 */
pub fn classify(error_text: &str) -> ErrorKind {
    let text = error_text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));
    if has(&["api_key", "authentication", "401"]) {
        ErrorKind::Auth
    } else if has(&["rate limit", "quota", "429"]) {
        ErrorKind::RateLimited
    } else if has(&["model", "404"]) {
        ErrorKind::ModelUnavailable
    } else {
        ErrorKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_priority_and_case() {
        assert_eq!(classify("request failed: 401 Unauthorized -> {}"), ErrorKind::Auth);
        assert_eq!(classify("401 unauthorized"), ErrorKind::Auth);
        assert_eq!(classify("Invalid API_KEY provided"), ErrorKind::Auth);
        assert_eq!(classify("Authentication failed"), ErrorKind::Auth);
        assert_eq!(
            classify("request failed: 429 Too Many Requests -> Rate limit reached for model"),
            ErrorKind::RateLimited
        );
        assert_eq!(classify("monthly QUOTA exceeded"), ErrorKind::RateLimited);
        assert_eq!(
            classify("request failed: 404 Not Found -> {}"),
            ErrorKind::ModelUnavailable
        );
        assert_eq!(classify("The Model does not exist"), ErrorKind::ModelUnavailable);
        assert_eq!(classify("connection reset by peer"), ErrorKind::Unknown);
        assert_eq!(classify(""), ErrorKind::Unknown);
    }

    #[test]
    fn test_auth_wins_over_model_mention() {
        assert_eq!(
            classify("authentication failed for model llama"),
            ErrorKind::Auth
        );
    }

    #[test]
    fn test_request_body_shape() {
        let req = ChatRequest::new(GROQ_MODEL, "sys", "hi").max_tokens(200);
        let body = request_body(&req);
        assert_eq!(body["model"], GROQ_MODEL);
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hi");
        let temperature = body["temperature"].as_f64().expect("temperature");
        assert!((temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_extract_content() {
        let v = json!({"choices": [{"message": {"role": "assistant", "content": "  water weekly "}}]});
        assert_eq!(extract_openai_content(&v), "  water weekly ");
        assert_eq!(extract_openai_content(&json!({"choices": []})), "");
    }

    #[test]
    fn test_client_construction() {
        let client = GroqClient::with_base("https://example.test/openai/", "gsk_abc")
            .expect("build client");
        assert_eq!(
            client.completions_url(),
            "https://example.test/openai/v1/chat/completions"
        );
        assert!(GroqClient::new("").is_err());
        assert!(GroqClient::new("bad\nkey").is_err());
    }
}
