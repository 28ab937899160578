use crate::config::AIConfig;
use crate::error::RemoteFixError;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// One chat completion round-trip. Implementations must honour `timeout`.
pub trait CompletionTransport: Send + Sync {
    fn complete(&self, system: &str, user: &str, timeout: Duration) -> Result<String, RemoteFixError>;

    /// Model identifier for logs and reports
    fn model(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    OpenAi,
    Anthropic,
    Ollama,
}

/// Blocking HTTP transport for OpenAI, Anthropic and Ollama chat APIs
pub struct HttpTransport {
    provider: Provider,
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

/// Resolve the API key from config or the provider's environment variable
pub fn resolve_api_key(config: &AIConfig) -> Option<String> {
    // Ollama runs locally without a key
    if config.provider == "ollama" {
        return Some(String::new());
    }
    if let Some(key) = &config.api_key {
        if !key.is_empty() {
            return Some(key.clone());
        }
    }
    let env_var = match config.provider.as_str() {
        "anthropic" => "ANTHROPIC_API_KEY",
        _ => "OPENAI_API_KEY",
    };
    std::env::var(env_var).ok().filter(|k| !k.is_empty())
}

impl HttpTransport {
    pub fn from_config(config: &AIConfig) -> Result<Self, RemoteFixError> {
        let provider = match config.provider.as_str() {
            "anthropic" => Provider::Anthropic,
            "ollama" => Provider::Ollama,
            _ => Provider::OpenAi,
        };
        let api_key =
            resolve_api_key(config).ok_or_else(|| RemoteFixError::NoApiKey(config.provider.clone()))?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| match provider {
                Provider::OpenAi => "https://api.openai.com".to_string(),
                Provider::Anthropic => "https://api.anthropic.com".to_string(),
                Provider::Ollama => "http://localhost:11434".to_string(),
            })
            .trim_end_matches('/')
            .to_string();
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| RemoteFixError::Connection(e.to_string()))?;

        Ok(Self {
            provider,
            api_key,
            model: config.model.clone(),
            base_url,
            client,
        })
    }

    fn send(&self, url: &str, body: &Value, timeout: Duration) -> Result<Value, RemoteFixError> {
        let mut req = self
            .client
            .post(url)
            .timeout(timeout)
            .header("content-type", "application/json")
            .json(body);
        req = match self.provider {
            Provider::OpenAi => req.header("Authorization", format!("Bearer {}", self.api_key)),
            Provider::Anthropic => req
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
            Provider::Ollama => req,
        };

        let resp = req.send().map_err(map_reqwest_error)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(classify_status(status.as_u16(), &text));
        }
        resp.json::<Value>()
            .map_err(|e| RemoteFixError::Malformed(e.to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> RemoteFixError {
    if e.is_timeout() {
        RemoteFixError::Timeout
    } else {
        RemoteFixError::Connection(e.to_string())
    }
}

/// Map a non-success HTTP status to a failure kind
pub fn classify_status(status: u16, body: &str) -> RemoteFixError {
    if status == 429 {
        let lower = body.to_lowercase();
        if lower.contains("insufficient_quota") || lower.contains("quota") {
            return RemoteFixError::QuotaExhausted;
        }
        return RemoteFixError::RateLimited;
    }
    RemoteFixError::Http {
        status,
        body: body.chars().take(300).collect(),
    }
}

impl CompletionTransport for HttpTransport {
    fn complete(&self, system: &str, user: &str, timeout: Duration) -> Result<String, RemoteFixError> {
        let content = match self.provider {
            Provider::OpenAi => {
                let body = json!({
                    "model": self.model,
                    "temperature": 0.1,
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": user}
                    ]
                });
                let json = self.send(&format!("{}/v1/chat/completions", self.base_url), &body, timeout)?;
                json["choices"][0]["message"]["content"]
                    .as_str()
                    .unwrap_or("")
                    .to_string()
            }
            Provider::Anthropic => {
                let body = json!({
                    "model": self.model,
                    "max_tokens": 4096,
                    "system": system,
                    "messages": [{"role": "user", "content": user}]
                });
                let json = self.send(&format!("{}/v1/messages", self.base_url), &body, timeout)?;
                json["content"][0]["text"].as_str().unwrap_or("").to_string()
            }
            Provider::Ollama => {
                let body = json!({
                    "model": self.model,
                    "stream": false,
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": user}
                    ]
                });
                let json = self.send(&format!("{}/api/chat", self.base_url), &body, timeout)?;
                json["message"]["content"].as_str().unwrap_or("").to_string()
            }
        };

        if content.trim().is_empty() {
            return Err(RemoteFixError::Malformed("empty completion".to_string()));
        }
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Result of a one-token health check request
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub ok: bool,
    pub model: String,
    pub latency_ms: u64,
    pub error: Option<String>,
}

pub fn health_check(transport: &dyn CompletionTransport, timeout: Duration) -> HealthReport {
    let start = Instant::now();
    let result = transport.complete("healthcheck", "ping", timeout);
    HealthReport {
        ok: result.is_ok(),
        model: transport.model().to_string(),
        latency_ms: start.elapsed().as_millis() as u64,
        error: result.err().map(|e| e.to_string()),
    }
}
