#![forbid(unsafe_code)]

//! Blocking HTTP clients for the external decision-maker.
//!
//! The core only needs `(system_prompt, user_prompt) -> text | failure`.
//! Retry and backoff live here, so a caller sees either a reply or one
//! terminal error.

use std::env;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("provider={provider} error=transport kind={kind}")]
    Transport {
        provider: &'static str,
        kind: &'static str,
    },
    #[error("provider={provider} error=http_non_200 status={status}")]
    HttpStatus { provider: &'static str, status: u16 },
    #[error("provider={provider} error=malformed_response")]
    MalformedResponse { provider: &'static str },
    #[error("provider={provider} error=rate_limited")]
    RateLimited { provider: &'static str },
    #[error("provider={provider} error=missing_credentials")]
    MissingCredentials { provider: &'static str },
    #[error("provider={provider} error=retries_exhausted attempts={attempts} last=({last})")]
    RetriesExhausted {
        provider: &'static str,
        attempts: u32,
        last: Box<DecisionError>,
    },
    #[error("invalid decision provider config: {0}")]
    InvalidConfig(&'static str),
}

impl DecisionError {
    /// Errors that another attempt cannot fix.
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::MissingCredentials { .. } | Self::InvalidConfig(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAiChat,
    AnthropicMessages,
}

impl ProviderKind {
    pub fn from_env_value(value: Option<String>) -> Self {
        match value
            .as_deref()
            .map(str::trim)
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("anthropic") | Some("claude") => Self::AnthropicMessages,
            _ => Self::OpenAiChat,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAiChat => "openai",
            Self::AnthropicMessages => "anthropic",
        }
    }
}

/// How the two prompts are delivered to a chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    SystemAndUser,
    /// One user message `"{system}\n\n{user}"`, for models without a system role.
    CombinedUser,
}

impl PromptStyle {
    pub fn from_env_value(value: Option<String>) -> Self {
        match value
            .as_deref()
            .map(str::trim)
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("combined") => Self::CombinedUser,
            _ => Self::SystemAndUser,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn mvp_v1() -> Self {
        Self {
            max_attempts: 20,
            backoff_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionProviderConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_ms: u32,
    pub user_agent: String,
    pub prompt_style: PromptStyle,
    pub retry: RetryPolicy,
}

impl DecisionProviderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = ProviderKind::from_env_value(lookup("MM_PROVIDER"));
        let (api_key, base_url) = match provider {
            ProviderKind::OpenAiChat => (
                lookup("OPENAI_API_KEY"),
                lookup("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_DEFAULT_BASE_URL.to_string()),
            ),
            ProviderKind::AnthropicMessages => (
                lookup("ANTHROPIC_API_KEY"),
                lookup("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| ANTHROPIC_DEFAULT_BASE_URL.to_string()),
            ),
        };
        let defaults = RetryPolicy::mvp_v1();
        Self {
            provider,
            model: lookup("MM_MODEL").unwrap_or_else(|| "gpt-3.5-turbo-0613".to_string()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url,
            timeout_ms: parse_or(lookup("MM_TIMEOUT_MS"), 60_000),
            user_agent: lookup("MM_HTTP_USER_AGENT")
                .unwrap_or_else(|| "mm-engines/0.1".to_string()),
            prompt_style: PromptStyle::from_env_value(lookup("MM_PROMPT_STYLE")),
            retry: RetryPolicy {
                max_attempts: parse_or(lookup("MM_MAX_ATTEMPTS"), defaults.max_attempts),
                backoff_ms: parse_or(lookup("MM_RETRY_BACKOFF_MS"), defaults.backoff_ms),
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn validate_config(config: &DecisionProviderConfig) -> Result<ureq::Agent, DecisionError> {
    if config.model.trim().is_empty() {
        return Err(DecisionError::InvalidConfig("model must not be empty"));
    }
    if config.retry.max_attempts == 0 {
        return Err(DecisionError::InvalidConfig("max_attempts must be > 0"));
    }
    if config.api_key.is_none() {
        return Err(DecisionError::MissingCredentials {
            provider: config.provider.as_str(),
        });
    }
    build_http_agent(config.timeout_ms, &config.user_agent)
}

fn api_key(config: &DecisionProviderConfig) -> Result<&str, DecisionError> {
    config
        .api_key
        .as_deref()
        .ok_or(DecisionError::MissingCredentials {
            provider: config.provider.as_str(),
        })
}

/// OpenAI-compatible `/chat/completions` endpoint. Other vendors speaking the
/// same protocol are reached through `base_url`.
#[derive(Debug)]
pub struct OpenAiChatClient {
    config: DecisionProviderConfig,
    agent: ureq::Agent,
}

impl OpenAiChatClient {
    pub fn new(config: DecisionProviderConfig) -> Result<Self, DecisionError> {
        let agent = validate_config(&config)?;
        Ok(Self { config, agent })
    }

    pub fn config(&self) -> &DecisionProviderConfig {
        &self.config
    }

    pub fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        with_retries("openai", self.config.retry, thread::sleep, || {
            self.respond_once(system_prompt, user_prompt)
        })
    }

    fn respond_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        let api_key = api_key(&self.config)?;
        let endpoint = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = openai_payload(
            &self.config.model,
            self.config.prompt_style,
            system_prompt,
            user_prompt,
        );
        let response = self
            .agent
            .post(&endpoint)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Accept", "application/json")
            .send_json(payload)
            .map_err(|e| error_from_ureq(ProviderKind::OpenAiChat, e))?;
        let body: Value = response
            .into_json()
            .map_err(|_| DecisionError::MalformedResponse { provider: "openai" })?;
        extract_openai_text(&body)
    }
}

/// Anthropic `/v1/messages` endpoint.
#[derive(Debug)]
pub struct AnthropicMessagesClient {
    config: DecisionProviderConfig,
    agent: ureq::Agent,
}

impl AnthropicMessagesClient {
    pub fn new(config: DecisionProviderConfig) -> Result<Self, DecisionError> {
        let agent = validate_config(&config)?;
        Ok(Self { config, agent })
    }

    pub fn config(&self) -> &DecisionProviderConfig {
        &self.config
    }

    pub fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        with_retries("anthropic", self.config.retry, thread::sleep, || {
            self.respond_once(system_prompt, user_prompt)
        })
    }

    fn respond_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        let api_key = api_key(&self.config)?;
        let endpoint = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let payload = anthropic_payload(&self.config.model, system_prompt, user_prompt);
        let response = self
            .agent
            .post(&endpoint)
            .set("Content-Type", "application/json")
            .set("x-api-key", api_key)
            .set("anthropic-version", ANTHROPIC_VERSION)
            .send_json(payload)
            .map_err(|e| error_from_ureq(ProviderKind::AnthropicMessages, e))?;
        let body: Value = response
            .into_json()
            .map_err(|_| DecisionError::MalformedResponse {
                provider: "anthropic",
            })?;
        extract_anthropic_text(&body)
    }
}

/// Whichever client `DecisionProviderConfig::provider` selects.
#[derive(Debug)]
pub enum DecisionClient {
    OpenAi(OpenAiChatClient),
    Anthropic(AnthropicMessagesClient),
}

impl DecisionClient {
    pub fn from_config(config: DecisionProviderConfig) -> Result<Self, DecisionError> {
        match config.provider {
            ProviderKind::OpenAiChat => OpenAiChatClient::new(config).map(Self::OpenAi),
            ProviderKind::AnthropicMessages => {
                AnthropicMessagesClient::new(config).map(Self::Anthropic)
            }
        }
    }

    pub fn respond(&self, system_prompt: &str, user_prompt: &str) -> Result<String, DecisionError> {
        match self {
            Self::OpenAi(c) => c.respond(system_prompt, user_prompt),
            Self::Anthropic(c) => c.respond(system_prompt, user_prompt),
        }
    }
}

pub(crate) fn with_retries<S, F>(
    provider: &'static str,
    policy: RetryPolicy,
    sleep: S,
    mut call: F,
) -> Result<String, DecisionError>
where
    S: Fn(Duration),
    F: FnMut() -> Result<String, DecisionError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call() {
            Ok(text) => {
                debug!(provider, attempt, "decision-maker replied");
                return Ok(text);
            }
            Err(err) if err.is_terminal() => {
                warn!(provider, attempt, error = %err, "decision-maker failed; not retrying");
                return Err(err);
            }
            Err(err) if attempt >= policy.max_attempts => {
                warn!(provider, attempt, error = %err, "decision-maker retries exhausted");
                return Err(DecisionError::RetriesExhausted {
                    provider,
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                warn!(provider, attempt, error = %err, "decision-maker attempt failed");
                sleep(Duration::from_millis(policy.backoff_ms));
            }
        }
    }
}

fn openai_payload(model: &str, style: PromptStyle, system_prompt: &str, user_prompt: &str) -> Value {
    let messages = match style {
        PromptStyle::SystemAndUser => json!([
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": user_prompt},
        ]),
        PromptStyle::CombinedUser => json!([
            {"role": "user", "content": format!("{system_prompt}\n\n{user_prompt}")},
        ]),
    };
    json!({ "model": model, "messages": messages })
}

fn anthropic_payload(model: &str, system_prompt: &str, user_prompt: &str) -> Value {
    json!({
        "model": model,
        "max_tokens": ANTHROPIC_MAX_TOKENS,
        "temperature": 0,
        "system": system_prompt,
        "messages": [
            {"role": "user", "content": [{"type": "text", "text": user_prompt}]}
        ],
    })
}

fn extract_openai_text(body: &Value) -> Result<String, DecisionError> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(DecisionError::MalformedResponse { provider: "openai" })
}

fn extract_anthropic_text(body: &Value) -> Result<String, DecisionError> {
    body.pointer("/content/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(DecisionError::MalformedResponse {
            provider: "anthropic",
        })
}

fn build_http_agent(timeout_ms: u32, user_agent: &str) -> Result<ureq::Agent, DecisionError> {
    if timeout_ms == 0 {
        return Err(DecisionError::InvalidConfig("timeout must be > 0"));
    }
    let timeout = Duration::from_millis(u64::from(timeout_ms).max(100));
    Ok(ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .timeout_write(timeout)
        .user_agent(user_agent)
        .build())
}

fn error_from_ureq(provider: ProviderKind, err: ureq::Error) -> DecisionError {
    let name = provider.as_str();
    match err {
        ureq::Error::Status(429, _) if provider == ProviderKind::AnthropicMessages => {
            DecisionError::RateLimited { provider: name }
        }
        ureq::Error::Status(status, _) => DecisionError::HttpStatus {
            provider: name,
            status,
        },
        ureq::Error::Transport(transport) => {
            let combined = format!("{:?} {}", transport.kind(), transport);
            DecisionError::Transport {
                provider: name,
                kind: classify_transport_error_kind(&combined),
            }
        }
    }
}

fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}
