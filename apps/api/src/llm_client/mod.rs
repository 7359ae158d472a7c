/// LLM Client: the single point of entry for every provider call in the service.
///
/// ARCHITECTURAL RULE: agents never talk HTTP themselves. They hand a
/// `GenerationRequest` plus a `ProviderConfig` snapshot to an `LlmBackend`.
///
/// Providers are a closed set (`ProviderId`). Adding one means adding a variant
/// and an adapter module next to `minimax.rs` / `gemini.rs`, never a string
/// comparison at the call site.
///
/// No retries happen here: one attempt per request, bounded by the per-call
/// timeout carried in `ProviderConfig`.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub mod extract;
pub mod gemini;
pub mod minimax;
pub mod prompts;

/// Per-call timeout used when `AI_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 75;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
const CONNECT_TIMEOUT_SECS: u64 = 10;
pub(crate) const TEMPERATURE: f32 = 0.7;
/// Upper bound on how much of an error body is kept in `LlmError::Http`.
const MAX_ERROR_BODY_CHARS: usize = 512;

// ────────────────────────────────────────────────────────────────────────────
// Providers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// MiniMax chat-completion API with an embedded `base_resp` status pair.
    MiniMax,
    /// Google Gemini generateContent API keyed by query parameter.
    Gemini,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::MiniMax => "minimax",
            ProviderId::Gemini => "gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderId::MiniMax => "abab6.5s-chat",
            ProviderId::Gemini => "gemini-1.5-flash",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::MiniMax => "https://api.minimax.chat/v1",
            ProviderId::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderId::MiniMax => "MINIMAX_API_KEY",
            ProviderId::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown provider '{0}' (expected 'minimax' or 'gemini')")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimax" => Ok(ProviderId::MiniMax),
            "gemini" => Ok(ProviderId::Gemini),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// Immutable snapshot of everything one provider call needs.
/// Built by a `ConfigSource` per request; never written by the core.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

// Hand-written so API keys never reach the logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalized request / result
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One prior turn of a conversation, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

#[cfg(test)]
impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Provider-agnostic request. `prior_messages` is chronological and is
/// forwarded as-is: never reordered, never deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: Option<String>,
    pub prior_messages: Vec<ChatMessage>,
    pub user_text: String,
    pub wants_structured_output: bool,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            system_instruction: None,
            prior_messages: Vec::new(),
            user_text: user_text.into(),
            wants_structured_output: false,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system(mut self, system_instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(system_instruction.into());
        self
    }

    pub fn with_history(mut self, prior_messages: Vec<ChatMessage>) -> Self {
        self.prior_messages = prior_messages;
        self
    }

    pub fn structured(mut self) -> Self {
        self.wants_structured_output = true;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Text(String),
    Structured(Map<String, Value>),
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("provider error (code {code}): {message}")]
    Provider { code: i64, message: String },

    #[error("provider returned empty content")]
    EmptyContent,

    #[error("malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Coarse classification used for logging and routing to fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or HTTP-layer failure reaching the provider.
    Transport,
    Timeout,
    /// Provider reached but answered with an application-level error.
    Provider,
}

impl LlmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::Timeout { .. } => ErrorKind::Timeout,
            LlmError::Transport(e) if e.is_timeout() => ErrorKind::Timeout,
            LlmError::Http { .. } | LlmError::Transport(_) => ErrorKind::Transport,
            LlmError::Provider { .. } | LlmError::EmptyContent | LlmError::Decode(_) => {
                ErrorKind::Provider
            }
        }
    }

    /// Builds an `Http` error, keeping only the head of a possibly huge body.
    pub(crate) fn http(status: u16, body: &str) -> Self {
        LlmError::Http {
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Backend seam + concrete client
// ────────────────────────────────────────────────────────────────────────────

/// The single outbound seam of the generation layer. `LlmClient` is the
/// production implementation; tests substitute scripted backends.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn send(
        &self,
        request: &GenerationRequest,
        config: &ProviderConfig,
    ) -> Result<String, LlmError>;
}

/// Shared HTTP client dispatching to the adapter selected by `ProviderConfig`.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
}

impl LlmClient {
    pub fn new() -> Result<Self, LlmError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl LlmBackend for LlmClient {
    async fn send(
        &self,
        request: &GenerationRequest,
        config: &ProviderConfig,
    ) -> Result<String, LlmError> {
        let call = async {
            match config.provider {
                ProviderId::MiniMax => minimax::send(&self.http, request, config).await,
                ProviderId::Gemini => gemini::send(&self.http, request, config).await,
            }
        };

        let text = tokio::time::timeout(Duration::from_secs(config.timeout_secs), call)
            .await
            .map_err(|_| LlmError::Timeout {
                secs: config.timeout_secs,
            })??;

        debug!(
            provider = %config.provider,
            model = %config.model,
            chars = text.len(),
            "Provider call succeeded"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(provider: ProviderId, base_url: String, timeout_secs: u64) -> ProviderConfig {
        ProviderConfig {
            provider,
            model: provider.default_model().to_string(),
            api_key: "secret-key".to_string(),
            base_url,
            timeout_secs,
        }
    }

    #[test]
    fn test_provider_id_parses_case_insensitively() {
        assert_eq!("MiniMax".parse::<ProviderId>(), Ok(ProviderId::MiniMax));
        assert_eq!(" gemini ".parse::<ProviderId>(), Ok(ProviderId::Gemini));
        assert_eq!(
            "openai".parse::<ProviderId>(),
            Err(UnknownProvider("openai".to_string()))
        );
    }

    #[test]
    fn test_provider_id_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderId::MiniMax).unwrap(),
            r#""minimax""#
        );
        let parsed: ProviderId = serde_json::from_str(r#""gemini""#).unwrap();
        assert_eq!(parsed, ProviderId::Gemini);
    }

    #[test]
    fn test_provider_config_debug_redacts_api_key() {
        let config = config_for(ProviderId::Gemini, "http://localhost".to_string(), 5);
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(LlmError::Timeout { secs: 3 }.kind(), ErrorKind::Timeout);
        assert_eq!(LlmError::http(502, "bad gateway").kind(), ErrorKind::Transport);
        assert_eq!(
            LlmError::Provider {
                code: 1004,
                message: "auth failed".to_string()
            }
            .kind(),
            ErrorKind::Provider
        );
        assert_eq!(LlmError::EmptyContent.kind(), ErrorKind::Provider);
    }

    #[test]
    fn test_http_error_body_is_capped() {
        let body = "x".repeat(4 * MAX_ERROR_BODY_CHARS);
        match LlmError::http(500, &body) {
            LlmError::Http { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY_CHARS),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_request_builder_keeps_history_order() {
        let history = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("second"),
            ChatMessage::user("first"),
        ];
        let request = GenerationRequest::new("next")
            .with_system("persona")
            .with_history(history.clone())
            .structured();
        assert_eq!(request.prior_messages, history);
        assert!(request.wants_structured_output);
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_client_times_out_on_silent_server() {
        // Accepts the connection, never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = LlmClient::new().unwrap();
        let config = config_for(ProviderId::MiniMax, format!("http://{addr}"), 1);
        let err = client
            .send(&GenerationRequest::new("hello"), &config)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_client_dispatches_to_selected_provider() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/text/chatcompletion_v2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}],
                    "base_resp":{"status_code":0,"status_msg":""}}"#,
            )
            .create_async()
            .await;

        let client = LlmClient::new().unwrap();
        let config = config_for(ProviderId::MiniMax, server.url(), 5);
        let text = client
            .send(&GenerationRequest::new("hello"), &config)
            .await
            .unwrap();

        assert_eq!(text, "hi");
        mock.assert_async().await;
    }
}
