//! MiniMax chat-completion adapter.
//!
//! Wire: `POST {base_url}/text/chatcompletion_v2`, bearer auth,
//! `{model, messages:[{role, content}], temperature, max_tokens}`.
//! Success text lives at `choices[0].message.content`. Application errors come
//! back as `base_resp.status_code != 0`, usually with HTTP 200.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompts::build_user_turn;
use super::{GenerationRequest, LlmError, ProviderConfig, TEMPERATURE};

const CHAT_COMPLETION_PATH: &str = "/text/chatcompletion_v2";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BaseResp {
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

pub(crate) async fn send(
    http: &Client,
    request: &GenerationRequest,
    config: &ProviderConfig,
) -> Result<String, LlmError> {
    let url = format!(
        "{}{}",
        config.base_url.trim_end_matches('/'),
        CHAT_COMPLETION_PATH
    );
    let user_turn = build_user_turn(&request.user_text, request.wants_structured_output);
    let body = ChatCompletionRequest {
        model: &config.model,
        messages: wire_messages(request, &user_turn),
        temperature: TEMPERATURE,
        max_tokens: request.max_tokens,
    };

    let response = http
        .post(&url)
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await?;

    let status = response.status().as_u16();
    let raw = response.text().await?;
    parse_reply(status, &raw)
}

/// System persona first (MiniMax supports a system role), then the caller's
/// history untouched, then the current user turn.
fn wire_messages<'a>(request: &'a GenerationRequest, user_turn: &'a str) -> Vec<WireMessage<'a>> {
    let mut messages = Vec::with_capacity(request.prior_messages.len() + 2);

    if let Some(system) = request
        .system_instruction
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        messages.push(WireMessage {
            role: "system",
            content: system,
        });
    }
    messages.extend(request.prior_messages.iter().map(|m| WireMessage {
        role: m.role.as_str(),
        content: &m.text,
    }));
    messages.push(WireMessage {
        role: "user",
        content: user_turn,
    });

    messages
}

fn parse_reply(status: u16, raw: &str) -> Result<String, LlmError> {
    let parsed = serde_json::from_str::<ChatCompletionResponse>(raw);

    // The embedded status pair wins over the HTTP status: it carries the
    // provider's own reason even on non-2xx answers.
    if let Ok(ChatCompletionResponse {
        base_resp: Some(base),
        ..
    }) = &parsed
    {
        if base.status_code != 0 {
            return Err(LlmError::Provider {
                code: base.status_code,
                message: base.status_msg.clone(),
            });
        }
    }

    if !(200..300).contains(&status) {
        return Err(LlmError::http(status, raw));
    }

    parsed?
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::EmptyContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{ChatMessage, ErrorKind, ProviderId};
    use mockito::Matcher;
    use serde_json::json;

    fn config(base_url: String) -> ProviderConfig {
        ProviderConfig {
            provider: ProviderId::MiniMax,
            model: "abab-test".to_string(),
            api_key: "mm-key".to_string(),
            base_url,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_parse_reply_success() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"a\": 1}"}}],
            "base_resp": {"status_code": 0, "status_msg": "success"}
        }"#;
        assert_eq!(parse_reply(200, raw).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_parse_reply_embedded_error_with_http_200() {
        let raw = r#"{"base_resp": {"status_code": 1004, "status_msg": "authorized error"}}"#;
        match parse_reply(200, raw).unwrap_err() {
            LlmError::Provider { code, message } => {
                assert_eq!(code, 1004);
                assert_eq!(message, "authorized error");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_reply_http_failure_without_envelope_is_transport() {
        let err = parse_reply(503, "<html>upstream down</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_parse_reply_empty_choices() {
        let raw = r#"{"choices": [], "base_resp": {"status_code": 0}}"#;
        assert!(matches!(parse_reply(200, raw), Err(LlmError::EmptyContent)));
    }

    #[test]
    fn test_parse_reply_garbage_body_is_decode_error() {
        assert!(matches!(
            parse_reply(200, "not json"),
            Err(LlmError::Decode(_))
        ));
    }

    #[test]
    fn test_wire_messages_order() {
        let request = GenerationRequest::new("now")
            .with_system("persona")
            .with_history(vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")]);
        let messages = wire_messages(&request, "now");
        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages[1].content, "q1");
        assert_eq!(messages[3].content, "now");
    }

    #[tokio::test]
    async fn test_send_builds_authenticated_chat_completion_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/text/chatcompletion_v2")
            .match_header("authorization", "Bearer mm-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "abab-test",
                "max_tokens": 512,
                "messages": [
                    {"role": "system", "content": "persona"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"content":"hey there"}}],
                    "base_resp":{"status_code":0,"status_msg":""}}"#,
            )
            .create_async()
            .await;

        let request = GenerationRequest::new("hello")
            .with_system("persona")
            .with_max_tokens(512);
        let text = send(&Client::new(), &request, &config(server.url()))
            .await
            .unwrap();

        assert_eq!(text, "hey there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_surfaces_embedded_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/text/chatcompletion_v2")
            .with_status(200)
            .with_body(r#"{"base_resp":{"status_code":1002,"status_msg":"rate limit"}}"#)
            .create_async()
            .await;

        let err = send(
            &Client::new(),
            &GenerationRequest::new("hello"),
            &config(server.url()),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Provider);
    }
}
