//! Google Gemini generateContent adapter.
//!
//! Wire: `POST {base_url}/models/{model}:generateContent?key={api_key}`,
//! `{contents:[{role, parts:[{text}]}], generationConfig:{temperature, topP, maxOutputTokens}}`.
//! Success text lives at `candidates[0].content.parts[0].text`; errors at the
//! top-level `error.message`.
//!
//! There is no system role on this wire, so the persona is inlined as a prefix
//! of the final user turn.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompts::build;
use super::{ChatRole, GenerationRequest, LlmError, ProviderConfig, TEMPERATURE};

const TOP_P: f32 = 0.95;
const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorBody>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub(crate) async fn send(
    http: &Client,
    request: &GenerationRequest,
    config: &ProviderConfig,
) -> Result<String, LlmError> {
    let url = format!(
        "{}/models/{}:generateContent",
        config.base_url.trim_end_matches('/'),
        config.model
    );
    let final_turn = build(
        request.system_instruction.as_deref(),
        &request.user_text,
        request.wants_structured_output,
    );
    let body = GenerateContentRequest {
        contents: wire_contents(request, &final_turn),
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_output_tokens: request.max_tokens,
            response_mime_type: request.wants_structured_output.then_some(JSON_MIME_TYPE),
        },
    };

    // The key travels in the query string; strip URLs from transport errors
    // so it never ends up in a log line.
    let response = http
        .post(&url)
        .query(&[("key", config.api_key.as_str())])
        .json(&body)
        .send()
        .await
        .map_err(|e| LlmError::Transport(e.without_url()))?;

    let status = response.status().as_u16();
    let raw = response
        .text()
        .await
        .map_err(|e| LlmError::Transport(e.without_url()))?;
    parse_reply(status, &raw)
}

fn gemini_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

fn wire_contents<'a>(request: &'a GenerationRequest, final_turn: &'a str) -> Vec<Content<'a>> {
    request
        .prior_messages
        .iter()
        .map(|m| Content {
            role: gemini_role(m.role),
            parts: vec![Part { text: &m.text }],
        })
        .chain(std::iter::once(Content {
            role: "user",
            parts: vec![Part { text: final_turn }],
        }))
        .collect()
}

fn parse_reply(status: u16, raw: &str) -> Result<String, LlmError> {
    let parsed = serde_json::from_str::<GenerateContentResponse>(raw);

    if let Ok(GenerateContentResponse {
        error: Some(error), ..
    }) = &parsed
    {
        return Err(LlmError::Provider {
            code: error.code,
            message: error.message.clone(),
        });
    }

    if !(200..300).contains(&status) {
        return Err(LlmError::http(status, raw));
    }

    let reply = parsed?;
    if let Some(reason) = reply
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(LlmError::Provider {
            code: 0,
            message: format!("prompt blocked: {reason}"),
        });
    }

    reply
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::EmptyContent)
}
