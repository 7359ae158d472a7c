// Task agents: role-specific facades over the structured-generation pipeline.
// Each agent owns its persona, prompt templates, schema and fallback payload;
// StructuredGenerator owns the shared flow:
//   config snapshot → provider call → extract/repair → schema → typed output,
// with any external failure along the way answered by the fallback payload.

pub mod fallback;
pub mod handlers;
pub mod interview;
pub mod market;
pub mod prompts;
pub mod resume;
pub mod router;
pub mod schema;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ConfigError, ConfigSource};
use crate::llm_client::extract::{extract_with_outcome, Extraction};
use crate::llm_client::{GenerationRequest, GenerationResult, LlmBackend};
use schema::TaskSchema;

/// Every task the generation layer knows how to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    ResumeAnalysis,
    InterviewQuestions,
    InterviewReply,
    InterviewEvaluation,
    MarketAnalysis,
    TaskRouting,
}

impl TaskId {
    #[cfg(test)]
    pub const ALL: [TaskId; 6] = [
        TaskId::ResumeAnalysis,
        TaskId::InterviewQuestions,
        TaskId::InterviewReply,
        TaskId::InterviewEvaluation,
        TaskId::MarketAnalysis,
        TaskId::TaskRouting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::ResumeAnalysis => "resume_analysis",
            TaskId::InterviewQuestions => "interview_questions",
            TaskId::InterviewReply => "interview_reply",
            TaskId::InterviewEvaluation => "interview_evaluation",
            TaskId::MarketAnalysis => "market_analysis",
            TaskId::TaskRouting => "task_routing",
        }
    }

    /// Declared output schema; `None` for free-text tasks.
    pub fn schema(&self) -> Option<&'static TaskSchema> {
        match self {
            TaskId::ResumeAnalysis => Some(&resume::SCHEMA),
            TaskId::InterviewQuestions => Some(&interview::QUESTIONS_SCHEMA),
            TaskId::InterviewReply => None,
            TaskId::InterviewEvaluation => Some(&interview::EVALUATION_SCHEMA),
            TaskId::MarketAnalysis => Some(&market::SCHEMA),
            TaskId::TaskRouting => Some(&router::SCHEMA),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Result provenance
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Provider output parsed as-is.
    Live,
    /// Provider output was truncated and recovered; fields may be missing.
    Repaired,
    /// Canned, generic content. Live generation was unavailable or unusable.
    Fallback,
}

/// What every agent operation returns: the data plus where it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Generated<T> {
    pub data: T,
    pub source: ResultSource,
    pub generated_at: DateTime<Utc>,
}

impl<T> Generated<T> {
    pub fn new(data: T, source: ResultSource) -> Self {
        Self {
            data,
            source,
            generated_at: Utc::now(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Generated<U> {
        Generated {
            data: f(self.data),
            source: self.source,
            generated_at: self.generated_at,
        }
    }

    #[cfg(test)]
    pub fn is_fallback(&self) -> bool {
        self.source == ResultSource::Fallback
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared pipeline
// ────────────────────────────────────────────────────────────────────────────

/// The pipeline shared by all agents. Cheap to clone; holds no per-request
/// state, so concurrent requests never contend on anything but the config
/// read lock.
#[derive(Clone)]
pub struct StructuredGenerator {
    backend: Arc<dyn LlmBackend>,
    config: Arc<dyn ConfigSource>,
}

impl StructuredGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>, config: Arc<dyn ConfigSource>) -> Self {
        Self { backend, config }
    }

    /// Runs one request for `task`. Only a configuration error escapes; every
    /// transport, provider, extraction or schema failure is answered with the
    /// task's fallback payload.
    pub async fn run(
        &self,
        task: TaskId,
        request: GenerationRequest,
    ) -> Result<Generated<GenerationResult>, ConfigError> {
        let config = self.config.provider_config()?;
        let span = info_span!(
            "generate",
            task = task.as_str(),
            provider = %config.provider,
            request_id = %Uuid::new_v4(),
        );

        let outcome = async move {
            let raw = match self.backend.send(&request, &config).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(kind = ?e.kind(), "Provider call failed, serving fallback: {e}");
                    return fallback_for(task);
                }
            };

            let Some(schema) = task.schema().filter(|_| request.wants_structured_output) else {
                return Generated::new(
                    GenerationResult::Text(raw.trim().to_string()),
                    ResultSource::Live,
                );
            };

            let (value, extraction) = match extract_with_outcome(&raw) {
                Ok(extracted) => extracted,
                Err(e) => {
                    warn!(raw_len = raw.len(), "{e}, serving fallback");
                    return fallback_for(task);
                }
            };

            match schema.conform(value) {
                Ok(map) => {
                    let source = match extraction {
                        Extraction::Parsed => ResultSource::Live,
                        Extraction::Repaired => ResultSource::Repaired,
                    };
                    debug!(?source, "Structured output accepted");
                    Generated::new(GenerationResult::Structured(map), source)
                }
                Err(e) => {
                    warn!("Model output does not match schema ({e}), serving fallback");
                    fallback_for(task)
                }
            }
        }
        .instrument(span)
        .await;

        Ok(outcome)
    }

    /// Structured request decoded into the agent's output type.
    pub async fn generate<T>(
        &self,
        task: TaskId,
        request: GenerationRequest,
    ) -> Result<Generated<T>, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        let generated = self.run(task, request.structured()).await?;
        let source = generated.source;

        let decoded = match generated.data {
            GenerationResult::Structured(map) => {
                serde_json::from_value::<T>(Value::Object(map)).map_err(|e| e.to_string())
            }
            GenerationResult::Text(_) => Err("expected structured output".to_string()),
        };

        Ok(match decoded {
            Ok(data) => Generated::new(data, source),
            Err(e) => {
                warn!(task = task.as_str(), "Could not decode output ({e}), serving fallback");
                Generated::new(typed_fallback(task), ResultSource::Fallback)
            }
        })
    }

    /// Free-text request (conversation turns).
    pub async fn generate_text(
        &self,
        task: TaskId,
        request: GenerationRequest,
    ) -> Result<Generated<String>, ConfigError> {
        let generated = self.run(task, request).await?;
        Ok(generated.map(|result| match result {
            GenerationResult::Text(text) => text,
            GenerationResult::Structured(map) => Value::Object(map).to_string(),
        }))
    }
}

fn fallback_for(task: TaskId) -> Generated<GenerationResult> {
    Generated::new(fallback::fallback(task), ResultSource::Fallback)
}

/// Decodes the task's fallback payload into `T`. Every payload is covered by
/// tests, so the `Default` branch is unreachable in practice.
fn typed_fallback<T: DeserializeOwned + Default>(task: TaskId) -> T {
    match fallback::fallback(task) {
        GenerationResult::Structured(map) => {
            serde_json::from_value(Value::Object(map)).unwrap_or_default()
        }
        GenerationResult::Text(_) => T::default(),
    }
}

/// Shared test doubles for agent tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::config::{LlmSettings, StaticConfigSource};
    use crate::llm_client::{
        GenerationRequest, LlmBackend, LlmError, ProviderConfig, ProviderId,
    };

    use super::StructuredGenerator;

    /// Backend that replays scripted replies and records every request.
    #[derive(Default)]
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        pub fn replying(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn ok(text: &str) -> Arc<Self> {
            Self::replying(vec![Ok(text.to_string())])
        }

        pub fn failing(error: LlmError) -> Arc<Self> {
            Self::replying(vec![Err(error)])
        }

        pub fn last_request(&self) -> GenerationRequest {
            self.requests
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("backend was never called")
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn send(
            &self,
            request: &GenerationRequest,
            _config: &ProviderConfig,
        ) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    pub fn settings(api_key: Option<&str>) -> LlmSettings {
        let mut settings = LlmSettings::from_lookup(|_| None).unwrap();
        settings.active = ProviderId::Gemini;
        settings.gemini.api_key = api_key.map(str::to_string);
        settings
    }

    pub fn generator(backend: Arc<ScriptedBackend>) -> StructuredGenerator {
        StructuredGenerator::new(
            backend,
            Arc::new(StaticConfigSource(settings(Some("test-key")))),
        )
    }
}
