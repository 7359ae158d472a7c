//! Interview agent: question sets, interviewer turns and answer evaluation.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::prompts::{
    list_slot, slot, INTERVIEWER_PERSONA, INTERVIEW_CHAT_CONTEXT, INTERVIEW_EVALUATION_TEMPLATE,
    INTERVIEW_QUESTIONS_TEMPLATE, NOT_PROVIDED,
};
use crate::agents::schema::{lenient_f64, FieldKind, FieldSpec, TaskSchema};
use crate::agents::{Generated, StructuredGenerator, TaskId};
use crate::config::ConfigError;
use crate::llm_client::{ChatMessage, ChatRole, GenerationRequest};

pub const MIN_QUESTIONS: usize = 1;
pub const MAX_QUESTIONS: usize = 20;
pub const DEFAULT_QUESTIONS: usize = 5;

/// Interviewer turns are short; keep the budget small so replies stay snappy.
const REPLY_MAX_TOKENS: u32 = 512;
const EVALUATION_MAX_TOKENS: u32 = 1536;

pub static QUESTIONS_SCHEMA: TaskSchema =
    TaskSchema::new(&[FieldSpec::required("questions", FieldKind::ObjectList)]);

pub static EVALUATION_SCHEMA: TaskSchema = TaskSchema::new(&[
    FieldSpec::required("overallScore", FieldKind::Number),
    FieldSpec::optional("dimensions", FieldKind::ObjectList),
    FieldSpec::optional("strengths", FieldKind::StringList),
    FieldSpec::optional("improvements", FieldKind::StringList),
    FieldSpec::optional("recommendation", FieldKind::String),
]);

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterviewQuestion {
    pub question: String,
    pub category: String,
    pub difficulty: String,
    pub expected_points: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewQuestions {
    pub questions: Vec<InterviewQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionScore {
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub score: f64,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterviewEvaluation {
    pub overall_score: f64,
    pub dimensions: Vec<DimensionScore>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub recommendation: String,
}

impl InterviewEvaluation {
    fn normalized(mut self) -> Self {
        self.overall_score = self.overall_score.clamp(0.0, 100.0);
        for dimension in &mut self.dimensions {
            dimension.score = dimension.score.clamp(0.0, 100.0);
        }
        self
    }
}

/// Clamps a requested question count into the supported range.
pub fn clamp_count(requested: usize) -> usize {
    requested.clamp(MIN_QUESTIONS, MAX_QUESTIONS)
}

// ────────────────────────────────────────────────────────────────────────────
// Agent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct InterviewAgent {
    generator: StructuredGenerator,
}

impl InterviewAgent {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }

    pub async fn generate_questions(
        &self,
        role: &str,
        skills: &[String],
        experience_years: f64,
        count: usize,
    ) -> Result<Generated<InterviewQuestions>, ConfigError> {
        let count = clamp_count(count);
        let prompt = INTERVIEW_QUESTIONS_TEMPLATE
            .replace("{role}", slot(role))
            .replace("{skills}", &list_slot(skills))
            .replace("{experience_years}", &experience_years.max(0.0).to_string())
            .replace("{count}", &count.to_string());
        let request = GenerationRequest::new(prompt).with_system(INTERVIEWER_PERSONA);

        let generated = self
            .generator
            .generate::<InterviewQuestions>(TaskId::InterviewQuestions, request)
            .await?;

        Ok(generated.map(|mut set| {
            set.questions.retain(|q| !q.question.trim().is_empty());
            set.questions.truncate(count);
            info!(count = set.questions.len(), "Interview questions ready");
            set
        }))
    }

    /// Next interviewer turn. `history` is forwarded to the provider as given.
    pub async fn reply(
        &self,
        role: &str,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<Generated<String>, ConfigError> {
        let persona = format!(
            "{INTERVIEWER_PERSONA}\n\n{}",
            INTERVIEW_CHAT_CONTEXT.replace("{role}", slot(role))
        );
        let request = GenerationRequest::new(slot(message))
            .with_system(persona)
            .with_history(history.to_vec())
            .with_max_tokens(REPLY_MAX_TOKENS);

        self.generator
            .generate_text(TaskId::InterviewReply, request)
            .await
    }

    pub async fn evaluate(
        &self,
        role: &str,
        history: &[ChatMessage],
    ) -> Result<Generated<InterviewEvaluation>, ConfigError> {
        let prompt = INTERVIEW_EVALUATION_TEMPLATE
            .replace("{role}", slot(role))
            .replace("{transcript}", &transcript(history));
        let request = GenerationRequest::new(prompt)
            .with_system(INTERVIEWER_PERSONA)
            .with_max_tokens(EVALUATION_MAX_TOKENS);

        let generated = self
            .generator
            .generate::<InterviewEvaluation>(TaskId::InterviewEvaluation, request)
            .await?;
        Ok(generated.map(InterviewEvaluation::normalized))
    }
}

/// Renders a conversation as labelled lines, oldest first.
fn transcript(history: &[ChatMessage]) -> String {
    let lines: Vec<String> = history
        .iter()
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| {
            let speaker = match m.role {
                ChatRole::Assistant => "Interviewer",
                ChatRole::User => "Candidate",
            };
            format!("{speaker}: {}", m.text.trim())
        })
        .collect();

    if lines.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        lines.join("\n")
    }
}
