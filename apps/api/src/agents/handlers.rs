//! Axum route handlers for the AI agent API.
//!
//! Handlers only translate HTTP to agent calls. Missing fields default to
//! empty values, which every agent tolerates; only a configuration error
//! turns into a non-2xx response.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::agents::interview::{
    InterviewEvaluation, InterviewQuestions, DEFAULT_QUESTIONS, MAX_QUESTIONS, MIN_QUESTIONS,
};
use crate::agents::market::MarketAnalysis;
use crate::agents::resume::ResumeAnalysis;
use crate::agents::router::RoutingPlan;
use crate::agents::Generated;
use crate::errors::AppError;
use crate::llm_client::{ChatMessage, ProviderId};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeAnalyzeRequest {
    pub resume_text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionsRequest {
    pub role: String,
    pub skills: Vec<String>,
    pub experience_years: f64,
    /// Clamped into the supported range, never rejected.
    pub count: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub role: String,
    pub message: String,
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: Generated<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EvaluateRequest {
    pub role: String,
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketRequest {
    pub role: String,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RouteRequest {
    pub task: String,
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub provider: ProviderId,
    /// False when the newly active provider has no API key; agent calls will
    /// answer 503 until another refresh fixes it.
    pub credentials_present: bool,
}

fn question_count(requested: Option<i64>) -> usize {
    requested
        .unwrap_or(DEFAULT_QUESTIONS as i64)
        .clamp(MIN_QUESTIONS as i64, MAX_QUESTIONS as i64) as usize
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/resume/analyze
pub async fn handle_resume_analyze(
    State(state): State<AppState>,
    payload: Result<Json<ResumeAnalyzeRequest>, JsonRejection>,
) -> Result<Json<Generated<ResumeAnalysis>>, AppError> {
    let Json(request) = payload?;
    let result = state.resume.analyze(&request.resume_text).await?;
    Ok(Json(result))
}

/// POST /api/v1/ai/interview/questions
pub async fn handle_interview_questions(
    State(state): State<AppState>,
    payload: Result<Json<QuestionsRequest>, JsonRejection>,
) -> Result<Json<Generated<InterviewQuestions>>, AppError> {
    let Json(request) = payload?;
    let result = state
        .interview
        .generate_questions(
            &request.role,
            &request.skills,
            request.experience_years,
            question_count(request.count),
        )
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/ai/interview/chat
///
/// Stateless: the caller owns the conversation and sends it back each turn.
pub async fn handle_interview_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload?;
    let reply = state
        .interview
        .reply(&request.role, &request.history, &request.message)
        .await?;
    Ok(Json(ChatResponse { reply }))
}

/// POST /api/v1/ai/interview/evaluate
pub async fn handle_interview_evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<Generated<InterviewEvaluation>>, AppError> {
    let Json(request) = payload?;
    let result = state
        .interview
        .evaluate(&request.role, &request.history)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/ai/market/analyze
pub async fn handle_market_analyze(
    State(state): State<AppState>,
    payload: Result<Json<MarketRequest>, JsonRejection>,
) -> Result<Json<Generated<MarketAnalysis>>, AppError> {
    let Json(request) = payload?;
    let result = state
        .market
        .analyze(
            &request.role,
            request.location.as_deref(),
            &request.skills,
            request.experience_years,
        )
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/ai/route
///
/// Returns an advisory plan; nothing is executed.
pub async fn handle_route(
    State(state): State<AppState>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Result<Json<Generated<RoutingPlan>>, AppError> {
    let Json(request) = payload?;
    let result = state
        .router
        .plan(&request.task, request.context.as_deref())
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/ai/config/refresh
///
/// Re-reads provider settings from the environment (credential rotation).
pub async fn handle_config_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, AppError> {
    let provider = state.config.refresh()?;
    Ok(Json(RefreshResponse {
        provider,
        credentials_present: state.config.provider_config().is_ok(),
    }))
}
