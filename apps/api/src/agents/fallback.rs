// Canned payloads served when live generation is unavailable or unusable.
// Each structured payload carries every key its task schema requires, so
// callers can render it exactly like a live result. Content is deliberately
// generic; `ResultSource::Fallback` tells callers as much.

use serde_json::{json, Value};

use crate::agents::TaskId;
use crate::llm_client::GenerationResult;

const FALLBACK_REPLY: &str = "Thanks for sharing that. Could you walk me through a specific \
    example, what you did yourself, and how you measured the outcome?";

pub fn fallback(task: TaskId) -> GenerationResult {
    let payload = match task {
        TaskId::InterviewReply => return GenerationResult::Text(FALLBACK_REPLY.to_string()),
        TaskId::ResumeAnalysis => resume_analysis(),
        TaskId::InterviewQuestions => interview_questions(),
        TaskId::InterviewEvaluation => interview_evaluation(),
        TaskId::MarketAnalysis => market_analysis(),
        TaskId::TaskRouting => task_routing(),
    };

    match payload {
        Value::Object(map) => GenerationResult::Structured(map),
        other => GenerationResult::Text(other.to_string()),
    }
}

fn resume_analysis() -> Value {
    json!({
        "name": "Unknown",
        "skills": ["Communication", "Problem Solving", "Teamwork"],
        "radarData": [
            {"subject": "Technical Depth", "value": 50},
            {"subject": "Breadth", "value": 50},
            {"subject": "Communication", "value": 50},
            {"subject": "Leadership", "value": 50},
            {"subject": "Problem Solving", "value": 50},
            {"subject": "Domain Knowledge", "value": 50}
        ],
        "summary": "Automatic analysis is temporarily unavailable. This is a neutral placeholder profile.",
        "experienceYears": 0,
        "education": [],
        "strengths": ["Review the resume manually for concrete strengths"],
        "improvements": ["Quantify achievements with measurable results"],
        "suggestedRoles": []
    })
}

fn interview_questions() -> Value {
    json!({
        "questions": [
            {
                "question": "Tell me about a project you are proud of and your role in it.",
                "category": "behavioral",
                "difficulty": "easy",
                "expectedPoints": ["clear ownership", "concrete outcome"]
            },
            {
                "question": "Describe a difficult technical problem you solved recently.",
                "category": "technical",
                "difficulty": "medium",
                "expectedPoints": ["problem framing", "trade-offs considered", "result"]
            },
            {
                "question": "How do you handle disagreement with a teammate about an approach?",
                "category": "behavioral",
                "difficulty": "medium",
                "expectedPoints": ["listening", "evidence over opinion", "commitment once decided"]
            },
            {
                "question": "Your service is slow in production. How do you investigate?",
                "category": "situational",
                "difficulty": "medium",
                "expectedPoints": ["measure first", "narrow the scope", "verify the fix"]
            },
            {
                "question": "What kind of team environment helps you do your best work?",
                "category": "culture",
                "difficulty": "easy",
                "expectedPoints": ["self-awareness", "fit with team practices"]
            }
        ]
    })
}

fn interview_evaluation() -> Value {
    json!({
        "overallScore": 50,
        "dimensions": [
            {"name": "Technical", "score": 50, "comment": "Not assessed automatically."},
            {"name": "Communication", "score": 50, "comment": "Not assessed automatically."},
            {"name": "Problem Solving", "score": 50, "comment": "Not assessed automatically."}
        ],
        "strengths": [],
        "improvements": ["Have an interviewer review the transcript"],
        "recommendation": "No automatic recommendation is available; review the transcript manually."
    })
}

fn market_analysis() -> Value {
    json!({
        "salaryRange": {"min": 60000, "max": 120000, "currency": "USD"},
        "marketDemand": "Live market data is temporarily unavailable. Demand for experienced technology professionals is generally steady; check current job boards and salary surveys for this role and location.",
        "competitionLevel": "medium",
        "trendingSkills": [],
        "insights": ["Compare at least three recent postings for the same role and location"]
    })
}

fn task_routing() -> Value {
    json!({
        "primaryAgent": "router",
        "supportingAgents": [],
        "workflow": [
            {"step": 1, "agent": "router", "action": "Clarify the request and pick an assistant manually"}
        ],
        "estimatedTokens": 1000,
        "reasoning": "Automatic planning is unavailable; defaulting to manual routing."
    })
}
