//! Router agent: plans which agents should handle a free-form request.
//!
//! The plan is advisory. Nothing here executes it; callers decide whether to
//! follow the suggested workflow.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agents::prompts::{slot, ROUTER_PERSONA, ROUTING_TEMPLATE};
use crate::agents::schema::{lenient_f64, FieldKind, FieldSpec, TaskSchema};
use crate::agents::{Generated, StructuredGenerator, TaskId};
use crate::config::ConfigError;
use crate::llm_client::GenerationRequest;

pub static SCHEMA: TaskSchema = TaskSchema::new(&[
    FieldSpec::required("primaryAgent", FieldKind::String),
    FieldSpec::required("workflow", FieldKind::ObjectList),
    FieldSpec::optional("supportingAgents", FieldKind::StringList),
    FieldSpec::optional("estimatedTokens", FieldKind::Number),
    FieldSpec::optional("reasoning", FieldKind::String),
]);

/// Rough characters-per-token ratio used for the local estimate.
const CHARS_PER_TOKEN: usize = 4;

/// The agents a plan may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Resume,
    Interview,
    Market,
    Router,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Resume,
        AgentKind::Interview,
        AgentKind::Market,
        AgentKind::Router,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Resume => "resume",
            AgentKind::Interview => "interview",
            AgentKind::Market => "market",
            AgentKind::Router => "router",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            AgentKind::Resume => "analyzes resumes into a structured candidate profile",
            AgentKind::Interview => "prepares questions, runs and evaluates mock interviews",
            AgentKind::Market => "estimates salary ranges and hiring demand",
            AgentKind::Router => "plans multi-step work across the other assistants",
        }
    }

    /// Maps a model-chosen name onto a known agent. Accepts loose spellings
    /// such as "Resume Agent" or "market_agent".
    pub fn from_name(name: &str) -> Option<Self> {
        let letters: String = name
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_ascii_lowercase();
        let key = letters.strip_suffix("agent").unwrap_or(&letters);

        Self::ALL.into_iter().find(|kind| kind.as_str() == key)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Model output (as named by the model) and normalized plan
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStep {
    agent: String,
    action: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPlan {
    primary_agent: String,
    supporting_agents: Vec<String>,
    workflow: Vec<RawStep>,
    #[serde(deserialize_with = "lenient_f64")]
    estimated_tokens: f64,
    reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowStep {
    pub step: u32,
    pub agent: AgentKind,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingPlan {
    pub primary_agent: AgentKind,
    pub supporting_agents: Vec<AgentKind>,
    pub workflow: Vec<WorkflowStep>,
    pub estimated_tokens: u64,
    pub reasoning: String,
}

impl RawPlan {
    fn into_plan(self, request_chars: usize) -> RoutingPlan {
        let primary_agent = AgentKind::from_name(&self.primary_agent).unwrap_or_else(|| {
            debug!(name = %self.primary_agent, "Unknown primary agent, routing to router");
            AgentKind::Router
        });

        let mut supporting_agents = Vec::new();
        for name in &self.supporting_agents {
            match AgentKind::from_name(name) {
                Some(kind) if kind != primary_agent && !supporting_agents.contains(&kind) => {
                    supporting_agents.push(kind)
                }
                Some(_) => {}
                None => debug!(%name, "Dropping unknown supporting agent"),
            }
        }

        let workflow: Vec<WorkflowStep> = self
            .workflow
            .into_iter()
            .filter(|step| !step.action.trim().is_empty())
            .zip(1u32..)
            .map(|(raw, step)| WorkflowStep {
                step,
                agent: AgentKind::from_name(&raw.agent).unwrap_or(primary_agent),
                action: raw.action.trim().to_string(),
            })
            .collect();

        let estimated_tokens = if self.estimated_tokens >= 1.0 {
            self.estimated_tokens.round() as u64
        } else {
            estimate_tokens(request_chars, workflow.len())
        };

        RoutingPlan {
            primary_agent,
            supporting_agents,
            workflow,
            estimated_tokens,
            reasoning: self.reasoning,
        }
    }
}

/// Local estimate: request size in tokens, once per workflow step.
pub fn estimate_tokens(request_chars: usize, steps: usize) -> u64 {
    let per_step = request_chars.div_ceil(CHARS_PER_TOKEN).max(1);
    (per_step * steps.max(1)) as u64
}

fn agent_roster() -> String {
    AgentKind::ALL
        .iter()
        .map(|kind| format!("- {kind}: {}", kind.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Agent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RouterAgent {
    generator: StructuredGenerator,
}

impl RouterAgent {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }

    pub async fn plan(
        &self,
        task_description: &str,
        context: Option<&str>,
    ) -> Result<Generated<RoutingPlan>, ConfigError> {
        let task = slot(task_description);
        let context = slot(context.unwrap_or_default());
        let request_chars = task.chars().count() + context.chars().count();

        let prompt = ROUTING_TEMPLATE
            .replace("{task}", task)
            .replace("{context}", context)
            .replace("{agents}", &agent_roster());
        let request = GenerationRequest::new(prompt).with_system(ROUTER_PERSONA);

        let generated = self
            .generator
            .generate::<RawPlan>(TaskId::TaskRouting, request)
            .await?;
        Ok(generated.map(|raw| raw.into_plan(request_chars)))
    }
}
