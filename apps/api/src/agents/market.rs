//! Market agent: salary range and demand outlook for a role profile.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agents::prompts::{list_slot, slot, MARKET_ANALYSIS_TEMPLATE, MARKET_PERSONA};
use crate::agents::schema::{lenient_f64, FieldKind, FieldSpec, TaskSchema};
use crate::agents::{Generated, StructuredGenerator, TaskId};
use crate::config::ConfigError;
use crate::llm_client::GenerationRequest;

const DEFAULT_CURRENCY: &str = "USD";

pub static SCHEMA: TaskSchema = TaskSchema::new(&[
    FieldSpec::required("salaryRange", FieldKind::Object),
    FieldSpec::required("marketDemand", FieldKind::String),
    FieldSpec::optional_or("competitionLevel", FieldKind::String, || json!("medium")),
    FieldSpec::optional("trendingSkills", FieldKind::StringList),
    FieldSpec::optional("insights", FieldKind::StringList),
]);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryRange {
    #[serde(deserialize_with = "lenient_f64")]
    pub min: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub max: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketAnalysis {
    pub salary_range: SalaryRange,
    pub market_demand: String,
    pub competition_level: String,
    pub trending_skills: Vec<String>,
    pub insights: Vec<String>,
}

impl MarketAnalysis {
    fn normalized(mut self) -> Self {
        let range = &mut self.salary_range;
        range.min = range.min.max(0.0);
        range.max = range.max.max(0.0);
        if range.min > range.max {
            std::mem::swap(&mut range.min, &mut range.max);
        }
        if range.currency.trim().is_empty() {
            range.currency = DEFAULT_CURRENCY.to_string();
        }
        self
    }
}

#[derive(Clone)]
pub struct MarketAgent {
    generator: StructuredGenerator,
}

impl MarketAgent {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }

    pub async fn analyze(
        &self,
        role: &str,
        location: Option<&str>,
        skills: &[String],
        experience_years: f64,
    ) -> Result<Generated<MarketAnalysis>, ConfigError> {
        let prompt = MARKET_ANALYSIS_TEMPLATE
            .replace("{role}", slot(role))
            .replace("{location}", slot(location.unwrap_or_default()))
            .replace("{skills}", &list_slot(skills))
            .replace("{experience_years}", &experience_years.max(0.0).to_string());
        let request = GenerationRequest::new(prompt).with_system(MARKET_PERSONA);

        let generated = self
            .generator
            .generate::<MarketAnalysis>(TaskId::MarketAnalysis, request)
            .await?;
        Ok(generated.map(MarketAnalysis::normalized))
    }
}
