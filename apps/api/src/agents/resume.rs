//! Resume analysis agent: free-form resume text in, candidate profile out.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agents::prompts::{slot, RESUME_ANALYSIS_TEMPLATE, RESUME_PERSONA};
use crate::agents::schema::{lenient_f64, FieldKind, FieldSpec, TaskSchema};
use crate::agents::{Generated, StructuredGenerator, TaskId};
use crate::config::ConfigError;
use crate::llm_client::GenerationRequest;

/// Resumes longer than this are cut before prompting.
const MAX_RESUME_CHARS: usize = 16_000;
const MAX_TOKENS: u32 = 2048;

pub static SCHEMA: TaskSchema = TaskSchema::new(&[
    FieldSpec::required("name", FieldKind::String),
    FieldSpec::required("skills", FieldKind::StringList),
    FieldSpec::required("radarData", FieldKind::ObjectList),
    FieldSpec::optional("summary", FieldKind::String),
    FieldSpec::optional("experienceYears", FieldKind::Number),
    FieldSpec::optional("education", FieldKind::StringList),
    FieldSpec::optional("strengths", FieldKind::StringList),
    FieldSpec::optional("improvements", FieldKind::StringList),
    FieldSpec::optional("suggestedRoles", FieldKind::StringList),
]);

/// One axis of the candidate radar chart, 0–100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarPoint {
    pub subject: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeAnalysis {
    pub name: String,
    pub skills: Vec<String>,
    pub radar_data: Vec<RadarPoint>,
    pub summary: String,
    pub experience_years: f64,
    pub education: Vec<String>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub suggested_roles: Vec<String>,
}

impl ResumeAnalysis {
    /// Clamps radar values, drops unnamed axes and duplicate skills, and
    /// replaces a blank name.
    fn normalized(mut self) -> Self {
        if self.name.trim().is_empty() {
            self.name = "Unknown".to_string();
        }

        let mut seen = std::collections::HashSet::new();
        self.skills.retain(|skill| {
            let key = skill.trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        });

        self.radar_data.retain(|point| !point.subject.trim().is_empty());
        for point in &mut self.radar_data {
            point.value = point.value.clamp(0.0, 100.0);
        }

        self.experience_years = self.experience_years.max(0.0);
        self
    }
}

#[derive(Clone)]
pub struct ResumeAgent {
    generator: StructuredGenerator,
}

impl ResumeAgent {
    pub fn new(generator: StructuredGenerator) -> Self {
        Self { generator }
    }

    pub async fn analyze(
        &self,
        resume_text: &str,
    ) -> Result<Generated<ResumeAnalysis>, ConfigError> {
        let resume_text = clip(resume_text, MAX_RESUME_CHARS);
        let prompt = RESUME_ANALYSIS_TEMPLATE.replace("{resume_text}", slot(resume_text));
        let request = GenerationRequest::new(prompt)
            .with_system(RESUME_PERSONA)
            .with_max_tokens(MAX_TOKENS);

        let generated = self
            .generator
            .generate::<ResumeAnalysis>(TaskId::ResumeAnalysis, request)
            .await?;

        info!(
            source = ?generated.source,
            skills = generated.data.skills.len(),
            "Resume analysis complete"
        );
        Ok(generated.map(ResumeAnalysis::normalized))
    }
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => {
            info!(
                max_chars,
                "Resume text exceeds prompt budget, truncating"
            );
            &text[..end]
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{generator, ScriptedBackend};
    use crate::agents::ResultSource;
    use crate::llm_client::LlmError;

    const RESUME: &str = r#"
        Jane Doe — Senior Backend Engineer
        7 years building payment systems in Rust and Go. Led a team of 4.
        B.Sc. Computer Science, TU Delft.
    "#;

    fn agent(backend: std::sync::Arc<ScriptedBackend>) -> ResumeAgent {
        ResumeAgent::new(generator(backend))
    }

    #[tokio::test]
    async fn test_analyze_live_reply() {
        let backend = ScriptedBackend::ok(
            r#"{
                "name": "Jane Doe",
                "skills": ["Rust", "Go", "rust"],
                "radarData": [
                    {"subject": "Technical Depth", "value": 92},
                    {"subject": "Leadership", "value": "140"}
                ],
                "experienceYears": "7",
                "education": ["B.Sc. Computer Science, TU Delft"]
            }"#,
        );
        let result = agent(backend.clone()).analyze(RESUME).await.unwrap();

        assert_eq!(result.source, ResultSource::Live);
        assert_eq!(result.data.name, "Jane Doe");
        assert_eq!(result.data.skills, vec!["Rust", "Go"]);
        assert_eq!(result.data.radar_data[1].value, 100.0);
        assert_eq!(result.data.experience_years, 7.0);
        // Optional fields the model skipped are defaulted, not failed.
        assert!(result.data.suggested_roles.is_empty());

        let request = backend.last_request();
        assert!(request.user_text.contains("Jane Doe — Senior Backend Engineer"));
        assert_eq!(request.system_instruction.as_deref(), Some(RESUME_PERSONA));
        assert!(request.wants_structured_output);
    }

    #[tokio::test]
    async fn test_analyze_truncated_reply_is_repaired() {
        let backend = ScriptedBackend::ok(
            "```json\n{\"name\": \"Jane Doe\", \"skills\": [\"Rust\"], \"radarData\": [{\"subject\": \"Breadth\", \"value\": 70}],\n\"summary\": \"Backend engineer\",",
        );
        let result = agent(backend).analyze(RESUME).await.unwrap();

        assert_eq!(result.source, ResultSource::Repaired);
        assert_eq!(result.data.summary, "Backend engineer");
        assert_eq!(result.data.radar_data.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_timeout() {
        let backend = ScriptedBackend::failing(LlmError::Timeout { secs: 75 });
        let result = agent(backend).analyze(RESUME).await.unwrap();

        assert!(result.is_fallback());
        assert!(!result.data.skills.is_empty());
        assert_eq!(result.data.radar_data.len(), 6);
    }

    #[tokio::test]
    async fn test_null_members_in_radar_items_keep_live_result() {
        let backend = ScriptedBackend::ok(
            r#"{"name": "Jane Doe", "skills": ["Rust"], "radarData": [{"subject": null, "value": 10}, {"subject": "Breadth", "value": null}], "summary": null}"#,
        );
        let result = agent(backend).analyze(RESUME).await.unwrap();

        assert_eq!(result.source, ResultSource::Live);
        assert_eq!(result.data.name, "Jane Doe");
        // The unnamed axis is dropped; the null value becomes 0.
        assert_eq!(
            result.data.radar_data,
            vec![RadarPoint {
                subject: "Breadth".to_string(),
                value: 0.0
            }]
        );
        assert!(result.data.summary.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_tolerates_empty_resume() {
        let backend = ScriptedBackend::ok(r#"{"name": "", "skills": [], "radarData": []}"#);
        let result = agent(backend.clone()).analyze("").await.unwrap();

        assert_eq!(result.data.name, "Unknown");
        assert!(backend.last_request().user_text.contains("(not provided)"));
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        assert_eq!(clip("héllo", 2), "hé");
        assert_eq!(clip("short", 100), "short");
    }
}
