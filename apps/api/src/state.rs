use std::sync::Arc;

use crate::agents::interview::InterviewAgent;
use crate::agents::market::MarketAgent;
use crate::agents::resume::ResumeAgent;
use crate::agents::router::RouterAgent;
use crate::agents::StructuredGenerator;
use crate::config::ConfigSource;
use crate::llm_client::LlmBackend;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Same source the agents read; handlers use it for refresh and health.
    pub config: Arc<dyn ConfigSource>,
    pub resume: ResumeAgent,
    pub interview: InterviewAgent,
    pub market: MarketAgent,
    pub router: RouterAgent,
}

impl AppState {
    /// Wires every agent onto one backend and one configuration source.
    pub fn new(backend: Arc<dyn LlmBackend>, config: Arc<dyn ConfigSource>) -> Self {
        let generator = StructuredGenerator::new(backend, Arc::clone(&config));
        Self {
            config,
            resume: ResumeAgent::new(generator.clone()),
            interview: InterviewAgent::new(generator.clone()),
            market: MarketAgent::new(generator.clone()),
            router: RouterAgent::new(generator),
        }
    }
}
