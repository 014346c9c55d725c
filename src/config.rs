use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openai_api_key: Option<String>,

    pub crawler_api_base: String,
    pub sensitive_content_api: String,
    pub sentiment_api: String,

    pub coordinator_model: String,
    pub data_collection_model: String,
    pub analysis_model: String,
    pub report_model: String,
    pub decision_model: String,

    pub max_turns: usize,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            crawler_api_base: env_or("CRAWLER_API_BASE", "http://localhost:8000/api/v1"),
            sensitive_content_api: env_or("SENSITIVE_CONTENT_API", "http://localhost:8001/api/v1"),
            sentiment_api: env_or("SENTIMENT_API", "http://localhost:8002/api/v1"),
            coordinator_model: env_or("COORDINATOR_MODEL", "gpt-4-turbo"),
            data_collection_model: env_or("DATA_COLLECTION_MODEL", "gpt-4o-mini"),
            analysis_model: env_or("ANALYSIS_MODEL", "gpt-4-turbo"),
            report_model: env_or("REPORT_MODEL", "gpt-4-turbo"),
            decision_model: env_or("DECISION_MODEL", "gpt-4-turbo"),
            max_turns: std::env::var("MAX_TURNS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            api_port: std::env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8100),
        }
    }

    pub fn model_for(&self, agent: crate::agents::AgentName) -> &str {
        use crate::agents::AgentName;
        match agent {
            AgentName::Coordinator => &self.coordinator_model,
            AgentName::DataCollection => &self.data_collection_model,
            AgentName::ContentAnalysis => &self.analysis_model,
            AgentName::ReportGeneration => &self.report_model,
            AgentName::DecisionSupport => &self.decision_model,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            crawler_api_base: "http://localhost:8000/api/v1".to_string(),
            sensitive_content_api: "http://localhost:8001/api/v1".to_string(),
            sentiment_api: "http://localhost:8002/api/v1".to_string(),
            coordinator_model: "gpt-4-turbo".to_string(),
            data_collection_model: "gpt-4o-mini".to_string(),
            analysis_model: "gpt-4-turbo".to_string(),
            report_model: "gpt-4-turbo".to_string(),
            decision_model: "gpt-4-turbo".to_string(),
            max_turns: 30,
            api_port: 8100,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
