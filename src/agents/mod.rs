pub mod content_analysis;
pub mod coordinator;
pub mod data_collection;
pub mod decision_support;
pub mod report_generation;

use serde::{Deserialize, Serialize};

use crate::contracts::OutputContract;
use crate::tools::ToolName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    Coordinator,
    DataCollection,
    ContentAnalysis,
    ReportGeneration,
    DecisionSupport,
}

impl AgentName {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Coordinator => "coordinator",
            AgentName::DataCollection => "data_collection",
            AgentName::ContentAnalysis => "content_analysis",
            AgentName::ReportGeneration => "report_generation",
            AgentName::DecisionSupport => "decision_support",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "coordinator" => Some(AgentName::Coordinator),
            "data_collection" => Some(AgentName::DataCollection),
            "content_analysis" => Some(AgentName::ContentAnalysis),
            "report_generation" => Some(AgentName::ReportGeneration),
            "decision_support" => Some(AgentName::DecisionSupport),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, configured unit of delegated reasoning. The tool and handoff
/// sets are fixed at construction and never change for the lifetime of the
/// pipeline instance.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub name: AgentName,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolName>,
    pub handoffs: Vec<AgentName>,
    pub output_contract: Option<OutputContract>,
}

impl AgentDefinition {
    pub fn can_hand_off_to(&self, target: AgentName) -> bool {
        self.handoffs.contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.handoffs.is_empty()
    }
}
