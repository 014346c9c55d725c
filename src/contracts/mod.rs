use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured output of a completed crawl, as reported by the
/// Data Collection agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerResult {
    pub task_id: String,
    pub platform: String,
    pub crawler_type: String,
    pub status: String,
    pub total_posts: u64,
    pub total_accounts: u64,
    pub execution_time: f64,
    #[serde(default)]
    pub data_summary: HashMap<String, Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveContentResult {
    pub video_id: String,
    pub has_violation: bool,
    #[serde(default)]
    pub violation_types: Vec<String>,
    #[serde(default)]
    pub confidence_scores: HashMap<String, f64>,
    #[serde(default)]
    pub violation_segments: Vec<Value>,
    /// One of "block", "review", "approve".
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub post_id: String,
    /// One of "positive", "negative", "neutral".
    pub overall_sentiment: String,
    /// Range: -1.0 (negative) to 1.0 (positive).
    pub sentiment_score: f64,
    #[serde(default)]
    pub emotions: HashMap<String, f64>,
    #[serde(default)]
    pub attitude: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicResult {
    pub topic_id: i64,
    pub topic_name: String,
    #[serde(default)]
    pub keywords: Vec<Value>,
    pub document_count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendResult {
    pub trend_id: String,
    pub trend_name: String,
    /// One of "rising", "declining", "stable", "viral".
    pub trend_type: String,
    pub growth_rate: f64,
    pub post_count: u64,
    pub total_engagement: u64,
    #[serde(default)]
    pub related_keywords: Vec<String>,
    #[serde(default)]
    pub top_posts: Vec<String>,
    #[serde(default)]
    pub forecast: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementResult {
    pub engagement_rate: f64,
    pub interaction_rate: f64,
    /// One of "very_high", "high", "medium", "low".
    pub engagement_level: String,
    pub total_interactions: u64,
    #[serde(default)]
    pub metrics: HashMap<String, u64>,
    #[serde(default)]
    pub benchmarks: HashMap<String, Value>,
}

/// Aggregated findings across all analysis dimensions. Summaries are
/// free-shaped maps so partial coverage ("8 of 10 videos analyzed") can be
/// reported without failing the whole analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_analyzed: u64,
    #[serde(default)]
    pub sensitive_content_summary: HashMap<String, Value>,
    #[serde(default)]
    pub sentiment_summary: HashMap<String, Value>,
    #[serde(default)]
    pub topic_summary: Vec<Value>,
    #[serde(default)]
    pub trend_summary: Vec<Value>,
    #[serde(default)]
    pub engagement_summary: HashMap<String, Value>,
    #[serde(default)]
    pub high_risk_posts: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub report_id: String,
    pub task_id: String,
    pub generated_at: String,
    pub executive_summary: String,
    #[serde(default)]
    pub data_overview: HashMap<String, Value>,
    #[serde(default)]
    pub sensitive_content_summary: HashMap<String, Value>,
    #[serde(default)]
    pub sentiment_summary: HashMap<String, Value>,
    #[serde(default)]
    pub topic_summary: Vec<Value>,
    #[serde(default)]
    pub trend_summary: Vec<Value>,
    #[serde(default)]
    pub risk_assessment: HashMap<String, Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl AnalysisReport {
    pub fn new(task_id: impl Into<String>, executive_summary: impl Into<String>) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            executive_summary: executive_summary.into(),
            data_overview: HashMap::new(),
            sensitive_content_summary: HashMap::new(),
            sentiment_summary: HashMap::new(),
            topic_summary: Vec::new(),
            trend_summary: Vec::new(),
            risk_assessment: HashMap::new(),
            recommendations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionSupport {
    pub task_id: String,
    /// One of "low", "medium", "high", "critical".
    pub overall_risk_level: String,
    #[serde(default)]
    pub priority_issues: Vec<Value>,
    #[serde(default)]
    pub recommended_actions: Vec<Value>,
    #[serde(default)]
    pub risk_mitigation_strategies: Vec<String>,
    #[serde(default)]
    pub resource_allocation_suggestions: HashMap<String, Value>,
    #[serde(default)]
    pub timeline: HashMap<String, Value>,
    #[serde(default)]
    pub success_metrics: Vec<String>,
}

/// The contract an agent's final answer must satisfy. Validation is strict
/// deserialization: a missing required field or wrong type is a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputContract {
    CrawlerResult,
    AnalysisResult,
    AnalysisReport,
    DecisionSupport,
}

#[derive(Debug, Clone)]
pub struct ContractViolation {
    pub contract: OutputContract,
    pub reason: String,
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "output does not satisfy {} contract: {}",
            self.contract.as_str(),
            self.reason
        )
    }
}

impl OutputContract {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputContract::CrawlerResult => "crawler_result",
            OutputContract::AnalysisResult => "analysis_result",
            OutputContract::AnalysisReport => "analysis_report",
            OutputContract::DecisionSupport => "decision_support",
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), ContractViolation> {
        let outcome = match self {
            OutputContract::CrawlerResult => {
                serde_json::from_value::<CrawlerResult>(value.clone()).map(|_| ())
            }
            OutputContract::AnalysisResult => {
                serde_json::from_value::<AnalysisResult>(value.clone()).map(|_| ())
            }
            OutputContract::AnalysisReport => {
                serde_json::from_value::<AnalysisReport>(value.clone()).map(|_| ())
            }
            OutputContract::DecisionSupport => {
                serde_json::from_value::<DecisionSupport>(value.clone()).map(|_| ())
            }
        };

        outcome.map_err(|e| ContractViolation {
            contract: *self,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_crawler_result_round_trip() {
        let value = json!({
            "task_id": "crawl_20250806_001",
            "platform": "douyin",
            "crawler_type": "search",
            "status": "completed",
            "total_posts": 487,
            "total_accounts": 45,
            "execution_time": 325.6,
        });

        assert!(OutputContract::CrawlerResult.validate(&value).is_ok());

        let result: CrawlerResult = serde_json::from_value(value).unwrap();
        assert_eq!(result.total_posts, 487);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_missing_required_field_is_violation() {
        let value = json!({
            "task_id": "crawl_20250806_001",
            "platform": "douyin",
            // crawler_type missing
            "status": "completed",
            "total_posts": 487,
            "total_accounts": 45,
            "execution_time": 325.6,
        });

        let err = OutputContract::CrawlerResult.validate(&value).unwrap_err();
        assert_eq!(err.contract, OutputContract::CrawlerResult);
        assert!(err.reason.contains("crawler_type"));
    }

    #[test]
    fn test_decision_support_defaults() {
        let value = json!({
            "task_id": "crawl_20250806_001",
            "overall_risk_level": "medium",
        });

        let decision: DecisionSupport = serde_json::from_value(value).unwrap();
        assert!(decision.priority_issues.is_empty());
        assert!(decision.timeline.is_empty());
    }

    #[test]
    fn test_wrong_type_is_violation() {
        let value = json!({
            "total_analyzed": "not-a-number",
        });

        let err = OutputContract::AnalysisResult.validate(&value).unwrap_err();
        assert!(err.to_string().contains("analysis_result"));
    }

    #[test]
    fn test_analysis_report_constructor_stamps_identity() {
        let report = AnalysisReport::new("crawl_001", "summary");
        assert_eq!(report.task_id, "crawl_001");
        assert!(!report.report_id.is_empty());
        assert!(!report.generated_at.is_empty());
    }
}
