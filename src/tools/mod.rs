pub mod analysis;
pub mod crawler;
pub mod poll;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CreateCrawlerTask,
    GetTaskStatus,
    WaitForTaskCompletion,
    GetCrawlerStatistics,
    QueryCrawledPosts,
    AnalyzeSensitiveContent,
    AnalyzeSentiment,
    ExtractTopics,
    DetectTrends,
    AnalyzeEngagement,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateCrawlerTask => "create_crawler_task",
            ToolName::GetTaskStatus => "get_task_status",
            ToolName::WaitForTaskCompletion => "wait_for_task_completion",
            ToolName::GetCrawlerStatistics => "get_crawler_statistics",
            ToolName::QueryCrawledPosts => "query_crawled_posts",
            ToolName::AnalyzeSensitiveContent => "analyze_sensitive_content",
            ToolName::AnalyzeSentiment => "analyze_sentiment",
            ToolName::ExtractTopics => "extract_topics",
            ToolName::DetectTrends => "detect_trends",
            ToolName::AnalyzeEngagement => "analyze_engagement",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create_crawler_task" => Some(ToolName::CreateCrawlerTask),
            "get_task_status" => Some(ToolName::GetTaskStatus),
            "wait_for_task_completion" => Some(ToolName::WaitForTaskCompletion),
            "get_crawler_statistics" => Some(ToolName::GetCrawlerStatistics),
            "query_crawled_posts" => Some(ToolName::QueryCrawledPosts),
            "analyze_sensitive_content" => Some(ToolName::AnalyzeSensitiveContent),
            "analyze_sentiment" => Some(ToolName::AnalyzeSentiment),
            "extract_topics" => Some(ToolName::ExtractTopics),
            "detect_trends" => Some(ToolName::DetectTrends),
            "analyze_engagement" => Some(ToolName::AnalyzeEngagement),
            _ => None,
        }
    }
}

/// Normalized adapter outcome. Failures carry the identifying fields of the
/// request (task_id, post_id, video_id, ...) so the calling agent can
/// correlate them; adapters never propagate transport errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReply {
    Success(Value),
    Failure {
        error: String,
        correlation: Map<String, Value>,
    },
}

impl ToolReply {
    pub fn success(value: Value) -> Self {
        ToolReply::Success(value)
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ToolReply::Failure {
            error: error.into(),
            correlation: Map::new(),
        }
    }

    pub fn failure_with(
        error: impl Into<String>,
        fields: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Self {
        let mut correlation = Map::new();
        for (key, value) in fields {
            correlation.insert(key.to_string(), value);
        }
        ToolReply::Failure {
            error: error.into(),
            correlation,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ToolReply::Failure { .. })
    }

    /// Flattens into the single mapping shape the agent loop consumes:
    /// the decoded payload on success, `{"error": ..., <correlation>}`
    /// on failure.
    pub fn into_value(self) -> Value {
        match self {
            ToolReply::Success(value) => value,
            ToolReply::Failure { error, correlation } => {
                let mut map = correlation;
                map.insert("error".to_string(), Value::String(error));
                Value::Object(map)
            }
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, params: Value) -> ToolReply;
}

/// Registry of all adapters, built once at startup. Dispatch is restricted
/// to the calling agent's bound tool set.
pub struct ToolRegistry {
    tools: HashMap<ToolName, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn from_config(config: &Config) -> Result<Self> {
        let crawler = Arc::new(crawler::CrawlerApi::new(&config.crawler_api_base)?);

        let mut tools: HashMap<ToolName, Box<dyn Tool>> = HashMap::new();

        tools.insert(
            ToolName::CreateCrawlerTask,
            Box::new(crawler::CreateCrawlerTaskTool::new(crawler.clone())),
        );
        tools.insert(
            ToolName::GetTaskStatus,
            Box::new(crawler::GetTaskStatusTool::new(crawler.clone())),
        );
        tools.insert(
            ToolName::WaitForTaskCompletion,
            Box::new(poll::WaitForTaskCompletionTool::new(crawler.clone())),
        );
        tools.insert(
            ToolName::GetCrawlerStatistics,
            Box::new(crawler::GetCrawlerStatisticsTool::new(crawler.clone())),
        );
        tools.insert(
            ToolName::QueryCrawledPosts,
            Box::new(crawler::QueryCrawledPostsTool::new(crawler)),
        );

        tools.insert(
            ToolName::AnalyzeSensitiveContent,
            Box::new(analysis::AnalyzeSensitiveContentTool::new(
                &config.sensitive_content_api,
            )?),
        );
        tools.insert(
            ToolName::AnalyzeSentiment,
            Box::new(analysis::AnalyzeSentimentTool::new(&config.sentiment_api)?),
        );
        tools.insert(
            ToolName::ExtractTopics,
            Box::new(analysis::ExtractTopicsTool::new(&config.sentiment_api)?),
        );
        tools.insert(
            ToolName::DetectTrends,
            Box::new(analysis::DetectTrendsTool::new(&config.sentiment_api)?),
        );
        tools.insert(
            ToolName::AnalyzeEngagement,
            Box::new(analysis::AnalyzeEngagementTool::new()),
        );

        Ok(Self { tools })
    }

    pub fn get_schemas(&self, allowed: &[ToolName]) -> Vec<Value> {
        allowed
            .iter()
            .filter_map(|t| self.tools.get(t))
            .map(|tool| {
                json!({
                    "name": tool.name().as_str(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema(),
                })
            })
            .collect()
    }

    /// Executes one adapter. An unknown tool or one outside the allowed set
    /// yields a failure reply, not a fault, so the calling loop stays total.
    pub async fn execute(&self, name: ToolName, params: Value, allowed: &[ToolName]) -> ToolReply {
        if !allowed.contains(&name) {
            return ToolReply::failure_with(
                format!("tool {} is not available to this agent", name.as_str()),
                [("tool", Value::String(name.as_str().to_string()))],
            );
        }

        match self.tools.get(&name) {
            Some(tool) => tool.execute(params).await,
            None => ToolReply::failure_with(
                format!("unknown tool: {}", name.as_str()),
                [("tool", Value::String(name.as_str().to_string()))],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_round_trip() {
        for name in [
            ToolName::CreateCrawlerTask,
            ToolName::WaitForTaskCompletion,
            ToolName::AnalyzeEngagement,
        ] {
            assert_eq!(ToolName::from_str(name.as_str()), Some(name));
        }
        assert_eq!(ToolName::from_str("no_such_tool"), None);
    }

    #[test]
    fn test_failure_reply_carries_correlation_fields() {
        let reply = ToolReply::failure_with(
            "connection refused",
            [
                ("task_id", Value::String("crawl_001".to_string())),
                ("platform", Value::String("douyin".to_string())),
            ],
        );

        let value = reply.into_value();
        assert_eq!(value["error"], "connection refused");
        assert_eq!(value["task_id"], "crawl_001");
        assert_eq!(value["platform"], "douyin");
    }

    #[tokio::test]
    async fn test_registry_rejects_unbound_tool() {
        let registry = ToolRegistry::from_config(&Config::default()).unwrap();

        let reply = registry
            .execute(
                ToolName::AnalyzeSentiment,
                json!({}),
                &[ToolName::CreateCrawlerTask],
            )
            .await;

        assert!(reply.is_failure());
        let value = reply.into_value();
        assert!(value["error"]
            .as_str()
            .unwrap()
            .contains("not available to this agent"));
    }

    #[test]
    fn test_registry_schemas_filtered_by_binding() {
        let registry = ToolRegistry::from_config(&Config::default()).unwrap();

        let schemas = registry.get_schemas(&[ToolName::ExtractTopics, ToolName::DetectTrends]);
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0]["name"], "extract_topics");
    }
}
