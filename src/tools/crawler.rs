use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::poll::StatusSource;
use super::{Tool, ToolName, ToolReply};

/// Thin client for the crawl service. Built once and shared by every
/// crawler adapter.
pub struct CrawlerApi {
    base_url: String,
    client: reqwest::Client,
}

impl CrawlerApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Murmuration/0.3")
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn post_json(&self, path: &str, body: Value) -> std::result::Result<Value, String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        decode(response).await
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> std::result::Result<Value, String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        decode(response).await
    }

    pub async fn task_status(&self, task_id: &str) -> ToolReply {
        match self.get_json(&format!("tasks/{}", task_id), &[]).await {
            Ok(payload) => ToolReply::success(payload),
            Err(e) => ToolReply::failure_with(
                format!("Failed to get task status: {}", e),
                [("task_id", Value::String(task_id.to_string()))],
            ),
        }
    }
}

async fn decode(response: reqwest::Response) -> std::result::Result<Value, String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("HTTP {}: {}", status, body));
    }

    response.json::<Value>().await.map_err(|e| e.to_string())
}

#[async_trait]
impl StatusSource for CrawlerApi {
    async fn fetch(&self, task_id: &str) -> ToolReply {
        self.task_status(task_id).await
    }
}

/// Submits a crawl task. Not idempotent: calling twice creates two tasks.
pub struct CreateCrawlerTaskTool {
    api: Arc<CrawlerApi>,
}

impl CreateCrawlerTaskTool {
    pub fn new(api: Arc<CrawlerApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for CreateCrawlerTaskTool {
    fn name(&self) -> ToolName {
        ToolName::CreateCrawlerTask
    }

    fn description(&self) -> &str {
        "Create a crawler task to collect social media content from a platform (douyin, xhs, bilibili, weibo, kuaishou). Returns a task_id to track progress."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "platform": {
                    "type": "string",
                    "description": "Platform name: douyin, xhs, bilibili, weibo, kuaishou"
                },
                "crawler_type": {
                    "type": "string",
                    "description": "Crawl mode: search, creator, detail, homefeed"
                },
                "config_json": {
                    "type": "string",
                    "description": "Crawler configuration as a JSON string, e.g. '{\"keywords\": [\"AI\"], \"max_count\": 100}'"
                }
            },
            "required": ["platform", "crawler_type", "config_json"]
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let platform = match params["platform"].as_str() {
            Some(p) => p.to_string(),
            None => return ToolReply::failure("Missing platform parameter"),
        };
        let crawler_type = match params["crawler_type"].as_str() {
            Some(t) => t.to_string(),
            None => {
                return ToolReply::failure_with(
                    "Missing crawler_type parameter",
                    [("platform", Value::String(platform))],
                )
            }
        };
        let correlation = [
            ("platform", Value::String(platform.clone())),
            ("crawler_type", Value::String(crawler_type.clone())),
        ];

        let config: Value = match params["config_json"].as_str() {
            Some(raw) => match serde_json::from_str(raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    return ToolReply::failure_with(
                        format!("Invalid config_json: {}", e),
                        correlation,
                    )
                }
            },
            None => return ToolReply::failure_with("Missing config_json parameter", correlation),
        };

        let body = json!({
            "platform": platform.as_str(),
            "crawler_type": crawler_type.as_str(),
            "config": config,
        });

        match self.api.post_json("tasks/crawl", body).await {
            Ok(payload) => ToolReply::success(payload),
            Err(e) => {
                log::warn!("crawl submission failed for {}: {}", platform, e);
                ToolReply::failure_with(format!("Failed to create crawler task: {}", e), correlation)
            }
        }
    }
}

pub struct GetTaskStatusTool {
    api: Arc<CrawlerApi>,
}

impl GetTaskStatusTool {
    pub fn new(api: Arc<CrawlerApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for GetTaskStatusTool {
    fn name(&self) -> ToolName {
        ToolName::GetTaskStatus
    }

    fn description(&self) -> &str {
        "Get the status and progress of a crawler task by task_id."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Task identifier returned by create_crawler_task"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let task_id = match params["task_id"].as_str() {
            Some(id) => id,
            None => return ToolReply::failure("Missing task_id parameter"),
        };

        self.api.task_status(task_id).await
    }
}

pub struct GetCrawlerStatisticsTool {
    api: Arc<CrawlerApi>,
}

impl GetCrawlerStatisticsTool {
    pub fn new(api: Arc<CrawlerApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for GetCrawlerStatisticsTool {
    fn name(&self) -> ToolName {
        ToolName::GetCrawlerStatistics
    }

    fn description(&self) -> &str {
        "Get detailed statistics for a crawler task: post counts, accounts, duration, error counts."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Task identifier"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let task_id = match params["task_id"].as_str() {
            Some(id) => id,
            None => return ToolReply::failure("Missing task_id parameter"),
        };

        match self
            .api
            .get_json(&format!("tasks/{}/stats", task_id), &[])
            .await
        {
            Ok(payload) => ToolReply::success(payload),
            Err(e) => ToolReply::failure_with(
                format!("Failed to get statistics: {}", e),
                [("task_id", Value::String(task_id.to_string()))],
            ),
        }
    }
}

pub const MAX_QUERY_LIMIT: u64 = 1000;

pub struct QueryCrawledPostsTool {
    api: Arc<CrawlerApi>,
}

impl QueryCrawledPostsTool {
    pub fn new(api: Arc<CrawlerApi>) -> Self {
        Self { api }
    }
}

pub fn clamp_query_limit(limit: u64) -> u64 {
    limit.clamp(1, MAX_QUERY_LIMIT)
}

#[async_trait]
impl Tool for QueryCrawledPostsTool {
    fn name(&self) -> ToolName {
        ToolName::QueryCrawledPosts
    }

    fn description(&self) -> &str {
        "Query previously crawled posts with optional platform/keyword/time filters. Returns up to 1000 posts."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "platform": {
                    "type": "string",
                    "description": "Filter by platform (optional)"
                },
                "keyword": {
                    "type": "string",
                    "description": "Search keyword in title/description (optional)"
                },
                "start_time": {
                    "type": "string",
                    "description": "Start time filter, ISO format (optional)"
                },
                "end_time": {
                    "type": "string",
                    "description": "End time filter, ISO format (optional)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum results (default 100, max 1000)"
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let limit = clamp_query_limit(params["limit"].as_u64().unwrap_or(100));

        let mut query = vec![("limit".to_string(), limit.to_string())];
        for key in ["platform", "keyword", "start_time", "end_time"] {
            if let Some(value) = params[key].as_str() {
                query.push((key.to_string(), value.to_string()));
            }
        }

        match self.api.get_json("posts", &query).await {
            Ok(payload) => ToolReply::success(payload),
            Err(e) => ToolReply::failure(format!("Failed to query posts: {}", e)),
        }
    }
}
