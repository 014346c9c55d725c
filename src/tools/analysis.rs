use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolName, ToolReply};

pub const MIN_TOPICS: u64 = 3;
pub const MAX_TOPICS: u64 = 20;

const TIME_WINDOWS: [&str; 3] = ["1d", "7d", "30d"];

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent("Murmuration/0.3")
        .build()?)
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: Value,
) -> std::result::Result<Value, String> {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("HTTP {}: {}", status, body));
    }

    response.json::<Value>().await.map_err(|e| e.to_string())
}

/// Detects NSFW/violence/illegal material in video content. Video analysis
/// is slow, so this client gets a generous timeout.
pub struct AnalyzeSensitiveContentTool {
    client: reqwest::Client,
    base_url: String,
}

impl AnalyzeSensitiveContentTool {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(120)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Tool for AnalyzeSensitiveContentTool {
    fn name(&self) -> ToolName {
        ToolName::AnalyzeSensitiveContent
    }

    fn description(&self) -> &str {
        "Analyze a video for sensitive material (NSFW, violence, illegal content). Returns violation types, confidence scores and a block/review/approve recommendation."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "video_url": {
                    "type": "string",
                    "description": "URL of the video file to analyze"
                },
                "video_id": {
                    "type": "string",
                    "description": "Video identifier for tracking"
                }
            },
            "required": ["video_url", "video_id"]
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let video_id = params["video_id"].as_str().unwrap_or_default().to_string();
        let video_url = match params["video_url"].as_str() {
            Some(u) => u,
            None => {
                return ToolReply::failure_with(
                    "Missing video_url parameter",
                    [
                        ("video_id", Value::String(video_id)),
                        ("has_violation", Value::Bool(false)),
                    ],
                )
            }
        };

        let url = format!("{}/analyze", self.base_url);
        let body = json!({"video_url": video_url, "video_id": video_id.as_str()});

        match post_json(&self.client, &url, body).await {
            Ok(payload) => ToolReply::success(payload),
            Err(e) => ToolReply::failure_with(
                format!("Failed to analyze sensitive content: {}", e),
                [
                    ("video_id", Value::String(video_id)),
                    // Callers must never see an undefined violation state.
                    ("has_violation", Value::Bool(false)),
                ],
            ),
        }
    }
}

/// Sentiment and emotion analysis over post text. Failures degrade to a
/// neutral result so downstream aggregation keeps working.
pub struct AnalyzeSentimentTool {
    client: reqwest::Client,
    base_url: String,
}

impl AnalyzeSentimentTool {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(30)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Tool for AnalyzeSentimentTool {
    fn name(&self) -> ToolName {
        ToolName::AnalyzeSentiment
    }

    fn description(&self) -> &str {
        "Analyze sentiment and emotions in post text. Returns overall sentiment, a -1.0..1.0 score, emotion breakdown and attitude."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to analyze (title + description combined)"
                },
                "post_id": {
                    "type": "string",
                    "description": "Post identifier for tracking"
                }
            },
            "required": ["text", "post_id"]
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let post_id = params["post_id"].as_str().unwrap_or_default().to_string();
        let neutral_defaults = move |error: String, post_id: String| {
            ToolReply::failure_with(
                error,
                [
                    ("post_id", Value::String(post_id)),
                    ("overall_sentiment", Value::String("neutral".to_string())),
                    ("sentiment_score", json!(0.0)),
                    ("emotions", json!({})),
                    ("confidence", json!(0.0)),
                ],
            )
        };

        let text = match params["text"].as_str() {
            Some(t) => t,
            None => return neutral_defaults("Missing text parameter".to_string(), post_id),
        };

        let url = format!("{}/analyze", self.base_url);
        let body = json!({"text": text, "post_id": post_id.as_str()});

        match post_json(&self.client, &url, body).await {
            Ok(payload) => ToolReply::success(payload),
            Err(e) => neutral_defaults(format!("Failed to analyze sentiment: {}", e), post_id),
        }
    }
}

pub fn clamp_num_topics(requested: u64) -> u64 {
    requested.clamp(MIN_TOPICS, MAX_TOPICS)
}

/// Topic modeling over a text corpus.
pub struct ExtractTopicsTool {
    client: reqwest::Client,
    base_url: String,
}

impl ExtractTopicsTool {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(60)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Tool for ExtractTopicsTool {
    fn name(&self) -> ToolName {
        ToolName::ExtractTopics
    }

    fn description(&self) -> &str {
        "Extract main topics from a collection of texts. Returns topic labels, keywords and corpus coverage."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "texts": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Text corpus (titles and descriptions)"
                },
                "num_topics": {
                    "type": "integer",
                    "description": "Number of topics to extract (default 5, range 3-20)"
                }
            },
            "required": ["texts"]
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let texts = match params["texts"].as_array() {
            Some(t) => t.clone(),
            None => return ToolReply::failure("Missing texts parameter"),
        };
        let num_topics = clamp_num_topics(params["num_topics"].as_u64().unwrap_or(5));

        let url = format!("{}/topics", self.base_url);
        let body = json!({"texts": texts, "num_topics": num_topics});

        match post_json(&self.client, &url, body).await {
            Ok(payload) => ToolReply::success(payload),
            Err(e) => ToolReply::failure(format!("Failed to extract topics: {}", e)),
        }
    }
}

/// Time-series trend detection over posts with engagement metrics.
pub struct DetectTrendsTool {
    client: reqwest::Client,
    base_url: String,
}

impl DetectTrendsTool {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(60)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Tool for DetectTrendsTool {
    fn name(&self) -> ToolName {
        ToolName::DetectTrends
    }

    fn description(&self) -> &str {
        "Detect trends and viral content in a set of posts over a time window (1d, 7d, 30d)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "posts_json": {
                    "type": "string",
                    "description": "JSON array of posts with post_id, created_time and engagement counts"
                },
                "time_window": {
                    "type": "string",
                    "description": "Analysis window: 1d, 7d or 30d (default 7d)"
                }
            },
            "required": ["posts_json"]
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let posts: Value = match params["posts_json"].as_str() {
            Some(raw) => match serde_json::from_str(raw) {
                Ok(parsed) => parsed,
                Err(e) => return ToolReply::failure(format!("Invalid posts_json: {}", e)),
            },
            None => return ToolReply::failure("Missing posts_json parameter"),
        };

        let time_window = params["time_window"].as_str().unwrap_or("7d");
        if !TIME_WINDOWS.contains(&time_window) {
            return ToolReply::failure(format!(
                "Invalid time_window '{}': expected one of 1d, 7d, 30d",
                time_window
            ));
        }

        let url = format!("{}/trends", self.base_url);
        let body = json!({"posts": posts, "time_window": time_window});

        match post_json(&self.client, &url, body).await {
            Ok(payload) => ToolReply::success(payload),
            Err(e) => ToolReply::failure(format!("Failed to detect trends: {}", e)),
        }
    }
}

/// Computes engagement metrics locally; no service call involved.
pub struct AnalyzeEngagementTool;

impl AnalyzeEngagementTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnalyzeEngagementTool {
    fn default() -> Self {
        Self::new()
    }
}

pub fn compute_engagement(likes: u64, comments: u64, shares: u64, views: u64) -> Value {
    let total_interactions = likes + comments + shares;
    let (engagement_rate, interaction_rate) = if views > 0 {
        (
            total_interactions as f64 / views as f64 * 100.0,
            (comments + shares) as f64 / views as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    let (level, percentile) = if engagement_rate > 10.0 {
        ("very_high", 95)
    } else if engagement_rate > 5.0 {
        ("high", 75)
    } else if engagement_rate > 2.0 {
        ("medium", 50)
    } else {
        ("low", 25)
    };

    // Platform-wide baseline; a live deployment would derive this from
    // historical data.
    let platform_avg = 5.2;

    json!({
        "engagement_rate": round2(engagement_rate),
        "interaction_rate": round2(interaction_rate),
        "engagement_level": level,
        "total_interactions": total_interactions,
        "metrics": {
            "likes": likes,
            "comments": comments,
            "shares": shares,
            "views": views,
        },
        "benchmarks": {
            "platform_average": platform_avg,
            "percentile": percentile,
            "vs_average": round1((engagement_rate / platform_avg - 1.0) * 100.0),
        },
    })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[async_trait]
impl Tool for AnalyzeEngagementTool {
    fn name(&self) -> ToolName {
        ToolName::AnalyzeEngagement
    }

    fn description(&self) -> &str {
        "Compute engagement rate, interaction rate and an engagement level for a post's like/comment/share/view counts."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "likes": {"type": "integer", "description": "Number of likes"},
                "comments": {"type": "integer", "description": "Number of comments"},
                "shares": {"type": "integer", "description": "Number of shares"},
                "views": {"type": "integer", "description": "Number of views"}
            },
            "required": ["likes", "comments", "shares", "views"]
        })
    }

    async fn execute(&self, params: Value) -> ToolReply {
        let likes = params["likes"].as_u64().unwrap_or(0);
        let comments = params["comments"].as_u64().unwrap_or(0);
        let shares = params["shares"].as_u64().unwrap_or(0);
        let views = params["views"].as_u64().unwrap_or(0);

        ToolReply::success(compute_engagement(likes, comments, shares, views))
    }
}
