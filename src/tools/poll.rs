use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;

use super::{Tool, ToolName, ToolReply};

pub const TERMINAL_STATES: [&str; 3] = ["completed", "failed", "cancelled"];
pub const DEFAULT_TIMEOUT_SECS: i64 = 600;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Where task status payloads come from. Production uses the crawl
/// service's status endpoint; tests script the sequence.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, task_id: &str) -> ToolReply;
}

/// Polls `source` until the task reaches a terminal state or the deadline
/// passes.
///
/// A failure reply from the status fetch is returned unchanged: transient
/// transport errors are surfaced, not masked. A zero or negative timeout
/// still performs one status check before the deadline is evaluated. The
/// poll interval is clamped to at least one second so the loop always
/// terminates.
pub async fn wait_for_completion(
    source: &dyn StatusSource,
    task_id: &str,
    timeout_secs: i64,
    poll_interval_secs: u64,
) -> ToolReply {
    let interval = Duration::from_secs(poll_interval_secs.max(1));
    let start = Instant::now();

    loop {
        let reply = source.fetch(task_id).await;
        let payload = match reply {
            ToolReply::Failure { .. } => return reply,
            ToolReply::Success(payload) => payload,
        };

        if let Some(status) = payload["status"].as_str() {
            if TERMINAL_STATES.contains(&status) {
                return ToolReply::Success(payload);
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        if timeout_secs <= 0 || elapsed > timeout_secs as f64 {
            log::warn!("task {} still not terminal after {}s", task_id, timeout_secs);
            return ToolReply::failure_with(
                format!("Task {} did not complete within {}s", task_id, timeout_secs),
                [
                    ("task_id", Value::String(task_id.to_string())),
                    ("status", Value::String("timeout".to_string())),
                    ("last_status", payload),
                ],
            );
        }

        tokio::time::sleep(interval).await;
    }
}

/// Bridges the poller into the agent loop as a tool.
pub struct WaitForTaskCompletionTool {
    source: Arc<dyn StatusSource>,
}

impl WaitForTaskCompletionTool {
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for WaitForTaskCompletionTool {
    fn name(&self) -> ToolName {
        ToolName::WaitForTaskCompletion
    }

    fn description(&self) -> &str {
        "Wait for a crawler task to finish, polling its status until it completes, fails, is cancelled, or the timeout passes."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Task identifier to wait on"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Maximum wait in seconds (default 600)"
                },
                "poll_interval": {
                    "type": "integer",
                    "description": "Seconds between status checks (default 5)"
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
        let timeout = params["timeout"].as_i64().unwrap_or(DEFAULT_TIMEOUT_SECS);
        let poll_interval = params["poll_interval"]
            .as_u64()
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        wait_for_completion(self.source.as_ref(), task_id, timeout, poll_interval).await
    }
}
