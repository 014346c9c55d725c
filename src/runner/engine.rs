use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ToolInvocation, TurnOutcome};
use crate::agents::{AgentDefinition, AgentName};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    pub fn tool(tool_name: &str, payload: &Value) -> Self {
        Self {
            role: "tool".to_string(),
            content: format!("{}: {}", tool_name, payload),
        }
    }
}

/// The opaque reasoning capability behind one agent turn. Given the
/// governing agent and the conversation so far, it decides what the turn
/// does; the loop in `RunLoop` enforces budget and graph legality.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn next_turn(
        &self,
        agent: &AgentDefinition,
        transcript: &[Message],
        tool_schemas: &[Value],
    ) -> Result<TurnOutcome>;
}

/// Chat-completions-backed engine. The model is asked to answer with a
/// JSON directive; plain text is accepted as a free-form final answer.
pub struct ChatEngine {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatEngine {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn render_system_prompt(agent: &AgentDefinition, tool_schemas: &[Value]) -> String {
        let mut prompt = agent.instructions.clone();

        prompt.push_str("\n\n## Protocol\n");
        prompt.push_str(
            "Answer with exactly one JSON object describing your turn:\n\
             - {\"action\": \"tool_calls\", \"calls\": [{\"tool\": \"<name>\", \"params\": {...}}]}\n\
             - {\"action\": \"handoff\", \"target\": \"<agent>\"}\n\
             - {\"action\": \"final\", \"output\": <your result>}\n",
        );

        if tool_schemas.is_empty() {
            prompt.push_str("\nYou have no tools.\n");
        } else {
            prompt.push_str("\n## Tools\n");
            for schema in tool_schemas {
                prompt.push_str(&format!("{}\n", schema));
            }
        }

        if agent.handoffs.is_empty() {
            prompt.push_str("\nYou cannot hand off; you must produce the final answer.\n");
        } else {
            let targets: Vec<&str> = agent.handoffs.iter().map(|h| h.as_str()).collect();
            prompt.push_str(&format!("\nHandoff targets: {}\n", targets.join(", ")));
        }

        prompt
    }
}

/// Interprets a model answer as a turn directive. Non-JSON text is a
/// free-form final answer; a malformed directive is an engine error.
pub fn parse_directive(content: &str) -> Result<TurnOutcome> {
    let trimmed = content.trim();
    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return Ok(TurnOutcome::Final(Value::String(trimmed.to_string()))),
    };

    let action = match value.get("action").and_then(|a| a.as_str()) {
        Some(a) => a,
        None => return Ok(TurnOutcome::Final(value)),
    };

    match action {
        "tool_calls" => {
            let calls = value["calls"]
                .as_array()
                .ok_or_else(|| anyhow!("tool_calls directive without calls array"))?
                .iter()
                .map(|call| {
                    let tool = call["tool"]
                        .as_str()
                        .ok_or_else(|| anyhow!("tool call without tool name"))?
                        .to_string();
                    Ok(ToolInvocation {
                        tool,
                        params: call.get("params").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TurnOutcome::ToolCalls(calls))
        }
        "handoff" => {
            let target = value["target"]
                .as_str()
                .ok_or_else(|| anyhow!("handoff directive without target"))?;
            let target = AgentName::from_str(target)
                .ok_or_else(|| anyhow!("handoff to unknown agent: {}", target))?;
            Ok(TurnOutcome::Handoff(target))
        }
        "final" => Ok(TurnOutcome::Final(
            value.get("output").cloned().unwrap_or(Value::Null),
        )),
        other => Err(anyhow!("unknown directive action: {}", other)),
    }
}

#[async_trait]
impl ReasoningEngine for ChatEngine {
    async fn next_turn(
        &self,
        agent: &AgentDefinition,
        transcript: &[Message],
        tool_schemas: &[Value],
    ) -> Result<TurnOutcome> {
        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: Self::render_system_prompt(agent, tool_schemas),
        }];

        for message in transcript {
            // Tool results ride along as user turns; the directive protocol
            // does not use native tool-call ids.
            let role = match message.role.as_str() {
                "tool" => "user",
                other => other,
            };
            messages.push(ChatMessage {
                role: role.to_string(),
                content: message.content.clone(),
            });
        }

        let request = ChatRequest {
            model: agent.model.clone(),
            messages,
            max_tokens: Some(4096),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("chat API error {}: {}", status, body);
        }

        let result: ChatResponse = response.json().await?;
        let content = result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("no choices in chat response"))?;

        parse_directive(&content)
    }
}

/// Test engine that replays a fixed outcome sequence.
pub struct ScriptedEngine {
    outcomes: std::sync::Mutex<std::collections::VecDeque<TurnOutcome>>,
}

impl ScriptedEngine {
    pub fn new(outcomes: Vec<TurnOutcome>) -> Self {
        Self {
            outcomes: std::sync::Mutex::new(outcomes.into()),
        }
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn next_turn(
        &self,
        _agent: &AgentDefinition,
        _transcript: &[Message],
        _tool_schemas: &[Value],
    ) -> Result<TurnOutcome> {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted engine exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tool_calls_directive() {
        let outcome = parse_directive(
            r#"{"action": "tool_calls", "calls": [{"tool": "get_task_status", "params": {"task_id": "t1"}}]}"#,
        )
        .unwrap();

        match outcome {
            TurnOutcome::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].tool, "get_task_status");
                assert_eq!(calls[0].params["task_id"], "t1");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_parse_handoff_directive() {
        let outcome =
            parse_directive(r#"{"action": "handoff", "target": "content_analysis"}"#).unwrap();
        assert!(matches!(
            outcome,
            TurnOutcome::Handoff(AgentName::ContentAnalysis)
        ));
    }

    #[test]
    fn test_parse_final_directive() {
        let outcome =
            parse_directive(r#"{"action": "final", "output": {"total_analyzed": 10}}"#).unwrap();
        match outcome {
            TurnOutcome::Final(value) => assert_eq!(value["total_analyzed"], 10),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_is_free_form_final() {
        let outcome = parse_directive("Analysis is complete; nothing to report.").unwrap();
        match outcome {
            TurnOutcome::Final(Value::String(s)) => assert!(s.starts_with("Analysis")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_handoff_to_unknown_agent_is_error() {
        let err = parse_directive(r#"{"action": "handoff", "target": "mystery"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown agent"));
    }

    #[test]
    fn test_system_prompt_lists_handoff_targets() {
        let pipeline = crate::pipeline::Pipeline::assemble(&crate::config::Config::default());
        let agent = pipeline.entry();

        let prompt = ChatEngine::render_system_prompt(agent, &[json!({"name": "get_task_status"})]);
        assert!(prompt.contains("data_collection, content_analysis"));
        assert!(prompt.contains("get_task_status"));
    }
}
