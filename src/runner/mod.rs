pub mod engine;
pub mod session;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::agents::AgentName;
use crate::contracts::ContractViolation;
use crate::pipeline::Pipeline;
use crate::tools::{ToolName, ToolRegistry, ToolReply};

use engine::{Message, ReasoningEngine};
use session::SessionStore;

/// What one agent turn decided to do. Produced by the opaque reasoning
/// capability, consumed by the loop below, which enforces the turn budget
/// and the legality of handoff edges.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    ToolCalls(Vec<ToolInvocation>),
    Handoff(AgentName),
    Final(Value),
}

#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: String,
    pub params: Value,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("illegal handoff from {from} to {to}")]
    IllegalHandoff { from: AgentName, to: AgentName },

    #[error("agent {agent}: {violation}")]
    ContractViolation {
        agent: AgentName,
        violation: ContractViolation,
    },

    #[error("turn budget of {limit} exhausted without a final answer")]
    TurnBudgetExceeded { limit: usize },

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Failed,
    TurnBudgetExceeded,
}

/// One entry in the ordered trace of a run.
#[derive(Debug, Clone)]
pub enum TurnAction {
    ToolCalls(Vec<String>),
    Handoff(AgentName),
    Final,
}

#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub agent: AgentName,
    pub action: TurnAction,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub final_agent: AgentName,
    pub output: Option<Value>,
    pub error: Option<RunError>,
    pub trace: Vec<TurnRecord>,
}

impl RunOutcome {
    fn completed(agent: AgentName, output: Value, trace: Vec<TurnRecord>) -> Self {
        Self {
            status: RunStatus::Completed,
            final_agent: agent,
            output: Some(output),
            error: None,
            trace,
        }
    }

    fn failed(agent: AgentName, error: RunError, trace: Vec<TurnRecord>) -> Self {
        let status = match error {
            RunError::TurnBudgetExceeded { .. } => RunStatus::TurnBudgetExceeded,
            _ => RunStatus::Failed,
        };
        Self {
            status,
            final_agent: agent,
            output: None,
            error: Some(error),
            trace,
        }
    }
}

/// Drives one request through the pipeline: strictly sequential turns,
/// tool dispatch restricted to the governing agent's bound set, handoffs
/// restricted to its configured edges, and a hard turn budget.
pub struct RunLoop {
    registry: Arc<ToolRegistry>,
    engine: Arc<dyn ReasoningEngine>,
    sessions: Arc<dyn SessionStore>,
}

impl RunLoop {
    pub fn new(
        registry: Arc<ToolRegistry>,
        engine: Arc<dyn ReasoningEngine>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            registry,
            engine,
            sessions,
        }
    }

    pub async fn run(
        &self,
        pipeline: &Pipeline,
        session_id: &str,
        input: &str,
        max_turns: usize,
    ) -> RunOutcome {
        let mut transcript = match self.sessions.resume(session_id).await {
            Ok(prior) => prior,
            Err(e) => {
                log::warn!("session {} resume failed, starting fresh: {}", session_id, e);
                Vec::new()
            }
        };

        let opening = Message::user(input);
        transcript.push(opening.clone());
        let mut new_messages = vec![opening];

        let mut current = pipeline.entry();
        let mut trace: Vec<TurnRecord> = Vec::new();

        let outcome = 'run: {
            for _ in 0..max_turns {
                let schemas = self.registry.get_schemas(&current.tools);
                let decided = match self.engine.next_turn(current, &transcript, &schemas).await {
                    Ok(decided) => decided,
                    Err(e) => {
                        break 'run RunOutcome::failed(current.name, RunError::Engine(e), trace)
                    }
                };

                match decided {
                    TurnOutcome::ToolCalls(calls) => {
                        trace.push(TurnRecord {
                            agent: current.name,
                            action: TurnAction::ToolCalls(
                                calls.iter().map(|c| c.tool.clone()).collect(),
                            ),
                        });

                        for call in calls {
                            let reply = self.dispatch(&call, &current.tools).await;
                            let message = Message::tool(&call.tool, &reply.into_value());
                            transcript.push(message.clone());
                            new_messages.push(message);
                        }
                    }
                    TurnOutcome::Handoff(target) => {
                        if !current.can_hand_off_to(target) {
                            break 'run RunOutcome::failed(
                                current.name,
                                RunError::IllegalHandoff {
                                    from: current.name,
                                    to: target,
                                },
                                trace,
                            );
                        }

                        trace.push(TurnRecord {
                            agent: current.name,
                            action: TurnAction::Handoff(target),
                        });

                        // The target exists: assembly wired every edge to a
                        // built agent.
                        current = pipeline
                            .agent(target)
                            .expect("handoff edge points at assembled agent");

                        let note = Message::system(format!("Control handed to {}.", target));
                        transcript.push(note.clone());
                        new_messages.push(note);
                    }
                    TurnOutcome::Final(value) => {
                        if let Some(contract) = current.output_contract {
                            if let Err(violation) = contract.validate(&value) {
                                break 'run RunOutcome::failed(
                                    current.name,
                                    RunError::ContractViolation {
                                        agent: current.name,
                                        violation,
                                    },
                                    trace,
                                );
                            }
                        }

                        trace.push(TurnRecord {
                            agent: current.name,
                            action: TurnAction::Final,
                        });

                        let message = Message::assistant(value.to_string());
                        new_messages.push(message);

                        break 'run RunOutcome::completed(current.name, value, trace);
                    }
                }
            }

            RunOutcome::failed(
                current.name,
                RunError::TurnBudgetExceeded { limit: max_turns },
                trace,
            )
        };

        if let Err(e) = self.sessions.append(session_id, &new_messages).await {
            log::warn!("session {} append failed: {}", session_id, e);
        }

        outcome
    }

    /// A tool name the registry does not know, or one outside the agent's
    /// bound set, yields a failure reply rather than a fault; the agent
    /// sees the error and can correct itself on its next turn.
    async fn dispatch(&self, call: &ToolInvocation, allowed: &[ToolName]) -> ToolReply {
        match ToolName::from_str(&call.tool) {
            Some(name) => {
                self.registry
                    .execute(name, call.params.clone(), allowed)
                    .await
            }
            None => ToolReply::failure_with(
                format!("unknown tool: {}", call.tool),
                [("tool", Value::String(call.tool.clone()))],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use engine::ScriptedEngine;
    use serde_json::json;
    use session::InMemorySessionStore;

    fn run_loop(outcomes: Vec<TurnOutcome>) -> RunLoop {
        RunLoop::new(
            Arc::new(ToolRegistry::from_config(&Config::default()).unwrap()),
            Arc::new(ScriptedEngine::new(outcomes)),
            Arc::new(InMemorySessionStore::new()),
        )
    }

    fn pipeline() -> Pipeline {
        Pipeline::assemble(&Config::default())
    }

    #[tokio::test]
    async fn test_free_form_final_completes() {
        let runner = run_loop(vec![TurnOutcome::Final(json!(
            "No crawl needed; prior data already covers the request."
        ))]);

        let outcome = runner.run(&pipeline(), "s1", "status?", 10).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.final_agent, AgentName::Coordinator);
        assert!(outcome.output.is_some());
        assert_eq!(outcome.trace.len(), 1);
    }

    #[tokio::test]
    async fn test_handoff_chain_reaches_terminal_agent() {
        let decision = json!({
            "task_id": "crawl_001",
            "overall_risk_level": "low",
        });
        let runner = run_loop(vec![
            TurnOutcome::Handoff(AgentName::ContentAnalysis),
            TurnOutcome::Handoff(AgentName::ReportGeneration),
            TurnOutcome::Handoff(AgentName::DecisionSupport),
            TurnOutcome::Final(decision),
        ]);

        let outcome = runner.run(&pipeline(), "s1", "analyze", 10).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.final_agent, AgentName::DecisionSupport);
        assert_eq!(outcome.trace.len(), 4);
    }

    #[tokio::test]
    async fn test_illegal_handoff_fails_run() {
        // Coordinator is not wired to DecisionSupport.
        let runner = run_loop(vec![TurnOutcome::Handoff(AgentName::DecisionSupport)]);

        let outcome = runner.run(&pipeline(), "s1", "analyze", 10).await;

        assert_eq!(outcome.status, RunStatus::Failed);
        match outcome.error {
            Some(RunError::IllegalHandoff { from, to }) => {
                assert_eq!(from, AgentName::Coordinator);
                assert_eq!(to, AgentName::DecisionSupport);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_contract_output_fails_run() {
        let runner = run_loop(vec![
            TurnOutcome::Handoff(AgentName::DataCollection),
            // Missing almost every required CrawlerResult field.
            TurnOutcome::Final(json!({"task_id": "crawl_001"})),
        ]);

        let outcome = runner.run(&pipeline(), "s1", "collect", 10).await;

        assert_eq!(outcome.status, RunStatus::Failed);
        match outcome.error {
            Some(RunError::ContractViolation { agent, violation }) => {
                assert_eq!(agent, AgentName::DataCollection);
                assert!(violation.to_string().contains("crawler_result"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_turn_budget_enforced() {
        let runner = run_loop(vec![
            TurnOutcome::ToolCalls(vec![]),
            TurnOutcome::ToolCalls(vec![]),
            TurnOutcome::ToolCalls(vec![]),
        ]);

        let outcome = runner.run(&pipeline(), "s1", "analyze", 2).await;

        assert_eq!(outcome.status, RunStatus::TurnBudgetExceeded);
        assert!(matches!(
            outcome.error,
            Some(RunError::TurnBudgetExceeded { limit: 2 })
        ));
        assert_eq!(outcome.trace.len(), 2);
    }

    #[tokio::test]
    async fn test_unbound_tool_call_is_recorded_not_fatal() {
        // Coordinator may not call analyze_sentiment; the failure reply is
        // appended and the next turn still runs.
        let runner = run_loop(vec![
            TurnOutcome::ToolCalls(vec![ToolInvocation {
                tool: "analyze_sentiment".to_string(),
                params: json!({"text": "x", "post_id": "p"}),
            }]),
            TurnOutcome::Final(json!("done")),
        ]);

        let outcome = runner.run(&pipeline(), "s1", "analyze", 10).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.trace.len(), 2);
    }

    #[tokio::test]
    async fn test_engine_failure_surfaces_as_failed_run() {
        // Empty script: the engine errors on the first turn.
        let runner = run_loop(vec![]);

        let outcome = runner.run(&pipeline(), "s1", "analyze", 10).await;

        assert_eq!(outcome.status, RunStatus::Failed);
        assert!(matches!(outcome.error, Some(RunError::Engine(_))));
    }

    #[tokio::test]
    async fn test_transcript_persists_across_runs() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let registry = Arc::new(ToolRegistry::from_config(&Config::default()).unwrap());

        let first = RunLoop::new(
            registry.clone(),
            Arc::new(ScriptedEngine::new(vec![TurnOutcome::Final(json!("ok"))])),
            sessions.clone(),
        );
        first.run(&pipeline(), "s1", "first request", 10).await;

        let resumed = sessions.resume("s1").await.unwrap();
        assert!(resumed.iter().any(|m| m.content == "first request"));
        assert!(resumed.iter().any(|m| m.role == "assistant"));
    }
}
