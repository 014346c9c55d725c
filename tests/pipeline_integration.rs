//! End-to-end tests over the assembled agent pipeline: graph shape,
//! full handoff chains through the HTTP boundary, contract enforcement,
//! and the crawl completion poller.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use murmuration::agents::AgentName;
use murmuration::api::server::{create_router, AppState};
use murmuration::pipeline::{Pipeline, PipelineCell};
use murmuration::runner::engine::ScriptedEngine;
use murmuration::runner::session::InMemorySessionStore;
use murmuration::runner::{RunLoop, ToolInvocation, TurnOutcome};
use murmuration::tools::poll::{wait_for_completion, StatusSource};
use murmuration::tools::{ToolName, ToolRegistry, ToolReply};
use murmuration::Config;

fn test_app(outcomes: Vec<TurnOutcome>) -> axum::Router {
    let config = Arc::new(Config::default());
    let registry = Arc::new(ToolRegistry::from_config(&config).unwrap());
    let runner = Arc::new(RunLoop::new(
        registry,
        Arc::new(ScriptedEngine::new(outcomes)),
        Arc::new(InMemorySessionStore::new()),
    ));
    let state = AppState {
        pipeline: Arc::new(PipelineCell::new((*config).clone())),
        runner,
        config,
    };
    create_router(state)
}

async fn post_analysis(app: axum::Router, body: Value) -> Value {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/analysis")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn test_assembled_graph_has_one_entry_and_fixed_edges() {
    let pipeline = Pipeline::assemble(&Config::default());

    assert_eq!(pipeline.entry().name, AgentName::Coordinator);
    assert_eq!(pipeline.entry().handoffs.len(), 2);

    assert!(pipeline
        .agent(AgentName::DecisionSupport)
        .unwrap()
        .handoffs
        .is_empty());

    // The chain is strictly one-directional.
    assert_eq!(
        pipeline.agent(AgentName::DataCollection).unwrap().handoffs,
        vec![AgentName::ContentAnalysis]
    );
    assert_eq!(
        pipeline.agent(AgentName::ContentAnalysis).unwrap().handoffs,
        vec![AgentName::ReportGeneration]
    );
}

#[test]
fn test_pipeline_cell_rebuild_is_structurally_equivalent() {
    let cell = PipelineCell::new(Config::default());

    let first = cell.get_or_build();
    assert!(Arc::ptr_eq(&first, &cell.get_or_build()));

    cell.reset();
    let rebuilt = cell.get_or_build();

    assert!(!Arc::ptr_eq(&first, &rebuilt));
    for name in [
        AgentName::Coordinator,
        AgentName::DataCollection,
        AgentName::ContentAnalysis,
        AgentName::ReportGeneration,
        AgentName::DecisionSupport,
    ] {
        let before = first.agent(name).unwrap();
        let after = rebuilt.agent(name).unwrap();
        assert_eq!(before.handoffs, after.handoffs);
        assert_eq!(before.tools, after.tools);
        assert_eq!(before.output_contract, after.output_contract);
    }
}

#[tokio::test]
async fn test_full_chain_to_decision_support_over_http() {
    // Coordinator inspects existing data, then the chain walks down to the
    // terminal agent, which produces the prioritized action plan.
    let app = test_app(vec![
        TurnOutcome::ToolCalls(vec![ToolInvocation {
            tool: "query_crawled_posts".to_string(),
            params: json!({"platform": "douyin", "keyword": "AI", "limit": 50}),
        }]),
        TurnOutcome::Handoff(AgentName::ContentAnalysis),
        TurnOutcome::Handoff(AgentName::ReportGeneration),
        TurnOutcome::Handoff(AgentName::DecisionSupport),
        TurnOutcome::Final(json!({
            "task_id": "crawl_20250806_001",
            "overall_risk_level": "high",
            "priority_issues": [{"issue": "three blocked videos", "urgency": "immediate"}],
            "recommended_actions": [{"action": "remove flagged posts", "owner": "moderation"}],
            "risk_mitigation_strategies": ["escalate to legal"],
            "success_metrics": ["violation count at zero in 48h"],
        })),
    ]);

    let body = post_analysis(
        app,
        json!({"request": "assess public opinion on AI", "session_id": "s-e2e"}),
    )
    .await;

    assert_eq!(body["status"], "completed");
    assert_eq!(body["result"]["overall_risk_level"], "high");
    assert_eq!(body["result"]["task_id"], "crawl_20250806_001");
}

#[tokio::test]
async fn test_illegal_handoff_is_a_failed_response_not_a_crash() {
    // Report Generation may only hand off to Decision Support.
    let app = test_app(vec![
        TurnOutcome::Handoff(AgentName::ContentAnalysis),
        TurnOutcome::Handoff(AgentName::ReportGeneration),
        TurnOutcome::Handoff(AgentName::DataCollection),
    ]);

    let body = post_analysis(app, json!({"request": "analyze"})).await;

    assert_eq!(body["status"], "failed");
    assert!(body["error"].as_str().unwrap().contains("illegal handoff"));
}

#[tokio::test]
async fn test_contract_violation_names_the_contract() {
    let app = test_app(vec![
        TurnOutcome::Handoff(AgentName::ContentAnalysis),
        // AnalysisResult requires total_analyzed.
        TurnOutcome::Final(json!({"recommendations": ["nothing"]})),
    ]);

    let body = post_analysis(app, json!({"request": "analyze"})).await;

    assert_eq!(body["status"], "failed");
    assert!(body["error"].as_str().unwrap().contains("analysis_result"));
}

#[tokio::test]
async fn test_session_turns_accumulate_across_requests() {
    let config = Arc::new(Config::default());
    let registry = Arc::new(ToolRegistry::from_config(&config).unwrap());
    let sessions = Arc::new(InMemorySessionStore::new());

    let state = AppState {
        pipeline: Arc::new(PipelineCell::new((*config).clone())),
        runner: Arc::new(RunLoop::new(
            registry,
            Arc::new(ScriptedEngine::new(vec![
                TurnOutcome::Final(json!("first answer")),
                TurnOutcome::Final(json!("second answer")),
            ])),
            sessions.clone(),
        )),
        config,
    };
    let app = create_router(state);

    let first = post_analysis(
        app.clone(),
        json!({"request": "first", "session_id": "s-multi"}),
    )
    .await;
    assert_eq!(first["status"], "completed");

    let second = post_analysis(
        app,
        json!({"request": "second", "session_id": "s-multi"}),
    )
    .await;
    assert_eq!(second["status"], "completed");

    use murmuration::runner::session::SessionStore;
    let transcript = sessions.resume("s-multi").await.unwrap();
    let user_turns: Vec<_> = transcript.iter().filter(|m| m.role == "user").collect();
    assert_eq!(user_turns.len(), 2);
}

struct FlakyThenDoneSource {
    calls: std::sync::atomic::AtomicUsize,
}

#[async_trait::async_trait]
impl StatusSource for FlakyThenDoneSource {
    async fn fetch(&self, task_id: &str) -> ToolReply {
        let n = self
            .calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n < 2 {
            ToolReply::Success(json!({"task_id": task_id, "status": "running", "progress": 50 * n}))
        } else {
            ToolReply::Success(json!({
                "task_id": task_id,
                "status": "completed",
                "progress": 100,
                "total_posts": 200,
                "total_accounts": 31,
                "execution_time": 118.4,
            }))
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_poller_bridges_async_crawl_into_the_run() {
    let source = FlakyThenDoneSource {
        calls: std::sync::atomic::AtomicUsize::new(0),
    };

    let reply = wait_for_completion(&source, "crawl_e2e", 600, 5).await;

    let value = reply.into_value();
    assert_eq!(value["status"], "completed");
    assert_eq!(value["total_posts"], 200);
}

#[tokio::test]
async fn test_registry_dispatch_respects_agent_binding() {
    let registry = ToolRegistry::from_config(&Config::default()).unwrap();
    let pipeline = Pipeline::assemble(&Config::default());
    let analysis_tools = &pipeline.agent(AgentName::ContentAnalysis).unwrap().tools;

    // Engagement analysis is bound to Content Analysis and runs locally.
    let reply = registry
        .execute(
            ToolName::AnalyzeEngagement,
            json!({"likes": 1000, "comments": 50, "shares": 20, "views": 10000}),
            analysis_tools,
        )
        .await;
    let value = reply.into_value();
    assert_eq!(value["engagement_rate"], 10.7);
    assert_eq!(value["total_interactions"], 1070);
    assert_eq!(value["engagement_level"], "very_high");

    // The crawl submission tool is not in the analysis agent's set.
    let denied = registry
        .execute(ToolName::CreateCrawlerTask, json!({}), analysis_tools)
        .await;
    assert!(denied.is_failure());
}
