use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use shannon_patterns::{PatternContext, PatternOptions};
use shannon_router::RouterInput;
use shannon_streaming::StreamFrame as ManagerFrame;
use shannon_types::{AgentExecutionResult, EventType, ModelTier, WorkflowSnapshot, WorkflowStatus, WorkflowUsage};
use shannon_wire::stream::LastEventId;
use shannon_wire::{GetResponse, GetResultMetadata, StreamFrame};
use uuid::Uuid;

use crate::state::AppState;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/workflows", post(submit))
        .route("/v1/workflows/{workflow_id}", get(get_workflow))
        .route("/v1/workflows/{workflow_id}/stream", get(stream_workflow))
        .with_state(state)
}

fn error_body(message: impl Into<String>) -> Json<Value> {
    Json(json!({"error": message.into()}))
}

async fn submit(State(state): State<Arc<AppState>>, headers: HeaderMap, Json(req): Json<shannon_wire::SubmitRequest>) -> impl IntoResponse {
    if let Err(e) = req.validate() {
        return (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response();
    }

    let idempotency_key = headers.get(IDEMPOTENCY_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);

    if let Some(key) = &idempotency_key {
        if let Some(existing_id) = state.idempotent_workflow_id(key).await {
            if let Some(snapshot) = state.workflows.read().await.get(&existing_id).cloned() {
                return (StatusCode::OK, Json(to_get_response(snapshot))).into_response();
            }
        }
    }

    let task_id = Uuid::new_v4();
    let workflow_id = format!("wf-{task_id}");

    state.workflows.write().await.insert(
        workflow_id.clone(),
        WorkflowSnapshot {
            workflow_id: workflow_id.clone(),
            status: WorkflowStatus::Queued,
            result: None,
            usage: WorkflowUsage::default(),
            model_used: None,
            provider: None,
        },
    );

    if let Some(key) = &idempotency_key {
        state.bind_idempotency_key(key, &workflow_id).await;
    }

    let spawned_state = state.clone();
    let spawned_id = workflow_id.clone();
    tokio::spawn(async move { run_workflow(spawned_state, spawned_id, task_id, req).await });

    (StatusCode::ACCEPTED, Json(json!({"workflow_id": workflow_id, "status": "queued"}))).into_response()
}

async fn run_workflow(state: Arc<AppState>, workflow_id: String, task_id: Uuid, req: shannon_wire::SubmitRequest) {
    set_status(&state, &workflow_id, WorkflowStatus::Running).await;
    state.streaming.publish(&workflow_id, EventType::WorkflowStarted, None, None, None).await;

    let model_tier = req.effective_model_tier().unwrap_or(ModelTier::Medium);
    let pattern_ctx = PatternContext {
        executor: state.executor.clone(),
        tool_executor: Some(state.tool_executor.clone()),
        streaming: Some(state.streaming.clone()),
        budget: Some(state.budget.clone()),
        workflow_id: workflow_id.clone(),
        task_id,
        user_id: "anonymous".to_string(),
        session_id: req.session_id.clone(),
        options: PatternOptions { model_tier, ..Default::default() },
    };

    let router_input = RouterInput {
        query: req.query.clone(),
        context: serde_json::to_value(&req.context).unwrap_or(Value::Null),
        role: req.context.get("role").and_then(Value::as_str).map(str::to_string),
        mode: req.mode,
        force_research: req.force_research,
        cognitive_strategy: req.cognitive_strategy.clone(),
        disable_ai: req.disable_ai,
        model_override: req.model_override.clone(),
    };

    let outcome = async {
        let decision = shannon_router::route(router_input, state.decomposer.as_ref(), Some(&state.streaming), &workflow_id).await?;
        shannon_strategies::dispatch(&pattern_ctx, &req.query, &decision, state.decomposer.as_ref(), None, &state.configs, 1).await
    }
    .await;

    match outcome {
        Ok(output) => {
            let usage = aggregate_usage(&state, &output.steps);
            let last_step = output.steps.last();
            state.streaming.publish(&workflow_id, EventType::WorkflowCompleted, None, None, None).await;
            finish_workflow(
                &state,
                &workflow_id,
                WorkflowStatus::Completed,
                Some(output.response),
                usage,
                last_step.map(|s| s.model_used.clone()),
                last_step.map(|s| s.provider.clone()),
            )
            .await;
        }
        Err(e) => {
            state.streaming.publish(&workflow_id, EventType::WorkflowFailed, None, Some(e.to_string()), None).await;
            finish_workflow(&state, &workflow_id, WorkflowStatus::Failed, Some(e.to_string()), WorkflowUsage::default(), None, None).await;
        }
    }
}

fn aggregate_usage(state: &AppState, steps: &[AgentExecutionResult]) -> WorkflowUsage {
    let mut usage = WorkflowUsage::default();
    for step in steps {
        usage.input_tokens += step.input_tokens;
        usage.output_tokens += step.output_tokens;
        usage.total_tokens += step.total_tokens;
        if step.total_tokens > 0 {
            usage.cost_usd += state.pricing.cost_for_split(&step.model_used, step.input_tokens, step.output_tokens).as_usd();
        }
    }
    usage
}

async fn set_status(state: &AppState, workflow_id: &str, status: WorkflowStatus) {
    if let Some(snapshot) = state.workflows.write().await.get_mut(workflow_id) {
        snapshot.status = status;
    }
}

async fn finish_workflow(
    state: &AppState,
    workflow_id: &str,
    status: WorkflowStatus,
    result: Option<String>,
    usage: WorkflowUsage,
    model_used: Option<String>,
    provider: Option<String>,
) {
    if let Some(snapshot) = state.workflows.write().await.get_mut(workflow_id) {
        snapshot.status = status;
        snapshot.result = result;
        snapshot.usage = usage;
        snapshot.model_used = model_used;
        snapshot.provider = provider;
    }
}

async fn get_workflow(State(state): State<Arc<AppState>>, Path(workflow_id): Path<String>) -> impl IntoResponse {
    match state.workflows.read().await.get(&workflow_id).cloned() {
        Some(snapshot) => (StatusCode::OK, Json(to_get_response(snapshot))).into_response(),
        None => (StatusCode::NOT_FOUND, error_body("workflow not found")).into_response(),
    }
}

fn to_get_response(snapshot: WorkflowSnapshot) -> GetResponse {
    GetResponse {
        workflow_id: snapshot.workflow_id,
        status: snapshot.status,
        result: snapshot.result.unwrap_or_default(),
        usage: snapshot.usage,
        metadata: GetResultMetadata { model_used: snapshot.model_used, provider: snapshot.provider },
    }
}

#[derive(serde::Deserialize)]
struct StreamQuery {
    #[serde(default)]
    types: Option<String>,
    #[serde(default)]
    last_event_id: Option<String>,
}

async fn stream_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
    Query(params): Query<StreamQuery>,
) -> impl IntoResponse {
    if !state.workflows.read().await.contains_key(&workflow_id) {
        return (StatusCode::NOT_FOUND, error_body("workflow not found")).into_response();
    }

    let types = params.types.as_deref().map(shannon_wire::StreamSubscribeParams::parse_types).unwrap_or_default();
    let last_seq = match params.last_event_id.as_deref().map(LastEventId::parse) {
        Some(LastEventId::Seq(seq)) => seq,
        _ => 0,
    };

    let (mut receiver, _unsubscribe) = state.streaming.subscribe(&workflow_id, types, last_seq, 64).await;

    let event_stream = async_stream::stream! {
        while let Some(frame) = receiver.recv().await {
            let wire_frame = match frame {
                ManagerFrame::Event(event) => StreamFrame::Event(event),
                ManagerFrame::Heartbeat => StreamFrame::Heartbeat { at: chrono::Utc::now() },
                ManagerFrame::Error(e) => StreamFrame::Error { code: e.kind.to_string(), message: e.message },
            };
            if let Ok(data) = serde_json::to_string(&wire_frame) {
                yield Ok::<Event, std::convert::Infallible>(Event::default().data(data));
            }
        }
    };

    Sse::new(event_stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
        .into_response()
}
