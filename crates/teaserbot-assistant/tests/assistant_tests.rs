//! Tests for teaserbot-assistant: wire types and the HTTP client against a local mock service

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use teaserbot_assistant::*;
use teaserbot_core::Role;

// ===========================================================================
// RunStatus / RunSnapshot
// ===========================================================================

#[test]
fn run_status_classification() {
    assert!(RunStatus::Queued.is_transient());
    assert!(RunStatus::InProgress.is_transient());
    assert!(!RunStatus::RequiresAction.is_transient());
    assert!(!RunStatus::Completed.is_transient());
    assert!(!RunStatus::Unknown.is_transient());
}

#[test]
fn run_status_unknown_values_parse() {
    let status: RunStatus = serde_json::from_str("\"paused_for_lunch\"").unwrap();
    assert_eq!(status, RunStatus::Unknown);
    let status: RunStatus = serde_json::from_str("\"requires_action\"").unwrap();
    assert_eq!(status, RunStatus::RequiresAction);
}

#[test]
fn run_snapshot_parses_requires_action_payload() {
    let snapshot: RunSnapshot = serde_json::from_value(json!({
        "id": "run_1",
        "object": "thread.run",
        "status": "requires_action",
        "required_action": {
            "type": "submit_tool_outputs",
            "submit_tool_outputs": {
                "tool_calls": [
                    {
                        "id": "call_a",
                        "type": "function",
                        "function": { "name": "get_leaderboard", "arguments": "{}" }
                    },
                    {
                        "id": "call_b",
                        "type": "function",
                        "function": { "name": "award_points", "arguments": "{\"user_id\":\"u1\",\"points\":3}" }
                    }
                ]
            }
        },
        "last_error": null
    }))
    .unwrap();

    assert_eq!(snapshot.id.as_str(), "run_1");
    let calls = snapshot.pending_tool_calls().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].id, "call_a");
    assert_eq!(calls[1].function.name, "award_points");
}

#[test]
fn run_snapshot_parses_failure_details() {
    let snapshot: RunSnapshot = serde_json::from_value(json!({
        "id": "run_2",
        "status": "failed",
        "last_error": { "code": "server_error", "message": "boom" }
    }))
    .unwrap();
    assert_eq!(snapshot.status, RunStatus::Failed);
    assert_eq!(snapshot.last_error.unwrap().code, "server_error");

    let snapshot: RunSnapshot = serde_json::from_value(json!({
        "id": "run_3",
        "status": "incomplete",
        "incomplete_details": { "reason": "max_prompt_tokens" }
    }))
    .unwrap();
    assert_eq!(
        snapshot.incomplete_details.unwrap().reason.as_deref(),
        Some("max_prompt_tokens")
    );
}

#[test]
fn run_snapshot_constructors() {
    let s = RunSnapshot::requires_tools("r", vec![ToolCallRequest::new("c1", "x", "{}")]);
    assert_eq!(s.status, RunStatus::RequiresAction);
    assert_eq!(s.pending_tool_calls().unwrap().len(), 1);
    assert!(RunSnapshot::new("r", RunStatus::Completed)
        .pending_tool_calls()
        .is_none());
}

// ===========================================================================
// Run request / tools
// ===========================================================================

#[test]
fn run_request_serializes_truncation_and_tools() {
    let request = RunRequest {
        assistant_id: "asst_1".into(),
        truncation_strategy: TruncationStrategy::LastMessages { last_messages: 10 },
        tools: Some(vec![AssistantTool::function(
            "get_leaderboard",
            "Top users",
            json!({"type": "object", "properties": {}}),
        )]),
    };
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["truncation_strategy"]["type"], "last_messages");
    assert_eq!(value["truncation_strategy"]["last_messages"], 10);
    assert_eq!(value["tools"][0]["type"], "function");
    assert_eq!(value["tools"][0]["function"]["name"], "get_leaderboard");
}

#[test]
fn run_request_omits_missing_tools() {
    let request = RunRequest {
        assistant_id: "asst_1".into(),
        truncation_strategy: TruncationStrategy::Auto,
        tools: None,
    };
    let value = serde_json::to_value(&request).unwrap();
    assert!(value.get("tools").is_none());
    assert_eq!(value["truncation_strategy"]["type"], "auto");
}

// ===========================================================================
// ThreadMessage
// ===========================================================================

#[test]
fn thread_message_text_and_non_text() {
    let msg: ThreadMessage = serde_json::from_value(json!({
        "id": "msg_1",
        "role": "assistant",
        "content": [{ "type": "text", "text": { "value": "4", "annotations": [] } }]
    }))
    .unwrap();
    assert_eq!(msg.first_text(), Some("4"));

    let msg: ThreadMessage = serde_json::from_value(json!({
        "id": "msg_2",
        "role": "assistant",
        "content": [{ "type": "image_file", "image_file": { "file_id": "f" } }]
    }))
    .unwrap();
    assert_eq!(msg.first_text(), None);
}

// ===========================================================================
// OpenAiAssistantsClient against a local mock
// ===========================================================================

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "Bearer sk-test")
        .unwrap_or(false)
        && headers
            .get("openai-beta")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "assistants=v2")
            .unwrap_or(false)
}

async fn spawn_mock() -> String {
    let app = Router::new()
        .route(
            "/v1/threads",
            post(|headers: HeaderMap| async move {
                if !authorized(&headers) {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
                }
                (StatusCode::OK, Json(json!({"id": "thread_abc", "object": "thread"})))
            }),
        )
        .route(
            "/v1/threads/:thread/messages",
            post(|Path(thread): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(thread, "thread_abc");
                assert_eq!(body["role"], "user");
                Json(json!({"id": "msg_new"}))
            })
            .get(
                |Path(_thread): Path<String>, Query(query): Query<HashMap<String, String>>| async move {
                    assert_eq!(query.get("order").map(String::as_str), Some("desc"));
                    Json(json!({
                        "object": "list",
                        "data": [{
                            "id": "msg_9",
                            "role": "assistant",
                            "content": [{"type": "text", "text": {"value": "hello there", "annotations": []}}]
                        }]
                    }))
                },
            ),
        )
        .route(
            "/v1/threads/:thread/runs",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["assistant_id"], "asst_1");
                Json(json!({"id": "run_1", "status": "queued"}))
            }),
        )
        .route(
            "/v1/threads/:thread/runs/:run",
            get(|Path((_thread, run)): Path<(String, String)>| async move {
                Json(json!({"id": run, "status": "in_progress"}))
            }),
        )
        .route(
            "/v1/threads/:thread/runs/:run/submit_tool_outputs",
            post(|Json(body): Json<Value>| async move {
                let outputs = body["tool_outputs"].as_array().cloned().unwrap_or_default();
                if outputs.is_empty() {
                    return (StatusCode::BAD_REQUEST, Json(json!({"error": "empty"})));
                }
                (StatusCode::OK, Json(json!({"id": "run_1", "status": "queued"})))
            }),
        )
        .route(
            "/v1/limited/threads",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("retry-after", "7")],
                    "slow down",
                )
            }),
        )
        .route(
            "/v1/huge/threads",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("retry-after", "18446744073709551615")],
                    "much later",
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn client_full_round_trip() {
    let base = spawn_mock().await;
    let client = OpenAiAssistantsClient::new("sk-test").with_base_url(format!("{}/v1", base));

    let thread = client.create_thread().await.unwrap();
    assert_eq!(thread.as_str(), "thread_abc");

    client
        .append_message(&thread, Role::User, "2+2?")
        .await
        .unwrap();

    let run = client
        .submit_run(
            &thread,
            RunRequest {
                assistant_id: "asst_1".into(),
                truncation_strategy: TruncationStrategy::LastMessages { last_messages: 10 },
                tools: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(run.as_str(), "run_1");

    let snapshot = client.get_run(&thread, &run).await.unwrap();
    assert_eq!(snapshot.status, RunStatus::InProgress);

    client
        .submit_tool_outputs(
            &thread,
            &run,
            vec![ToolOutput {
                tool_call_id: "call_a".into(),
                output: "ok".into(),
            }],
        )
        .await
        .unwrap();

    let latest = client.latest_message(&thread).await.unwrap().unwrap();
    assert_eq!(latest.first_text(), Some("hello there"));
}

#[tokio::test]
async fn client_maps_auth_failure() {
    let base = spawn_mock().await;
    let client = OpenAiAssistantsClient::new("sk-wrong").with_base_url(format!("{}/v1", base));
    let err = client.create_thread().await.unwrap_err();
    assert!(matches!(err, AssistantError::AuthFailed(_)), "got {:?}", err);
}

#[tokio::test]
async fn client_maps_rate_limit_with_retry_after() {
    let base = spawn_mock().await;
    let client =
        OpenAiAssistantsClient::new("sk-test").with_base_url(format!("{}/v1/limited", base));
    match client.create_thread().await.unwrap_err() {
        AssistantError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 7_000),
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn client_saturates_huge_retry_after() {
    let base = spawn_mock().await;
    let client = OpenAiAssistantsClient::new("sk-test").with_base_url(format!("{}/v1/huge", base));
    match client.create_thread().await.unwrap_err() {
        AssistantError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, u64::MAX),
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn client_maps_bad_request() {
    let base = spawn_mock().await;
    let client = OpenAiAssistantsClient::new("sk-test").with_base_url(format!("{}/v1", base));
    let err = client
        .submit_tool_outputs(&ThreadId::new("thread_abc"), &RunId::new("run_1"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, AssistantError::RequestFailed(_)), "got {:?}", err);
}
