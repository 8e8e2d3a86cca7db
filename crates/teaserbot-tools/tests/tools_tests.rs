//! Tests for teaserbot-tools: ToolRegistry, MemoryStore, and the builtin tools

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use teaserbot_tools::*;

struct EchoTool;

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echo the arguments back"
    }
    fn parameters(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        Ok(args.to_string())
    }
}

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

async fn posted_teaser(store: &MemoryStore, question: &str) -> Brainteaser {
    let teaser = store
        .insert_brainteaser(NewBrainteaser {
            question: question.into(),
            answer: Some("42".into()),
            author_id: None,
        })
        .await
        .unwrap();
    store.mark_posted(teaser.id, Utc::now()).await.unwrap()
}

// ===========================================================================
// ToolRegistry
// ===========================================================================

#[tokio::test]
async fn registry_default_is_empty() {
    let reg = ToolRegistry::new();
    assert!(reg.is_empty());
    assert!(reg.list().is_empty());
    assert!(reg.definitions().is_empty());
}

#[tokio::test]
async fn registry_invoke_unknown_tool() {
    let reg = ToolRegistry::new();
    let err = reg.invoke("lookupSolutions", "{}").await.unwrap_err();
    assert!(matches!(err, ToolError::UnknownTool(ref n) if n == "lookupSolutions"));
    assert!(err.to_string().contains("unknown tool"));
}

#[tokio::test]
async fn registry_invoke_passes_arguments() {
    let mut reg = ToolRegistry::new();
    reg.register(EchoTool);
    let out = reg.invoke("echo", r#"{"a":1}"#).await.unwrap();
    assert_eq!(out, r#"{"a":1}"#);
}

#[tokio::test]
async fn registry_empty_arguments_become_object() {
    let mut reg = ToolRegistry::new();
    reg.register(EchoTool);
    assert_eq!(reg.invoke("echo", "").await.unwrap(), "{}");
    assert_eq!(reg.invoke("echo", "  ").await.unwrap(), "{}");
}

#[tokio::test]
async fn registry_malformed_arguments() {
    let mut reg = ToolRegistry::new();
    reg.register(EchoTool);
    let err = reg.invoke("echo", "{not json").await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { ref tool, .. } if tool == "echo"));
}

#[tokio::test]
async fn registry_register_replaces_and_remove() {
    let mut reg = ToolRegistry::new();
    reg.register(EchoTool);
    reg.register(EchoTool);
    assert_eq!(reg.len(), 1);
    assert!(reg.get("echo").is_some());
    assert!(reg.remove("echo"));
    assert!(!reg.remove("echo"));
    assert!(reg.get("echo").is_none());
}

#[test]
fn tool_definition_serializes_as_function() {
    let def = EchoTool.to_assistant_tool();
    let v = serde_json::to_value(&def).unwrap();
    assert_eq!(v["type"], "function");
    assert_eq!(v["function"]["name"], "echo");
    assert_eq!(v["function"]["parameters"]["type"], "object");
}

#[tokio::test]
async fn create_default_registry_has_all_tools() {
    let reg = create_default_registry(store());
    assert_eq!(reg.list(), BUILTIN_TOOLS.to_vec());
    let defs = reg.definitions();
    assert_eq!(defs.len(), BUILTIN_TOOLS.len());
    let names: Vec<&str> = defs.iter().map(|d| d.name()).collect();
    assert_eq!(names, BUILTIN_TOOLS.to_vec());
}

// ===========================================================================
// MemoryStore
// ===========================================================================

#[tokio::test]
async fn store_upsert_user_keeps_points() {
    let s = store();
    s.upsert_user("u1", "Ada").await.unwrap();
    assert_eq!(s.increment_points("u1", 3).await.unwrap(), 3);
    let user = s.upsert_user("u1", "Ada L.").await.unwrap();
    assert_eq!(user.name, "Ada L.");
    assert_eq!(user.points, 3);
}

#[tokio::test]
async fn store_increment_points_unknown_user() {
    let s = store();
    let err = s.increment_points("ghost", 1).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "user", .. }));
}

#[tokio::test]
async fn store_leaderboard_orders_by_points_then_name() {
    let s = store();
    for (id, name, pts) in [("a", "Zed", 5), ("b", "Amy", 5), ("c", "Bob", 9), ("d", "Cy", 1)] {
        s.upsert_user(id, name).await.unwrap();
        s.increment_points(id, pts).await.unwrap();
    }
    let board = s.leaderboard(3).await.unwrap();
    let names: Vec<&str> = board.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Bob", "Amy", "Zed"]);
}

#[tokio::test]
async fn store_solution_requires_brainteaser() {
    let s = store();
    let err = s
        .insert_solution(NewSolution {
            brainteaser_id: uuid::Uuid::new_v4(),
            user_id: "u1".into(),
            content: "x".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "brainteaser", .. }));
}

#[tokio::test]
async fn store_select_next_skips_posted() {
    let s = store();
    assert!(s.select_next_brainteaser().await.unwrap().is_none());
    let posted = posted_teaser(&s, "old").await;
    let fresh = s
        .insert_brainteaser(NewBrainteaser {
            question: "new".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    for _ in 0..10 {
        let next = s.select_next_brainteaser().await.unwrap().unwrap();
        assert_eq!(next.id, fresh.id);
    }
    assert_eq!(s.latest_posted().await.unwrap().unwrap().id, posted.id);
}

#[tokio::test]
async fn store_latest_posted_is_most_recent() {
    let s = store();
    let a = s
        .insert_brainteaser(NewBrainteaser { question: "a".into(), ..Default::default() })
        .await
        .unwrap();
    let b = s
        .insert_brainteaser(NewBrainteaser { question: "b".into(), ..Default::default() })
        .await
        .unwrap();
    let now = Utc::now();
    s.mark_posted(b.id, now - Duration::days(1)).await.unwrap();
    s.mark_posted(a.id, now).await.unwrap();
    assert_eq!(s.latest_posted().await.unwrap().unwrap().id, a.id);
}

#[tokio::test]
async fn store_channel_subscriptions() {
    let s = store();
    s.upsert_channel_subscription("c2", true).await.unwrap();
    s.upsert_channel_subscription("c1", true).await.unwrap();
    s.upsert_channel_subscription("c3", true).await.unwrap();
    s.upsert_channel_subscription("c3", false).await.unwrap();
    assert_eq!(s.subscribed_channels().await.unwrap(), vec!["c1", "c2"]);
}

#[tokio::test]
async fn store_snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");

    let s = MemoryStore::open(&path).await.unwrap();
    assert_eq!(s.snapshot_path(), Some(path.as_path()));
    s.upsert_user("u1", "Ada").await.unwrap();
    s.increment_points("u1", 7).await.unwrap();
    s.upsert_channel_subscription("c1", true).await.unwrap();
    let teaser = posted_teaser(&s, "riddle").await;
    drop(s);

    let reopened = MemoryStore::open(&path).await.unwrap();
    assert_eq!(reopened.get_user("u1").await.unwrap().unwrap().points, 7);
    assert_eq!(reopened.subscribed_channels().await.unwrap(), vec!["c1"]);
    let loaded = reopened.get_brainteaser(teaser.id).await.unwrap().unwrap();
    assert_eq!(loaded.question, "riddle");
    assert!(loaded.posted_at.is_some());
}

#[tokio::test]
async fn store_open_rejects_corrupt_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{ nope").unwrap();
    let err = MemoryStore::open(&path).await.err().unwrap();
    assert!(matches!(err, StoreError::Persistence(_)));
}

// ===========================================================================
// Builtin tools
// ===========================================================================

#[tokio::test]
async fn submit_and_update_brainteaser() {
    let s = store();
    let reg = create_default_registry(s.clone());

    let out = reg
        .invoke("submit_brainteaser", r#"{"question":"What has keys but no locks?","author_id":"u1"}"#)
        .await
        .unwrap();
    assert!(out.starts_with("Saved brainteaser"));

    let teaser = s.select_next_brainteaser().await.unwrap().unwrap();
    assert_eq!(teaser.author_id.as_deref(), Some("u1"));

    let args = json!({"id": teaser.id, "answer": "A piano"}).to_string();
    reg.invoke("update_brainteaser", &args).await.unwrap();
    let updated = s.get_brainteaser(teaser.id).await.unwrap().unwrap();
    assert_eq!(updated.answer.as_deref(), Some("A piano"));
    assert_eq!(updated.question, "What has keys but no locks?");
}

#[tokio::test]
async fn submit_brainteaser_rejects_blank_question() {
    let reg = create_default_registry(store());
    let err = reg
        .invoke("submit_brainteaser", r#"{"question":"   "}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { .. }));
    let err = reg.invoke("submit_brainteaser", "{}").await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { .. }));
}

#[tokio::test]
async fn update_unknown_brainteaser_is_store_error() {
    let reg = create_default_registry(store());
    let args = json!({"id": uuid::Uuid::new_v4(), "question": "q"}).to_string();
    let err = reg.invoke("update_brainteaser", &args).await.unwrap_err();
    assert!(matches!(err, ToolError::Store(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn current_brainteaser_before_and_after_posting() {
    let s = store();
    let reg = create_default_registry(s.clone());
    let out = reg.invoke("get_current_brainteaser", "").await.unwrap();
    assert!(out.contains("No brainteaser"));

    let teaser = posted_teaser(&s, "riddle").await;
    let out = reg.invoke("get_current_brainteaser", "").await.unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["id"], teaser.id.to_string());
    assert_eq!(v["answer"], "42");
}

#[tokio::test]
async fn submit_solution_defaults_to_current_brainteaser() {
    let s = store();
    let reg = create_default_registry(s.clone());

    let err = reg
        .invoke("submit_solution", r#"{"user_id":"u1","content":"42"}"#)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no brainteaser"));

    let teaser = posted_teaser(&s, "riddle").await;
    reg.invoke("submit_solution", r#"{"user_id":"u1","content":"42"}"#)
        .await
        .unwrap();
    let solutions = s.solutions_for(teaser.id).await.unwrap();
    assert_eq!(solutions.len(), 1);
    assert_eq!(solutions[0].user_id, "u1");
    assert_eq!(solutions[0].correct, None);

    let listed = reg.invoke("list_solutions", "{}").await.unwrap();
    let v: Value = serde_json::from_str(&listed).unwrap();
    assert_eq!(v.as_array().unwrap().len(), 1);
    assert_eq!(v[0]["content"], "42");
}

#[tokio::test]
async fn judge_solution_awards_points_only_when_correct() {
    let s = store();
    let reg = create_default_registry(s.clone());
    s.upsert_user("u1", "Ada").await.unwrap();
    s.upsert_user("u2", "Bob").await.unwrap();
    let teaser = posted_teaser(&s, "riddle").await;

    let right = s
        .insert_solution(NewSolution {
            brainteaser_id: teaser.id,
            user_id: "u1".into(),
            content: "42".into(),
        })
        .await
        .unwrap();
    let wrong = s
        .insert_solution(NewSolution {
            brainteaser_id: teaser.id,
            user_id: "u2".into(),
            content: "41".into(),
        })
        .await
        .unwrap();

    let out = reg
        .invoke("judge_solution", &json!({"solution_id": right.id, "correct": true, "points": 3}).to_string())
        .await
        .unwrap();
    assert!(out.contains("now has 3 points"));
    reg.invoke("judge_solution", &json!({"solution_id": wrong.id, "correct": false}).to_string())
        .await
        .unwrap();

    assert_eq!(s.get_user("u1").await.unwrap().unwrap().points, 3);
    assert_eq!(s.get_user("u2").await.unwrap().unwrap().points, 0);
    let judged = s.solutions_for(teaser.id).await.unwrap();
    assert!(judged.iter().any(|s| s.id == wrong.id && s.correct == Some(false)));
}

#[tokio::test]
async fn judge_solution_twice_scores_once() {
    let s = store();
    let reg = create_default_registry(s.clone());
    s.upsert_user("u1", "Ada").await.unwrap();
    let teaser = posted_teaser(&s, "riddle").await;
    let solution = s
        .insert_solution(NewSolution {
            brainteaser_id: teaser.id,
            user_id: "u1".into(),
            content: "42".into(),
        })
        .await
        .unwrap();
    let args = json!({"solution_id": solution.id, "correct": true, "points": 5}).to_string();

    let first = reg.invoke("judge_solution", &args).await.unwrap();
    assert!(first.contains("now has 5 points"));
    let second = reg.invoke("judge_solution", &args).await.unwrap();
    assert!(second.contains("already marked correct"));
    assert_eq!(s.get_user("u1").await.unwrap().unwrap().points, 5);

    // Incorrect then correct again counts as a fresh judgement.
    reg.invoke("judge_solution", &json!({"solution_id": solution.id, "correct": false}).to_string())
        .await
        .unwrap();
    reg.invoke("judge_solution", &args).await.unwrap();
    assert_eq!(s.get_user("u1").await.unwrap().unwrap().points, 10);
}

#[tokio::test]
async fn update_solution_reports_previous_judgement() {
    let s = store();
    s.upsert_user("u1", "Ada").await.unwrap();
    let teaser = posted_teaser(&s, "riddle").await;
    let solution = s
        .insert_solution(NewSolution {
            brainteaser_id: teaser.id,
            user_id: "u1".into(),
            content: "42".into(),
        })
        .await
        .unwrap();

    let (updated, previous) = s.update_solution(solution.id, true).await.unwrap();
    assert_eq!(updated.correct, Some(true));
    assert_eq!(previous, None);
    let (_, previous) = s.update_solution(solution.id, false).await.unwrap();
    assert_eq!(previous, Some(true));
}

#[tokio::test]
async fn award_points_overflow_is_rejected() {
    let s = store();
    let reg = create_default_registry(s.clone());
    s.upsert_user("u1", "Ada").await.unwrap();
    let args = json!({"user_id": "u1", "points": i64::MAX}).to_string();

    reg.invoke("award_points", &args).await.unwrap();
    let err = reg.invoke("award_points", &args).await.unwrap_err();
    assert!(matches!(err, ToolError::Store(StoreError::Invalid(_))));
    assert_eq!(s.get_user("u1").await.unwrap().unwrap().points, i64::MAX);

    let err = s.increment_points("u1", 1).await.unwrap_err();
    assert!(err.to_string().contains("overflows"));
    assert_eq!(s.increment_points("u1", -1).await.unwrap(), i64::MAX - 1);
}

#[tokio::test]
async fn award_points_and_leaderboard() {
    let s = store();
    let reg = create_default_registry(s.clone());
    s.upsert_user("u1", "Ada").await.unwrap();
    s.upsert_user("u2", "Bob").await.unwrap();

    let out = reg
        .invoke("award_points", r#"{"user_id":"u2","points":5}"#)
        .await
        .unwrap();
    assert_eq!(out, "u2 now has 5 points");
    reg.invoke("award_points", r#"{"user_id":"u1","points":2}"#)
        .await
        .unwrap();

    let board = reg.invoke("get_leaderboard", r#"{"limit":1}"#).await.unwrap();
    let v: Value = serde_json::from_str(&board).unwrap();
    assert_eq!(v.as_array().unwrap().len(), 1);
    assert_eq!(v[0]["name"], "Bob");

    let err = reg
        .invoke("award_points", r#"{"user_id":"ghost","points":1}"#)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("user not found"));
}
