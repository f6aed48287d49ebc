mod common;

use aegis_gate::{Gate, RequestFacts, Verdict};
use common::{json_response, spawn_decider, spawn_decider_serving, test_config};

fn facts() -> RequestFacts {
    RequestFacts {
        client_address: "198.51.100.77".into(),
        url: "/checkout".into(),
        method: "POST".into(),
        ..RequestFacts::default()
    }
}

#[tokio::test]
async fn blocked_requests_are_written_to_the_block_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("blocks.log");

    let (endpoint, _handle) = spawn_decider(json_response(r#"{"code":403,"body":"no"}"#)).await;
    let mut config = test_config(&endpoint);
    config.block_log_file = Some(log_path.to_str().unwrap().to_string());
    let gate = Gate::new(config);

    let Verdict::Block(_) = gate.check(&facts()).await else {
        panic!("expected a block");
    };

    let content = std::fs::read_to_string(&log_path).unwrap();
    let line: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(line["clientAddress"], "198.51.100.77");
    assert_eq!(line["method"], "POST");
    assert_eq!(line["url"], "/checkout");
    assert_eq!(line["status"], 403);
    assert_eq!(line["bodyBytes"], 2);
}

#[tokio::test]
async fn allowed_requests_leave_no_block_log_line() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("blocks.log");

    let (endpoint, _handle) = spawn_decider(json_response(r#"{"code":0}"#)).await;
    let mut config = test_config(&endpoint);
    config.block_log_file = Some(log_path.to_str().unwrap().to_string());
    let gate = Gate::new(config);

    assert!(gate.check(&facts()).await.is_allow());
    assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "");
}

#[tokio::test]
async fn log_blocked_off_suppresses_the_block_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("blocks.log");

    let (endpoint, _handle) = spawn_decider(json_response(r#"{"code":403}"#)).await;
    let mut config = test_config(&endpoint);
    config.log_blocked = false;
    config.block_log_file = Some(log_path.to_str().unwrap().to_string());
    let gate = Gate::new(config);

    assert!(!gate.check(&facts()).await.is_allow());
    assert_eq!(std::fs::read_to_string(&log_path).unwrap(), "");
}

#[tokio::test]
async fn unopenable_block_log_does_not_break_checks() {
    let (endpoint, _handle) = spawn_decider(json_response(r#"{"code":403}"#)).await;
    let mut config = test_config(&endpoint);
    config.block_log_file = Some("/nonexistent-dir/blocks.log".to_string());
    let gate = Gate::new(config);
    assert!(!gate.check(&facts()).await.is_allow());
}

#[tokio::test]
async fn cloned_gates_share_one_block_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("blocks.log");

    let endpoint = spawn_decider_serving(json_response(r#"{"code":403}"#), 2).await;
    let mut config = test_config(&endpoint);
    config.block_log_file = Some(log_path.to_str().unwrap().to_string());
    let gate = Gate::new(config);
    let clone = gate.clone();

    assert!(!gate.check(&facts()).await.is_allow());
    let mut facts2 = facts();
    facts2.url = "/cart".into();
    assert!(!clone.check(&facts2).await.is_allow());

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content.lines().count(), 2);
}
