//! Process manager tests against real `sh` subprocesses speaking the
//! line-framed protocol.

use std::time::Duration;

use serde_json::json;

use switchboard::config::ToolServerConfig;
use switchboard::error::SwitchboardError;
use switchboard::server::{RequestKind, ServerHandle, ToolServerManager, ToolServers};

const TIMEOUT: Duration = Duration::from_secs(5);

fn shell_server(name: &str, script: &str) -> ToolServerConfig {
    ToolServerConfig {
        name: name.into(),
        command: "sh".into(),
        args: vec!["-c".into(), script.into()],
    }
}

#[tokio::test]
async fn list_tools_round_trips_the_catalog() {
    let manager = ToolServerManager::new();
    manager
        .start(&shell_server(
            "echo",
            r#"read req; echo '{"id":1,"result":[{"name":"ping","description":"Ping the server"}]}'; sleep 2"#,
        ))
        .await
        .unwrap();

    let tools = manager.list_tools("echo").await;
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "ping");
    assert_eq!(tools[0].description, "Ping the server");
    assert!(manager.is_running("echo"));

    manager.shutdown().await;
}

#[tokio::test]
async fn call_tool_returns_the_result_payload() {
    let manager = ToolServerManager::new();
    manager
        .start(&shell_server(
            "calc",
            r#"read req; echo '{"id":1,"result":{"sum":3}}'; sleep 2"#,
        ))
        .await
        .unwrap();

    let result = manager
        .call_tool("calc", "add", json!({"a": 1, "b": 2}), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(result["sum"], 3);

    manager.shutdown().await;
}

#[tokio::test]
async fn wire_error_surfaces_as_tool_execution() {
    let manager = ToolServerManager::new();
    manager
        .start(&shell_server(
            "flaky",
            r#"read req; echo '{"id":1,"error":"index unavailable"}'; sleep 2"#,
        ))
        .await
        .unwrap();

    let err = manager
        .call_tool("flaky", "lookup", json!({}), TIMEOUT)
        .await
        .unwrap_err();
    assert!(
        matches!(err, SwitchboardError::ToolExecution { ref message, .. } if message == "index unavailable")
    );
    // An application-level error leaves the server usable.
    assert!(manager.is_running("flaky"));

    manager.shutdown().await;
}

#[tokio::test]
async fn timeout_abandons_the_call_but_not_the_server() {
    let manager = ToolServerManager::new();
    manager
        .start(&shell_server("slow", "read req; sleep 10"))
        .await
        .unwrap();

    let err = manager
        .call_tool("slow", "lookup", json!({}), Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwitchboardError::ToolTimeout { ref tool, timeout_ms: 200 } if tool == "lookup"
    ));
    assert!(manager.is_running("slow"), "a slow call must not kill the server");

    manager.shutdown().await;
}

#[tokio::test]
async fn exit_mid_call_is_a_crash() {
    let manager = ToolServerManager::new();
    manager
        .start(&shell_server("brittle", "read req; exit 7"))
        .await
        .unwrap();

    let err = manager
        .call_tool("brittle", "lookup", json!({}), TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::ProcessCrash { ref server } if server == "brittle"));
    assert!(!manager.is_running("brittle"));
    // Blocking a dead server is a no-op.
    assert!(!manager.set_blocked("brittle", true));
}

#[tokio::test]
async fn concurrent_calls_resolve_out_of_order_by_id() {
    let config = shell_server(
        "interleaved",
        r#"read a; read b; echo '{"id":2,"result":"second"}'; echo '{"id":1,"result":"first"}'; sleep 2"#,
    );
    let handle = ServerHandle::spawn(&config).await.unwrap();

    let first_args = json!({});
    let second_args = json!({});
    let first = handle.request(RequestKind::CallTool, Some("x"), Some(&first_args), TIMEOUT);
    let second = handle.request(RequestKind::CallTool, Some("y"), Some(&second_args), TIMEOUT);
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), json!("first"));
    assert_eq!(second.unwrap(), json!("second"));

    handle.stop().await;
}

#[tokio::test]
async fn blocked_flag_applies_only_while_running() {
    let manager = ToolServerManager::new();
    manager
        .start(&shell_server("search", "read req; sleep 5"))
        .await
        .unwrap();

    assert!(!manager.is_blocked("search"));
    assert!(manager.set_blocked("search", true));
    assert!(manager.is_blocked("search"));
    assert!(manager.set_blocked("search", false));
    assert!(!manager.is_blocked("search"));

    manager.shutdown().await;
}

#[tokio::test]
async fn failed_start_does_not_register_the_server() {
    let manager = ToolServerManager::new();
    let config = ToolServerConfig {
        name: "ghost".into(),
        command: "/nonexistent/tool-server".into(),
        args: vec![],
    };
    let err = manager.start(&config).await.unwrap_err();
    assert!(matches!(err, SwitchboardError::ProcessStart { .. }));
    assert!(!manager.is_running("ghost"));
    assert!(manager.server_names().is_empty());
}

#[tokio::test]
async fn start_all_skips_failures_and_keeps_the_rest() {
    let manager = ToolServerManager::new();
    let configs = vec![
        ToolServerConfig {
            name: "ghost".into(),
            command: "/nonexistent/tool-server".into(),
            args: vec![],
        },
        shell_server("alive", "read req; sleep 5"),
    ];
    manager.start_all(&configs).await;

    assert!(!manager.is_running("ghost"));
    assert!(manager.is_running("alive"));

    manager.shutdown().await;
}

#[tokio::test]
async fn dead_server_does_not_hide_the_others_catalogs() {
    let manager = std::sync::Arc::new(ToolServerManager::new());
    manager
        .start(&shell_server(
            "healthy",
            r#"read req; echo '{"id":1,"result":[{"name":"lookup","description":"Search"}]}'; sleep 2"#,
        ))
        .await
        .unwrap();
    manager.start(&shell_server("dead", "exit 0")).await.unwrap();

    let router = switchboard::router::ToolRouter::new(manager);
    let catalog = router.available_tools(&[]).await;

    let names: Vec<&str> = catalog.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["healthy:lookup"]);
}

#[tokio::test]
async fn unknown_server_yields_an_empty_catalog() {
    let manager = ToolServerManager::new();
    assert!(manager.list_tools("nope").await.is_empty());
}
