//! A client session against the full server stack over an in-memory transport.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use fanout_core::{AgentConfig, EngineConfig, ListStore};
use fanout_engine::Engine;
use fanout_mcp::{CallToolResult, ChannelTransport, JsonRpcResponse, McpServer, McpTransport, RpcId, ToolContent};
use fanout_tool_runtime::ToolRegistry;

const HANG_GUARD: Duration = Duration::from_secs(20);

struct Client {
    transport: ChannelTransport,
}

impl Client {
    async fn send(&mut self, id: i64, method: &str, params: Value) {
        let msg = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        self.transport.send(&msg.to_string()).await.unwrap();
    }

    async fn next(&mut self) -> JsonRpcResponse {
        let line = tokio::time::timeout(HANG_GUARD, self.transport.receive())
            .await
            .expect("no response from server")
            .unwrap()
            .expect("server closed the transport");
        serde_json::from_str(&line).unwrap()
    }

    async fn call(&mut self, id: i64, name: &str, arguments: Value) -> CallToolResult {
        self.send(id, "tools/call", json!({"name": name, "arguments": arguments}))
            .await;
        let resp = self.next().await;
        assert_eq!(resp.id, RpcId::Number(id));
        serde_json::from_value(resp.result.unwrap()).unwrap()
    }
}

fn text(result: &CallToolResult) -> &str {
    match &result.content[0] {
        ToolContent::Text { text } => text,
    }
}

fn start(results: &std::path::Path, work: &std::path::Path) -> (Client, tokio::task::JoinHandle<()>) {
    let config = EngineConfig {
        results_dir: results.to_path_buf(),
        concurrency: NonZeroUsize::new(2).unwrap(),
        ..EngineConfig::default()
    };
    let engine = Engine::new(config, AgentConfig::all_enabled(), work.to_path_buf());
    let registry = ToolRegistry::builtin(Arc::new(ListStore::new()), Arc::new(engine)).unwrap();
    let server = McpServer::new(registry);

    let (client_side, mut server_side) = ChannelTransport::pair();
    let handle = tokio::spawn(async move {
        server.run(&mut server_side).await.unwrap();
    });
    (Client { transport: client_side }, handle)
}

#[tokio::test]
async fn list_then_run_shell_session() {
    let work = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    std::fs::write(work.path().join("a.txt"), "x\ny\n").unwrap();
    std::fs::write(work.path().join("b.txt"), "z\n").unwrap();
    let (mut client, server) = start(results.path(), work.path());

    client.send(1, "initialize", json!({"protocolVersion": "2024-11-05", "capabilities": {}})).await;
    assert!(client.next().await.error.is_none());

    let created = client.call(2, "create_list", json!({"items": ["a.txt", "b.txt"]})).await;
    let list_id = text(&created).split_whitespace().nth(2).unwrap().to_string();

    let run = client
        .call(3, "run_shell", json!({"list_id": list_id, "command": "wc -l $item"}))
        .await;
    assert!(!run.is_error);
    let run_dir = std::fs::read_dir(results.path()).unwrap().next().unwrap().unwrap().path();
    let a = std::fs::read_to_string(run_dir.join("a.txt.stdout.txt")).unwrap();
    assert!(a.contains('2'));
    assert!(text(&run).contains(&run_dir.display().to_string()));

    let missing = client
        .call(4, "run_shell", json!({"list_id": "gone-list-000", "command": "true"}))
        .await;
    assert!(missing.is_error);
    assert_eq!(std::fs::read_dir(results.path()).unwrap().count(), 1);

    drop(client);
    server.await.unwrap();
}

#[tokio::test]
async fn ping_is_answered_while_a_run_is_in_flight() {
    let work = tempfile::tempdir().unwrap();
    let results = tempfile::tempdir().unwrap();
    let (mut client, server) = start(results.path(), work.path());

    let created = client.call(1, "create_list", json!({"items": ["slow"]})).await;
    let list_id = text(&created).split_whitespace().nth(2).unwrap().to_string();

    client
        .send(2, "tools/call", json!({"name": "run_shell", "arguments": {"list_id": list_id, "command": "sleep 1; echo $item"}}))
        .await;
    client.send(3, "ping", json!({})).await;

    let first = client.next().await;
    assert_eq!(first.id, RpcId::Number(3));
    let second = client.next().await;
    assert_eq!(second.id, RpcId::Number(2));
    let run: CallToolResult = serde_json::from_value(second.result.unwrap()).unwrap();
    assert!(!run.is_error);

    drop(client);
    server.await.unwrap();
}
