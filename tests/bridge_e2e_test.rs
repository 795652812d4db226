// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Bridge End-to-End Tests
 * Real router on an ephemeral port, ZAP simulated with wiremock
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};
use zap_mcp_bridge::config::{create_default_config, AppConfig};
use zap_mcp_bridge::{create_router, AppContext};

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<axum::body::Bytes>> + Send>>;

struct Bridge {
    base: String,
    ctx: AppContext,
    http: reqwest::Client,
}

async fn start_bridge(zap: &MockServer) -> Bridge {
    start_bridge_with(zap, |_| {}).await
}

async fn start_bridge_with(zap: &MockServer, tweak: impl FnOnce(&mut AppConfig)) -> Bridge {
    let mut config = create_default_config();
    config.backend.base_url = zap.uri();
    config.backend.status_timeout_secs = 1;
    tweak(&mut config);

    let ctx = AppContext::new(config).await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(ctx.clone());

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    Bridge {
        base: format!("http://{}", addr),
        ctx,
        http: reqwest::Client::new(),
    }
}

/// Minimal SSE reader over a reqwest byte stream
struct SseClient {
    stream: ByteStream,
    buffer: String,
    endpoint: String,
}

impl SseClient {
    async fn connect(bridge: &Bridge) -> Self {
        let response = bridge
            .http
            .get(format!("{}/sse", bridge.base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let mut client = Self {
            stream: Box::pin(response.bytes_stream()),
            buffer: String::new(),
            endpoint: String::new(),
        };

        let (event, data) = client.next_event().await.expect("endpoint event");
        assert_eq!(event, "endpoint");
        assert!(data.starts_with("/mcp/messages?session_id="));
        client.endpoint = format!("{}{}", bridge.base, data);
        client
    }

    fn session_id(&self) -> String {
        self.endpoint
            .split("session_id=")
            .nth(1)
            .unwrap_or_default()
            .to_string()
    }

    /// Next event as (name, data); `None` once the stream has ended
    async fn next_event(&mut self) -> Option<(String, String)> {
        loop {
            if let Some(pos) = self.buffer.find("\n\n") {
                let raw: String = self.buffer.drain(..pos + 2).collect();
                let mut event = "message".to_string();
                let mut data = Vec::new();
                for line in raw.lines() {
                    if let Some(name) = line.strip_prefix("event:") {
                        event = name.trim().to_string();
                    } else if let Some(chunk) = line.strip_prefix("data:") {
                        data.push(chunk.trim_start().to_string());
                    }
                }
                if data.is_empty() {
                    continue;
                }
                return Some((event, data.join("\n")));
            }

            let chunk = tokio::time::timeout(Duration::from_secs(10), self.stream.next())
                .await
                .expect("timed out waiting for SSE data")?;
            self.buffer.push_str(&String::from_utf8_lossy(&chunk.ok()?));
        }
    }

    async fn next_message(&mut self) -> Value {
        loop {
            let (event, data) = self.next_event().await.expect("stream ended");
            if event == "message" {
                return serde_json::from_str(&data).unwrap();
            }
        }
    }

    async fn post(&self, bridge: &Bridge, body: Value) -> reqwest::Response {
        bridge.http.post(&self.endpoint).json(&body).send().await.unwrap()
    }

    async fn call_tool(&self, bridge: &Bridge, id: u64, name: &str, arguments: Value) -> reqwest::Response {
        self.post(
            bridge,
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": "tools/call",
                "params": { "name": name, "arguments": arguments },
            }),
        )
        .await
    }
}

/// Tool payload carried in `result.content[0].text`
fn tool_payload(envelope: &Value) -> Value {
    let text = envelope["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

async fn mount_ok(zap: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(zap)
        .await;
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let zap = MockServer::start().await;
    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    let response = sse
        .post(&bridge, json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2024-11-05", "clientInfo": {"name": "cursor"}}
        }))
        .await;
    assert_eq!(response.status(), 202);

    let init = sse.next_message().await;
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "owasp-zap-mcp");

    sse.post(&bridge, json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    sse.post(&bridge, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .await;

    let list = sse.next_message().await;
    assert_eq!(list["id"], 2);
    let tools = list["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 10);
    assert!(tools.iter().any(|t| t["name"] == "zap_spider_scan"));
}

#[tokio::test]
async fn test_unknown_method_yields_method_not_found() {
    let zap = MockServer::start().await;
    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    sse.post(&bridge, json!({"jsonrpc": "2.0", "id": 9, "method": "resources/list"}))
        .await;

    let envelope = sse.next_message().await;
    assert_eq!(envelope["id"], 9);
    assert_eq!(envelope["error"]["code"], -32601);
}

#[tokio::test]
async fn test_spider_scan_from_free_text() {
    let zap = MockServer::start().await;
    mount_ok(&zap, "/JSON/spider/action/setOptionMaxDepth/", json!({"Result": "OK"})).await;
    mount_ok(&zap, "/JSON/spider/action/setOptionThreadCount/", json!({"Result": "OK"})).await;
    Mock::given(method("GET"))
        .and(path("/JSON/spider/action/scan/"))
        .and(query_param("url", "https://example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scan": "3"})))
        .expect(1)
        .mount(&zap)
        .await;

    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    let response = sse
        .call_tool(&bridge, 7, "zap_spider_scan", json!({"random_string": "example.com"}))
        .await;
    assert_eq!(response.status(), 202);

    let envelope = sse.next_message().await;
    assert_eq!(envelope["id"], 7);
    assert_eq!(envelope["result"]["isError"], false);

    let payload = tool_payload(&envelope);
    assert_eq!(payload["success"], true);
    assert_eq!(payload["scan_id"], "3");
    assert_eq!(payload["url"], "https://example.com");
    assert_eq!(payload["max_depth"], 5);
}

#[tokio::test]
async fn test_unknown_tool_returns_tool_not_found() {
    let zap = MockServer::start().await;
    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    let response = sse.call_tool(&bridge, 42, "zap_nonexistent", json!({})).await;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["data"]["kind"], "ToolNotFound");

    let envelope = sse.next_message().await;
    assert_eq!(envelope["id"], 42);
    assert_eq!(envelope["error"]["code"], -32602);
    assert_eq!(envelope["error"]["data"]["kind"], "ToolNotFound");
}

#[tokio::test]
async fn test_unrecoverable_argument_names_parameter() {
    let zap = MockServer::start().await;
    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    sse.call_tool(&bridge, 5, "zap_spider_status", json!({"random_string": "how is my scan doing?"}))
        .await;

    let envelope = sse.next_message().await;
    assert_eq!(envelope["id"], 5);
    assert_eq!(envelope["error"]["data"]["kind"], "ArgumentUnrecoverable");
    assert_eq!(envelope["error"]["data"]["parameter"], "scan_id");
}

#[tokio::test]
async fn test_health_check_timeout_is_reported_in_payload() {
    let zap = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/JSON/core/view/version/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"version": "2.14.0"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&zap)
        .await;

    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    sse.call_tool(&bridge, 1, "zap_health_check", json!({})).await;

    let envelope = sse.next_message().await;
    assert!(envelope.get("error").is_none());
    assert_eq!(envelope["result"]["isError"], true);

    let payload = tool_payload(&envelope);
    assert_eq!(payload["success"], false);
    assert_eq!(payload["kind"], "BackendUnreachable");
    assert_eq!(payload["status"], "unhealthy");
}

#[tokio::test]
async fn test_concurrent_calls_get_correlated_envelopes() {
    let zap = MockServer::start().await;
    mount_ok(&zap, "/JSON/spider/view/status/", json!({"status": "50"})).await;

    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    let calls = (0..8u64).map(|id| {
        let sse = &sse;
        let bridge = &bridge;
        async move {
            sse.call_tool(bridge, id, "zap_spider_status", json!({"scan_id": id.to_string()}))
                .await
                .status()
        }
    });
    for status in futures::future::join_all(calls).await {
        assert_eq!(status, 202);
    }

    let mut seen = HashSet::new();
    for _ in 0..8 {
        let envelope = sse.next_message().await;
        let payload = tool_payload(&envelope);
        let id = envelope["id"].as_u64().unwrap();
        assert_eq!(payload["scan_id"], id.to_string());
        assert_eq!(payload["status"], "running");
        seen.insert(id);
    }
    assert_eq!(seen, (0..8u64).collect::<HashSet<_>>());
}

#[tokio::test]
async fn test_clear_session_twice_succeeds() {
    let zap = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/JSON/core/action/newSession/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Result": "OK"})))
        .expect(2)
        .mount(&zap)
        .await;

    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    for id in [1u64, 2] {
        sse.call_tool(&bridge, id, "zap_clear_session", json!({})).await;
        let envelope = sse.next_message().await;
        assert_eq!(envelope["id"], id);
        assert_eq!(tool_payload(&envelope)["success"], true);
    }
}

#[tokio::test]
async fn test_recent_context_supplies_missing_scan_id() {
    let zap = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/JSON/spider/view/status/"))
        .and(query_param("scanId", "12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "100"})))
        .mount(&zap)
        .await;

    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;

    sse.post(
        &bridge,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "ping",
            "params": { "messages": [{ "role": "user", "content": "check spider scan id 12" }] },
        }),
    )
    .await;
    sse.next_message().await;

    sse.call_tool(&bridge, 2, "zap_spider_status", json!({})).await;
    let envelope = sse.next_message().await;
    let payload = tool_payload(&envelope);
    assert_eq!(payload["scan_id"], "12");
    assert_eq!(payload["status"], "completed");
}

#[tokio::test]
async fn test_idle_session_is_closed() {
    let zap = MockServer::start().await;
    let bridge = start_bridge(&zap).await;
    let mut sse = SseClient::connect(&bridge).await;
    let session_id = sse.session_id();

    let report = bridge
        .ctx
        .sessions
        .sweep_at(Instant::now() + Duration::from_secs(301));
    assert_eq!(report.closed, 1);

    assert!(sse.next_event().await.is_none());
    assert!(bridge.ctx.sessions.get(&session_id).is_err());

    let response = sse.call_tool(&bridge, 1, "zap_health_check", json!({})).await;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "SessionNotFound");
}

#[tokio::test]
async fn test_submit_without_session_id_is_rejected() {
    let zap = MockServer::start().await;
    let bridge = start_bridge(&zap).await;

    let response = bridge
        .http
        .post(format!("{}/mcp/messages", bridge.base))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_status_and_tools_endpoints() {
    let zap = MockServer::start().await;
    let bridge = start_bridge(&zap).await;
    let _sse = SseClient::connect(&bridge).await;

    let status: Value = bridge
        .http
        .get(format!("{}/status", bridge.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["mode"], "mcp_sse");
    assert_eq!(status["clients"], 1);
    let names = status["tools"].as_array().unwrap();
    assert_eq!(names.len(), 10);
    assert!(names.iter().any(|n| n == "zap_health_check"));
    assert_eq!(status["tool_count"], 10);

    let tools: Value = bridge
        .http
        .get(format!("{}/tools", bridge.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tools["count"], 10);

    let live = bridge
        .http
        .get(format!("{}/health/live", bridge.base))
        .send()
        .await
        .unwrap();
    assert_eq!(live.status(), 200);

    let health: Value = bridge
        .http
        .get(format!("{}/health", bridge.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["tools"].as_array().unwrap().len(), 10);
    assert!(health["tools"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n == "zap_active_scan"));
}
