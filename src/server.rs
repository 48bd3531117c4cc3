use crate::config::Config;
use crate::http;
use crate::mcp;
use crate::tools::{self, ToolError, PROTOCOL_VERSION};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Str(String),
    Num(i64),
    Null,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str, data: Option<Value>) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
            data,
        }),
        id,
    }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: Some(result),
        error: None,
        id,
    }
}

/// Shared per-process state: read-only config and the upstream client.
/// Requests never mutate it.
pub struct AppState {
    pub cfg: Config,
    pub client: Client,
}

impl AppState {
    pub fn new(cfg: Config) -> anyhow::Result<Self> {
        let client = http::build_client(&cfg)?;
        Ok(Self { cfg, client })
    }
}

/// Route one JSON-RPC request to its handler. Each call is an independent
/// transition; nothing is carried across requests.
pub async fn dispatch(state: &AppState, req: Request) -> Response {
    debug!("Received method={}", req.method);
    match req.method.as_str() {
        "initialize" => handle_initialize(req.id),
        "notifications/initialized" => rpc_ok(req.id, serde_json::json!({})),
        "tools/list" => handle_tools_list(req.id),
        "tools/call" => handle_tools_call(state, req.id, req.params).await,
        "ping" => rpc_ok(req.id, serde_json::json!({})),
        other => rpc_error(req.id, -32601, &format!("Method not found: {}", other), None),
    }
}

fn handle_initialize(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "github-mcp-gateway",
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

fn handle_tools_list(id: Option<Id>) -> Response {
    let tools = tools::tool_descriptors();
    rpc_ok(id, serde_json::json!({ "tools": tools }))
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

async fn handle_tools_call(state: &AppState, id: Option<Id>, params: Value) -> Response {
    let parsed: Result<ToolCallParams, _> = serde_json::from_value(params);
    let Ok(call) = parsed else {
        return rpc_error(id, -32602, "Invalid params", None);
    };
    match tools::call_tool(&state.client, &state.cfg, &call.name, call.arguments).await {
        Ok(items) => rpc_ok(id, mcp::tool_result(items)),
        Err(e @ ToolError::UnknownTool(_)) => rpc_error(id, -32601, &e.to_string(), None),
        Err(e @ ToolError::InvalidArguments { .. }) => rpc_error(id, -32602, &e.to_string(), None),
    }
}

async fn handle_rpc(State(state): State<Arc<AppState>>, body: String) -> Json<Response> {
    let req: Request = match serde_json::from_str(&body) {
        Ok(r) => r,
        Err(e) => {
            // Echo the id when the body is at least JSON; null otherwise.
            let id = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("id").cloned())
                .and_then(|id| serde_json::from_value::<Id>(id).ok());
            return Json(rpc_error(
                id,
                -32603,
                &format!("Invalid JSON-RPC request: {}", e),
                None,
            ));
        }
    };
    Json(dispatch(&state, req).await)
}

async fn handle_health() -> &'static str {
    "OK"
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sse", post(handle_rpc))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Serve the gateway on an already-bound listener. Split out from
/// `run_http_server` so tests can bind an ephemeral port.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn run_http_server(cfg: Config) -> anyhow::Result<()> {
    let port = cfg.port;
    if cfg.token.is_none() {
        info!("No GITHUB_TOKEN configured; upstream calls will be unauthenticated");
    }
    let state = Arc::new(AppState::new(cfg)?);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "GitHub MCP gateway listening on port {}; protocol={}",
        port, PROTOCOL_VERSION
    );
    serve_on(listener, state).await
}
