use github_mcp_gateway::config::Config;
use github_mcp_gateway::server::{dispatch, AppState, Request};
use httpmock::{Method::GET, MockServer};

fn test_state(api_url: &str, token: Option<&str>) -> AppState {
    let cfg = Config {
        token: token.map(str::to_string),
        api_url: api_url.to_string(),
        api_version: "2022-11-28".into(),
        user_agent: "github-mcp-gateway-tests".into(),
        timeout_secs: 5,
        port: 0,
    };
    AppState::new(cfg).unwrap()
}

async fn call_tool(state: &AppState, name: &str, arguments: serde_json::Value) -> serde_json::Value {
    let req: Request = serde_json::from_value(serde_json::json!({
        "jsonrpc": "2.0", "method": "tools/call", "id": 1,
        "params": { "name": name, "arguments": arguments }
    }))
    .unwrap();
    serde_json::to_value(dispatch(state, req).await).unwrap()
}

fn sole_text(resp: &serde_json::Value) -> &str {
    let content = resp["result"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    content[0]["text"].as_str().unwrap()
}

#[tokio::test]
async fn list_repositories_passes_body_through_unchanged() {
    let body = r#"[{"name":"r1","private":false},{"name":"r2","private":false}]"#;
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/users/octocat/repos");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(body);
    });
    let state = test_state(&server.base_url(), None);
    let out = call_tool(
        &state,
        "list_repositories",
        serde_json::json!({"username": "octocat"}),
    )
    .await;
    assert_eq!(sole_text(&out), body);
}

#[tokio::test]
async fn repository_info_passes_body_through_unchanged() {
    let body = r#"{"full_name":"acme/widgets","stargazers_count":42}"#;
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets");
        then.status(200).body(body);
    });
    let state = test_state(&server.base_url(), None);
    let out = call_tool(
        &state,
        "get_repository_info",
        serde_json::json!({"owner": "acme", "repo": "widgets"}),
    )
    .await;
    assert_eq!(sole_text(&out), body);
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/users/octocat/repos")
            .header("authorization", "Bearer testtoken");
        then.status(200).body("[]");
    });
    let state = test_state(&server.base_url(), Some("testtoken"));
    let out = call_tool(
        &state,
        "list_repositories",
        serde_json::json!({"username": "octocat"}),
    )
    .await;
    m.assert();
    assert_eq!(sole_text(&out), "[]");
}

#[tokio::test]
async fn no_auth_header_without_a_token() {
    let server = MockServer::start();
    // Declared first: only matches if an Authorization header slips through.
    let with_auth = server.mock(|when, then| {
        when.method(GET)
            .path("/users/octocat/repos")
            .header_exists("authorization");
        then.status(500).body("should not be reached");
    });
    let plain = server.mock(|when, then| {
        when.method(GET).path("/users/octocat/repos");
        then.status(200).body("[]");
    });
    let state = test_state(&server.base_url(), None);
    let out = call_tool(
        &state,
        "list_repositories",
        serde_json::json!({"username": "octocat"}),
    )
    .await;
    assert_eq!(with_auth.hits(), 0);
    assert_eq!(plain.hits(), 1);
    assert_eq!(sole_text(&out), "[]");
}

#[tokio::test]
async fn upstream_error_becomes_descriptive_text() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/users/ghost/repos");
        then.status(404).body(r#"{"message":"Not Found"}"#);
    });
    let state = test_state(&server.base_url(), None);
    let out = call_tool(
        &state,
        "list_repositories",
        serde_json::json!({"username": "ghost"}),
    )
    .await;
    assert!(out.get("error").is_none());
    let text = sole_text(&out);
    assert!(text.contains("404"));
    assert!(text.contains("Not Found"));
}

#[tokio::test]
async fn repository_info_error_names_the_repo() {
    let server = MockServer::start();
    let _m = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/gone");
        then.status(403).body("rate limit exceeded");
    });
    let state = test_state(&server.base_url(), None);
    let out = call_tool(
        &state,
        "get_repository_info",
        serde_json::json!({"owner": "acme", "repo": "gone"}),
    )
    .await;
    let text = sole_text(&out);
    assert!(text.contains("403"));
    assert!(text.contains("acme/gone"));
    assert!(text.contains("rate limit exceeded"));
}
