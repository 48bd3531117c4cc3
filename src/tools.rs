use crate::config::Config;
use crate::http::{self, encode_path_segment, UpstreamOutcome};
use crate::mcp::ContentItem;
use base64::Engine;
use log::info;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

// Upper bounds on upstream body excerpts quoted back to the caller.
const ERROR_EXCERPT_CHARS: usize = 200;
const MALFORMED_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Fixed tool catalog. Deterministic order, no side effects.
pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    let list_repositories = ToolDescriptor {
        name: "list_repositories".into(),
        description: "List all public repositories for a GitHub user".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "username": {
                    "type": "string",
                    "description": "GitHub username"
                }
            },
            "required": ["username"]
        }),
    };

    let get_file_contents = ToolDescriptor {
        name: "get_file_contents".into(),
        description: "Get contents of a file from a GitHub repository".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": "string",
                    "description": "Repository owner username"
                },
                "repo": {
                    "type": "string",
                    "description": "Repository name"
                },
                "path": {
                    "type": "string",
                    "description": "File path in repository"
                }
            },
            "required": ["owner", "repo", "path"]
        }),
    };

    let get_repository_info = ToolDescriptor {
        name: "get_repository_info".into(),
        description: "Get detailed information about a GitHub repository".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": "string",
                    "description": "Repository owner username"
                },
                "repo": {
                    "type": "string",
                    "description": "Repository name"
                }
            },
            "required": ["owner", "repo"]
        }),
    };

    vec![list_repositories, get_file_contents, get_repository_info]
}

// Tool inputs. Deserialization failure (missing required key, wrong type) is
// a protocol-level error, not a tool result.

#[derive(Debug, Deserialize)]
pub struct ListRepositoriesInput {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct GetFileContentsInput {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct GetRepositoryInfoInput {
    pub owner: String,
    pub repo: String,
}

/// Executor-boundary errors. These surface as JSON-RPC errors; everything
/// upstream-related is rendered into the tool result instead.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Run one tool by name. Every invocation of a known tool yields a non-empty
/// content list, whatever the upstream did.
pub async fn call_tool(
    client: &Client,
    cfg: &Config,
    name: &str,
    arguments: Value,
) -> Result<Vec<ContentItem>, ToolError> {
    match name {
        "list_repositories" => {
            let input: ListRepositoriesInput = parse_args(name, arguments)?;
            Ok(list_repositories(client, cfg, input).await)
        }
        "get_file_contents" => {
            let input: GetFileContentsInput = parse_args(name, arguments)?;
            Ok(get_file_contents(client, cfg, input).await)
        }
        "get_repository_info" => {
            let input: GetRepositoryInfoInput = parse_args(name, arguments)?;
            Ok(get_repository_info(client, cfg, input).await)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

async fn list_repositories(
    client: &Client,
    cfg: &Config,
    input: ListRepositoriesInput,
) -> Vec<ContentItem> {
    info!("Listing repositories for {}", input.username);
    let path = format!("/users/{}/repos", encode_path_segment(&input.username));
    let outcome = http::get(client, cfg, &path).await;
    passthrough(cfg, &format!("repositories of {}", input.username), outcome)
}

async fn get_repository_info(
    client: &Client,
    cfg: &Config,
    input: GetRepositoryInfoInput,
) -> Vec<ContentItem> {
    info!("Getting info for {}/{}", input.owner, input.repo);
    let path = format!(
        "/repos/{}/{}",
        encode_path_segment(&input.owner),
        encode_path_segment(&input.repo)
    );
    let outcome = http::get(client, cfg, &path).await;
    passthrough(cfg, &format!("{}/{}", input.owner, input.repo), outcome)
}

async fn get_file_contents(
    client: &Client,
    cfg: &Config,
    input: GetFileContentsInput,
) -> Vec<ContentItem> {
    // "" and "/" both address the repository root.
    let rel = input.path.trim_matches('/').to_string();
    let label = if rel.is_empty() { "root".to_string() } else { rel.clone() };
    info!("Getting {} from {}/{}", label, input.owner, input.repo);
    let path = contents_path(&input.owner, &input.repo, &rel);
    let outcome = http::get(client, cfg, &path).await;
    vec![ContentItem::text(render_contents(
        cfg,
        &input.owner,
        &input.repo,
        &label,
        outcome,
    ))]
}

fn contents_path(owner: &str, repo: &str, rel: &str) -> String {
    let mut path = format!(
        "/repos/{}/{}/contents",
        encode_path_segment(owner),
        encode_path_segment(repo)
    );
    for seg in rel.split('/').filter(|s| !s.is_empty()) {
        path.push('/');
        path.push_str(&encode_path_segment(seg));
    }
    path
}

/// Raw-body pass-through for the repository tools: a 2xx body goes back
/// verbatim, anything else becomes descriptive text.
fn passthrough(cfg: &Config, context: &str, outcome: UpstreamOutcome) -> Vec<ContentItem> {
    let text = match outcome {
        UpstreamOutcome::Success { body, .. } => body,
        other => describe_failure(cfg, context, other),
    };
    vec![ContentItem::text(text)]
}

fn describe_failure(cfg: &Config, context: &str, outcome: UpstreamOutcome) -> String {
    match outcome {
        UpstreamOutcome::Success { status, body }
        | UpstreamOutcome::ClientError { status, body }
        | UpstreamOutcome::ServerError { status, body } => format!(
            "GitHub API returned status {} for {}: {}",
            status.as_u16(),
            context,
            excerpt(&body, ERROR_EXCERPT_CHARS)
        ),
        UpstreamOutcome::Timeout => format!(
            "GitHub API request for {} timed out after {}s",
            context, cfg.timeout_secs
        ),
        UpstreamOutcome::Transport(cause) => {
            format!("GitHub API request for {} failed: {}", context, cause)
        }
    }
}

/// Shape of a 2xx contents body, decided in one classification step.
#[derive(Debug)]
enum ContentsBody {
    Listing(Vec<DirEntry>),
    File { size: Option<i64>, content: String },
    Metadata(Value),
    Malformed(String),
}

#[derive(Debug)]
struct DirEntry {
    name: String,
    kind: String,
}

impl ContentsBody {
    fn classify(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => return ContentsBody::Malformed(body.to_string()),
        };
        match value {
            Value::Array(items) => ContentsBody::Listing(
                items
                    .into_iter()
                    .map(|item| DirEntry {
                        name: item
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown")
                            .to_string(),
                        kind: item
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or("file")
                            .to_string(),
                    })
                    .collect(),
            ),
            Value::Object(ref map) if map.contains_key("content") => ContentsBody::File {
                size: map.get("size").and_then(Value::as_i64),
                content: map
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            },
            other => ContentsBody::Metadata(other),
        }
    }
}

fn render_contents(
    cfg: &Config,
    owner: &str,
    repo: &str,
    label: &str,
    outcome: UpstreamOutcome,
) -> String {
    let context = format!("{} in {}/{}", label, owner, repo);
    match outcome {
        UpstreamOutcome::ClientError { status, .. } if status == StatusCode::NOT_FOUND => format!(
            "File not found: {} in {}/{} (the path may not exist or the repository may be private)",
            label, owner, repo
        ),
        UpstreamOutcome::Success { body, .. } => match ContentsBody::classify(&body) {
            ContentsBody::Malformed(raw) => format!(
                "Malformed response from GitHub for {} (body is not valid JSON): {}",
                context,
                excerpt(&raw, MALFORMED_EXCERPT_CHARS)
            ),
            ContentsBody::Listing(entries) => {
                let mut out = format!("Directory contents of {}:", label);
                for entry in &entries {
                    out.push_str(&format!("\n- {} ({})", entry.name, entry.kind));
                }
                out
            }
            ContentsBody::File { size: Some(0), .. } => format!(
                "File {} in {}/{} exists but is empty (size 0)",
                label, owner, repo
            ),
            ContentsBody::File { content, .. } => decode_file_content(&context, &content),
            ContentsBody::Metadata(value) => serde_json::to_string_pretty(&value)
                .unwrap_or_else(|_| value.to_string()),
        },
        other => describe_failure(cfg, &context, other),
    }
}

fn decode_file_content(context: &str, content: &str) -> String {
    // GitHub wraps the base64 payload with newlines every 60 characters.
    let cleaned: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = match base64::engine::general_purpose::STANDARD.decode(cleaned.as_bytes()) {
        Ok(b) => b,
        Err(e) => return format!("Failed to decode content of {}: invalid base64 ({})", context, e),
    };
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => format!(
            "Failed to decode content of {}: not valid UTF-8 ({})",
            context, e
        ),
    }
}

fn excerpt(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
