use std::env;

/// Runtime configuration for the gateway and its GitHub API client.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: Option<String>,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [optional; absent means unauthenticated calls]
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: github-mcp-gateway/<version>)
    /// - PORT (default: 8080)
    pub fn from_env() -> Result<Self, String> {
        let token = env::var("GITHUB_TOKEN")
            .or_else(|_| env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());

        let api_url =
            env::var("GITHUB_API_URL").unwrap_or_else(|_| "https://api.github.com".to_string());
        let api_version =
            env::var("GITHUB_API_VERSION").unwrap_or_else(|_| "2022-11-28".to_string());
        let timeout_secs = env::var("GITHUB_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);
        let default_ua = format!("github-mcp-gateway/{}", env!("CARGO_PKG_VERSION"));
        let user_agent = env::var("GITHUB_USER_AGENT").unwrap_or(default_ua);
        let port = match env::var("PORT") {
            Ok(s) => s
                .parse::<u16>()
                .map_err(|_| format!("Invalid PORT value: {}", s))?,
            Err(_) => 8080,
        };

        Ok(Self {
            token,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
            port,
        })
    }
}
