use github_mcp_gateway::{cli, config::Config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("github-mcp-gateway {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut cfg = Config::from_env().map_err(anyhow::Error::msg)?;
    if let Some(port) = matches.get_one::<u16>("port") {
        cfg.port = *port;
    }

    server::run_http_server(cfg).await
}
