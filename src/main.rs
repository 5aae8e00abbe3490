use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use mo_agent_core::project::ConfigStore;

/// Local bridge between a browser agent and the project working directory
#[derive(Parser, Debug)]
#[command(name = "mo-agent", version, about)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Port to start searching from (overrides mo.config.json)
    #[arg(long, env = "MO_AGENT_PORT")]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Debug logging for this crate
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    mo_agent_core::util::init_logging(cli.verbose);

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    }
    .canonicalize()?;

    // 配置错误在启动阶段即终止进程
    let store = match ConfigStore::load_or_create(&root) {
        Ok(store) => store,
        Err(e) => {
            error!("Error reading or creating mo.config.json: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = store.config().validate() {
        error!("Error: {}", e);
        return Err(e.into());
    }

    let port = cli.port.unwrap_or(store.config().port);
    info!("Starting Mo-2 Agent server for {:?}", root);

    mo_agent_core::server::run_server(root, store, &cli.host, port).await
}
