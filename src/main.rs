use chatgate::{build_router, AppState, Dispatcher, GatewayConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chatgate",
    about = "OpenAI-compatible chat gateway — one inbound protocol, multiple upstreams",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable the thinking-mode extension on the OpenAI-compatible upstream
    #[arg(long)]
    thinking: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatgate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = GatewayConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.thinking {
        config.openai.thinking_mode = true;
    }

    info!("chatgate v{}", env!("CARGO_PKG_VERSION"));
    info!("  OpenAI-compatible upstream: {}", config.openai.base_url);
    info!("  Gemini upstream:            {}", config.gemini.base_url);
    info!("  Default model:              {}", config.openai.default_model);
    info!("  Thinking mode:              {}", config.openai.thinking_mode);
    info!("  Port:                       {}", config.port);

    // No overall request timeout: streamed completions can run for minutes.
    let client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?;

    let port = config.port;
    let state = Arc::new(AppState {
        dispatcher: Dispatcher::new(config, client),
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
