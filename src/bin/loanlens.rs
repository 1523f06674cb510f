//! HTTP server binary for loanlens.
//!
//! A thin shim over the library crate: maps CLI flags and environment
//! variables to an [`ExtractionConfig`], resolves the model provider, and
//! serves the extraction API plus the static frontend bundle.

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use loanlens::server::{router, AppState};
use loanlens::{ExtractionConfig, ExtractionMode, FormatMode, LiveModelClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for the loanlens server.
#[derive(Parser, Debug)]
#[command(name = "loanlens")]
#[command(about = "Loan-contract extraction API server")]
struct Args {
    /// Host address to bind to
    #[arg(long, env = "LOANLENS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "LOANLENS_PORT", default_value = "8000")]
    port: u16,

    /// PDF handling mode: 'text' or 'raster'
    #[arg(long, env = "LOANLENS_MODE", default_value = "text")]
    mode: ExtractionMode,

    /// Page to rasterise in raster mode (1-indexed)
    #[arg(long, env = "LOANLENS_RASTER_PAGE", default_value = "1")]
    raster_page: usize,

    /// Numeric output format: 'raw' or 'display'
    #[arg(long, env = "LOANLENS_FORMAT", default_value = "raw")]
    format: FormatMode,

    /// Model identifier, e.g. 'gemini-2.0-flash'
    #[arg(long, env = "LOANLENS_MODEL")]
    model: Option<String>,

    /// Provider name (e.g. 'gemini', 'openai'); auto-detected when omitted
    #[arg(long, env = "LOANLENS_PROVIDER")]
    provider: Option<String>,

    /// Per-model-call timeout in seconds
    #[arg(long, env = "LOANLENS_API_TIMEOUT_SECS", default_value = "60")]
    api_timeout_secs: u64,

    /// Total model-call attempts (1 or 2)
    #[arg(long, env = "LOANLENS_MAX_ATTEMPTS", default_value = "1")]
    max_attempts: u32,

    /// Maximum upload size in bytes
    #[arg(long, env = "LOANLENS_MAX_UPLOAD_BYTES", default_value = "20971520")]
    max_upload_bytes: usize,

    /// Directory with the frontend bundle; skipped when absent
    #[arg(long, env = "LOANLENS_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut builder = ExtractionConfig::builder()
        .mode(args.mode)
        .raster_page(args.raster_page)
        .format_mode(args.format)
        .api_timeout_secs(args.api_timeout_secs)
        .max_attempts(args.max_attempts)
        .max_upload_bytes(args.max_upload_bytes);
    if let Some(model) = args.model {
        builder = builder.model(model);
    }
    if let Some(provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    let config = builder.build().context("invalid configuration")?;

    let client =
        LiveModelClient::from_config(&config).context("failed to initialise model provider")?;
    let state = AppState::new(Arc::new(client), config);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app: Router = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    if args.static_dir.is_dir() {
        let index = args.static_dir.join("index.html");
        app = app
            .nest_service("/static", ServeDir::new(&args.static_dir))
            .route_service("/", ServeFile::new(index));
        info!("serving static assets from {}", args.static_dir.display());
    } else {
        info!(
            "static dir {} not found; serving API only",
            args.static_dir.display()
        );
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("loanlens listening on http://{addr}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
