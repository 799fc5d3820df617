//! Project Estimator server
//!
//! ## Environment variables
//!
//! | Variable             | Required | Description                                  |
//! |----------------------|----------|----------------------------------------------|
//! | `DATABASE_URL`       | Yes      | PostgreSQL connection string (pgvector)      |
//! | `JWT_SECRET`         | Yes      | HS256 signing secret for session tokens      |
//! | `GEMINI_API_KEY`     | Yes      | Key for the embedding and generation models  |
//! | `ESTIMATOR_CONFIG`   | No       | Path to a TOML config file                   |
//! | `ESTIMATOR_ADDR`     | No       | Bind address (default `0.0.0.0:3000`)        |
//! | `CORS_ORIGINS`       | No       | Comma-separated allowed origins              |
//! | `ESTIMATOR_LOG_JSON` | No       | Emit JSON log lines                          |

use clap::Parser;
use project_estimator::api::{self, AppState};
use project_estimator::auth::throttle::spawn_throttle_cleanup;
use project_estimator::config::AppConfig;
use project_estimator::estimation::prompt::default_system_prompt;
use project_estimator::estimation::EstimationPipeline;
use project_estimator::llm::GeminiClient;
use project_estimator::store::PgReferenceStore;
use project_estimator::db;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "project-estimator", about = "AI-assisted project estimation service")]
struct CliArgs {
    /// TOML config file (overrides ESTIMATOR_CONFIG and ./estimator.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Bind address, e.g. 0.0.0.0:3000
    #[arg(long)]
    addr: Option<String>,

    /// Emit JSON log lines
    #[arg(long, env = "ESTIMATOR_LOG_JSON")]
    log_json: bool,

    /// Skip running migrations at startup
    #[arg(long)]
    skip_migrations: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,project_estimator=debug"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load(),
    };
    config.apply_env();
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    config.validate()?;
    config.require_secrets()?;

    info!(
        addr = %config.server.addr,
        generation_model = %config.llm.generation_model,
        embedding_model = %config.llm.embedding_model,
        top_k = config.estimation.top_k,
        "Starting Project Estimator"
    );

    // ── Database ──────────────────────────────────────────────────────────────
    let pool = db::create_pool(&config.database).await?;
    if config.database.run_migrations && !args.skip_migrations {
        db::run_migrations(&pool).await?;
    }

    // ── Estimation pipeline ───────────────────────────────────────────────────
    let gemini = Arc::new(GeminiClient::new(config.llm.gemini())?);
    let references = Arc::new(PgReferenceStore::new(pool.clone()));
    let system_prompt = config
        .estimation
        .system_prompt
        .clone()
        .unwrap_or_else(|| default_system_prompt(&config.estimation.output_language));
    let pipeline = EstimationPipeline::new(gemini.clone(), gemini, references)
        .with_top_k(config.estimation.top_k)
        .with_default_prompt(system_prompt);

    // ── State and background tasks ────────────────────────────────────────────
    let addr = config.server.addr.clone();
    let state = Arc::new(AppState::new(pool, pipeline, config));
    spawn_throttle_cleanup(Arc::clone(&state.throttle));

    // ── HTTP Server ───────────────────────────────────────────────────────────
    let app = api::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Project Estimator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Project Estimator shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
