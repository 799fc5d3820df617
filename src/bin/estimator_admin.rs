//! Operator commands for the estimation service database
//!
//! ```bash
//! estimator-admin seed-superadmin --email root@example.com --password '...'
//! estimator-admin hash-password '...'
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use project_estimator::auth::password::hash_password;
use project_estimator::config::AppConfig;
use project_estimator::{db, store};
use tracing::info;

/// Shortest password the admin tool accepts.
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "estimator-admin", about = "Project Estimator administration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the superadmin account, or reset its password and role
    SeedSuperadmin {
        #[arg(long, env = "SUPERADMIN_EMAIL")]
        email: String,
        #[arg(long, env = "SUPERADMIN_PASSWORD", hide_env_values = true)]
        password: String,
        /// PostgreSQL connection URL
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },
    /// Print a bcrypt hash for a password
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::SeedSuperadmin {
            email,
            password,
            database_url,
        } => seed_superadmin(&email, &password, database_url).await,
        Command::HashPassword { password } => {
            check_password(&password)?;
            println!("{}", hash_password(&password).await?);
            Ok(())
        }
    }
}

fn check_password(password: &str) -> anyhow::Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {MIN_PASSWORD_LEN} characters");
    }
    Ok(())
}

async fn seed_superadmin(email: &str, password: &str, database_url: Option<String>) -> anyhow::Result<()> {
    if !email.contains('@') {
        bail!("'{email}' is not an email address");
    }
    check_password(password)?;

    let mut config = AppConfig::load();
    config.apply_env();
    if let Some(url) = database_url {
        config.database.url = url;
    }
    if config.database.url.is_empty() {
        bail!("DATABASE_URL must be set via --database-url or DATABASE_URL env var");
    }

    let pool = db::create_pool(&config.database)
        .await
        .context("connecting to PostgreSQL")?;
    db::run_migrations(&pool).await?;

    let hash = hash_password(password).await?;
    let user = store::users::upsert_superadmin(&pool, email, &hash).await?;
    info!(id = user.id, email = %user.email, "Superadmin ready");
    Ok(())
}
