//! HTTP API (axum)
//!
//! JSON endpoints for the estimation workflow and the account, project and
//! story administration behind it. All routes live under `/api`; every route
//! except health, login and logout requires a session token.

pub mod error;
pub mod estimate;
pub mod health;
pub mod history;
pub mod middleware;
pub mod organizations;
pub mod profile;
pub mod projects;
pub mod session;
pub mod stories;
pub mod suggest;
pub mod users;

pub use error::{ApiError, ApiJson, ApiPath, ApiQuery, ErrorResponse};

use crate::auth::{LoginThrottle, TokenSigner};
use crate::config::AppConfig;
use crate::estimation::EstimationPipeline;
use axum::http::{header, HeaderValue, Method};
use axum::middleware as axum_mw;
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Request bodies above this size are rejected with 413.
const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Shared state handed to every handler.
pub struct AppState {
    pub db: PgPool,
    pub pipeline: EstimationPipeline,
    pub signer: TokenSigner,
    pub throttle: Arc<LoginThrottle>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: PgPool, pipeline: EstimationPipeline, config: AppConfig) -> Self {
        Self {
            db,
            pipeline,
            signer: TokenSigner::new(&config.auth.jwt_secret, config.auth.token_ttl_days),
            throttle: Arc::new(LoginThrottle::new(
                config.auth.max_login_failures,
                Duration::from_secs(config.auth.lockout_window_secs),
            )),
            config,
        }
    }

    /// Language used for generated text.
    pub fn output_language(&self) -> &str {
        &self.config.estimation.output_language
    }
}

/// Same-origin unless origins are configured; configured origins may send
/// the session cookie.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if allowed.is_empty() {
        base
    } else {
        tracing::info!(origins = ?origins, "CORS: allowing configured origins");
        base.allow_origin(allowed).allow_credentials(true)
    }
}

/// Build the complete API router
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.server.cors_origins);
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    let api = Router::new()
        .route("/health", get(health::get_health))
        // Session
        .route("/auth/login", post(session::login))
        .route("/auth/logout", post(session::logout))
        .route("/auth/me", get(session::me))
        .route("/profile/password", put(profile::change_password))
        .route("/account/profile", put(profile::change_password))
        // Administration
        .route(
            "/admin/organizations",
            get(organizations::list_organizations).post(organizations::create_organization),
        )
        .route(
            "/admin/organizations/:id",
            get(organizations::get_organization)
                .put(organizations::update_organization)
                .delete(organizations::delete_organization),
        )
        .route("/admin/users", get(users::list_users).post(users::create_user))
        .route("/admin/users/:id", put(users::update_user).delete(users::delete_user))
        // Projects and stories
        .route("/projects", get(projects::list_projects).post(projects::create_project))
        .route(
            "/projects/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/:id/dashboard", get(projects::get_dashboard))
        .route("/user-stories", get(stories::list_stories).post(stories::create_story))
        .route("/user-stories/:id", put(stories::update_story).delete(stories::delete_story))
        // Estimation history
        .route("/history", get(history::list_history).post(history::save_history))
        .route("/history/find-similar", post(history::find_similar_projects))
        .route(
            "/history/:id",
            get(history::get_history)
                .put(history::update_history)
                .delete(history::delete_history),
        )
        .route("/find-similar", post(history::find_similar_tasks))
        // Generation
        .route("/estimate", post(estimate::estimate))
        .route("/estimate/with-references", post(estimate::estimate_with_references))
        .route("/suggest-story", post(suggest::suggest_story))
        .route("/generate-stories", post(suggest::generate_stories))
        .route("/suggest-features", post(suggest::suggest_features));

    Router::new()
        .nest("/api", api)
        .layer(axum_mw::from_fn(middleware::no_store))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
