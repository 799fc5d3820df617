//! Project Estimator: retrieval-augmented task breakdowns for user stories
//!
//! ## Architecture
//!
//! - **Estimation**: embeds a feature description, recalls the nearest saved
//!   reference estimations and asks a generative model for a sub-task
//!   breakdown, tolerating the several JSON shapes models return
//! - **LLM**: `Embedder` / `Generator` traits with a Gemini REST client
//! - **Store**: PostgreSQL + pgvector queries for history, projects,
//!   stories, users and organizations
//! - **Auth**: bcrypt passwords, JWT session cookies, role extractors
//! - **API**: axum router exposing the JSON API

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod estimation;
pub mod llm;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use estimation::{EstimationPipeline, ReferenceStore};
pub use llm::{Embedder, GeminiClient, Generator};
