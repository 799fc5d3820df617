//! Service Configuration
//!
//! ## Loading Order
//!
//! 1. `ESTIMATOR_CONFIG` environment variable (path to TOML file)
//! 2. `estimator.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Secrets (`DATABASE_URL`, `JWT_SECRET`, `GEMINI_API_KEY`) are read from the
//! environment afterwards and never need to be written to the file.

mod app_config;
pub mod validation;

pub use app_config::*;
