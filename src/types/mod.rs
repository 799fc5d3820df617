//! Shared data structures for the estimation service
//!
//! - `estimation`: canonical sub-tasks and stored estimation records
//! - `account`: roles, users and organizations
//! - `project`: projects and user stories

mod account;
mod estimation;
mod project;

pub use account::*;
pub use estimation::*;
pub use project::*;
