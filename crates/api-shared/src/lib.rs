//! # API Shared
//!
//! Shared utilities and definitions for the SIMRS APIs.
//!
//! Contains:
//! - JSON request/response bodies (`wire` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Bearer-token parsing
//!
//! Used by `api-rest` and the workspace binaries.

pub mod auth;
pub mod health;
pub mod wire;

/// Banner served at `/` and in health responses.
pub const BANNER: &str = "SIMRS API is running";

pub use auth::bearer_token;
pub use health::HealthService;
pub use wire::*;
