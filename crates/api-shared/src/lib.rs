//! # API Shared
//!
//! Shared utilities and definitions for the telecare APIs.
//!
//! Contains:
//! - Wire types (`wire` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Session token extraction from request headers (`auth` module)
//!
//! Used by `api-rest` and the root binary.

pub mod auth;
pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
