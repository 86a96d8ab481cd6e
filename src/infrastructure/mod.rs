//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Credential persistence
//! - Adapters: Connectors (console for local runs, in-memory for tests)

pub mod config;
pub mod storage;
pub mod adapters;
