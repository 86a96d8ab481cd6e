//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: Command registry, session supervision, startup retries
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing, routing, event dispatching

pub mod errors;
pub mod services;
pub mod messaging;
