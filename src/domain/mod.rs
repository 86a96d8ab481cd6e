//! Domain layer - Core business objects and abstractions
//!
//! This layer contains:
//! - Entities: Commands, inbound events, credentials
//! - Traits: Abstractions for infrastructure (Connector, Connection,
//!   CredentialStore, CommandSource)

pub mod entities;
pub mod traits;
