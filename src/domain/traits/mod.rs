//! Domain traits - Abstractions for infrastructure implementations

pub mod command_source;
pub mod connection;
pub mod store;

pub use command_source::{CommandSource, StaticCommands};
pub use connection::{Connection, Connector, EventStream, LoginOptions, ThreadInfo};
pub use store::CredentialStore;
