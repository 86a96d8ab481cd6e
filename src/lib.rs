//! Command-dispatch bot for a social messaging platform.
//!
//! A [`SessionSupervisor`] keeps one authenticated [`Connection`] alive,
//! an [`EventDispatcher`] classifies the events it yields, and a
//! [`MessageRouter`] turns prefixed text into command runs looked up in a
//! reloadable [`CommandRegistry`].

pub mod application;
pub mod commands;
pub mod domain;
pub mod infrastructure;

pub use application::errors::{CommandError, SessionError};
pub use application::messaging::{EventDispatcher, MessageRouter};
pub use application::services::{CommandRegistry, SessionSupervisor};
pub use domain::traits::{Connection, Connector};
