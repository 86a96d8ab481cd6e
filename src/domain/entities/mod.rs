//! Domain entities - Core business objects

pub mod command;
pub mod credentials;
pub mod event;

pub use command::{Command, CommandContext, CommandHandler};
pub use credentials::Credentials;
pub use event::{InboundEvent, MessageEvent};
