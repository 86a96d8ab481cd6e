//! Message handling - Event-driven message processing

pub mod dispatcher;
pub mod handlers;
pub mod pacing;
pub mod parser;
pub mod router;

pub use dispatcher::{EventDispatcher, StateSaver};
pub use handlers::{PresenceHandler, ReactionHandler};
pub use pacing::Pacing;
pub use parser::{MessageParser, ParsedCommand, PrefixPolicy};
pub use router::{MessageRouter, RouteOutcome};
