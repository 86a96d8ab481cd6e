//! Application services - Business logic orchestration

pub mod command_registry;
pub mod session_supervisor;
pub mod startup;

pub use command_registry::CommandRegistry;
pub use session_supervisor::{SessionState, SessionStatus, SessionSupervisor, SupervisorSettings};
pub use startup::{run_with_retries, RetryPolicy};
