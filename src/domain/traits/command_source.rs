use crate::application::errors::CommandError;
use crate::domain::entities::Command;

/// Where command definitions come from.
///
/// The outer `Err` means the whole source is unusable. Each inner entry is
/// one definition; a failed entry is skipped without affecting the others.
pub trait CommandSource: Send + Sync {
    fn definitions(&self) -> Result<Vec<Result<Command, CommandError>>, CommandError>;
}

/// A fixed list of command constructors, re-invoked on every reload
pub struct StaticCommands {
    builders: Vec<fn() -> Command>,
}

impl StaticCommands {
    pub fn new(builders: Vec<fn() -> Command>) -> Self {
        Self { builders }
    }
}

impl CommandSource for StaticCommands {
    fn definitions(&self) -> Result<Vec<Result<Command, CommandError>>, CommandError> {
        Ok(self.builders.iter().map(|build| Ok(build())).collect())
    }
}
