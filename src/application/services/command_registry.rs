use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::application::errors::CommandError;
use crate::domain::entities::Command;
use crate::domain::traits::CommandSource;

type CommandMap = HashMap<String, Arc<Command>>;

/// Reloadable registry of commands keyed by lowercase name.
///
/// A reload builds a complete new map and swaps it in, so lookups see either
/// the old set or the new one, never a mix.
pub struct CommandRegistry {
    source: Arc<dyn CommandSource>,
    commands: RwLock<Arc<CommandMap>>,
}

impl CommandRegistry {
    pub fn new(source: Arc<dyn CommandSource>) -> Self {
        Self {
            source,
            commands: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Rebuild the registry from its source, returning how many commands loaded
    pub fn load(&self) -> Result<usize, CommandError> {
        let definitions = self.source.definitions().map_err(|e| {
            warn!("Failed to read command source: {}", e);
            e
        })?;

        let mut commands = CommandMap::new();
        for definition in definitions {
            let command = match definition.and_then(|c| c.validate().map(|_| c)) {
                Ok(command) => command,
                Err(e) => {
                    warn!("Skipping command: {}", e);
                    continue;
                }
            };

            let key = command.key();
            if commands.contains_key(&key) {
                warn!("Command \"{}\" defined more than once, keeping the last one", key);
            }
            info!("Loaded command: {}", command.name);
            commands.insert(key, Arc::new(command));
        }

        let count = commands.len();
        if count == 0 {
            warn!("No commands found in command source");
        } else {
            let mut names: Vec<&str> = commands.keys().map(String::as_str).collect();
            names.sort_unstable();
            info!("Loaded {} commands: {}", count, names.join(", "));
        }

        *self.commands.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(commands);
        Ok(count)
    }

    /// Case-insensitive lookup
    pub fn resolve(&self, name: &str) -> Option<Arc<Command>> {
        self.snapshot().get(&name.trim().to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted command names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    /// All commands, sorted by name
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<Arc<Command>> = self.snapshot().values().cloned().collect();
        commands.sort_by(|a, b| a.key().cmp(&b.key()));
        commands
    }

    fn snapshot(&self) -> Arc<CommandMap> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CommandContext, CommandHandler};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn execute(&self, _ctx: &CommandContext, _args: &[String]) -> Result<(), CommandError> {
            Ok(())
        }
    }

    /// Source whose contents can be swapped between reloads
    struct ScriptedSource {
        entries: Mutex<Vec<(&'static str, bool)>>,
        broken: bool,
    }

    impl ScriptedSource {
        fn new(entries: Vec<(&'static str, bool)>) -> Self {
            Self {
                entries: Mutex::new(entries),
                broken: false,
            }
        }
    }

    impl CommandSource for ScriptedSource {
        fn definitions(&self) -> Result<Vec<Result<Command, CommandError>>, CommandError> {
            if self.broken {
                return Err(CommandError::InvalidDefinition("source unavailable".into()));
            }
            let entries = self.entries.lock().unwrap();
            Ok(entries
                .iter()
                .map(|(name, with_handler)| {
                    let cmd = Command::new(*name).with_description(format!("{} command", name));
                    Ok(if *with_handler { cmd.with_handler(Noop) } else { cmd })
                })
                .collect())
        }
    }

    #[test]
    fn invalid_definitions_are_skipped() {
        let source = ScriptedSource::new(vec![("echo", true), ("", true), ("broken", false), ("help", true)]);
        let registry = CommandRegistry::new(Arc::new(source));

        assert_eq!(registry.load().unwrap(), 2);
        assert_eq!(registry.names(), vec!["echo", "help"]);
        assert!(registry.resolve("broken").is_none());
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let registry = CommandRegistry::new(Arc::new(ScriptedSource::new(vec![("Echo", true)])));
        registry.load().unwrap();

        let a = registry.resolve("echo").unwrap();
        let b = registry.resolve("ECHO").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn last_definition_wins_on_collision() {
        let registry = CommandRegistry::new(Arc::new(ScriptedSource::new(vec![
            ("ping", true),
            ("PING", true),
        ])));
        assert_eq!(registry.load().unwrap(), 1);
        assert_eq!(registry.resolve("ping").unwrap().name, "PING");
    }

    #[test]
    fn reload_is_idempotent_and_replaces_wholesale() {
        let source = Arc::new(ScriptedSource::new(vec![("echo", true), ("help", true)]));
        let registry = CommandRegistry::new(source.clone());

        registry.load().unwrap();
        let first = registry.names();
        registry.load().unwrap();
        assert_eq!(registry.names(), first);

        *source.entries.lock().unwrap() = vec![("weather", true)];
        registry.load().unwrap();
        assert_eq!(registry.names(), vec!["weather"]);
    }

    #[test]
    fn empty_source_leaves_registry_empty() {
        let registry = CommandRegistry::new(Arc::new(ScriptedSource::new(vec![])));
        assert_eq!(registry.load().unwrap(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn broken_source_is_reported() {
        let mut source = ScriptedSource::new(vec![("echo", true)]);
        source.broken = true;
        let registry = CommandRegistry::new(Arc::new(source));
        assert!(registry.load().is_err());
        assert!(registry.is_empty());
    }
}
