use std::collections::HashMap;
use std::rc::Rc;

use ev_core::Command;

use crate::engine::Interpreter;
use crate::handlers;

/// A command body. Receives the interpreter that is stepping and the command
/// at its pointer.
pub type CommandHandler = Rc<dyn Fn(&mut Interpreter, &Command)>;

/// Maps command type ids to handlers.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        handlers::register_builtins(&mut registry);
        registry
    }

    /// Installs `handler` for `id`, replacing any earlier registration.
    pub fn register<F>(&mut self, id: impl Into<String>, handler: F)
    where
        F: Fn(&mut Interpreter, &Command) + 'static,
    {
        self.handlers.insert(id.into(), Rc::new(handler));
    }

    pub fn resolve(&self, id: &str) -> Option<CommandHandler> {
        self.handlers.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids = self.handlers.keys().collect::<Vec<_>>();
        ids.sort();
        f.debug_struct("CommandRegistry")
            .field("ids", &ids)
            .finish()
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use ev_core::command_ids;

    #[test]
    fn builtins_cover_every_modeled_command() {
        let registry = CommandRegistry::with_builtins();
        for id in [
            command_ids::COMMENT,
            command_ids::LABEL,
            command_ids::JUMP_TO_LABEL,
            command_ids::LOOP,
            command_ids::BREAK_LOOP,
            command_ids::CONTINUE_LOOP,
            command_ids::CONDITION,
            command_ids::CONDITION_ELSE,
            command_ids::CONDITION_ELSE_IF,
            command_ids::WAIT,
            command_ids::CHANGE_VARIABLE,
            command_ids::SCRIPT,
            command_ids::SHOW_MESSAGE,
            command_ids::MESSAGE_SETTINGS,
            command_ids::INPUT_NUMBER,
            command_ids::INPUT_TEXT,
            command_ids::SHOW_CHOICES,
            command_ids::OBJECT_EFFECT,
            command_ids::CALL_COMMON_EVENT,
            command_ids::CALL_SCENE,
            command_ids::EXIT_EVENT,
        ] {
            assert!(registry.contains(id), "missing builtin `{id}`");
        }
        assert!(registry.resolve("gs.ShakeScreen").is_none());
    }

    #[test]
    fn later_registration_replaces_handler() {
        let mut registry = CommandRegistry::new();
        registry.register("custom", |interpreter: &mut Interpreter, _command: &Command| {
            interpreter.wait(1, None)
        });
        registry.register("custom", |_interpreter: &mut Interpreter, _command: &Command| {});
        assert_eq!(registry.len(), 1);
        assert!(format!("{registry:?}").contains("custom"));
    }
}
