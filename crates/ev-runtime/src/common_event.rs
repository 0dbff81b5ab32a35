use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use ev_core::{Command, CommonEventDocument, InterpreterContext, Value};

use crate::engine::{Interpreter, SharedInterpreter, SharedSettings};
use crate::environment::Environment;

type FinishListener = (u64, Box<dyn FnOnce()>);

/// A reusable command list invoked like a subroutine. Owns one interpreter,
/// created on first call and reused afterwards.
pub struct CommonEvent {
    id: String,
    name: String,
    commands: Rc<[Command]>,
    interpreter: RefCell<Option<SharedInterpreter>>,
    finish_listeners: Rc<RefCell<Vec<FinishListener>>>,
}

impl CommonEvent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, commands: Rc<[Command]>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            commands,
            interpreter: RefCell::new(None),
            finish_listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &Rc<[Command]> {
        &self.commands
    }

    pub fn interpreter(&self) -> Option<SharedInterpreter> {
        self.interpreter.borrow().clone()
    }

    /// Registers `callback` to run once, the next time the event finishes.
    pub fn once_finish(&self, owner: u64, callback: Box<dyn FnOnce()>) {
        self.finish_listeners.borrow_mut().push((owner, callback));
    }

    pub fn remove_finish_listeners(&self, owner: u64) {
        self.finish_listeners
            .borrow_mut()
            .retain(|(listener_owner, _)| *listener_owner != owner);
    }

    pub fn finish_listener_count(&self) -> usize {
        self.finish_listeners.borrow().len()
    }

    /// Prepares the event's interpreter for a call. Returns `None` while that
    /// interpreter is itself executing, i.e. for a call from inside the event.
    pub fn call(
        &self,
        env: &Rc<Environment>,
        parameters: Vec<Value>,
        settings: SharedSettings,
        context: InterpreterContext,
    ) -> Option<SharedInterpreter> {
        let mut slot = self.interpreter.borrow_mut();
        let interpreter = match slot.as_ref() {
            Some(existing) => Rc::clone(existing),
            None => {
                let mut interpreter = Interpreter::new(Rc::clone(env), context.clone());
                interpreter.set_commands(Some(Rc::clone(&self.commands)));
                let listeners = Rc::clone(&self.finish_listeners);
                interpreter.set_on_finish(Some(Box::new(move |_: &Interpreter| {
                    let drained = std::mem::take(&mut *listeners.borrow_mut());
                    for (_, callback) in drained {
                        callback();
                    }
                })));
                let shared = interpreter.into_shared();
                *slot = Some(Rc::clone(&shared));
                shared
            }
        };

        {
            let Ok(mut prepared) = interpreter.try_borrow_mut() else {
                return None;
            };
            prepared.set_parameters(parameters);
            prepared.set_settings(settings);
            prepared.set_context(context);
            prepared.set_repeat(false);
        }
        Some(interpreter)
    }

    fn dispose(&self) {
        self.interpreter.borrow_mut().take();
        self.finish_listeners.borrow_mut().clear();
    }
}

impl From<CommonEventDocument> for CommonEvent {
    fn from(document: CommonEventDocument) -> Self {
        Self::new(document.id, document.name, document.commands.into())
    }
}

impl std::fmt::Debug for CommonEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommonEvent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("commands", &self.commands.len())
            .field("finish_listeners", &self.finish_listener_count())
            .finish()
    }
}

/// All common events of a project plus the set activated in the current scene.
#[derive(Debug, Clone, Default)]
pub struct CommonEventRegistry {
    events: BTreeMap<String, Rc<CommonEvent>>,
    active: BTreeSet<String>,
}

impl CommonEventRegistry {
    pub fn new(events: impl IntoIterator<Item = CommonEvent>) -> Self {
        Self {
            events: events
                .into_iter()
                .map(|event| (event.id.clone(), Rc::new(event)))
                .collect(),
            active: BTreeSet::new(),
        }
    }

    /// Resolves by id first, then by name.
    pub fn get(&self, id_or_name: &str) -> Option<Rc<CommonEvent>> {
        self.events.get(id_or_name).cloned().or_else(|| {
            self.events
                .values()
                .find(|event| event.name == id_or_name)
                .cloned()
        })
    }

    /// Returns true when the event was not active yet.
    pub fn activate(&mut self, id: &str) -> bool {
        self.active.insert(id.to_string())
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    pub fn active_ids(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub fn dispose(&mut self) {
        for event in self.events.values() {
            event.dispose();
        }
        self.active.clear();
    }
}

#[cfg(test)]
mod common_event_tests {
    use std::cell::Cell;

    use ev_core::MessageSettings;

    use super::*;
    use crate::environment::EnvironmentOptions;

    fn registry() -> CommonEventRegistry {
        CommonEventRegistry::new([
            CommonEvent::new("ce-1", "Fade", Vec::new().into()),
            CommonEvent::new("ce-2", "Shake", Vec::new().into()),
        ])
    }

    #[test]
    fn lookup_falls_back_to_name() {
        let registry = registry();
        assert_eq!(registry.get("ce-2").map(|event| event.name().to_string()), Some("Shake".to_string()));
        assert_eq!(registry.get("Fade").map(|event| event.id().to_string()), Some("ce-1".to_string()));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn activation_is_idempotent() {
        let mut registry = registry();
        assert!(registry.activate("ce-1"));
        assert!(!registry.activate("ce-1"));
        assert_eq!(registry.active_ids().collect::<Vec<_>>(), vec!["ce-1"]);
        registry.dispose();
        assert!(!registry.is_active("ce-1"));
    }

    #[test]
    fn call_reuses_interpreter_and_rejects_reentry() {
        let env = Environment::new(EnvironmentOptions::default()).expect("environment");
        let event = CommonEvent::new("ce-1", "Fade", Vec::new().into());
        let settings = Rc::new(RefCell::new(MessageSettings::default()));
        let context = InterpreterContext::new("main", None);

        let first = event
            .call(&env, vec![Value::Number(1.0)], settings.clone(), context.clone())
            .expect("first call");
        let second = event
            .call(&env, Vec::new(), settings.clone(), context.clone())
            .expect("second call");
        assert!(Rc::ptr_eq(&first, &second));
        assert!(second.borrow().parameters().is_empty());
        assert!(Rc::ptr_eq(second.borrow().settings(), &settings));

        let _executing = first.borrow_mut();
        assert!(event.call(&env, Vec::new(), settings, context).is_none());
    }

    #[test]
    fn finish_listeners_fire_once() {
        let env = Environment::new(EnvironmentOptions::default()).expect("environment");
        let event = CommonEvent::new("ce-1", "Fade", Vec::new().into());
        let fired = Rc::new(Cell::new(0));
        for owner in [1, 2] {
            let fired = Rc::clone(&fired);
            event.once_finish(owner, Box::new(move || fired.set(fired.get() + 1)));
        }
        event.remove_finish_listeners(2);

        let interpreter = event
            .call(
                &env,
                Vec::new(),
                Rc::new(RefCell::new(MessageSettings::default())),
                InterpreterContext::new("main", None),
            )
            .expect("call");
        interpreter.borrow_mut().start();
        interpreter.borrow_mut().update();
        interpreter.borrow_mut().start();
        interpreter.borrow_mut().update();
        assert_eq!(fired.get(), 1);
        assert_eq!(event.finish_listener_count(), 0);
        event.dispose();
        assert!(event.interpreter().is_none());
    }
}
