use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ev_core::EngineError;
use serde::{Deserialize, Serialize};

use crate::common_event::CommonEventRegistry;
use crate::documents::{DocumentStore, MemoryDocumentStore};
use crate::events::EventBus;
use crate::host::{HeadlessHost, Host};
use crate::registry::CommandRegistry;
use crate::script::{RhaiScriptEvaluator, ScriptEvaluator};
use crate::variables::{MemoryVariableStore, VariableStore};

pub const DEFAULT_FRAME_RATE: u32 = 60;
pub const DEFAULT_RANDOM_SEED: u32 = 1;

/// Global fast-forward state shared by every interpreter of an environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempSettings {
    pub skip: bool,
    /// Frame cap applied to durations while `skip` is set; `0` collapses them.
    pub skip_time: u32,
}

#[derive(Clone, Default)]
pub struct EnvironmentOptions {
    pub registry: Option<CommandRegistry>,
    pub variables: Option<Rc<RefCell<dyn VariableStore>>>,
    pub scripts: Option<Rc<dyn ScriptEvaluator>>,
    pub documents: Option<Rc<dyn DocumentStore>>,
    pub host: Option<Rc<RefCell<dyn Host>>>,
    pub common_events: Option<CommonEventRegistry>,
    pub frame_rate: Option<u32>,
    pub temp_settings: Option<TempSettings>,
    pub random_seed: Option<u32>,
}

/// Collaborators shared by an interpreter and every sub-interpreter it spawns.
pub struct Environment {
    registry: CommandRegistry,
    variables: Rc<RefCell<dyn VariableStore>>,
    scripts: Rc<dyn ScriptEvaluator>,
    documents: Rc<dyn DocumentStore>,
    host: Rc<RefCell<dyn Host>>,
    common_events: RefCell<CommonEventRegistry>,
    events: EventBus,
    temp_settings: Cell<TempSettings>,
    frame_rate: u32,
    random_state: Cell<u32>,
    next_interpreter_id: Cell<u64>,
}

impl Environment {
    pub fn new(options: EnvironmentOptions) -> Result<Rc<Self>, EngineError> {
        let frame_rate = options.frame_rate.unwrap_or(DEFAULT_FRAME_RATE);
        if frame_rate == 0 {
            return Err(EngineError::new(
                "ENV_FRAME_RATE",
                "Frame rate must be greater than zero.",
            ));
        }

        let variables = options
            .variables
            .unwrap_or_else(|| Rc::new(RefCell::new(MemoryVariableStore::new())));
        let scripts = options.scripts.unwrap_or_else(|| {
            Rc::new(RhaiScriptEvaluator::with_variables(Rc::clone(&variables)))
        });
        let documents = options
            .documents
            .unwrap_or_else(|| Rc::new(MemoryDocumentStore::new()));
        let host = options
            .host
            .unwrap_or_else(|| Rc::new(RefCell::new(HeadlessHost::new())));

        Ok(Rc::new(Self {
            registry: options
                .registry
                .unwrap_or_else(CommandRegistry::with_builtins),
            variables,
            scripts,
            documents,
            host,
            common_events: RefCell::new(options.common_events.unwrap_or_default()),
            events: EventBus::new(),
            temp_settings: Cell::new(options.temp_settings.unwrap_or_default()),
            frame_rate,
            random_state: Cell::new(options.random_seed.unwrap_or(DEFAULT_RANDOM_SEED)),
            next_interpreter_id: Cell::new(0),
        }))
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn variables(&self) -> &Rc<RefCell<dyn VariableStore>> {
        &self.variables
    }

    pub fn scripts(&self) -> &Rc<dyn ScriptEvaluator> {
        &self.scripts
    }

    pub fn documents(&self) -> &Rc<dyn DocumentStore> {
        &self.documents
    }

    pub fn host(&self) -> &Rc<RefCell<dyn Host>> {
        &self.host
    }

    pub fn common_events(&self) -> &RefCell<CommonEventRegistry> {
        &self.common_events
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn temp_settings(&self) -> TempSettings {
        self.temp_settings.get()
    }

    pub fn set_temp_settings(&self, settings: TempSettings) {
        self.temp_settings.set(settings);
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn random_state(&self) -> u32 {
        self.random_state.get()
    }

    pub fn set_random_state(&self, state: u32) {
        self.random_state.set(state);
    }

    pub(crate) fn allocate_interpreter_id(&self) -> u64 {
        let id = self.next_interpreter_id.get() + 1;
        self.next_interpreter_id.set(id);
        id
    }

    /// Drops the interpreters owned by common events. Those interpreters hold
    /// the environment, so an environment that ran a common event is only
    /// freed after this call.
    pub fn dispose(&self) {
        self.common_events.borrow_mut().dispose();
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("registry", &self.registry)
            .field("common_events", &self.common_events)
            .field("temp_settings", &self.temp_settings.get())
            .field("frame_rate", &self.frame_rate)
            .finish_non_exhaustive()
    }
}
