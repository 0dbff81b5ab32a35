use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ev_core::{
    CallTarget, Command, InterpreterContext, MessageSettings, PreviewData, Value, WaitDescriptor,
    WaitKind,
};

use crate::environment::Environment;
use crate::registry::CommandHandler;

mod boundary;
mod callstack;
mod control_flow;
mod eval;
mod lifecycle;
mod preview;
mod rng;
mod snapshot;
mod step;
mod wait;

pub use boundary::PendingWait;
pub use preview::{PreviewInfo, PREVIEW_YIELD_INTERVAL};
pub use snapshot::BUNDLE_SCHEMA;

pub type SharedInterpreter = Rc<RefCell<Interpreter>>;
/// Message settings, shared by reference down a call chain.
pub type SharedSettings = Rc<RefCell<MessageSettings>>;
pub type FinishCallback = Box<dyn FnMut(&Interpreter)>;
pub type WaitCallback = Box<dyn FnOnce(&mut Interpreter)>;

/// Parent side of a delegation. The child's completion callback writes
/// `finished`; the parent applies it on its next look at the link.
#[derive(Default)]
pub(crate) struct SubInterpreterLink {
    pub(crate) child: Option<SharedInterpreter>,
    pub(crate) target: Option<CallTarget>,
    pub(crate) resume_waiting: bool,
    pub(crate) finished: Option<bool>,
}

/// Steps through one command list, pausing on waits and delegating to
/// sub-interpreters for common-event and scene calls.
pub struct Interpreter {
    id: u64,
    env: Rc<Environment>,
    commands: Option<Rc<[Command]>>,
    handlers: Vec<Option<CommandHandler>>,

    pointer: usize,
    indent: u32,
    conditions: BTreeMap<u32, bool>,
    loops: BTreeMap<u32, usize>,
    labels: BTreeMap<String, usize>,
    is_running: bool,
    is_waiting: bool,
    is_waiting_for_message: bool,
    wait_counter: u32,
    wait_callback: Option<WaitCallback>,
    waiting_for: BTreeMap<WaitKind, WaitDescriptor>,
    hold_pointer: bool,

    context: InterpreterContext,
    settings: SharedSettings,
    parameters: Vec<Value>,
    sub_link: Rc<RefCell<SubInterpreterLink>>,
    repeat: bool,
    on_finish: Option<FinishCallback>,

    preview: Option<PreviewData>,
    preview_info: Rc<RefCell<PreviewInfo>>,
    preview_listener: Option<u64>,
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("id", &self.id)
            .field("context", &self.context)
            .field("pointer", &self.pointer)
            .field("indent", &self.indent)
            .field("conditions", &self.conditions)
            .field("loops", &self.loops)
            .field("is_running", &self.is_running)
            .field("is_waiting", &self.is_waiting())
            .field("wait_counter", &self.wait_counter)
            .field("waiting_for", &self.waiting_for)
            .field("has_sub_interpreter", &self.sub_interpreter().is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.clear_preview();
    }
}


#[cfg(test)]
pub(crate) mod runtime_test_support {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use ev_core::{
        Command, CommandKind, Comparison, ConditionParams, InterpreterContext, LabelParams,
        ValueSource, VariableKind, VariableRef,
    };

    use super::Interpreter;
    use crate::common_event::{CommonEvent, CommonEventRegistry};
    use crate::documents::{MemoryDocumentStore, Scene};
    use crate::environment::{Environment, EnvironmentOptions};
    use crate::host::HeadlessHost;
    use crate::registry::CommandRegistry;
    use crate::variables::MemoryVariableStore;

    pub(crate) struct Harness {
        pub(crate) env: Rc<Environment>,
        pub(crate) host: Rc<RefCell<HeadlessHost>>,
        pub(crate) variables: Rc<RefCell<MemoryVariableStore>>,
        pub(crate) hits: Rc<RefCell<Vec<String>>>,
    }

    #[derive(Default)]
    pub(crate) struct HarnessOptions {
        pub(crate) scenes: Vec<Scene>,
        pub(crate) common_events: Vec<CommonEvent>,
        pub(crate) frame_rate: Option<u32>,
    }

    /// Environment with builtins plus `probe` (records its `text` param) and
    /// `sleep` (waits `frames` frames).
    pub(crate) fn harness(options: HarnessOptions) -> Harness {
        let host = Rc::new(RefCell::new(HeadlessHost::new()));
        let variables = Rc::new(RefCell::new(MemoryVariableStore::new()));
        let hits = Rc::new(RefCell::new(Vec::new()));

        let mut registry = CommandRegistry::with_builtins();
        let probe_hits = Rc::clone(&hits);
        registry.register("probe", move |_interpreter: &mut Interpreter, command: &Command| {
            if let CommandKind::Unknown { params, .. } = &command.kind {
                let text = params["text"].as_str().unwrap_or_default().to_string();
                probe_hits.borrow_mut().push(text);
            }
        });
        registry.register("sleep", |interpreter: &mut Interpreter, command: &Command| {
            if let CommandKind::Unknown { params, .. } = &command.kind {
                let frames = params["frames"].as_u64().unwrap_or(0) as u32;
                interpreter.wait(frames, None);
            }
        });

        let env = Environment::new(EnvironmentOptions {
            registry: Some(registry),
            variables: Some(variables.clone()),
            documents: Some(Rc::new(options.scenes.into_iter().collect::<MemoryDocumentStore>())),
            host: Some(host.clone()),
            common_events: Some(CommonEventRegistry::new(options.common_events)),
            frame_rate: options.frame_rate,
            ..EnvironmentOptions::default()
        })
        .expect("test environment should build");

        Harness {
            env,
            host,
            variables,
            hits,
        }
    }

    impl Harness {
        pub(crate) fn interpreter(&self, commands: Vec<Command>) -> Interpreter {
            let mut interpreter = Interpreter::new(
                Rc::clone(&self.env),
                InterpreterContext::new("main", None),
            );
            interpreter.set_commands(Some(commands.into()));
            interpreter
        }

        pub(crate) fn hits(&self) -> Vec<String> {
            self.hits.borrow().clone()
        }
    }

    pub(crate) fn counting_finish(interpreter: &mut Interpreter) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let observed = Rc::clone(&count);
        interpreter.set_on_finish(Some(Box::new(move |_: &Interpreter| {
            observed.set(observed.get() + 1)
        })));
        count
    }

    pub(crate) fn probe(indent: u32, text: &str) -> Command {
        Command::new(
            indent,
            CommandKind::Unknown {
                id: "probe".to_string(),
                params: serde_json::json!({ "text": text }),
            },
        )
    }

    pub(crate) fn sleep(indent: u32, frames: u32) -> Command {
        Command::new(
            indent,
            CommandKind::Unknown {
                id: "sleep".to_string(),
                params: serde_json::json!({ "frames": frames }),
            },
        )
    }

    pub(crate) fn label(indent: u32, name: &str) -> Command {
        Command::new(
            indent,
            CommandKind::Label(LabelParams {
                name: name.to_string(),
            }),
        )
    }

    pub(crate) fn number_condition(
        variable: VariableRef,
        comparison: Comparison,
        value: f64,
    ) -> ConditionParams {
        ConditionParams {
            kind: VariableKind::Number,
            left: ValueSource::variable(variable),
            comparison,
            right: ValueSource::number(value),
        }
    }

    pub(crate) fn tick(interpreter: &mut Interpreter, frames: usize) {
        for _ in 0..frames {
            interpreter.update();
        }
    }
}
