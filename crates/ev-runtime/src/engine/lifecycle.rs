use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ev_core::{
    Command, InterpreterContext, MessageSettings, PreviewData, Value, WaitDescriptor, WaitKind,
};

use super::{
    FinishCallback, Interpreter, PreviewInfo, SharedInterpreter, SharedSettings,
    SubInterpreterLink,
};
use crate::environment::Environment;

impl Interpreter {
    pub fn new(env: Rc<Environment>, context: InterpreterContext) -> Self {
        let id = env.allocate_interpreter_id();
        Self {
            id,
            env,
            commands: None,
            handlers: Vec::new(),
            pointer: 0,
            indent: 0,
            conditions: BTreeMap::new(),
            loops: BTreeMap::new(),
            labels: BTreeMap::new(),
            is_running: false,
            is_waiting: false,
            is_waiting_for_message: false,
            wait_counter: 0,
            wait_callback: None,
            waiting_for: BTreeMap::new(),
            hold_pointer: false,
            context,
            settings: Rc::new(RefCell::new(MessageSettings::default())),
            parameters: Vec::new(),
            sub_link: Rc::new(RefCell::new(SubInterpreterLink::default())),
            repeat: false,
            on_finish: None,
            preview: None,
            preview_info: Rc::new(RefCell::new(PreviewInfo::default())),
            preview_listener: None,
        }
    }

    pub fn into_shared(self) -> SharedInterpreter {
        Rc::new(RefCell::new(self))
    }

    /// Resets pointer, indent, conditions and loops, and starts running.
    pub fn start(&mut self) {
        self.conditions.clear();
        self.loops.clear();
        self.indent = 0;
        self.pointer = 0;
        self.is_running = true;
        self.is_waiting = false;
        self.wait_counter = 0;
        self.wait_callback = None;
        self.hold_pointer = false;
    }

    /// Halts stepping; all state is kept for `resume`.
    pub fn stop(&mut self) {
        self.is_running = false;
    }

    pub fn resume(&mut self) {
        self.is_running = true;
    }

    /// Returns to the freshly constructed state. Commands, context, settings
    /// and callbacks are kept.
    pub fn reset(&mut self) {
        self.start();
        self.is_running = false;
        self.labels.clear();
        self.waiting_for.clear();
        self.is_waiting_for_message = false;
        *self.sub_link.borrow_mut() = SubInterpreterLink::default();
        *self.preview_info.borrow_mut() = PreviewInfo::default();
    }

    /// Replaces the command list. Bound handlers are dropped with it.
    pub fn set_commands(&mut self, commands: Option<Rc<[Command]>>) {
        self.handlers = vec![None; commands.as_ref().map_or(0, |commands| commands.len())];
        self.commands = commands;
        if self.pointer > self.len() {
            self.pointer = self.len();
        }
    }

    pub(super) fn finish(&mut self) {
        self.is_running = false;
        log::debug!(
            "interpreter {} finished in context `{}`",
            self.id,
            self.context.id
        );
        if let Some(mut callback) = self.on_finish.take() {
            callback(self);
            if self.on_finish.is_none() {
                self.on_finish = Some(callback);
            }
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn env(&self) -> &Rc<Environment> {
        &self.env
    }

    pub fn commands(&self) -> Option<&Rc<[Command]>> {
        self.commands.as_ref()
    }

    pub fn command_at(&self, index: usize) -> Option<&Command> {
        self.commands.as_ref().and_then(|commands| commands.get(index))
    }

    pub fn len(&self) -> usize {
        self.commands.as_ref().map_or(0, |commands| commands.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Moves the pointer, clamped to the command list.
    pub fn set_pointer(&mut self, pointer: usize) {
        self.pointer = pointer.min(self.len());
    }

    pub fn indent(&self) -> u32 {
        self.indent
    }

    pub fn set_indent(&mut self, indent: u32) {
        self.indent = indent;
    }

    pub fn conditions(&self) -> &BTreeMap<u32, bool> {
        &self.conditions
    }

    pub fn loops(&self) -> &BTreeMap<u32, usize> {
        &self.loops
    }

    pub fn labels(&self) -> &BTreeMap<String, usize> {
        &self.labels
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Includes a waiting flag already delivered by a finished sub-interpreter
    /// but not yet applied by `update`.
    pub fn is_waiting(&self) -> bool {
        self.sub_link.borrow().finished.unwrap_or(self.is_waiting)
    }

    pub fn set_waiting(&mut self, waiting: bool) {
        self.is_waiting = waiting;
    }

    pub fn is_waiting_for_message(&self) -> bool {
        self.is_waiting_for_message
    }

    pub fn wait_counter(&self) -> u32 {
        self.wait_counter
    }

    pub fn waiting_for(&self) -> &BTreeMap<WaitKind, WaitDescriptor> {
        &self.waiting_for
    }

    /// True once the pointer ran off the end and the interpreter stopped.
    pub fn is_finished(&self) -> bool {
        !self.is_running && !self.is_waiting() && self.pointer >= self.len()
    }

    pub fn context(&self) -> &InterpreterContext {
        &self.context
    }

    pub fn set_context(&mut self, context: InterpreterContext) {
        self.context = context;
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: SharedSettings) {
        self.settings = settings;
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Vec<Value>) {
        self.parameters = parameters;
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    pub fn set_on_finish(&mut self, callback: Option<FinishCallback>) {
        self.on_finish = callback;
    }

    pub fn preview(&self) -> Option<&PreviewData> {
        self.preview.as_ref()
    }

    pub fn preview_info(&self) -> PreviewInfo {
        *self.preview_info.borrow()
    }
}
