use ev_core::{InterpreterContext, MessageSettings, WaitDescriptor, WaitKind};

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRequest {
    pub context: InterpreterContext,
    pub character: Option<String>,
    pub text: String,
    pub settings: MessageSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputRequest {
    Number { digits: u32 },
    Text { letters: usize },
    Choice {
        prompt: Option<String>,
        choices: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationRequest {
    pub target: String,
    pub effect: String,
    pub easing: Option<String>,
    pub frames: u32,
}

/// Rendering, audio and UI side of the engine, as seen by interpreters.
///
/// Calls arrive synchronously from inside `Interpreter::update`; implementations
/// must not call back into the interpreter that issued them.
pub trait Host {
    /// True while another context owns the message box.
    fn is_message_busy(&self, context: &InterpreterContext) -> bool;
    fn show_message(&mut self, request: MessageRequest);
    fn close_message(&mut self, context: &InterpreterContext);
    fn request_input(&mut self, context: &InterpreterContext, request: InputRequest);
    fn animate(&mut self, request: AnimationRequest);
    /// Stops the render loop after `seconds`; returns a handle for `cancel_pause`.
    fn schedule_pause(&mut self, seconds: f32) -> u64;
    fn cancel_pause(&mut self, handle: u64);
    fn resume_rendering(&mut self);
    fn reattach_wait(&mut self, _kind: WaitKind, _descriptor: &WaitDescriptor) {}
}

/// Host that renders nothing and records what it was asked to do.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeadlessHost {
    pub messages: Vec<MessageRequest>,
    pub inputs: Vec<InputRequest>,
    pub animations: Vec<AnimationRequest>,
    pub reattached: Vec<(WaitKind, WaitDescriptor)>,
    pub message_owner: Option<String>,
    pub pending_pause: Option<(u64, f32)>,
    pub stopped: bool,
    next_pause_handle: u64,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_message(&self) -> Option<&MessageRequest> {
        self.messages.last()
    }

    /// Fires a scheduled pause as if its timer elapsed.
    pub fn elapse_pause(&mut self) {
        if self.pending_pause.take().is_some() {
            self.stopped = true;
        }
    }
}

impl Host for HeadlessHost {
    fn is_message_busy(&self, context: &InterpreterContext) -> bool {
        self.message_owner
            .as_deref()
            .is_some_and(|owner| owner != context.id)
    }

    fn show_message(&mut self, request: MessageRequest) {
        self.message_owner = Some(request.context.id.clone());
        self.messages.push(request);
    }

    fn close_message(&mut self, context: &InterpreterContext) {
        if self.message_owner.as_deref() == Some(context.id.as_str()) {
            self.message_owner = None;
        }
    }

    fn request_input(&mut self, _context: &InterpreterContext, request: InputRequest) {
        self.inputs.push(request);
    }

    fn animate(&mut self, request: AnimationRequest) {
        self.animations.push(request);
    }

    fn schedule_pause(&mut self, seconds: f32) -> u64 {
        self.next_pause_handle += 1;
        self.pending_pause = Some((self.next_pause_handle, seconds));
        self.next_pause_handle
    }

    fn cancel_pause(&mut self, handle: u64) {
        if matches!(self.pending_pause, Some((pending, _)) if pending == handle) {
            self.pending_pause = None;
        }
    }

    fn resume_rendering(&mut self) {
        self.stopped = false;
    }

    fn reattach_wait(&mut self, kind: WaitKind, descriptor: &WaitDescriptor) {
        self.reattached.push((kind, descriptor.clone()));
    }
}
