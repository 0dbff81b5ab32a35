use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ev_core::{EngineError, InterpreterBundle, WaitKind};
use ev_runtime::{
    HeadlessHost, Host, InputRequest, Interpreter, MemoryVariableStore, MessageRequest,
    PendingWait, TempSettings, VariableStore,
};

use crate::{
    create_interpreter, resume_interpreter, CreateInterpreterOptions, ResumeInterpreterOptions,
};

#[derive(Debug, Clone, Default)]
pub struct HeadlessSessionOptions {
    pub documents_json: BTreeMap<String, String>,
    pub entry_scene: Option<String>,
    /// Resumes from this bundle instead of starting the entry scene.
    pub bundle: Option<InterpreterBundle>,
    pub variables: Option<MemoryVariableStore>,
    pub random_state: Option<u32>,
    pub temp_settings: Option<TempSettings>,
    pub frame_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryStop {
    /// The player must choose or type before anything else happens.
    Input {
        pending: PendingWait,
        request: Option<InputRequest>,
    },
    Finished,
    FrameLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub frames: u32,
    pub stop: BoundaryStop,
    /// Messages shown during the run, in order.
    pub messages: Vec<MessageRequest>,
}

/// An interpreter wired to a recording host and an in-memory variable store,
/// driven frame by frame without a renderer.
pub struct HeadlessSession {
    interpreter: Interpreter,
    host: Rc<RefCell<HeadlessHost>>,
    variables: Rc<RefCell<MemoryVariableStore>>,
    reported_messages: usize,
}

impl HeadlessSession {
    pub fn open(options: HeadlessSessionOptions) -> Result<Self, EngineError> {
        let host = Rc::new(RefCell::new(HeadlessHost::new()));
        let variables = Rc::new(RefCell::new(options.variables.unwrap_or_default()));
        let shared_host: Rc<RefCell<dyn Host>> = host.clone();
        let shared_variables: Rc<RefCell<dyn VariableStore>> = variables.clone();

        let interpreter = match options.bundle {
            Some(bundle) => resume_interpreter(ResumeInterpreterOptions {
                documents_json: options.documents_json,
                bundle,
                registry: None,
                variables: Some(shared_variables),
                host: Some(shared_host),
                frame_rate: options.frame_rate,
                temp_settings: options.temp_settings,
                random_seed: options.random_state,
            })?,
            None => create_interpreter(CreateInterpreterOptions {
                documents_json: options.documents_json,
                entry_scene: options.entry_scene,
                variables: Some(shared_variables),
                host: Some(shared_host),
                frame_rate: options.frame_rate,
                temp_settings: options.temp_settings,
                random_seed: options.random_state,
                ..CreateInterpreterOptions::default()
            })?,
        };

        Ok(Self {
            interpreter,
            host,
            variables,
            reported_messages: 0,
        })
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    pub fn host(&self) -> &Rc<RefCell<HeadlessHost>> {
        &self.host
    }

    pub fn variables(&self) -> &Rc<RefCell<MemoryVariableStore>> {
        &self.variables
    }

    pub fn random_state(&self) -> u32 {
        self.interpreter.env().random_state()
    }

    pub fn temp_settings(&self) -> TempSettings {
        self.interpreter.env().temp_settings()
    }

    pub fn choose(&mut self, index: usize) -> Result<(), EngineError> {
        self.interpreter.choose(index)
    }

    pub fn submit_number(&mut self, value: f64) -> Result<(), EngineError> {
        self.interpreter.submit_number(value)
    }

    pub fn submit_text(&mut self, text: &str) -> Result<(), EngineError> {
        self.interpreter.submit_text(text)
    }

    pub fn to_bundle(&self) -> Result<InterpreterBundle, EngineError> {
        self.interpreter.to_bundle()
    }

    /// Steps until the player has to act, the entry scene ends, or
    /// `max_frames` updates ran. Messages are accepted as soon as they wait.
    pub fn run_to_boundary(&mut self, max_frames: u32) -> Result<RunReport, EngineError> {
        let mut frames = 0;
        let stop = loop {
            if let Some(pending) = self.interpreter.pending_wait() {
                if pending.kind == WaitKind::Message {
                    self.interpreter.resolve_wait(WaitKind::Message)?;
                } else {
                    let request = self.host.borrow().inputs.last().cloned();
                    break BoundaryStop::Input { pending, request };
                }
            }
            if self.interpreter.is_finished() {
                break BoundaryStop::Finished;
            }
            if frames >= max_frames {
                break BoundaryStop::FrameLimit;
            }
            self.interpreter.update();
            frames += 1;
        };

        let messages = {
            let host = self.host.borrow();
            host.messages[self.reported_messages.min(host.messages.len())..].to_vec()
        };
        self.reported_messages += messages.len();
        log::debug!("headless run stopped after {} frames: {:?}", frames, stop);
        Ok(RunReport {
            frames,
            stop,
            messages,
        })
    }
}

impl Drop for HeadlessSession {
    fn drop(&mut self) {
        self.interpreter.env().dispose();
    }
}

#[cfg(test)]
mod headless_tests {
    use super::*;
    use crate::test_projects::*;

    fn open(entry_scene: Option<&str>) -> HeadlessSession {
        HeadlessSession::open(HeadlessSessionOptions {
            documents_json: map(&[("main.json", GREETING), ("bye.json", FAREWELL)]),
            entry_scene: entry_scene.map(str::to_string),
            ..HeadlessSessionOptions::default()
        })
        .expect("session should open")
    }

    fn texts(report: &RunReport) -> Vec<String> {
        report
            .messages
            .iter()
            .map(|message| message.text.clone())
            .collect()
    }

    #[test]
    fn run_stops_at_choice_then_finishes() {
        let mut session = open(None);
        let report = session.run_to_boundary(100).expect("run should pass");
        assert_eq!(texts(&report), vec!["Hello"]);
        let BoundaryStop::Input { pending, request } = report.stop else {
            panic!("expected input boundary");
        };
        assert_eq!(pending.kind, WaitKind::Choice);
        assert_eq!(pending.descriptor.command_uid.as_deref(), Some("pick"));
        assert!(matches!(
            request,
            Some(InputRequest::Choice { ref choices, .. }) if choices.len() == 2
        ));

        session.choose(0).expect("choice should resolve");
        let report = session.run_to_boundary(100).expect("run should pass");
        assert_eq!(texts(&report), vec!["Here you go.", "Bye."]);
        assert_eq!(report.stop, BoundaryStop::Finished);
        assert_eq!(session.variables().borrow().globals.numbers.get(&0), Some(&0.0));
    }

    #[test]
    fn bundle_reopens_at_the_same_prompt() {
        let mut session = open(None);
        session.run_to_boundary(100).expect("run should pass");
        let bundle = session.to_bundle().expect("bundle should save");
        let variables = session.variables().borrow().clone();
        drop(session);

        let mut resumed = HeadlessSession::open(HeadlessSessionOptions {
            documents_json: map(&[("main.json", GREETING), ("bye.json", FAREWELL)]),
            bundle: Some(bundle),
            variables: Some(variables),
            ..HeadlessSessionOptions::default()
        })
        .expect("session should resume");
        let report = resumed.run_to_boundary(100).expect("run should pass");
        assert!(report.messages.is_empty());
        assert!(matches!(report.stop, BoundaryStop::Input { .. }));

        resumed.choose(1).expect("choice should resolve");
        let report = resumed.run_to_boundary(100).expect("run should pass");
        assert_eq!(texts(&report), vec!["Maybe later.", "Bye."]);
    }

    #[test]
    fn frame_limit_stops_long_waits() {
        let mut session = HeadlessSession::open(HeadlessSessionOptions {
            documents_json: map(&[(
                "main.json",
                r#"{"kind":"scene","uid":"main","commands":[{"id":"wait","params":{"duration":1000}}]}"#,
            )]),
            ..HeadlessSessionOptions::default()
        })
        .expect("session should open");
        let report = session.run_to_boundary(10).expect("run should pass");
        assert_eq!(report.stop, BoundaryStop::FrameLimit);
        assert_eq!(report.frames, 10);

        let report = session.run_to_boundary(100).expect("run should pass");
        assert_eq!(report.stop, BoundaryStop::Finished);
    }
}
