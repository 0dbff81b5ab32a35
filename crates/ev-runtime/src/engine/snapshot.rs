use std::rc::Rc;

use ev_core::{
    CallTarget, EngineError, InterpreterBundle, InterpreterContext, SubInterpreterBundle,
    BUNDLE_SCHEMA_V1,
};

use super::callstack::completion;
use super::{Interpreter, SubInterpreterLink};

pub const BUNDLE_SCHEMA: &str = BUNDLE_SCHEMA_V1;

fn busy() -> EngineError {
    EngineError::new(
        "ENGINE_INTERPRETER_BUSY",
        "Sub-interpreter is executing and cannot be saved or restored.",
    )
}

impl Interpreter {
    /// Captures the resumable state of this interpreter and its call chain.
    ///
    /// An input command that just ran is rewound: the saved pointer is the
    /// input command itself, not waiting, so it prompts again after a reload.
    pub fn to_bundle(&self) -> Result<InterpreterBundle, EngineError> {
        let mut pointer = self.pointer;
        // A held message retries on its own once restored.
        let mut is_waiting = self.is_waiting() && !self.is_waiting_for_message;
        let mut waiting_for = self.waiting_for.clone();

        let rewind = self
            .pointer
            .checked_sub(1)
            .and_then(|previous| self.command_at(previous))
            .is_some_and(|command| command.kind.is_input());
        if rewind {
            pointer -= 1;
            is_waiting = false;
            waiting_for.retain(|kind, _| !kind.is_input());
        }

        let sub_interpreter = match (self.sub_interpreter(), self.sub_interpreter_target()) {
            (Some(child), Some(target)) => {
                let state = child.try_borrow().map_err(|_| busy())?.to_bundle()?;
                Some(Box::new(SubInterpreterBundle {
                    target,
                    resume_waiting: self.sub_link.borrow().resume_waiting,
                    state,
                }))
            }
            _ => None,
        };

        Ok(InterpreterBundle {
            schema_version: BUNDLE_SCHEMA.to_string(),
            pointer,
            indent: self.indent,
            conditions: self.conditions.clone(),
            loops: self.loops.clone(),
            labels: self.labels.clone(),
            is_waiting,
            is_running: self.is_running,
            wait_counter: self.wait_counter,
            waiting_for,
            settings: self.settings.borrow().clone(),
            context: self.context.clone(),
            parameters: self.parameters.clone(),
            sub_interpreter,
        })
    }

    /// Applies a saved bundle. Commands must already be set; the call chain
    /// is rebuilt from the environment's scenes and common events.
    pub fn restore(&mut self, bundle: InterpreterBundle) -> Result<(), EngineError> {
        if bundle.schema_version != BUNDLE_SCHEMA {
            return Err(EngineError::new(
                "BUNDLE_SCHEMA",
                format!("Unsupported bundle schema \"{}\".", bundle.schema_version),
            ));
        }
        if bundle.pointer > self.len() {
            return Err(EngineError::new(
                "BUNDLE_POINTER",
                format!(
                    "Bundle pointer {} is past the {} commands of `{}`.",
                    bundle.pointer,
                    self.len(),
                    bundle.context.id
                ),
            ));
        }

        self.reset();
        self.pointer = bundle.pointer;
        self.indent = bundle.indent;
        self.conditions = bundle.conditions;
        self.loops = bundle.loops;
        self.labels = bundle.labels;
        self.is_waiting = bundle.is_waiting;
        self.is_running = bundle.is_running;
        self.wait_counter = bundle.wait_counter;
        self.waiting_for = bundle.waiting_for;
        *self.settings.borrow_mut() = bundle.settings;
        self.context = bundle.context;
        self.parameters = bundle.parameters;

        {
            let mut host = self.env.host().borrow_mut();
            for (kind, descriptor) in &self.waiting_for {
                host.reattach_wait(*kind, descriptor);
            }
        }

        if let Some(sub) = bundle.sub_interpreter {
            self.restore_sub_interpreter(*sub)?;
        }
        log::debug!(
            "interpreter {} restored at {} in `{}`",
            self.id,
            self.pointer,
            self.context.id
        );
        Ok(())
    }

    fn restore_sub_interpreter(&mut self, sub: SubInterpreterBundle) -> Result<(), EngineError> {
        let env = Rc::clone(&self.env);
        *self.sub_link.borrow_mut() = SubInterpreterLink {
            resume_waiting: sub.resume_waiting,
            ..SubInterpreterLink::default()
        };
        let mut on_finish = completion(&self.sub_link);

        let child = match &sub.target {
            CallTarget::CommonEvent { id } => {
                let event = env.common_events().borrow().get(id).ok_or_else(|| {
                    EngineError::new(
                        "BUNDLE_COMMON_EVENT",
                        format!("Saved common event \"{}\" does not exist.", id),
                    )
                })?;
                env.common_events().borrow_mut().activate(event.id());
                event.remove_finish_listeners(self.id);
                let child = event
                    .call(
                        &env,
                        sub.state.parameters.clone(),
                        Rc::clone(&self.settings),
                        sub.state.context.clone(),
                    )
                    .ok_or_else(busy)?;
                event.once_finish(self.id, Box::new(move || on_finish()));
                child
            }
            CallTarget::Scene { uid } => {
                let scene = env.documents().scene(uid).ok_or_else(|| {
                    EngineError::new(
                        "BUNDLE_SCENE",
                        format!("Saved scene \"{}\" does not exist.", uid),
                    )
                })?;
                let mut child =
                    Interpreter::new(Rc::clone(&env), InterpreterContext::new(uid.clone(), None));
                child.set_commands(Some(Rc::clone(&scene.commands)));
                child.set_settings(Rc::clone(&self.settings));
                child.set_on_finish(Some(Box::new(move |_: &Interpreter| on_finish())));
                child.into_shared()
            }
        };

        child
            .try_borrow_mut()
            .map_err(|_| busy())?
            .restore(sub.state)?;
        let mut link = self.sub_link.borrow_mut();
        link.child = Some(child);
        link.target = Some(sub.target);
        Ok(())
    }
}
