use ev_core::{
    Command, CommandKind, EngineError, InterpreterContext, Value, WaitDescriptor, WaitKind,
};

use super::Interpreter;

/// The external completion the innermost waiting interpreter expects.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWait {
    pub kind: WaitKind,
    pub descriptor: WaitDescriptor,
    pub context: InterpreterContext,
    /// The command that started the wait, if it is still in the list.
    pub command: Option<Command>,
}

fn busy() -> EngineError {
    EngineError::new(
        "ENGINE_INTERPRETER_BUSY",
        "Sub-interpreter is executing and cannot accept input.",
    )
}

fn no_pending_choice() -> EngineError {
    EngineError::new("ENGINE_NO_PENDING_CHOICE", "No pending choice is available.")
}

fn no_pending_input() -> EngineError {
    EngineError::new("ENGINE_NO_PENDING_INPUT", "No pending input is available.")
}

fn no_pending_wait() -> EngineError {
    EngineError::new("ENGINE_NO_PENDING_WAIT", "No pending wait of that kind.")
}

fn command_missing(kind: WaitKind) -> EngineError {
    EngineError::new(
        "ENGINE_WAIT_COMMAND_MISSING",
        format!("Pending {:?} wait no longer points at its command.", kind),
    )
}

impl Interpreter {
    /// Innermost pending wait of the call chain, input kinds first.
    pub fn pending_wait(&self) -> Option<PendingWait> {
        if let Some(child) = self.sub_interpreter() {
            if let Ok(child) = child.try_borrow() {
                if let Some(pending) = child.pending_wait() {
                    return Some(pending);
                }
            }
        }

        let (kind, descriptor) = self
            .waiting_for
            .iter()
            .find(|(kind, _)| kind.is_input())
            .or_else(|| self.waiting_for.iter().next())?;
        Some(PendingWait {
            kind: *kind,
            descriptor: descriptor.clone(),
            context: self.context.clone(),
            command: self.command_at(descriptor.pointer).cloned(),
        })
    }

    pub fn choose(&mut self, index: usize) -> Result<(), EngineError> {
        self.resolve_in_chain(WaitKind::Choice, no_pending_choice, |interpreter, descriptor| {
            let Some(CommandKind::ShowChoices(params)) = interpreter
                .command_at(descriptor.pointer)
                .map(|command| command.kind.clone())
            else {
                return Err(command_missing(WaitKind::Choice));
            };
            if index >= params.choices.len() {
                return Err(EngineError::new(
                    "ENGINE_CHOICE_INDEX",
                    format!("Choice index \"{}\" is out of range.", index),
                ));
            }
            interpreter.set_variable_value(params.target, Value::Number(index as f64));
            interpreter.complete_wait(WaitKind::Choice);
            Ok(())
        })
    }

    /// Stores `value`, clamped to the digits the command allows.
    pub fn submit_number(&mut self, value: f64) -> Result<(), EngineError> {
        self.resolve_in_chain(WaitKind::InputNumber, no_pending_input, |interpreter, descriptor| {
            let Some(CommandKind::InputNumber(params)) = interpreter
                .command_at(descriptor.pointer)
                .map(|command| command.kind.clone())
            else {
                return Err(command_missing(WaitKind::InputNumber));
            };
            let limit = 10f64.powi(params.digits.min(15) as i32) - 1.0;
            let value = value.trunc().clamp(-limit, limit);
            interpreter.set_variable_value(params.target, Value::Number(value));
            interpreter.complete_wait(WaitKind::InputNumber);
            Ok(())
        })
    }

    /// Stores `text`, cut to the command's letter limit.
    pub fn submit_text(&mut self, text: &str) -> Result<(), EngineError> {
        self.resolve_in_chain(WaitKind::InputText, no_pending_input, |interpreter, descriptor| {
            let Some(CommandKind::InputText(params)) = interpreter
                .command_at(descriptor.pointer)
                .map(|command| command.kind.clone())
            else {
                return Err(command_missing(WaitKind::InputText));
            };
            let text = if params.letters > 0 {
                text.chars().take(params.letters).collect()
            } else {
                text.to_string()
            };
            interpreter.set_variable_value(params.target, Value::String(text));
            interpreter.complete_wait(WaitKind::InputText);
            Ok(())
        })
    }

    /// Completes a wait whose result the host handled itself, e.g. a message
    /// the player clicked through.
    pub fn resolve_wait(&mut self, kind: WaitKind) -> Result<(), EngineError> {
        self.resolve_in_chain(kind, no_pending_wait, |interpreter, _descriptor| {
            if kind == WaitKind::Message && interpreter.settings.borrow().auto_erase {
                interpreter
                    .env
                    .host()
                    .borrow_mut()
                    .close_message(&interpreter.context);
            }
            interpreter.complete_wait(kind);
            Ok(())
        })
    }

    fn has_pending(&self, kind: WaitKind) -> bool {
        if self.waiting_for.contains_key(&kind) {
            return true;
        }
        let Some(child) = self.sub_interpreter() else {
            return false;
        };
        let pending = match child.try_borrow() {
            Ok(child) => child.has_pending(kind),
            Err(_) => false,
        };
        pending
    }

    fn resolve_in_chain<R>(
        &mut self,
        kind: WaitKind,
        missing: fn() -> EngineError,
        apply: impl FnOnce(&mut Interpreter, WaitDescriptor) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        if let Some(child) = self.sub_interpreter() {
            let mut child = child.try_borrow_mut().map_err(|_| busy())?;
            if child.has_pending(kind) {
                return child.resolve_in_chain(kind, missing, apply);
            }
        }
        let Some(descriptor) = self.waiting_for.get(&kind).cloned() else {
            return Err(missing());
        };
        apply(self, descriptor)
    }

    fn complete_wait(&mut self, kind: WaitKind) {
        self.waiting_for.remove(&kind);
        if self.waiting_for.is_empty() && self.wait_counter == 0 {
            self.is_waiting = false;
        }
        log::debug!("interpreter {} resolved {:?} wait", self.id, kind);
    }
}

#[cfg(test)]
mod boundary_tests {
    use ev_core::{
        CallCommonEventParams, Command, CommandKind, InputNumberParams, InputTextParams,
        ShowChoicesParams, ShowMessageParams, WaitKind, VariableRef,
    };

    use super::super::runtime_test_support::*;
    use crate::common_event::CommonEvent;

    fn choices(target: VariableRef) -> Command {
        Command::new(
            0,
            CommandKind::ShowChoices(ShowChoicesParams {
                prompt: Some("Which?".to_string()),
                choices: vec!["left".to_string(), "right".to_string()],
                target,
            }),
        )
    }

    #[test]
    fn choose_validates_index_and_stores_it() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(vec![choices(VariableRef::global(0)), probe(0, "after")]);
        interpreter.start();
        interpreter.update();

        let pending = interpreter.pending_wait().expect("choice should be pending");
        assert_eq!(pending.kind, WaitKind::Choice);
        assert_eq!(pending.descriptor.pointer, 0);
        assert_eq!(h.host.borrow().inputs.len(), 1);

        let error = interpreter.choose(5).expect_err("index out of range");
        assert_eq!(error.code, "ENGINE_CHOICE_INDEX");
        interpreter.choose(1).expect("choice should resolve");
        assert_eq!(h.variables.borrow().globals.numbers.get(&0), Some(&1.0));
        assert!(interpreter.pending_wait().is_none());

        interpreter.update();
        assert_eq!(h.hits(), vec!["after"]);
        assert!(interpreter.is_finished());
    }

    #[test]
    fn submissions_without_a_pending_wait_fail() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(vec![probe(0, "a")]);
        interpreter.start();
        interpreter.update();
        assert_eq!(
            interpreter.choose(0).expect_err("no choice").code,
            "ENGINE_NO_PENDING_CHOICE"
        );
        assert_eq!(
            interpreter.submit_text("x").expect_err("no input").code,
            "ENGINE_NO_PENDING_INPUT"
        );
        assert_eq!(
            interpreter
                .resolve_wait(WaitKind::Message)
                .expect_err("no message")
                .code,
            "ENGINE_NO_PENDING_WAIT"
        );
    }

    #[test]
    fn text_input_inside_common_event_is_routed_to_the_child() {
        let h = harness(HarnessOptions {
            common_events: vec![CommonEvent::new(
                "ce-1",
                "Ask",
                vec![Command::new(
                    0,
                    CommandKind::InputText(InputTextParams {
                        target: VariableRef::local(2),
                        letters: 3,
                    }),
                )]
                .into(),
            )],
            ..HarnessOptions::default()
        });
        let mut interpreter = h.interpreter(vec![
            Command::new(
                0,
                CommandKind::CallCommonEvent(CallCommonEventParams {
                    common_event_id: "ce-1".to_string(),
                    parameters: Vec::new(),
                    resume_waiting: false,
                }),
            ),
            probe(0, "after"),
        ]);
        interpreter.start();
        interpreter.update();
        assert!(interpreter.waiting_for().is_empty());
        assert_eq!(
            interpreter.pending_wait().map(|pending| pending.kind),
            Some(WaitKind::InputText)
        );

        interpreter.submit_text("abcdef").expect("input should resolve");
        assert_eq!(
            h.variables
                .borrow()
                .local_bank("main")
                .and_then(|bank| bank.strings.get(&2).cloned()),
            Some("abc".to_string())
        );

        tick(&mut interpreter, 2);
        assert_eq!(h.hits(), vec!["after"]);
    }

    #[test]
    fn number_input_is_clamped_to_digits() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(vec![Command::new(
            0,
            CommandKind::InputNumber(InputNumberParams {
                target: VariableRef::global(3),
                digits: 2,
            }),
        )]);
        interpreter.start();
        interpreter.update();
        interpreter.submit_number(12345.6).expect("number should resolve");
        assert_eq!(h.variables.borrow().globals.numbers.get(&3), Some(&99.0));
    }

    #[test]
    fn resolving_a_message_closes_it_when_auto_erase_is_on() {
        let h = harness(HarnessOptions::default());
        let mut interpreter = h.interpreter(vec![
            Command::new(
                0,
                CommandKind::ShowMessage(ShowMessageParams {
                    character: Some("Ann".to_string()),
                    text: "Hello".to_string(),
                }),
            ),
            probe(0, "after"),
        ]);
        interpreter.start();
        interpreter.update();
        assert_eq!(h.host.borrow().message_owner.as_deref(), Some("main"));
        assert_eq!(
            interpreter.pending_wait().map(|pending| pending.kind),
            Some(WaitKind::Message)
        );

        interpreter
            .resolve_wait(WaitKind::Message)
            .expect("message should resolve");
        assert_eq!(h.host.borrow().message_owner, None);
        interpreter.update();
        assert_eq!(h.hits(), vec!["after"]);
    }
}
