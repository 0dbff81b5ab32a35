use std::rc::Rc;

use super::preview::PREVIEW_YIELD_INTERVAL;
use super::Interpreter;
use crate::registry::CommandHandler;

impl Interpreter {
    /// Advances the interpreter by one host frame.
    pub fn update(&mut self) {
        if let Some(child) = self.sub_interpreter() {
            match child.try_borrow_mut() {
                Ok(mut child) => child.update(),
                Err(_) => log::warn!(
                    "interpreter {} skipped a tick: sub-interpreter is already executing",
                    self.id
                ),
            }
            self.absorb_sub_completion();
            return;
        }
        self.absorb_sub_completion();
        self.bind_context();

        if self.is_at_end() && !self.is_waiting {
            if self.repeat {
                self.start();
            } else {
                if self.is_running {
                    self.finish();
                }
                return;
            }
        }

        if !self.is_running {
            return;
        }

        if self.wait_counter > 0 {
            self.wait_counter -= 1;
            self.is_waiting = self.wait_counter > 0;
            if self.wait_counter == 0 {
                if let Some(callback) = self.wait_callback.take() {
                    callback(self);
                }
            }
            return;
        }

        if self.is_waiting_for_message {
            self.is_waiting = true;
            let busy = self.env.host().borrow().is_message_busy(&self.context);
            if busy {
                return;
            }
            self.is_waiting = false;
            self.is_waiting_for_message = false;
        }

        self.run_steps();

        if self.is_at_end() && !self.is_waiting {
            if self.repeat {
                self.start();
            } else if self.is_running {
                self.finish();
            }
        }
    }

    fn run_steps(&mut self) {
        let previewing = self.preview.is_some();
        while !(self.is_waiting || self.preview_info.borrow().waiting)
            && self.pointer < self.len()
            && self.is_running
        {
            self.execute_command(self.pointer);

            // Only commands that did not block count toward the yield.
            if previewing && !self.is_waiting && !self.preview_info.borrow().waiting {
                let mut info = self.preview_info.borrow_mut();
                info.executed_commands += 1;
                if info.executed_commands >= PREVIEW_YIELD_INTERVAL {
                    info.executed_commands = 0;
                    drop(info);
                    self.is_waiting = true;
                    self.wait_counter = 1;
                }
            }
        }
    }

    /// Runs the command at `index` if its indent matches, advances the
    /// pointer, and resolves the indent transition to the next command.
    pub fn execute_command(&mut self, index: usize) {
        let Some(commands) = self.commands.clone() else {
            return;
        };
        let Some(command) = commands.get(index) else {
            return;
        };

        if self.preview.is_some() {
            self.apply_preview_gate(index, command);
        }

        let Some(handler) = self.bound_handler(index) else {
            log::debug!(
                "skipping unknown command `{}` at {}",
                command.type_id(),
                index
            );
            self.pointer += 1;
            return;
        };

        if command.indent == self.indent {
            log::trace!("interpreter {} executes `{}` at {}", self.id, command.type_id(), index);
            handler(self, command);
        }

        if self.hold_pointer {
            self.hold_pointer = false;
        } else {
            self.pointer += 1;
        }

        let resolved = match commands.get(self.pointer) {
            Some(next) => next.indent,
            None => {
                let mut indent = self.indent;
                while indent > 0 && !self.loops.contains_key(&indent) {
                    indent -= 1;
                }
                indent
            }
        };

        if resolved < self.indent {
            self.indent = resolved;
            if let Some(&origin) = self.loops.get(&self.indent) {
                self.pointer = origin;
            }
        }
    }

    fn bound_handler(&mut self, index: usize) -> Option<CommandHandler> {
        if let Some(Some(handler)) = self.handlers.get(index) {
            return Some(Rc::clone(handler));
        }
        let handler = self
            .env
            .registry()
            .resolve(self.command_at(index)?.type_id())?;
        if let Some(slot) = self.handlers.get_mut(index) {
            *slot = Some(Rc::clone(&handler));
        }
        Some(handler)
    }

    fn is_at_end(&self) -> bool {
        self.commands.is_none() || self.pointer >= self.len()
    }
}
