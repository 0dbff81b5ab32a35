use ev_core::ConditionParams;

use super::Interpreter;

impl Interpreter {
    /// Records the loop origin at the current indent and enters the body.
    pub fn command_loop(&mut self) {
        self.loops.insert(self.indent, self.pointer);
        self.indent += 1;
    }

    pub fn command_break_loop(&mut self) {
        let indent = self.nearest_loop_indent();
        self.loops.remove(&indent);
        self.indent = indent;
    }

    /// Jumps back to the header of the innermost loop so it re-runs next.
    pub fn command_continue_loop(&mut self) {
        let indent = self.nearest_loop_indent();
        if !self.loops.contains_key(&indent) {
            return;
        }
        self.indent = indent;
        self.skip(indent, true);
        self.hold_pointer = true;
    }

    pub fn command_condition(&mut self, params: &ConditionParams) {
        let result = self.check_condition(params);
        self.conditions.insert(self.indent, result);
        if result {
            self.indent += 1;
        }
    }

    pub fn command_condition_else(&mut self) {
        if !self.condition_at_indent() {
            self.indent += 1;
        }
    }

    pub fn command_condition_else_if(&mut self, params: &ConditionParams) {
        if self.condition_at_indent() {
            return;
        }
        let result = self.check_condition(params);
        self.conditions.insert(self.indent, result);
        if result {
            self.indent += 1;
        }
    }

    /// Moves the pointer to the next (or previous) command at `indent`.
    pub fn skip(&mut self, indent: u32, backward: bool) {
        let len = self.len();
        if backward {
            self.pointer = self.pointer.saturating_sub(1);
            while self.pointer > 0
                && self
                    .command_at(self.pointer)
                    .is_some_and(|command| command.indent != indent)
            {
                self.pointer -= 1;
            }
        } else {
            self.pointer += 1;
            while self.pointer < len
                && self
                    .command_at(self.pointer)
                    .is_some_and(|command| command.indent != indent)
            {
                self.pointer += 1;
            }
            self.pointer = self.pointer.min(len);
        }
    }

    /// Moves to the first label named `label`. Leaves every field untouched
    /// when no such label exists.
    pub fn jump_to_label(&mut self, label: &str) -> bool {
        if label.is_empty() {
            return false;
        }
        let Some((index, indent)) = self.commands.as_ref().and_then(|commands| {
            commands
                .iter()
                .enumerate()
                .find(|(_, command)| command.is_label_named(label))
                .map(|(index, command)| (index, command.indent))
        }) else {
            log::warn!("label `{}` not found in context `{}`", label, self.context.id);
            return false;
        };

        self.pointer = index;
        self.indent = indent;
        self.wait_counter = 0;
        self.wait_callback = None;
        self.waiting_for.clear();
        self.is_waiting_for_message = false;
        self.is_waiting = false;
        true
    }

    pub fn record_label(&mut self, name: &str) {
        self.labels.insert(name.to_string(), self.pointer);
    }

    /// Ends the command list: the pointer moves past the last command and
    /// the finish handling runs at the end of this tick.
    pub fn exit_event(&mut self) {
        self.pointer = self.len();
        self.indent = 0;
        self.hold_pointer = true;
    }

    fn nearest_loop_indent(&self) -> u32 {
        let mut indent = self.indent;
        while !self.loops.contains_key(&indent) && indent > 0 {
            indent -= 1;
        }
        indent
    }

    fn condition_at_indent(&self) -> bool {
        self.conditions.get(&self.indent).copied().unwrap_or(false)
    }
}
