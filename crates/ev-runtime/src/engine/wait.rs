use ev_core::{DurationParams, WaitDescriptor, WaitKind};

use super::{Interpreter, WaitCallback};

impl Interpreter {
    /// Blocks stepping for `frames` ticks. `callback` runs on the tick the
    /// counter reaches zero, or immediately when `frames` is zero.
    pub fn wait(&mut self, frames: u32, callback: Option<WaitCallback>) {
        if frames == 0 {
            if let Some(callback) = callback {
                callback(self);
            }
            return;
        }
        self.is_waiting = true;
        self.wait_counter = frames;
        self.wait_callback = callback;
    }

    /// Blocks until `resolve_wait(kind)` or an input submission clears it.
    pub fn begin_external_wait(&mut self, kind: WaitKind) {
        let descriptor = WaitDescriptor {
            pointer: self.pointer,
            command_uid: self.command_at(self.pointer).and_then(|command| command.uid.clone()),
        };
        self.waiting_for.insert(kind, descriptor);
        self.is_waiting = true;
        self.wait_counter = 0;
    }

    pub fn is_instant_skip(&self) -> bool {
        let settings = self.env.temp_settings();
        settings.skip && settings.skip_time == 0
    }

    /// Converts milliseconds to frames at the environment frame rate.
    pub fn duration_value_of(&self, milliseconds: u32) -> u32 {
        let frames =
            (f64::from(milliseconds) * f64::from(self.env.frame_rate()) / 1000.0).round() as u32;
        let settings = self.env.temp_settings();
        if settings.skip {
            frames.min(settings.skip_time)
        } else {
            frames
        }
    }

    pub fn wait_for_completion(&mut self, params: &DurationParams) {
        let frames = self.duration_value_of(params.duration);
        if params.wait_for_completion && frames > 0 && !self.is_instant_skip() {
            self.wait(frames, None);
        }
    }

    /// Retries the current command once the message box is free.
    pub fn wait_for_message(&mut self) {
        self.is_waiting_for_message = true;
        self.is_waiting = true;
        self.hold_pointer = true;
    }

    /// Keeps the pointer on the current command after its handler returns.
    pub fn hold_pointer(&mut self) {
        self.hold_pointer = true;
    }
}
