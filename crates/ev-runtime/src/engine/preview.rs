use std::rc::Rc;

use ev_core::{Command, PreviewData};

use super::Interpreter;
use crate::environment::TempSettings;
use crate::events::event_names;

/// Commands executed in preview mode before the step loop yields one frame.
pub const PREVIEW_YIELD_INTERVAL: u32 = 500;

/// Transient preview bookkeeping. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewInfo {
    /// Set once the target command ran; cleared by a mouse-down.
    pub waiting: bool,
    /// Pending host pause handle.
    pub timeout: Option<u64>,
    pub executed_commands: u32,
    pub command_not_found: bool,
}

impl Interpreter {
    /// Installs (or with `None` removes) a fast-preview target. A target uid
    /// missing from the command list falls back to the target pointer.
    pub fn set_preview(&mut self, preview: Option<PreviewData>) {
        self.clear_preview();
        let Some(mut preview) = preview else {
            return;
        };

        let mut info = PreviewInfo::default();
        if let Some(uid) = preview.uid.as_deref() {
            let found = self.commands.as_ref().and_then(|commands| {
                commands
                    .iter()
                    .position(|command| command.uid.as_deref() == Some(uid))
            });
            match found {
                Some(index) => preview.pointer = index,
                None => {
                    log::warn!(
                        "preview target `{}` not found, using pointer {}",
                        uid,
                        preview.pointer
                    );
                    info.command_not_found = true;
                    preview.uid = None;
                }
            }
        }
        *self.preview_info.borrow_mut() = info;

        let env = Rc::downgrade(&self.env);
        let preview_info = Rc::clone(&self.preview_info);
        let animation_disabled = preview.settings.animation_disabled;
        let owner = self.id;
        let listener = self.env.events().on(
            event_names::MOUSE_DOWN,
            Some(owner),
            Rc::new(move |_event| {
                let Some(env) = env.upgrade() else {
                    return;
                };
                let timeout = {
                    let mut info = preview_info.borrow_mut();
                    info.waiting = false;
                    info.timeout.take()
                };
                env.set_temp_settings(TempSettings {
                    skip: animation_disabled,
                    skip_time: 0,
                });
                {
                    let mut host = env.host().borrow_mut();
                    if let Some(handle) = timeout {
                        host.cancel_pause(handle);
                    }
                    host.resume_rendering();
                }
                env.events().emit(event_names::PREVIEW_RESTART, Some(owner));
            }),
        );
        self.preview_listener = Some(listener);
        self.preview = Some(preview);
    }

    pub fn clear_preview(&mut self) {
        if let Some(listener) = self.preview_listener.take() {
            self.env.events().off(event_names::MOUSE_DOWN, listener);
        }
        self.preview = None;
    }

    /// Commands before the target run collapsed; the target itself runs with
    /// the preview's animation setting and parks the step loop. A uid target
    /// was resolved to its index by `set_preview`.
    pub(super) fn apply_preview_gate(&mut self, index: usize, command: &Command) {
        let Some(preview) = self.preview.as_ref() else {
            return;
        };
        if index < preview.pointer {
            self.env.set_temp_settings(TempSettings {
                skip: true,
                skip_time: 0,
            });
            return;
        }

        let settings = preview.settings;
        log::debug!("preview reached `{}` at {}", command.type_id(), index);
        self.env.set_temp_settings(TempSettings {
            skip: settings.animation_disabled,
            skip_time: 0,
        });
        self.preview_info.borrow_mut().waiting = true;
        self.env
            .events()
            .emit(event_names::PREVIEW_WAITING, Some(self.id));

        if settings.animation_disabled || settings.animation_time > 0.0 {
            let handle = self
                .env
                .host()
                .borrow_mut()
                .schedule_pause(settings.animation_time);
            self.preview_info.borrow_mut().timeout = Some(handle);
        }
    }
}
