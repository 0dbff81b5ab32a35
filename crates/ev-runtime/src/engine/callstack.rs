use std::cell::RefCell;
use std::rc::Rc;

use ev_core::{CallTarget, InterpreterContext, Value};

use super::{Interpreter, SharedInterpreter, SubInterpreterLink};

/// Completion callback handed to a child: clears the parent's reference and
/// delivers the waiting flag the parent resumes with.
pub(super) fn completion(link: &Rc<RefCell<SubInterpreterLink>>) -> impl FnMut() + 'static {
    let link = Rc::clone(link);
    move || {
        let mut link = link.borrow_mut();
        link.child = None;
        link.target = None;
        link.finished = Some(link.resume_waiting);
    }
}

impl Interpreter {
    pub fn sub_interpreter(&self) -> Option<SharedInterpreter> {
        self.sub_link.borrow().child.clone()
    }

    pub fn sub_interpreter_target(&self) -> Option<CallTarget> {
        self.sub_link.borrow().target.clone()
    }

    /// Applies a completion delivered by a finished child.
    pub(super) fn absorb_sub_completion(&mut self) {
        let finished = self.sub_link.borrow_mut().finished.take();
        if let Some(waiting) = finished {
            self.is_waiting = waiting;
            self.bind_context();
        }
    }

    pub(super) fn bind_context(&self) {
        self.env
            .variables()
            .borrow_mut()
            .setup_temp_variables(&self.context);
    }

    /// Delegates to the common event `id` until it finishes, then continues
    /// with `is_waiting == resume_waiting`. Missing targets are a no-op.
    pub fn call_common_event(&mut self, id: &str, parameters: Vec<Value>, resume_waiting: bool) {
        let env = Rc::clone(&self.env);
        let Some(event) = env.common_events().borrow().get(id) else {
            log::warn!("common event `{}` not found", id);
            return;
        };
        env.common_events().borrow_mut().activate(event.id());

        event.remove_finish_listeners(self.id);
        let Some(child) = event.call(
            &env,
            parameters,
            Rc::clone(&self.settings),
            self.context.clone(),
        ) else {
            log::warn!("common event `{}` is already executing", event.id());
            return;
        };

        {
            let mut link = self.sub_link.borrow_mut();
            link.resume_waiting = resume_waiting;
            link.finished = None;
        }
        let mut on_finish = completion(&self.sub_link);
        event.once_finish(self.id, Box::new(move || on_finish()));
        self.attach_child(
            child,
            CallTarget::CommonEvent {
                id: event.id().to_string(),
            },
        );
    }

    /// Delegates to a fresh interpreter over scene `uid`, with locals keyed by
    /// that scene. Missing scenes are a no-op.
    pub fn call_scene(&mut self, uid: &str) {
        let Some(scene) = self.env.documents().scene(uid) else {
            log::warn!("scene `{}` not found", uid);
            return;
        };

        let mut child = Interpreter::new(
            Rc::clone(&self.env),
            InterpreterContext::new(scene.uid.clone(), None),
        );
        child.set_commands(Some(Rc::clone(&scene.commands)));
        child.set_settings(Rc::clone(&self.settings));
        {
            let mut link = self.sub_link.borrow_mut();
            link.resume_waiting = false;
            link.finished = None;
        }
        let mut on_finish = completion(&self.sub_link);
        child.set_on_finish(Some(Box::new(move |_: &Interpreter| on_finish())));
        self.attach_child(
            child.into_shared(),
            CallTarget::Scene {
                uid: scene.uid.clone(),
            },
        );
    }

    fn attach_child(&mut self, child: SharedInterpreter, target: CallTarget) {
        log::debug!(
            "interpreter {} delegates to {:?}",
            self.id,
            target
        );
        {
            let mut link = self.sub_link.borrow_mut();
            link.child = Some(Rc::clone(&child));
            link.target = Some(target);
        }
        self.is_waiting = true;
        {
            let mut child = child.borrow_mut();
            child.start();
            child.update();
        }
        self.absorb_sub_completion();
    }
}
