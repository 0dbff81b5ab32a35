use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

pub mod event_names {
    pub const MOUSE_DOWN: &str = "mouseDown";
    pub const PREVIEW_WAITING: &str = "previewWaiting";
    pub const PREVIEW_RESTART: &str = "previewRestart";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<'a> {
    pub name: &'a str,
    /// Interpreter that raised the event, if any.
    pub sender: Option<u64>,
}

pub type EventHandler = Rc<dyn Fn(&Event<'_>)>;

struct Listener {
    id: u64,
    owner: Option<u64>,
    handler: EventHandler,
}

/// Global notification channel. Handlers may emit or (un)subscribe while being
/// dispatched.
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<BTreeMap<String, Vec<Listener>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, event: &str, owner: Option<u64>, handler: EventHandler) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(Listener { id, owner, handler });
        id
    }

    pub fn off(&self, event: &str, id: u64) {
        if let Some(listeners) = self.listeners.borrow_mut().get_mut(event) {
            listeners.retain(|listener| listener.id != id);
        }
    }

    pub fn off_by_owner(&self, event: &str, owner: u64) {
        if let Some(listeners) = self.listeners.borrow_mut().get_mut(event) {
            listeners.retain(|listener| listener.owner != Some(owner));
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().get(event).map_or(0, Vec::len)
    }

    pub fn emit(&self, event: &str, sender: Option<u64>) {
        let handlers = match self.listeners.borrow().get(event) {
            Some(listeners) => listeners
                .iter()
                .map(|listener| Rc::clone(&listener.handler))
                .collect::<Vec<_>>(),
            None => return,
        };
        let payload = Event {
            name: event,
            sender,
        };
        for handler in handlers {
            handler(&payload);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts = self
            .listeners
            .borrow()
            .iter()
            .map(|(event, listeners)| (event.clone(), listeners.len()))
            .collect::<BTreeMap<_, _>>();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}
