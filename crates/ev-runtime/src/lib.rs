//! Frame-driven interpreter for authored event command lists.
//!
//! An [`Interpreter`] steps through the commands of a scene or common event
//! once per host frame, pausing on timed and external waits and delegating
//! to nested interpreters for common-event and scene calls. Everything outside
//! the command list (variables, scripts, documents, rendering) is reached
//! through the collaborators of an [`Environment`].

pub mod common_event;
pub mod documents;
pub mod engine;
pub mod environment;
pub mod events;
mod handlers;
pub mod host;
pub mod registry;
pub mod script;
pub mod variables;

pub(crate) mod helpers {
    pub(crate) mod rhai_bridge;
}

pub use common_event::{CommonEvent, CommonEventRegistry};
pub use documents::{DocumentStore, MemoryDocumentStore, Scene};
pub use engine::{
    FinishCallback, Interpreter, PendingWait, PreviewInfo, SharedInterpreter, SharedSettings,
    WaitCallback, BUNDLE_SCHEMA, PREVIEW_YIELD_INTERVAL,
};
pub use environment::{
    Environment, EnvironmentOptions, TempSettings, DEFAULT_FRAME_RATE, DEFAULT_RANDOM_SEED,
};
pub use events::{event_names, Event, EventBus, EventHandler};
pub use host::{AnimationRequest, HeadlessHost, Host, InputRequest, MessageRequest};
pub use registry::{CommandHandler, CommandRegistry};
pub use script::{RhaiScriptEvaluator, ScriptError, ScriptEvaluator};
pub use variables::{MemoryVariableStore, VariableBank, VariableStore};
