use std::collections::BTreeMap;

use ev_core::InterpreterBundle;
use ev_runtime::{MemoryVariableStore, TempSettings};
use serde::{Deserialize, Serialize};

pub(crate) const PLAYER_STATE_SCHEMA: &str = "player-state.v1";

#[derive(Debug, Clone)]
pub(crate) struct LoadedProjectSource {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) documents_json: BTreeMap<String, String>,
    pub(crate) entry_scene: Option<String>,
}

/// Everything `agent` needs to continue a run in a later process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerState {
    pub(crate) schema_version: String,
    pub(crate) project_id: String,
    pub(crate) bundle: InterpreterBundle,
    pub(crate) variables: MemoryVariableStore,
    pub(crate) random_state: u32,
    #[serde(default)]
    pub(crate) temp_settings: TempSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryEvent {
    Choices,
    InputNumber,
    InputText,
    End,
    Stalled,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundaryText {
    pub(crate) character: Option<String>,
    pub(crate) text: String,
}

#[derive(Debug, Clone)]
pub(crate) struct BoundaryResult {
    pub(crate) event: BoundaryEvent,
    pub(crate) frames: u32,
    pub(crate) texts: Vec<BoundaryText>,
    pub(crate) choices: Vec<(usize, String)>,
    pub(crate) prompt_text: Option<String>,
    /// Digits for number input, letters for text input.
    pub(crate) input_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineCommandAction {
    NotHandled,
    Continue,
    RefreshBoundary,
    Quit,
}

pub(crate) struct LineCommandContext<'a> {
    pub(crate) state_file: &'a str,
    pub(crate) source: &'a LoadedProjectSource,
    pub(crate) temp_settings: TempSettings,
}
