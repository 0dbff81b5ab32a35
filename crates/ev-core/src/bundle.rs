use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

pub const BUNDLE_SCHEMA_V1: &str = "interpreter-bundle.v1";

/// Identifies the variable scope that local variables of an interpreter resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterContext {
    pub id: String,
    #[serde(default)]
    pub owner: Option<String>,
}

impl InterpreterContext {
    pub fn new(id: impl Into<String>, owner: Option<String>) -> Self {
        Self {
            id: id.into(),
            owner,
        }
    }
}

/// Per-message presentation settings, shared down the call chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSettings {
    pub auto_erase: bool,
    pub backlog: bool,
    pub wait_at_end: bool,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            auto_erase: true,
            backlog: true,
            wait_at_end: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitKind {
    Message,
    InputNumber,
    InputText,
    Choice,
}

impl WaitKind {
    pub fn is_input(self) -> bool {
        matches!(self, Self::InputNumber | Self::InputText | Self::Choice)
    }
}

/// Durable description of a pending external completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitDescriptor {
    /// Index of the command that started the wait.
    pub pointer: usize,
    #[serde(default)]
    pub command_uid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterBundle {
    pub schema_version: String,
    pub pointer: usize,
    pub indent: u32,
    pub conditions: BTreeMap<u32, bool>,
    pub loops: BTreeMap<u32, usize>,
    pub labels: BTreeMap<String, usize>,
    pub is_waiting: bool,
    pub is_running: bool,
    pub wait_counter: u32,
    pub waiting_for: BTreeMap<WaitKind, WaitDescriptor>,
    pub settings: MessageSettings,
    pub context: InterpreterContext,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_interpreter: Option<Box<SubInterpreterBundle>>,
}

/// What a parent interpreter delegated to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CallTarget {
    CommonEvent { id: String },
    Scene { uid: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubInterpreterBundle {
    pub target: CallTarget,
    /// Waiting flag the parent takes when the child finishes.
    pub resume_waiting: bool,
    pub state: InterpreterBundle,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSettings {
    #[serde(default)]
    pub animation_disabled: bool,
    /// Seconds to let the target command animate before the host pauses.
    #[serde(default)]
    pub animation_time: f32,
}

/// Editor-supplied target for fast preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewData {
    pub scene: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub pointer: usize,
    #[serde(default)]
    pub settings: PreviewSettings,
}
