use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::value::Value;

pub mod command_ids {
    pub const COMMENT: &str = "comment";
    pub const LABEL: &str = "label";
    pub const JUMP_TO_LABEL: &str = "jumpToLabel";
    pub const LOOP: &str = "loop";
    pub const BREAK_LOOP: &str = "breakLoop";
    pub const CONTINUE_LOOP: &str = "continueLoop";
    pub const CONDITION: &str = "condition";
    pub const CONDITION_ELSE: &str = "conditionElse";
    pub const CONDITION_ELSE_IF: &str = "conditionElseIf";
    pub const WAIT: &str = "wait";
    pub const CHANGE_VARIABLE: &str = "changeVariable";
    pub const SCRIPT: &str = "script";
    pub const SHOW_MESSAGE: &str = "showMessage";
    pub const MESSAGE_SETTINGS: &str = "messageSettings";
    pub const INPUT_NUMBER: &str = "inputNumber";
    pub const INPUT_TEXT: &str = "inputText";
    pub const SHOW_CHOICES: &str = "showChoices";
    pub const OBJECT_EFFECT: &str = "objectEffect";
    pub const CALL_COMMON_EVENT: &str = "callCommonEvent";
    pub const CALL_SCENE: &str = "callScene";
    pub const EXIT_EVENT: &str = "exitEvent";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableScope {
    /// Bound to the interpreter context that is active when the variable is touched.
    Local,
    Global,
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableKind {
    Number,
    String,
    Boolean,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableRef {
    pub scope: VariableScope,
    pub index: usize,
}

impl VariableRef {
    pub fn local(index: usize) -> Self {
        Self {
            scope: VariableScope::Local,
            index,
        }
    }

    pub fn global(index: usize) -> Self {
        Self {
            scope: VariableScope::Global,
            index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueSource {
    Constant { value: Value },
    Variable { variable: VariableRef },
    Script { source: String },
    Parameter { index: usize },
    /// Inclusive integer range drawn from the environment's seeded generator.
    Random { min: i64, max: i64 },
}

impl ValueSource {
    pub fn number(value: f64) -> Self {
        Self::Constant {
            value: Value::Number(value),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Constant {
            value: Value::String(value.into()),
        }
    }

    pub fn variable(variable: VariableRef) -> Self {
        Self::Variable { variable }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparison {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionParams {
    pub kind: VariableKind,
    pub left: ValueSource,
    pub comparison: Comparison,
    pub right: ValueSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableOperation {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeVariableParams {
    pub kind: VariableKind,
    pub target: VariableRef,
    #[serde(default = "default_operation")]
    pub operation: VariableOperation,
    pub source: ValueSource,
}

fn default_operation() -> VariableOperation {
    VariableOperation::Set
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationParams {
    /// Milliseconds.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub wait_for_completion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitParams {
    /// Milliseconds.
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelParams {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptParams {
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentParams {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowMessageParams {
    #[serde(default)]
    pub character: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSettingsParams {
    #[serde(default)]
    pub auto_erase: Option<bool>,
    #[serde(default)]
    pub backlog: Option<bool>,
    #[serde(default)]
    pub wait_at_end: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputNumberParams {
    pub target: VariableRef,
    #[serde(default = "default_digits")]
    pub digits: u32,
}

fn default_digits() -> u32 {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTextParams {
    pub target: VariableRef,
    /// Maximum number of characters kept; `0` keeps everything.
    #[serde(default)]
    pub letters: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowChoicesParams {
    #[serde(default)]
    pub prompt: Option<String>,
    pub choices: Vec<String>,
    /// Number variable that receives the chosen index.
    pub target: VariableRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEffectParams {
    pub target: String,
    pub effect: String,
    #[serde(default)]
    pub easing: Option<String>,
    #[serde(flatten)]
    pub timing: DurationParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCommonEventParams {
    pub common_event_id: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
    /// Value the caller's waiting flag takes once the common event finishes.
    #[serde(default)]
    pub resume_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSceneParams {
    pub scene_uid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Comment(CommentParams),
    Label(LabelParams),
    JumpToLabel(LabelParams),
    Loop,
    BreakLoop,
    ContinueLoop,
    Condition(ConditionParams),
    ConditionElse,
    ConditionElseIf(ConditionParams),
    Wait(WaitParams),
    ChangeVariable(ChangeVariableParams),
    Script(ScriptParams),
    ShowMessage(ShowMessageParams),
    MessageSettings(MessageSettingsParams),
    InputNumber(InputNumberParams),
    InputText(InputTextParams),
    ShowChoices(ShowChoicesParams),
    ObjectEffect(ObjectEffectParams),
    CallCommonEvent(CallCommonEventParams),
    CallScene(CallSceneParams),
    ExitEvent,
    /// Any id this crate does not model. Hosts may still register a handler for it.
    Unknown {
        id: String,
        params: serde_json::Value,
    },
}

impl CommandKind {
    pub fn type_id(&self) -> &str {
        use command_ids::*;
        match self {
            Self::Comment(_) => COMMENT,
            Self::Label(_) => LABEL,
            Self::JumpToLabel(_) => JUMP_TO_LABEL,
            Self::Loop => LOOP,
            Self::BreakLoop => BREAK_LOOP,
            Self::ContinueLoop => CONTINUE_LOOP,
            Self::Condition(_) => CONDITION,
            Self::ConditionElse => CONDITION_ELSE,
            Self::ConditionElseIf(_) => CONDITION_ELSE_IF,
            Self::Wait(_) => WAIT,
            Self::ChangeVariable(_) => CHANGE_VARIABLE,
            Self::Script(_) => SCRIPT,
            Self::ShowMessage(_) => SHOW_MESSAGE,
            Self::MessageSettings(_) => MESSAGE_SETTINGS,
            Self::InputNumber(_) => INPUT_NUMBER,
            Self::InputText(_) => INPUT_TEXT,
            Self::ShowChoices(_) => SHOW_CHOICES,
            Self::ObjectEffect(_) => OBJECT_EFFECT,
            Self::CallCommonEvent(_) => CALL_COMMON_EVENT,
            Self::CallScene(_) => CALL_SCENE,
            Self::ExitEvent => EXIT_EVENT,
            Self::Unknown { id, .. } => id.as_str(),
        }
    }

    /// Commands that prompt the player and must re-run after a reload.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::InputNumber(_) | Self::InputText(_) | Self::ShowChoices(_)
        )
    }

    fn params_json(&self) -> serde_json::Value {
        let encoded = match self {
            Self::Comment(params) => serde_json::to_value(params),
            Self::Label(params) | Self::JumpToLabel(params) => serde_json::to_value(params),
            Self::Condition(params) | Self::ConditionElseIf(params) => {
                serde_json::to_value(params)
            }
            Self::Wait(params) => serde_json::to_value(params),
            Self::ChangeVariable(params) => serde_json::to_value(params),
            Self::Script(params) => serde_json::to_value(params),
            Self::ShowMessage(params) => serde_json::to_value(params),
            Self::MessageSettings(params) => serde_json::to_value(params),
            Self::InputNumber(params) => serde_json::to_value(params),
            Self::InputText(params) => serde_json::to_value(params),
            Self::ShowChoices(params) => serde_json::to_value(params),
            Self::ObjectEffect(params) => serde_json::to_value(params),
            Self::CallCommonEvent(params) => serde_json::to_value(params),
            Self::CallScene(params) => serde_json::to_value(params),
            Self::Unknown { params, .. } => return params.clone(),
            Self::Loop
            | Self::BreakLoop
            | Self::ContinueLoop
            | Self::ConditionElse
            | Self::ExitEvent => return serde_json::Value::Null,
        };
        encoded.unwrap_or(serde_json::Value::Null)
    }

    fn from_parts(id: String, params: serde_json::Value) -> Self {
        use command_ids::*;

        fn typed<T: DeserializeOwned>(params: &serde_json::Value) -> Option<T> {
            serde_json::from_value(params.clone()).ok()
        }

        let parsed = match id.as_str() {
            COMMENT => typed(&params).map(Self::Comment),
            LABEL => typed(&params).map(Self::Label),
            JUMP_TO_LABEL => typed(&params).map(Self::JumpToLabel),
            LOOP => Some(Self::Loop),
            BREAK_LOOP => Some(Self::BreakLoop),
            CONTINUE_LOOP => Some(Self::ContinueLoop),
            CONDITION => typed(&params).map(Self::Condition),
            CONDITION_ELSE => Some(Self::ConditionElse),
            CONDITION_ELSE_IF => typed(&params).map(Self::ConditionElseIf),
            WAIT => typed(&params).map(Self::Wait),
            CHANGE_VARIABLE => typed(&params).map(Self::ChangeVariable),
            SCRIPT => typed(&params).map(Self::Script),
            SHOW_MESSAGE => typed(&params).map(Self::ShowMessage),
            MESSAGE_SETTINGS => typed(&params).map(Self::MessageSettings),
            INPUT_NUMBER => typed(&params).map(Self::InputNumber),
            INPUT_TEXT => typed(&params).map(Self::InputText),
            SHOW_CHOICES => typed(&params).map(Self::ShowChoices),
            OBJECT_EFFECT => typed(&params).map(Self::ObjectEffect),
            CALL_COMMON_EVENT => typed(&params).map(Self::CallCommonEvent),
            CALL_SCENE => typed(&params).map(Self::CallScene),
            EXIT_EVENT => Some(Self::ExitEvent),
            _ => None,
        };

        parsed.unwrap_or(Self::Unknown { id, params })
    }
}

/// Wire shape of a command inside a scene or common-event document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RawCommand {
    id: String,
    #[serde(default)]
    indent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
    #[serde(default)]
    params: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCommand", into = "RawCommand")]
pub struct Command {
    pub uid: Option<String>,
    pub indent: u32,
    pub kind: CommandKind,
}

impl Command {
    pub fn new(indent: u32, kind: CommandKind) -> Self {
        Self {
            uid: None,
            indent,
            kind,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn type_id(&self) -> &str {
        self.kind.type_id()
    }

    pub fn is_label_named(&self, name: &str) -> bool {
        matches!(&self.kind, CommandKind::Label(params) if params.name == name)
    }
}

impl From<RawCommand> for Command {
    fn from(raw: RawCommand) -> Self {
        Self {
            uid: raw.uid,
            indent: raw.indent,
            kind: CommandKind::from_parts(raw.id, raw.params),
        }
    }
}

impl From<Command> for RawCommand {
    fn from(command: Command) -> Self {
        Self {
            id: command.kind.type_id().to_string(),
            params: command.kind.params_json(),
            indent: command.indent,
            uid: command.uid,
        }
    }
}
