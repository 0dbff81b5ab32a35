use ev_runtime::{InputRequest, MessageRequest, TempSettings};
use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "ev-tool-case.v1";
pub const TESTCASE_FILE: &str = "testcase.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    #[serde(default = "main_scene")]
    pub entry_scene: String,
    #[serde(default)]
    pub random_seed: Option<u32>,
    /// Runs with instant skip so waits and effects take no frames.
    #[serde(default)]
    pub skip: bool,
    /// Frames allowed between two boundaries before the run counts as stalled.
    #[serde(default)]
    pub frame_guard: Option<u32>,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub expected_events: Vec<ExpectedEvent>,
}

fn main_scene() -> String {
    "main".to_string()
}

impl TestCase {
    pub(crate) fn temp_settings(&self) -> Option<TempSettings> {
        self.skip.then_some(TempSettings {
            skip: true,
            skip_time: 0,
        })
    }
}

/// One answer to a player prompt, consumed in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TestAction {
    Choose { index: usize },
    Input { text: String },
    Number { value: f64 },
}

impl TestAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Choose { .. } => "choose",
            Self::Input { .. } => "input",
            Self::Number { .. } => "number",
        }
    }

    /// Kind of action that answers `request`.
    pub fn kind_for(request: &InputRequest) -> &'static str {
        match request {
            InputRequest::Choice { .. } => "choose",
            InputRequest::Text { .. } => "input",
            InputRequest::Number { .. } => "number",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExpectedEvent {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        character: Option<String>,
        text: String,
    },
    Choices {
        #[serde(default, rename = "promptText", skip_serializing_if = "Option::is_none")]
        prompt_text: Option<String>,
        choices: Vec<String>,
    },
    InputNumber {
        digits: u32,
    },
    InputText {
        letters: usize,
    },
    End,
}

impl ExpectedEvent {
    pub fn from_message(message: MessageRequest) -> Self {
        Self::Text {
            character: message.character,
            text: message.text,
        }
    }

    pub fn from_request(request: &InputRequest) -> Self {
        match request {
            InputRequest::Choice { prompt, choices } => Self::Choices {
                prompt_text: prompt.clone(),
                choices: choices.clone(),
            },
            InputRequest::Number { digits } => Self::InputNumber { digits: *digits },
            InputRequest::Text { letters } => Self::InputText { letters: *letters },
        }
    }
}

#[cfg(test)]
mod case_tests {
    use super::*;

    #[test]
    fn minimal_case_fills_defaults() {
        let case: TestCase =
            serde_json::from_str(r#"{"schemaVersion":"ev-tool-case.v1"}"#).expect("case parses");

        assert_eq!(case.entry_scene, "main");
        assert_eq!(case.random_seed, None);
        assert_eq!(case.frame_guard, None);
        assert!(case.actions.is_empty());
        assert!(case.expected_events.is_empty());
        assert_eq!(case.temp_settings(), None);
    }

    #[test]
    fn skip_turns_into_instant_temp_settings() {
        let case: TestCase =
            serde_json::from_str(r#"{"schemaVersion":"ev-tool-case.v1","skip":true}"#)
                .expect("case parses");
        assert_eq!(
            case.temp_settings(),
            Some(TempSettings {
                skip: true,
                skip_time: 0
            })
        );
    }

    #[test]
    fn requests_map_to_events_and_action_kinds() {
        let choice = InputRequest::Choice {
            prompt: None,
            choices: vec!["Yes".to_string(), "No".to_string()],
        };
        assert_eq!(TestAction::kind_for(&choice), "choose");
        assert_eq!(
            serde_json::to_string(&ExpectedEvent::from_request(&choice)).expect("encode"),
            r#"{"kind":"choices","choices":["Yes","No"]}"#
        );

        let number = InputRequest::Number { digits: 4 };
        assert_eq!(TestAction::kind_for(&number), "number");
        assert_eq!(
            ExpectedEvent::from_request(&number),
            ExpectedEvent::InputNumber { digits: 4 }
        );

        let text = InputRequest::Text { letters: 0 };
        assert_eq!(TestAction::kind_for(&text), TestAction::Input { text: String::new() }.kind_name());
        assert_eq!(
            ExpectedEvent::from_request(&text),
            ExpectedEvent::InputText { letters: 0 }
        );
    }

    #[test]
    fn events_read_back_from_authored_json() {
        let events: Vec<ExpectedEvent> = serde_json::from_str(
            r#"[
  {"kind":"text","character":"Ann","text":"Hi"},
  {"kind":"choices","promptText":"Go?","choices":["A"]},
  {"kind":"inputText","letters":8},
  {"kind":"end"}
]"#,
        )
        .expect("events parse");

        assert_eq!(
            events[0],
            ExpectedEvent::Text {
                character: Some("Ann".to_string()),
                text: "Hi".to_string()
            }
        );
        assert!(matches!(&events[1], ExpectedEvent::Choices { prompt_text: Some(p), .. } if p == "Go?"));
        assert_eq!(events[2], ExpectedEvent::InputText { letters: 8 });
        assert_eq!(events[3], ExpectedEvent::End);
    }
}
