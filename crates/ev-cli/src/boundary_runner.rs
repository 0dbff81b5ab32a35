use ev_api::{BoundaryStop, HeadlessSession};
use ev_core::{EngineError, WaitKind};
use ev_runtime::InputRequest;

use crate::{BoundaryEvent, BoundaryResult, BoundaryText};

pub(crate) fn run_to_boundary(
    session: &mut HeadlessSession,
    max_frames: u32,
) -> Result<BoundaryResult, EngineError> {
    let report = session.run_to_boundary(max_frames)?;
    let texts = report
        .messages
        .into_iter()
        .map(|message| BoundaryText {
            character: message.character,
            text: message.text,
        })
        .collect();

    let mut boundary = BoundaryResult {
        event: BoundaryEvent::End,
        frames: report.frames,
        texts,
        choices: Vec::new(),
        prompt_text: None,
        input_limit: None,
    };

    match report.stop {
        BoundaryStop::Finished => {}
        BoundaryStop::FrameLimit => boundary.event = BoundaryEvent::Stalled,
        BoundaryStop::Input { pending, request } => match (pending.kind, request) {
            (WaitKind::Choice, Some(InputRequest::Choice { prompt, choices })) => {
                boundary.event = BoundaryEvent::Choices;
                boundary.prompt_text = prompt;
                boundary.choices = choices.into_iter().enumerate().collect();
            }
            (WaitKind::InputNumber, Some(InputRequest::Number { digits })) => {
                boundary.event = BoundaryEvent::InputNumber;
                boundary.input_limit = Some(digits as usize);
            }
            (WaitKind::InputText, Some(InputRequest::Text { letters })) => {
                boundary.event = BoundaryEvent::InputText;
                boundary.input_limit = Some(letters);
            }
            (kind, _) => {
                return Err(EngineError::new(
                    "CLI_BOUNDARY_UNEXPECTED",
                    format!("No input request recorded for pending {:?} wait.", kind),
                ))
            }
        },
    }

    Ok(boundary)
}

pub(crate) fn emit_boundary(boundary: BoundaryResult, state_out: Option<String>) {
    println!("RESULT:OK");
    match boundary.event {
        BoundaryEvent::Choices => println!("EVENT:CHOICES"),
        BoundaryEvent::InputNumber => println!("EVENT:INPUT_NUMBER"),
        BoundaryEvent::InputText => println!("EVENT:INPUT_TEXT"),
        BoundaryEvent::End => println!("EVENT:END"),
        BoundaryEvent::Stalled => println!("EVENT:STALLED"),
    }
    println!("FRAMES:{}", boundary.frames);

    for text in boundary.texts {
        if let Some(character) = text.character {
            println!(
                "SPEAKER_JSON:{}",
                json_string(character)
            );
        }
        println!(
            "TEXT_JSON:{}",
            json_string(text.text)
        );
    }

    if let Some(prompt) = boundary.prompt_text {
        println!(
            "PROMPT_JSON:{}",
            json_string(prompt)
        );
    }

    for (index, text) in boundary.choices {
        println!(
            "CHOICE:{}|{}",
            index,
            json_string(text)
        );
    }

    if let Some(limit) = boundary.input_limit {
        println!("INPUT_LIMIT:{}", limit);
    }

    println!(
        "STATE_OUT:{}",
        state_out.unwrap_or_else(|| "NONE".to_string())
    );
}

fn json_string(text: String) -> serde_json::Value {
    serde_json::Value::String(text)
}

#[cfg(test)]
mod boundary_runner_tests {
    use super::*;
    use crate::cli_test_support::*;
    use crate::{load_source_by_project_dir, open_session_for_source};

    #[test]
    fn run_to_boundary_reports_texts_and_choices() {
        let root = write_project("boundary-choices", &[("main.json", CHOICE_SCENE)]);
        let source = load_source_by_project_dir(&root.to_string_lossy(), None)
            .expect("source should load");
        let mut session = open_session_for_source(&source, None).expect("session should open");

        let boundary = run_to_boundary(&mut session, 1_000).expect("boundary should resolve");
        assert_eq!(boundary.event, BoundaryEvent::Choices);
        assert_eq!(
            boundary.texts,
            vec![BoundaryText {
                character: Some("Guide".to_string()),
                text: "Pick a door.".to_string(),
            }]
        );
        assert_eq!(boundary.prompt_text.as_deref(), Some("Which one?"));
        assert_eq!(
            boundary.choices,
            vec![(0, "Left".to_string()), (1, "Right".to_string())]
        );

        session.choose(1).expect("choice should resolve");
        let boundary = run_to_boundary(&mut session, 1_000).expect("boundary should resolve");
        assert_eq!(boundary.event, BoundaryEvent::End);
        assert_eq!(boundary.texts[0].text, "You chose 1.");
    }

    #[test]
    fn run_to_boundary_reports_stalls_and_inputs() {
        let root = write_project(
            "boundary-inputs",
            &[(
                "main.json",
                r#"{"kind":"scene","uid":"main","commands":[
                    {"id":"wait","params":{"duration":1000}},
                    {"id":"inputNumber","params":{"target":{"scope":"global","index":1},"digits":4}}
                ]}"#,
            )],
        );
        let source = load_source_by_project_dir(&root.to_string_lossy(), None)
            .expect("source should load");
        let mut session = open_session_for_source(&source, None).expect("session should open");

        let boundary = run_to_boundary(&mut session, 5).expect("boundary should resolve");
        assert_eq!(boundary.event, BoundaryEvent::Stalled);
        assert_eq!(boundary.frames, 5);

        let boundary = run_to_boundary(&mut session, 1_000).expect("boundary should resolve");
        assert_eq!(boundary.event, BoundaryEvent::InputNumber);
        assert_eq!(boundary.input_limit, Some(4));
    }
}
