use std::io::{self, BufRead, Write};
use std::path::Path;

use ev_api::HeadlessSession;
use ev_core::EngineError;

use crate::{
    load_session_from_state_for_source, open_session_for_source, run_to_boundary,
    save_session_state, BoundaryEvent, CliStage, LineCommandAction, LineCommandContext,
    SessionTuning,
};

const HELP: &str = "commands: :help :save :load :restart :quit";

fn line_io(error: io::Error) -> EngineError {
    CliStage::LineIo.wrap(error)
}

pub(crate) fn run_line_mode(
    context: &LineCommandContext<'_>,
    session: &mut HeadlessSession,
    max_frames: u32,
) -> Result<i32, EngineError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_line_mode_with_io(context, session, max_frames, &mut reader, &mut writer)
}

pub(crate) fn run_line_mode_with_io(
    context: &LineCommandContext<'_>,
    session: &mut HeadlessSession,
    max_frames: u32,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, EngineError> {
    writeln!(writer, "{}", context.source.title).map_err(line_io)?;
    writeln!(writer, "{}", HELP).map_err(line_io)?;

    loop {
        let boundary = run_to_boundary(session, max_frames)?;
        for text in &boundary.texts {
            match &text.character {
                Some(character) => writeln!(writer, "{}: {}", character, text.text),
                None => writeln!(writer, "{}", text.text),
            }
            .map_err(line_io)?;
        }

        match boundary.event {
            BoundaryEvent::End => {
                writeln!(writer, "[END]").map_err(line_io)?;
                return Ok(0);
            }
            BoundaryEvent::Stalled => {
                writeln!(writer, "[STALLED after {} frames]", boundary.frames)
                    .map_err(line_io)?;
                return Ok(0);
            }
            BoundaryEvent::Choices => {
                if let Some(prompt) = &boundary.prompt_text {
                    writeln!(writer, "{}", prompt).map_err(line_io)?;
                }
                for (index, text) in &boundary.choices {
                    writeln!(writer, "  [{}] {}", index, text).map_err(line_io)?;
                }
            }
            BoundaryEvent::InputNumber => {
                writeln!(
                    writer,
                    "(number, up to {} digits)",
                    boundary.input_limit.unwrap_or_default()
                )
                .map_err(line_io)?;
            }
            BoundaryEvent::InputText => {
                writeln!(writer, "(text)").map_err(line_io)?;
            }
        }

        loop {
            let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                return Ok(0);
            };
            let mut emit = |line: String| {
                let _ = writeln!(writer, "{}", line);
            };
            match handle_line_command(raw.as_str(), context, session, &mut emit)? {
                LineCommandAction::Continue => continue,
                LineCommandAction::RefreshBoundary => break,
                LineCommandAction::Quit => return Ok(0),
                LineCommandAction::NotHandled => {}
            }

            let answered = match boundary.event {
                BoundaryEvent::Choices => raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| {
                        EngineError::new(
                            "CLI_CHOICE_PARSE",
                            format!("Invalid choice index: {}", raw),
                        )
                    })
                    .and_then(|index| session.choose(index)),
                BoundaryEvent::InputNumber => raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| {
                        EngineError::new("CLI_NUMBER_PARSE", format!("Invalid number: {}", raw))
                    })
                    .and_then(|value| session.submit_number(value)),
                _ => session.submit_text(&raw),
            };
            match answered {
                Ok(()) => break,
                Err(error) => writeln!(writer, "error: {}", error).map_err(line_io)?,
            }
        }
    }
}

pub(crate) fn handle_line_command(
    raw: &str,
    context: &LineCommandContext<'_>,
    session: &mut HeadlessSession,
    emit: &mut dyn FnMut(String),
) -> Result<LineCommandAction, EngineError> {
    match raw {
        ":help" => {
            emit(HELP.to_string());
            Ok(LineCommandAction::Continue)
        }
        ":save" => {
            save_session_state(Path::new(context.state_file), session, &context.source.id)?;
            emit(format!("saved: {}", context.state_file));
            Ok(LineCommandAction::Continue)
        }
        ":load" => {
            let (_, resumed) =
                load_session_from_state_for_source(Path::new(context.state_file), context.source)?;
            *session = resumed;
            emit(format!("loaded: {}", context.state_file));
            Ok(LineCommandAction::RefreshBoundary)
        }
        ":restart" => {
            *session = open_session_for_source(
                context.source,
                Some(SessionTuning {
                    random_seed: None,
                    temp_settings: Some(context.temp_settings),
                }),
            )?;
            emit("restarted".to_string());
            Ok(LineCommandAction::RefreshBoundary)
        }
        ":quit" => {
            emit("bye".to_string());
            Ok(LineCommandAction::Quit)
        }
        _ => Ok(LineCommandAction::NotHandled),
    }
}

/// `None` once the reader is exhausted.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, EngineError> {
    write!(writer, "{}", prefix).map_err(line_io)?;
    writer.flush().map_err(line_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(line_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
