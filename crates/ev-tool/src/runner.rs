use std::path::Path;

use ev_api::{BoundaryStop, HeadlessSession, HeadlessSessionOptions};
use ev_core::EngineError;
use ev_runtime::InputRequest;
use serde::Serialize;

use crate::source::{read_documents_json_from_dir, read_test_case};
use crate::{EvToolError, ExpectedEvent, TestAction, TestCase, TESTCASE_FILE};

pub const DEFAULT_FRAME_GUARD: u32 = 100_000;

/// What a case produced when played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRun {
    pub events: Vec<ExpectedEvent>,
    pub actions_used: usize,
    pub frames: u64,
}

/// Plays `case` against the documents in `project_dir`, answering each
/// prompt with the next action. Messages are accepted as they appear.
pub fn run_case(project_dir: &Path, case: &TestCase) -> Result<CaseRun, EvToolError> {
    let mut session = HeadlessSession::open(HeadlessSessionOptions {
        documents_json: read_documents_json_from_dir(project_dir)?,
        entry_scene: Some(case.entry_scene.clone()),
        random_state: case.random_seed,
        temp_settings: case.temp_settings(),
        ..HeadlessSessionOptions::default()
    })?;
    let guard = case.frame_guard.unwrap_or(DEFAULT_FRAME_GUARD);
    let mut actions = case.actions.iter();
    let mut run = CaseRun {
        events: Vec::new(),
        actions_used: 0,
        frames: 0,
    };

    loop {
        let report = session.run_to_boundary(guard)?;
        run.frames += u64::from(report.frames);
        run.events
            .extend(report.messages.into_iter().map(ExpectedEvent::from_message));

        let request = match report.stop {
            BoundaryStop::Finished => break,
            BoundaryStop::FrameLimit => return Err(EvToolError::Stalled { frames: guard }),
            BoundaryStop::Input {
                request: Some(request),
                ..
            } => request,
            BoundaryStop::Input {
                pending,
                request: None,
            } => {
                return Err(EngineError::new(
                    "TOOL_INPUT_REQUEST_MISSING",
                    format!("{:?} wait has no recorded input request.", pending.kind),
                )
                .into())
            }
        };

        run.events.push(ExpectedEvent::from_request(&request));
        answer(&mut session, &request, actions.next(), run.events.len() - 1)?;
        run.actions_used += 1;
    }

    run.events.push(ExpectedEvent::End);
    if run.actions_used < case.actions.len() {
        return Err(EvToolError::LeftoverActions {
            consumed: run.actions_used,
            provided: case.actions.len(),
        });
    }
    log::debug!(
        "{} finished in {} frames with {} events",
        project_dir.display(),
        run.frames,
        run.events.len()
    );
    Ok(run)
}

fn answer(
    session: &mut HeadlessSession,
    request: &InputRequest,
    action: Option<&TestAction>,
    event_index: usize,
) -> Result<(), EvToolError> {
    let wanted = TestAction::kind_for(request);
    let action = action.ok_or(EvToolError::OutOfActions {
        event_index,
        wanted,
    })?;
    match (request, action) {
        (InputRequest::Choice { .. }, TestAction::Choose { index }) => session.choose(*index)?,
        (InputRequest::Text { .. }, TestAction::Input { text }) => session.submit_text(text)?,
        (InputRequest::Number { .. }, TestAction::Number { value }) => {
            session.submit_number(*value)?
        }
        (_, other) => {
            return Err(EvToolError::WrongActionKind {
                event_index,
                wanted,
                given: other.kind_name(),
            })
        }
    }
    Ok(())
}

/// Runs the case at `case_path` and requires the observed events to equal
/// the expected ones.
pub fn assert_case(project_dir: &Path, case_path: &Path) -> Result<CaseRun, EvToolError> {
    let case = read_test_case(case_path)?;
    let run = run_case(project_dir, &case)?;

    if run.events.len() != case.expected_events.len() {
        return Err(EvToolError::EventCount {
            expected: case.expected_events.len(),
            observed: run.events.len(),
            observed_json: encode(&run.events)?,
        });
    }
    if let Some(index) = case
        .expected_events
        .iter()
        .zip(&run.events)
        .position(|(expected, observed)| expected != observed)
    {
        return Err(EvToolError::EventDiff {
            index,
            expected: encode(&case.expected_events[index])?,
            observed: encode(&run.events[index])?,
        });
    }
    Ok(run)
}

/// [`assert_case`] with the project's own `testcase.json`.
pub fn assert_project(project_dir: &Path) -> Result<CaseRun, EvToolError> {
    assert_case(project_dir, &project_dir.join(TESTCASE_FILE))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, EvToolError> {
    serde_json::to_string(value).map_err(EvToolError::EventJson)
}
