use std::path::Path;

use ev_api::HeadlessSession;
use ev_core::EngineError;

use crate::{
    emit_boundary_with_saved_state, load_session_from_state, load_source_by_project_dir,
    open_session_for_source, run_to_boundary, AgentArgs, AgentCommand, ChooseArgs, InputArgs,
    NumberArgs, SessionTuning, StartArgs,
};

pub(super) fn run_agent(args: AgentArgs) -> Result<i32, EngineError> {
    match args.command {
        AgentCommand::Start(args) => run_start(args),
        AgentCommand::Choose(args) => run_choose(args),
        AgentCommand::Input(args) => run_input(args),
        AgentCommand::Number(args) => run_number(args),
    }
}

pub(super) fn run_start(args: StartArgs) -> Result<i32, EngineError> {
    let source = load_source_by_project_dir(&args.project_dir, args.entry_scene.as_deref())?;
    let mut session = open_session_for_source(
        &source,
        Some(SessionTuning {
            random_seed: args.seed,
            temp_settings: None,
        }),
    )?;

    let boundary = run_to_boundary(&mut session, args.max_frames)?;
    emit_boundary_with_saved_state(&session, boundary, &args.state_out, &source.id)
}

pub(super) fn run_choose(args: ChooseArgs) -> Result<i32, EngineError> {
    run_state_transition(&args.state_in, &args.state_out, args.max_frames, |session| {
        session.choose(args.choice)
    })
}

pub(super) fn run_input(args: InputArgs) -> Result<i32, EngineError> {
    run_state_transition(&args.state_in, &args.state_out, args.max_frames, |session| {
        session.submit_text(&args.text)
    })
}

pub(super) fn run_number(args: NumberArgs) -> Result<i32, EngineError> {
    run_state_transition(&args.state_in, &args.state_out, args.max_frames, |session| {
        session.submit_number(args.value)
    })
}

/// Resumes a saved state, which re-prompts the input it stopped on, then
/// answers that prompt and runs to the next boundary.
fn run_state_transition(
    state_in: &str,
    state_out: &str,
    max_frames: u32,
    transition: impl FnOnce(&mut HeadlessSession) -> Result<(), EngineError>,
) -> Result<i32, EngineError> {
    let (source, state, mut session) = load_session_from_state(Path::new(state_in))?;
    log::debug!("resuming {} from {}", source.title, state_in);
    run_to_boundary(&mut session, max_frames)?;
    transition(&mut session)?;
    let boundary = run_to_boundary(&mut session, max_frames)?;
    emit_boundary_with_saved_state(&session, boundary, state_out, &state.project_id)
}
