use std::path::Path;

use ev_api::{HeadlessSession, HeadlessSessionOptions};
use ev_core::EngineError;
use ev_runtime::TempSettings;

use crate::{
    emit_boundary, load_player_state, load_source_by_ref, save_player_state, BoundaryEvent,
    BoundaryResult, LoadedProjectSource, PlayerState, PLAYER_STATE_SCHEMA,
};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SessionTuning {
    pub(crate) random_seed: Option<u32>,
    pub(crate) temp_settings: Option<TempSettings>,
}

pub(crate) fn open_session_for_source(
    source: &LoadedProjectSource,
    tuning: Option<SessionTuning>,
) -> Result<HeadlessSession, EngineError> {
    let tuning = tuning.unwrap_or_default();
    HeadlessSession::open(HeadlessSessionOptions {
        documents_json: source.documents_json.clone(),
        entry_scene: source.entry_scene.clone(),
        random_state: tuning.random_seed,
        temp_settings: tuning.temp_settings,
        ..HeadlessSessionOptions::default()
    })
}

pub(crate) fn resume_session_for_state(
    source: &LoadedProjectSource,
    state: &PlayerState,
) -> Result<HeadlessSession, EngineError> {
    HeadlessSession::open(HeadlessSessionOptions {
        documents_json: source.documents_json.clone(),
        bundle: Some(state.bundle.clone()),
        variables: Some(state.variables.clone()),
        random_state: Some(state.random_state),
        temp_settings: Some(state.temp_settings),
        ..HeadlessSessionOptions::default()
    })
}

pub(crate) fn capture_player_state(
    session: &HeadlessSession,
    project_id: &str,
) -> Result<PlayerState, EngineError> {
    Ok(PlayerState {
        schema_version: PLAYER_STATE_SCHEMA.to_string(),
        project_id: project_id.to_string(),
        bundle: session.to_bundle()?,
        variables: session.variables().borrow().clone(),
        random_state: session.random_state(),
        temp_settings: session.temp_settings(),
    })
}

pub(crate) fn save_session_state(
    path: &Path,
    session: &HeadlessSession,
    project_id: &str,
) -> Result<(), EngineError> {
    let state = capture_player_state(session, project_id)?;
    save_player_state(path, &state)
}

pub(crate) fn load_session_from_state(
    path: &Path,
) -> Result<(LoadedProjectSource, PlayerState, HeadlessSession), EngineError> {
    let state = load_player_state(path)?;
    let source = load_source_by_ref(&state.project_id)?;
    let session = resume_session_for_state(&source, &state)?;
    Ok((source, state, session))
}

pub(crate) fn load_session_from_state_for_source(
    path: &Path,
    source: &LoadedProjectSource,
) -> Result<(PlayerState, HeadlessSession), EngineError> {
    let state = load_player_state(path)?;
    if state.project_id != source.id {
        return Err(EngineError::new(
            "CLI_STATE_PROJECT_MISMATCH",
            format!(
                "State project mismatch. expected={} actual={}",
                source.id, state.project_id
            ),
        ));
    }
    let session = resume_session_for_state(source, &state)?;
    Ok((state, session))
}

/// Saves only when the run stopped on player input; a finished or stalled
/// run has nothing to continue from.
pub(crate) fn emit_boundary_with_saved_state(
    session: &HeadlessSession,
    boundary: BoundaryResult,
    state_out: &str,
    project_id: &str,
) -> Result<i32, EngineError> {
    if matches!(
        boundary.event,
        BoundaryEvent::Choices | BoundaryEvent::InputNumber | BoundaryEvent::InputText
    ) {
        save_session_state(Path::new(state_out), session, project_id)?;
        emit_boundary(boundary, Some(state_out.to_string()));
        return Ok(0);
    }

    emit_boundary(boundary, None);
    Ok(0)
}

#[cfg(test)]
mod session_ops_tests {
    use super::*;
    use crate::cli_test_support::*;
    use crate::{load_source_by_project_dir, run_to_boundary};

    #[test]
    fn saved_state_resumes_at_the_same_choice() {
        let root = write_project("session-ops", &[("main.json", CHOICE_SCENE)]);
        let source = load_source_by_project_dir(&root.to_string_lossy(), None)
            .expect("source should load");
        let mut session = open_session_for_source(
            &source,
            Some(SessionTuning {
                random_seed: Some(42),
                temp_settings: None,
            }),
        )
        .expect("session should open");
        let boundary = run_to_boundary(&mut session, 1_000).expect("boundary should resolve");
        assert_eq!(boundary.event, BoundaryEvent::Choices);

        let state_file = temp_path("session-ops-state.json");
        let code = emit_boundary_with_saved_state(
            &session,
            boundary,
            &state_file.to_string_lossy(),
            &source.id,
        )
        .expect("emit should pass");
        assert_eq!(code, 0);
        drop(session);

        let (loaded_source, state, mut resumed) =
            load_session_from_state(&state_file).expect("state should load");
        assert_eq!(loaded_source.id, source.id);
        assert_eq!(state.random_state, 42);
        assert_eq!(state.bundle.pointer, 1);

        let boundary = run_to_boundary(&mut resumed, 1_000).expect("boundary should resolve");
        assert_eq!(boundary.event, BoundaryEvent::Choices);
        assert!(boundary.texts.is_empty());
    }

    #[test]
    fn state_for_another_project_is_rejected() {
        let root = write_project("session-ops-mismatch", &[("main.json", CHOICE_SCENE)]);
        let source = load_source_by_project_dir(&root.to_string_lossy(), None)
            .expect("source should load");
        let mut session = open_session_for_source(&source, None).expect("session should open");
        run_to_boundary(&mut session, 1_000).expect("boundary should resolve");

        let state_file = temp_path("session-ops-mismatch.json");
        save_session_state(&state_file, &session, "project-dir:/elsewhere")
            .expect("save should pass");
        let error = load_session_from_state_for_source(&state_file, &source)
            .err()
            .expect("mismatch should fail");
        assert_eq!(error.code, "CLI_STATE_PROJECT_MISMATCH");
    }

    #[test]
    fn missing_or_foreign_state_files_fail() {
        let error = load_player_state(&temp_path("absent.json")).expect_err("missing state");
        assert_eq!(error.code, "CLI_STATE_NOT_FOUND");

        let garbage = temp_path("garbage-state.json");
        write_file(&garbage, "{");
        let error = load_player_state(&garbage).expect_err("garbage state");
        assert_eq!(error.code, "CLI_STATE_INVALID");

        let root = write_project("session-ops-schema", &[("main.json", CHOICE_SCENE)]);
        let source = load_source_by_project_dir(&root.to_string_lossy(), None)
            .expect("source should load");
        let session = open_session_for_source(&source, None).expect("session should open");
        let path = temp_path("foreign-state.json");
        save_session_state(&path, &session, &source.id).expect("save should pass");
        let raw = std::fs::read_to_string(&path).expect("state should be readable");
        write_file(&path, &raw.replace(PLAYER_STATE_SCHEMA, "player-state.v0"));
        let error = load_player_state(&path).expect_err("foreign schema");
        assert_eq!(error.code, "CLI_STATE_SCHEMA");
    }
}
