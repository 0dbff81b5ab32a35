use std::ffi::OsString;

use clap::Parser;
use ev_core::EngineError;
use ev_runtime::TempSettings;

mod agent;
mod boundary_runner;
mod cli_args;
mod error_map;
mod line_mode;
mod models;
mod session_ops;
mod source_loader;
mod state_store;

pub(crate) use boundary_runner::{emit_boundary, run_to_boundary};
pub(crate) use cli_args::{
    AgentArgs, AgentCommand, ChooseArgs, Cli, InputArgs, Mode, NumberArgs, PlayArgs, StartArgs,
};
pub(crate) use error_map::{emit_error, CliStage};
pub(crate) use line_mode::run_line_mode;
pub(crate) use models::{
    BoundaryEvent, BoundaryResult, BoundaryText, LineCommandAction, LineCommandContext,
    LoadedProjectSource, PlayerState, PLAYER_STATE_SCHEMA,
};
pub(crate) use session_ops::{
    emit_boundary_with_saved_state, load_session_from_state, load_session_from_state_for_source,
    open_session_for_source, save_session_state, SessionTuning,
};
pub(crate) use source_loader::{load_source_by_project_dir, load_source_by_ref};
pub(crate) use state_store::{load_player_state, save_player_state};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, EngineError> {
    match cli.command {
        Mode::Agent(args) => agent::run_agent(args),
        Mode::Play(args) => run_play(args),
    }
}

fn run_play(args: PlayArgs) -> Result<i32, EngineError> {
    let state_file = args
        .state_file
        .unwrap_or(".evcmd/save.json".to_string());
    let source = load_source_by_project_dir(&args.project_dir, args.entry_scene.as_deref())?;
    let temp_settings = TempSettings {
        skip: args.skip,
        skip_time: 0,
    };
    let mut session = open_session_for_source(
        &source,
        Some(SessionTuning {
            random_seed: None,
            temp_settings: Some(temp_settings),
        }),
    )?;

    let context = LineCommandContext {
        state_file: &state_file,
        source: &source,
        temp_settings,
    };
    run_line_mode(&context, &mut session, args.max_frames)
}

#[cfg(test)]
pub(crate) mod cli_test_support {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub(crate) const CHOICE_SCENE: &str = r#"{
  "kind": "scene",
  "uid": "main",
  "commands": [
    { "id": "showMessage", "params": { "character": "Guide", "text": "Pick a door." } },
    {
      "id": "showChoices",
      "params": { "prompt": "Which one?", "choices": ["Left", "Right"], "target": { "scope": "global", "index": 0 } }
    },
    { "id": "showMessage", "params": { "text": "You chose ${get_number(\"global\", 0)}." } }
  ]
}"#;

    pub(crate) const MAIN_SCENE: &str = r#"{"kind":"scene","uid":"main","commands":[]}"#;

    pub(crate) fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("evcmd-{}-{}", name, nanos))
    }

    pub(crate) fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent should be created");
        }
        fs::write(path, content).expect("file should be written");
    }

    pub(crate) fn write_project(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = temp_path(name);
        for (relative, content) in files {
            write_file(&root.join(relative), content);
        }
        root
    }
}
