use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use ev_core::EngineError;

use crate::{CliStage, PlayerState, PLAYER_STATE_SCHEMA};

/// Stages `state` in a sibling temp file, then renames it over `path`.
pub(crate) fn save_player_state(path: &Path, state: &PlayerState) -> Result<(), EngineError> {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(directory).map_err(CliStage::StateWrite.mapper())?;

    let payload = serde_json::to_string_pretty(state).map_err(CliStage::StateWrite.mapper())?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, payload).map_err(CliStage::StateWrite.mapper())?;
    fs::rename(&staging, path).map_err(CliStage::StateWrite.mapper())?;
    log::debug!("saved player state to {}", path.display());
    Ok(())
}

pub(crate) fn load_player_state(path: &Path) -> Result<PlayerState, EngineError> {
    let raw = fs::read_to_string(path).map_err(|error| match error.kind() {
        ErrorKind::NotFound => EngineError::new(
            "CLI_STATE_NOT_FOUND",
            format!("State file does not exist: {}", path.display()),
        ),
        _ => CliStage::StateRead.wrap(error),
    })?;

    // Schema first: an old save reports its version, not a missing field.
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(CliStage::StateDecode.mapper())?;
    let schema = value
        .get("schemaVersion")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("<missing>");
    if schema != PLAYER_STATE_SCHEMA {
        return Err(EngineError::new(
            "CLI_STATE_SCHEMA",
            format!("Unsupported player state schema: {}", schema),
        ));
    }

    serde_json::from_value(value).map_err(CliStage::StateDecode.mapper())
}
