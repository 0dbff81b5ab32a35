//! Scripted playthrough checks for event projects.
//!
//! A project directory holds scene and common-event documents plus a
//! `testcase.json` listing the player's answers and the events the run must
//! produce. [`assert_project`] plays it headlessly and reports the first
//! divergence.

mod case;
mod runner;
mod source;

pub use case::{ExpectedEvent, TestAction, TestCase, TESTCASE_FILE, TESTCASE_SCHEMA_V1};
pub use runner::{assert_case, assert_project, run_case, CaseRun, DEFAULT_FRAME_GUARD};
pub use source::{read_documents_json_from_dir, read_test_case};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvToolError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("testcase {path} is not valid: {source}")]
    CaseJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("testcase schema \"{found}\" is not supported, expected \"{}\"", TESTCASE_SCHEMA_V1)]
    UnsupportedSchema { found: String },
    #[error("project {path} has no scene or common event documents")]
    NoDocuments { path: PathBuf },
    #[error("engine: {0}")]
    Engine(#[from] ev_core::EngineError),
    #[error("event {event_index} asks for `{wanted}` but no actions are left")]
    OutOfActions {
        event_index: usize,
        wanted: &'static str,
    },
    #[error("event {event_index} asks for `{wanted}` but the next action is `{given}`")]
    WrongActionKind {
        event_index: usize,
        wanted: &'static str,
        given: &'static str,
    },
    #[error("only {consumed} of {provided} actions were used before the run ended")]
    LeftoverActions { consumed: usize, provided: usize },
    #[error("no boundary within {frames} frames")]
    Stalled { frames: u32 },
    #[error("expected {expected} events, observed {observed}: {observed_json}")]
    EventCount {
        expected: usize,
        observed: usize,
        observed_json: String,
    },
    #[error("event {index} differs: expected {expected}, observed {observed}")]
    EventDiff {
        index: usize,
        expected: String,
        observed: String,
    },
    #[error("cannot encode events: {0}")]
    EventJson(serde_json::Error),
}
