use std::fmt::Display;
use std::io::Write;

use ev_core::EngineError;

/// CLI-side step that failed. Each maps a foreign error onto a stable code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliStage {
    LineIo,
    SourcePath,
    SourceScan,
    SourceRead,
    StateWrite,
    StateRead,
    StateDecode,
}

impl CliStage {
    pub(crate) fn code(self) -> &'static str {
        match self {
            Self::LineIo => "CLI_LINE_IO",
            Self::SourcePath => "CLI_SOURCE_PATH",
            Self::SourceScan => "CLI_SOURCE_SCAN",
            Self::SourceRead => "CLI_SOURCE_READ",
            Self::StateWrite => "CLI_STATE_WRITE",
            Self::StateRead => "CLI_STATE_READ",
            Self::StateDecode => "CLI_STATE_INVALID",
        }
    }

    pub(crate) fn wrap(self, error: impl Display) -> EngineError {
        EngineError::new(self.code(), error.to_string())
    }

    /// `wrap` as a `map_err` argument.
    pub(crate) fn mapper<E: Display>(self) -> impl Fn(E) -> EngineError {
        move |error| self.wrap(error)
    }
}

pub(crate) fn emit_error(error: EngineError) -> i32 {
    log::error!("{}", error);
    let mut stdout = std::io::stdout().lock();
    // Nothing is left to report a broken stdout to.
    let _ = write_error_lines(&mut stdout, &error);
    1
}

fn write_error_lines(out: &mut dyn Write, error: &EngineError) -> std::io::Result<()> {
    writeln!(out, "RESULT:ERROR")?;
    writeln!(out, "ERROR_CODE:{}", error.code)?;
    writeln!(
        out,
        "ERROR_MSG_JSON:{}",
        serde_json::Value::String(error.message.clone())
    )
}
