use clap::{Args, Parser, Subcommand};

pub(crate) const DEFAULT_MAX_FRAMES: u32 = 100_000;

#[derive(Debug, Parser)]
#[command(name = "evcmd")]
#[command(about = "Headless player for event command projects")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    Agent(AgentArgs),
    Play(PlayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct AgentArgs {
    #[command(subcommand)]
    pub(crate) command: AgentCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum AgentCommand {
    Start(StartArgs),
    Choose(ChooseArgs),
    Input(InputArgs),
    Number(NumberArgs),
}

#[derive(Debug, Args)]
pub(crate) struct StartArgs {
    #[arg(long = "project-dir")]
    pub(crate) project_dir: String,
    #[arg(long = "entry-scene")]
    pub(crate) entry_scene: Option<String>,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    #[arg(long = "max-frames", default_value_t = DEFAULT_MAX_FRAMES)]
    pub(crate) max_frames: u32,
}

#[derive(Debug, Args)]
pub(crate) struct ChooseArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "choice")]
    pub(crate) choice: usize,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
    #[arg(long = "max-frames", default_value_t = DEFAULT_MAX_FRAMES)]
    pub(crate) max_frames: u32,
}

#[derive(Debug, Args)]
pub(crate) struct InputArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "text")]
    pub(crate) text: String,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
    #[arg(long = "max-frames", default_value_t = DEFAULT_MAX_FRAMES)]
    pub(crate) max_frames: u32,
}

#[derive(Debug, Args)]
pub(crate) struct NumberArgs {
    #[arg(long = "state-in")]
    pub(crate) state_in: String,
    #[arg(long = "value", allow_hyphen_values = true)]
    pub(crate) value: f64,
    #[arg(long = "state-out")]
    pub(crate) state_out: String,
    #[arg(long = "max-frames", default_value_t = DEFAULT_MAX_FRAMES)]
    pub(crate) max_frames: u32,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[arg(long = "project-dir")]
    pub(crate) project_dir: String,
    #[arg(long = "entry-scene")]
    pub(crate) entry_scene: Option<String>,
    #[arg(long = "state-file")]
    pub(crate) state_file: Option<String>,
    /// Fast-forwards waits and effects.
    #[arg(long = "skip")]
    pub(crate) skip: bool,
    #[arg(long = "max-frames", default_value_t = DEFAULT_MAX_FRAMES)]
    pub(crate) max_frames: u32,
}
