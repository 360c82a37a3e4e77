use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use tubewire_channel::{beanstalk, BeanstalkChannel};

use crate::exit::{channel_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod get;
pub mod listen;
pub mod put;
pub mod version;
pub mod waiting;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Put one message on a tube.
    Put(PutArgs),
    /// Take one message from a tube and print it.
    Get(GetArgs),
    /// Report whether a tube has messages ready.
    Waiting(WaitingArgs),
    /// Print messages from a tube until interrupted.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Put(args) => put::run(args, format),
        Command::Get(args) => get::run(args, format),
        Command::Waiting(args) => waiting::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct TubeArgs {
    /// Daemon address (beanstalk://host[:port], host[:port] or memory://name).
    pub url: String,
    /// Tube name.
    pub tube: String,
}

impl TubeArgs {
    pub fn open(&self) -> CliResult<BeanstalkChannel> {
        beanstalk(&self.url, Some(&self.tube)).map_err(|err| channel_error("open failed", err))
    }
}

#[derive(Args, Debug)]
pub struct PutArgs {
    #[command(flatten)]
    pub target: TubeArgs,
    /// JSON payload, sent as structured data.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// String payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read a binary payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: TubeArgs,
    /// Maximum time to wait (e.g. 5s, 500ms, 0s).
    #[arg(long, default_value = "5s", conflicts_with = "block")]
    pub timeout: String,
    /// Wait until a message arrives, however long it takes.
    #[arg(long)]
    pub block: bool,
}

#[derive(Args, Debug)]
pub struct WaitingArgs {
    #[command(flatten)]
    pub target: TubeArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub target: TubeArgs,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
