//! Command-line flags.

use clap::{Parser, ValueEnum};

use crate::builtins::BuiltinMatch;

pub const DEFAULT_PROMPT: &str = "[SHELL]> ";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "bas-shell",
    version,
    about = "A small interactive command interpreter.",
    long_about = None
)]
pub struct CliArgs {
    /// Text printed before each line is read.
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_PROMPT)]
    pub prompt: String,

    /// How command names are matched against builtins.
    ///
    /// `prefix` lets a truncated name such as `c` run `cd`.
    #[arg(long, value_enum, value_name = "MODE", default_value_t = BuiltinMatch::Exact)]
    pub builtin_match: BuiltinMatch,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BAS_SHELL_LOG` or `warn` is used. Logs go to stderr.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
