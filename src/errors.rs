use std::io;

use thiserror::Error;

/// Every failure the interpreter can report.
///
/// The `Display` text is exactly the diagnostic line printed to stderr:
/// a short label followed by the system error description. No variant
/// exposes a `source()`.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("fork error: {}", describe(.0))]
    Fork(io::Error),

    #[error("waitpid error: {}", describe(.0))]
    Wait(io::Error),

    #[error("could not execute {program}: {}", describe(.error))]
    Exec { program: String, error: io::Error },

    #[error("{path}: {}", describe(.error))]
    Redirect { path: String, error: io::Error },

    #[error("syntax error: expected filename after '{operator}'")]
    RedirectSyntax { operator: String },

    #[error("cd: {target}: {}", describe(.error))]
    ChangeDir { target: String, error: io::Error },

    #[error("cd: HOME not set")]
    HomeNotSet,

    #[error("input line too long ({len} bytes)")]
    LineTooLong { len: usize },

    #[error("too many arguments ({count})")]
    TooManyArguments { count: usize },

    #[error("signal setup error: {}", describe(.0))]
    Signal(io::Error),

    #[error("io error: {}", describe(.0))]
    Io(io::Error),
}

impl ShellError {
    /// Fatal errors end the whole session; everything else only ends the
    /// current command.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::Fork(_) | ShellError::Wait(_) | ShellError::Signal(_) | ShellError::Io(_)
        )
    }
}

impl From<io::Error> for ShellError {
    fn from(error: io::Error) -> Self {
        ShellError::Io(error)
    }
}

pub type ShellResult<T> = Result<T, ShellError>;

/// `io::Error` text without the trailing ` (os error N)`, so it reads like `strerror`.
pub fn describe(error: &io::Error) -> String {
    let text = error.to_string();
    match text.rfind(" (os error ") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}
