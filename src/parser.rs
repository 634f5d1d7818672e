use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::errors::{ShellError, ShellResult};

/// Longest accepted input line, in bytes.
pub const MAX_LINE: usize = 4096;
/// Largest accepted argument vector.
pub const MAX_ARGS: usize = 256;

/// One input line, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The line as typed, minus its terminator. Shown in background notices.
    pub raw_text: String,
    /// Program name followed by its arguments, in exec order. Bytes are kept
    /// as typed, so names that are not valid UTF-8 still reach `exec`.
    pub arguments: Vec<OsString>,
    /// Set when the last token was a standalone `&`.
    pub is_background: bool,
    /// Cleared when there is nothing left to launch (empty line, builtin).
    pub should_spawn: bool,
}

impl Command {
    pub fn program(&self) -> Option<&OsStr> {
        self.arguments.first().map(OsString::as_os_str)
    }
}

fn is_separator(byte: &u8) -> bool {
    byte.is_ascii_whitespace() || matches!(*byte, b'\0' | b'\x0b')
}

/// Split a raw input line into a [`Command`].
///
/// No quoting, escaping or expansion: every run of whitespace separates two
/// arguments. A trailing `&` token is removed and marks the command as a
/// background job.
pub fn tokenize<L: AsRef<[u8]> + ?Sized>(line: &L) -> ShellResult<Command> {
    let mut raw = line.as_ref();
    while let [rest @ .., b'\n' | b'\r'] = raw {
        raw = rest;
    }
    if raw.len() > MAX_LINE {
        return Err(ShellError::LineTooLong { len: raw.len() });
    }

    let mut arguments: Vec<OsString> = raw
        .split(is_separator)
        .filter(|token| !token.is_empty())
        .map(|token| OsStr::from_bytes(token).to_os_string())
        .collect();

    let is_background = arguments.last().is_some_and(|last| last == "&");
    if is_background {
        arguments.pop();
    }

    if arguments.len() > MAX_ARGS {
        return Err(ShellError::TooManyArguments {
            count: arguments.len(),
        });
    }

    let should_spawn = !arguments.is_empty();
    Ok(Command {
        raw_text: String::from_utf8_lossy(raw).into_owned(),
        arguments,
        is_background,
        should_spawn,
    })
}
