use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::errors::{ShellError, ShellResult};
use crate::parser::Command;

/// Where a standard stream should be pointed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    /// `< path`
    FileRead(OsString),
    /// `> path`
    File(OsString),
    /// `>> path`
    FileAppend(OsString),
}

impl RedirectTarget {
    fn path(&self) -> &OsStr {
        match self {
            RedirectTarget::FileRead(p) | RedirectTarget::File(p) | RedirectTarget::FileAppend(p) => p,
        }
    }

    fn open(&self) -> io::Result<File> {
        match self {
            RedirectTarget::FileRead(path) => File::open(path),
            RedirectTarget::File(path) => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path),
            RedirectTarget::FileAppend(path) => {
                OpenOptions::new().append(true).create(true).open(path)
            }
        }
    }
}

/// A single I/O redirection instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub fd: RawFd,
    pub target: RedirectTarget,
}

/// Strip every `<`, `>` and `>>` operator and its filename from the command's
/// arguments, returning the redirections in scan order.
///
/// A command left with no arguments is not spawned. An operator without a
/// filename is a syntax error.
pub fn extract_redirections(command: &mut Command) -> ShellResult<Vec<Redirection>> {
    let tokens = std::mem::take(&mut command.arguments);
    let mut redirections = Vec::new();
    let mut tokens = tokens.into_iter();

    while let Some(token) = tokens.next() {
        let fd = match token.to_str() {
            Some("<") => Some(libc::STDIN_FILENO),
            Some(">" | ">>") => Some(libc::STDOUT_FILENO),
            _ => None,
        };
        let Some(fd) = fd else {
            command.arguments.push(token);
            continue;
        };

        let Some(path) = tokens.next() else {
            command.arguments.clear();
            command.should_spawn = false;
            return Err(ShellError::RedirectSyntax {
                operator: token.to_string_lossy().into_owned(),
            });
        };
        let target = match token.to_str() {
            Some("<") => RedirectTarget::FileRead(path),
            Some(">") => RedirectTarget::File(path),
            _ => RedirectTarget::FileAppend(path),
        };
        redirections.push(Redirection { fd, target });
    }

    if command.arguments.is_empty() {
        command.should_spawn = false;
    }
    Ok(redirections)
}

/// Duplicates of the shell's own stdin and stdout, taken once at startup.
pub struct SavedStreams {
    stdin: OwnedFd,
    stdout: OwnedFd,
}

impl SavedStreams {
    pub fn save() -> io::Result<Self> {
        Ok(Self {
            stdin: dup_cloexec(libc::STDIN_FILENO)?,
            stdout: dup_cloexec(libc::STDOUT_FILENO)?,
        })
    }

    /// Point fd 0/1 at the redirection targets, in order.
    ///
    /// The first target that cannot be opened or duplicated is reported to
    /// `stderr` and ends processing; redirections applied before it stay in
    /// effect. Whatever was applied is undone when the guard drops.
    pub fn apply(&self, redirections: &[Redirection], stderr: &mut dyn Write) -> RedirectGuard<'_> {
        let mut guard = RedirectGuard {
            saved: self,
            stdin: false,
            stdout: false,
        };

        for redirection in redirections {
            if let Err(error) = guard.deflect(redirection) {
                let err = ShellError::Redirect {
                    path: redirection.target.path().to_string_lossy().into_owned(),
                    error,
                };
                let _ = writeln!(stderr, "{err}");
                break;
            }
        }

        guard
    }
}

/// Keeps fd 0/1 deflected until dropped, then points them back at the
/// shell's original streams.
pub struct RedirectGuard<'a> {
    saved: &'a SavedStreams,
    stdin: bool,
    stdout: bool,
}

impl RedirectGuard<'_> {
    fn deflect(&mut self, redirection: &Redirection) -> io::Result<()> {
        let file = redirection.target.open()?;
        if redirection.fd == libc::STDOUT_FILENO {
            io::stdout().flush()?;
        }
        dup2(file.as_raw_fd(), redirection.fd)?;
        match redirection.fd {
            libc::STDIN_FILENO => self.stdin = true,
            _ => self.stdout = true,
        }
        tracing::debug!(fd = redirection.fd, path = ?redirection.target.path(), "redirected");
        Ok(())
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.stdin || self.stdout
    }
}

impl Drop for RedirectGuard<'_> {
    fn drop(&mut self) {
        if self.stdout {
            let _ = io::stdout().flush();
            if let Err(e) = dup2(self.saved.stdout.as_raw_fd(), libc::STDOUT_FILENO) {
                tracing::error!("failed to restore stdout: {e}");
            }
        }
        if self.stdin {
            if let Err(e) = dup2(self.saved.stdin.as_raw_fd(), libc::STDIN_FILENO) {
                tracing::error!("failed to restore stdin: {e}");
            }
        }
    }
}

fn dup_cloexec(fd: RawFd) -> io::Result<OwnedFd> {
    // Park the copy above the low descriptors commands are likely to use.
    let rc = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 10) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(rc) })
}

fn dup2(src: RawFd, dst: RawFd) -> io::Result<()> {
    loop {
        let rc = unsafe { libc::dup2(src, dst) };
        if rc >= 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        return Err(err);
    }
}
