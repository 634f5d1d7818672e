use std::io;
use std::process;

use crate::errors::{ShellError, ShellResult};
use crate::jobs::JobRecord;
use crate::parser::Command;

/// Spawn failures that mean the process table or memory is exhausted, as
/// opposed to the program image being unusable.
fn is_fork_failure(error: &io::Error) -> bool {
    matches!(error.raw_os_error(), Some(libc::EAGAIN) | Some(libc::ENOMEM))
}

/// Launch an external program for `cmd`.
///
/// The child inherits the shell's environment and its current fd 0/1/2, so
/// any redirection already applied to the shell carries over. If the image
/// cannot be executed the failure is reported here and no child is left
/// behind; only fork failures are fatal.
pub fn launch(cmd: &Command) -> ShellResult<JobRecord> {
    let Some((program, args)) = cmd.arguments.split_first() else {
        return Err(ShellError::Exec {
            program: String::new(),
            error: io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
        });
    };

    match process::Command::new(program).args(args).spawn() {
        Ok(child) => {
            let record = JobRecord {
                pid: child.id(),
                display_text: cmd.raw_text.clone(),
                is_background: cmd.is_background,
            };
            tracing::debug!(pid = record.pid, program = ?program, background = record.is_background, "launched");
            // Dropping `Child` neither waits nor kills; the supervisor or the
            // reaper collects the pid.
            Ok(record)
        }
        Err(e) if is_fork_failure(&e) => Err(ShellError::Fork(e)),
        Err(e) => Err(ShellError::Exec {
            program: program.to_string_lossy().into_owned(),
            error: e,
        }),
    }
}
