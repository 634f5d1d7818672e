use std::io::Write;

use crate::errors::{ShellError, ShellResult};
use crate::job_control::{self, SigchldBlock};
use crate::reaper::ForegroundWatch;
use crate::status::ChildStatus;

/// A launched process the shell is responsible for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub pid: u32,
    pub display_text: String,
    pub is_background: bool,
}

/// What the supervisor did with a job.
#[derive(Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Foreground job collected; `None` if the status could not be decoded.
    Completed(Option<ChildStatus>),
    /// Background job handed to the reaper.
    Detached(u32),
}

/// Wait for a foreground job, or announce a background one and leave it to
/// the reaper.
///
/// `sigchld` must have been taken before the job was launched. A background
/// job keeps it until its notice is written. A foreground job releases it as
/// soon as the job is published to the reaper, so other children are still
/// collected while this one runs.
pub fn supervise(
    record: JobRecord,
    sigchld: SigchldBlock,
    stdout: &mut dyn Write,
) -> ShellResult<JobOutcome> {
    if record.is_background {
        let _ = writeln!(stdout, "PID {} {}", record.pid, record.display_text);
        let _ = stdout.flush();
        drop(sigchld);
        return Ok(JobOutcome::Detached(record.pid));
    }

    let pid = record.pid as libc::pid_t;
    let watch = ForegroundWatch::new(pid);
    drop(sigchld);

    let raw_status = match job_control::wait_for_pid(pid) {
        Ok(raw_status) => raw_status,
        Err(e) if e.raw_os_error() == Some(libc::ECHILD) => match watch.collected() {
            Some(raw_status) => {
                tracing::trace!(pid, "foreground job collected by the reaper");
                raw_status
            }
            None => return Err(ShellError::Wait(e)),
        },
        Err(e) => return Err(ShellError::Wait(e)),
    };

    Ok(JobOutcome::Completed(ChildStatus::from_wait_status(raw_status)))
}
