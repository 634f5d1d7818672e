use std::io::{self, Write};

use crate::errors::{ShellError, ShellResult};
use crate::job_control::{self, SigchldBlock};
use crate::reaper;

/// Process-wide signal dispositions, applied once before the first prompt.
///
/// SIGCHLD stays blocked while the Ctrl-C helper thread is created so that
/// thread inherits the blocked mask; the reaper then only ever runs on the
/// main thread, interleaved with the loop it interrupts.
pub fn install() -> ShellResult<()> {
    let block = SigchldBlock::new().map_err(ShellError::Signal)?;

    // A handled SIGINT is reset to the default disposition on exec, so the
    // interrupt still reaches foreground programs while the shell survives it.
    ctrlc::set_handler(|| {
        println!();
        let _ = io::stdout().flush();
    })
    .map_err(|e| ShellError::Signal(io::Error::other(e)))?;

    job_control::ignore_signal(libc::SIGQUIT).map_err(ShellError::Signal)?;
    reaper::install().map_err(ShellError::Signal)?;

    drop(block);
    tracing::debug!("signal handlers installed");
    Ok(())
}
