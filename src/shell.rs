use std::io::{self, BufRead, Read, Write};

use crate::builtins::{self, BuiltinAction, BuiltinMatch};
use crate::errors::{ShellError, ShellResult};
use crate::executor;
use crate::job_control::SigchldBlock;
use crate::jobs::{self, JobOutcome};
use crate::parser::{self, MAX_LINE};
use crate::reaper;
use crate::redirect::{self, SavedStreams};
use crate::status::ChildStatus;

/// What the loop should do after a line has been handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Interpreter state that outlives a single line.
pub struct Shell {
    prompt: String,
    builtin_match: BuiltinMatch,
    streams: SavedStreams,
}

impl Shell {
    pub fn new(prompt: String, builtin_match: BuiltinMatch) -> io::Result<Self> {
        Ok(Self {
            prompt,
            builtin_match,
            streams: SavedStreams::save()?,
        })
    }

    /// Prompt, read and execute until `exit`, end of input, or a fatal error.
    pub fn run(&mut self) -> ShellResult<()> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut line = Vec::new();

        loop {
            let reaped = reaper::take_terminated();
            if reaped > 0 {
                tracing::debug!(reaped, "background children collected");
            }

            print!("{}", self.prompt);
            io::stdout().flush()?;

            let Some(len) = read_line(&mut input, &mut line)? else {
                println!();
                return Ok(());
            };
            if len > line.len() {
                // Only the head of the line was kept; the rest is gone.
                eprintln!("{}", ShellError::LineTooLong { len });
                continue;
            }

            match self.execute_line(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => eprintln!("{e}"),
            }
        }
    }

    /// Tokenize, redirect, dispatch and supervise one line.
    ///
    /// Redirections applied here are undone before this returns, whatever
    /// the outcome.
    pub fn execute_line(&mut self, line: &[u8]) -> ShellResult<Flow> {
        let mut command = parser::tokenize(line)?;
        if command.arguments.is_empty() {
            return Ok(Flow::Continue);
        }
        tracing::debug!(arguments = ?command.arguments, background = command.is_background, "parsed");

        let redirections = redirect::extract_redirections(&mut command)?;
        // Reaper notices stay pending while fd 0/1 are deflected.
        let sigchld = SigchldBlock::new()?;
        let mut stderr = io::stderr();
        let guard = self.streams.apply(&redirections, &mut stderr);

        if let Some(action) = builtins::execute(&mut command, self.builtin_match, &mut stderr) {
            return Ok(match action {
                BuiltinAction::Exit => Flow::Exit,
                BuiltinAction::Continue => Flow::Continue,
            });
        }
        if !command.should_spawn {
            return Ok(Flow::Continue);
        }

        let record = executor::launch(&command)?;
        // The child holds its own copies of fd 0/1 now.
        drop(guard);

        match jobs::supervise(record, sigchld, &mut io::stdout())? {
            JobOutcome::Completed(status) => tracing::debug!(
                code = status.map(ChildStatus::exit_code),
                "foreground job finished"
            ),
            JobOutcome::Detached(pid) => tracing::debug!(pid, "left for the reaper"),
        }
        Ok(Flow::Continue)
    }
}

/// Read one line into `line`, keeping at most `MAX_LINE + 1` bytes of it and
/// discarding the rest.
///
/// Returns the length of the whole line without its `\n`, or `None` at end
/// of input.
fn read_line(input: &mut impl BufRead, line: &mut Vec<u8>) -> io::Result<Option<usize>> {
    line.clear();
    let kept = input
        .by_ref()
        .take(MAX_LINE as u64 + 1)
        .read_until(b'\n', line)?;
    if kept == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        return Ok(Some(kept - 1));
    }
    if kept <= MAX_LINE {
        // Last line of input, no terminator.
        return Ok(Some(kept));
    }
    Ok(Some(kept + discard_line(input)?))
}

/// Skip input up to and including the next `\n`, returning how many bytes
/// preceded it.
fn discard_line(input: &mut impl BufRead) -> io::Result<usize> {
    let mut discarded = 0;
    loop {
        let available = match input.fill_buf() {
            Ok(available) => available,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(discarded);
        }
        match available.iter().position(|&byte| byte == b'\n') {
            Some(end) => {
                input.consume(end + 1);
                return Ok(discarded + end);
            }
            None => {
                let len = available.len();
                input.consume(len);
                discarded += len;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lines_with_and_without_terminator() {
        let mut input = Cursor::new(b"ls -l\nlast".to_vec());
        let mut line = Vec::new();

        assert_eq!(read_line(&mut input, &mut line).unwrap(), Some(5));
        assert_eq!(line, b"ls -l\n");
        assert_eq!(read_line(&mut input, &mut line).unwrap(), Some(4));
        assert_eq!(line, b"last");
        assert_eq!(read_line(&mut input, &mut line).unwrap(), None);
    }

    #[test]
    fn overlong_line_is_bounded_and_skipped() {
        let mut data = vec![b'a'; 100_000];
        data.extend_from_slice(b"\necho next\n");
        let mut input = Cursor::new(data);
        let mut line = Vec::new();

        assert_eq!(read_line(&mut input, &mut line).unwrap(), Some(100_000));
        assert_eq!(line.len(), MAX_LINE + 1);
        assert_eq!(read_line(&mut input, &mut line).unwrap(), Some(9));
        assert_eq!(line, b"echo next\n");
    }

    #[test]
    fn line_at_the_limit_is_kept_whole() {
        let mut data = vec![b'a'; MAX_LINE];
        data.push(b'\n');
        let mut input = Cursor::new(data);
        let mut line = Vec::new();

        assert_eq!(read_line(&mut input, &mut line).unwrap(), Some(MAX_LINE));
        assert_eq!(line.len(), MAX_LINE + 1);
        assert_eq!(read_line(&mut input, &mut line).unwrap(), None);
    }
}
