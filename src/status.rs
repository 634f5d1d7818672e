/// A child state change as reported by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Exited(i32),
    Signaled(i32),
    Stopped(i32),
}

impl ChildStatus {
    /// Decode a raw wait status. Performs no allocation, so it is usable from
    /// the SIGCHLD handler.
    pub fn from_wait_status(raw_status: libc::c_int) -> Option<Self> {
        if libc::WIFEXITED(raw_status) {
            return Some(ChildStatus::Exited(libc::WEXITSTATUS(raw_status)));
        }
        if libc::WIFSIGNALED(raw_status) {
            return Some(ChildStatus::Signaled(libc::WTERMSIG(raw_status)));
        }
        if libc::WIFSTOPPED(raw_status) {
            return Some(ChildStatus::Stopped(libc::WSTOPSIG(raw_status)));
        }
        None
    }

    /// Shell-style exit code: the exit status, or 128 + signal number.
    pub fn exit_code(self) -> i32 {
        match self {
            ChildStatus::Exited(code) => code,
            ChildStatus::Signaled(signal) | ChildStatus::Stopped(signal) => 128 + signal,
        }
    }

    pub fn is_stopped(self) -> bool {
        matches!(self, ChildStatus::Stopped(_))
    }
}
