//! SIGCHLD-driven collection of finished children.
//!
//! Everything reachable from [`on_child_state_change`] runs inside a signal
//! handler: only atomics, `waitpid`, `write` and `_exit`. No allocation, no
//! locks, no buffered stdio, no logging.

use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicUsize, Ordering};

use crate::status::ChildStatus;

const IDLE: u8 = 0;
const DRAINING: u8 = 1;

static STATE: AtomicU8 = AtomicU8::new(IDLE);
static TERMINATED: AtomicUsize = AtomicUsize::new(0);

/// Pid the main loop is waiting on, or 0.
static FOREGROUND_PID: AtomicI32 = AtomicI32::new(0);
static FOREGROUND_STATUS: AtomicI32 = AtomicI32::new(0);
static FOREGROUND_COLLECTED: AtomicBool = AtomicBool::new(false);

const NOTICE_PREFIX: &[u8] = b"Child Process [";
const TERMINATED_SUFFIX: &[u8] = b"]: Terminated\n";
const STOPPED_SUFFIX: &[u8] = b"]: Stopped\n";
const FATAL_NOTICE: &[u8] = b"waitpid error: child reaping failed\n";

/// Enough for the prefix, a 64-bit pid and the longer suffix.
const NOTICE_CAPACITY: usize = 64;

/// Number of children collected as terminated since the last call.
pub fn take_terminated() -> usize {
    TERMINATED.swap(0, Ordering::AcqRel)
}

/// Marks a pid as the foreground job for as long as it lives.
///
/// If the reaper collects that pid's termination first, it keeps the raw
/// status here instead of announcing it, and the foreground wait picks it up
/// through [`ForegroundWatch::collected`] after its own `waitpid` reports
/// `ECHILD`.
pub struct ForegroundWatch {
    pid: libc::pid_t,
}

impl ForegroundWatch {
    /// Must be called with SIGCHLD blocked, before the child can be reaped.
    pub fn new(pid: libc::pid_t) -> Self {
        FOREGROUND_COLLECTED.store(false, Ordering::Release);
        FOREGROUND_PID.store(pid, Ordering::Release);
        Self { pid }
    }

    /// Raw wait status, if the reaper got to the job first.
    pub fn collected(&self) -> Option<libc::c_int> {
        if FOREGROUND_PID.load(Ordering::Acquire) != self.pid {
            return None;
        }
        FOREGROUND_COLLECTED
            .load(Ordering::Acquire)
            .then(|| FOREGROUND_STATUS.load(Ordering::Acquire))
    }
}

impl Drop for ForegroundWatch {
    fn drop(&mut self) {
        FOREGROUND_PID.store(0, Ordering::Release);
        FOREGROUND_COLLECTED.store(false, Ordering::Release);
    }
}

/// Install the handler for SIGCHLD.
pub fn install() -> io::Result<()> {
    let mut action: libc::sigaction = unsafe { mem::zeroed() };
    action.sa_sigaction = on_child_state_change as extern "C" fn(libc::c_int) as libc::sighandler_t;
    action.sa_flags = libc::SA_RESTART;
    unsafe { libc::sigemptyset(&mut action.sa_mask) };

    if unsafe { libc::sigaction(libc::SIGCHLD, &action, ptr::null_mut()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

extern "C" fn on_child_state_change(_signal: libc::c_int) {
    let saved_errno = errno::get();
    // Idle -> Draining; a nested invocation leaves the work to the running drain.
    if STATE
        .compare_exchange(IDLE, DRAINING, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        drain();
        STATE.store(IDLE, Ordering::Release);
    }
    errno::set(saved_errno);
}

/// Collect every child with a pending state change without blocking.
fn drain() {
    loop {
        let mut raw_status: libc::c_int = 0;
        let pid = unsafe { libc::waitpid(-1, &mut raw_status, libc::WNOHANG | libc::WUNTRACED) };

        if pid > 0 {
            let stopped = ChildStatus::from_wait_status(raw_status).is_some_and(ChildStatus::is_stopped);
            if !stopped && hand_over_foreground(pid, raw_status) {
                continue;
            }
            if !stopped {
                TERMINATED.fetch_add(1, Ordering::AcqRel);
            }
            let mut buf = [0u8; NOTICE_CAPACITY];
            let len = format_notice(pid, stopped, &mut buf);
            write_all(libc::STDOUT_FILENO, &buf[..len]);
            continue;
        }

        if pid == 0 {
            // Children remain, none of them changed state.
            return;
        }

        match errno::get() {
            libc::ECHILD => return,
            libc::EINTR => continue,
            _ => {
                write_all(libc::STDERR_FILENO, FATAL_NOTICE);
                unsafe { libc::_exit(libc::EXIT_FAILURE) };
            }
        }
    }
}

/// Park a terminated foreground job's status for the main loop.
fn hand_over_foreground(pid: libc::pid_t, raw_status: libc::c_int) -> bool {
    if FOREGROUND_PID.load(Ordering::Acquire) != pid {
        return false;
    }
    FOREGROUND_STATUS.store(raw_status, Ordering::Release);
    FOREGROUND_COLLECTED.store(true, Ordering::Release);
    true
}

/// Render `Child Process [<pid>]: Terminated\n` into `buf`, returning its length.
fn format_notice(pid: libc::pid_t, stopped: bool, buf: &mut [u8; NOTICE_CAPACITY]) -> usize {
    let mut len = 0;
    let mut push = |bytes: &[u8], len: &mut usize| {
        buf[*len..*len + bytes.len()].copy_from_slice(bytes);
        *len += bytes.len();
    };

    push(NOTICE_PREFIX, &mut len);

    let mut digits = [0u8; 20];
    let mut value = pid.unsigned_abs() as u64;
    let mut start = digits.len();
    loop {
        start -= 1;
        digits[start] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    push(&digits[start..], &mut len);

    push(if stopped { STOPPED_SUFFIX } else { TERMINATED_SUFFIX }, &mut len);
    len
}

/// Unbuffered write that tolerates short writes and `EINTR`; other errors
/// drop the rest of the message.
fn write_all(fd: libc::c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        let rc = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if rc > 0 {
            bytes = &bytes[rc as usize..];
        } else if rc < 0 && errno::get() == libc::EINTR {
            continue;
        } else {
            return;
        }
    }
}

mod errno {
    #[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "redox"))]
    fn location() -> *mut libc::c_int {
        unsafe { libc::__errno_location() }
    }

    #[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
    fn location() -> *mut libc::c_int {
        unsafe { libc::__errno() }
    }

    #[cfg(any(
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "dragonfly"
    ))]
    fn location() -> *mut libc::c_int {
        unsafe { libc::__error() }
    }

    pub(super) fn get() -> libc::c_int {
        unsafe { *location() }
    }

    pub(super) fn set(value: libc::c_int) {
        unsafe { *location() = value };
    }
}

/// Serializes tests that publish a foreground pid.
#[cfg(test)]
pub(crate) static FOREGROUND_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
