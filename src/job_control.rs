use std::io;
use std::mem::MaybeUninit;
use std::ptr;

/// Block until `pid` exits or is killed, retrying on `EINTR`. Returns the raw
/// wait status.
pub(crate) fn wait_for_pid(pid: libc::pid_t) -> io::Result<libc::c_int> {
    let mut raw_status: libc::c_int = 0;

    loop {
        let rc = unsafe { libc::waitpid(pid, &mut raw_status, 0) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err);
        }
        return Ok(raw_status);
    }
}

/// Holds SIGCHLD blocked on the calling thread until dropped.
///
/// While held, the reaper cannot run on this thread. Notifications raised
/// meanwhile stay pending and are delivered when the previous mask is
/// restored.
pub(crate) struct SigchldBlock {
    previous: libc::sigset_t,
}

impl SigchldBlock {
    pub(crate) fn new() -> io::Result<Self> {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        let mut previous = MaybeUninit::<libc::sigset_t>::uninit();
        unsafe {
            libc::sigemptyset(set.as_mut_ptr());
            libc::sigaddset(set.as_mut_ptr(), libc::SIGCHLD);
        }

        let rc =
            unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, set.as_ptr(), previous.as_mut_ptr()) };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }

        Ok(Self {
            previous: unsafe { previous.assume_init() },
        })
    }
}

impl Drop for SigchldBlock {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, ptr::null_mut());
        }
    }
}

/// Set `signal` to `SIG_IGN` for the shell and everything it spawns.
pub(crate) fn ignore_signal(signal: libc::c_int) -> io::Result<()> {
    let previous = unsafe { libc::signal(signal, libc::SIG_IGN) };
    if previous == libc::SIG_ERR {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
