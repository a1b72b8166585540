//! Process-level primitives: fork, host name, liveness.

use backend::Store;

use crate::ForkError;

/// Result of [`fork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forked {
    /// This platform cannot duplicate processes; run the work in-process instead.
    Unavailable,
    /// We are the parent; the child has this pid.
    Parent(u32),
    /// We are the child.
    Child,
}

/// Duplicate the current process.
///
/// The store's connection is dropped first so parent and child never share
/// a backend socket; both sides reconnect on their next command.
///
/// Only fork from a single-threaded context (before starting a multi-threaded
/// runtime, or from a current-thread runtime). The child only inherits the
/// calling thread.
#[cfg(unix)]
pub fn fork<S: Store>(store: &S) -> Result<Forked, ForkError> {
    store.disconnect();

    // SAFETY: fork has no memory-safety preconditions; the child continues
    // with a copy of this thread only, which the doc comment above requires
    // callers to account for.
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(ForkError::Failed(std::io::Error::last_os_error())),
        0 => Ok(Forked::Child),
        pid => Ok(Forked::Parent(pid as u32)),
    }
}

#[cfg(not(unix))]
pub fn fork<S: Store>(_store: &S) -> Result<Forked, ForkError> {
    Ok(Forked::Unavailable)
}

/// Name of the host this process runs on.
#[cfg(unix)]
pub fn hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: the buffer is valid for `buf.len()` bytes and gethostname
    // writes at most that many.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc == 0 {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        if let Ok(name) = std::str::from_utf8(&buf[..end])
            && !name.is_empty()
        {
            return name.to_string();
        }
    }
    fallback_hostname()
}

#[cfg(not(unix))]
pub fn hostname() -> String {
    fallback_hostname()
}

fn fallback_hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Whether a process with this pid exists on this host.
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs the permission and existence checks only.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Without a way to probe, every process is assumed alive.
#[cfg(not(unix))]
pub fn is_alive(_pid: u32) -> bool {
    true
}
