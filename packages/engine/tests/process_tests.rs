#![allow(clippy::disallowed_methods)]

use std::error::Error;

use backend::MemoryStore;
use engine::{Forked, fork, hostname, is_alive};

#[test]
fn test_hostname_and_liveness() {
    assert!(!hostname().is_empty());
    assert!(is_alive(std::process::id()));
}

#[cfg(unix)]
#[test]
fn test_fork_reports_child_pid() -> Result<(), Box<dyn Error>> {
    let store = MemoryStore::new("test");

    match fork(&store)? {
        Forked::Child => {
            // SAFETY: the child exits immediately without touching shared state.
            unsafe { libc::_exit(0) }
        }
        Forked::Parent(pid) => {
            let pid = pid as libc::pid_t;
            let mut status = 0;
            // SAFETY: waiting on our own child with a valid status pointer.
            let waited = unsafe { libc::waitpid(pid, &mut status, 0) };
            assert_eq!(waited, pid);
            assert!(libc::WIFEXITED(status));
            assert_eq!(libc::WEXITSTATUS(status), 0);
        }
        Forked::Unavailable => return Err("fork is available on unix".into()),
    }
    Ok(())
}
