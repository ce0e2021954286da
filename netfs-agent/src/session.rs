use std::collections::HashSet;
use std::os::unix::io::RawFd;

/// The set of real file descriptors one client connection has opened on this
/// host. Threads share a single process-wide fd table, so unlike the
/// original `fork`-per-client model (where the OS reclaimed a dead child's
/// descriptors automatically), this worker has to close its own on the way
/// out.
#[derive(Debug, Default)]
pub struct SessionFiles {
    open: HashSet<RawFd>,
}

impl SessionFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, fd: RawFd) {
        self.open.insert(fd);
    }

    pub fn forget(&mut self, fd: RawFd) {
        self.open.remove(&fd);
    }
}

impl Drop for SessionFiles {
    fn drop(&mut self) {
        for fd in self.open.drain() {
            // Best-effort: a session thread exiting after a protocol error
            // shouldn't panic trying to clean up its own descriptors.
            let _ = nix::unistd::close(fd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn drop_closes_tracked_descriptors() {
        let file = tempfile::tempfile().unwrap();
        let fd = file.as_raw_fd();
        // Duplicate so SessionFiles owns a descriptor independent of `file`.
        let dup_fd = nix::unistd::dup(fd).unwrap();

        let mut session = SessionFiles::new();
        session.track(dup_fd);
        drop(session);

        // The duplicated fd should now be invalid; fstat on it must fail.
        let result = nix::sys::stat::fstat(dup_fd);
        assert!(result.is_err());
    }

    #[test]
    fn forgotten_descriptors_are_not_closed_twice() {
        let file = tempfile::tempfile().unwrap();
        let dup_fd = nix::unistd::dup(file.as_raw_fd()).unwrap();

        let mut session = SessionFiles::new();
        session.track(dup_fd);
        session.forget(dup_fd);
        nix::unistd::close(dup_fd).unwrap();
        drop(session);
    }
}
