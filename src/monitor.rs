// Exit monitors: one thread per watched PID that blocks in
// waitid(WEXITED | WNOWAIT) and wakes every timed waiter once the child has
// terminated. The child stays waitable, so reaping is left to the waiter.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread;
use std::time::Instant;

use crate::posix;

#[derive(Debug, Copy, Clone)]
enum MonitorState {
    Running,
    Exited,
    Failed(i32),
}

#[derive(Debug)]
pub(crate) struct Monitor {
    state: Mutex<MonitorState>,
    cond: Condvar,
}

fn registry() -> &'static Mutex<HashMap<u32, Arc<Monitor>>> {
    static MONITORS: OnceLock<Mutex<HashMap<u32, Arc<Monitor>>>> = OnceLock::new();
    MONITORS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the monitor for `pid`, starting one if none is running.
pub(crate) fn watch(pid: u32) -> Arc<Monitor> {
    let mut monitors = registry().lock().unwrap();
    if let Some(monitor) = monitors.get(&pid) {
        return Arc::clone(monitor);
    }
    let monitor = Arc::new(Monitor {
        state: Mutex::new(MonitorState::Running),
        cond: Condvar::new(),
    });
    let spawned = thread::Builder::new()
        .name(format!("exit-monitor-{pid}"))
        .spawn({
            let monitor = Arc::clone(&monitor);
            move || monitor.run(pid)
        });
    match spawned {
        Ok(_) => {
            monitors.insert(pid, Arc::clone(&monitor));
        }
        Err(e) => {
            log::warn!("cannot start exit monitor for pid {pid}: {e}");
            monitor.finish(MonitorState::Failed(
                e.raw_os_error().unwrap_or(libc::EAGAIN),
            ));
        }
    }
    monitor
}

impl Monitor {
    fn run(self: Arc<Self>, pid: u32) {
        log::trace!("exit monitor for pid {pid} started");
        let state = loop {
            match posix::wait_exited_nowait(pid) {
                Ok(()) => break MonitorState::Exited,
                Err(e) if e.raw_os_error() == Some(posix::EINTR) => continue,
                Err(e) => break MonitorState::Failed(e.raw_os_error().unwrap_or(posix::EINVAL)),
            }
        };
        {
            // Once the child is reaped its PID can be reused, so later waits need a new
            // monitor.
            let mut monitors = registry().lock().unwrap();
            if monitors.get(&pid).is_some_and(|m| Arc::ptr_eq(m, &self)) {
                monitors.remove(&pid);
            }
        }
        self.finish(state);
        log::trace!("exit monitor for pid {pid} finished: {state:?}");
    }

    fn finish(&self, state: MonitorState) {
        *self.state.lock().unwrap() = state;
        self.cond.notify_all();
    }

    /// Blocks until the child has terminated or `deadline` passes.
    ///
    /// Returns `None` on timeout, `Some(Ok(()))` once the child is waitable, and
    /// `Some(Err(errno))` if the monitor's own wait failed.
    pub(crate) fn wait_until(&self, deadline: Instant) -> Option<Result<(), i32>> {
        let mut state = self.state.lock().unwrap();
        loop {
            match *state {
                MonitorState::Exited => return Some(Ok(())),
                MonitorState::Failed(errno) => return Some(Err(errno)),
                MonitorState::Running => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            state = self.cond.wait_timeout(state, deadline - now).unwrap().0;
        }
    }
}

#[cfg(test)]
pub(crate) fn is_watched(pid: u32) -> bool {
    registry().lock().unwrap().contains_key(&pid)
}
