use std::thread;
use std::time::{Duration, Instant};

use crate::monitor;
use crate::{WaitOutcome, fork_execvp, wait_subprocess};

#[test_log::test]
fn exit_code_seven() {
    let child = fork_execvp("sh", &["sh", "-c", "exit 7"]).unwrap();
    let outcome = wait_subprocess(child.pid(), None);
    assert_eq!(outcome, WaitOutcome::Exited(7));
    assert_eq!(outcome.code(), Some(7));
    assert_eq!(outcome.signal(), None);
}

#[test_log::test]
fn timeout_shorter_than_runtime() {
    let child = fork_execvp("sleep", &["sleep", "5"]).unwrap();
    let outcome = child.wait_timeout(Duration::from_millis(100));
    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(outcome.is_timeout());
    assert_eq!(outcome.code(), None);
    assert_eq!(outcome.signal(), None);
    assert!(monitor::is_watched(child.pid()));

    // Still unreaped, so it can be killed and waited for.
    child.kill().unwrap();
    assert_eq!(child.wait(), WaitOutcome::Signaled(libc::SIGKILL));
}

#[test]
fn timeout_longer_than_runtime() {
    let child = fork_execvp("sh", &["sh", "-c", "sleep 0.1; exit 3"]).unwrap();
    let start = Instant::now();
    assert_eq!(child.wait_timeout(Duration::from_secs(10)), WaitOutcome::Exited(3));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn zero_timeout_polls() {
    let child = fork_execvp("sleep", &["sleep", "5"]).unwrap();
    assert_eq!(child.wait_timeout(Duration::ZERO), WaitOutcome::TimedOut);
    child.kill().unwrap();
    assert_eq!(child.wait().signal(), Some(libc::SIGKILL));
}

#[test]
fn zero_timeout_on_finished_child() {
    let child = fork_execvp("true", &["true"]).unwrap();
    let start = Instant::now();
    loop {
        match child.wait_timeout(Duration::ZERO) {
            WaitOutcome::TimedOut => {
                assert!(start.elapsed() < Duration::from_secs(5));
                thread::sleep(Duration::from_millis(10));
            }
            outcome => {
                assert_eq!(outcome, WaitOutcome::Exited(0));
                break;
            }
        }
    }
}

#[test]
fn repeated_timed_waits() {
    let child = fork_execvp("sleep", &["sleep", "5"]).unwrap();
    assert!(child.wait_timeout(Duration::from_millis(50)).is_timeout());
    assert!(child.wait_timeout(Duration::from_millis(50)).is_timeout());
    child.kill().unwrap();
    assert_eq!(
        child.wait_timeout(Duration::from_secs(10)),
        WaitOutcome::Signaled(libc::SIGKILL)
    );
}

#[test]
fn concurrent_timed_waits() {
    let child = fork_execvp("sh", &["sh", "-c", "sleep 0.2; exit 4"]).unwrap();
    let pid = child.pid();
    let waiters: Vec<_> = (0..2)
        .map(|_| thread::spawn(move || wait_subprocess(pid, Some(Duration::from_secs(10)))))
        .collect();
    let mut outcomes: Vec<_> = waiters.into_iter().map(|t| t.join().unwrap()).collect();
    outcomes.sort_by_key(|o| o.code().is_none());
    // Only one waiter can reap the child.
    assert_eq!(
        outcomes,
        [WaitOutcome::Exited(4), WaitOutcome::WaitFailed(libc::ECHILD)]
    );
}

#[test]
fn signaled_by_itself() {
    let child = fork_execvp("sh", &["sh", "-c", "kill -TERM $$"]).unwrap();
    assert_eq!(child.wait(), WaitOutcome::Signaled(libc::SIGTERM));
}

#[test]
fn not_a_child() {
    // init is never our child.
    assert_eq!(wait_subprocess(1, None), WaitOutcome::WaitFailed(libc::ECHILD));
    assert_eq!(
        wait_subprocess(1, Some(Duration::from_millis(10))),
        WaitOutcome::WaitFailed(libc::ECHILD)
    );
}

#[test]
fn process_group_pids_rejected() {
    assert_eq!(wait_subprocess(0, None), WaitOutcome::WaitFailed(libc::EINVAL));
    assert_eq!(
        wait_subprocess(u32::MAX, None),
        WaitOutcome::WaitFailed(libc::EINVAL)
    );
}

#[test]
fn already_reaped() {
    let child = fork_execvp("true", &["true"]).unwrap();
    assert!(child.wait().success());
    let outcome = child.wait();
    assert_eq!(outcome, WaitOutcome::WaitFailed(libc::ECHILD));
    assert_eq!(
        outcome.error().unwrap().raw_os_error(),
        Some(libc::ECHILD)
    );
}

#[test]
fn display() {
    assert_eq!(WaitOutcome::Exited(7).to_string(), "exit code 7");
    assert_eq!(WaitOutcome::Signaled(9).to_string(), "signal 9");
    assert_eq!(WaitOutcome::TimedOut.to_string(), "timed out");
    assert!(WaitOutcome::WaitFailed(libc::ECHILD).to_string().starts_with("wait failed: "));
}

#[test]
fn outcome_accessors() {
    assert!(WaitOutcome::Exited(0).success());
    assert!(!WaitOutcome::Exited(1).success());
    assert!(!WaitOutcome::Signaled(0).success());
    assert!(!WaitOutcome::TimedOut.success());
    assert!(WaitOutcome::Exited(0).error().is_none());
}
