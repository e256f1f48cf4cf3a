use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use runtime_support::{Launch, WaitOutcome, fork_execvp, parse_i64, wait_subprocess};

fn read_all(mut f: impl Read) -> String {
    let mut s = String::new();
    f.read_to_string(&mut s).unwrap();
    s
}

#[test]
fn sort_through_pipes() {
    let mut child = fork_execvp("sort", &["sort"]).unwrap();
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"pear\napple\nfig\n").unwrap();
    drop(stdin);
    assert_eq!(read_all(child.stdout.take().unwrap()), "apple\nfig\npear\n");
    assert_eq!(read_all(child.stderr.take().unwrap()), "");
    assert_eq!(
        child.wait_timeout(Duration::from_secs(10)),
        WaitOutcome::Exited(0)
    );
}

#[test]
fn children_from_many_threads() {
    let workers: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let mut child = Launch::new("sh")
                    .arg("-c")
                    .arg(format!("echo {i}; exit {i}"))
                    .spawn()
                    .unwrap();
                let out = read_all(child.stdout.take().unwrap());
                let outcome = wait_subprocess(child.pid(), Some(Duration::from_secs(10)));
                (i, parse_i64(out.trim_end()), outcome)
            })
        })
        .collect();
    for worker in workers {
        let (i, printed, outcome) = worker.join().unwrap();
        assert_eq!(printed, Ok(i64::from(i)));
        assert_eq!(outcome, WaitOutcome::Exited(i));
    }
}

#[test]
fn output_larger_than_pipe_buffer() {
    let mut child = fork_execvp("sh", &["sh", "-c", "head -c 1000000 /dev/zero"]).unwrap();
    let out = {
        let mut buf = vec![];
        child.stdout.take().unwrap().read_to_end(&mut buf).unwrap();
        buf
    };
    assert_eq!(out.len(), 1_000_000);
    assert!(child.wait().success());
}
