mod bytes;
mod parse;
mod wait;

use std::io::Read;

use crate::{Child, Launch, LaunchError, ParseError, WaitOutcome};

pub fn read_whole_file<T: Read>(mut f: T) -> String {
    let mut content = String::new();
    f.read_to_string(&mut content).unwrap();
    content
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn public_types_are_send_and_sync() {
    assert_send_sync::<Child>();
    assert_send_sync::<Launch>();
    assert_send_sync::<LaunchError>();
    assert_send_sync::<WaitOutcome>();
    assert_send_sync::<ParseError>();
}
