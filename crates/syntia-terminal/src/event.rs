// ABOUTME: Events flowing from a session's PTY reader thread to the event thread.
// ABOUTME: Carried over a bounded channel, one channel per session.

use std::io;

#[derive(Debug)]
pub enum ProcessEvent {
    /// Bytes read from the process
    Output(Vec<u8>),
    /// The process terminated with this exit code
    Exited(i32),
    /// Reading failed; an `Exited` still follows
    ReadFailed(io::Error),
}
