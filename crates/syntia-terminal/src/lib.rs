// ABOUTME: Terminal sessions and PTY handling.
// ABOUTME: Wraps alacritty_terminal for the grid and portable-pty for the shell process.

pub mod event;
pub mod pty;
pub mod session;
pub mod sessions;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use event::ProcessEvent;
pub use pty::{ProcessHandle, ProcessHost, PtyHost, ShellCommand};
pub use session::{Drained, SessionId, SessionState, TerminalError, TerminalSession};
pub use sessions::{DrainReport, TerminalSessions};
