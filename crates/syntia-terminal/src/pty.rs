// ABOUTME: Process collaborator used by terminal sessions.
// ABOUTME: Spawns shells in a PTY with a reader thread and a writer thread each.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::thread;

use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;

use crate::event::ProcessEvent;
use crate::session::TerminalError;

/// What to run inside a new session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// A running process owned by one session
pub trait ProcessHandle: Send {
    /// Queue input for the process. Never blocks the caller.
    fn write(&mut self, bytes: &[u8]);

    fn resize(&mut self, columns: u16, rows: u16) -> std::io::Result<()>;

    fn kill(&mut self) -> std::io::Result<()>;

    fn process_id(&self) -> Option<u32>;
}

/// Creates processes; output and exit are reported through `events`
pub trait ProcessHost {
    fn spawn(
        &mut self,
        command: &ShellCommand,
        columns: u16,
        rows: u16,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<Box<dyn ProcessHandle>, TerminalError>;
}

/// Real shells through the platform PTY
#[derive(Debug, Default)]
pub struct PtyHost;

struct PtyProcess {
    master: Box<dyn MasterPty + Send>,
    input: mpsc::UnboundedSender<Vec<u8>>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    pid: Option<u32>,
}

fn spawn_error(command: &ShellCommand, reason: impl std::fmt::Display) -> TerminalError {
    TerminalError::SpawnError {
        program: command.program.clone(),
        reason: reason.to_string(),
    }
}

impl ProcessHost for PtyHost {
    fn spawn(
        &mut self,
        command: &ShellCommand,
        columns: u16,
        rows: u16,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<Box<dyn ProcessHandle>, TerminalError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols: columns,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| spawn_error(command, e))?;

        let mut builder = CommandBuilder::new(&command.program);
        builder.args(&command.args);
        if let Some(cwd) = &command.cwd {
            builder.cwd(cwd);
        }
        builder.env("TERM", "xterm-256color");
        builder.env("COLORTERM", "truecolor");

        let mut child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| spawn_error(command, e))?;
        // Only the child may hold the slave side, otherwise reads never hit EOF
        drop(pair.slave);

        let killer = child.clone_killer();
        let pid = child.process_id();
        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_error(command, e))?;
        let mut writer = pair
            .master
            .take_writer()
            .map_err(|e| spawn_error(command, e))?;

        thread::Builder::new()
            .name(format!("pty-reader-{}", pid.unwrap_or_default()))
            .spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            // Blocks this thread only when the event thread falls behind
                            if events.blocking_send(ProcessEvent::Output(buf[..n].to_vec())).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = events.blocking_send(ProcessEvent::ReadFailed(e));
                            break;
                        }
                    }
                }
                let code = match child.wait() {
                    Ok(status) => status.exit_code() as i32,
                    Err(e) => {
                        tracing::warn!("Failed to wait for shell: {}", e);
                        -1
                    }
                };
                let _ = events.blocking_send(ProcessEvent::Exited(code));
            })
            .map_err(|e| spawn_error(command, e))?;

        let (input, mut input_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        thread::Builder::new()
            .name(format!("pty-writer-{}", pid.unwrap_or_default()))
            .spawn(move || {
                while let Some(bytes) = input_rx.blocking_recv() {
                    if let Err(e) = writer.write_all(&bytes).and_then(|_| writer.flush()) {
                        tracing::warn!("PTY write failed: {}", e);
                        break;
                    }
                }
            })
            .map_err(|e| spawn_error(command, e))?;

        tracing::info!("Spawned {} (pid {:?}) at {}x{}", command.program, pid, columns, rows);

        Ok(Box::new(PtyProcess {
            master: pair.master,
            input,
            killer,
            pid,
        }))
    }
}

impl ProcessHandle for PtyProcess {
    fn write(&mut self, bytes: &[u8]) {
        if self.input.send(bytes.to_vec()).is_err() {
            tracing::debug!("PTY writer gone, dropping {} bytes", bytes.len());
        }
    }

    fn resize(&mut self, columns: u16, rows: u16) -> std::io::Result<()> {
        self.master
            .resize(PtySize {
                rows,
                cols: columns,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    }

    fn kill(&mut self) -> std::io::Result<()> {
        self.killer.kill()
    }

    fn process_id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        // The reader thread exits on EOF once the child is gone
        let _ = self.killer.kill();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn collect_until_exit(rx: &mut mpsc::Receiver<ProcessEvent>) -> (Vec<u8>, Option<i32>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut output = Vec::new();
        while Instant::now() < deadline {
            match rx.try_recv() {
                Ok(ProcessEvent::Output(bytes)) => output.extend(bytes),
                Ok(ProcessEvent::Exited(code)) => return (output, Some(code)),
                Ok(ProcessEvent::ReadFailed(_)) => {}
                Err(mpsc::error::TryRecvError::Empty) => std::thread::sleep(Duration::from_millis(10)),
                Err(mpsc::error::TryRecvError::Disconnected) => break,
            }
        }
        (output, None)
    }

    #[test]
    fn test_spawn_echo() {
        let (tx, mut rx) = mpsc::channel(64);
        let command = ShellCommand::new("echo").with_args(["hello"]);
        let _handle = PtyHost.spawn(&command, 80, 24, tx).unwrap();

        let (output, code) = collect_until_exit(&mut rx);
        assert!(String::from_utf8_lossy(&output).contains("hello"));
        assert_eq!(code, Some(0));
    }

    #[test]
    fn test_spawn_exit_code() {
        let (tx, mut rx) = mpsc::channel(64);
        let command = ShellCommand::new("sh").with_args(["-c", "exit 3"]);
        let _handle = PtyHost.spawn(&command, 80, 24, tx).unwrap();

        let (_, code) = collect_until_exit(&mut rx);
        assert_eq!(code, Some(3));
    }

    #[test]
    fn test_spawn_missing_program() {
        let (tx, _rx) = mpsc::channel(1);
        let command = ShellCommand::new("/definitely/not/a/shell");
        let result = PtyHost.spawn(&command, 80, 24, tx);
        assert!(matches!(result, Err(TerminalError::SpawnError { .. })));
    }
}
