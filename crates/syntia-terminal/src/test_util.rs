// ABOUTME: Scriptable in-memory process host for tests.
// ABOUTME: Lets a test inject output and exits and inspect what was written.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::event::ProcessEvent;
use crate::pty::{ProcessHandle, ProcessHost, ShellCommand};
use crate::session::TerminalError;

struct FakeProcess {
    events: mpsc::Sender<ProcessEvent>,
    input: Vec<u8>,
    size: (u16, u16),
    killed: bool,
}

#[derive(Default)]
struct FakeState {
    processes: Vec<FakeProcess>,
    fail_next: bool,
}

/// Clones share the same spawned processes, indexed in spawn order
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<FakeState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn fail_next_spawn(&self) {
        self.state().fail_next = true;
    }

    pub fn spawn_count(&self) -> usize {
        self.state().processes.len()
    }

    pub fn emit_output(&self, process: usize, bytes: &[u8]) {
        let state = self.state();
        let result = state.processes[process]
            .events
            .try_send(ProcessEvent::Output(bytes.to_vec()));
        assert!(result.is_ok(), "event channel full or closed");
    }

    pub fn emit_exit(&self, process: usize, code: i32) {
        let state = self.state();
        let result = state.processes[process]
            .events
            .try_send(ProcessEvent::Exited(code));
        assert!(result.is_ok(), "event channel full or closed");
    }

    /// Everything written to the process so far
    pub fn input(&self, process: usize) -> Vec<u8> {
        self.state().processes[process].input.clone()
    }

    pub fn size(&self, process: usize) -> (u16, u16) {
        self.state().processes[process].size
    }

    pub fn was_killed(&self, process: usize) -> bool {
        self.state().processes[process].killed
    }
}

struct FakeHandle {
    state: Arc<Mutex<FakeState>>,
    index: usize,
}

impl FakeHandle {
    fn with<R>(&self, f: impl FnOnce(&mut FakeProcess) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state.processes[self.index])
    }
}

impl ProcessHandle for FakeHandle {
    fn write(&mut self, bytes: &[u8]) {
        self.with(|p| p.input.extend_from_slice(bytes));
    }

    fn resize(&mut self, columns: u16, rows: u16) -> std::io::Result<()> {
        self.with(|p| p.size = (columns, rows));
        Ok(())
    }

    fn kill(&mut self) -> std::io::Result<()> {
        self.with(|p| p.killed = true);
        Ok(())
    }

    fn process_id(&self) -> Option<u32> {
        Some(1000 + self.index as u32)
    }
}

impl ProcessHost for FakeHost {
    fn spawn(
        &mut self,
        command: &ShellCommand,
        columns: u16,
        rows: u16,
        events: mpsc::Sender<ProcessEvent>,
    ) -> Result<Box<dyn ProcessHandle>, TerminalError> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next) {
            return Err(TerminalError::SpawnError {
                program: command.program.clone(),
                reason: "spawn refused".to_string(),
            });
        }
        state.processes.push(FakeProcess {
            events,
            input: Vec::new(),
            size: (columns, rows),
            killed: false,
        });
        Ok(Box::new(FakeHandle {
            state: Arc::clone(&self.state),
            index: state.processes.len() - 1,
        }))
    }
}
