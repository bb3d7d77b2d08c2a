// ABOUTME: One live shell session: process handle, grid, transcript, and unread flag.
// ABOUTME: Output is drained from the session's channel on the event thread.

use std::sync::{Arc, Mutex};

use alacritty_terminal::event::{Event, EventListener};
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::term::cell::Cell;
use alacritty_terminal::term::{Config as TermConfig, Term};
use alacritty_terminal::vte::ansi::Processor;
use alacritty_terminal::Grid;
use syntia_core::TerminalSettings;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::event::ProcessEvent;
use crate::pty::{ProcessHandle, ProcessHost, ShellCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Exited,
}

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("Failed to start {program}: {reason}")]
    SpawnError { program: String, reason: String },

    #[error("No terminal session {0}")]
    UnknownSession(SessionId),
}

/// Things the emulator wants to tell us while parsing output
#[derive(Default)]
struct ProxyState {
    /// Replies to terminal queries, to be written back to the process
    replies: Vec<u8>,
    title: Option<String>,
}

/// Proxy for terminal events
#[derive(Clone, Default)]
struct EventProxy {
    state: Arc<Mutex<ProxyState>>,
}

impl EventProxy {
    fn take_replies(&self) -> Vec<u8> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut state.replies)
    }

    fn title(&self) -> Option<String> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.title.clone()
    }
}

impl EventListener for EventProxy {
    fn send_event(&self, event: Event) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match event {
            Event::PtyWrite(text) => state.replies.extend_from_slice(text.as_bytes()),
            Event::Title(title) => state.title = Some(title),
            Event::ResetTitle => state.title = None,
            _ => {}
        }
    }
}

/// Simple size type that implements Dimensions
struct TermSize {
    columns: usize,
    lines: usize,
}

impl TermSize {
    fn new(columns: u16, lines: u16) -> Self {
        Self {
            columns: columns.max(1) as usize,
            lines: lines.max(1) as usize,
        }
    }
}

impl Dimensions for TermSize {
    fn columns(&self) -> usize {
        self.columns
    }

    fn screen_lines(&self) -> usize {
        self.lines
    }

    fn total_lines(&self) -> usize {
        self.lines
    }
}

/// What one drain of the event channel produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    pub bytes: usize,
    /// Set if the process exited during this drain
    pub exit_code: Option<i32>,
}

pub struct TerminalSession {
    id: SessionId,
    state: SessionState,
    exit_code: Option<i32>,
    unread: bool,
    focused: bool,
    /// Every byte the process ever wrote
    transcript: Vec<u8>,
    term: Term<EventProxy>,
    proxy: EventProxy,
    processor: Processor,
    process: Option<Box<dyn ProcessHandle>>,
    events: mpsc::Receiver<ProcessEvent>,
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("exit_code", &self.exit_code)
            .field("unread", &self.unread)
            .field("focused", &self.focused)
            .field("transcript_len", &self.transcript.len())
            .finish()
    }
}

impl TerminalSession {
    /// Spawn `command` through `host`. Spawn failures are returned, never retried.
    pub fn start(
        id: SessionId,
        host: &mut dyn ProcessHost,
        command: &ShellCommand,
        settings: &TerminalSettings,
    ) -> Result<Self, TerminalError> {
        let (sender, events) = mpsc::channel(settings.channel_capacity.max(1));
        let mut session = Self::new(id, settings, events);

        let process = host.spawn(command, settings.columns, settings.rows, sender)?;
        session.process = Some(process);
        session.state = SessionState::Running;
        tracing::info!("Terminal session {} running {}", id, command.program);
        Ok(session)
    }

    fn new(id: SessionId, settings: &TerminalSettings, events: mpsc::Receiver<ProcessEvent>) -> Self {
        let proxy = EventProxy::default();
        let term_config = TermConfig {
            scrolling_history: settings.scrollback_lines,
            ..TermConfig::default()
        };
        let term = Term::new(
            term_config,
            &TermSize::new(settings.columns, settings.rows),
            proxy.clone(),
        );

        Self {
            id,
            state: SessionState::Starting,
            exit_code: None,
            unread: false,
            focused: false,
            transcript: Vec::new(),
            term,
            proxy,
            processor: Processor::new(),
            process: None,
            events,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn has_unread(&self) -> bool {
        self.unread
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn transcript(&self) -> &[u8] {
        &self.transcript
    }

    /// Title set by the shell through escape sequences
    pub fn title(&self) -> Option<String> {
        self.proxy.title()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.process_id())
    }

    /// Forward input to the process. Ignored unless running.
    pub fn write(&mut self, bytes: &[u8]) {
        match (&mut self.process, self.state) {
            (Some(process), SessionState::Running) => process.write(bytes),
            _ => tracing::debug!(
                "Dropping {} input bytes for session {} ({:?})",
                bytes.len(),
                self.id,
                self.state
            ),
        }
    }

    pub fn on_output(&mut self, bytes: &[u8]) {
        self.transcript.extend_from_slice(bytes);
        self.processor.advance(&mut self.term, bytes);

        let replies = self.proxy.take_replies();
        if !replies.is_empty() {
            self.write(&replies);
        }

        if !self.focused {
            self.unread = true;
        }
    }

    /// Record termination. Returns true only the first time.
    pub fn on_exit(&mut self, code: i32) -> bool {
        if self.state == SessionState::Exited {
            return false;
        }
        self.state = SessionState::Exited;
        self.exit_code = Some(code);
        tracing::info!("Terminal session {} exited with code {}", self.id, code);
        true
    }

    pub fn focus(&mut self) {
        self.focused = true;
        self.unread = false;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        if columns == 0 || rows == 0 {
            return;
        }
        self.term.resize(TermSize::new(columns, rows));
        if let Some(process) = &mut self.process {
            if let Err(e) = process.resize(columns, rows) {
                tracing::warn!("Failed to resize session {}: {}", self.id, e);
            }
        }
    }

    /// Kill the process. The session counts as exited afterwards.
    pub fn terminate(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill() {
                tracing::debug!("Kill of session {} failed: {}", self.id, e);
            }
        }
        if self.state != SessionState::Exited {
            self.state = SessionState::Exited;
            tracing::info!("Terminal session {} terminated", self.id);
        }
    }

    /// Apply everything the reader thread has queued so far
    pub fn drain_events(&mut self) -> Drained {
        let mut drained = Drained::default();
        loop {
            match self.events.try_recv() {
                Ok(ProcessEvent::Output(bytes)) => {
                    drained.bytes += bytes.len();
                    self.on_output(&bytes);
                }
                Ok(ProcessEvent::Exited(code)) => {
                    if self.on_exit(code) {
                        drained.exit_code = Some(code);
                    }
                }
                Ok(ProcessEvent::ReadFailed(e)) => {
                    tracing::warn!("Read from session {} failed: {}", self.id, e);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Reader went away without reporting an exit code
                    if self.process.is_some() && self.on_exit(-1) {
                        drained.exit_code = Some(-1);
                    }
                    break;
                }
            }
        }
        drained
    }

    /// Access the terminal grid for rendering
    pub fn with_grid<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Grid<Cell>) -> R,
    {
        f(self.term.grid())
    }

    /// Get terminal dimensions
    pub fn size(&self) -> (u16, u16) {
        let grid = self.term.grid();
        (grid.columns() as u16, grid.screen_lines() as u16)
    }

    /// Get cursor position (column, line)
    pub fn cursor_position(&self) -> (usize, usize) {
        let cursor = self.term.grid().cursor.point;
        (cursor.column.0, cursor.line.0 as usize)
    }

    /// Visible text of one screen line, trailing blanks trimmed
    pub fn screen_line(&self, line: usize) -> String {
        use alacritty_terminal::index::{Column, Line};

        self.with_grid(|grid| {
            if line >= grid.screen_lines() {
                return String::new();
            }
            let row = &grid[Line(line as i32)];
            let text: String = (0..grid.columns()).map(|c| row[Column(c)].c).collect();
            text.trim_end().to_string()
        })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::FakeHost;

    fn settings() -> TerminalSettings {
        TerminalSettings {
            columns: 20,
            rows: 5,
            ..TerminalSettings::default()
        }
    }

    fn start(host: &mut FakeHost) -> TerminalSession {
        TerminalSession::start(SessionId(1), host, &ShellCommand::new("sh"), &settings()).unwrap()
    }

    #[test]
    fn start_runs_and_spawn_error_propagates() {
        let mut host = FakeHost::new();
        let session = start(&mut host);
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(host.spawn_count(), 1);

        host.fail_next_spawn();
        let result =
            TerminalSession::start(SessionId(2), &mut host, &ShellCommand::new("sh"), &settings());
        assert!(matches!(result, Err(TerminalError::SpawnError { .. })));
        assert_eq!(host.spawn_count(), 1);
    }

    #[test]
    fn output_reaches_transcript_and_grid() {
        let mut host = FakeHost::new();
        let mut session = start(&mut host);

        host.emit_output(0, b"hello\r\nworld");
        session.drain_events();

        assert_eq!(session.transcript(), b"hello\r\nworld");
        assert_eq!(session.screen_line(0), "hello");
        assert_eq!(session.screen_line(1), "world");
        assert_eq!(session.cursor_position(), (5, 1));
    }

    #[test]
    fn unread_only_while_unfocused() {
        let mut host = FakeHost::new();
        let mut session = start(&mut host);

        host.emit_output(0, b"a");
        session.drain_events();
        assert!(session.has_unread());

        session.focus();
        assert!(!session.has_unread());
        host.emit_output(0, b"b");
        session.drain_events();
        assert!(!session.has_unread());
    }

    #[test]
    fn exit_is_reported_once() {
        let mut host = FakeHost::new();
        let mut session = start(&mut host);

        host.emit_exit(0, 2);
        host.emit_exit(0, 9);
        assert_eq!(session.drain_events().exit_code, Some(2));
        assert_eq!(session.drain_events(), Drained::default());
        assert_eq!(session.state(), SessionState::Exited);
        assert_eq!(session.exit_code(), Some(2));
    }

    #[test]
    fn write_ignored_after_exit() {
        let mut host = FakeHost::new();
        let mut session = start(&mut host);

        session.write(b"ls\n");
        host.emit_exit(0, 0);
        session.drain_events();
        session.write(b"pwd\n");

        assert_eq!(host.input(0), b"ls\n");
    }

    #[test]
    fn terminal_queries_are_answered() {
        let mut host = FakeHost::new();
        let mut session = start(&mut host);

        // Device status report: where is the cursor?
        host.emit_output(0, b"ab\x1b[6n");
        session.drain_events();

        assert_eq!(host.input(0), b"\x1b[1;3R");
    }

    #[test]
    fn terminate_kills_process() {
        let mut host = FakeHost::new();
        let mut session = start(&mut host);

        session.terminate();
        assert!(host.was_killed(0));
        assert_eq!(session.state(), SessionState::Exited);
        assert_eq!(session.exit_code(), None);
    }

    #[test]
    fn resize_updates_grid_and_process() {
        let mut host = FakeHost::new();
        let mut session = start(&mut host);

        session.resize(40, 10);
        assert_eq!(session.size(), (40, 10));
        assert_eq!(host.size(0), (40, 10));

        session.resize(0, 10);
        assert_eq!(session.size(), (40, 10));
    }
}
