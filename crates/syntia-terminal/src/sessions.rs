// ABOUTME: All terminal sessions of a workspace and which one gets the keyboard.
// ABOUTME: Output of every session is drained whether or not the panel is shown.

use syntia_core::TerminalSettings;

use crate::pty::{ProcessHost, ShellCommand};
use crate::session::{SessionId, TerminalError, TerminalSession};

/// Result of draining every session once
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub bytes: usize,
    pub exits: Vec<(SessionId, i32)>,
}

#[derive(Debug, Default)]
pub struct TerminalSessions {
    sessions: Vec<TerminalSession>,
    active: Option<SessionId>,
    next_id: u64,
    panel_focused: bool,
}

impl TerminalSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TerminalSession> {
        self.sessions.iter()
    }

    pub fn get(&self, id: SessionId) -> Option<&TerminalSession> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    fn get_mut(&mut self, id: SessionId) -> Option<&mut TerminalSession> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active(&self) -> Option<&TerminalSession> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn is_panel_focused(&self) -> bool {
        self.panel_focused
    }

    pub fn any_unread(&self) -> bool {
        self.sessions.iter().any(|s| s.has_unread())
    }

    /// Start a new session and make it active
    pub fn start(
        &mut self,
        host: &mut dyn ProcessHost,
        command: &ShellCommand,
        settings: &TerminalSettings,
    ) -> Result<SessionId, TerminalError> {
        let id = SessionId(self.next_id);
        let session = TerminalSession::start(id, host, command, settings)?;
        self.next_id += 1;
        self.sessions.push(session);
        self.activate(id);
        Ok(id)
    }

    /// Terminate and drop a session. The last remaining one becomes active.
    pub fn close(&mut self, id: SessionId) -> Result<(), TerminalError> {
        let index = self
            .sessions
            .iter()
            .position(|s| s.id() == id)
            .ok_or(TerminalError::UnknownSession(id))?;
        let mut session = self.sessions.remove(index);
        session.terminate();

        if self.active == Some(id) {
            self.active = None;
            if let Some(next) = self.sessions.last().map(|s| s.id()) {
                self.activate(next);
            }
        }
        Ok(())
    }

    pub fn set_active(&mut self, id: SessionId) -> Result<(), TerminalError> {
        if self.get(id).is_none() {
            return Err(TerminalError::UnknownSession(id));
        }
        self.activate(id);
        Ok(())
    }

    fn activate(&mut self, id: SessionId) {
        if let Some(previous) = self.active {
            if let Some(session) = self.get_mut(previous) {
                session.blur();
            }
        }
        self.active = Some(id);
        let focused = self.panel_focused;
        if let Some(session) = self.get_mut(id) {
            if focused {
                session.focus();
            }
        }
    }

    /// The terminal panel took keyboard focus
    pub fn focus_panel(&mut self) {
        self.panel_focused = true;
        if let Some(id) = self.active {
            if let Some(session) = self.get_mut(id) {
                session.focus();
            }
        }
    }

    /// The terminal panel lost focus or was hidden. Sessions keep running.
    pub fn blur_panel(&mut self) {
        self.panel_focused = false;
        for session in &mut self.sessions {
            session.blur();
        }
    }

    /// Keyboard input, routed to the active session
    pub fn write_active(&mut self, bytes: &[u8]) -> bool {
        let Some(id) = self.active else {
            return false;
        };
        match self.get_mut(id) {
            Some(session) => {
                session.write(bytes);
                true
            }
            None => false,
        }
    }

    pub fn resize_all(&mut self, columns: u16, rows: u16) {
        for session in &mut self.sessions {
            session.resize(columns, rows);
        }
    }

    /// Drain every session's channel, hidden or not
    pub fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        for session in &mut self.sessions {
            let drained = session.drain_events();
            report.bytes += drained.bytes;
            if let Some(code) = drained.exit_code {
                report.exits.push((session.id(), code));
            }
        }
        report
    }
}
