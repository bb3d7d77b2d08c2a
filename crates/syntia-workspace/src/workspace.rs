// ABOUTME: Workspace coordinator owning tabs, layout, terminal sessions, and preview.
// ABOUTME: Routes commands, keeps the markdown preview in sync, and flags redraws.

use std::collections::HashMap;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;

use syntia_core::{Config, ExtensionDetector, LanguageDetector, Notification, NotificationQueue};
use syntia_editor::{
    Buffer, BufferError, BufferId, DiskStatus, FileSystem, StdFileSystem, TabError, TabRegistry,
};
use syntia_layout::{LayoutError, LayoutTree, Panel, Rect};
use syntia_terminal::{
    ProcessHost, PtyHost, SessionId, ShellCommand, TerminalError, TerminalSessions,
};

use crate::command::{Choice, Command, Confirm, Outcome};
use crate::markdown::{MarkdownRenderer, PlainMarkdownRenderer};
use crate::preview::Preview;
use crate::walker::{DirEntry, DirectoryWalker, IgnoreWalker};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Tab(#[from] TabError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Terminal(#[from] TerminalError),

    #[error("Failed to list {}: {source}", .path.display())]
    List { path: PathBuf, source: io::Error },

    #[error("No tab is open")]
    NoActiveTab,

    #[error("No terminal session is running")]
    NoTerminalSession,

    #[error("Nothing is waiting for confirmation")]
    NoPendingConfirmation,
}

impl WorkspaceError {
    /// Errors caused by a caller asking for something impossible rather
    /// than by the outside world. These are logged, not shown.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            WorkspaceError::Tab(TabError::OutOfRange { .. })
                | WorkspaceError::Layout(_)
                | WorkspaceError::Terminal(TerminalError::UnknownSession(_))
                | WorkspaceError::NoPendingConfirmation
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceState {
    /// No tabs open
    Idle,
    Editing,
}

/// Where keyboard input goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    Terminal,
}

pub struct Workspace {
    root: PathBuf,
    config: Config,
    fs: Box<dyn FileSystem>,
    detector: Box<dyn LanguageDetector>,
    walker: Box<dyn DirectoryWalker>,
    renderer: Box<dyn MarkdownRenderer>,
    host: Box<dyn ProcessHost>,
    tabs: TabRegistry,
    layout: LayoutTree,
    terminals: TerminalSessions,
    preview: Preview,
    notifications: NotificationQueue,
    pending: Option<Confirm>,
    focus: Focus,
    next_buffer: u64,
    redraw: bool,
}

impl Workspace {
    /// Workspace rooted at `root` using the real file system and shell
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let notifications =
            NotificationQueue::new(Duration::from_millis(config.behavior.notification_timeout_ms));
        let walker = IgnoreWalker::new(config.behavior.show_hidden_files);
        let layout = LayoutTree::new(&config.layout);

        Self {
            root: root.into(),
            fs: Box::new(StdFileSystem),
            detector: Box::new(ExtensionDetector),
            walker: Box::new(walker),
            renderer: Box::new(PlainMarkdownRenderer),
            host: Box::new(PtyHost),
            tabs: TabRegistry::new(),
            layout,
            terminals: TerminalSessions::new(),
            preview: Preview::new(),
            notifications,
            pending: None,
            focus: Focus::Editor,
            next_buffer: 0,
            redraw: true,
            config,
        }
    }

    pub fn with_file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    pub fn with_language_detector(mut self, detector: impl LanguageDetector + 'static) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_walker(mut self, walker: impl DirectoryWalker + 'static) -> Self {
        self.walker = Box::new(walker);
        self
    }

    pub fn with_renderer(mut self, renderer: impl MarkdownRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_process_host(mut self, host: impl ProcessHost + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    /// Start a session if the terminal panel is visible from the outset
    pub fn start(&mut self) {
        if self.layout.is_visible(Panel::Terminal) && self.terminals.is_empty() {
            if let Err(e) = self.start_session() {
                self.notifications.error(e.to_string());
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    pub fn layout(&self) -> &LayoutTree {
        &self.layout
    }

    pub fn terminals(&self) -> &TerminalSessions {
        &self.terminals
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn state(&self) -> WorkspaceState {
        if self.tabs.is_empty() {
            WorkspaceState::Idle
        } else {
            WorkspaceState::Editing
        }
    }

    pub fn pending_confirmation(&self) -> Option<&Confirm> {
        self.pending.as_ref()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.take_pending()
    }

    /// Whether anything changed since the last call
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Screen region of every visible panel
    pub fn regions(&self, width: u16, height: u16) -> HashMap<Panel, Rect> {
        self.layout.compute_regions(width, height)
    }

    /// Fit terminal sessions to the terminal panel for a `width` x `height` screen
    pub fn set_screen_size(&mut self, width: u16, height: u16) {
        if let Some(rect) = self.regions(width, height).get(&Panel::Terminal) {
            self.terminals.resize_all(rect.width, rect.height);
        }
        self.redraw = true;
    }

    /// Entries of `dir` (the root when `None`) for the file tree panel
    pub fn list_directory(&self, dir: Option<&Path>) -> Result<Vec<DirEntry>, WorkspaceError> {
        let dir = dir.map(|d| self.resolve_path(d)).unwrap_or_else(|| self.root.clone());
        self.walker
            .list(&dir)
            .map_err(|source| WorkspaceError::List { path: dir, source })
    }

    /// Handle a command, turning failures into notifications or log lines
    pub fn handle(&mut self, command: Command) -> Outcome {
        let target = command.target();
        match self.dispatch(command) {
            Ok(outcome) => outcome,
            Err(e) if e.is_misuse() => {
                tracing::warn!("Ignoring command on {:?}: {}", target, e);
                Outcome::Done
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.notifications.error(e.to_string());
                Outcome::Done
            }
        }
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome, WorkspaceError> {
        if let Some(pending) = self.pending.take() {
            tracing::debug!("Dropping unanswered confirmation {:?}", pending);
        }

        match command {
            Command::Open(path) => self.open(&path),
            Command::OpenFromTree(path) => self.open_from_tree(&path),
            Command::Edit { range, text } => self.edit(range, &text),
            Command::Save => self.save(),
            Command::Close { index, force } => self.close(index, force),
            Command::SwitchTab(index) => self.switch_tab(index),
            Command::ReorderTab { from, to } => {
                self.tabs.reorder(from, to)?;
                self.redraw = true;
                Ok(Outcome::Done)
            }
            Command::ToggleTerminal => self.toggle_terminal(),
            Command::ToggleTree => {
                self.layout.toggle_collapse(Panel::Tree)?;
                self.redraw = true;
                Ok(Outcome::Done)
            }
            Command::TogglePreview => {
                self.layout.toggle_collapse(Panel::Preview)?;
                self.redraw = true;
                Ok(Outcome::Done)
            }
            Command::Resize { path, delta } => {
                match self.layout.resize(&path, delta) {
                    Some(ratio) => {
                        tracing::debug!("Split {:?} ratio now {}", path, ratio);
                        self.redraw = true;
                    }
                    None => tracing::debug!("No split at {:?}, resize ignored", path),
                }
                Ok(Outcome::Done)
            }
            Command::NewSession => {
                let had_sessions = !self.terminals.is_empty();
                self.show_terminal()?;
                if had_sessions {
                    self.start_session()?;
                }
                self.focus_terminal();
                Ok(Outcome::Done)
            }
            Command::SwitchSession(id) => {
                self.terminals.set_active(id)?;
                tracing::debug!("Terminal {} is now active", id);
                self.redraw = true;
                Ok(Outcome::Done)
            }
            Command::CloseSession(id) => self.close_session(id),
            Command::TerminalInput(bytes) => {
                if !self.terminals.write_active(&bytes) {
                    return Err(WorkspaceError::NoTerminalSession);
                }
                Ok(Outcome::Done)
            }
            Command::FocusTerminal => {
                self.show_terminal()?;
                self.focus_terminal();
                Ok(Outcome::Done)
            }
            Command::FocusEditor => {
                self.focus_editor();
                Ok(Outcome::Done)
            }
            Command::Quit { force } => self.quit(force),
        }
    }

    /// Answer the pending confirmation
    pub fn resolve(&mut self, choice: Choice) -> Result<Outcome, WorkspaceError> {
        let pending = self.pending.take().ok_or(WorkspaceError::NoPendingConfirmation)?;
        tracing::debug!("Resolving {:?} with {:?}", pending, choice);

        match (pending, choice) {
            (_, Choice::Cancel) => Ok(Outcome::Done),
            (Confirm::CloseTab { tab, path }, choice) => {
                let index = self
                    .tabs
                    .index_of(tab)
                    .ok_or(BufferError::NotFound(path))?;
                if choice == Choice::Save {
                    self.save_at(index)?;
                }
                self.close_at(index, true)
            }
            (Confirm::Quit { .. }, Choice::Save) => {
                for index in self.tabs.dirty_tabs() {
                    self.save_at(index)?;
                }
                Ok(Outcome::Quit)
            }
            (Confirm::Quit { dirty }, Choice::Discard) => {
                tracing::info!("Quitting without saving {} file(s)", dirty.len());
                Ok(Outcome::Quit)
            }
        }
    }

    /// Like `resolve`, with failures reported the way `handle` does
    pub fn handle_choice(&mut self, choice: Choice) -> Outcome {
        match self.resolve(choice) {
            Ok(outcome) => outcome,
            Err(e) if e.is_misuse() => {
                tracing::warn!("{}", e);
                Outcome::Done
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.notifications.error(e.to_string());
                Outcome::Done
            }
        }
    }

    /// Feed queued terminal output and exits into the sessions.
    /// Returns whether anything arrived.
    pub fn pump_terminals(&mut self) -> bool {
        let report = self.terminals.drain();
        for (id, code) in &report.exits {
            self.notifications
                .info(format!("Terminal {} exited with code {}", id, code));
        }
        let changed = report.bytes > 0 || !report.exits.is_empty();
        if changed {
            self.redraw = true;
        }
        changed
    }

    /// Compare open buffers with the disk and apply the external change policy
    pub fn check_external_changes(&mut self) {
        let mut refreshed = Vec::new();

        for tab in self.tabs.iter_mut() {
            let was_detached = tab.buffer().is_detached();
            let name = tab.title();
            let buffer = tab.buffer_mut();

            match buffer.check_disk(self.fs.as_ref()) {
                DiskStatus::Unchanged => {}
                DiskStatus::Deleted => {
                    if !was_detached {
                        tracing::warn!("{} was deleted on disk", buffer.path().display());
                        self.notifications
                            .warn(format!("{name} was deleted on disk; saving will recreate it"));
                        self.redraw = true;
                    }
                }
                DiskStatus::Modified if buffer.is_dirty() => {
                    buffer.acknowledge_disk(self.fs.as_ref());
                    self.notifications
                        .warn(format!("{name} changed on disk; keeping your unsaved edits"));
                }
                DiskStatus::Modified => match buffer.reload(self.fs.as_ref()) {
                    Ok(()) => {
                        tracing::info!("Reloaded {}", buffer.path().display());
                        self.notifications.info(format!("Reloaded {name} (changed on disk)"));
                        if buffer.language().is_markdown() {
                            refreshed.push(buffer.path().to_path_buf());
                        }
                        self.redraw = true;
                    }
                    Err(e) => {
                        buffer.acknowledge_disk(self.fs.as_ref());
                        self.notifications.error(e.to_string());
                    }
                },
            }
        }

        for path in refreshed {
            self.refresh_preview(&path);
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn open(&mut self, path: &Path) -> Result<Outcome, WorkspaceError> {
        let path = self.resolve_path(path);

        if let Some(index) = self.tabs.find_by_path(&path) {
            tracing::debug!("{} already open", path.display());
            self.tabs.switch_to(index)?;
            self.show_active_preview();
            if self.active_is_markdown() {
                self.reveal_preview();
            }
            self.redraw = true;
            return Ok(Outcome::Done);
        }

        let id = BufferId(self.next_buffer);
        let buffer = Buffer::open(id, &path, self.fs.as_ref(), self.detector.as_ref())?;
        self.next_buffer += 1;
        let markdown = buffer.language().is_markdown();
        tracing::info!("Opened {} ({})", path.display(), buffer.language());

        self.tabs.open_tab(buffer);
        if markdown {
            self.refresh_preview(&path);
            self.reveal_preview();
        }
        self.redraw = true;
        Ok(Outcome::Done)
    }

    fn active_is_markdown(&self) -> bool {
        self.tabs
            .active()
            .is_some_and(|t| t.buffer().language().is_markdown())
    }

    fn reveal_preview(&mut self) {
        if let Err(e) = self.layout.set_collapsed(Panel::Preview, false) {
            tracing::warn!("Cannot show preview: {}", e);
        }
    }

    fn open_from_tree(&mut self, path: &Path) -> Result<Outcome, WorkspaceError> {
        let path = self.resolve_path(path);
        if self.fs.is_dir(&path) {
            tracing::debug!("Ignoring directory selection {}", path.display());
            return Ok(Outcome::Done);
        }
        self.open(&path)
    }

    fn edit(&mut self, range: Range<usize>, text: &str) -> Result<Outcome, WorkspaceError> {
        let buffer = self
            .tabs
            .active_mut()
            .ok_or(WorkspaceError::NoActiveTab)?
            .buffer_mut();
        buffer.edit(range, text);
        let markdown = buffer.language().is_markdown().then(|| buffer.path().to_path_buf());

        if let Some(path) = markdown {
            self.refresh_preview(&path);
        }
        self.redraw = true;
        Ok(Outcome::Done)
    }

    fn save(&mut self) -> Result<Outcome, WorkspaceError> {
        let index = self.tabs.active_index().ok_or(WorkspaceError::NoActiveTab)?;
        self.save_at(index)?;
        Ok(Outcome::Done)
    }

    fn save_at(&mut self, index: usize) -> Result<(), WorkspaceError> {
        let len = self.tabs.len();
        let tab = self
            .tabs
            .get_mut(index)
            .ok_or(TabError::OutOfRange { index, len })?;
        let name = tab.title();
        let buffer = tab.buffer_mut();
        let recreated = buffer.is_detached();

        buffer.save(self.fs.as_ref())?;
        let markdown = buffer.language().is_markdown().then(|| buffer.path().to_path_buf());

        self.notifications.info(format!("File {name} saved!"));
        if recreated {
            self.notifications
                .warn(format!("{name} had been deleted on disk and was recreated"));
        }
        if let Some(path) = markdown {
            self.refresh_preview(&path);
        }
        self.redraw = true;
        Ok(())
    }

    fn close(&mut self, index: Option<usize>, force: bool) -> Result<Outcome, WorkspaceError> {
        let index = index
            .or(self.tabs.active_index())
            .ok_or(WorkspaceError::NoActiveTab)?;

        match self.close_at(index, force) {
            Err(WorkspaceError::Tab(TabError::Buffer(BufferError::UnsavedChanges(path)))) => {
                let len = self.tabs.len();
                let tab = self
                    .tabs
                    .get(index)
                    .ok_or(TabError::OutOfRange { index, len })?;
                let confirm = Confirm::CloseTab { tab: tab.id(), path };
                self.pending = Some(confirm.clone());
                Ok(Outcome::NeedsConfirmation(confirm))
            }
            other => other,
        }
    }

    fn close_at(&mut self, index: usize, force: bool) -> Result<Outcome, WorkspaceError> {
        let tab = self.tabs.close_tab(index, force)?;
        let name = tab.title();
        let buffer = tab.into_buffer();

        if buffer.language().is_markdown() && self.preview.remove(buffer.path()) {
            self.notifications.info(format!("Closed {name} and its preview"));
            if self.preview.is_empty() {
                if let Err(e) = self.layout.set_collapsed(Panel::Preview, true) {
                    tracing::warn!("Cannot hide preview: {}", e);
                }
            }
        } else {
            self.notifications.info(format!("Closed {name}"));
        }
        tracing::info!("Closed {}", buffer.path().display());

        self.show_active_preview();
        self.redraw = true;
        Ok(Outcome::Done)
    }

    fn switch_tab(&mut self, index: usize) -> Result<Outcome, WorkspaceError> {
        self.tabs.switch_to(index)?;
        self.show_active_preview();
        self.redraw = true;
        Ok(Outcome::Done)
    }

    fn quit(&mut self, force: bool) -> Result<Outcome, WorkspaceError> {
        let dirty: Vec<PathBuf> = self
            .tabs
            .dirty_tabs()
            .into_iter()
            .filter_map(|i| self.tabs.get(i))
            .map(|t| t.buffer().path().to_path_buf())
            .collect();

        if !dirty.is_empty() && !force {
            let confirm = Confirm::Quit { dirty };
            self.pending = Some(confirm.clone());
            return Ok(Outcome::NeedsConfirmation(confirm));
        }
        tracing::info!("Quitting");
        Ok(Outcome::Quit)
    }

    fn toggle_terminal(&mut self) -> Result<Outcome, WorkspaceError> {
        if self.layout.is_visible(Panel::Terminal) {
            self.layout.set_collapsed(Panel::Terminal, true)?;
            self.focus_editor();
        } else {
            self.show_terminal()?;
            self.focus_terminal();
        }
        self.redraw = true;
        Ok(Outcome::Done)
    }

    /// Make the terminal panel visible, starting the first session if needed
    fn show_terminal(&mut self) -> Result<(), WorkspaceError> {
        self.layout.set_collapsed(Panel::Terminal, false)?;
        self.redraw = true;
        if self.terminals.is_empty() {
            self.start_session()?;
        }
        Ok(())
    }

    fn start_session(&mut self) -> Result<SessionId, WorkspaceError> {
        let command = ShellCommand::new(self.config.terminal.shell_program())
            .with_args(self.config.terminal.args.iter().cloned())
            .with_cwd(self.root.clone());
        let id = self
            .terminals
            .start(self.host.as_mut(), &command, &self.config.terminal)?;
        self.redraw = true;
        Ok(id)
    }

    fn close_session(&mut self, id: SessionId) -> Result<Outcome, WorkspaceError> {
        self.terminals.close(id)?;
        self.notifications.info(format!("Closed terminal {id}"));
        if self.terminals.is_empty() && self.focus == Focus::Terminal {
            self.focus_editor();
        }
        self.redraw = true;
        Ok(Outcome::Done)
    }

    fn focus_terminal(&mut self) {
        self.focus = Focus::Terminal;
        self.terminals.focus_panel();
        self.redraw = true;
    }

    fn focus_editor(&mut self) {
        self.focus = Focus::Editor;
        self.terminals.blur_panel();
        self.redraw = true;
    }

    /// Render `path`'s buffer into the preview and display it
    fn refresh_preview(&mut self, path: &Path) {
        let Some(index) = self.tabs.find_by_path(path) else {
            return;
        };
        if let Some(tab) = self.tabs.get(index) {
            let document = self.renderer.render(tab.buffer().text());
            self.preview.upsert(path, document);
        }
    }

    /// Show the active tab's document if it is markdown; otherwise leave the preview alone
    fn show_active_preview(&mut self) {
        let Some(tab) = self.tabs.active() else {
            return;
        };
        if !tab.buffer().language().is_markdown() {
            return;
        }
        let path = tab.buffer().path().to_path_buf();
        if !self.preview.show(&path) {
            self.refresh_preview(&path);
        }
    }
}
