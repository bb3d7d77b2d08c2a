// ABOUTME: Commands the workspace accepts and what handling one can produce.
// ABOUTME: Destructive commands on dirty buffers come back as confirmations.

use std::ops::Range;
use std::path::PathBuf;

use syntia_editor::TabId;
use syntia_layout::Panel;
use syntia_terminal::SessionId;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open a file, or switch to it if already open
    Open(PathBuf),
    /// A selection in the file tree; directories are ignored
    OpenFromTree(PathBuf),
    /// Replace chars in `range` of the active buffer
    Edit { range: Range<usize>, text: String },
    Save,
    /// Close a tab, the active one when `index` is `None`
    Close { index: Option<usize>, force: bool },
    SwitchTab(usize),
    ReorderTab { from: usize, to: usize },
    ToggleTerminal,
    ToggleTree,
    TogglePreview,
    /// Move the divider of the split at `path` by `delta`
    Resize { path: Vec<usize>, delta: f32 },
    NewSession,
    /// Route terminal input to another session
    SwitchSession(SessionId),
    CloseSession(SessionId),
    TerminalInput(Vec<u8>),
    FocusTerminal,
    FocusEditor,
    Quit { force: bool },
}

impl Command {
    /// Panel whose contents or geometry this command changes
    pub fn target(&self) -> Option<Panel> {
        match self {
            Command::Open(_)
            | Command::OpenFromTree(_)
            | Command::Edit { .. }
            | Command::Save
            | Command::Close { .. }
            | Command::SwitchTab(_)
            | Command::ReorderTab { .. }
            | Command::FocusEditor => Some(Panel::Editor),
            Command::ToggleTerminal
            | Command::NewSession
            | Command::SwitchSession(_)
            | Command::CloseSession(_)
            | Command::TerminalInput(_)
            | Command::FocusTerminal => Some(Panel::Terminal),
            Command::ToggleTree => Some(Panel::Tree),
            Command::TogglePreview => Some(Panel::Preview),
            Command::Resize { .. } | Command::Quit { .. } => None,
        }
    }
}

/// What a handled command asks of the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    /// Nothing happened yet; answer with `Workspace::resolve`
    NeedsConfirmation(Confirm),
    /// The application should exit
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Confirm {
    CloseTab { tab: TabId, path: PathBuf },
    Quit { dirty: Vec<PathBuf> },
}

impl Confirm {
    /// Question to put to the user
    pub fn prompt(&self) -> String {
        match self {
            Confirm::CloseTab { path, .. } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("{name} has unsaved changes. Save before closing?")
            }
            Confirm::Quit { dirty } => {
                format!("{} file(s) have unsaved changes. Save before quitting?", dirty.len())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Save,
    Discard,
    Cancel,
}

impl std::str::FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "save" | "s" | "y" | "yes" => Ok(Choice::Save),
            "discard" | "d" | "n" | "no" => Ok(Choice::Discard),
            "cancel" | "c" => Ok(Choice::Cancel),
            other => Err(format!("unknown choice: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_name_the_file() {
        let confirm = Confirm::CloseTab {
            tab: TabId(0),
            path: PathBuf::from("/p/a.py"),
        };
        assert_eq!(confirm.prompt(), "a.py has unsaved changes. Save before closing?");
    }

    #[test]
    fn parse_choice() {
        assert_eq!("Save".parse::<Choice>(), Ok(Choice::Save));
        assert_eq!("n".parse::<Choice>(), Ok(Choice::Discard));
        assert_eq!("cancel".parse::<Choice>(), Ok(Choice::Cancel));
        assert!("maybe".parse::<Choice>().is_err());
    }
}
