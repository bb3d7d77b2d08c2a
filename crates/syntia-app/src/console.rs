// ABOUTME: Line-oriented console: parses typed commands and prints workspace state.
// ABOUTME: Stands in for a full-screen renderer when running headless.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use syntia_core::{Notification, Severity};
use syntia_layout::{Panel, Rect};
use syntia_terminal::SessionId;
use syntia_workspace::{Choice, Command, Confirm, DirEntry, Focus, Workspace};

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Confirm(Choice),
    List(Option<PathBuf>),
    Regions { width: u16, height: u16 },
    Status,
    Help,
    Empty,
}

pub const HELP: &str = "\
open <path>               open a file (switches if already open)
edit <start> <end> <text> replace chars start..end of the active buffer
save                      save the active buffer
close [index] [!]         close a tab, ! discards unsaved changes
switch <index>            activate a tab
move <from> <to>          reorder tabs
tree | terminal | preview toggle a panel
ls [path]                 list a directory
resize <path> <delta>     move a divider, path like 1.1 or - for the root
new-session               start another shell
session <id>              route terminal input to another shell
kill-session <id>         terminate a shell
send <text>               type into the active shell (\\n, \\t, \\e escapes)
focus <editor|terminal>   move keyboard focus
regions <w> <h>           show panel geometry for a screen size
confirm <save|discard|cancel>
status                    show tabs and panels
quit [!]                  exit, ! discards unsaved changes";

pub fn parse(line: &str) -> Result<Input> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let input = match word {
        "" => Input::Empty,
        "help" | "?" => Input::Help,
        "status" => Input::Status,
        "open" => {
            if rest.is_empty() {
                bail!("usage: open <path>");
            }
            Input::Command(Command::Open(PathBuf::from(rest)))
        }
        "edit" => {
            let start = number(args.next(), "start")?;
            let end = number(args.next(), "end")?;
            let text = text_after(rest, 2);
            Input::Command(Command::Edit {
                range: start..end,
                text: unescape(text),
            })
        }
        "save" => Input::Command(Command::Save),
        "close" => {
            let mut index = None;
            let mut force = false;
            for arg in args {
                if arg == "!" {
                    force = true;
                } else {
                    index = Some(number(Some(arg), "index")?);
                }
            }
            Input::Command(Command::Close { index, force })
        }
        "switch" => Input::Command(Command::SwitchTab(number(args.next(), "index")?)),
        "move" => Input::Command(Command::ReorderTab {
            from: number(args.next(), "from")?,
            to: number(args.next(), "to")?,
        }),
        "tree" => Input::Command(Command::ToggleTree),
        "terminal" => Input::Command(Command::ToggleTerminal),
        "preview" => Input::Command(Command::TogglePreview),
        "ls" => Input::List((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "resize" => {
            let path = split_path(args.next().ok_or_else(|| anyhow!("missing split path"))?)?;
            let delta: f32 = args
                .next()
                .ok_or_else(|| anyhow!("missing delta"))?
                .parse()
                .context("delta must be a number")?;
            Input::Command(Command::Resize { path, delta })
        }
        "new-session" => Input::Command(Command::NewSession),
        "session" => Input::Command(Command::SwitchSession(session_id(args.next())?)),
        "kill-session" => Input::Command(Command::CloseSession(session_id(args.next())?)),
        "send" => Input::Command(Command::TerminalInput(
            format!("{}\n", unescape(rest)).into_bytes(),
        )),
        "focus" => match args.next() {
            Some("editor") => Input::Command(Command::FocusEditor),
            Some("terminal") => Input::Command(Command::FocusTerminal),
            _ => bail!("usage: focus <editor|terminal>"),
        },
        "regions" => Input::Regions {
            width: number(args.next(), "width")?,
            height: number(args.next(), "height")?,
        },
        "confirm" => {
            let choice = args.next().ok_or_else(|| anyhow!("usage: confirm <save|discard|cancel>"))?;
            Input::Confirm(choice.parse().map_err(|e: String| anyhow!(e))?)
        }
        "quit" | "q" => Input::Command(Command::Quit { force: rest == "!" }),
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(input)
}

fn number<T: std::str::FromStr>(arg: Option<&str>, name: &str) -> Result<T> {
    let arg = arg.ok_or_else(|| anyhow!("missing {name}"))?;
    arg.parse()
        .map_err(|_| anyhow!("{name} must be a non-negative number, got '{arg}'"))
}

/// Session ids print as "#2"; the "#" is optional here
fn session_id(arg: Option<&str>) -> Result<SessionId> {
    let arg = arg.map(|a| a.strip_prefix('#').unwrap_or(a));
    Ok(SessionId(number(arg, "session id")?))
}

/// What follows the first `tokens` whitespace-separated words, minus one separator.
/// Further leading spaces belong to the text.
fn text_after(rest: &str, tokens: usize) -> &str {
    let mut remaining = rest;
    for _ in 0..tokens {
        remaining = remaining.trim_start();
        let end = remaining.find(char::is_whitespace).unwrap_or(remaining.len());
        remaining = &remaining[end..];
    }
    remaining
        .strip_prefix(char::is_whitespace)
        .unwrap_or(remaining)
}

/// "-" is the root split, "1.0" the first child of the root's second child
fn split_path(arg: &str) -> Result<Vec<usize>> {
    if arg == "-" {
        return Ok(Vec::new());
    }
    arg.split('.')
        .map(|part| match part {
            "0" => Ok(0),
            "1" => Ok(1),
            other => bail!("split path steps are 0 or 1, got '{other}'"),
        })
        .collect()
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('e') => out.push('\x1b'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Prints workspace state to `out`
pub struct Console<W: Write> {
    out: W,
    /// How much of each session's transcript has been echoed
    echoed: HashMap<SessionId, usize>,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            echoed: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn help(&mut self) -> Result<()> {
        writeln!(self.out, "{HELP}")?;
        Ok(())
    }

    pub fn error(&mut self, error: &anyhow::Error) -> Result<()> {
        writeln!(self.out, "error: {error:#}")?;
        Ok(())
    }

    pub fn notifications(&mut self, notes: &[Notification]) -> Result<()> {
        for note in notes {
            let tag = match note.severity {
                Severity::Information => "info",
                Severity::Warning => "warn",
                Severity::Error => "error",
            };
            writeln!(self.out, "[{tag}] {}", note.message)?;
        }
        Ok(())
    }

    pub fn prompt(&mut self, confirm: &Confirm) -> Result<()> {
        writeln!(self.out, "{} (confirm save|discard|cancel)", confirm.prompt())?;
        Ok(())
    }

    /// Input ended while the quit guard still had questions
    pub fn unanswered_quit(&mut self, dirty: &[PathBuf]) -> Result<()> {
        writeln!(self.out, "[warn] Input closed, leaving unsaved changes in:")?;
        for path in dirty {
            writeln!(self.out, "  {}", path.display())?;
        }
        Ok(())
    }

    pub fn listing(&mut self, entries: &[DirEntry]) -> Result<()> {
        for entry in entries {
            let suffix = if entry.is_dir { "/" } else { "" };
            writeln!(self.out, "  {}{}", entry.name, suffix)?;
        }
        Ok(())
    }

    pub fn regions(&mut self, regions: &HashMap<Panel, Rect>) -> Result<()> {
        for panel in Panel::all() {
            if let Some(r) = regions.get(panel) {
                writeln!(
                    self.out,
                    "  {:<8} x={} y={} {}x{}",
                    panel.name(),
                    r.x,
                    r.y,
                    r.width,
                    r.height
                )?;
            }
        }
        Ok(())
    }

    /// Tab strip and panel summary
    pub fn status(&mut self, ws: &Workspace) -> Result<()> {
        let active = ws.tabs().active_index();
        let tabs: Vec<String> = ws
            .tabs()
            .iter()
            .enumerate()
            .map(|(i, tab)| {
                if Some(i) == active {
                    format!("[{}:{}]", i, tab.display_title())
                } else {
                    format!(" {}:{} ", i, tab.display_title())
                }
            })
            .collect();
        if tabs.is_empty() {
            writeln!(self.out, "tabs: (none)")?;
        } else {
            writeln!(self.out, "tabs: {}", tabs.join(""))?;
        }

        let panels: Vec<&str> = Panel::all()
            .iter()
            .filter(|p| ws.layout().is_visible(**p))
            .map(|p| p.name())
            .collect();
        let focus = match ws.focus() {
            Focus::Editor => "editor",
            Focus::Terminal => "terminal",
        };
        write!(self.out, "panels: {}  focus: {}", panels.join(" "), focus)?;

        let sessions = ws.terminals();
        if !sessions.is_empty() {
            let unread = if sessions.any_unread() { " (unread output)" } else { "" };
            write!(self.out, "  shells: {}{}", sessions.len(), unread)?;
        }
        writeln!(self.out)?;

        if let Some(title) = ws.preview().shown().and_then(|d| d.title.as_deref()) {
            writeln!(self.out, "preview: {title}")?;
        }
        Ok(())
    }

    /// Echo output the active session produced since the last call, when the panel shows
    pub fn terminal_output(&mut self, ws: &Workspace) -> Result<()> {
        if !ws.layout().is_visible(Panel::Terminal) {
            return Ok(());
        }
        let Some(session) = ws.terminals().active() else {
            return Ok(());
        };
        let seen = self.echoed.entry(session.id()).or_insert(0);
        let transcript = session.transcript();
        if *seen < transcript.len() {
            self.out.write_all(&transcript[*seen..])?;
            *seen = transcript.len();
        }
        self.out.flush()?;
        Ok(())
    }
}
