// ABOUTME: Main application entry point.
// ABOUTME: Parses arguments, loads config, and runs the workspace event loop.

mod console;

use std::io::{Stdout, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use syntia_core::Config;
use syntia_workspace::{Command, Confirm, Outcome, Workspace};
use tokio::io::{AsyncBufReadExt, BufReader};

use console::{Console, Input};

/// How often open files are compared with the disk
const DISK_CHECK_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "syntia", version, about = "Multi-panel editor workspace in the terminal")]
struct Args {
    /// Directory to work in, or a file to open (its directory becomes the root)
    root: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Returns the workspace root and a file to open initially
fn resolve_root(arg: Option<&Path>) -> Result<(PathBuf, Option<PathBuf>)> {
    let path = match arg {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };
    if !path.exists() {
        bail!("{} does not exist", path.display());
    }
    let path = path
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", path.display()))?;

    if path.is_file() {
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Ok((root, Some(path)))
    } else {
        Ok((path, None))
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => Ok(Config::load_or_default()),
    }
}

/// Print everything the workspace has queued for the user
fn present(console: &mut Console<Stdout>, workspace: &mut Workspace) -> Result<()> {
    let notes = workspace.take_notifications();
    console.notifications(&notes)?;
    if workspace.take_redraw() {
        console.terminal_output(workspace)?;
    }
    Ok(())
}

/// Stdin is gone, so nobody can answer the quit guard.
/// Unsaved work is reported and the exit is an error.
fn input_closed<W: Write>(console: &mut Console<W>, workspace: &mut Workspace) -> Result<()> {
    tracing::info!("Input closed");
    match workspace.handle(Command::Quit { force: false }) {
        Outcome::NeedsConfirmation(Confirm::Quit { dirty }) => {
            console.unanswered_quit(&dirty)?;
            bail!("input closed with {} unsaved file(s)", dirty.len())
        }
        _ => Ok(()),
    }
}

async fn run(root: PathBuf, initial: Option<PathBuf>, config: Config) -> Result<()> {
    let pump_interval = Duration::from_millis(config.behavior.pump_interval_ms.max(1));
    let mut workspace = Workspace::new(root, config);
    workspace.start();
    if let Some(file) = initial {
        workspace.handle(Command::Open(file));
    }

    let mut console = Console::new(std::io::stdout());
    console.status(&workspace)?;
    present(&mut console, &mut workspace)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pump = tokio::time::interval(pump_interval);
    let mut disk_check = tokio::time::interval(DISK_CHECK_INTERVAL);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    input_closed(&mut console, &mut workspace)?;
                    break;
                };

                let outcome = match console::parse(&line) {
                    Ok(Input::Command(command)) => workspace.handle(command),
                    Ok(Input::Confirm(choice)) => workspace.handle_choice(choice),
                    Ok(Input::List(dir)) => {
                        match workspace.list_directory(dir.as_deref()) {
                            Ok(entries) => console.listing(&entries)?,
                            Err(e) => console.error(&e.into())?,
                        }
                        Outcome::Done
                    }
                    Ok(Input::Regions { width, height }) => {
                        workspace.set_screen_size(width, height);
                        console.regions(&workspace.regions(width, height))?;
                        Outcome::Done
                    }
                    Ok(Input::Status) => {
                        console.status(&workspace)?;
                        Outcome::Done
                    }
                    Ok(Input::Help) => {
                        console.help()?;
                        Outcome::Done
                    }
                    Ok(Input::Empty) => Outcome::Done,
                    Err(e) => {
                        console.error(&e)?;
                        Outcome::Done
                    }
                };

                match outcome {
                    Outcome::Quit => break,
                    Outcome::NeedsConfirmation(confirm) => console.prompt(&confirm)?,
                    Outcome::Done => {}
                }
            }
            _ = pump.tick() => {
                workspace.pump_terminals();
            }
            _ = disk_check.tick() => {
                workspace.check_external_changes();
            }
        }

        present(&mut console, &mut workspace)?;
    }

    tracing::info!("Shutting down");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();
    let (root, initial) = resolve_root(args.root.as_deref())?;
    let config = load_config(args.config.as_deref())?;

    tracing::info!("Starting syntia in {}", root.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(root, initial, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_root(Some(dir.path().join("missing").as_path())).is_err());
    }

    #[test]
    fn file_argument_opens_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.md");
        std::fs::write(&file, "# notes").unwrap();

        let (root, initial) = resolve_root(Some(file.as_path())).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
        assert_eq!(initial, Some(file.canonicalize().unwrap()));
    }

    #[test]
    fn directory_argument_is_root() {
        let dir = tempfile::tempdir().unwrap();
        let (root, initial) = resolve_root(Some(dir.path())).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
        assert_eq!(initial, None);
    }

    fn quiet_workspace(root: &Path) -> Workspace {
        let mut config = Config::default();
        config.layout.show_terminal = false;
        Workspace::new(root, config)
    }

    #[test]
    fn closed_input_with_unsaved_changes_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.py");
        std::fs::write(&file, "x = 1\n").unwrap();

        let mut workspace = quiet_workspace(dir.path());
        let mut console = Console::new(Vec::new());
        workspace.handle(Command::Open(file.clone()));
        assert!(input_closed(&mut console, &mut workspace).is_ok());

        workspace.handle(Command::Edit { range: 0..1, text: "y".into() });
        assert!(input_closed(&mut console, &mut workspace).is_err());

        let out = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(
            out,
            format!("[warn] Input closed, leaving unsaved changes in:\n  {}\n", file.display())
        );
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "x = 1\n");
    }

    #[test]
    fn explicit_config_must_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[layout]\ntree_ratio = 0.3\n").unwrap();
        assert_eq!(load_config(Some(path.as_path())).unwrap().layout.tree_ratio, 0.3);

        std::fs::write(&path, "layout = 5").unwrap();
        assert!(load_config(Some(path.as_path())).is_err());
    }
}
