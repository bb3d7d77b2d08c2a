// ABOUTME: Workspace coordinator tying buffers, tabs, layout, and terminals together.
// ABOUTME: Also hosts the default directory walker and markdown preview renderer.

pub mod command;
pub mod markdown;
pub mod preview;
pub mod walker;
pub mod workspace;

pub use command::{Choice, Command, Confirm, Outcome};
pub use markdown::{Block, MarkdownRenderer, PlainMarkdownRenderer, PreviewDocument};
pub use preview::Preview;
pub use walker::{DirEntry, DirectoryWalker, IgnoreWalker};
pub use workspace::{Focus, Workspace, WorkspaceError, WorkspaceState};
