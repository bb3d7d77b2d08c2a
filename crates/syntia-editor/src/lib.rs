// ABOUTME: Open file buffers and the ordered set of editor tabs.
// ABOUTME: Owns dirty tracking, save/close rules, and tab activation.

pub mod buffer;
pub mod fs;
pub mod tabs;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use buffer::{Buffer, BufferError, BufferId, DiskStatus};
pub use fs::{FileSystem, StdFileSystem};
pub use tabs::{Tab, TabError, TabId, TabRegistry};
