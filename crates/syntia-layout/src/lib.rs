// ABOUTME: Panel layout management for the editing workspace.
// ABOUTME: A split tree of named panels with clamped ratios and collapsible leaves.

mod tree;

pub use tree::{Direction, LayoutError, LayoutTree, NodeId, Panel, Rect};
