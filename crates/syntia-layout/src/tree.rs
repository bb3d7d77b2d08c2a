// ABOUTME: Binary split tree for the workspace panels, stored in an arena.
// ABOUTME: Supports ratio resizing, collapsing leaves, and region computation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use syntia_core::LayoutSettings;

/// A named screen region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Tree,
    Editor,
    Terminal,
    Preview,
}

impl Panel {
    pub fn all() -> &'static [Panel] {
        &[Panel::Tree, Panel::Editor, Panel::Terminal, Panel::Preview]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Panel::Tree => "tree",
            Panel::Editor => "editor",
            Panel::Terminal => "terminal",
            Panel::Preview => "preview",
        }
    }

    /// The editor always stays on screen
    pub fn is_collapsible(&self) -> bool {
        !matches!(self, Panel::Editor)
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Panel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Panel::all()
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown panel '{s}'"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("The {0} panel cannot be collapsed")]
    NotCollapsible(Panel),

    #[error("The {0} panel is not part of the layout")]
    UnknownPanel(Panel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Children side by side, ratio is the first child's share of the width
    Horizontal,
    /// Children stacked, ratio is the first child's share of the height
    Vertical,
}

#[derive(Debug)]
enum Node {
    Leaf(Panel),
    Split {
        direction: Direction,
        ratio: f32,
        first: NodeId,
        second: NodeId,
        /// Per child; a collapsed child's space goes to its sibling
        collapsed: [bool; 2],
    },
}

/// Rectangle in terminal cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x
            && y >= self.y
            && (x - self.x) < self.width
            && (y - self.y) < self.height
    }
}

#[derive(Debug)]
pub struct LayoutTree {
    nodes: Vec<Node>,
    root: NodeId,
    min_ratio: f32,
    max_ratio: f32,
}

impl LayoutTree {
    /// Default workspace shape:
    /// tree | (editor | (preview / terminal)), with the preview collapsed
    pub fn new(settings: &LayoutSettings) -> Self {
        let (min_ratio, max_ratio) = settings.ratio_bounds();
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            min_ratio,
            max_ratio,
        };

        let file_tree = tree.push(Node::Leaf(Panel::Tree));
        let editor = tree.push(Node::Leaf(Panel::Editor));
        let preview = tree.push(Node::Leaf(Panel::Preview));
        let terminal = tree.push(Node::Leaf(Panel::Terminal));

        let right = tree.push_split(
            Direction::Vertical,
            settings.preview_ratio,
            preview,
            terminal,
            [true, !settings.show_terminal],
        );
        let main = tree.push_split(
            Direction::Horizontal,
            settings.editor_ratio,
            editor,
            right,
            [false, false],
        );
        tree.root = tree.push_split(
            Direction::Horizontal,
            settings.tree_ratio,
            file_tree,
            main,
            [!settings.show_tree, false],
        );
        tree
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn push_split(
        &mut self,
        direction: Direction,
        ratio: f32,
        first: NodeId,
        second: NodeId,
        collapsed: [bool; 2],
    ) -> NodeId {
        let ratio = self.clamp_ratio(ratio);
        self.push(Node::Split {
            direction,
            ratio,
            first,
            second,
            collapsed,
        })
    }

    fn clamp_ratio(&self, ratio: f32) -> f32 {
        if ratio.is_finite() {
            ratio.clamp(self.min_ratio, self.max_ratio)
        } else {
            0.5_f32.clamp(self.min_ratio, self.max_ratio)
        }
    }

    pub fn ratio_bounds(&self) -> (f32, f32) {
        (self.min_ratio, self.max_ratio)
    }

    /// Panels in left-to-right, top-to-bottom order
    pub fn panels(&self) -> Vec<Panel> {
        let mut result = Vec::new();
        self.collect_panels(self.root, &mut result);
        result
    }

    /// Shift the ratio of the split at `path` by `delta`, clamped to the bounds.
    ///
    /// `path` lists child indices from the root (0 = first, 1 = second).
    /// Returns the resulting ratio, or `None` when the path doesn't reach a split.
    pub fn resize(&mut self, path: &[usize], delta: f32) -> Option<f32> {
        let id = self.node_at(path)?;
        let (min, max) = (self.min_ratio, self.max_ratio);
        match &mut self.nodes[id.0] {
            Node::Split { ratio, .. } => {
                if delta.is_finite() {
                    *ratio = (*ratio + delta).clamp(min, max);
                }
                Some(*ratio)
            }
            Node::Leaf(_) => None,
        }
    }

    pub fn ratio_at(&self, path: &[usize]) -> Option<f32> {
        match &self.nodes[self.node_at(path)?.0] {
            Node::Split { ratio, .. } => Some(*ratio),
            Node::Leaf(_) => None,
        }
    }

    /// Child-index path from the root to `panel`
    pub fn path_to(&self, panel: Panel) -> Option<Vec<usize>> {
        let mut id = self.find_leaf(panel)?;
        let mut path = Vec::new();
        while let Some((parent, side)) = self.parent_of(id) {
            path.push(side);
            id = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Path of the split that directly contains `panel`
    pub fn path_to_parent(&self, panel: Panel) -> Option<Vec<usize>> {
        let mut path = self.path_to(panel)?;
        path.pop()?;
        Some(path)
    }

    /// Flip the collapsed flag of `panel`. Returns whether it is now collapsed.
    pub fn toggle_collapse(&mut self, panel: Panel) -> Result<bool, LayoutError> {
        let (parent, side) = self.collapsible_slot(panel)?;
        let Node::Split { collapsed, .. } = &mut self.nodes[parent.0] else {
            return Err(LayoutError::UnknownPanel(panel));
        };
        collapsed[side] = !collapsed[side];
        tracing::debug!("{} panel collapsed: {}", panel, collapsed[side]);
        Ok(collapsed[side])
    }

    pub fn set_collapsed(&mut self, panel: Panel, value: bool) -> Result<(), LayoutError> {
        let (parent, side) = self.collapsible_slot(panel)?;
        if let Node::Split { collapsed, .. } = &mut self.nodes[parent.0] {
            collapsed[side] = value;
        }
        Ok(())
    }

    /// Whether `panel` gets screen space
    pub fn is_visible(&self, panel: Panel) -> bool {
        let Some(mut id) = self.find_leaf(panel) else {
            return false;
        };
        while let Some((parent, side)) = self.parent_of(id) {
            if let Node::Split { collapsed, .. } = &self.nodes[parent.0] {
                if collapsed[side] {
                    return false;
                }
            }
            id = parent;
        }
        true
    }

    /// Screen region of every visible panel for a `width` x `height` area.
    ///
    /// Pure: the same tree and size always give the same map.
    pub fn compute_regions(&self, width: u16, height: u16) -> HashMap<Panel, Rect> {
        let mut result = HashMap::new();
        self.collect_rects(self.root, Rect::new(0, 0, width, height), &mut result);
        result
    }

    /// Which visible panel covers cell (`x`, `y`)
    pub fn panel_at(&self, width: u16, height: u16, x: u16, y: u16) -> Option<Panel> {
        self.compute_regions(width, height)
            .into_iter()
            .find(|(_, rect)| rect.contains(x, y))
            .map(|(panel, _)| panel)
    }

    fn collapsible_slot(&self, panel: Panel) -> Result<(NodeId, usize), LayoutError> {
        let leaf = self
            .find_leaf(panel)
            .ok_or(LayoutError::UnknownPanel(panel))?;
        if !panel.is_collapsible() {
            return Err(LayoutError::NotCollapsible(panel));
        }
        self.parent_of(leaf)
            .ok_or(LayoutError::NotCollapsible(panel))
    }

    fn node_at(&self, path: &[usize]) -> Option<NodeId> {
        let mut id = self.root;
        for &step in path {
            id = match &self.nodes[id.0] {
                Node::Split { first, .. } if step == 0 => *first,
                Node::Split { second, .. } if step == 1 => *second,
                _ => return None,
            };
        }
        Some(id)
    }

    fn find_leaf(&self, panel: Panel) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| matches!(n, Node::Leaf(p) if *p == panel))
            .map(NodeId)
    }

    fn parent_of(&self, child: NodeId) -> Option<(NodeId, usize)> {
        self.nodes.iter().enumerate().find_map(|(i, node)| match node {
            Node::Split { first, .. } if *first == child => Some((NodeId(i), 0)),
            Node::Split { second, .. } if *second == child => Some((NodeId(i), 1)),
            _ => None,
        })
    }

    fn has_visible(&self, id: NodeId) -> bool {
        match &self.nodes[id.0] {
            Node::Leaf(_) => true,
            Node::Split {
                first,
                second,
                collapsed,
                ..
            } => {
                (!collapsed[0] && self.has_visible(*first))
                    || (!collapsed[1] && self.has_visible(*second))
            }
        }
    }

    fn collect_rects(&self, id: NodeId, rect: Rect, out: &mut HashMap<Panel, Rect>) {
        match &self.nodes[id.0] {
            Node::Leaf(panel) => {
                out.insert(*panel, rect);
            }
            Node::Split {
                direction,
                ratio,
                first,
                second,
                collapsed,
            } => {
                let show_first = !collapsed[0] && self.has_visible(*first);
                let show_second = !collapsed[1] && self.has_visible(*second);
                match (show_first, show_second) {
                    (true, true) => {
                        let (first_rect, second_rect) = split_rect(rect, *direction, *ratio);
                        self.collect_rects(*first, first_rect, out);
                        self.collect_rects(*second, second_rect, out);
                    }
                    (true, false) => self.collect_rects(*first, rect, out),
                    (false, true) => self.collect_rects(*second, rect, out),
                    (false, false) => {}
                }
            }
        }
    }

    fn collect_panels(&self, id: NodeId, out: &mut Vec<Panel>) {
        match &self.nodes[id.0] {
            Node::Leaf(panel) => out.push(*panel),
            Node::Split { first, second, .. } => {
                self.collect_panels(*first, out);
                self.collect_panels(*second, out);
            }
        }
    }
}

fn split_rect(rect: Rect, direction: Direction, ratio: f32) -> (Rect, Rect) {
    match direction {
        Direction::Horizontal => {
            let first = share(rect.width, ratio);
            (
                Rect::new(rect.x, rect.y, first, rect.height),
                Rect::new(rect.x + first, rect.y, rect.width - first, rect.height),
            )
        }
        Direction::Vertical => {
            let first = share(rect.height, ratio);
            (
                Rect::new(rect.x, rect.y, rect.width, first),
                Rect::new(rect.x, rect.y + first, rect.width, rect.height - first),
            )
        }
    }
}

fn share(extent: u16, ratio: f32) -> u16 {
    ((extent as f32 * ratio).round() as u16).min(extent)
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new(&LayoutSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> LayoutTree {
        LayoutTree::default()
    }

    #[test]
    fn default_shape() {
        let tree = tree();
        assert_eq!(
            tree.panels(),
            vec![Panel::Tree, Panel::Editor, Panel::Preview, Panel::Terminal]
        );
        assert!(tree.is_visible(Panel::Tree));
        assert!(tree.is_visible(Panel::Terminal));
        assert!(!tree.is_visible(Panel::Preview));
    }

    #[test]
    fn regions_cover_the_area() {
        let tree = tree();
        let regions = tree.compute_regions(100, 40);

        assert_eq!(regions.get(&Panel::Tree), Some(&Rect::new(0, 0, 20, 40)));
        assert_eq!(regions.get(&Panel::Editor), Some(&Rect::new(20, 0, 40, 40)));
        // Preview is collapsed, so the terminal takes the whole right column
        assert_eq!(regions.get(&Panel::Terminal), Some(&Rect::new(60, 0, 40, 40)));
        assert!(!regions.contains_key(&Panel::Preview));
    }

    #[test]
    fn regions_are_deterministic() {
        let tree = tree();
        assert_eq!(tree.compute_regions(137, 51), tree.compute_regions(137, 51));
    }

    #[test]
    fn resize_never_leaves_bounds() {
        let mut tree = tree();
        let path = tree.path_to_parent(Panel::Tree).unwrap();
        assert!(path.is_empty());

        for delta in [0.5, 0.5, 3.0, -0.2, -10.0, 0.05, f32::NAN, -0.7] {
            let ratio = tree.resize(&path, delta).unwrap();
            assert!((0.1..=0.9).contains(&ratio), "ratio {ratio} escaped after {delta}");
        }
        assert_eq!(tree.resize(&path, 5.0), Some(0.9));
        assert_eq!(tree.resize(&path, -5.0), Some(0.1));
    }

    #[test]
    fn nan_bounds_in_settings_use_defaults() {
        let settings = LayoutSettings {
            min_ratio: f32::NAN,
            ..LayoutSettings::default()
        };
        let mut tree = LayoutTree::new(&settings);
        assert_eq!(tree.ratio_bounds(), (0.1, 0.9));

        let path = tree.path_to_parent(Panel::Tree).unwrap();
        assert_eq!(tree.resize(&path, -5.0), Some(0.1));
    }

    #[test]
    fn resize_on_leaf_or_bad_path_is_noop() {
        let mut tree = tree();
        assert_eq!(tree.resize(&[0], 0.1), None);
        assert_eq!(tree.resize(&[1, 1, 1, 1], 0.1), None);
        assert_eq!(tree.resize(&[7], 0.1), None);
        assert_eq!(tree.ratio_at(&[]), Some(0.2));
    }

    #[test]
    fn collapse_then_restore_keeps_ratio() {
        let mut tree = tree();
        let path = tree.path_to_parent(Panel::Tree).unwrap();
        tree.resize(&path, 0.13);
        let before = tree.ratio_at(&path).unwrap();

        assert!(tree.toggle_collapse(Panel::Tree).unwrap());
        let regions = tree.compute_regions(100, 40);
        assert!(!regions.contains_key(&Panel::Tree));
        assert_eq!(regions.get(&Panel::Editor).unwrap().x, 0);

        assert!(!tree.toggle_collapse(Panel::Tree).unwrap());
        assert_eq!(tree.ratio_at(&path).unwrap(), before);
        assert!(tree.is_visible(Panel::Tree));
    }

    #[test]
    fn editor_is_not_collapsible() {
        let mut tree = tree();
        assert!(matches!(
            tree.toggle_collapse(Panel::Editor),
            Err(LayoutError::NotCollapsible(Panel::Editor))
        ));
    }

    #[test]
    fn fully_collapsed_column_gives_space_to_editor() {
        let mut tree = tree();
        tree.set_collapsed(Panel::Terminal, true).unwrap();

        let regions = tree.compute_regions(100, 40);
        assert_eq!(regions.get(&Panel::Editor), Some(&Rect::new(20, 0, 80, 40)));
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn preview_and_terminal_share_the_column() {
        let mut tree = tree();
        tree.set_collapsed(Panel::Preview, false).unwrap();

        let regions = tree.compute_regions(100, 40);
        assert_eq!(regions.get(&Panel::Preview), Some(&Rect::new(60, 0, 40, 20)));
        assert_eq!(regions.get(&Panel::Terminal), Some(&Rect::new(60, 20, 40, 20)));
        assert_eq!(tree.panel_at(100, 40, 70, 25), Some(Panel::Terminal));
    }

    #[test]
    fn panel_names_parse() {
        assert_eq!("terminal".parse::<Panel>(), Ok(Panel::Terminal));
        assert!("sidebar".parse::<Panel>().is_err());
    }
}
