//! Branch graph cells: one row per commit, one column per branch

pub mod colors;
pub mod glyph;
pub mod rasterizer;

use bitflags::bitflags;
use ratatui::style::Color;

pub use rasterizer::rasterize;

bitflags! {
    /// What a branch column shows at a row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BranchBits: u8 {
        /// Commit in the middle of the branch ┣
        const COMMIT = 1 << 0;
        /// Branch line passing a commit owned by another branch ┃
        const LINE = 1 << 1;
        /// Horizontal ribbon crossing the column ─
        const PASS = 1 << 2;
        /// Newest commit of the branch ┏
        const TIP = 1 << 3;
        /// Oldest commit of the branch ┚
        const BOTTOM = 1 << 4;
        /// Tip of a live git branch, more commits may follow ┣
        const ACTIVE_TIP = 1 << 5;
    }
}

bitflags! {
    /// Connector drawn to the left of a branch column
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConnectorBits: u8 {
        /// ╭
        const MERGE_LEFT = 1 << 0;
        /// ╮
        const MERGE_RIGHT = 1 << 1;
        /// ╰
        const BRANCH_LEFT = 1 << 2;
        /// ╯
        const BRANCH_RIGHT = 1 << 3;
        /// │
        const M_LINE = 1 << 4;
        /// ─
        const PASS = 1 << 5;
    }
}

bitflags! {
    /// Neighbor branches hidden in the current view
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct More: u8 {
        /// A merged in branch is not shown ╮
        const MERGE_IN = 1 << 0;
        /// A branch out of this commit is not shown ╭
        const BRANCH_OUT = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphCell {
    pub branch: BranchBits,
    pub connector: ConnectorBits,
    /// Color of the column branch
    pub branch_color: Color,
    /// Color of a ribbon crossing this cell, white when several ribbons cross
    pub pass_color: Option<Color>,
}

impl Default for GraphCell {
    fn default() -> Self {
        Self {
            branch: BranchBits::empty(),
            connector: ConnectorBits::empty(),
            branch_color: Color::Reset,
            pass_color: None,
        }
    }
}

impl GraphCell {
    /// Ribbons from several branches mix to white
    pub fn set_pass_color(&mut self, color: Color) {
        self.pass_color = match self.pass_color {
            None => Some(color),
            Some(c) if c == color => Some(c),
            Some(_) => Some(Color::White),
        };
    }

    /// Connector glyph followed by branch glyph
    pub fn glyphs(&self) -> (char, char) {
        (
            glyph::connector_glyph(self.connector),
            glyph::branch_glyph(self.branch, glyph::has_left(self.branch, self.connector)),
        )
    }
}

pub type GraphRow = Vec<GraphCell>;

/// Plain text of a graph row, two characters per column
pub fn row_text(row: &[GraphCell]) -> String {
    row.iter()
        .flat_map(|cell| {
            let (connector, branch) = cell.glyphs();
            [connector, branch]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_color_mixing() {
        let mut cell = GraphCell::default();
        cell.set_pass_color(Color::Green);
        assert_eq!(cell.pass_color, Some(Color::Green));
        cell.set_pass_color(Color::Green);
        assert_eq!(cell.pass_color, Some(Color::Green));
        cell.set_pass_color(Color::Red);
        assert_eq!(cell.pass_color, Some(Color::White));
    }

    #[test]
    fn test_row_text() {
        let row = vec![
            GraphCell {
                branch: BranchBits::TIP | BranchBits::ACTIVE_TIP,
                ..Default::default()
            },
            GraphCell {
                branch: BranchBits::TIP | BranchBits::BOTTOM,
                connector: ConnectorBits::MERGE_RIGHT,
                ..Default::default()
            },
        ];
        // An empty connector is a space
        assert_eq!(row_text(&row), " ┣╮┏");
    }
}
