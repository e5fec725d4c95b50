//! Fill the graph grid of a projected repository

use std::ops::Range;

use ratatui::style::Color;

use super::{BranchBits, ConnectorBits, GraphCell, GraphRow};
use crate::view::ViewRepo;

struct Grid {
    rows: Vec<GraphRow>,
}

impl Grid {
    fn new(repo: &ViewRepo) -> Self {
        let mut row = GraphRow::with_capacity(repo.branches.len());
        for b in &repo.branches {
            row.push(GraphCell {
                branch_color: b.color,
                ..Default::default()
            });
        }
        Self {
            rows: vec![row; repo.commits.len()],
        }
    }

    fn branch(&mut self, row: usize, column: usize, bits: BranchBits) {
        self.rows[row][column].branch |= bits;
    }

    fn connector(&mut self, row: usize, column: usize, bits: ConnectorBits) {
        self.rows[row][column].connector |= bits;
    }

    /// Horizontal ribbon ─ over `columns` at `row`
    fn pass(&mut self, row: usize, columns: Range<usize>, color: Color) {
        for k in columns {
            let cell = &mut self.rows[row][k];
            cell.connector |= ConnectorBits::PASS;
            cell.branch |= BranchBits::PASS;
            cell.set_pass_color(color);
        }
    }

    /// Vertical line │ in `column` for rows strictly between `from` and `to`
    fn vertical(&mut self, column: usize, from: usize, to: usize) {
        for row in from + 1..to {
            self.connector(row, column, ConnectorBits::M_LINE);
        }
    }
}

/// Connects commit `row` at `column` with the parent `parent_row` at
/// `parent_column`. `left_color` colors a ribbon from the left, `right_color` one to the right.
fn connect(
    grid: &mut Grid,
    row: usize,
    column: usize,
    parent_row: usize,
    parent_column: usize,
    left_color: Color,
    right_color: Color,
) {
    if parent_column < column {
        // Other branch is on the left ╭
        grid.connector(row, column, ConnectorBits::MERGE_LEFT);
        grid.pass(parent_row, parent_column + 1..column, left_color);
        grid.vertical(column, row, parent_row);
        grid.connector(parent_row, column, ConnectorBits::BRANCH_RIGHT);
    } else {
        // Other branch is on the right ╮
        grid.connector(row, parent_column, ConnectorBits::MERGE_RIGHT);
        grid.pass(row, column + 1..parent_column, right_color);
        grid.vertical(parent_column, row, parent_row);
        grid.connector(parent_row, parent_column, ConnectorBits::BRANCH_LEFT);
    }
}

/// One row per commit and one cell per branch column
pub fn rasterize(repo: &ViewRepo) -> Vec<GraphRow> {
    let mut grid = Grid::new(repo);
    draw_branch_lines(&mut grid, repo);
    draw_connectors(&mut grid, repo);
    grid.rows
}

fn draw_branch_lines(grid: &mut Grid, repo: &ViewRepo) {
    for (column, branch) in repo.branches.iter().enumerate() {
        let (Some(tip), Some(bottom)) = (branch.tip, branch.bottom) else {
            continue;
        };

        let last = bottom.min(repo.commits.len().saturating_sub(1));
        for row in tip..=last {
            if repo.commits[row].branch != column {
                // Branch line ┃ past commits owned by other branches. A tip on a
                // commit of another branch is drawn with the connectors.
                if row != tip {
                    grid.branch(row, column, BranchBits::LINE);
                }
                continue;
            }
            if row == tip {
                grid.branch(row, column, BranchBits::TIP);
                if branch.is_git_branch() {
                    // More commits may follow ┣
                    grid.branch(row, column, BranchBits::ACTIVE_TIP);
                }
            }
            if row == bottom {
                grid.branch(row, column, BranchBits::BOTTOM);
            }
            if row != tip && row != bottom {
                grid.branch(row, column, BranchBits::COMMIT);
            }
        }
    }
}

fn draw_connectors(grid: &mut Grid, repo: &ViewRepo) {
    for (row, commit) in repo.commits.iter().enumerate() {
        let column = commit.branch;
        let color = repo.branches[column].color;

        if let Some(merge_row) = commit.merge_parent {
            let merge_column = repo.commits[merge_row].branch;
            if merge_column != column {
                let merge_color = repo.branches[merge_column].color;
                connect(grid, row, column, merge_row, merge_column, color, merge_color);
            }
        }

        if let Some(parent_row) = commit.first_parent {
            let parent_column = repo.commits[parent_row].branch;
            if parent_column != column {
                // Bottom commit, branched out of the parent's branch
                connect(grid, row, column, parent_row, parent_column, color, color);
            }
        }

        // Tips of other branches on this commit ┺
        for (other, branch) in repo.branches.iter().enumerate() {
            if other == column || branch.tip != Some(row) {
                continue;
            }
            grid.branch(row, other, BranchBits::BOTTOM | BranchBits::PASS);
            if column < other {
                grid.pass(row, column + 1..other + 1, branch.color);
            }
        }
    }
}
