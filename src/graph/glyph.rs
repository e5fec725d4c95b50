//! Box drawing characters for graph cells

use super::{BranchBits, ConnectorBits};

/// A line comes in from the left side of the branch column
pub fn has_left(branch: BranchBits, connector: ConnectorBits) -> bool {
    connector.intersects(ConnectorBits::BRANCH_LEFT | ConnectorBits::MERGE_LEFT | ConnectorBits::PASS)
        || branch.contains(BranchBits::PASS)
}

pub fn branch_glyph(bits: BranchBits, has_left: bool) -> char {
    let tip = bits.contains(BranchBits::TIP);
    let bottom = bits.contains(BranchBits::BOTTOM);
    let active = bits.contains(BranchBits::ACTIVE_TIP);
    let commit = bits.contains(BranchBits::COMMIT);
    let line = bits.contains(BranchBits::LINE);

    if tip && bottom {
        // Branch with a single commit
        if active && has_left {
            return '┺';
        }
        if has_left {
            return '╼';
        }
    }
    if tip {
        return match (active, has_left) {
            (true, true) => '╊',
            (true, false) => '┣',
            (false, true) => '┲',
            (false, false) => '┏',
        };
    }
    if bottom {
        return if has_left { '┺' } else { '┚' };
    }
    if commit {
        return if has_left { '╊' } else { '┣' };
    }
    if line {
        return if has_left { '╂' } else { '┃' };
    }
    if bits == BranchBits::PASS {
        '─'
    } else if bits.is_empty() {
        ' '
    } else {
        '*'
    }
}

pub fn connector_glyph(bits: ConnectorBits) -> char {
    const MERGE_LEFT: u8 = ConnectorBits::MERGE_LEFT.bits();
    const MERGE_RIGHT: u8 = ConnectorBits::MERGE_RIGHT.bits();
    const BRANCH_LEFT: u8 = ConnectorBits::BRANCH_LEFT.bits();
    const BRANCH_RIGHT: u8 = ConnectorBits::BRANCH_RIGHT.bits();
    const M_LINE: u8 = ConnectorBits::M_LINE.bits();
    const PASS: u8 = ConnectorBits::PASS.bits();

    match bits.bits() {
        MERGE_RIGHT => '╮',
        b if b == MERGE_RIGHT | PASS => '┬',
        b if b == MERGE_RIGHT | M_LINE => '┤',
        b if b == MERGE_RIGHT | BRANCH_RIGHT => '┤',
        b if b == MERGE_RIGHT | BRANCH_RIGHT | PASS => '┴',
        BRANCH_RIGHT => '╯',
        b if b == BRANCH_RIGHT | M_LINE | PASS => '┼',
        b if b == BRANCH_RIGHT | PASS => '┴',
        b if b == BRANCH_RIGHT | M_LINE => '┤',
        MERGE_LEFT => '╭',
        b if b == MERGE_LEFT | BRANCH_LEFT => '├',
        b if b == MERGE_LEFT | M_LINE => '├',
        BRANCH_LEFT => '╰',
        b if b == BRANCH_LEFT | M_LINE => '├',
        b if b == M_LINE | PASS => '┼',
        M_LINE => '│',
        PASS => '─',
        0 => ' ',
        _ => '*',
    }
}
