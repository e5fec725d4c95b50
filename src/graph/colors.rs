//! Branch colors

use std::collections::HashMap;

use ratatui::style::Color;

use crate::view::ViewBranch;

/// Branch color palette, picked by name hash
pub const LANE_COLORS: [Color; 8] = [
    Color::Cyan,
    Color::Green,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
    Color::Red,
    Color::LightCyan,
    Color::LightGreen,
];

pub const MAIN_BRANCH_COLOR: Color = Color::Magenta;
pub const AMBIGUOUS_BRANCH_COLOR: Color = Color::White;

pub fn get_color_by_index(color_index: usize) -> Color {
    LANE_COLORS[color_index % LANE_COLORS.len()]
}

/// 32 bit FNV-1a, stable across runs and platforms
fn fnv1a32(text: &str) -> u32 {
    text.bytes().fold(0x811c_9dc5_u32, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193))
}

/// Color of a branch by its display name. `add` shifts to the next palette entry.
pub fn branch_name_color(display_name: &str, add: u32, custom: &HashMap<String, Color>) -> Color {
    if display_name.starts_with("ambiguous@") {
        return AMBIGUOUS_BRANCH_COLOR;
    }
    if let Some(&color) = custom.get(display_name) {
        return color;
    }
    if display_name == "master" || display_name == "main" {
        return MAIN_BRANCH_COLOR;
    }
    get_color_by_index(fnv1a32(display_name).wrapping_add(add) as usize)
}

/// Assign every branch a color. A local shares its remote's color; any other
/// branch avoids its parent's color.
pub fn assign_branch_colors(branches: &mut [ViewBranch], custom: &HashMap<String, Color>) {
    let mut colors: Vec<Option<Color>> = vec![None; branches.len()];
    for b in 0..branches.len() {
        let mut visiting = vec![false; branches.len()];
        branch_color(branches, b, custom, &mut colors, &mut visiting);
    }
    for (branch, color) in branches.iter_mut().zip(colors) {
        branch.color = color.unwrap_or(Color::Reset);
    }
}

fn branch_color(
    branches: &[ViewBranch],
    b: usize,
    custom: &HashMap<String, Color>,
    colors: &mut [Option<Color>],
    visiting: &mut [bool],
) -> Color {
    if let Some(color) = colors[b] {
        return color;
    }
    let branch = &branches[b];
    let own = branch_name_color(&branch.display_name, 0, custom);

    let color = match branch.parent {
        Some(parent) if !visiting[parent] => {
            visiting[b] = true;
            let parent_color = branch_color(branches, parent, custom, colors, visiting);
            if branch.remote_name == branches[parent].name {
                parent_color
            } else if own == parent_color {
                branch_name_color(&branch.display_name, 1, custom)
            } else {
                own
            }
        }
        _ => own,
    };
    colors[b] = Some(color);
    color
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augmented::BranchKind;

    fn branch(name: &str, parent: Option<usize>) -> ViewBranch {
        ViewBranch {
            name: name.to_string(),
            display_name: name.to_string(),
            index: 0,
            kind: BranchKind::Git,
            tip_id: String::new(),
            bottom_id: String::new(),
            tip: None,
            bottom: None,
            parent,
            parent_name: String::new(),
            is_remote: false,
            remote_name: String::new(),
            local_name: String::new(),
            is_current: false,
            is_set_as_parent: false,
            has_local_only: false,
            has_remote_only: false,
            color: Color::Reset,
            ambiguous_branch_names: Vec::new(),
            ambiguous_tip_id: String::new(),
        }
    }

    #[test]
    fn test_name_color_is_stable() {
        let custom = HashMap::new();
        assert_eq!(branch_name_color("feature", 0, &custom), branch_name_color("feature", 0, &custom));
        assert_ne!(branch_name_color("feature", 0, &custom), branch_name_color("feature", 1, &custom));
        assert_eq!(branch_name_color("main", 0, &custom), MAIN_BRANCH_COLOR);
        assert_eq!(branch_name_color("ambiguous@abc123", 0, &custom), AMBIGUOUS_BRANCH_COLOR);
    }

    #[test]
    fn test_custom_color() {
        let custom = HashMap::from([("main".to_string(), Color::Blue)]);
        assert_eq!(branch_name_color("main", 0, &custom), Color::Blue);
    }

    #[test]
    fn test_child_avoids_parent_color() {
        let custom = HashMap::new();
        let mut branches = vec![branch("main", None)];
        // Find a name that collides with the main color
        let name = (0..100)
            .map(|i| format!("topic{i}"))
            .find(|n| branch_name_color(n, 0, &custom) == MAIN_BRANCH_COLOR)
            .unwrap();
        branches.push(branch(&name, Some(0)));

        assign_branch_colors(&mut branches, &custom);
        assert_eq!(branches[0].color, MAIN_BRANCH_COLOR);
        assert_ne!(branches[1].color, MAIN_BRANCH_COLOR);
    }

    #[test]
    fn test_local_shares_remote_color() {
        let custom = HashMap::new();
        let mut remote = branch("origin/topic", None);
        remote.display_name = "topic".to_string();
        let mut local = branch("topic-local", Some(0));
        local.remote_name = "origin/topic".to_string();
        let mut branches = vec![remote, local];

        assign_branch_colors(&mut branches, &custom);
        assert_eq!(branches[0].color, branches[1].color);
    }

    #[test]
    fn test_parent_cycle_terminates() {
        let custom = HashMap::new();
        let mut branches = vec![branch("a", Some(1)), branch("b", Some(0))];
        assign_branch_colors(&mut branches, &custom);
        assert_ne!(branches[0].color, Color::Reset);
        assert_ne!(branches[1].color, Color::Reset);
    }
}
