//! Branch names parsed from merge commit subjects

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::git::strip_remote_prefix;

/// Matches subjects like "Merge branch 'develop' into main" or
/// "Merge branch 'main' of github.com:org/repo"
static MERGE_SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[Mm]erged?",
        r"(\s+remote-tracking)?",
        r"(\s+(from branch|branch|commit|from))?",
        r"\s+'?(?P<from>[0-9A-Za-z_/-]+)'?",
        r"(?P<direction>\s+of\s+[^\s]+)?",
        r"(\s+(into|to)\s+(?P<into>[0-9A-Za-z_/-]+))?",
    ))
    .expect("merge subject regex is valid")
});

/// Source and target branch names of a merge commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromInto {
    pub from: String,
    pub into: String,
}

impl FromInto {
    /// A pull merges the remote branch into the local branch of the same name
    pub fn is_pull_merge(&self) -> bool {
        !self.from.is_empty() && self.from == self.into
    }
}

/// Parses merge subjects and remembers branch name hints per commit id.
///
/// Built fresh for every repository build.
#[derive(Debug, Default)]
pub struct SubjectParser {
    parsed: HashMap<String, FromInto>,
    hints: HashMap<String, String>,
}

impl SubjectParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a commit subject. Commits without exactly two parents yield empty names.
    ///
    /// `parent_ids` must be in git's native order, since the hint for a pull merge
    /// goes to the local parent, which is the first one before the swap.
    pub fn parse(&mut self, id: &str, subject: &str, parent_ids: &[String]) -> FromInto {
        if parent_ids.len() != 2 {
            return FromInto::default();
        }
        if let Some(fi) = self.parsed.get(id) {
            return fi.clone();
        }

        let fi = parse_merge_branch_names(subject);

        self.hints.insert(id.to_string(), fi.into.clone());
        let hinted_parent = if fi.is_pull_merge() {
            &parent_ids[0]
        } else {
            &parent_ids[1]
        };
        self.hints.insert(hinted_parent.clone(), fi.from.clone());

        self.parsed.insert(id.to_string(), fi.clone());
        fi
    }

    pub fn is_pull_merge(&mut self, id: &str, subject: &str, parent_ids: &[String]) -> bool {
        self.parse(id, subject, parent_ids).is_pull_merge()
    }

    /// Hinted branch name for a commit, empty if none
    pub fn branch_name(&self, id: &str) -> &str {
        self.hints.get(id).map(String::as_str).unwrap_or_default()
    }
}

/// Extract from/into names from a subject, without any caching
pub fn parse_merge_branch_names(subject: &str) -> FromInto {
    let Some(caps) = MERGE_SUBJECT.captures(subject.trim()) else {
        return FromInto::default();
    };

    let group = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or_default();
    let from = group("from");
    let into = group("into");
    let direction = group("direction");

    let is_pull = (!from.is_empty() && !direction.is_empty() && (into.is_empty() || into == from))
        || (!from.is_empty() && !into.is_empty() && strip_remote_prefix(from) == strip_remote_prefix(into));

    if is_pull {
        return FromInto {
            from: strip_remote_prefix(from).to_string(),
            into: strip_remote_prefix(from).to_string(),
        };
    }

    FromInto {
        from: strip_remote_prefix(from).to_string(),
        into: strip_remote_prefix(into).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parents() -> Vec<String> {
        vec!["p1".to_string(), "p2".to_string()]
    }

    #[test]
    fn test_merge_branch_into() {
        let fi = parse_merge_branch_names("Merge branch 'develop' into main");
        assert_eq!(fi.from, "develop");
        assert_eq!(fi.into, "main");
        assert!(!fi.is_pull_merge());
    }

    #[test]
    fn test_merge_without_into() {
        let fi = parse_merge_branch_names("Merge branch 'feature/login'");
        assert_eq!(fi.from, "feature/login");
        assert_eq!(fi.into, "");
    }

    #[test]
    fn test_remote_tracking_prefix_stripped() {
        let fi = parse_merge_branch_names("Merge remote-tracking branch 'origin/dev' into topic");
        assert_eq!(fi.from, "dev");
        assert_eq!(fi.into, "topic");
    }

    #[test]
    fn test_pull_merge_with_url() {
        let fi = parse_merge_branch_names("Merge branch 'main' of github.com:org/repo into main");
        assert_eq!(fi.from, "main");
        assert_eq!(fi.into, "main");
        assert!(fi.is_pull_merge());

        let fi = parse_merge_branch_names("Merge branch 'main' of https://github.com/org/repo");
        assert!(fi.is_pull_merge());
    }

    #[test]
    fn test_pull_merge_same_names() {
        let fi = parse_merge_branch_names("Merge remote-tracking branch 'origin/dev' into dev");
        assert!(fi.is_pull_merge());
        assert_eq!(fi.from, "dev");
    }

    #[test]
    fn test_merged_pull_request() {
        let fi = parse_merge_branch_names("Merged PR 42: fix");
        assert_eq!(fi.from, "PR");
        assert_eq!(fi.into, "");
    }

    #[test]
    fn test_not_a_merge_subject() {
        assert_eq!(parse_merge_branch_names("Fix typo"), FromInto::default());
    }

    #[test]
    fn test_hints_for_merge() {
        let mut parser = SubjectParser::new();
        let fi = parser.parse("c1", "Merge branch 'topic' into master", &parents());
        assert_eq!(fi.from, "topic");
        assert_eq!(parser.branch_name("c1"), "master");
        assert_eq!(parser.branch_name("p2"), "topic");
        assert_eq!(parser.branch_name("p1"), "");
    }

    #[test]
    fn test_hints_for_pull_merge() {
        let mut parser = SubjectParser::new();
        assert!(parser.is_pull_merge("c1", "Merge branch 'main' of github.com:a/b into main", &parents()));
        assert_eq!(parser.branch_name("c1"), "main");
        assert_eq!(parser.branch_name("p1"), "main");
        assert_eq!(parser.branch_name("p2"), "");
    }

    #[test]
    fn test_single_parent_is_ignored() {
        let mut parser = SubjectParser::new();
        let fi = parser.parse("c1", "Merge branch 'topic' into master", &["p1".to_string()]);
        assert_eq!(fi, FromInto::default());
        assert_eq!(parser.branch_name("c1"), "");
    }

    #[test]
    fn test_cached_by_id() {
        let mut parser = SubjectParser::new();
        parser.parse("c1", "Merge branch 'a' into b", &parents());
        // Later calls return the first result for the same id
        let fi = parser.parse("c1", "Merge branch 'x' into y", &parents());
        assert_eq!(fi.from, "a");
    }
}
