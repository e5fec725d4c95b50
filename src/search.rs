//! Commit search and fuzzy branch name lookup

use std::time::Instant;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::debug;

use crate::augmented::AugRepo;
use crate::view::projector::{add_branches, add_tags, new_view_repo, to_view_commit};
use crate::view::ViewRepo;

/// View with all branches and the commits matching `text`. Matching is case
/// insensitive on id, message and author, or on a tag name. No graph.
pub fn search_view(aug: &AugRepo, text: &str) -> ViewRepo {
    let started = Instant::now();
    let text = text.to_lowercase();

    let mut repo = new_view_repo(aug);
    let all: Vec<usize> = (0..aug.branches.len()).collect();
    add_branches(&mut repo, aug, &all);
    if let Some(current) = aug.current_branch() {
        repo.current_branch_name = aug.branches[current].name.clone();
    }

    for c in &aug.commits {
        let tagged = aug
            .tags
            .iter()
            .any(|t| t.commit_id == c.id && t.tag_name.to_lowercase().contains(&text));
        if tagged || c.contains_text(&text) {
            let row = repo.commits.len();
            repo.push_commit(to_view_commit(c, row, c.branch));
        }
    }
    add_tags(&mut repo, aug);

    debug!("Searched {:?}, {} hits in {:?}", text, repo.commits.len(), started.elapsed());
    repo
}

/// Result of a fuzzy search match
#[derive(Debug, Clone)]
pub struct FuzzySearchResult {
    /// Index into the searched names
    pub index: usize,
    /// Fuzzy match score (higher is better)
    pub score: i64,
    /// Character indices that matched (for highlighting)
    pub matched_indices: Vec<usize>,
}

/// Performs fuzzy search on branch names
///
/// Returns results sorted by score (descending), then by position for ties.
pub fn fuzzy_search_branches(query: &str, names: &[String]) -> Vec<FuzzySearchResult> {
    if query.is_empty() {
        return (0..names.len())
            .map(|index| FuzzySearchResult {
                index,
                score: 0,
                matched_indices: Vec::new(),
            })
            .collect();
    }

    let matcher = SkimMatcherV2::default();
    let mut results: Vec<FuzzySearchResult> = names
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            matcher
                .fuzzy_indices(name, query)
                .map(|(score, matched_indices)| FuzzySearchResult {
                    index,
                    score,
                    matched_indices,
                })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.index.cmp(&b.index)));
    results
}
