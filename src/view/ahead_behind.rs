//! Commits not yet pushed (local only) or not yet pulled (remote only)

use super::ViewRepo;

/// Walk no further than this from a branch tip
const MAX_AHEAD_BEHIND: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    LocalOnly,
    RemoteOnly,
}

pub fn set_ahead_behind(repo: &mut ViewRepo) {
    for b in 0..repo.branches.len() {
        let branch = &repo.branches[b];
        if branch.is_remote && !branch.local_name.is_empty() {
            let counterpart = branch.local_name.clone();
            mark_branch(repo, b, &counterpart, Side::RemoteOnly);
        } else if !branch.is_remote && !branch.remote_name.is_empty() {
            let counterpart = branch.remote_name.clone();
            mark_branch(repo, b, &counterpart, Side::LocalOnly);
        }
    }
}

/// Mark commits on `b` that its counterpart does not have
fn mark_branch(repo: &mut ViewRepo, b: usize, counterpart_name: &str, side: Side) {
    let counterpart = repo.branches.iter().position(|o| o.name == counterpart_name);

    // The status commit is not shared, stop at the real commit below it
    let counterpart_tip = counterpart
        .and_then(|o| repo.branches[o].tip)
        .and_then(|row| if repo.commits[row].is_uncommitted() { repo.commits[row].first_parent } else { Some(row) });
    let counterpart_base = counterpart
        .and_then(|o| repo.branches[o].bottom)
        .and_then(|row| repo.commits[row].first_parent);

    let mut marked = false;
    let mut count = 0;
    let mut current = repo.branches[b].tip;
    while let Some(row) = current {
        if repo.commits[row].branch != b || count >= MAX_AHEAD_BEHIND {
            break;
        }
        let commit = &repo.commits[row];
        let next = commit.first_parent;
        if commit.is_uncommitted() {
            current = next;
            continue;
        }
        count += 1;
        if Some(row) == counterpart_tip || Some(row) == counterpart_base {
            break;
        }
        if commit
            .merge_parent
            .is_some_and(|mp| repo.branches[repo.commits[mp].branch].name == counterpart_name)
        {
            // Counterpart was merged in here, older commits are shared
            break;
        }

        let commit = &mut repo.commits[row];
        match side {
            Side::LocalOnly => commit.is_local_only = true,
            Side::RemoteOnly => commit.is_remote_only = true,
        }
        marked = true;
        current = next;
    }

    if !marked {
        return;
    }
    for branch in std::iter::once(b).chain(counterpart) {
        let branch = &mut repo.branches[branch];
        match side {
            Side::LocalOnly => branch.has_local_only = true,
            Side::RemoteOnly => branch.has_remote_only = true,
        }
    }
}
