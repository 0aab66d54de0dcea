use crate::git::CommitInfo;
use git2::Oid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPlan {
    /// Nothing to keep, the branch is upstream's head as is
    UseUpstream,
    /// The branch already holds upstream plus the same protected content
    KeepLocal,
    /// Protected paths differ from upstream, record them on top of it
    CommitDelta,
}

/// Decide what the branch head should be once protected paths are restored
///
/// `tree` is the tree staged after the overwrite and the restore.
/// Keeping the prior commit when it is equivalent is what makes two runs in a
/// row produce a single commit.
pub fn plan_commit(prior: Option<&CommitInfo>, upstream: &CommitInfo, tree: Oid) -> CommitPlan {
    if tree == upstream.tree {
        return CommitPlan::UseUpstream;
    }

    match prior {
        Some(prior) if prior.tree == tree && prior.is_child_of(upstream.id) => CommitPlan::KeepLocal,
        _ => CommitPlan::CommitDelta,
    }
}
