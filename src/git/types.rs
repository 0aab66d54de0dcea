use git2::Oid;

/// Whether the local branch was there before we touched it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkout {
    Existing,
    New,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: Oid,
    pub tree: Oid,
    pub parents: Vec<Oid>,
}

impl CommitInfo {
    /// True when this commit sits directly on top of `base`
    pub fn is_child_of(&self, base: Oid) -> bool {
        self.parents.len() == 1 && self.parents[0] == base
    }
}

/// A branch as seen from the three places it can live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    pub name: String,
    pub upstream: Oid,
    pub local: Option<Oid>,
    pub fork: Option<Oid>,
}

pub fn local_ref(branch: &str) -> String {
    format!("refs/heads/{}", branch)
}

pub fn remote_ref(remote: &str, branch: &str) -> String {
    format!("refs/remotes/{}/{}", remote, branch)
}
