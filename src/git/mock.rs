use crate::errors::{MirrorError, Result};
use crate::git::cli::Vcs;
use crate::git::types::{local_ref, remote_ref, Checkout, CommitInfo};
use git2::{ObjectType, Oid};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

type Files = BTreeMap<String, String>;

struct MockCommit {
    tree: Oid,
    parents: Vec<Oid>,
    files: Files,
}

#[derive(Default)]
struct MockState {
    commits: HashMap<Oid, MockCommit>,
    refs: BTreeMap<String, Oid>,
    // what each remote server holds: remote -> branch -> commit
    servers: HashMap<String, BTreeMap<String, Oid>>,
    remotes: HashMap<String, String>,
    head: Option<String>,
    index: Files,
    next_id: u64,
    made_commits: usize,
    pushes: Vec<String>,
}

/// In-memory repository with failure injection
pub struct MockVcs {
    state: Mutex<MockState>,
    pub dirty: bool,
    pub failing_fetches: HashSet<String>,
    pub failing_pushes: HashSet<String>,
    pub failing_commits: HashSet<String>,
    /// Remotes whose full fetch fails
    pub unreachable: HashSet<String>,
}

fn tree_of(files: &Files) -> Oid {
    let serialized: String = files
        .iter()
        .map(|(path, content)| format!("{}\0{}\n", path, content))
        .collect();
    Oid::hash_object(ObjectType::Tree, serialized.as_bytes()).unwrap()
}

fn under(file: &str, path: &str) -> bool {
    file == path || file.starts_with(&format!("{}/", path))
}

impl MockVcs {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            dirty: false,
            failing_fetches: HashSet::new(),
            failing_pushes: HashSet::new(),
            failing_commits: HashSet::new(),
            unreachable: HashSet::new(),
        }
    }

    pub fn fail_fetch(mut self, branch: &str) -> Self {
        self.failing_fetches.insert(branch.to_string());
        self
    }

    pub fn fail_push(mut self, branch: &str) -> Self {
        self.failing_pushes.insert(branch.to_string());
        self
    }

    pub fn fail_commit(mut self, branch: &str) -> Self {
        self.failing_commits.insert(branch.to_string());
        self
    }

    pub fn unreachable(mut self, remote: &str) -> Self {
        self.unreachable.insert(remote.to_string());
        self
    }

    pub fn add_commit(&self, parents: &[Oid], files: &[(&str, &str)]) -> Oid {
        let files: Files = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect();
        let mut state = self.state.lock().unwrap();
        Self::store_commit(&mut state, parents.to_vec(), files)
    }

    fn store_commit(state: &mut MockState, parents: Vec<Oid>, files: Files) -> Oid {
        state.next_id += 1;
        let id = Oid::from_str(&format!("{:040x}", state.next_id)).unwrap();
        state.commits.insert(
            id,
            MockCommit {
                tree: tree_of(&files),
                parents,
                files,
            },
        );
        id
    }

    /// Put a branch on a remote server, as if someone pushed it there
    pub fn set_server_branch(&self, remote: &str, branch: &str, commit: Oid) {
        let mut state = self.state.lock().unwrap();
        state
            .servers
            .entry(remote.to_string())
            .or_default()
            .insert(branch.to_string(), commit);
    }

    pub fn add_known_remote(&self, remote: &str, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.remotes.insert(remote.to_string(), url.to_string());
        state.servers.entry(remote.to_string()).or_default();
    }

    pub fn set_local_branch(&self, branch: &str, commit: Oid) {
        let mut state = self.state.lock().unwrap();
        state.refs.insert(local_ref(branch), commit);
    }

    pub fn check_out(&self, branch: &str) {
        let mut state = self.state.lock().unwrap();
        let commit = state.refs[&local_ref(branch)];
        state.index = state.commits[&commit].files.clone();
        state.head = Some(branch.to_string());
    }

    pub fn files_at(&self, refname: &str) -> Files {
        let state = self.state.lock().unwrap();
        let commit = state.refs[refname];
        state.commits[&commit].files.clone()
    }

    pub fn server_head(&self, remote: &str, branch: &str) -> Option<Oid> {
        let state = self.state.lock().unwrap();
        state.servers.get(remote).and_then(|s| s.get(branch)).copied()
    }

    pub fn made_commits(&self) -> usize {
        self.state.lock().unwrap().made_commits
    }

    pub fn pushes(&self) -> Vec<String> {
        self.state.lock().unwrap().pushes.clone()
    }

    pub fn remote(&self, remote: &str) -> Option<String> {
        self.state.lock().unwrap().remotes.get(remote).cloned()
    }
}

impl Vcs for MockVcs {
    fn is_clean(&self) -> Result<bool> {
        Ok(!self.dirty)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().head.clone())
    }

    fn head(&self) -> Result<Option<Oid>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .head
            .as_ref()
            .and_then(|branch| state.refs.get(&local_ref(branch)).copied()))
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        Ok(self.remote(remote))
    }

    fn add_remote(&self, remote: &str, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.remotes.contains_key(remote) {
            return Err(MirrorError::Git(format!("remote {} already exists", remote)));
        }
        state.remotes.insert(remote.to_string(), url.to_string());
        Ok(())
    }

    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.remotes.insert(remote.to_string(), url.to_string());
        Ok(())
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        if self.unreachable.contains(remote) {
            return Err(MirrorError::Git(format!("cannot reach {}", remote)));
        }
        let mut state = self.state.lock().unwrap();
        if !state.remotes.contains_key(remote) {
            return Err(MirrorError::Git(format!("no such remote {}", remote)));
        }
        let prefix = format!("refs/remotes/{}/", remote);
        state.refs.retain(|name, _| !name.starts_with(&prefix));
        let heads: Vec<(String, Oid)> = state
            .servers
            .get(remote)
            .map(|s| s.iter().map(|(b, c)| (b.clone(), *c)).collect())
            .unwrap_or_default();
        for (branch, commit) in heads {
            state.refs.insert(remote_ref(remote, &branch), commit);
        }
        Ok(())
    }

    fn fetch_branch(&self, remote: &str, branch: &str) -> Result<()> {
        if self.failing_fetches.contains(branch) {
            return Err(MirrorError::Git(format!(
                "couldn't find remote ref {}",
                branch
            )));
        }
        let mut state = self.state.lock().unwrap();
        let commit = state
            .servers
            .get(remote)
            .and_then(|s| s.get(branch))
            .copied()
            .ok_or_else(|| MirrorError::Git(format!("couldn't find remote ref {}", branch)))?;
        state.refs.insert(remote_ref(remote, branch), commit);
        Ok(())
    }

    fn remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        let prefix = format!("refs/remotes/{}/", remote);
        Ok(state
            .refs
            .keys()
            .filter_map(|name| name.strip_prefix(&prefix).map(String::from))
            .collect())
    }

    fn resolve(&self, refname: &str) -> Result<Option<CommitInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state.refs.get(refname).map(|id| {
            let commit = &state.commits[id];
            CommitInfo {
                id: *id,
                tree: commit.tree,
                parents: commit.parents.clone(),
            }
        }))
    }

    fn path_exists(&self, commit: Oid, path: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state.commits[&commit].files.keys().any(|file| under(file, path)))
    }

    fn checkout(&self, branch: &str, kind: Checkout, start: Option<Oid>) -> Result<()> {
        match (kind, start) {
            (Checkout::Existing, _) => self.switch_to(branch),
            (Checkout::New, Some(start)) => {
                self.set_local_branch(branch, start);
                self.switch_to(branch)
            }
            (Checkout::New, None) => {
                let mut state = self.state.lock().unwrap();
                state.head = Some(branch.to_string());
                state.index.clear();
                Ok(())
            }
        }
    }

    fn switch_to(&self, branch: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let commit = *state
            .refs
            .get(&local_ref(branch))
            .ok_or_else(|| MirrorError::Git(format!("pathspec '{}' did not match", branch)))?;
        state.index = state.commits[&commit].files.clone();
        state.head = Some(branch.to_string());
        Ok(())
    }

    fn reset_hard(&self, commit: Oid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let branch = state.head.clone().expect("reset without a branch");
        state.index = state.commits[&commit].files.clone();
        state.refs.insert(local_ref(&branch), commit);
        Ok(())
    }

    fn update_branch(&self, branch: &str, target: Option<Oid>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match target {
            Some(target) => state.refs.insert(local_ref(branch), target),
            None => state.refs.remove(&local_ref(branch)),
        };
        Ok(())
    }

    fn remove_path(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.index.retain(|file, _| !under(file, path));
        Ok(())
    }

    fn restore_path(&self, from: Oid, path: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let restored: Vec<(String, String)> = state.commits[&from]
            .files
            .iter()
            .filter(|(file, _)| under(file, path))
            .map(|(file, content)| (file.clone(), content.clone()))
            .collect();
        state.index.extend(restored);
        Ok(())
    }

    fn write_tree(&self) -> Result<Oid> {
        Ok(tree_of(&self.state.lock().unwrap().index))
    }

    fn commit(&self, _message: &str) -> Result<Oid> {
        let mut state = self.state.lock().unwrap();
        let branch = state.head.clone().expect("commit without a branch");
        if self.failing_commits.contains(&branch) {
            return Err(MirrorError::Git(
                "Author identity unknown, please tell me who you are".to_string(),
            ));
        }
        let parent = state.refs[&local_ref(&branch)];
        let files = state.index.clone();
        let id = Self::store_commit(&mut state, vec![parent], files);
        state.refs.insert(local_ref(&branch), id);
        state.made_commits += 1;
        Ok(id)
    }

    fn push_force(&self, remote: &str, branch: &str) -> Result<()> {
        if self.failing_pushes.contains(branch) {
            return Err(MirrorError::Git("[remote rejected] protected branch".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        let commit = state.refs[&local_ref(branch)];
        state
            .servers
            .entry(remote.to_string())
            .or_default()
            .insert(branch.to_string(), commit);
        state.refs.insert(remote_ref(remote, branch), commit);
        state.pushes.push(branch.to_string());
        Ok(())
    }
}
