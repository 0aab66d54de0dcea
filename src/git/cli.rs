use crate::errors::{MirrorError, Result};
use crate::git::types::{local_ref, remote_ref, Checkout, CommitInfo};
use git2::{ErrorCode, Oid, Repository, StatusOptions};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git primitives used by the mirror
///
/// Object ids are resolved fresh on every call, nothing is cached between calls
pub trait Vcs {
    fn is_clean(&self) -> Result<bool>;
    fn current_branch(&self) -> Result<Option<String>>;
    fn head(&self) -> Result<Option<Oid>>;
    fn remote_url(&self, remote: &str) -> Result<Option<String>>;
    fn add_remote(&self, remote: &str, url: &str) -> Result<()>;
    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()>;
    fn fetch(&self, remote: &str) -> Result<()>;
    fn fetch_branch(&self, remote: &str, branch: &str) -> Result<()>;
    fn remote_branches(&self, remote: &str) -> Result<Vec<String>>;
    fn resolve(&self, refname: &str) -> Result<Option<CommitInfo>>;
    fn path_exists(&self, commit: Oid, path: &str) -> Result<bool>;
    fn checkout(&self, branch: &str, kind: Checkout, start: Option<Oid>) -> Result<()>;
    fn switch_to(&self, branch: &str) -> Result<()>;
    fn reset_hard(&self, commit: Oid) -> Result<()>;
    /// Point a local branch at `target`, or delete it when `target` is None
    fn update_branch(&self, branch: &str, target: Option<Oid>) -> Result<()>;
    fn remove_path(&self, path: &str) -> Result<()>;
    fn restore_path(&self, from: Oid, path: &str) -> Result<()>;
    fn write_tree(&self) -> Result<Oid>;
    fn commit(&self, message: &str) -> Result<Oid>;
    fn push_force(&self, remote: &str, branch: &str) -> Result<()>;
}

/// Reads through libgit2, writes through the `git` executable
pub struct GitCli {
    path: PathBuf,
}

impl GitCli {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path.as_ref()).map_err(|e| {
            MirrorError::Setup(format!(
                "{} is not a git repository: {}",
                path.as_ref().display(),
                e.message()
            ))
        })?;
        let path = repo
            .workdir()
            .ok_or_else(|| MirrorError::Setup("bare repositories cannot be mirrored into".into()))?
            .to_path_buf();
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn repo(&self) -> Result<Repository> {
        Ok(Repository::open(&self.path)?)
    }

    fn run_command(&self, args: &[&str]) -> Result<std::process::Output> {
        log::debug!("git {}", args.join(" "));

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| MirrorError::Git(format!("Failed to execute git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MirrorError::Git(format!(
                "git {} failed: {}",
                args.iter().find(|arg| !arg.starts_with("--")).unwrap_or(&""),
                stderr.trim()
            )));
        }

        Ok(output)
    }

    fn run_for_oid(&self, args: &[&str]) -> Result<Oid> {
        let output = self.run_command(args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Oid::from_str(stdout.trim())?)
    }
}

fn not_found<T>(result: std::result::Result<T, git2::Error>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Vcs for GitCli {
    fn is_clean(&self) -> Result<bool> {
        let repo = self.repo()?;
        let statuses = repo.statuses(Some(
            StatusOptions::new()
                .include_untracked(false)
                .include_ignored(false),
        ))?;
        Ok(statuses.is_empty())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let repo = self.repo()?;
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(String::from))
    }

    fn head(&self) -> Result<Option<Oid>> {
        let repo = self.repo()?;
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };
        let id = head.peel_to_commit()?.id();
        Ok(Some(id))
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        let repo = self.repo()?;
        let remote = not_found(repo.find_remote(remote))?;
        Ok(remote.and_then(|r| r.url().map(String::from)))
    }

    fn add_remote(&self, remote: &str, url: &str) -> Result<()> {
        self.run_command(&["remote", "add", remote, url])?;
        Ok(())
    }

    fn set_remote_url(&self, remote: &str, url: &str) -> Result<()> {
        self.run_command(&["remote", "set-url", remote, url])?;
        Ok(())
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        self.run_command(&["fetch", "--prune", "--quiet", remote])?;
        Ok(())
    }

    fn fetch_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("+refs/heads/{}:{}", branch, remote_ref(remote, branch));
        self.run_command(&["fetch", "--quiet", remote, &refspec])?;
        Ok(())
    }

    fn remote_branches(&self, remote: &str) -> Result<Vec<String>> {
        let repo = self.repo()?;
        let prefix = format!("refs/remotes/{}/", remote);
        let mut branches = Vec::new();
        for reference in repo.references()? {
            let reference = reference?;
            if reference.symbolic_target().is_some() {
                continue;
            }
            let Some(name) = reference.name() else {
                continue;
            };
            if let Some(branch) = name.strip_prefix(&prefix) {
                branches.push(branch.to_string());
            }
        }
        branches.sort();
        Ok(branches)
    }

    fn resolve(&self, refname: &str) -> Result<Option<CommitInfo>> {
        let repo = self.repo()?;
        let Some(reference) = not_found(repo.find_reference(refname))? else {
            return Ok(None);
        };
        let commit = reference.peel_to_commit()?;
        Ok(Some(CommitInfo {
            id: commit.id(),
            tree: commit.tree_id(),
            parents: commit.parent_ids().collect(),
        }))
    }

    fn path_exists(&self, commit: Oid, path: &str) -> Result<bool> {
        let repo = self.repo()?;
        let tree = repo.find_commit(commit)?.tree()?;
        Ok(not_found(tree.get_path(Path::new(path)))?.is_some())
    }

    fn checkout(&self, branch: &str, kind: Checkout, start: Option<Oid>) -> Result<()> {
        match (kind, start) {
            (Checkout::Existing, _) => self.switch_to(branch),
            (Checkout::New, Some(start)) => {
                let start = start.to_string();
                self.run_command(&["checkout", "--quiet", "--force", "--no-track", "-b", branch, &start])?;
                Ok(())
            }
            (Checkout::New, None) => {
                self.run_command(&["checkout", "--quiet", "--force", "--orphan", branch])?;
                Ok(())
            }
        }
    }

    fn switch_to(&self, branch: &str) -> Result<()> {
        self.run_command(&["checkout", "--quiet", "--force", branch, "--"])?;
        Ok(())
    }

    fn reset_hard(&self, commit: Oid) -> Result<()> {
        let commit = commit.to_string();
        self.run_command(&["reset", "--quiet", "--hard", &commit])?;
        Ok(())
    }

    fn update_branch(&self, branch: &str, target: Option<Oid>) -> Result<()> {
        let refname = local_ref(branch);
        match target {
            Some(target) => {
                let target = target.to_string();
                self.run_command(&["update-ref", &refname, &target])?
            }
            None => self.run_command(&["update-ref", "-d", &refname])?,
        };
        Ok(())
    }

    // Protected paths are plain paths, never globs or pathspec magic
    fn remove_path(&self, path: &str) -> Result<()> {
        self.run_command(&[
            "--literal-pathspecs",
            "rm",
            "-r",
            "-q",
            "--ignore-unmatch",
            "--",
            path,
        ])?;
        Ok(())
    }

    fn restore_path(&self, from: Oid, path: &str) -> Result<()> {
        let from = from.to_string();
        self.run_command(&["--literal-pathspecs", "checkout", &from, "--", path])?;
        Ok(())
    }

    fn write_tree(&self) -> Result<Oid> {
        self.run_for_oid(&["write-tree"])
    }

    fn commit(&self, message: &str) -> Result<Oid> {
        self.run_command(&["commit", "--quiet", "--no-verify", "-m", message])?;
        self.run_for_oid(&["rev-parse", "HEAD"])
    }

    fn push_force(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        self.run_command(&["push", "--quiet", "--force", remote, &refspec])?;
        Ok(())
    }
}
