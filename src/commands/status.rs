use crate::{commands::MirrorArgs, errors::Result, git::BranchRef};
use clap::Args;
use git2::Oid;
use std::path::Path;

/// Show how far the fork is from upstream
///
/// Fetches both remotes but never adds or changes a remote, checks out or pushes
#[derive(Debug, Clone, Default, Args)]
pub struct Status {
    #[command(flatten)]
    pub mirror: MirrorArgs,
}

fn short(id: Option<Oid>) -> String {
    match id {
        Some(id) => id.to_string()[..8].to_string(),
        None => "-".to_string(),
    }
}

pub fn describe(branch: &BranchRef, mirrored: bool) -> String {
    let state = if mirrored { "mirrored" } else { "behind" };
    format!(
        "{:<24} upstream {} local {:<8} fork {:<8} {}",
        branch.name,
        short(Some(branch.upstream)),
        short(branch.local),
        short(branch.fork),
        state
    )
}

impl Status {
    pub fn execute(&self, repo: &Path) -> Result<()> {
        let mut synchronizer = self.mirror.synchronizer(repo, None)?;
        // nothing gets checked out
        synchronizer.force = true;
        synchronizer.read_only = true;

        let session = synchronizer.setup()?;
        for name in &session.branches {
            match synchronizer.branch_ref(name)? {
                Some(branch) => {
                    let mirrored = synchronizer.is_mirrored(&branch)?;
                    println!("{}", describe(&branch, mirrored));
                }
                None => log::warn!("{} vanished from upstream", name),
            }
        }
        Ok(())
    }
}
