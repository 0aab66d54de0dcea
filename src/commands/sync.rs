use crate::{commands::MirrorArgs, errors::Result};
use clap::Args;
use std::path::{Path, PathBuf};

/// Force every upstream branch onto the fork, keeping protected paths
#[derive(Debug, Clone, Default, Args)]
pub struct SyncBranches {
    #[command(flatten)]
    pub mirror: MirrorArgs,

    /// Message of the commit that restores protected paths [git config: mirror.message]
    #[arg(long, short)]
    pub message: Option<String>,

    /// Do everything locally but push nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Run even when the working tree has local changes, they will be lost
    #[arg(long)]
    pub force: bool,

    /// Write the outcome of every branch to this file as JSON
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl SyncBranches {
    pub fn execute(&self, repo: &Path) -> Result<()> {
        let mut synchronizer = self.mirror.synchronizer(repo, self.message.clone())?;
        synchronizer.dry_run = self.dry_run;
        synchronizer.force = self.force;

        let session = synchronizer.setup()?;
        log::info!(
            "Mirroring {} branch(es) from {} to {}",
            session.branches.len(),
            synchronizer.config.upstream_remote,
            synchronizer.config.fork_remote
        );

        let report = synchronizer.run(&session);

        let failures = report.failures();
        if failures > 0 {
            log::warn!(
                "{} of {} branch(es) could not be mirrored",
                failures,
                report.branches.len()
            );
        }

        if let Some(path) = &self.report {
            match report.write_json(path) {
                Ok(()) => log::info!("Report written to {}", path.display()),
                Err(e) => log::error!("Cannot write report to {}: {}", path.display(), e),
            }
        }

        Ok(())
    }
}
