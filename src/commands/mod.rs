pub mod status;
pub mod sync;

use crate::{
    config::{MirrorConfig, Overrides},
    errors::Result,
    filter::BranchFilter,
    git::GitCli,
    mirror::Synchronizer,
};
use clap::Args;
use std::path::Path;

/// Where to mirror from and which branches to look at
#[derive(Debug, Clone, Default, Args)]
pub struct MirrorArgs {
    /// Url of the upstream repository, the remote is added when missing [git config: mirror.upstream]
    #[arg(long, value_name = "URL")]
    pub upstream: Option<String>,

    /// Name of the upstream remote [default: upstream]
    #[arg(long, value_name = "NAME")]
    pub upstream_remote: Option<String>,

    /// Name of the fork remote branches are pushed to [default: origin]
    #[arg(long, value_name = "NAME")]
    pub fork_remote: Option<String>,

    /// Path kept from the fork, can be repeated [default: .github/workflows]
    #[arg(long = "protect", value_name = "PATH")]
    pub protect: Vec<String>,

    /// Only mirror this branch, can be repeated
    #[arg(long = "branch", value_name = "NAME")]
    pub branches: Vec<String>,

    /// Only mirror branches matching this regex, can be repeated
    #[arg(long, value_name = "REGEX")]
    pub include: Vec<String>,

    /// Skip branches matching this regex, can be repeated
    #[arg(long, value_name = "REGEX")]
    pub exclude: Vec<String>,
}

impl MirrorArgs {
    pub fn synchronizer(&self, repo: &Path, message: Option<String>) -> Result<Synchronizer<GitCli>> {
        let vcs = GitCli::open(repo)?;

        let overrides = Overrides {
            upstream_url: self.upstream.clone(),
            upstream_remote: self.upstream_remote.clone(),
            fork_remote: self.fork_remote.clone(),
            protected: self.protect.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            message,
        };
        let config = MirrorConfig::load(vcs.path(), overrides)?;
        let filter = BranchFilter::new(&self.branches, &config.include, &config.exclude)?;

        log::debug!("Mirror configuration: {:?}", config);
        Ok(Synchronizer::new(vcs, config, filter))
    }
}
