use crate::{
    config::MirrorConfig,
    errors::{MirrorError, Result},
    filter::BranchFilter,
    git::{local_ref, remote_ref, BranchRef, Checkout, CommitInfo, Vcs},
    mirror::{plan_commit, BranchOutcome, CommitPlan, Outcome, Report},
};
use git2::Oid;

/// What the setup phase found out
#[derive(Debug, Clone)]
pub struct Session {
    pub branches: Vec<String>,
    /// Branch checked out before the run, restored at the end
    pub start_branch: Option<String>,
    /// Commit new branches are created from
    pub start_head: Option<Oid>,
    /// False when the fork could not be fetched, its remote-tracking refs may be stale
    pub fork_fetched: bool,
}

pub struct Synchronizer<T: Vcs> {
    pub vcs: T,
    pub config: MirrorConfig,
    pub filter: BranchFilter,
    pub dry_run: bool,
    pub force: bool,
    /// Never add or change remotes
    pub read_only: bool,
}

impl<T: Vcs> Synchronizer<T> {
    pub fn new(vcs: T, config: MirrorConfig, filter: BranchFilter) -> Self {
        Self {
            vcs,
            config,
            filter,
            dry_run: false,
            force: false,
            read_only: false,
        }
    }

    /// Prepare the remotes and list the branches to mirror
    ///
    /// Every error here is fatal
    pub fn setup(&self) -> Result<Session> {
        if !self.force && !self.vcs.is_clean()? {
            return Err(MirrorError::Setup(
                "working tree has local changes, commit them or use --force".to_string(),
            ));
        }

        self.ensure_upstream_remote()?;

        let upstream = &self.config.upstream_remote;
        self.vcs.fetch(upstream).map_err(|e| {
            MirrorError::Setup(format!("cannot fetch upstream remote '{}': {}", upstream, e))
        })?;

        // Only used to skip pushes that would change nothing
        let fork_fetched = match self.vcs.fetch(&self.config.fork_remote) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "Cannot fetch fork remote '{}', every branch will be pushed: {}",
                    self.config.fork_remote,
                    e
                );
                false
            }
        };

        let branches = self.vcs.remote_branches(upstream)?;
        if branches.is_empty() {
            log::warn!("Upstream remote '{}' has no branches", upstream);
        }
        let branches = self.filter.select(branches);

        Ok(Session {
            branches,
            start_branch: self.vcs.current_branch()?,
            start_head: self.vcs.head()?,
            fork_fetched,
        })
    }

    fn ensure_upstream_remote(&self) -> Result<()> {
        let name = &self.config.upstream_remote;
        let existing = self.vcs.remote_url(name)?;

        match (existing, &self.config.upstream_url) {
            (None, _) if self.read_only => Err(MirrorError::Setup(format!(
                "remote '{}' does not exist, run a sync first",
                name
            ))),
            (Some(current), Some(url)) if self.read_only && &current != url => {
                log::warn!(
                    "Remote {} points to {}, not {}; reading it as is",
                    name,
                    current,
                    url
                );
                Ok(())
            }
            (None, None) => Err(MirrorError::Setup(format!(
                "remote '{}' does not exist and no upstream url is configured (mirror.upstream)",
                name
            ))),
            (None, Some(url)) => {
                log::info!("Adding remote {} -> {}", name, url);
                self.vcs
                    .add_remote(name, url)
                    .map_err(|e| MirrorError::Setup(format!("cannot add remote '{}': {}", name, e)))
            }
            (Some(current), Some(url)) if &current != url => {
                log::info!("Updating remote {}: {} -> {}", name, current, url);
                self.vcs.set_remote_url(name, url).map_err(|e| {
                    MirrorError::Setup(format!("cannot update remote '{}': {}", name, e))
                })
            }
            _ => Ok(()),
        }
    }

    /// Mirror every selected branch, one after the other
    ///
    /// A failing branch is logged and recorded, the loop carries on
    pub fn run(&self, session: &Session) -> Report {
        let mut report = Report {
            upstream: self.config.upstream_remote.clone(),
            fork: self.config.fork_remote.clone(),
            dry_run: self.dry_run,
            branches: Vec::with_capacity(session.branches.len()),
        };

        for branch in &session.branches {
            log::info!("🔄 Mirroring {}", branch);
            let outcome = match self.sync_branch(branch, session) {
                Ok(outcome) => {
                    match &outcome {
                        Outcome::UpToDate { .. } => {
                            log::info!("✅ {}:{} is up to date", self.config.fork_remote, branch)
                        }
                        Outcome::Updated { pushed: true, .. } => {
                            log::info!("✅ {}:{} pushed", self.config.fork_remote, branch)
                        }
                        Outcome::Updated { pushed: false, .. } => log::info!(
                            "⏭️  {}:{} would be pushed (dry run)",
                            self.config.fork_remote,
                            branch
                        ),
                        Outcome::Failed { .. } => {}
                    }
                    BranchOutcome {
                        branch: branch.clone(),
                        outcome,
                    }
                }
                Err(e) => {
                    let e = e.for_branch(branch);
                    log::error!("❌ {}", e);
                    BranchOutcome::failed(branch, &e)
                }
            };
            report.branches.push(outcome);
        }

        self.teardown(session);
        report
    }

    fn teardown(&self, session: &Session) {
        let Some(branch) = &session.start_branch else {
            return;
        };
        if self.vcs.current_branch().ok().flatten().as_deref() == Some(branch.as_str()) {
            return;
        }
        if let Err(e) = self.vcs.switch_to(branch) {
            log::warn!("Cannot go back to branch {}: {}", branch, e);
        }
    }

    /// Read where a branch stands upstream, locally and on the fork
    pub fn branch_ref(&self, branch: &str) -> Result<Option<BranchRef>> {
        let upstream = self
            .vcs
            .resolve(&remote_ref(&self.config.upstream_remote, branch))?;
        let Some(upstream) = upstream else {
            return Ok(None);
        };
        Ok(Some(BranchRef {
            name: branch.to_string(),
            upstream: upstream.id,
            local: self.vcs.resolve(&local_ref(branch))?.map(|c| c.id),
            fork: self
                .vcs
                .resolve(&remote_ref(&self.config.fork_remote, branch))?
                .map(|c| c.id),
        }))
    }

    /// Whether the fork holds upstream's head, with or without a protected-path commit on top
    pub fn is_mirrored(&self, branch: &BranchRef) -> Result<bool> {
        let Some(fork) = branch.fork else {
            return Ok(false);
        };
        if fork == branch.upstream {
            return Ok(true);
        }
        let fork = self
            .vcs
            .resolve(&remote_ref(&self.config.fork_remote, &branch.name))?;
        Ok(fork.map(|c| c.is_child_of(branch.upstream)).unwrap_or(false))
    }

    pub fn sync_branch(&self, branch: &str, session: &Session) -> Result<Outcome> {
        let start_head = session.start_head;
        let upstream_remote = &self.config.upstream_remote;

        // 1. resolve the local branch
        let prior = self.vcs.resolve(&local_ref(branch))?;
        let kind = match prior {
            Some(_) => Checkout::Existing,
            None => Checkout::New,
        };
        log::debug!("{} is {:?} locally", branch, kind);

        // 2. fetch upstream
        self.vcs.fetch_branch(upstream_remote, branch)?;
        let upstream = self
            .vcs
            .resolve(&remote_ref(upstream_remote, branch))?
            .ok_or_else(|| MirrorError::BranchSync {
                branch: branch.to_string(),
                reason: format!("{}/{} disappeared after fetch", upstream_remote, branch),
            })?;

        // A new branch takes the protected content of the branch the run started on
        let restore_from = match kind {
            Checkout::Existing => prior.as_ref().map(|c| c.id),
            Checkout::New => start_head,
        };

        let rebuilt = self
            .vcs
            .checkout(branch, kind, start_head)
            .and_then(|()| self.rebuild(branch, prior.as_ref(), &upstream, restore_from));
        let head = match rebuilt {
            Ok(head) => head,
            Err(e) => {
                self.roll_back(branch, prior.as_ref());
                return Err(e);
            }
        };

        // 6. publish
        self.publish(branch, head, session.fork_fetched)
    }

    fn rebuild(
        &self,
        branch: &str,
        prior: Option<&CommitInfo>,
        upstream: &CommitInfo,
        restore_from: Option<Oid>,
    ) -> Result<Oid> {
        // 3. overwrite with upstream
        self.vcs.reset_hard(upstream.id)?;

        // 4. put the protected paths back
        if let Some(from) = restore_from {
            self.restore_protected(from)?;
        }

        // 5. record the delta if there is one
        let tree = self.vcs.write_tree()?;
        self.apply_plan(branch, prior, upstream, tree)
    }

    /// Leave the branch where it was before the run
    ///
    /// A half-synced branch would otherwise become next run's prior state,
    /// and the fork's protected content would be lost with it
    fn roll_back(&self, branch: &str, prior: Option<&CommitInfo>) {
        let prior = prior.map(|c| c.id);
        if let Err(e) = self.vcs.update_branch(branch, prior) {
            log::warn!("Cannot restore branch {} to its previous state: {}", branch, e);
            return;
        }

        let on_branch = self.vcs.current_branch().ok().flatten().as_deref() == Some(branch);
        if let (true, Some(prior)) = (on_branch, prior) {
            if let Err(e) = self.vcs.reset_hard(prior) {
                log::warn!("Cannot clean the working tree of {}: {}", branch, e);
            }
        }
    }

    fn restore_protected(&self, from: Oid) -> Result<()> {
        for path in self.config.protected.iter() {
            self.vcs.remove_path(path)?;
            if self.vcs.path_exists(from, path)? {
                log::debug!("Restoring {} from {}", path, from);
                self.vcs.restore_path(from, path)?;
            }
        }
        Ok(())
    }

    fn apply_plan(
        &self,
        branch: &str,
        prior: Option<&CommitInfo>,
        upstream: &CommitInfo,
        tree: Oid,
    ) -> Result<Oid> {
        match plan_commit(prior, upstream, tree) {
            CommitPlan::UseUpstream => {
                log::debug!("{} has no protected changes", branch);
                self.vcs.reset_hard(upstream.id)?;
                Ok(upstream.id)
            }
            CommitPlan::KeepLocal => {
                // `prior` is always there for this plan
                let prior = prior.map(|c| c.id).unwrap_or(upstream.id);
                log::debug!("{} already carries the protected changes", branch);
                self.vcs.reset_hard(prior)?;
                Ok(prior)
            }
            CommitPlan::CommitDelta => {
                let id = self.vcs.commit(&self.config.message)?;
                log::info!("📝 Committed protected paths on {} ({})", branch, id);
                Ok(id)
            }
        }
    }

    fn publish(&self, branch: &str, head: Oid, fork_fetched: bool) -> Result<Outcome> {
        let fork = &self.config.fork_remote;
        let published = self.vcs.resolve(&remote_ref(fork, branch))?.map(|c| c.id);

        if fork_fetched && published == Some(head) {
            return Ok(Outcome::UpToDate {
                head: head.to_string(),
            });
        }

        if self.dry_run {
            return Ok(Outcome::Updated {
                head: head.to_string(),
                pushed: false,
            });
        }

        log::info!("pushing {}:{}", fork, branch);
        self.vcs
            .push_force(fork, branch)
            .map_err(|e| MirrorError::Publish {
                branch: branch.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Outcome::Updated {
            head: head.to_string(),
            pushed: true,
        })
    }
}
