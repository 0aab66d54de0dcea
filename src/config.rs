use crate::errors::{MirrorError, Result};
use crate::protected::{ProtectedPaths, DEFAULT_PROTECTED};
use git2::{Config, ErrorCode, Repository};
use std::path::Path;

pub const DEFAULT_UPSTREAM_REMOTE: &str = "upstream";
pub const DEFAULT_FORK_REMOTE: &str = "origin";
pub const DEFAULT_MESSAGE: &str = "Keep fork overrides of protected paths";

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Url of the upstream remote, only needed when the remote does not exist yet
    pub upstream_url: Option<String>,
    pub upstream_remote: String,
    pub fork_remote: String,
    pub protected: ProtectedPaths,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub message: String,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            upstream_url: None,
            upstream_remote: DEFAULT_UPSTREAM_REMOTE.to_string(),
            fork_remote: DEFAULT_FORK_REMOTE.to_string(),
            protected: ProtectedPaths::parse([DEFAULT_PROTECTED])
                .unwrap_or_default(),
            include: Vec::new(),
            exclude: Vec::new(),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

/// Values given on the command line, they win over git config
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub upstream_url: Option<String>,
    pub upstream_remote: Option<String>,
    pub fork_remote: Option<String>,
    pub protected: Vec<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub message: Option<String>,
}

impl MirrorConfig {
    /// Read the `mirror.*` section of the repository's git config
    pub fn load(repo_path: &Path, overrides: Overrides) -> Result<Self> {
        let repo = Repository::discover(repo_path)
            .map_err(|e| MirrorError::Setup(format!("cannot open repository: {}", e.message())))?;
        let config = repo.config()?;
        Self::from_git_config(&config, overrides)
    }

    pub fn from_git_config(config: &Config, overrides: Overrides) -> Result<Self> {
        let defaults = Self::default();

        let protected = if !overrides.protected.is_empty() {
            ProtectedPaths::parse(&overrides.protected)?
        } else {
            let configured = get_all(config, "mirror.protect")?;
            if configured.is_empty() {
                defaults.protected
            } else {
                ProtectedPaths::parse(&configured)?
            }
        };

        let mut exclude = get_all(config, "mirror.exclude")?;
        exclude.extend(overrides.exclude);

        let mut include = get_all(config, "mirror.include")?;
        include.extend(overrides.include);

        let merged = Self {
            upstream_url: overrides
                .upstream_url
                .or(get_one(config, "mirror.upstream")?),
            upstream_remote: overrides
                .upstream_remote
                .or(get_one(config, "mirror.upstreamRemote")?)
                .unwrap_or(defaults.upstream_remote),
            fork_remote: overrides
                .fork_remote
                .or(get_one(config, "mirror.forkRemote")?)
                .unwrap_or(defaults.fork_remote),
            protected,
            include,
            exclude,
            message: overrides
                .message
                .or(get_one(config, "mirror.message")?)
                .unwrap_or(defaults.message),
        };
        merged.validate()?;
        Ok(merged)
    }

    fn validate(&self) -> Result<()> {
        if self.upstream_remote == self.fork_remote {
            return Err(MirrorError::Config(format!(
                "upstream and fork remotes are both '{}'",
                self.fork_remote
            )));
        }
        if self.message.trim().is_empty() {
            return Err(MirrorError::Config("commit message is empty".to_string()));
        }
        Ok(())
    }
}

fn get_one(config: &Config, key: &str) -> Result<Option<String>> {
    match config.get_string(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(MirrorError::Config(format!("{}: {}", key, e.message()))),
    }
}

fn get_all(config: &Config, key: &str) -> Result<Vec<String>> {
    let mut entries = match config.multivar(key, None) {
        Ok(entries) => entries,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(MirrorError::Config(format!("{}: {}", key, e.message()))),
    };

    let mut values = Vec::new();
    while let Some(entry) = entries.next() {
        if let Some(value) = entry?.value() {
            values.push(value.to_string());
        }
    }
    Ok(values)
}
