use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Cannot synchronize branch '{branch}': {reason}")]
    BranchSync { branch: String, reason: String },

    #[error("Cannot publish branch '{branch}': {reason}")]
    Publish { branch: String, reason: String },

    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("Repository error: {0}")]
    Repository(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid protected path '{0}'")]
    InvalidPath(String),

    #[error("Invalid branch pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MirrorError {
    /// Wrap any error raised while synchronizing `branch`
    ///
    /// Publish errors are kept as they are so the report can tell them apart
    pub fn for_branch(self, branch: &str) -> Self {
        match self {
            MirrorError::BranchSync { .. } | MirrorError::Publish { .. } => self,
            other => MirrorError::BranchSync {
                branch: branch.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
