use crate::errors::{MirrorError, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The fork already had the right head
    UpToDate { head: String },
    /// The fork was (or, in a dry run, would be) force pushed
    Updated { head: String, pushed: bool },
    Failed { stage: Stage, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sync,
    Publish,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchOutcome {
    pub branch: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl BranchOutcome {
    pub fn failed(branch: &str, error: &MirrorError) -> Self {
        let stage = match error {
            MirrorError::Publish { .. } => Stage::Publish,
            _ => Stage::Sync,
        };
        Self {
            branch: branch.to_string(),
            outcome: Outcome::Failed {
                stage,
                error: error.to_string(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub upstream: String,
    pub fork: String,
    pub dry_run: bool,
    pub branches: Vec<BranchOutcome>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.branches.iter().filter(|b| b.is_failure()).count()
    }

    #[cfg(test)]
    pub fn get(&self, branch: &str) -> Option<&Outcome> {
        self.branches
            .iter()
            .find(|b| b.branch == branch)
            .map(|b| &b.outcome)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
