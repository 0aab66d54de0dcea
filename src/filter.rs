// Branch selection

use crate::errors::Result;
use regex::Regex;

#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    names: Vec<String>,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl BranchFilter {
    pub fn new(names: &[String], include: &[String], exclude: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>> {
            patterns
                .iter()
                .map(|pattern| Regex::new(pattern).map_err(Into::into))
                .collect()
        };

        Ok(Self {
            names: names.to_vec(),
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn matches(&self, branch: &str) -> bool {
        if branch == "HEAD" {
            return false;
        }
        if !self.names.is_empty() && !self.names.iter().any(|name| name == branch) {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(branch)) {
            return false;
        }
        !self.exclude.iter().any(|re| re.is_match(branch))
    }

    /// Keep the selected branches, in their original order
    pub fn select(&self, branches: Vec<String>) -> Vec<String> {
        branches
            .into_iter()
            .filter(|branch| {
                let keep = self.matches(branch);
                if !keep {
                    log::debug!("Skipping branch {} (filtered out)", branch);
                }
                keep
            })
            .collect()
    }
}
