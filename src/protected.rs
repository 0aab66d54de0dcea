use crate::errors::{MirrorError, Result};
use std::path::{Component, Path};

pub const DEFAULT_PROTECTED: &str = ".github/workflows";

/// Path prefixes that keep the fork's content when a branch is overwritten
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtectedPaths {
    paths: Vec<String>,
}

impl ProtectedPaths {
    pub fn parse<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths: Vec<String> = Vec::new();
        for entry in raw {
            let path = normalize(entry.as_ref())?;
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        Ok(Self { paths })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');

    if trimmed.is_empty() || trimmed == "." {
        return Err(MirrorError::InvalidPath(raw.to_string()));
    }

    let path = Path::new(trimmed);
    let valid = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !valid {
        return Err(MirrorError::InvalidPath(raw.to_string()));
    }

    // git wants forward slashes whatever the platform
    let parts: Vec<String> = path
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
