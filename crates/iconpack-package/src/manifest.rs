use crate::PackageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const UNTYPED_ENTRY: &str = "dist/jsx/index.js";
pub const TYPED_ENTRY: &str = "dist/tsx/index.ts";
pub const DECLARATION_ENTRY: &str = "dist/tsx/index.d.ts";

const MAX_NAME_LEN: usize = 214;

/// The synthesized `package.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub main: String,
    pub source: String,
    pub types: String,
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            main: UNTYPED_ENTRY.to_owned(),
            source: TYPED_ENTRY.to_owned(),
            types: DECLARATION_ENTRY.to_owned(),
            files: vec!["dist".to_owned()],
            author: None,
            description: None,
            peer_dependencies: BTreeMap::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, PackageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PackageError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Turn a free-form project name into an npm package name: lower-cased, every
/// character outside `[a-z0-9._~-]` replaced with `-`. A leading `@scope/` is
/// kept as the scope separator.
pub fn package_name_from_project(project_name: &str) -> String {
    let lowered = project_name.trim().to_lowercase();
    let sanitize = |s: &str| -> String {
        s.chars()
            .map(|c| match c {
                'a'..='z' | '0'..='9' | '.' | '_' | '~' | '-' => c,
                _ => '-',
            })
            .collect()
    };
    match lowered
        .strip_prefix('@')
        .and_then(|rest| rest.split_once('/'))
    {
        Some((scope, name)) => format!("@{}/{}", sanitize(scope), sanitize(name)),
        None => sanitize(&lowered),
    }
}

pub fn validate_package_name(name: &str) -> Result<(), PackageError> {
    let invalid = |reason: &str| PackageError::InvalidName {
        name: name.to_owned(),
        reason: reason.to_owned(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is longer than 214 characters"));
    }
    if name != name.to_lowercase() {
        return Err(invalid("name must be lower-case"));
    }
    let bare = match name.strip_prefix('@') {
        Some(rest) => {
            let Some((scope, bare)) = rest.split_once('/') else {
                return Err(invalid("scoped name must look like @scope/name"));
            };
            if scope.is_empty() || !valid_segment(scope) {
                return Err(invalid("scope contains invalid characters"));
            }
            bare
        }
        None => name,
    };
    if bare.is_empty() || !valid_segment(bare) {
        return Err(invalid("name contains invalid characters"));
    }
    if bare.starts_with('.') || bare.starts_with('_') {
        return Err(invalid("name cannot start with '.' or '_'"));
    }
    Ok(())
}

fn valid_segment(s: &str) -> bool {
    s.chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '_' | '~' | '-'))
}

/// Base of archive and output root names for a package: lower-cased, `@`
/// dropped, `/` turned into `-`.
pub fn archive_stem(package_name: &str) -> String {
    package_name
        .to_lowercase()
        .replace('@', "")
        .replace('/', "-")
}

/// How the published version is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionStrategy {
    /// Publish the configured base version as-is.
    #[default]
    Fixed,
    /// Keep major and minor of the base version and use the run's UTC time
    /// (`yyyymmddHHMMSS`) as the patch component, so repeated publishes of
    /// the same project never reuse a version.
    RunStamp,
}

impl std::str::FromStr for VersionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "run-stamp" | "runstamp" => Ok(Self::RunStamp),
            other => Err(format!(
                "unknown version strategy '{other}', expected 'fixed' or 'run-stamp'"
            )),
        }
    }
}

/// Check that `base` is a plain `MAJOR.MINOR.PATCH` version.
pub fn validate_version(base: &str) -> Result<(), PackageError> {
    version_parts(base).map(|_| ())
}

fn version_parts(base: &str) -> Result<Vec<&str>, PackageError> {
    let parts: Vec<&str> = base.trim().split('.').collect();
    let numeric = |p: &&str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if parts.len() != 3 || !parts.iter().all(numeric) {
        return Err(PackageError::InvalidVersion(base.to_owned()));
    }
    Ok(parts)
}

pub fn resolve_version(
    base: &str,
    strategy: VersionStrategy,
    now: DateTime<Utc>,
) -> Result<String, PackageError> {
    let parts = version_parts(base)?;
    Ok(match strategy {
        VersionStrategy::Fixed => base.trim().to_owned(),
        VersionStrategy::RunStamp => {
            format!("{}.{}.{}", parts[0], parts[1], now.format("%Y%m%d%H%M%S"))
        }
    })
}
