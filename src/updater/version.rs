use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::core::UpdateError;

/// A plugin version: a non-empty, ordered tuple of integers.
///
/// Release tags of this plugin are plain dotted integers (optionally
/// `v`-prefixed) with no pre-release suffixes, so versions compare
/// lexicographically component by component, like tuples: `0.1.0 > 0.0.9`
/// and `1.0.0 > 0.9.9`. A shorter version that is a prefix of a longer one
/// sorts first (`1.0 < 1.0.0`).
///
/// # Examples
///
/// ```rust,no_run
/// use lightgroup_tools::updater::PluginVersion;
///
/// let current: PluginVersion = "0.0.2".parse().unwrap();
/// let latest = PluginVersion::parse_tag("v0.0.6").unwrap();
/// assert!(latest > current);
/// assert_eq!(latest.to_string(), "0.0.6");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginVersion(Vec<u64>);

impl PluginVersion {
    /// Build a version from its components.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ParseError`] for an empty component list.
    pub fn new(components: impl Into<Vec<u64>>) -> Result<Self, UpdateError> {
        let components = components.into();
        if components.is_empty() {
            return Err(UpdateError::ParseError {
                reason: "a version needs at least one component".to_string(),
            });
        }
        Ok(Self(components))
    }

    /// The version baked into the running plugin.
    pub fn current() -> Self {
        Self::parse_tag(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Self(vec![0]))
    }

    /// Parse a release tag such as `v0.1.2` or `release-1.4`.
    ///
    /// Every leading non-digit character is stripped; the remainder must be
    /// dot-separated unsigned integers.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ParseError`] if nothing numeric remains or any
    /// component is not an integer (e.g. `not-a-version`, `1.2.x`).
    pub fn parse_tag(tag: &str) -> Result<Self, UpdateError> {
        let trimmed = tag.trim();
        let numeric = trimmed.trim_start_matches(|c: char| !c.is_ascii_digit());
        if numeric.is_empty() {
            return Err(UpdateError::ParseError {
                reason: format!("release tag '{tag}' does not contain a version"),
            });
        }

        let components = numeric
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|_| UpdateError::ParseError {
                    reason: format!("release tag '{tag}' has a non-numeric component '{part}'"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(components)
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for PluginVersion {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_tag(s)
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for PluginVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PluginVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether `latest` is strictly newer than `current`.
#[must_use]
pub fn resolve_available(current: &PluginVersion, latest: &PluginVersion) -> bool {
    latest > current
}
