//! Build and validation configuration selection.
//!
//! A [`Configuration`] is an opaque name taken from the product's catalog
//! (`make list-configs`). Which configurations are built and validated is
//! decided either by the CI execution label, through an ordered
//! [`LabelRule`] table, or by explicit lists supplied on the command line.

mod catalog;
mod resolver;
mod rules;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exec::ExecError;

pub use catalog::{Catalog, CatalogSource, MakeCatalog};
pub use resolver::{ConfigResolver, LabelMatch, ResolvedConfigs};
pub use rules::{LabelRule, Matcher, default_rules};

/// Prefix shared by every configuration name of the default rule table.
pub const CONFIG_PREFIX: &str = "k1b-kalray-";

/// A named hardware/OS configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(pub String);

impl Configuration {
  pub fn new(name: impl Into<String>) -> Self {
    Configuration(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Segment before the first `_` (`k1b-kalray-nodeos` for `k1b-kalray-nodeos_simu`).
  pub fn platform(&self) -> &str {
    self.0.split('_').next().unwrap_or(&self.0)
  }

  /// Segment after the first `_`, if any.
  pub fn board(&self) -> Option<&str> {
    self.0.split('_').nth(1).filter(|s| !s.is_empty())
  }
}

impl std::fmt::Display for Configuration {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for Configuration {
  fn from(name: &str) -> Self {
    Configuration(name.to_string())
  }
}

/// An ordered set of configurations with no duplicates.
///
/// Insertion keeps the first occurrence; later duplicates are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSet(Vec<Configuration>);

impl ConfigSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert `config` unless already present. Returns whether it was added.
  pub fn insert(&mut self, config: Configuration) -> bool {
    if self.0.contains(&config) {
      return false;
    }
    self.0.push(config);
    true
  }

  pub fn contains(&self, config: &Configuration) -> bool {
    self.0.contains(config)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Configuration> {
    self.0.iter()
  }

  /// Space-separated names, as passed to `make CONFIGS='...'`.
  pub fn joined(&self) -> String {
    self.0.iter().map(Configuration::as_str).collect::<Vec<_>>().join(" ")
  }
}

impl FromIterator<Configuration> for ConfigSet {
  fn from_iter<T: IntoIterator<Item = Configuration>>(iter: T) -> Self {
    let mut set = ConfigSet::new();
    for config in iter {
      set.insert(config);
    }
    set
  }
}

impl<'a> IntoIterator for &'a ConfigSet {
  type Item = &'a Configuration;
  type IntoIter = std::slice::Iter<'a, Configuration>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

/// How validation suites reach the hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
  /// Simulator.
  #[default]
  Sim,
  /// Boards attached over JTAG.
  Jtag,
  /// Boards reached through a remote runner.
  Remote,
}

impl ValidationMode {
  /// The ctest label selecting suites for this mode.
  pub fn as_str(&self) -> &'static str {
    match self {
      ValidationMode::Sim => "sim",
      ValidationMode::Jtag => "jtag",
      ValidationMode::Remote => "remote",
    }
  }
}

impl std::fmt::Display for ValidationMode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("unsupported label {0}!")]
  UnsupportedContext(String),

  #[error("invalid config '{0}'")]
  UnknownConfiguration(String),

  #[error("failed to query configuration catalog: {0}")]
  CatalogQuery(#[from] ExecError),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn platform_and_board_split_on_first_underscore() {
    let config = Configuration::from("k1b-kalray-nodeos_simu");
    assert_eq!(config.platform(), "k1b-kalray-nodeos");
    assert_eq!(config.board(), Some("simu"));

    let bare = Configuration::from("k1b-kalray-nodeos");
    assert_eq!(bare.platform(), "k1b-kalray-nodeos");
    assert_eq!(bare.board(), None);
  }

  #[test]
  fn config_set_keeps_first_occurrence() {
    let set: ConfigSet = ["b", "a", "b", "c", "a"].into_iter().map(Configuration::from).collect();
    assert_eq!(set.joined(), "b a c");
    assert_eq!(set.len(), 3);
  }

  #[test]
  fn validation_mode_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&ValidationMode::Remote).unwrap(), "\"remote\"");
    assert_eq!(ValidationMode::default().to_string(), "sim");
  }
}
