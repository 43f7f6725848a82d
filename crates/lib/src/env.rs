//! Immutable process environment.
//!
//! An [`Environment`] is a snapshot of variable name to value. Overrides never
//! mutate the value they are applied to; they return a new snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
  vars: Arc<BTreeMap<String, String>>,
}

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  /// Capture the environment of the current process.
  pub fn from_process() -> Self {
    std::env::vars().collect()
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.vars.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Return a new environment with `key` set to `value`.
  pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
    let mut vars = (*self.vars).clone();
    vars.insert(key.into(), value.into());
    Self { vars: Arc::new(vars) }
  }

  /// Return a new environment where every entry of `overrides` wins over the
  /// entries of `self`.
  pub fn merged<I, K, V>(&self, overrides: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mut overrides = overrides.into_iter().peekable();
    if overrides.peek().is_none() {
      return self.clone();
    }

    let mut vars = (*self.vars).clone();
    for (key, value) in overrides {
      vars.insert(key.into(), value.into());
    }
    Self { vars: Arc::new(vars) }
  }

  /// Prepend `entry` to a `:`-separated search path variable.
  ///
  /// When the variable is unset the result is just `entry`.
  pub fn with_path_prefix(&self, key: &str, entry: &str) -> Self {
    let value = match self.get(key) {
      Some(current) if !current.is_empty() => format!("{}:{}", entry, current),
      _ => entry.to_string(),
    };
    self.with(key, value)
  }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
  K: Into<String>,
  V: Into<String>,
{
  fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
    let vars = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    Self { vars: Arc::new(vars) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn override_wins_on_collision() {
    let base: Environment = [("PATH", "/usr/bin"), ("HOME", "/root")].into_iter().collect();
    let merged = base.merged([("PATH", "/opt/k1/bin")]);

    assert_eq!(merged.get("PATH"), Some("/opt/k1/bin"));
    assert_eq!(merged.get("HOME"), Some("/root"));
  }

  #[test]
  fn merging_never_mutates_base() {
    let base: Environment = [("A", "1")].into_iter().collect();
    let _merged = base.merged([("A", "2"), ("B", "3")]);
    let _with = base.with("C", "4");

    assert_eq!(base.len(), 1);
    assert_eq!(base.get("A"), Some("1"));
    assert!(!base.contains("B"));
    assert!(!base.contains("C"));
  }

  #[test]
  fn empty_override_returns_equal_value() {
    let base: Environment = [("A", "1")].into_iter().collect();
    let merged = base.merged(Vec::<(String, String)>::new());
    assert_eq!(merged, base);
  }

  #[test]
  fn path_prefix_on_unset_and_set_variables() {
    let env = Environment::new().with_path_prefix("PATH", "/opt/k1/bin");
    assert_eq!(env.get("PATH"), Some("/opt/k1/bin"));

    let env = env.with_path_prefix("PATH", "/opt/other/bin");
    assert_eq!(env.get("PATH"), Some("/opt/other/bin:/opt/k1/bin"));
  }

  #[test]
  fn iteration_is_sorted_by_key() {
    let env: Environment = [("Z", "1"), ("A", "2")].into_iter().collect();
    let keys: Vec<_> = env.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["A", "Z"]);
  }
}
