use serde::Serialize;
use tracing::{debug, info};

use super::rules::{LabelRule, default_rules};
use super::{Catalog, ConfigError, ConfigSet, Configuration, ValidationMode};

/// What a label rule selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelMatch {
  /// Replaces the build set when present.
  pub build: Option<ConfigSet>,
  pub validate: ConfigSet,
  pub mode: ValidationMode,
}

/// The configuration sets a run works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfigs {
  pub build: ConfigSet,
  pub validate: ConfigSet,
  pub mode: ValidationMode,
}

/// Turns labels and explicit lists into validated [`ConfigSet`]s.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
  rules: Vec<LabelRule>,
}

impl Default for ConfigResolver {
  fn default() -> Self {
    Self::new(default_rules())
  }
}

impl ConfigResolver {
  pub fn new(rules: Vec<LabelRule>) -> Self {
    Self { rules }
  }

  /// Look `label` up in the rule table. The first matching rule wins.
  ///
  /// An empty label yields `Ok(None)`. A non-empty label no rule matches is
  /// [`ConfigError::UnsupportedContext`].
  pub fn resolve_from_label(&self, label: &str, catalog: &Catalog) -> Result<Option<LabelMatch>, ConfigError> {
    if label.is_empty() {
      return Ok(None);
    }

    let Some(rule) = self.rules.iter().find(|r| r.matches(label)) else {
      return Err(ConfigError::UnsupportedContext(label.to_string()));
    };

    let build = match &rule.build {
      Some(names) => Some(self.resolve_explicit(names, catalog)?),
      None => None,
    };
    let validate = self.resolve_explicit(&rule.validate, catalog)?;

    debug!(label, mode = %rule.mode, validate = %validate.joined(), "label matched");
    Ok(Some(LabelMatch {
      build,
      validate,
      mode: rule.mode,
    }))
  }

  /// Validate every name against `catalog` and deduplicate, keeping the first
  /// occurrence of each.
  pub fn resolve_explicit<S: AsRef<str>>(&self, names: &[S], catalog: &Catalog) -> Result<ConfigSet, ConfigError> {
    let mut set = ConfigSet::new();
    for name in names {
      let name = name.as_ref();
      if !catalog.contains(name) {
        return Err(ConfigError::UnknownConfiguration(name.to_string()));
      }
      set.insert(Configuration::from(name));
    }
    Ok(set)
  }

  /// Combine the label with explicit lists.
  ///
  /// `configs` and `valid_configs` default to the whole catalog when `None`. A
  /// matched label replaces the validation set and mode, and replaces the build
  /// set when its rule fixes one.
  pub fn resolve(
    &self,
    label: &str,
    configs: Option<&[String]>,
    valid_configs: Option<&[String]>,
    catalog: &Catalog,
  ) -> Result<ResolvedConfigs, ConfigError> {
    let matched = self.resolve_from_label(label, catalog)?;

    let (rule_build, validate, mode) = match matched {
      Some(m) => (m.build, m.validate, m.mode),
      None => {
        let validate = match valid_configs {
          Some(names) => self.resolve_explicit(names, catalog)?,
          None => catalog.all(),
        };
        (None, validate, ValidationMode::default())
      }
    };

    let build = match rule_build {
      Some(build) => build,
      None => match configs {
        Some(names) => self.resolve_explicit(names, catalog)?,
        None => catalog.all(),
      },
    };

    info!(build = %build.joined(), validate = %validate.joined(), %mode, "resolved configurations");
    Ok(ResolvedConfigs { build, validate, mode })
  }
}
