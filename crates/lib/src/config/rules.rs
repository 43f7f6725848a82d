use serde::Serialize;

use super::{CONFIG_PREFIX, ValidationMode};

/// How a rule recognizes a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Matcher {
  Exact(String),
  Contains(String),
}

impl Matcher {
  pub fn exact(value: &str) -> Self {
    Matcher::Exact(value.to_string())
  }

  pub fn contains(value: &str) -> Self {
    Matcher::Contains(value.to_string())
  }

  pub fn matches(&self, label: &str) -> bool {
    match self {
      Matcher::Exact(value) => label == value,
      Matcher::Contains(value) => label.contains(value.as_str()),
    }
  }
}

/// One row of the label table.
///
/// A rule matches when any of its matchers does. `build` replaces the build
/// set when present; `validate` always replaces the validation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelRule {
  pub matchers: Vec<Matcher>,
  pub build: Option<Vec<String>>,
  pub validate: Vec<String>,
  pub mode: ValidationMode,
}

impl LabelRule {
  pub fn matches(&self, label: &str) -> bool {
    self.matchers.iter().any(|m| m.matches(label))
  }
}

fn configs(names: &[&str]) -> Vec<String> {
  names.iter().map(|n| format!("{CONFIG_PREFIX}{n}")).collect()
}

fn rule(matchers: Vec<Matcher>, build: Option<&[&str]>, validate: &[&str], mode: ValidationMode) -> LabelRule {
  LabelRule {
    matchers,
    build: build.map(configs),
    validate: configs(validate),
    mode,
  }
}

/// The CI label table, in match order.
pub fn default_rules() -> Vec<LabelRule> {
  use Matcher as M;
  use ValidationMode::{Jtag, Remote, Sim};

  vec![
    rule(
      vec![M::contains("MPPADevelopers-ab01"), M::contains("MPPAEthDevelopers-ab01")],
      None,
      &["nodeos_developer", "mos_developer"],
      Jtag,
    ),
    rule(
      vec![M::contains("KONIC80Developer"), M::contains("MPPA_KONIC80_Developer")],
      None,
      &["nodeos_konic80", "mos_konic80"],
      Jtag,
    ),
    rule(
      vec![M::contains("MPPA_EMB01b_centos7-with-eth-loopback")],
      None,
      &["mos_emb01"],
      Remote,
    ),
    rule(
      vec![M::contains("MPPA_AB04_Developers-with-loopback")],
      None,
      &["mos_ab04"],
      Jtag,
    ),
    rule(
      vec![
        M::exact("fedora19-64"),
        M::exact("debian6-64"),
        M::contains("MPPADeveloper"),
        M::contains("MPPAEthDeveloper"),
      ],
      None,
      &[],
      Sim,
    ),
    rule(
      vec![M::exact("fedora17-64")],
      Some(&["nodeos_explorer", "mos_explorer"][..]),
      &[],
      Sim,
    ),
    rule(
      vec![M::exact("debian7-64")],
      Some(&["mos_developer", "mos_konic80"][..]),
      &[],
      Sim,
    ),
    rule(vec![M::exact("centos7-64")], None, &["nodeos_simu", "mos_simu"], Sim),
    rule(
      vec![M::contains("MPPAExplorers_k1")],
      None,
      &["nodeos_explorer", "mos_explorer"],
      Jtag,
    ),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  fn first_match<'a>(rules: &'a [LabelRule], label: &str) -> Option<&'a LabelRule> {
    rules.iter().find(|r| r.matches(label))
  }

  #[test]
  fn exact_does_not_match_substrings() {
    assert!(Matcher::exact("centos7-64").matches("centos7-64"));
    assert!(!Matcher::exact("centos7-64").matches("MPPA_EMB01b_centos7-64"));
    assert!(Matcher::contains("KONIC80Developer").matches("MPPA-KONIC80Developers-3"));
  }

  #[test]
  fn ab01_label_wins_over_generic_developer_row() {
    let rules = default_rules();
    let rule = first_match(&rules, "MPPADevelopers-ab01b").unwrap();

    assert_eq!(rule.mode, ValidationMode::Jtag);
    assert_eq!(
      rule.validate,
      vec!["k1b-kalray-nodeos_developer", "k1b-kalray-mos_developer"]
    );
  }

  #[test]
  fn generic_developer_label_validates_nothing() {
    let rules = default_rules();
    let rule = first_match(&rules, "MPPADevelopers-ab02").unwrap();

    assert!(rule.validate.is_empty());
    assert_eq!(rule.mode, ValidationMode::Sim);
    assert!(rule.build.is_none());
  }

  #[test]
  fn emb01_loopback_is_remote() {
    let rules = default_rules();
    let rule = first_match(&rules, "MPPA_EMB01b_centos7-with-eth-loopback").unwrap();
    assert_eq!(rule.mode, ValidationMode::Remote);
    assert_eq!(rule.validate, vec!["k1b-kalray-mos_emb01"]);
  }

  #[test]
  fn build_overrides_only_on_fedora17_and_debian7() {
    let rules = default_rules();
    let overriding: Vec<_> = rules.iter().filter(|r| r.build.is_some()).collect();

    assert_eq!(overriding.len(), 2);
    assert_eq!(
      first_match(&rules, "debian7-64").unwrap().build.as_deref(),
      Some(&["k1b-kalray-mos_developer".to_string(), "k1b-kalray-mos_konic80".to_string()][..])
    );
  }

  #[test]
  fn trailing_letter_of_board_labels_is_optional() {
    let rules = default_rules();

    for label in ["MPPA_KONIC80_Developer-2", "MPPA_KONIC80_Developers"] {
      let rule = first_match(&rules, label).unwrap();
      assert_eq!(rule.mode, ValidationMode::Jtag);
      assert_eq!(rule.validate, vec!["k1b-kalray-nodeos_konic80", "k1b-kalray-mos_konic80"]);
    }
    for label in ["MPPAExplorers_k1", "MPPAExplorers_k1b-2"] {
      let rule = first_match(&rules, label).unwrap();
      assert_eq!(rule.mode, ValidationMode::Jtag);
      assert_eq!(rule.validate, vec!["k1b-kalray-nodeos_explorer", "k1b-kalray-mos_explorer"]);
    }
  }

  #[test]
  fn unknown_label_matches_nothing() {
    assert!(first_match(&default_rules(), "ubuntu-22.04").is_none());
  }
}
