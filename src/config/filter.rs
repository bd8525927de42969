//! Exclusion policy: which principals and tables never enter the lineage graph.
//!
//! `FiltersSpec` is the raw document section; `validate_and_build` compiles
//! every pattern up front so a broken regexp fails before any record is read.
//!
//! Matching is unanchored search (`Regex::is_match`), OR across the rules and
//! OR across the fields present in one rule: a rule with only
//! `dataset_regexp` excludes by dataset whatever the project and table are.

use crate::auditlog::TableRef;
use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersSpec {
    #[serde(default)]
    pub excluded_tables: Vec<ExcludedTableSpec>,

    #[serde(default)]
    pub excluded_principal_emails: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludedTableSpec {
    #[serde(default)]
    pub project_regexp: Option<String>,

    #[serde(default)]
    pub dataset_regexp: Option<String>,

    #[serde(default)]
    pub table_regexp: Option<String>,
}

/// One compiled `excluded_tables` entry. `None` fields never match.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRule {
    pub project: Option<Regex>,
    pub dataset: Option<Regex>,
    pub table: Option<Regex>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    pub excluded_tables: Vec<ExclusionRule>,
    pub excluded_principals: Vec<Regex>,
}

impl FiltersSpec {
    pub fn validate_and_build(&self) -> Result<FilterPolicy, ConfigError> {
        let excluded_tables = self
            .excluded_tables
            .iter()
            .map(|rule| -> Result<ExclusionRule, ConfigError> {
                Ok(ExclusionRule {
                    project: compile_optional("project_regexp", rule.project_regexp.as_deref())?,
                    dataset: compile_optional("dataset_regexp", rule.dataset_regexp.as_deref())?,
                    table: compile_optional("table_regexp", rule.table_regexp.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let excluded_principals = self
            .excluded_principal_emails
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| compile("excluded_principal_emails", p))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(FilterPolicy {
            excluded_tables,
            excluded_principals,
        })
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        source,
    })
}

// Empty patterns count as absent; an empty regex would match everything.
fn compile_optional(field: &'static str, pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    match pattern {
        Some(p) if !p.is_empty() => compile(field, p).map(Some),
        _ => Ok(None),
    }
}

impl ExclusionRule {
    pub fn matches(&self, table: &TableRef) -> bool {
        let hit = |re: &Option<Regex>, value: &str| re.as_ref().is_some_and(|re| re.is_match(value));
        hit(&self.project, &table.project)
            || hit(&self.dataset, &table.dataset)
            || hit(&self.table, &table.table)
    }
}

impl FilterPolicy {
    pub fn is_excluded_principal(&self, email: &str) -> bool {
        self.excluded_principals.iter().any(|re| re.is_match(email))
    }

    pub fn is_excluded_table(&self, table: &TableRef) -> bool {
        self.excluded_tables.iter().any(|rule| rule.matches(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn policy(yaml: &str) -> FilterPolicy {
        let spec: FiltersSpec = serde_yaml::from_str(yaml).unwrap();
        spec.validate_and_build().unwrap()
    }

    #[test]
    fn empty_policy_excludes_nothing() {
        let p = FilterPolicy::default();
        assert!(!p.is_excluded_principal("anyone@example.com"));
        assert!(!p.is_excluded_table(&TableRef::new("p", "d", "t")));
    }

    #[test]
    fn principal_patterns_search_anywhere() {
        let p = policy(
            r#"
excluded_principal_emails:
  - "robot"
  - "^admin@"
"#,
        );
        assert!(p.is_excluded_principal("etl-robot@proj.iam.gserviceaccount.com"));
        assert!(p.is_excluded_principal("admin@example.com"));
        assert!(!p.is_excluded_principal("sysadmin@example.com"));
        assert!(!p.is_excluded_principal("analyst@example.com"));
    }

    #[test]
    fn single_field_rule_excludes_by_that_field_alone() {
        let p = policy(
            r#"
excluded_tables:
  - dataset_regexp: "dataset_0"
"#,
        );
        assert!(p.is_excluded_table(&TableRef::new("any", "dataset_01", "x")));
        assert!(p.is_excluded_table(&TableRef::new("other", "dataset_02", "y")));
        assert!(!p.is_excluded_table(&TableRef::new("any", "dataset_10", "x")));
    }

    #[test]
    fn fields_within_a_rule_are_ored() {
        let p = policy(
            r#"
excluded_tables:
  - project_regexp: "^sandbox$"
    table_regexp: "_tmp$"
"#,
        );
        // Only the project matches.
        assert!(p.is_excluded_table(&TableRef::new("sandbox", "d", "t")));
        // Only the table matches.
        assert!(p.is_excluded_table(&TableRef::new("prod", "d", "t_tmp")));
        assert!(!p.is_excluded_table(&TableRef::new("prod", "d", "t")));
    }

    #[test]
    fn rules_are_ored() {
        let p = policy(
            r#"
excluded_tables:
  - project_regexp: "^a$"
  - table_regexp: "^z$"
"#,
        );
        assert!(p.is_excluded_table(&TableRef::new("a", "d", "t")));
        assert!(p.is_excluded_table(&TableRef::new("b", "d", "z")));
        assert!(!p.is_excluded_table(&TableRef::new("b", "d", "t")));
    }

    #[test]
    fn empty_patterns_are_ignored() {
        let p = policy(
            r#"
excluded_tables:
  - project_regexp: ""
    dataset_regexp: "^scratch$"
excluded_principal_emails: [""]
"#,
        );
        assert_eq!(p.excluded_principals.len(), 0);
        assert!(p.excluded_tables[0].project.is_none());
        assert!(!p.is_excluded_table(&TableRef::new("p", "d", "t")));
        assert!(p.is_excluded_table(&TableRef::new("p", "scratch", "t")));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let spec: FiltersSpec = serde_yaml::from_str(
            r#"
excluded_tables:
  - table_regexp: "(unclosed"
"#,
        )
        .unwrap();
        match spec.validate_and_build() {
            Err(ConfigError::InvalidPattern { field, pattern, .. }) => {
                assert_eq!(field, "table_regexp");
                assert_eq!(pattern, "(unclosed");
            }
            Ok(_) => panic!("expected an invalid pattern error"),
        }
    }
}
