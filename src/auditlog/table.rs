use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully-qualified BigQuery table or view.
///
/// Absent components are stored as empty strings so that equality always
/// compares all three fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

/// Loose wire shape: `{"projectId": .., "datasetId": .., "tableId": ..}`, any key optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTableRef {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// True when the reference names a concrete table (no empty component).
    pub fn has_value(&self) -> bool {
        !self.project.is_empty() && !self.dataset.is_empty() && !self.table.is_empty()
    }
}

impl From<RawTableRef> for TableRef {
    fn from(raw: RawTableRef) -> Self {
        Self::new(
            raw.project_id.unwrap_or_default(),
            raw.dataset_id.unwrap_or_default(),
            raw.table_id.unwrap_or_default(),
        )
    }
}

impl From<Option<RawTableRef>> for TableRef {
    fn from(raw: Option<RawTableRef>) -> Self {
        raw.map(Self::from).unwrap_or_default()
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn equality_compares_every_field() {
        let a = TableRef::new("p", "d", "t");
        assert_eq!(a, TableRef::new("p", "d", "t"));
        assert_ne!(a, TableRef::new("q", "d", "t"));
        assert_ne!(a, TableRef::new("p", "e", "t"));
        assert_ne!(a, TableRef::new("p", "d", "u"));
        assert_ne!(TableRef::new("p", "", ""), TableRef::new("p", "d", ""));
    }

    #[test]
    fn has_value_requires_all_components() {
        assert!(TableRef::new("p", "d", "t").has_value());
        assert!(!TableRef::new("", "d", "t").has_value());
        assert!(!TableRef::new("p", "", "t").has_value());
        assert!(!TableRef::new("p", "d", "").has_value());
        assert!(!TableRef::default().has_value());
    }

    #[test]
    fn renders_dotted_identity() {
        assert_eq!(TableRef::new("proj", "ds", "tbl").to_string(), "proj.ds.tbl");
    }

    #[test]
    fn absent_keys_become_empty_strings() {
        let raw: RawTableRef = serde_json::from_str(r#"{"projectId": "p", "tableId": null}"#).unwrap();
        assert_eq!(TableRef::from(raw), TableRef::new("p", "", ""));
        assert_eq!(TableRef::from(None), TableRef::default());
    }
}
