use serde::{Deserialize, Serialize};

/// Column metadata supplied by the view catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnInfo {
    pub geo_type: Option<String>,
    pub category: Option<String>,
}

impl ColumnInfo {
    pub fn geo(geo_type: &str) -> Self {
        Self { geo_type: Some(geo_type.to_string()), category: None }
    }
}
