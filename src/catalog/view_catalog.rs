use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{ColumnInfo, ViewProvider};

/// One view as described by the catalog layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewInfo {
    /// Defining query (QL or SQL), opaque to the compiler.
    pub query: Option<Value>,
    /// Map of column name -> column metadata
    pub columns: IndexMap<String, ColumnInfo>,
    pub fdw_connections: Option<Value>,
}

impl ViewInfo {
    pub fn with_columns<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (String, ColumnInfo)>,
    {
        Self { columns: columns.into_iter().collect(), ..Default::default() }
    }
}

/// The `views` map handed to the compiler by the catalog layer, keyed by view
/// name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewCatalog {
    pub views: IndexMap<String, ViewInfo>,
}

impl ViewCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, view: ViewInfo) {
        self.views.insert(name.to_string(), view);
    }

    pub fn get(&self, name: &str) -> Option<&ViewInfo> {
        self.views.get(name)
    }
}

impl ViewProvider for ViewCatalog {
    fn geo_type_of(&self, view: &str, column: &str) -> Option<String> {
        self.views.get(view)?.columns.get(column)?.geo_type.clone()
    }
}
