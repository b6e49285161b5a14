use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;

use crate::compiler::{PgDialect, SqlDialect, TrinoDialect};

/// Case-insensitive registry of SQL dialects, keyed by engine name.
#[derive(Default)]
pub struct DialectRegistry {
    by_name: HashMap<String, Arc<dyn SqlDialect>>,
}

impl DialectRegistry {
    pub fn new() -> Self { Self { by_name: HashMap::new() } }

    pub fn register<D: SqlDialect + 'static>(&mut self, dialect: D) {
        self.by_name.insert(dialect.name().to_ascii_lowercase(), Arc::new(dialect));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SqlDialect>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        let mut v: Vec<_> = self.by_name.keys().cloned().collect();
        v.sort();
        v
    }

    pub fn default_dialect_registry() -> Self {
        let mut registry = Self::new();
        registry.register(PgDialect);
        registry.register(TrinoDialect);
        registry
    }
}

pub static DIALECTS: Lazy<DialectRegistry> = Lazy::new(DialectRegistry::default_dialect_registry);

#[cfg(test)]
mod tests {
    use crate::compiler::{DialectRegistry, DIALECTS};

    #[test]
    pub fn test_default_dialects() {
        assert_eq!(DIALECTS.list(), vec!["pg".to_string(), "trino".to_string()]);
        assert_eq!(DIALECTS.get("PG").map(|d| d.name()), Some("pg"));
        assert!(DIALECTS.get("mysql").is_none());
    }

    #[test]
    pub fn test_empty_registry() {
        assert!(DialectRegistry::new().list().is_empty());
    }
}
