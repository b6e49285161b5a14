use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::parser::{registry::{Arity, CastType}, ParserError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCategory {
    Aggregate,
    Scalar,
    Geo,
    /// Rendered from `SqlOptions` rather than called.
    Context,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub arity: Arity,
    /// Cast applied when the call carries none of its own.
    pub default_cast: Option<CastType>,
    pub category: FunctionCategory,
}

impl FunctionSpec {
    pub const fn new(name: &'static str, arity: Arity, category: FunctionCategory) -> Self {
        Self { name, arity, default_cast: None, category }
    }

    pub const fn with_default_cast(mut self, cast: CastType) -> Self {
        self.default_cast = Some(cast);
        self
    }

    pub fn is_aggregate(&self) -> bool {
        self.category == FunctionCategory::Aggregate
    }
}

/// Case-insensitive registry of callable functions.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    by_name: HashMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    pub fn new() -> Self { Self { by_name: HashMap::new() } }

    pub fn register(&mut self, spec: FunctionSpec) {
        self.by_name.insert(spec.name.to_ascii_lowercase(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.by_name.get(&name.to_ascii_lowercase())
    }

    pub fn lookup(&self, name: &str) -> Result<&FunctionSpec> {
        self.get(name).ok_or_else(|| ParserError::InvalidFunction(name.to_string()))
    }

    pub fn list(&self) -> Vec<String> {
        let mut v: Vec<_> = self.by_name.keys().cloned().collect();
        v.sort();
        v
    }

    pub fn default_function_registry() -> Self {
        use FunctionCategory::*;

        let mut registry = Self::new();

        registry.register(FunctionSpec::new("count", Arity::between(0, 1), Aggregate).with_default_cast(CastType::Integer));
        registry.register(FunctionSpec::new("sum", Arity::exact(1), Aggregate).with_default_cast(CastType::Real));
        registry.register(FunctionSpec::new("avg", Arity::exact(1), Aggregate).with_default_cast(CastType::Real));
        registry.register(FunctionSpec::new("min", Arity::exact(1), Aggregate));
        registry.register(FunctionSpec::new("max", Arity::exact(1), Aggregate));
        registry.register(FunctionSpec::new("array_agg", Arity::exact(1), Aggregate));
        registry.register(FunctionSpec::new("string_agg", Arity::exact(2), Aggregate));

        registry.register(FunctionSpec::new("abs", Arity::exact(1), Scalar));
        registry.register(FunctionSpec::new("round", Arity::between(1, 2), Scalar));
        registry.register(FunctionSpec::new("ceil", Arity::exact(1), Scalar));
        registry.register(FunctionSpec::new("floor", Arity::exact(1), Scalar));
        registry.register(FunctionSpec::new("coalesce", Arity::at_least(1), Scalar));
        registry.register(FunctionSpec::new("nullif", Arity::exact(2), Scalar));
        registry.register(FunctionSpec::new("greatest", Arity::at_least(1), Scalar));
        registry.register(FunctionSpec::new("least", Arity::at_least(1), Scalar));
        registry.register(FunctionSpec::new("lower", Arity::exact(1), Scalar));
        registry.register(FunctionSpec::new("upper", Arity::exact(1), Scalar));
        registry.register(FunctionSpec::new("length", Arity::exact(1), Scalar));
        registry.register(FunctionSpec::new("concat", Arity::at_least(1), Scalar));
        registry.register(FunctionSpec::new("substring", Arity::between(2, 3), Scalar));
        registry.register(FunctionSpec::new("date_trunc", Arity::exact(2), Scalar));
        registry.register(FunctionSpec::new("date_part", Arity::exact(2), Scalar));
        registry.register(FunctionSpec::new("now", Arity::exact(0), Scalar));
        registry.register(FunctionSpec::new("json_extract", Arity::at_least(2), Scalar));
        registry.register(FunctionSpec::new("array_length", Arity::exact(1), Scalar));

        registry.register(FunctionSpec::new("geo_intersects", Arity::exact(2), Geo));
        registry.register(FunctionSpec::new("geo_within", Arity::exact(2), Geo));
        registry.register(FunctionSpec::new("geo_distance", Arity::exact(2), Geo).with_default_cast(CastType::Real));
        registry.register(FunctionSpec::new("geo_area", Arity::exact(1), Geo).with_default_cast(CastType::Real));

        registry.register(FunctionSpec::new("whitelabel_id", Arity::exact(0), Context));
        registry.register(FunctionSpec::new("customer_id", Arity::exact(0), Context));

        registry
    }
}

/// Process-wide registry; read-only after first use.
pub static FUNCTIONS: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::default_function_registry);

#[cfg(test)]
mod tests {
    use crate::parser::{registry::{CastType, FunctionCategory, FUNCTIONS}, ParserError};

    #[test]
    pub fn test_lookup_is_case_insensitive() {
        let spec = FUNCTIONS.lookup("SUM").expect("Failed to find sum");
        assert_eq!(spec.name, "sum");
        assert_eq!(spec.default_cast, Some(CastType::Real));
        assert!(spec.is_aggregate());
    }

    #[test]
    pub fn test_unknown_function() {
        match FUNCTIONS.lookup("pg_sleep") {
            Err(ParserError::InvalidFunction(name)) => assert_eq!(name, "pg_sleep"),
            _ => panic!(),
        }
    }

    #[test]
    pub fn test_count_accepts_no_args() {
        let spec = FUNCTIONS.lookup("count").expect("Failed to find count");
        assert!(spec.arity.accepts(0));
        assert!(spec.arity.accepts(1));
        assert!(!spec.arity.accepts(2));
        assert_eq!(spec.default_cast, Some(CastType::Integer));
    }

    #[test]
    pub fn test_categories() {
        assert_eq!(FUNCTIONS.lookup("customer_id").unwrap().category, FunctionCategory::Context);
        assert_eq!(FUNCTIONS.lookup("geo_intersects").unwrap().category, FunctionCategory::Geo);
        assert!(FUNCTIONS.list().contains(&"json_extract".to_string()));
    }
}
