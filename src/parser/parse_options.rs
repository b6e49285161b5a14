use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Surface syntax of the query handed to `parse_query_to_tree`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// QL JSON expression (the default)
    #[default]
    Ql,
    /// SQL text (`SELECT ...` or a scalar expression)
    Sql,
}

/// Options consumed while building a tree.
///
/// - `query_type` selects how the input is read.
/// - `keep_shorts` retains short expressions as wrapper nodes instead of
///   expanding them away.
/// - `parameters` binds values to named parameters.
/// - `params_must_have_values` turns a missing binding into an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub keep_shorts: bool,
    pub parameters: Option<Map<String, Value>>,
    pub params_must_have_values: bool,
}

impl ParseOptions {
    /// Create default options (QL input, shorts expanded, no bindings).
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: options for QL input.
    pub fn ql() -> Self {
        Self { query_type: QueryType::Ql, ..Default::default() }
    }

    /// Convenience: options for SQL text input.
    pub fn sql() -> Self {
        Self { query_type: QueryType::Sql, ..Default::default() }
    }

    pub fn with_keep_shorts(mut self) -> Self { self.keep_shorts = true; self }
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self { self.parameters = Some(parameters); self }
    pub fn with_params_must_have_values(mut self) -> Self { self.params_must_have_values = true; self }

    /// Value bound to `name`, if any.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.as_ref().and_then(|params| params.get(name))
    }
}

/// Options for the QL and short serializers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QlOptions {
    /// Emit retained short expressions in their compact form.
    pub keep_shorts: bool,
    /// Emit parameter references instead of their bound values.
    pub keep_param_refs: bool,
}

impl QlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keep_shorts(mut self) -> Self { self.keep_shorts = true; self }
    pub fn with_keep_param_refs(mut self) -> Self { self.keep_param_refs = true; self }
}

/// Options for SQL generation.
///
/// The tenancy ids feed the `whitelabel_id()` and `customer_id()` context
/// functions. With `keep_param_refs` bound parameters are ignored and every
/// parameter renders as `NULL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SqlOptions {
    #[serde(rename = "whitelabelID")]
    pub whitelabel_id: Option<i64>,
    #[serde(rename = "customerID")]
    pub customer_id: Option<i64>,
    pub keep_param_refs: bool,
}

impl SqlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tenant(whitelabel_id: i64, customer_id: i64) -> Self {
        Self { whitelabel_id: Some(whitelabel_id), customer_id: Some(customer_id), keep_param_refs: false }
    }

    pub fn with_keep_param_refs(mut self) -> Self { self.keep_param_refs = true; self }
}
