use crate::{
    compiler::SqlDialect,
    parser::{ParserError, Result, SqlOptions},
};

/// What a node needs while rendering SQL: the backend and the caller's
/// options.
#[derive(Clone, Copy)]
pub struct SqlWriter<'a> {
    pub dialect: &'a dyn SqlDialect,
    pub options: &'a SqlOptions,
}

impl<'a> SqlWriter<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, options: &'a SqlOptions) -> Self {
        Self { dialect, options }
    }

    /// Double-quoted identifier.
    pub fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Value of a tenancy context function.
    pub fn context_value(&self, name: &str) -> Result<String> {
        let value = match name {
            "whitelabel_id" => self.options.whitelabel_id,
            "customer_id" => self.options.customer_id,
            _ => None,
        };
        value
            .map(|id| id.to_string())
            .ok_or_else(|| ParserError::MissingContext(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{compiler::{PgDialect, SqlWriter}, parser::{ParserError, SqlOptions}};

    #[test]
    pub fn test_quote_ident() {
        let options = SqlOptions::new();
        let w = SqlWriter::new(&PgDialect, &options);
        assert_eq!(w.quote_ident("a"), "\"a\"");
        assert_eq!(w.quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    pub fn test_context_value() {
        let options = SqlOptions { whitelabel_id: Some(3), ..Default::default() };
        let w = SqlWriter::new(&PgDialect, &options);
        assert_eq!(w.context_value("whitelabel_id").unwrap(), "3");
        assert!(matches!(w.context_value("customer_id"), Err(ParserError::MissingContext(_))));
    }
}
