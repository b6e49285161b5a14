use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParserError>;

/// Every failure raised while building or serializing a query tree.
///
/// The compiler performs no I/O, so all of these are deterministic for a given
/// input. Callers are expected to surface them as client errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParserError {
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid function: {0}")]
    InvalidFunction(String),

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid geometry type: {0}")]
    InvalidGeometry(String),

    #[error("Invalid cast type: {0}")]
    InvalidCast(String),

    #[error("Invalid short expression: {0}")]
    InvalidShort(String),

    #[error("Short expression syntax error at {offset}: {message}")]
    ShortSyntax { message: String, offset: usize },

    #[error("Invalid number of arguments for {name}: {message}")]
    ArgsLength { name: String, message: String },

    #[error("Illegal aliasing: {0}")]
    IllegalAliasing(String),

    #[error("Illegal casting: {0}")]
    IllegalCasting(String),

    #[error("Identifier already in use: {0}")]
    IdentifierInUse(String),

    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("Ambiguous column, a view is required: {0}")]
    AmbiguousColumn(String),

    #[error("Missing value for parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Expression has no short representation: {0}")]
    NotShortable(String),

    #[error("No parser registered for {node} on engine '{engine}'")]
    UnregisteredParser { node: String, engine: String },

    #[error("Syntax not supported: {message}")]
    SyntaxNotSupported { message: String, offset: Option<usize> },

    #[error("Invalid SQL: {message}")]
    InvalidSql { message: String, offset: Option<usize> },

    #[error("Missing context value: {0}")]
    MissingContext(String),
}

impl ParserError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ParserError::InvalidExpression(message.into())
    }

    pub fn not_supported(message: impl Into<String>, offset: Option<usize>) -> Self {
        ParserError::SyntaxNotSupported { message: message.into(), offset }
    }

    pub fn err<T>(self) -> Result<T> {
        Err(self)
    }

    /// Best-effort character offset into the source text, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParserError::ShortSyntax { offset, .. } => Some(*offset),
            ParserError::SyntaxNotSupported { offset, .. } | ParserError::InvalidSql { offset, .. } => *offset,
            _ => None,
        }
    }

    /// Shifts a known offset, or fills a missing one, so that errors raised on a
    /// fragment point back into the enclosing source.
    pub fn with_base_offset(self, base: usize) -> Self {
        match self {
            ParserError::ShortSyntax { message, offset } => ParserError::ShortSyntax { message, offset: base + offset },
            ParserError::SyntaxNotSupported { message, offset } => ParserError::SyntaxNotSupported {
                message,
                offset: Some(base + offset.unwrap_or(0)),
            },
            ParserError::InvalidSql { message, offset } => ParserError::InvalidSql {
                message,
                offset: Some(base + offset.unwrap_or(0)),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ParserError;

    #[test]
    pub fn test_offset_only_on_located_errors() {
        assert_eq!(ParserError::invalid("x").offset(), None);
        assert_eq!(ParserError::not_supported("DISTINCT ON", Some(7)).offset(), Some(7));
        assert_eq!(ParserError::ShortSyntax { message: "x".into(), offset: 3 }.offset(), Some(3));
    }

    #[test]
    pub fn test_with_base_offset() {
        let err = ParserError::ShortSyntax { message: "bad".into(), offset: 2 }.with_base_offset(10);
        assert_eq!(err.offset(), Some(12));

        let err = ParserError::not_supported("x", None).with_base_offset(4);
        assert_eq!(err.offset(), Some(4));

        let err = ParserError::invalid("x").with_base_offset(4);
        assert_eq!(err.offset(), None);
    }

    #[test]
    pub fn test_display() {
        let err = ParserError::UnregisteredParser { node: "select".into(), engine: "mysql".into() };
        assert_eq!(err.to_string(), "No parser registered for select on engine 'mysql'");
    }
}
