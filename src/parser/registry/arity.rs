use crate::parser::{ParserError, Result};

/// Accepted argument count for functions, operators and geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range { min: usize, max: Option<usize> },
}

impl Arity {
    pub const fn exact(n: usize) -> Self { Arity::Exact(n) }
    pub const fn between(min: usize, max: usize) -> Self { Arity::Range { min, max: Some(max) } }
    pub const fn at_least(min: usize) -> Self { Arity::Range { min, max: None } }

    pub fn accepts(&self, got: usize) -> bool {
        match *self {
            Arity::Exact(n) => got == n,
            Arity::Range { min, max } => got >= min && max.is_none_or(|max| got <= max),
        }
    }

    pub fn check(&self, name: &str, got: usize) -> Result<()> {
        if self.accepts(got) {
            return Ok(());
        }

        let expected = match *self {
            Arity::Exact(n) => format!("expected {}", n),
            Arity::Range { min, max: Some(max) } => format!("expected between {} and {}", min, max),
            Arity::Range { min, max: None } => format!("expected at least {}", min),
        };

        ParserError::ArgsLength { name: name.to_string(), message: format!("{}, got {}", expected, got) }.err()
    }
}
