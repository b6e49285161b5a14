use std::{collections::HashMap, fmt};

use once_cell::sync::Lazy;

use crate::parser::{registry::Arity, ParserError, Result};

/// How an operator lays out its operands in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorShape {
    /// `(a op b)`, or `(op a)` when a single operand is allowed
    Infix,
    /// `(op a)`
    Prefix,
    /// `(a BETWEEN b AND c)`
    Between,
    /// `(a AND b AND c)`
    Logical,
}

/// `ANY` / `ALL` qualifier on a comparison against an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Any,
    All,
}

impl Qualifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Any => "any",
            Qualifier::All => "all",
        }
    }

    pub fn parse(name: &str) -> Result<Qualifier> {
        match name.to_ascii_lowercase().as_str() {
            "any" | "some" => Ok(Qualifier::Any),
            "all" => Ok(Qualifier::All),
            _ => ParserError::InvalidOperator(format!("unknown qualifier '{}'", name)).err(),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    /// Canonical QL name
    pub name: &'static str,
    /// SQL token
    pub sql: &'static str,
    pub arity: Arity,
    pub shape: OperatorShape,
    pub allows_qualifier: bool,
}

impl OperatorSpec {
    const fn infix(name: &'static str, sql: &'static str) -> Self {
        Self { name, sql, arity: Arity::exact(2), shape: OperatorShape::Infix, allows_qualifier: false }
    }

    const fn comparison(name: &'static str) -> Self {
        Self { name, sql: name, arity: Arity::exact(2), shape: OperatorShape::Infix, allows_qualifier: true }
    }

    pub fn is_logical(&self) -> bool {
        self.shape == OperatorShape::Logical
    }

    /// Looks an operator up by canonical name or alias, case-insensitively.
    pub fn lookup(name: &str) -> Result<&'static OperatorSpec> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
        let canonical = match normalized.as_str() {
            "<>" => "!=",
            "==" => "=",
            other => other,
        };

        OPERATORS.get(canonical)
            .copied()
            .ok_or_else(|| ParserError::InvalidOperator(name.to_string()))
    }
}

static OPERATOR_TABLE: [OperatorSpec; 33] = [
    OperatorSpec::comparison("="),
    OperatorSpec::comparison("!="),
    OperatorSpec::comparison("<"),
    OperatorSpec::comparison("<="),
    OperatorSpec::comparison(">"),
    OperatorSpec::comparison(">="),
    OperatorSpec::infix("+", "+"),
    OperatorSpec { name: "-", sql: "-", arity: Arity::between(1, 2), shape: OperatorShape::Infix, allows_qualifier: false },
    OperatorSpec::infix("*", "*"),
    OperatorSpec::infix("/", "/"),
    OperatorSpec::infix("%", "%"),
    OperatorSpec::infix("||", "||"),
    OperatorSpec { name: "like", sql: "LIKE", arity: Arity::exact(2), shape: OperatorShape::Infix, allows_qualifier: true },
    OperatorSpec::infix("not like", "NOT LIKE"),
    OperatorSpec { name: "ilike", sql: "ILIKE", arity: Arity::exact(2), shape: OperatorShape::Infix, allows_qualifier: true },
    OperatorSpec::infix("not ilike", "NOT ILIKE"),
    OperatorSpec::infix("~", "~"),
    OperatorSpec::infix("~*", "~*"),
    OperatorSpec::infix("!~", "!~"),
    OperatorSpec::infix("&&", "&&"),
    OperatorSpec::infix("@>", "@>"),
    OperatorSpec::infix("<@", "<@"),
    OperatorSpec::infix("in", "IN"),
    OperatorSpec::infix("not in", "NOT IN"),
    OperatorSpec::infix("is", "IS"),
    OperatorSpec::infix("is not", "IS NOT"),
    OperatorSpec { name: "between", sql: "BETWEEN", arity: Arity::exact(3), shape: OperatorShape::Between, allows_qualifier: false },
    OperatorSpec { name: "not between", sql: "NOT BETWEEN", arity: Arity::exact(3), shape: OperatorShape::Between, allows_qualifier: false },
    OperatorSpec { name: "and", sql: "AND", arity: Arity::at_least(1), shape: OperatorShape::Logical, allows_qualifier: false },
    OperatorSpec { name: "or", sql: "OR", arity: Arity::at_least(1), shape: OperatorShape::Logical, allows_qualifier: false },
    OperatorSpec { name: "not", sql: "NOT", arity: Arity::exact(1), shape: OperatorShape::Prefix, allows_qualifier: false },
    OperatorSpec { name: "exists", sql: "EXISTS", arity: Arity::exact(1), shape: OperatorShape::Prefix, allows_qualifier: false },
    OperatorSpec { name: "not exists", sql: "NOT EXISTS", arity: Arity::exact(1), shape: OperatorShape::Prefix, allows_qualifier: false },
];

static OPERATORS: Lazy<HashMap<&'static str, &'static OperatorSpec>> = Lazy::new(|| {
    OPERATOR_TABLE.iter().map(|spec| (spec.name, spec)).collect()
});
