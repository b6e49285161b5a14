use indexmap::{IndexMap, IndexSet};

use crate::parser::{ParserError, Result};

/// What a visible ref name points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    View(String),
    Cte(String),
    Subquery,
}

/// A column reference resolved against the enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedColumn {
    /// Name the column is qualified with in SQL.
    pub qualifier: Option<String>,
    /// Real view the column is read from, when it is one.
    pub origin: Option<String>,
}

/// Lexical scope threaded through tree construction.
///
/// Values are never mutated in place: every registration returns a new scope,
/// so a nested SELECT cannot leak names back into its parent.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// visible name -> target, for the nearest enclosing SELECT
    refs: IndexMap<String, RefTarget>,
    /// CTE names inherited from every enclosing SELECT
    ctes: IndexSet<String>,
    /// CTE names declared by this SELECT's own WITH
    local_ctes: IndexSet<String>,
    in_select: bool,
}

impl Scope {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn in_select(&self) -> bool {
        self.in_select
    }

    pub fn has_ref(&self, name: &str) -> bool {
        self.refs.contains_key(name)
    }

    pub fn is_cte(&self, name: &str) -> bool {
        self.ctes.contains(name)
    }

    /// Scope for a nested SELECT: fresh refs (kept for lateral subqueries),
    /// inherited CTEs.
    pub fn child_select(&self, lateral: bool) -> Scope {
        Scope {
            refs: if lateral { self.refs.clone() } else { IndexMap::new() },
            ctes: self.ctes.clone(),
            local_ctes: IndexSet::new(),
            in_select: true,
        }
    }

    pub fn with_ref(&self, name: &str, target: RefTarget) -> Result<Scope> {
        if self.refs.contains_key(name) {
            return ParserError::IdentifierInUse(name.to_string()).err();
        }

        let mut scope = self.clone();
        scope.refs.insert(name.to_string(), target);
        Ok(scope)
    }

    /// Declares a CTE. Shadowing an inherited CTE is allowed, declaring the
    /// same name twice in one WITH is not.
    pub fn with_cte(&self, name: &str) -> Result<Scope> {
        if self.local_ctes.contains(name) || self.refs.contains_key(name) {
            return ParserError::IdentifierInUse(name.to_string()).err();
        }

        let mut scope = self.clone();
        scope.ctes.insert(name.to_string());
        scope.local_ctes.insert(name.to_string());
        Ok(scope)
    }

    pub fn resolve_column(&self, view: Option<&str>, column: &str) -> Result<ResolvedColumn> {
        if !self.in_select {
            return Ok(ResolvedColumn {
                qualifier: view.map(str::to_string),
                origin: view.filter(|v| !self.is_cte(v)).map(str::to_string),
            });
        }

        let (name, target) = match view {
            Some(view) => match self.refs.get_key_value(view) {
                Some(found) => found,
                None => return ParserError::UnknownView(view.to_string()).err(),
            },
            None => match self.refs.len() {
                1 => match self.refs.first() {
                    Some(found) => found,
                    None => return ParserError::UnknownView(format!("no view in scope for column '{}'", column)).err(),
                },
                0 => return ParserError::UnknownView(format!("no view in scope for column '{}'", column)).err(),
                _ => {
                    let candidates = self.refs.keys().cloned().collect::<Vec<_>>().join(", ");
                    return ParserError::AmbiguousColumn(format!("'{}' could belong to any of {}", column, candidates)).err();
                },
            },
        };

        Ok(ResolvedColumn {
            qualifier: Some(name.clone()),
            origin: match target {
                RefTarget::View(view) => Some(view.clone()),
                RefTarget::Cte(_) | RefTarget::Subquery => None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{scope::{RefTarget, Scope}, ParserError};

    #[test]
    pub fn test_outside_select_is_open() {
        let scope = Scope::root();
        let resolved = scope.resolve_column(Some("v"), "a").expect("Failed to resolve");
        assert_eq!(resolved.qualifier.as_deref(), Some("v"));
        assert_eq!(resolved.origin.as_deref(), Some("v"));

        let resolved = scope.resolve_column(None, "a").expect("Failed to resolve");
        assert_eq!(resolved.qualifier, None);
    }

    #[test]
    pub fn test_single_ref_allows_omitted_view() {
        let scope = Scope::root().child_select(false)
            .with_ref("x", RefTarget::View("v".into()))
            .expect("Failed to register");

        let resolved = scope.resolve_column(None, "a").expect("Failed to resolve");
        assert_eq!(resolved.qualifier.as_deref(), Some("x"));
        assert_eq!(resolved.origin.as_deref(), Some("v"));
    }

    #[test]
    pub fn test_multiple_refs_require_view() {
        let scope = Scope::root().child_select(false)
            .with_ref("a", RefTarget::View("a".into())).unwrap()
            .with_ref("b", RefTarget::Subquery).unwrap();

        assert!(matches!(scope.resolve_column(None, "c"), Err(ParserError::AmbiguousColumn(_))));
        assert!(matches!(scope.resolve_column(Some("z"), "c"), Err(ParserError::UnknownView(_))));
        assert_eq!(scope.resolve_column(Some("b"), "c").unwrap().origin, None);
    }

    #[test]
    pub fn test_ref_collision() {
        let scope = Scope::root().child_select(false).with_ref("v", RefTarget::View("v".into())).unwrap();
        assert!(matches!(scope.with_ref("v", RefTarget::Subquery), Err(ParserError::IdentifierInUse(_))));
    }

    #[test]
    pub fn test_cte_rules() {
        let outer = Scope::root().child_select(false).with_cte("c").unwrap();
        assert!(matches!(outer.with_cte("c"), Err(ParserError::IdentifierInUse(_))));

        let inner = outer.child_select(false);
        assert!(inner.is_cte("c"));
        assert!(inner.with_cte("c").is_ok());
    }

    #[test]
    pub fn test_lateral_inherits_refs() {
        let outer = Scope::root().child_select(false).with_ref("v", RefTarget::View("v".into())).unwrap();
        assert!(outer.child_select(true).has_ref("v"));
        assert!(!outer.child_select(false).has_ref("v"));
    }
}
