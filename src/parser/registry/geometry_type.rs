use std::fmt;

use crate::parser::{registry::{Arity, CastType}, ParserError, Result};

/// Geometry constructors known to the compiler.
///
/// `Point` and `Wkt` build shapes from literal coordinates or text; every other
/// variant is a place type whose shape is looked up by id in the place table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    Wkt,
    CaFsa,
    CaPostalcode,
    CaDa,
    CaCt,
    CaCsd,
    CaCd,
    CaPr,
    Poi,
    Ggid,
}

impl GeometryType {
    pub const ALL: [GeometryType; 11] = [
        GeometryType::Point, GeometryType::Wkt, GeometryType::CaFsa, GeometryType::CaPostalcode,
        GeometryType::CaDa, GeometryType::CaCt, GeometryType::CaCsd, GeometryType::CaCd,
        GeometryType::CaPr, GeometryType::Poi, GeometryType::Ggid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "point",
            GeometryType::Wkt => "wkt",
            GeometryType::CaFsa => "ca-fsa",
            GeometryType::CaPostalcode => "ca-postalcode",
            GeometryType::CaDa => "ca-da",
            GeometryType::CaCt => "ca-ct",
            GeometryType::CaCsd => "ca-csd",
            GeometryType::CaCd => "ca-cd",
            GeometryType::CaPr => "ca-pr",
            GeometryType::Poi => "poi",
            GeometryType::Ggid => "ggid",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            GeometryType::Point => Arity::exact(2),
            _ => Arity::exact(1),
        }
    }

    pub fn is_place(&self) -> bool {
        !matches!(self, GeometryType::Point | GeometryType::Wkt)
    }

    /// Cast applied when the node carries none. Constructors already yield
    /// the backend geometry type, so no variant sets one.
    pub fn default_cast(&self) -> Option<CastType> {
        None
    }

    pub fn parse(name: &str) -> Result<GeometryType> {
        let lname = name.trim().to_ascii_lowercase();
        Self::ALL.iter()
            .find(|ty| ty.as_str() == lname)
            .copied()
            .ok_or_else(|| ParserError::InvalidGeometry(name.to_string()))
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::registry::GeometryType;

    #[test]
    pub fn test_parse() {
        assert_eq!(GeometryType::parse("CA-FSA").unwrap(), GeometryType::CaFsa);
        assert_eq!(GeometryType::parse("point").unwrap(), GeometryType::Point);
        assert!(GeometryType::parse("us-zip").is_err());
    }

    #[test]
    pub fn test_arity_and_kind() {
        assert!(GeometryType::Point.arity().accepts(2));
        assert!(!GeometryType::CaDa.arity().accepts(2));
        assert!(GeometryType::CaDa.is_place());
        assert!(!GeometryType::Wkt.is_place());
    }

    #[test]
    pub fn test_no_default_cast() {
        assert!(GeometryType::ALL.iter().all(|ty| ty.default_cast().is_none()));
    }
}
