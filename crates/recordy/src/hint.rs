//! Field annotations.
//!
//! Annotations are informational: nothing validates field values against
//! them. Two wrappers carry meaning for the engine:
//! - `Internal[T]` marks a field internal regardless of its name
//! - `Hashed[T]` includes a field's value in the generated hash
//!
//! Annotations written as text (`"Internal[Dict[str, int]]"`) are parsed into
//! the same structure, so forward references and dynamic definitions behave
//! like structured hints.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

/// Name of the marker wrapper for internal fields.
pub const INTERNAL_MARKER: &str = "Internal";
/// Name of the marker wrapper for hashed fields.
pub const HASHED_MARKER: &str = "Hashed";

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeHint {
    /// A plain type name, e.g. `int` or a forward reference `'Pet'`.
    Named(String),
    /// A parameterised type, e.g. `Dict[str, int]`.
    Generic { origin: String, args: Vec<TypeHint> },
    /// `Internal[T]`.
    Internal(Box<TypeHint>),
    /// `Hashed[T]`.
    Hashed(Box<TypeHint>),
}

impl TypeHint {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn generic(origin: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Generic {
            origin: origin.into(),
            args,
        }
    }

    /// Wraps `inner` in the internal marker.
    #[must_use]
    pub fn internal(inner: impl Into<Self>) -> Self {
        Self::Internal(Box::new(inner.into()))
    }

    /// Wraps `inner` in the hashed marker.
    #[must_use]
    pub fn hashed(inner: impl Into<Self>) -> Self {
        Self::Hashed(Box::new(inner.into()))
    }

    /// Parses annotation text.
    ///
    /// Text that does not form a balanced bracket expression is kept verbatim
    /// as a [`TypeHint::Named`] forward reference.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parser = HintParser { src: text, pos: 0 };
        match parser.parse_hint() {
            Some(hint) if parser.at_end() => hint,
            _ => Self::Named(text.trim().to_owned()),
        }
    }

    /// Returns true if this annotation marks its field as internal.
    ///
    /// The markers compose: `Hashed[Internal[int]]` is internal as well as hashed.
    /// An unparseable text annotation mentioning the marker also counts.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Hashed(inner) => inner.is_internal(),
            Self::Named(text) => text.contains(INTERNAL_MARKER),
            Self::Generic { .. } => false,
        }
    }

    /// Returns true if this annotation includes its field in the generated hash.
    #[must_use]
    pub fn is_hashed(&self) -> bool {
        match self {
            Self::Hashed(_) => true,
            Self::Internal(inner) => inner.is_hashed(),
            Self::Named(_) | Self::Generic { .. } => false,
        }
    }

    /// Returns the annotation with both markers stripped.
    #[must_use]
    pub fn unwrapped(&self) -> &Self {
        match self {
            Self::Internal(inner) | Self::Hashed(inner) => inner.unwrapped(),
            other => other,
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Generic { origin, args } => {
                f.write_str(origin)?;
                f.write_char('[')?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_char(']')
            }
            Self::Internal(inner) => write!(f, "{INTERNAL_MARKER}[{inner}]"),
            Self::Hashed(inner) => write!(f, "{HASHED_MARKER}[{inner}]"),
        }
    }
}

impl From<&str> for TypeHint {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for TypeHint {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

/// Recursive-descent parser over `name ('[' hint (',' hint)* ']')?`.
struct HintParser<'a> {
    src: &'a str,
    pos: usize,
}

impl HintParser<'_> {
    fn parse_hint(&mut self) -> Option<TypeHint> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '[' | ']' | ',') {
                break;
            }
            self.pos += c.len_utf8();
        }
        let name = self.src[start..self.pos].trim();
        if name.is_empty() {
            return None;
        }
        self.skip_ws();
        if self.peek() != Some('[') {
            return Some(TypeHint::Named(name.to_owned()));
        }
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            args.push(self.parse_hint()?);
            self.skip_ws();
            match self.peek()? {
                ',' => self.pos += 1,
                ']' => {
                    self.pos += 1;
                    break;
                }
                _ => return None,
            }
        }

        Some(match (name, args.len()) {
            (INTERNAL_MARKER, 1) => TypeHint::Internal(Box::new(args.remove(0))),
            (HASHED_MARKER, 1) => TypeHint::Hashed(Box::new(args.remove(0))),
            _ => TypeHint::Generic {
                origin: name.to_owned(),
                args,
            },
        })
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos == self.src.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_generics() {
        let hint = TypeHint::parse("Dict[str, List[int]]");
        assert_eq!(
            hint,
            TypeHint::generic(
                "Dict",
                vec![
                    TypeHint::named("str"),
                    TypeHint::generic("List", vec![TypeHint::named("int")])
                ]
            )
        );
        assert_eq!(hint.to_string(), "Dict[str, List[int]]");
    }

    #[test]
    fn markers_are_recognised() {
        let hint = TypeHint::parse("Internal[Dict]");
        assert!(hint.is_internal());
        assert!(!hint.is_hashed());

        let hint = TypeHint::parse("Hashed[Internal[int]]");
        assert!(hint.is_internal());
        assert!(hint.is_hashed());
        assert_eq!(hint.unwrapped(), &TypeHint::named("int"));
    }

    #[test]
    fn unbalanced_text_is_a_forward_reference() {
        let hint = TypeHint::parse("Internal[Dict");
        assert_eq!(hint, TypeHint::named("Internal[Dict"));
        // text mentioning the marker still marks the field internal
        assert!(hint.is_internal());
    }

    #[test]
    fn plain_names_are_not_marked() {
        let hint = TypeHint::from("int");
        assert!(!hint.is_internal());
        assert!(!hint.is_hashed());
    }
}
