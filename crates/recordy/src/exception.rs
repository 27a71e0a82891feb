use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can fail while defining, building or using a record.
pub type RecordResult<T> = Result<T, RecordError>;

/// Error kinds raised by record definition and by generated operations.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `TypeError` -> "TypeError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    /// Wrong argument shapes, unorderable or unhashable values.
    TypeError,
    /// Subclass of TypeError - the post-init hook's parameter contract conflicts with the field table.
    ///
    /// Raised when a record type is built, never per construction.
    InitSignatureError,

    // --- AttributeError hierarchy ---
    AttributeError,
    /// Subclass of AttributeError - write or delete of a field on a frozen record.
    FrozenInstanceError,

    ValueError,
    /// Structural conversion nested deeper than the recursion limit.
    RecursionError,
}

impl ExcType {
    /// Checks if this error kind is a subclass of another error kind.
    ///
    /// - `TypeError` catches `InitSignatureError`
    /// - `AttributeError` catches `FrozenInstanceError`
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            Self::TypeError => matches!(self, Self::InitSignatureError),
            Self::AttributeError => matches!(self, Self::FrozenInstanceError),
            _ => false,
        }
    }

    /// Creates an AttributeError for a name that is neither a field, an instance extra
    /// nor a class attribute.
    #[must_use]
    pub(crate) fn attribute_error(type_name: impl Display, attr: &str) -> RecordError {
        RecordError::new_msg(
            Self::AttributeError,
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
    }

    /// Creates a FrozenInstanceError for assigning to a field of a frozen record.
    ///
    /// The message names both the field and the record type.
    #[must_use]
    pub(crate) fn frozen_instance_error(class_name: &str, attr_name: &str) -> RecordError {
        RecordError::new_msg(
            Self::FrozenInstanceError,
            format!("cannot assign to field '{attr_name}' of frozen record '{class_name}'"),
        )
    }

    /// Creates a FrozenInstanceError for deleting a field of a frozen record.
    #[must_use]
    pub(crate) fn frozen_instance_delete_error(class_name: &str, attr_name: &str) -> RecordError {
        RecordError::new_msg(
            Self::FrozenInstanceError,
            format!("cannot delete field '{attr_name}' of frozen record '{class_name}'"),
        )
    }

    /// Creates a TypeError for hashing a value whose type disables hashing.
    ///
    /// Format: `TypeError: unhashable type: 'list'`
    #[must_use]
    pub(crate) fn type_error_unhashable(type_name: &str) -> RecordError {
        RecordError::new_msg(Self::TypeError, format!("unhashable type: '{type_name}'"))
    }

    /// Creates a TypeError for an ordering comparison between incompatible values.
    #[must_use]
    pub(crate) fn type_error_unorderable(op: &str, lhs_type: &str, rhs_type: &str) -> RecordError {
        RecordError::new_msg(
            Self::TypeError,
            format!("'{op}' not supported between instances of '{lhs_type}' and '{rhs_type}'"),
        )
    }

    /// Creates a TypeError for missing required arguments, listing them by name.
    ///
    /// Format: `__init__() missing 2 required positional arguments: 'a' and 'b'`
    #[must_use]
    pub(crate) fn type_error_missing_positional_with_names(name: &str, missing_names: &[&str]) -> RecordError {
        let count = missing_names.len();
        let names = format_param_names(missing_names);
        if count == 1 {
            RecordError::new_msg(
                Self::TypeError,
                format!("{name}() missing 1 required positional argument: {names}"),
            )
        } else {
            RecordError::new_msg(
                Self::TypeError,
                format!("{name}() missing {count} required positional arguments: {names}"),
            )
        }
    }

    /// Creates a TypeError for too many positional arguments.
    ///
    /// Counts include `self`, matching what a caller reading the generated signature expects.
    #[must_use]
    pub(crate) fn type_error_too_many_positional(name: &str, max: usize, actual: usize) -> RecordError {
        let max = max + 1;
        let actual = actual + 1;
        let takes = if max == 1 {
            "1 positional argument".to_string()
        } else {
            format!("{max} positional arguments")
        };
        let given = if actual == 1 { "was" } else { "were" };
        RecordError::new_msg(
            Self::TypeError,
            format!("{name}() takes {takes} but {actual} {given} given"),
        )
    }

    /// Creates a TypeError for an argument supplied both positionally and by keyword.
    #[must_use]
    pub(crate) fn type_error_multiple_values(name: &str, key: &str) -> RecordError {
        RecordError::new_msg(
            Self::TypeError,
            format!("{name}() got multiple values for argument '{key}'"),
        )
    }

    /// Creates a TypeError for a keyword argument that no parameter accepts.
    #[must_use]
    pub(crate) fn type_error_unexpected_keyword(name: &str, key: &str) -> RecordError {
        RecordError::new_msg(
            Self::TypeError,
            format!("{name}() got an unexpected keyword argument '{key}'"),
        )
    }

    /// Creates a TypeError for a constructor that takes no arguments.
    #[must_use]
    pub(crate) fn type_error_no_args(name: &str, actual: usize) -> RecordError {
        RecordError::new_msg(
            Self::TypeError,
            format!("{name}() takes no arguments ({actual} given)"),
        )
    }

    /// Creates an InitSignatureError for a post-init parameter that shares a field's name.
    #[must_use]
    pub(crate) fn init_signature_field_collision(class_name: &str, param: &str) -> RecordError {
        RecordError::new_msg(
            Self::InitSignatureError,
            format!("post-init parameter '{param}' of '{class_name}' collides with a field of the same name"),
        )
    }

    /// Creates an InitSignatureError for a post-init parameter declared twice.
    #[must_use]
    pub(crate) fn init_signature_duplicate(class_name: &str, param: &str) -> RecordError {
        RecordError::new_msg(
            Self::InitSignatureError,
            format!("post-init parameter '{param}' of '{class_name}' is declared more than once"),
        )
    }

    /// Creates an InitSignatureError for post-init positional parameters that would compete
    /// with defaulted fields for the same positional arguments.
    #[must_use]
    pub(crate) fn init_signature_ambiguous(class_name: &str, param: &str, field: &str) -> RecordError {
        RecordError::new_msg(
            Self::InitSignatureError,
            format!(
                "post-init parameter '{param}' of '{class_name}' is ambiguous: a positional argument \
                 could bind to defaulted field '{field}' or to '{param}'; make it keyword-only"
            ),
        )
    }

    /// Creates a TypeError for an inconsistent base ordering.
    #[must_use]
    pub(crate) fn type_error_inconsistent_mro(base_names: &[&str]) -> RecordError {
        RecordError::new_msg(
            Self::TypeError,
            format!(
                "Cannot create a consistent method resolution order (MRO) for bases {}",
                base_names.join(", ")
            ),
        )
    }

    #[must_use]
    pub(crate) fn recursion_error(what: &str) -> RecordError {
        RecordError::new_msg(
            Self::RecursionError,
            format!("maximum recursion depth exceeded while {what}"),
        )
    }

    /// Creates a TypeError with a free-form message.
    #[must_use]
    pub(crate) fn type_error(msg: impl Display) -> RecordError {
        RecordError::new_msg(Self::TypeError, msg)
    }
}

/// Formats parameter names as `'a'`, `'a' and 'b'` or `'a', 'b', and 'c'`.
fn format_param_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [one] => format!("'{one}'"),
        [first, second] => format!("'{first}' and '{second}'"),
        [rest @ .., last] => {
            let head: Vec<String> = rest.iter().map(|n| format!("'{n}'")).collect();
            format!("{}, and '{last}'", head.join(", "))
        }
    }
}

/// An error raised while defining or using a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    exc_type: ExcType,
    arg: Option<String>,
}

impl RecordError {
    /// Creates an error of the given kind with a message.
    #[must_use]
    pub fn new_msg(exc_type: ExcType, arg: impl Display) -> Self {
        Self {
            exc_type,
            arg: Some(arg.to_string()),
        }
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.arg.as_deref()
    }

    /// Returns true if this error would be caught by a handler for `handler_type`.
    #[must_use]
    pub fn is(&self, handler_type: ExcType) -> bool {
        self.exc_type.is_subclass_of(handler_type)
    }
}

impl Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_str: &'static str = self.exc_type.into();
        match &self.arg {
            Some(arg) => write!(f, "{type_str}: {arg}"),
            None => f.write_str(type_str),
        }
    }
}

impl std::error::Error for RecordError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_error_is_attribute_error() {
        let err = ExcType::frozen_instance_error("Point", "x");
        assert!(err.is(ExcType::AttributeError));
        assert!(!err.is(ExcType::TypeError));
        assert_eq!(
            err.to_string(),
            "FrozenInstanceError: cannot assign to field 'x' of frozen record 'Point'"
        );
    }

    #[test]
    fn missing_names_formatting() {
        let err = ExcType::type_error_missing_positional_with_names("__init__", &["a", "b", "c"]);
        assert_eq!(
            err.message(),
            Some("__init__() missing 3 required positional arguments: 'a', 'b', and 'c'")
        );
        let err = ExcType::type_error_missing_positional_with_names("__init__", &["a"]);
        assert_eq!(err.message(), Some("__init__() missing 1 required positional argument: 'a'"));
    }

    #[test]
    fn exc_type_parses_from_name() {
        let parsed: ExcType = "InitSignatureError".parse().unwrap();
        assert_eq!(parsed, ExcType::InitSignatureError);
        assert!(parsed.is_subclass_of(ExcType::TypeError));
    }
}
