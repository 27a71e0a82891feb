//! Field descriptors and the ordered field table.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{hint::TypeHint, value::Value};

/// Positions into a [`FieldTable`], e.g. the fields a generated operation reads.
pub type FieldIndices = SmallVec<[usize; 8]>;

/// Prefix that marks a field as internal by name.
pub const INTERNAL_PREFIX: char = '_';

/// A zero-argument producer of fresh default values.
#[derive(Clone)]
pub struct Factory(Rc<dyn Fn() -> Value>);

impl Factory {
    pub fn new(produce: impl Fn() -> Value + 'static) -> Self {
        Self(Rc::new(produce))
    }

    #[must_use]
    pub fn produce(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<factory>")
    }
}

impl PartialEq for Factory {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

/// A field's default and how a construction obtains it.
///
/// The policy is decided when the field is declared, never per construction.
/// Only defaults are subject to it: an argument passed to the constructor is
/// stored as given.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// Every construction receives this value itself.
    Value(Value),
    /// Every construction receives a fresh shallow copy of this value.
    Copy(Value),
    /// Every construction receives whatever the factory produces.
    Factory(Factory),
}

impl FieldDefault {
    /// Picks the policy from the value: mutable containers are copied per
    /// construction, everything else is shared.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.has_copy() {
            Self::Copy(value)
        } else {
            Self::Value(value)
        }
    }

    /// Shares `value` between all constructions, even a mutable container.
    #[must_use]
    pub fn shared(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn factory(produce: impl Fn() -> Value + 'static) -> Self {
        Self::Factory(Factory::new(produce))
    }

    /// Produces the value one construction stores.
    #[must_use]
    pub fn materialize(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Copy(value) => value.shallow_copy(),
            Self::Factory(factory) => factory.produce(),
        }
    }

    /// The declared value, if the default is not a factory.
    #[must_use]
    pub fn declared(&self) -> Option<&Value> {
        match self {
            Self::Value(value) | Self::Copy(value) => Some(value),
            Self::Factory(_) => None,
        }
    }
}

impl From<Value> for FieldDefault {
    fn from(value: Value) -> Self {
        Self::value(value)
    }
}

impl From<Factory> for FieldDefault {
    fn from(factory: Factory) -> Self {
        Self::Factory(factory)
    }
}

impl fmt::Display for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) | Self::Copy(value) => f.write_str(&value.py_repr()),
            Self::Factory(_) => f.write_str("<factory>"),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    hint: TypeHint,
    default: Option<FieldDefault>,
    internal: bool,
}

impl Field {
    /// Declares a required field.
    ///
    /// The field is internal when its name starts with an underscore or its
    /// annotation carries the internal marker.
    pub fn new(name: impl Into<String>, hint: impl Into<TypeHint>) -> Self {
        let name = name.into();
        let hint = hint.into();
        let internal = name.starts_with(INTERNAL_PREFIX) || hint.is_internal();
        Self {
            name,
            hint,
            default: None,
            internal,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<FieldDefault>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_factory(self, produce: impl Fn() -> Value + 'static) -> Self {
        self.with_default(FieldDefault::factory(produce))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn hint(&self) -> &TypeHint {
        &self.hint
    }

    #[must_use]
    pub fn default(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    #[must_use]
    pub fn is_hashed(&self) -> bool {
        self.hint.is_hashed()
    }
}

/// The resolved, ordered fields of a record type.
///
/// Every field without a default precedes every field with one. Names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTable {
    fields: IndexMap<String, Field>,
}

impl FieldTable {
    pub(crate) fn from_ordered(fields: IndexMap<String, Field>) -> Self {
        debug_assert!(
            fields.values().skip_while(|f| !f.has_default()).all(Field::has_default),
            "required fields must precede defaulted fields"
        );
        Self { fields }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Field> {
        self.fields.values()
    }

    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&Field> {
        self.fields.get_index(index).map(|(_, field)| field)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of leading fields without a default.
    #[must_use]
    pub fn required_count(&self) -> usize {
        self.fields.values().take_while(|f| !f.has_default()).count()
    }

    /// First field that has a default, if any.
    #[must_use]
    pub fn first_defaulted(&self) -> Option<&Field> {
        self.fields.values().find(|f| f.has_default())
    }

    /// Positions of the fields shown in repr and compared by eq, order and iteration.
    #[must_use]
    pub fn visible_indices(&self, hide_internals: bool) -> FieldIndices {
        self.fields
            .values()
            .enumerate()
            .filter(|(_, f)| !(hide_internals && f.is_internal()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Positions of the visible fields whose annotation carries the hashed marker.
    #[must_use]
    pub fn hashed_indices(&self, hide_internals: bool) -> FieldIndices {
        self.fields
            .values()
            .enumerate()
            .filter(|(_, f)| f.is_hashed() && !(hide_internals && f.is_internal()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Renders the generated constructor's parameter list,
    /// e.g. `(name: str, age: int = 3)`.
    #[must_use]
    pub fn signature(&self, extra: &[String]) -> String {
        let mut parts: Vec<String> = self
            .fields
            .values()
            .map(|f| match f.default() {
                Some(default) => format!("{}: {} = {default}", f.name(), f.hint()),
                None => format!("{}: {}", f.name(), f.hint()),
            })
            .collect();
        parts.extend(extra.iter().cloned());
        format!("({})", parts.join(", "))
    }
}

impl<'a> IntoIterator for &'a FieldTable {
    type Item = &'a Field;
    type IntoIter = indexmap::map::Values<'a, String, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_by_name_or_marker() {
        assert!(Field::new("_cache", "dict").is_internal());
        assert!(Field::new("cache", TypeHint::internal("dict")).is_internal());
        assert!(Field::new("cache", "Internal[dict]").is_internal());
        assert!(!Field::new("cache", "dict").is_internal());
    }

    #[test]
    fn mutable_defaults_are_copied_per_construction() {
        let default = FieldDefault::value(Value::empty_list());
        assert!(matches!(default, FieldDefault::Copy(_)));
        let a = default.materialize();
        let b = default.materialize();
        assert!(!a.is(&b));

        let shared = FieldDefault::shared(Value::empty_list());
        assert!(shared.materialize().is(&shared.materialize()));
    }

    #[test]
    fn factory_produces_fresh_values() {
        let default = FieldDefault::factory(Value::empty_dict);
        assert!(!default.materialize().is(&default.materialize()));
        assert_eq!(default.to_string(), "<factory>");
        assert_eq!(default.declared(), None);
    }
}
