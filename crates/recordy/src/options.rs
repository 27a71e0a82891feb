//! Per-type behaviour flags.
//!
//! A record type's options start from [`RecordOptions::default`], are replaced
//! by each direct base's resolved options in declaration order, and are then
//! patched by the flags given explicitly at definition time. Options are fixed
//! once the type is built; [`RecordType::redecorate`](crate::RecordType::redecorate)
//! builds a new type instead of changing an existing one.

use serde::{Deserialize, Serialize};

use crate::exception::{ExcType, RecordError, RecordResult};

/// Resolved options of a record type.
#[expect(clippy::struct_excessive_bools, reason = "one flag per generated operation")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordOptions {
    /// Generate the constructor.
    pub init: bool,
    /// Generate the textual representation.
    pub repr: bool,
    /// Generate structural equality.
    pub eq: bool,
    /// Generate ordering comparisons.
    pub order: bool,
    /// Force a generated hash. `None` leaves the decision to `eq` and `frozen`.
    pub unsafe_hash: Option<bool>,
    /// Reject field writes and deletes after construction.
    pub frozen: bool,
    /// Leave internal fields out of repr, eq, order, hash and iteration.
    pub hide_internals: bool,
    /// Make instances iterable over their field values.
    pub iter: bool,
    /// Absorb unrecognised keyword arguments at construction.
    pub kwargs: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            init: true,
            repr: true,
            eq: true,
            order: false,
            unsafe_hash: None,
            frozen: false,
            hide_internals: true,
            iter: false,
            kwargs: false,
        }
    }
}

/// How instances of a type hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashPolicy {
    /// Hash of the type combined with the hashed fields' values.
    Generated,
    /// Hashing raises a TypeError.
    Unhashable,
    /// Hash derived from the instance's identity.
    Identity,
}

impl RecordOptions {
    /// Applies the explicitly set flags of `patch`.
    pub fn apply(&mut self, patch: &OptionsPatch) {
        let OptionsPatch {
            init,
            repr,
            eq,
            order,
            unsafe_hash,
            frozen,
            hide_internals,
            iter,
            kwargs,
        } = *patch;
        if let Some(v) = init {
            self.init = v;
        }
        if let Some(v) = repr {
            self.repr = v;
        }
        if let Some(v) = eq {
            self.eq = v;
        }
        if let Some(v) = order {
            self.order = v;
        }
        if unsafe_hash.is_some() {
            self.unsafe_hash = unsafe_hash;
        }
        if let Some(v) = frozen {
            self.frozen = v;
        }
        if let Some(v) = hide_internals {
            self.hide_internals = v;
        }
        if let Some(v) = iter {
            self.iter = v;
        }
        if let Some(v) = kwargs {
            self.kwargs = v;
        }
    }

    /// Returns a copy with `patch` applied.
    #[must_use]
    pub fn patched(mut self, patch: &OptionsPatch) -> Self {
        self.apply(patch);
        self
    }

    /// Decides how instances hash.
    ///
    /// An explicit `unsafe_hash = true` always generates. Left unset, a frozen
    /// type with equality hashes by value and a mutable one with equality is
    /// unhashable. A type without generated equality hashes by identity.
    #[must_use]
    pub fn hash_policy(&self) -> HashPolicy {
        match (self.unsafe_hash, self.eq, self.frozen) {
            (Some(true), _, _) | (None, true, true) => HashPolicy::Generated,
            (_, true, _) => HashPolicy::Unhashable,
            (_, false, _) => HashPolicy::Identity,
        }
    }

    /// True when `<=`, `>` and `>=` are derived from `<` and `==`.
    #[must_use]
    pub fn total_ordering(&self) -> bool {
        self.order && self.eq
    }
}

/// Options given explicitly at definition time; unset flags are inherited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsPatch {
    pub init: Option<bool>,
    pub repr: Option<bool>,
    pub eq: Option<bool>,
    pub order: Option<bool>,
    pub unsafe_hash: Option<bool>,
    pub frozen: Option<bool>,
    pub hide_internals: Option<bool>,
    pub iter: Option<bool>,
    pub kwargs: Option<bool>,
}

impl OptionsPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a patch from JSON such as `{"frozen": true, "order": true}`.
    pub fn from_json(text: &str) -> RecordResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| RecordError::new_msg(ExcType::ValueError, format!("invalid record options: {err}")))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn init(mut self, value: bool) -> Self {
        self.init = Some(value);
        self
    }

    #[must_use]
    pub fn repr(mut self, value: bool) -> Self {
        self.repr = Some(value);
        self
    }

    #[must_use]
    pub fn eq(mut self, value: bool) -> Self {
        self.eq = Some(value);
        self
    }

    #[must_use]
    pub fn order(mut self, value: bool) -> Self {
        self.order = Some(value);
        self
    }

    #[must_use]
    pub fn unsafe_hash(mut self, value: bool) -> Self {
        self.unsafe_hash = Some(value);
        self
    }

    #[must_use]
    pub fn frozen(mut self, value: bool) -> Self {
        self.frozen = Some(value);
        self
    }

    #[must_use]
    pub fn hide_internals(mut self, value: bool) -> Self {
        self.hide_internals = Some(value);
        self
    }

    #[must_use]
    #[expect(clippy::iter_not_returning_iterator, reason = "builder setter named after the option")]
    pub fn iter(mut self, value: bool) -> Self {
        self.iter = Some(value);
        self
    }

    #[must_use]
    pub fn kwargs(mut self, value: bool) -> Self {
        self.kwargs = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_policy_matrix() {
        let base = RecordOptions::default();
        assert_eq!(base.hash_policy(), HashPolicy::Unhashable);

        let frozen = base.patched(&OptionsPatch::new().frozen(true));
        assert_eq!(frozen.hash_policy(), HashPolicy::Generated);

        let forced = base.patched(&OptionsPatch::new().unsafe_hash(true));
        assert_eq!(forced.hash_policy(), HashPolicy::Generated);

        let no_eq = base.patched(&OptionsPatch::new().eq(false));
        assert_eq!(no_eq.hash_policy(), HashPolicy::Identity);

        let declined = frozen.patched(&OptionsPatch::new().unsafe_hash(false));
        assert_eq!(declined.hash_policy(), HashPolicy::Unhashable);
    }

    #[test]
    fn patch_only_touches_set_flags() {
        let opts = RecordOptions::default().patched(&OptionsPatch::new().order(true));
        assert!(opts.order);
        assert!(opts.eq);
        assert!(opts.total_ordering());
    }

    #[test]
    fn patch_from_json() {
        let patch = OptionsPatch::from_json(r#"{"frozen": true, "iter": true}"#).unwrap();
        assert_eq!(patch, OptionsPatch::new().frozen(true).iter(true));

        let err = OptionsPatch::from_json(r#"{"slots": true}"#).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::ValueError);
    }
}
