//! Record instances.
//!
//! A record stores one slot per field of its type's table plus a map of
//! extra attributes. Every operation dispatches through the type's
//! [`Methods`](crate::synth::Methods), so user-defined and generated behaviour
//! are reached the same way.

use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    fmt,
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{
    class::RecordType,
    exception::{ExcType, RecordResult},
    py_hash::hash_int,
    synth::CmpFn,
    value::{CycleGuard, ReprGuard, Value},
};

/// An instance of a record type. Cloning shares the instance.
#[derive(Clone)]
pub struct Record(Rc<RecordInner>);

struct RecordInner {
    ty: RecordType,
    /// One slot per field; `None` is unset.
    slots: RefCell<Vec<Option<Value>>>,
    /// Attributes that are not fields.
    extras: RefCell<IndexMap<String, Value>>,
    /// Set once construction assigned the fields; the write guard applies from then on.
    sealed: Cell<bool>,
}

impl Record {
    pub(crate) fn allocate(ty: &RecordType) -> Self {
        Self(Rc::new(RecordInner {
            ty: ty.clone(),
            slots: RefCell::new(vec![None; ty.fields().len()]),
            extras: RefCell::new(IndexMap::new()),
            sealed: Cell::new(false),
        }))
    }

    #[must_use]
    pub fn record_type(&self) -> &RecordType {
        &self.0.ty
    }

    /// Identity comparison.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }

    pub(crate) fn init_slot(&self, index: usize, value: Option<Value>) {
        if let Some(slot) = self.0.slots.borrow_mut().get_mut(index) {
            *slot = value;
        }
    }

    pub(crate) fn seal(&self) {
        self.0.sealed.set(true);
    }

    /// Value of the field at `index`, if set.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<Value> {
        self.0.slots.borrow().get(index).cloned().flatten()
    }

    /// Values of the visible fields in table order; unset fields read as `None`.
    #[must_use]
    pub fn visible_values(&self) -> Vec<Value> {
        let slots = self.0.slots.borrow();
        self.0
            .ty
            .visible_indices()
            .iter()
            .map(|&index| slots.get(index).cloned().flatten().unwrap_or(Value::None))
            .collect()
    }

    /// Reads an attribute: a set field, then an extra, then a class attribute.
    pub fn get(&self, name: &str) -> RecordResult<Value> {
        if let Some(index) = self.0.ty.fields().position(name)
            && let Some(value) = self.slot(index)
        {
            return Ok(value);
        }
        if let Some(value) = self.0.extras.borrow().get(name) {
            return Ok(value.clone());
        }
        self.0
            .ty
            .class_attr(name)
            .ok_or_else(|| ExcType::attribute_error(self.0.ty.name(), name))
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Writes an attribute. Names that are not fields become extras.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> RecordResult<()> {
        self.check_write(name, false)?;
        let value = value.into();
        match self.0.ty.fields().position(name) {
            Some(index) => self.init_slot(index, Some(value)),
            None => {
                self.0.extras.borrow_mut().insert(name.to_owned(), value);
            }
        }
        Ok(())
    }

    /// Deletes a field value or an extra.
    pub fn delete(&self, name: &str) -> RecordResult<()> {
        self.check_write(name, true)?;
        let missing = || ExcType::attribute_error(self.0.ty.name(), name);
        match self.0.ty.fields().position(name) {
            Some(index) => {
                let mut slots = self.0.slots.borrow_mut();
                slots.get_mut(index).and_then(Option::take).map(drop).ok_or_else(missing)
            }
            None => self.0.extras.borrow_mut().shift_remove(name).map(drop).ok_or_else(missing),
        }
    }

    fn check_write(&self, name: &str, deleting: bool) -> RecordResult<()> {
        match &self.0.ty.methods().setattr {
            Some(guard) if self.0.sealed.get() => guard(self, name, deleting),
            _ => Ok(()),
        }
    }

    /// Attributes set on the instance that are not fields.
    #[must_use]
    pub fn extras(&self) -> IndexMap<String, Value> {
        self.0.extras.borrow().clone()
    }

    /// Textual representation, e.g. `Pet(name='Rex', age=3)`.
    #[must_use]
    pub fn repr(&self) -> String {
        self.repr_with(&mut ReprGuard::default())
    }

    pub(crate) fn repr_with(&self, guard: &mut ReprGuard) -> String {
        let addr = self.addr();
        if !guard.enter(addr) {
            return "...".to_owned();
        }
        let text = match &self.0.ty.methods().repr {
            Some(repr) => repr(self, guard),
            None => format!("<{} object>", self.0.ty.name()),
        };
        guard.leave(addr);
        text
    }

    /// `self == other`; identity when the type has no equality.
    #[must_use]
    pub fn eq_value(&self, other: &Value) -> bool {
        self.eq_with(other, &mut CycleGuard::default())
    }

    pub(crate) fn eq_with(&self, other: &Value, guard: &mut CycleGuard) -> bool {
        match &self.0.ty.methods().eq {
            Some(eq) => eq(self, other, guard),
            None => matches!(other, Value::Record(o) if self.is(o)),
        }
    }

    #[must_use]
    pub fn ne_value(&self, other: &Value) -> bool {
        !self.eq_value(other)
    }

    pub fn lt(&self, other: &Value) -> RecordResult<bool> {
        self.lt_with(other, &mut CycleGuard::default())
    }

    pub(crate) fn lt_with(&self, other: &Value, guard: &mut CycleGuard) -> RecordResult<bool> {
        self.ordering(self.0.ty.methods().lt.as_ref(), "<", other, guard)
    }

    pub fn le(&self, other: &Value) -> RecordResult<bool> {
        self.ordering(self.0.ty.methods().le.as_ref(), "<=", other, &mut CycleGuard::default())
    }

    pub fn gt(&self, other: &Value) -> RecordResult<bool> {
        self.ordering(self.0.ty.methods().gt.as_ref(), ">", other, &mut CycleGuard::default())
    }

    pub fn ge(&self, other: &Value) -> RecordResult<bool> {
        self.ordering(self.0.ty.methods().ge.as_ref(), ">=", other, &mut CycleGuard::default())
    }

    fn ordering(&self, op: Option<&CmpFn>, symbol: &str, other: &Value, guard: &mut CycleGuard) -> RecordResult<bool> {
        match op {
            Some(cmp) => cmp(self, other, guard),
            None => Err(ExcType::type_error_unorderable(
                symbol,
                self.0.ty.name(),
                &other.type_name(),
            )),
        }
    }

    /// Three-way comparison built from `<` in both directions, for sorting.
    pub fn compare(&self, other: &Value) -> RecordResult<Ordering> {
        self.compare_with(other, &mut CycleGuard::default())
    }

    pub(crate) fn compare_with(&self, other: &Value, guard: &mut CycleGuard) -> RecordResult<Ordering> {
        if self.lt_with(other, guard)? {
            return Ok(Ordering::Less);
        }
        let Value::Record(that) = other else {
            return Ok(Ordering::Equal);
        };
        if that.lt_with(&Value::Record(self.clone()), guard)? {
            Ok(Ordering::Greater)
        } else {
            Ok(Ordering::Equal)
        }
    }

    /// Hash through the type's hash operation, or by identity when it has none.
    pub fn hash(&self) -> RecordResult<i64> {
        self.hash_with(&mut CycleGuard::default())
    }

    pub(crate) fn hash_with(&self, guard: &mut CycleGuard) -> RecordResult<i64> {
        match &self.0.ty.methods().hash {
            Some(hash) => hash(self, guard),
            None => Ok(hash_int(i64::try_from(self.addr() >> 4).unwrap_or_default())),
        }
    }

    /// Iterates the record, if its type supports iteration.
    #[expect(clippy::iter_not_returning_iterator, reason = "iteration is an operation the type may not support")]
    pub fn iter(&self) -> RecordResult<FieldValues> {
        match &self.0.ty.methods().iter {
            Some(iter) => iter(self),
            None => Err(ExcType::type_error(format!(
                "'{}' object is not iterable",
                self.0.ty.name()
            ))),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.eq_value(&Value::Record(other.clone()))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

/// Lazy iterator over a record's field values.
///
/// Values are read when yielded, so a field changed mid-iteration is seen
/// with its new value. Calling [`Record::iter`] again starts over.
#[derive(Debug)]
pub struct FieldValues {
    source: Source,
}

#[derive(Debug)]
enum Source {
    Fields { record: Record, pos: usize },
    Values(std::vec::IntoIter<Value>),
}

impl FieldValues {
    /// Iterates the visible fields of `record` in table order.
    pub(crate) fn visible(record: &Record) -> Self {
        Self {
            source: Source::Fields {
                record: record.clone(),
                pos: 0,
            },
        }
    }

    /// Iterates a precomputed list of values.
    #[must_use]
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            source: Source::Values(values.into_iter()),
        }
    }
}

impl Iterator for FieldValues {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match &mut self.source {
            Source::Fields { record, pos } => {
                let index = *record.record_type().visible_indices().get(*pos)?;
                *pos += 1;
                Some(record.slot(index).unwrap_or(Value::None))
            }
            Source::Values(values) => values.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match &self.source {
            Source::Fields { record, pos } => record.record_type().visible_indices().len().saturating_sub(*pos),
            Source::Values(values) => values.len(),
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FieldValues {}
