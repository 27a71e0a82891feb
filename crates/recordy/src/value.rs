//! Dynamic values held by record fields.
//!
//! Mutable containers (`List`, `Dict`) are shared references: cloning a
//! `Value::List` aliases the same list, exactly like passing a list object
//! around. [`Value::shallow_copy`] is the only way to get a distinct container,
//! which is what field defaults with the clone-on-construct policy use.
//! Records themselves are reference values too (see [`Record`]).

use std::{
    borrow::Cow,
    cell::RefCell,
    cmp::Ordering,
    fmt::{self, Write},
    rc::Rc,
};

use ahash::AHashSet;
use hashbrown::{HashTable, hash_table::Entry};

use crate::{
    class::RecordType,
    exception::{ExcType, RecordResult},
    py_hash::{hash_float, hash_int, hash_lanes, hash_str},
    record::Record,
};

/// Shared, mutable list storage.
pub type ListRef = Rc<RefCell<Vec<Value>>>;
/// Shared, mutable dict storage.
pub type DictRef = Rc<RefCell<Dict>>;

/// Hash of `None`, a fixed constant so hashes stay deterministic.
const NONE_HASH: i64 = 0x6e6f_6e65;

/// A field value.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Immutable sequence.
    Tuple(Vec<Self>),
    /// Tuple with named positions.
    ///
    /// Converted to a mapping by [`as_dict`](crate::as_dict) like a record is.
    NamedTuple {
        type_name: String,
        field_names: Vec<String>,
        values: Vec<Self>,
    },
    /// Mutable sequence, shared by reference.
    List(ListRef),
    /// Insertion-ordered mapping, shared by reference.
    Dict(DictRef),
    /// A record instance.
    Record(Record),
    /// A record type.
    Type(RecordType),
}

impl Value {
    #[must_use]
    pub fn str(text: impl Into<String>) -> Self {
        Self::Str(text.into())
    }

    #[must_use]
    pub fn tuple(items: Vec<Self>) -> Self {
        Self::Tuple(items)
    }

    #[must_use]
    pub fn list(items: Vec<Self>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn empty_list() -> Self {
        Self::list(Vec::new())
    }

    /// Builds a dict; fails on the first unhashable key.
    pub fn dict(pairs: impl IntoIterator<Item = (Self, Self)>) -> RecordResult<Self> {
        Ok(Self::Dict(Rc::new(RefCell::new(Dict::from_pairs(pairs)?))))
    }

    #[must_use]
    pub fn empty_dict() -> Self {
        Self::Dict(Rc::new(RefCell::new(Dict::new())))
    }

    #[must_use]
    pub fn named_tuple(type_name: impl Into<String>, field_names: &[&str], values: Vec<Self>) -> Self {
        Self::NamedTuple {
            type_name: type_name.into(),
            field_names: field_names.iter().map(|name| (*name).to_owned()).collect(),
            values,
        }
    }

    /// Returns the type name shown in error messages and in the default repr.
    #[must_use]
    pub fn type_name(&self) -> Cow<'_, str> {
        match self {
            Self::None => Cow::Borrowed("NoneType"),
            Self::Bool(_) => Cow::Borrowed("bool"),
            Self::Int(_) => Cow::Borrowed("int"),
            Self::Float(_) => Cow::Borrowed("float"),
            Self::Str(_) => Cow::Borrowed("str"),
            Self::Tuple(_) => Cow::Borrowed("tuple"),
            Self::NamedTuple { type_name, .. } => Cow::Borrowed(type_name),
            Self::List(_) => Cow::Borrowed("list"),
            Self::Dict(_) => Cow::Borrowed("dict"),
            Self::Record(record) => Cow::Borrowed(record.record_type().name()),
            Self::Type(_) => Cow::Borrowed("type"),
        }
    }

    /// Identity comparison.
    ///
    /// Only reference values (lists, dicts, records, types) have identity;
    /// immediates never compare identical.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b),
            (Self::Record(a), Self::Record(b)) => a.is(b),
            (Self::Type(a), Self::Type(b)) => a.uid() == b.uid(),
            _ => false,
        }
    }

    /// Returns true if this value has a copy operation, i.e. is a mutable container.
    #[must_use]
    pub fn has_copy(&self) -> bool {
        matches!(self, Self::List(_) | Self::Dict(_))
    }

    /// Returns a shallow copy: a new container holding the same elements.
    ///
    /// Values without a copy operation are returned as-is.
    #[must_use]
    pub fn shallow_copy(&self) -> Self {
        match self {
            Self::List(list) => Self::list(list.borrow().clone()),
            Self::Dict(dict) => Self::Dict(Rc::new(RefCell::new(dict.borrow().clone()))),
            other => other.clone(),
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dict(&self) -> Option<&DictRef> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Returns the textual representation, e.g. `[1, 'a', Pet(name='Rex')]`.
    ///
    /// Cycles through containers or records render as `...`.
    #[must_use]
    pub fn py_repr(&self) -> String {
        let mut guard = ReprGuard::default();
        let mut out = String::new();
        self.repr_into(&mut out, &mut guard);
        out
    }

    /// Writes the representation into `out`, sharing cycle tracking with the caller.
    pub fn repr_into(&self, out: &mut String, guard: &mut ReprGuard) {
        // writing into a String cannot fail
        let _ = self.repr_fmt(out, guard);
    }

    fn repr_fmt(&self, f: &mut String, guard: &mut ReprGuard) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => float_repr_fmt(*v, f),
            Self::Str(s) => string_repr_fmt(s, f),
            Self::Tuple(items) => {
                f.write_char('(')?;
                write_items(items, f, guard)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Self::NamedTuple {
                type_name,
                field_names,
                values,
            } => {
                f.write_str(type_name)?;
                f.write_char('(')?;
                for (i, (name, value)) in field_names.iter().zip(values).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(name)?;
                    f.write_char('=')?;
                    value.repr_fmt(f, guard)?;
                }
                f.write_char(')')
            }
            Self::List(list) => {
                let addr = addr_of(list);
                if !guard.enter(addr) {
                    return f.write_str("[...]");
                }
                f.write_char('[')?;
                write_items(&list.borrow(), f, guard)?;
                guard.leave(addr);
                f.write_char(']')
            }
            Self::Dict(dict) => {
                let addr = addr_of(dict);
                if !guard.enter(addr) {
                    return f.write_str("{...}");
                }
                f.write_char('{')?;
                for (i, (k, v)) in dict.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    k.repr_fmt(f, guard)?;
                    f.write_str(": ")?;
                    v.repr_fmt(f, guard)?;
                }
                guard.leave(addr);
                f.write_char('}')
            }
            Self::Record(record) => f.write_str(&record.repr_with(guard)),
            Self::Type(ty) => write!(f, "<record type '{}'>", ty.name()),
        }
    }

    /// Equality with numeric cross-kind comparison (`1 == 1.0 == True`).
    ///
    /// Records delegate to their generated or user-defined equality, falling
    /// back to identity when the type has none.
    #[must_use]
    pub fn py_eq(&self, other: &Self) -> bool {
        self.py_eq_with(other, &mut CycleGuard::default())
    }

    /// Equality sharing cycle tracking with the caller.
    ///
    /// Two containers met again while they are still being compared are part
    /// of a cycle and count as equal.
    pub fn py_eq_with(&self, other: &Self, guard: &mut CycleGuard) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => items_eq(a, b, guard),
            (Self::NamedTuple { values: a, .. }, Self::NamedTuple { values: b, .. }) => items_eq(a, b, guard),
            (Self::NamedTuple { values, .. }, Self::Tuple(t)) | (Self::Tuple(t), Self::NamedTuple { values, .. }) => {
                items_eq(values, t, guard)
            }
            (Self::List(a), Self::List(b)) => {
                let pair = (addr_of(a), addr_of(b));
                if Rc::ptr_eq(a, b) || !guard.enter_eq(pair) {
                    return true;
                }
                let equal = items_eq(&a.borrow(), &b.borrow(), guard);
                guard.leave_eq(pair);
                equal
            }
            (Self::Dict(a), Self::Dict(b)) => {
                let pair = (addr_of(a), addr_of(b));
                if Rc::ptr_eq(a, b) || !guard.enter_eq(pair) {
                    return true;
                }
                let equal = a.borrow().eq_with(&b.borrow(), guard);
                guard.leave_eq(pair);
                equal
            }
            (Self::Record(a), _) => a.eq_with(other, guard),
            (_, Self::Record(b)) => b.eq_with(self, guard),
            (Self::Type(a), Self::Type(b)) => a.uid() == b.uid(),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.num_eq(b),
                _ => false,
            },
        }
    }

    /// Ordering comparison; `None` when the two values are not orderable against each other.
    ///
    /// Sequences compare lexicographically. Records compare through their
    /// generated ordering when it exists.
    #[must_use]
    pub fn py_cmp(&self, other: &Self) -> Option<Ordering> {
        self.py_cmp_with(other, &mut CycleGuard::default()).ok().flatten()
    }

    /// Ordering sharing cycle tracking with the caller.
    ///
    /// `Ok(None)` means the values are not orderable against each other. Errors
    /// come from a record's ordering or from a cycle.
    pub fn py_cmp_with(&self, other: &Self, guard: &mut CycleGuard) -> RecordResult<Option<Ordering>> {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Ok(Some(a.cmp(b))),
            (Self::Tuple(a), Self::Tuple(b)) => cmp_items(a, b, guard),
            (Self::List(a), Self::List(b)) => {
                let pair = (addr_of(a), addr_of(b));
                if !guard.enter_order(pair) {
                    return Err(ExcType::recursion_error("comparing lists"));
                }
                let ordering = cmp_items(&a.borrow(), &b.borrow(), guard);
                guard.leave_order(pair);
                ordering
            }
            (Self::Record(a), _) => a.compare_with(other, guard).map(Some),
            _ => Ok(match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.num_cmp(b),
                _ => None,
            }),
        }
    }

    /// Deterministic hash; mutable containers are unhashable.
    pub fn py_hash(&self) -> RecordResult<i64> {
        self.py_hash_with(&mut CycleGuard::default())
    }

    /// Hash sharing cycle tracking with the caller.
    pub fn py_hash_with(&self, guard: &mut CycleGuard) -> RecordResult<i64> {
        match self {
            Self::None => Ok(NONE_HASH),
            Self::Bool(b) => Ok(hash_int(i64::from(*b))),
            Self::Int(i) => Ok(hash_int(*i)),
            Self::Float(v) => Ok(hash_float(*v)),
            Self::Str(s) => Ok(hash_str(s)),
            Self::Tuple(items) | Self::NamedTuple { values: items, .. } => {
                let lanes = items
                    .iter()
                    .map(|item| item.py_hash_with(guard))
                    .collect::<RecordResult<Vec<_>>>()?;
                Ok(hash_lanes(&lanes))
            }
            Self::List(_) | Self::Dict(_) => Err(ExcType::type_error_unhashable(&self.type_name())),
            Self::Record(record) => record.hash_with(guard),
            Self::Type(ty) => Ok(ty.type_hash()),
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Self::Bool(b) => Some(Number::Int(i64::from(*b))),
            Self::Int(i) => Some(Number::Int(*i)),
            Self::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.py_eq(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => f.write_str(&other.py_repr()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<RecordType> for Value {
    fn from(value: RecordType) -> Self {
        Self::Type(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::list(items)
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    #[expect(clippy::float_cmp, reason = "numeric equality is exact")]
    fn num_eq(self, other: Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }

    fn num_cmp(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

/// Insertion-ordered mapping keyed by hashable values.
///
/// Entries live in a dense vector in insertion order; a hash table maps each
/// key's [`Value::py_hash`] to its entry. Keys match by [`Value::py_eq`], so
/// `1` and `1.0` address the same entry. Unhashable keys are rejected.
#[derive(Debug, Clone, Default)]
pub struct Dict {
    /// Entry indices keyed by the entry's hash.
    indices: HashTable<usize>,
    entries: Vec<DictEntry>,
}

#[derive(Debug, Clone)]
struct DictEntry {
    key: Value,
    value: Value,
    /// Kept so the table can rehash without calling back into the key.
    hash: u64,
}

impl Dict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dict from pairs; a repeated key keeps its first position and its last value.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Value, Value)>) -> RecordResult<Self> {
        let mut dict = Self::new();
        for (key, value) in pairs {
            dict.insert(key, value)?;
        }
        Ok(dict)
    }

    pub fn get(&self, key: &Value) -> RecordResult<Option<&Value>> {
        let hash = key_hash(key)?;
        Ok(self.find(hash, key).map(|index| &self.entries[index].value))
    }

    /// Looks up a string key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        let hash = u64::from_ne_bytes(hash_str(key).to_ne_bytes());
        self.indices
            .find(hash, |&index| self.entries[index].key.as_str() == Some(key))
            .map(|&index| &self.entries[index].value)
    }

    /// Inserts or replaces an entry, returning the previous value.
    ///
    /// Replacing keeps the entry's original position.
    pub fn insert(&mut self, key: Value, value: Value) -> RecordResult<Option<Value>> {
        let hash = key_hash(&key)?;
        if let Some(index) = self.find(hash, &key) {
            return Ok(Some(std::mem::replace(&mut self.entries[index].value, value)));
        }
        let index = self.entries.len();
        self.entries.push(DictEntry { key, value, hash });
        self.indices
            .insert_unique(hash, index, |index| self.entries[*index].hash);
        Ok(None)
    }

    pub fn remove(&mut self, key: &Value) -> RecordResult<Option<Value>> {
        let hash = key_hash(key)?;
        let entry = self.indices.entry(
            hash,
            |index| keys_match(&self.entries[*index].key, key),
            |index| self.entries[*index].hash,
        );
        let Entry::Occupied(occupied) = entry else {
            return Ok(None);
        };
        let (removed, _) = occupied.remove();
        let entry = self.entries.remove(removed);
        // later entries shifted left by one
        for index in &mut self.indices {
            if *index > removed {
                *index -= 1;
            }
        }
        Ok(Some(entry.value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|entry| (&entry.key, &entry.value))
    }

    fn find(&self, hash: u64, key: &Value) -> Option<usize> {
        self.indices
            .find(hash, |&index| keys_match(&self.entries[index].key, key))
            .copied()
    }

    /// Same keys mapping to equal values, in any order.
    fn eq_with(&self, other: &Self, guard: &mut CycleGuard) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|entry| {
                other
                    .find(entry.hash, &entry.key)
                    .is_some_and(|index| other.entries[index].value.py_eq_with(&entry.value, guard))
            })
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, &mut CycleGuard::default())
    }
}

fn key_hash(key: &Value) -> RecordResult<u64> {
    Ok(u64::from_ne_bytes(key.py_hash()?.to_ne_bytes()))
}

fn keys_match(stored: &Value, key: &Value) -> bool {
    stored.is(key) || stored.py_eq(key)
}

/// Tracks which reference values are currently being rendered.
///
/// A value met again while it is still being rendered is part of a cycle and
/// renders as `...` instead of recursing.
#[derive(Debug, Default)]
pub struct ReprGuard {
    active: AHashSet<usize>,
}

impl ReprGuard {
    /// Marks `addr` as being rendered; returns false if it already was.
    pub fn enter(&mut self, addr: usize) -> bool {
        self.active.insert(addr)
    }

    pub fn leave(&mut self, addr: usize) {
        self.active.remove(&addr);
    }
}

/// Tracks the values an equality, ordering or hash computation is inside of.
///
/// Equality meeting a pair it is already comparing treats the pair as equal:
/// two cycles with the same shape have no first difference. Ordering and
/// hashing that meet themselves again fail with a RecursionError instead.
#[derive(Debug, Default)]
pub struct CycleGuard {
    equating: AHashSet<(usize, usize)>,
    ordering: AHashSet<(usize, usize)>,
    hashing: AHashSet<usize>,
}

impl CycleGuard {
    /// Marks the pair as being compared for equality; returns false if it already was.
    pub fn enter_eq(&mut self, pair: (usize, usize)) -> bool {
        self.equating.insert(pair)
    }

    pub fn leave_eq(&mut self, pair: (usize, usize)) {
        self.equating.remove(&pair);
    }

    /// Marks the pair as being ordered; returns false if it already was.
    pub fn enter_order(&mut self, pair: (usize, usize)) -> bool {
        self.ordering.insert(pair)
    }

    pub fn leave_order(&mut self, pair: (usize, usize)) {
        self.ordering.remove(&pair);
    }

    /// Marks `addr` as being hashed; returns false if it already was.
    pub fn enter_hash(&mut self, addr: usize) -> bool {
        self.hashing.insert(addr)
    }

    pub fn leave_hash(&mut self, addr: usize) {
        self.hashing.remove(&addr);
    }
}

fn addr_of<T>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc).cast::<()>() as usize
}

fn write_items(items: &[Value], f: &mut String, guard: &mut ReprGuard) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.repr_fmt(f, guard)?;
    }
    Ok(())
}

pub(crate) fn items_eq(a: &[Value], b: &[Value], guard: &mut CycleGuard) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is(y) || x.py_eq_with(y, guard))
}

/// Lexicographic comparison: the first unequal pair decides, then length.
pub(crate) fn cmp_items(a: &[Value], b: &[Value], guard: &mut CycleGuard) -> RecordResult<Option<Ordering>> {
    for (x, y) in a.iter().zip(b) {
        if x.is(y) || x.py_eq_with(y, guard) {
            continue;
        }
        return x.py_cmp_with(y, guard);
    }
    Ok(Some(a.len().cmp(&b.len())))
}

fn float_repr_fmt(v: f64, f: &mut String) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "inf" } else { "-inf" });
    }
    let s = v.to_string();
    f.write_str(&s)?;
    if !s.contains('.') {
        f.write_str(".0")?;
    }
    Ok(())
}

/// Writes a quoted string literal, preferring single quotes.
fn string_repr_fmt(s: &str, f: &mut String) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}
