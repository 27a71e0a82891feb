//! Free functions over record types and instances.

use indexmap::IndexMap;

use crate::{
    args::Args,
    class::{ClassDecl, RecordType},
    decorator::Decorator,
    exception::{ExcType, RecordResult},
    field::Field,
    hint::TypeHint,
    options::OptionsPatch,
    record::Record,
    value::Value,
};

/// Maximum nesting depth [`as_dict`] and [`as_tuple`] descend into.
pub const MAX_DATA_RECURSION_DEPTH: usize = 200;

/// Anything that names a record type: the type itself or one of its instances.
pub trait AsRecordType {
    fn as_record_type(&self) -> &RecordType;
}

impl AsRecordType for RecordType {
    fn as_record_type(&self) -> &RecordType {
        self
    }
}

impl AsRecordType for Record {
    fn as_record_type(&self) -> &RecordType {
        self.record_type()
    }
}

/// True for record types and record instances.
#[must_use]
pub fn is_dataclass(value: &Value) -> bool {
    matches!(value, Value::Type(_) | Value::Record(_))
}

/// True for record instances only.
#[must_use]
pub fn is_dataclass_instance(value: &Value) -> bool {
    matches!(value, Value::Record(_))
}

/// Field names and annotations in table order.
///
/// `internals` selects whether internal fields are included.
#[must_use]
pub fn fields(target: &impl AsRecordType, internals: bool) -> IndexMap<String, TypeHint> {
    target
        .as_record_type()
        .fields()
        .iter()
        .filter(|field| internals || !field.is_internal())
        .map(|field| (field.name().to_owned(), field.hint().clone()))
        .collect()
}

/// Field names and current values in table order.
///
/// Fails with an AttributeError if a field is unset and has no class attribute to fall back on.
pub fn values(record: &Record, internals: bool) -> RecordResult<IndexMap<String, Value>> {
    fields(record, internals)
        .into_keys()
        .map(|name| {
            let value = record.get(&name)?;
            Ok((name, value))
        })
        .collect()
}

/// Recursively converts a record into a dict of its fields, internals included.
///
/// Nested records and named tuples become dicts; lists, tuples and dicts are
/// copied with their contents converted.
pub fn as_dict(record: &Record) -> RecordResult<Value> {
    as_dict_with(record, |pairs| Value::dict(pairs))
}

/// Like [`as_dict`], but every mapping is built by `dict_factory` from its
/// converted `(key, value)` pairs in order.
pub fn as_dict_with(
    record: &Record,
    dict_factory: impl Fn(Vec<(Value, Value)>) -> RecordResult<Value>,
) -> RecordResult<Value> {
    recurse_structure(&Value::Record(record.clone()), &dict_factory, 0)
}

/// Recursively converts a record into a tuple of its field values, internals included.
///
/// Nested records, named tuples and dicts become tuples of their values.
pub fn as_tuple(record: &Record) -> RecordResult<Value> {
    as_dict_with(record, |pairs| {
        Ok(Value::Tuple(pairs.into_iter().map(|(_, value)| value).collect()))
    })
}

/// Constructs a new instance of the record's type from its current values
/// with `changes` applied on top.
pub fn replace(record: &Record, changes: IndexMap<String, Value>) -> RecordResult<Record> {
    let mut keywords = values(record, true)?;
    keywords.extend(changes);
    record.record_type().construct(Args::from_keywords(keywords))
}

/// Builds a record type dynamically.
///
/// `defaults` entries naming a field become that field's default; other
/// entries become class attributes.
pub fn make_dataclass<N, H>(
    name: &str,
    fields: impl IntoIterator<Item = (N, H)>,
    mut defaults: IndexMap<String, Value>,
    bases: &[RecordType],
    options: OptionsPatch,
) -> RecordResult<RecordType>
where
    N: Into<String>,
    H: Into<TypeHint>,
{
    let mut decl = bases.iter().fold(ClassDecl::new(name), ClassDecl::base);
    for (field_name, hint) in fields {
        let field_name = field_name.into();
        let field = match defaults.shift_remove(&field_name) {
            Some(default) => Field::new(field_name, hint).with_default(default),
            None => Field::new(field_name, hint),
        };
        decl = decl.push_field(field);
    }
    for (attr, value) in defaults {
        decl = decl.attr(attr, value);
    }
    Decorator::new().options(options).apply(decl)
}

type MappingFactory<'a> = &'a dyn Fn(Vec<(Value, Value)>) -> RecordResult<Value>;

fn recurse_structure(value: &Value, factory: MappingFactory<'_>, depth: usize) -> RecordResult<Value> {
    if depth > MAX_DATA_RECURSION_DEPTH {
        return Err(ExcType::recursion_error("converting a record to plain data"));
    }
    let next = depth + 1;
    let pairs: Vec<(Value, Value)> = match value {
        Value::Record(record) => values(record, true)?
            .into_iter()
            .map(|(name, value)| (Value::Str(name), value))
            .collect(),
        Value::NamedTuple {
            field_names, values, ..
        } => field_names
            .iter()
            .zip(values)
            .map(|(name, value)| (Value::str(name.as_str()), value.clone()))
            .collect(),
        Value::Dict(dict) => dict.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::List(list) => {
            let items = list.borrow().clone();
            return Ok(Value::list(convert_all(&items, factory, next)?));
        }
        Value::Tuple(items) => return Ok(Value::Tuple(convert_all(items, factory, next)?)),
        other => return Ok(other.clone()),
    };

    let mut converted = Vec::with_capacity(pairs.len());
    for (key, value) in &pairs {
        converted.push((
            recurse_structure(key, factory, next)?,
            recurse_structure(value, factory, next)?,
        ));
    }
    factory(converted)
}

fn convert_all(items: &[Value], factory: MappingFactory<'_>, depth: usize) -> RecordResult<Vec<Value>> {
    items
        .iter()
        .map(|item| recurse_structure(item, factory, depth))
        .collect()
}
