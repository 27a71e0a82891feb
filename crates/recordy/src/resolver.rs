//! Field resolution and base linearization.
//!
//! A record type's field table is built from the fields each ancestor
//! declares itself, most general ancestor first (the linearization reversed),
//! followed by the type's own declared fields.
//! A name seen again replaces the earlier entry in place, so an override
//! keeps the position of the field it overrides. The merged sequence is then
//! stably partitioned so every field without a default precedes every field
//! with one.

use indexmap::IndexMap;

use crate::{
    class::RecordType,
    exception::{ExcType, RecordResult},
    field::{Field, FieldTable},
    tracer::{DefinitionTracer, NoopTracer},
};

/// Maximum length of a base linearization.
pub const MAX_INHERITANCE_DEPTH: usize = 256;

/// Resolves a field table without tracing.
#[must_use]
pub fn resolve(class: &str, own: &[Field], ancestors: &[&[Field]]) -> FieldTable {
    resolve_traced(class, own, ancestors, &mut NoopTracer)
}

/// Resolves a field table, reporting each merge and reorder to `tracer`.
///
/// `ancestors` holds each ancestor's own declarations, most general first, so
/// a nearer ancestor's override replaces a farther one's declaration.
pub fn resolve_traced(
    class: &str,
    own: &[Field],
    ancestors: &[&[Field]],
    tracer: &mut dyn DefinitionTracer,
) -> FieldTable {
    tracer.on_resolve_start(class, ancestors.len());

    let mut merged: IndexMap<String, Field> = IndexMap::new();
    for field in ancestors.iter().flat_map(|declared| declared.iter()).chain(own) {
        let overridden = merged.insert(field.name().to_owned(), field.clone()).is_some();
        tracer.on_field_merged(class, field.name(), overridden);
    }

    let table = FieldTable::from_ordered(partition_required_first(class, merged, tracer));
    tracer.on_resolve_end(class, table.len());
    table
}

/// Stable partition: fields without a default first, relative order kept within each group.
fn partition_required_first(
    class: &str,
    merged: IndexMap<String, Field>,
    tracer: &mut dyn DefinitionTracer,
) -> IndexMap<String, Field> {
    let (required, defaulted): (Vec<_>, Vec<_>) = merged
        .into_iter()
        .enumerate()
        .partition(|(_, (_, field))| !field.has_default());

    required
        .into_iter()
        .chain(defaulted)
        .enumerate()
        .map(|(to, (from, entry))| {
            if from != to {
                tracer.on_field_reordered(class, &entry.0, from, to);
            }
            entry
        })
        .collect()
}

/// Computes the C3 linearization of `bases`, excluding the type being defined.
///
/// Each base contributes `[base, ..base.mro()]`; the bases list itself is
/// merged last so declaration order is honoured.
pub(crate) fn compute_c3_mro(bases: &[RecordType]) -> RecordResult<Vec<RecordType>> {
    for (i, base) in bases.iter().enumerate() {
        if bases[..i].iter().any(|earlier| earlier.uid() == base.uid()) {
            return Err(ExcType::type_error(format!("duplicate base class {}", base.name())));
        }
    }

    let mut linearizations: Vec<Vec<RecordType>> = Vec::with_capacity(bases.len() + 1);
    for base in bases {
        let mut lin = Vec::with_capacity(base.mro().len() + 1);
        lin.push(base.clone());
        lin.extend(base.mro().iter().cloned());
        if lin.len() > MAX_INHERITANCE_DEPTH {
            return Err(ExcType::type_error(format!(
                "inheritance chain too deep (maximum depth {MAX_INHERITANCE_DEPTH})"
            )));
        }
        linearizations.push(lin);
    }
    linearizations.push(bases.to_vec());

    let mut result: Vec<RecordType> = Vec::new();
    loop {
        linearizations.retain(|l| !l.is_empty());
        if linearizations.is_empty() {
            break;
        }

        // a good head does not appear in the tail of any list
        let found = linearizations.iter().map(|lin| &lin[0]).find(|candidate| {
            !linearizations
                .iter()
                .any(|other| other[1..].iter().any(|t| t.uid() == candidate.uid()))
        });

        let Some(next) = found.cloned() else {
            let names: Vec<&str> = bases.iter().map(RecordType::name).collect();
            return Err(ExcType::type_error_inconsistent_mro(&names));
        };
        for lin in &mut linearizations {
            if lin.first().is_some_and(|head| head.uid() == next.uid()) {
                lin.remove(0);
            }
        }
        result.push(next);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{tracer::RecordingTracer, tracer::TraceEvent, value::Value};

    fn names(table: &FieldTable) -> Vec<&str> {
        table.names().collect()
    }

    #[test]
    fn required_fields_move_ahead_of_defaulted() {
        let own = [
            Field::new("a", "int").with_default(Value::Int(1)),
            Field::new("b", "int"),
            Field::new("c", "int").with_default(Value::Int(2)),
            Field::new("d", "int"),
        ];
        let table = resolve("T", &own, &[]);
        assert_eq!(names(&table), ["b", "d", "a", "c"]);
        assert_eq!(table.required_count(), 2);
    }

    #[test]
    fn override_keeps_base_position() {
        let base = [Field::new("x", "int"), Field::new("y", "int"), Field::new("z", "int")];
        let own = [Field::new("y", "str"), Field::new("w", "int")];
        let table = resolve("Sub", &own, &[&base]);
        assert_eq!(names(&table), ["x", "y", "z", "w"]);
        assert_eq!(table.get("y").unwrap().hint().to_string(), "str");
    }

    #[test]
    fn override_adding_default_is_partitioned() {
        let base = [Field::new("x", "int"), Field::new("y", "int")];
        let own = [Field::new("x", "int").with_default(Value::Int(0))];
        let table = resolve("Sub", &own, &[&base]);
        assert_eq!(names(&table), ["y", "x"]);
    }

    #[test]
    fn nearer_ancestor_wins_entries() {
        let general = [Field::new("a", "int"), Field::new("shared", "int")];
        let near = [Field::new("shared", "str"), Field::new("b", "int")];
        let table = resolve("Both", &[], &[&general, &near]);
        assert_eq!(names(&table), ["a", "shared", "b"]);
        // the nearer ancestor wins the entry, the general one keeps the position
        assert_eq!(table.get("shared").unwrap().hint().to_string(), "str");
    }

    #[test]
    fn tracer_sees_merges_and_moves() {
        let mut tracer = RecordingTracer::new();
        let own = [Field::new("a", "int").with_default(Value::Int(1)), Field::new("b", "int")];
        resolve_traced("T", &own, &[], &mut tracer);
        assert_eq!(
            tracer.events(),
            [
                TraceEvent::ResolveStart {
                    class: "T".to_owned(),
                    ancestors: 0
                },
                TraceEvent::FieldMerged {
                    class: "T".to_owned(),
                    field: "a".to_owned(),
                    overridden: false
                },
                TraceEvent::FieldMerged {
                    class: "T".to_owned(),
                    field: "b".to_owned(),
                    overridden: false
                },
                TraceEvent::FieldReordered {
                    class: "T".to_owned(),
                    field: "b".to_owned(),
                    from: 1,
                    to: 0
                },
                TraceEvent::FieldReordered {
                    class: "T".to_owned(),
                    field: "a".to_owned(),
                    from: 0,
                    to: 1
                },
                TraceEvent::ResolveEnd {
                    class: "T".to_owned(),
                    fields: 2
                },
            ]
        );
    }
}
