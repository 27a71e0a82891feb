//! Method synthesis.
//!
//! Given a resolved field table and resolved options, builds the operations a
//! record type's instances support. An operation the class itself defines
//! always wins over generation. Nothing is inherited: every type gets its
//! operations generated afresh from its own table, even where a base defined
//! one by hand.

use std::{cmp::Ordering, fmt, rc::Rc};

use indexmap::IndexMap;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    args::{Args, PostInit},
    exception::{ExcType, RecordResult},
    field::FieldTable,
    options::{HashPolicy, RecordOptions},
    py_hash::hash_lanes,
    record::{FieldValues, Record},
    tracer::DefinitionTracer,
    value::{CycleGuard, ReprGuard, Value, cmp_items, items_eq},
};

/// Constructor body.
pub type InitFn = Rc<dyn Fn(&Record, Args) -> RecordResult<()>>;
/// Renders a record; the guard tracks records already being rendered.
pub type ReprFn = Rc<dyn Fn(&Record, &mut ReprGuard) -> String>;
/// `==`; the guard tracks record pairs already being compared.
pub type EqFn = Rc<dyn Fn(&Record, &Value, &mut CycleGuard) -> bool>;
/// One ordering comparison, e.g. `<`.
pub type CmpFn = Rc<dyn Fn(&Record, &Value, &mut CycleGuard) -> RecordResult<bool>>;
pub type HashFn = Rc<dyn Fn(&Record, &mut CycleGuard) -> RecordResult<i64>>;
pub type IterFn = Rc<dyn Fn(&Record) -> RecordResult<FieldValues>>;
/// Write guard: `(record, attribute, deleting)`; an error rejects the write.
pub type SetAttrFn = Rc<dyn Fn(&Record, &str, bool) -> RecordResult<()>>;

/// Operations a record type can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    Init,
    Repr,
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Hash,
    Iter,
    SetAttr,
}

/// The operations of one record type, user-defined or generated.
///
/// A `None` slot falls back to the default behaviour: identity equality and
/// hash, `<Name object>` repr, no ordering, no iteration, unrestricted writes.
#[derive(Clone, Default)]
pub struct Methods {
    pub init: Option<InitFn>,
    pub repr: Option<ReprFn>,
    pub eq: Option<EqFn>,
    pub lt: Option<CmpFn>,
    pub le: Option<CmpFn>,
    pub gt: Option<CmpFn>,
    pub ge: Option<CmpFn>,
    pub hash: Option<HashFn>,
    pub iter: Option<IterFn>,
    pub setattr: Option<SetAttrFn>,
}

impl Methods {
    #[must_use]
    pub fn has(&self, op: Operation) -> bool {
        match op {
            Operation::Init => self.init.is_some(),
            Operation::Repr => self.repr.is_some(),
            Operation::Eq => self.eq.is_some(),
            Operation::Lt => self.lt.is_some(),
            Operation::Le => self.le.is_some(),
            Operation::Gt => self.gt.is_some(),
            Operation::Ge => self.ge.is_some(),
            Operation::Hash => self.hash.is_some(),
            Operation::Iter => self.iter.is_some(),
            Operation::SetAttr => self.setattr.is_some(),
        }
    }
}

impl fmt::Debug for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ALL: [Operation; 10] = [
            Operation::Init,
            Operation::Repr,
            Operation::Eq,
            Operation::Lt,
            Operation::Le,
            Operation::Gt,
            Operation::Ge,
            Operation::Hash,
            Operation::Iter,
            Operation::SetAttr,
        ];
        f.debug_set().entries(ALL.iter().filter(|op| self.has(**op))).finish()
    }
}

/// Inputs to synthesis for one record type.
#[derive(Debug)]
pub struct SynthContext<'a> {
    pub class_name: &'a str,
    pub table: &'a FieldTable,
    pub options: RecordOptions,
    /// Operations the class defines itself; these are kept as-is.
    pub user_methods: &'a Methods,
    pub post_init: Option<&'a PostInit>,
}

/// Builds the operations of a record type.
///
/// Fails with an InitSignatureError when a constructor is generated and the
/// post-init hook's parameters conflict with the field table.
pub fn synthesize(ctx: &SynthContext<'_>, tracer: &mut dyn DefinitionTracer) -> RecordResult<Methods> {
    let opts = ctx.options;
    let class = ctx.class_name;
    let mut methods = ctx.user_methods.clone();

    if opts.init
        && methods.init.is_none()
        && let Some(hook) = ctx.post_init
    {
        hook.validate(class, ctx.table)?;
    }
    install(&mut methods.init, Operation::Init, opts.init, class, tracer, || {
        generated_init(class, ctx.post_init.cloned(), opts.kwargs)
    });
    install(&mut methods.repr, Operation::Repr, opts.repr, class, tracer, generated_repr);
    install(&mut methods.eq, Operation::Eq, opts.eq, class, tracer, generated_eq);

    install(&mut methods.lt, Operation::Lt, opts.order, class, tracer, generated_lt);
    let total = opts.total_ordering();
    install(&mut methods.le, Operation::Le, total, class, tracer, || {
        derived(|this, other, guard| Ok(this.lt_with(other, guard)? || this.eq_with(other, guard)))
    });
    install(&mut methods.gt, Operation::Gt, total, class, tracer, || {
        derived(|this, other, guard| Ok(!this.lt_with(other, guard)? && !this.eq_with(other, guard)))
    });
    install(&mut methods.ge, Operation::Ge, total, class, tracer, || {
        derived(|this, other, guard| Ok(!this.lt_with(other, guard)?))
    });

    match opts.hash_policy() {
        HashPolicy::Generated => install(&mut methods.hash, Operation::Hash, true, class, tracer, generated_hash),
        HashPolicy::Unhashable => install(&mut methods.hash, Operation::Hash, true, class, tracer, unhashable),
        HashPolicy::Identity => install(&mut methods.hash, Operation::Hash, false, class, tracer, unhashable),
    }
    install(&mut methods.iter, Operation::Iter, opts.iter, class, tracer, generated_iter);

    // write guarding is not user-definable: a frozen type always gets the guard
    methods.setattr = None;
    install(&mut methods.setattr, Operation::SetAttr, opts.frozen, class, tracer, frozen_guard);

    Ok(methods)
}

fn install<T>(
    slot: &mut Option<T>,
    op: Operation,
    enabled: bool,
    class: &str,
    tracer: &mut dyn DefinitionTracer,
    make: impl FnOnce() -> T,
) {
    if slot.is_some() {
        tracer.on_user_defined_kept(class, op);
    } else if enabled {
        *slot = Some(make());
        tracer.on_synthesize(class, op);
    }
}

/// Generated constructor.
///
/// Positional arguments bind to fields in table order, then keywords by name.
/// Unbound fields take their default; a field with neither is reported
/// missing. Surplus arguments go to the post-init hook when there is one,
/// otherwise surplus keywords are dropped when `absorb_keywords` is set and
/// rejected when it is not. Nothing is assigned unless binding succeeds. The
/// frozen guard becomes active once every field is assigned, before the hook runs.
fn generated_init(class: &str, post_init: Option<PostInit>, absorb_keywords: bool) -> InitFn {
    let class = class.to_owned();
    Rc::new(move |this: &Record, args: Args| -> RecordResult<()> {
        let table = this.record_type().fields();
        let field_count = table.len();
        let (positional, keywords) = args.into_parts();
        if post_init.is_none() && positional.len() > field_count {
            return Err(ExcType::type_error_too_many_positional(
                &class,
                field_count,
                positional.len(),
            ));
        }

        let mut slots: Vec<Option<Value>> = vec![None; field_count];
        let mut positional = positional.into_iter();
        for (slot, value) in slots.iter_mut().zip(positional.by_ref()) {
            *slot = Some(value);
        }
        let surplus_positional: Vec<Value> = positional.collect();

        let mut surplus_keywords = IndexMap::new();
        for (key, value) in keywords {
            match table.position(&key) {
                Some(index) if slots[index].is_some() => {
                    return Err(ExcType::type_error_multiple_values(&class, &key));
                }
                Some(index) => slots[index] = Some(value),
                None => {
                    surplus_keywords.insert(key, value);
                }
            }
        }

        let mut missing: Vec<&str> = Vec::new();
        for (slot, field) in slots.iter_mut().zip(table) {
            if slot.is_none() {
                match field.default() {
                    Some(default) => *slot = Some(default.materialize()),
                    None => missing.push(field.name()),
                }
            }
        }
        if !missing.is_empty() {
            return Err(ExcType::type_error_missing_positional_with_names(&class, &missing));
        }

        let hook_args = match &post_init {
            Some(hook) => Some(hook.bind(
                &class,
                surplus_positional,
                surplus_keywords,
                absorb_keywords,
                field_count,
            )?),
            None => {
                if !absorb_keywords && let Some(key) = surplus_keywords.keys().next() {
                    return Err(ExcType::type_error_unexpected_keyword(&class, key));
                }
                None
            }
        };

        for (index, value) in slots.into_iter().enumerate() {
            this.init_slot(index, value);
        }
        this.seal();
        if let (Some(hook), Some(hook_args)) = (&post_init, hook_args) {
            hook.call(this, hook_args)?;
        }
        Ok(())
    })
}

/// `Name(field=value, ...)` over the visible fields; a value that is the record
/// itself renders as `...`.
fn generated_repr() -> ReprFn {
    Rc::new(|this: &Record, guard: &mut ReprGuard| {
        let ty = this.record_type();
        let mut out = String::with_capacity(32);
        out.push_str(ty.name());
        out.push('(');
        for (n, &index) in ty.visible_indices().iter().enumerate() {
            if n > 0 {
                out.push_str(", ");
            }
            if let Some(field) = ty.fields().get_index(index) {
                out.push_str(field.name());
            }
            out.push('=');
            match this.slot(index) {
                Some(value) => value.repr_into(&mut out, guard),
                None => out.push_str("<unset>"),
            }
        }
        out.push(')');
        out
    })
}

/// Equal when the types are related by inheritance in either direction and the
/// visible field values are equal in order.
///
/// Each side contributes its own type's visible values, so a pair whose types
/// show different fields compares unequal. That covers fields added by a
/// subclass and internals hidden on one side only. A pair met again while it
/// is still being compared is part of a cycle and counts as equal.
fn generated_eq() -> EqFn {
    Rc::new(|this: &Record, other: &Value, guard: &mut CycleGuard| {
        let Value::Record(other) = other else {
            return false;
        };
        if this.is(other) {
            return true;
        }
        if !this.record_type().is_related(other.record_type()) {
            return false;
        }
        let pair = (this.addr(), other.addr());
        if !guard.enter_eq(pair) {
            return true;
        }
        let equal = items_eq(&this.visible_values(), &other.visible_values(), guard);
        guard.leave_eq(pair);
        equal
    })
}

/// Lexicographic `<` over the visible field values.
fn generated_lt() -> CmpFn {
    Rc::new(|this: &Record, other: &Value, guard: &mut CycleGuard| -> RecordResult<bool> {
        let unorderable = || ExcType::type_error_unorderable("<", this.record_type().name(), &other.type_name());
        let Value::Record(that) = other else {
            return Err(unorderable());
        };
        if !this.record_type().is_related(that.record_type()) {
            return Err(unorderable());
        }
        let pair = (this.addr(), that.addr());
        if !guard.enter_order(pair) {
            return Err(ExcType::recursion_error("comparing records"));
        }
        let ordering = cmp_items(&this.visible_values(), &that.visible_values(), guard);
        guard.leave_order(pair);
        match ordering? {
            Some(ordering) => Ok(ordering == Ordering::Less),
            None => Err(unorderable()),
        }
    })
}

fn derived(cmp: impl Fn(&Record, &Value, &mut CycleGuard) -> RecordResult<bool> + 'static) -> CmpFn {
    Rc::new(cmp)
}

/// Hash of the type combined with the values of the visible hashed fields.
///
/// A type without hashed fields hashes every instance to the same value. A
/// record reached again through its own hashed fields is a RecursionError.
fn generated_hash() -> HashFn {
    Rc::new(|this: &Record, guard: &mut CycleGuard| -> RecordResult<i64> {
        let addr = this.addr();
        if !guard.enter_hash(addr) {
            return Err(ExcType::recursion_error("hashing a record"));
        }
        let hash = hash_fields(this, guard);
        guard.leave_hash(addr);
        hash
    })
}

fn hash_fields(this: &Record, guard: &mut CycleGuard) -> RecordResult<i64> {
    let ty = this.record_type();
    let mut lanes = Vec::with_capacity(ty.hashed_indices().len() + 1);
    lanes.push(ty.type_hash());
    for &index in ty.hashed_indices() {
        lanes.push(this.slot(index).unwrap_or(Value::None).py_hash_with(guard)?);
    }
    Ok(hash_lanes(&lanes))
}

fn unhashable() -> HashFn {
    Rc::new(|this: &Record, _: &mut CycleGuard| -> RecordResult<i64> {
        Err(ExcType::type_error_unhashable(this.record_type().name()))
    })
}

fn generated_iter() -> IterFn {
    Rc::new(|this: &Record| -> RecordResult<FieldValues> { Ok(FieldValues::visible(this)) })
}

fn frozen_guard() -> SetAttrFn {
    Rc::new(|this: &Record, name: &str, deleting: bool| -> RecordResult<()> {
        let ty = this.record_type();
        if !ty.fields().contains(name) {
            return Ok(());
        }
        Err(if deleting {
            ExcType::frozen_instance_delete_error(ty.name(), name)
        } else {
            ExcType::frozen_instance_error(ty.name(), name)
        })
    })
}
