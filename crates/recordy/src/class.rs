//! Record type declarations and built record types.
//!
//! A [`ClassDecl`] is what the user writes: a name, bases, annotated fields,
//! plain class attributes, and optionally user-defined operations and a
//! post-init hook. Building it (through a [`Decorator`](crate::Decorator))
//! resolves the field table, resolves options, and synthesizes operations,
//! producing an immutable [`RecordType`].

use std::{
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use indexmap::IndexMap;

use crate::{
    args::{Args, PostInit},
    exception::{ExcType, RecordResult},
    field::{Field, FieldDefault, FieldTable},
    hint::TypeHint,
    options::{OptionsPatch, RecordOptions},
    py_hash::{hash_int, hash_lanes, hash_str},
    record::{FieldValues, Record},
    resolver::{compute_c3_mro, resolve_traced},
    synth::{self, CmpFn, Methods, SynthContext},
    tracer::DefinitionTracer,
    value::{CycleGuard, ReprGuard, Value},
};

static NEXT_TYPE_UID: AtomicU64 = AtomicU64::new(1);

/// Hook points for customising how record types are built.
///
/// The default methods resolve fields and synthesize operations the standard
/// way. A type built with a custom meta passes it on to every subclass that
/// does not name its own.
pub trait RecordMeta: fmt::Debug {
    /// Builds the field table from the ancestors' own declarations, most
    /// general first, and the class's declaration.
    fn resolve(&self, decl: &ClassDecl, ancestors: &[&[Field]], tracer: &mut dyn DefinitionTracer) -> FieldTable {
        resolve_traced(decl.name(), decl.fields(), ancestors, tracer)
    }

    /// Builds the type's operations.
    fn synthesize(&self, ctx: &SynthContext<'_>, tracer: &mut dyn DefinitionTracer) -> RecordResult<Methods> {
        synth::synthesize(ctx, tracer)
    }
}

/// The standard build behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMeta;

impl RecordMeta for DefaultMeta {}

/// A record type declaration.
#[derive(Debug, Clone, Default)]
pub struct ClassDecl {
    name: String,
    bases: Vec<RecordType>,
    fields: Vec<Field>,
    attrs: IndexMap<String, Value>,
    methods: Methods,
    post_init: Option<PostInit>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a direct base. Fields merge along the linearized ancestors; options
    /// come from the last base added.
    #[must_use]
    pub fn base(mut self, base: &RecordType) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Declares a required field.
    #[must_use]
    pub fn field(self, name: impl Into<String>, hint: impl Into<TypeHint>) -> Self {
        self.push_field(Field::new(name, hint))
    }

    /// Declares a field with a default.
    ///
    /// A mutable container default is copied per construction; see [`FieldDefault::value`].
    #[must_use]
    pub fn field_with_default(
        self,
        name: impl Into<String>,
        hint: impl Into<TypeHint>,
        default: impl Into<FieldDefault>,
    ) -> Self {
        self.push_field(Field::new(name, hint).with_default(default))
    }

    /// Declares a field whose default is produced per construction.
    #[must_use]
    pub fn field_with_factory(
        self,
        name: impl Into<String>,
        hint: impl Into<TypeHint>,
        produce: impl Fn() -> Value + 'static,
    ) -> Self {
        self.push_field(Field::new(name, hint).with_factory(produce))
    }

    /// Declares a field; redeclaring a name replaces the earlier declaration.
    #[must_use]
    pub fn push_field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Adds an unannotated class attribute. It is not a field.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn post_init(mut self, hook: PostInit) -> Self {
        self.post_init = Some(hook);
        self
    }

    /// User-defined constructor; replaces the generated one.
    #[must_use]
    pub fn with_init(mut self, init: impl Fn(&Record, Args) -> RecordResult<()> + 'static) -> Self {
        self.methods.init = Some(Rc::new(init));
        self
    }

    #[must_use]
    pub fn with_repr(mut self, repr: impl Fn(&Record) -> String + 'static) -> Self {
        self.methods.repr = Some(Rc::new(move |record: &Record, _: &mut ReprGuard| repr(record)));
        self
    }

    #[must_use]
    pub fn with_eq(mut self, eq: impl Fn(&Record, &Value) -> bool + 'static) -> Self {
        self.methods.eq = Some(Rc::new(move |record: &Record, other: &Value, _: &mut CycleGuard| eq(record, other)));
        self
    }

    #[must_use]
    pub fn with_lt(mut self, lt: impl Fn(&Record, &Value) -> RecordResult<bool> + 'static) -> Self {
        self.methods.lt = Some(ordering(lt));
        self
    }

    #[must_use]
    pub fn with_le(mut self, le: impl Fn(&Record, &Value) -> RecordResult<bool> + 'static) -> Self {
        self.methods.le = Some(ordering(le));
        self
    }

    #[must_use]
    pub fn with_gt(mut self, gt: impl Fn(&Record, &Value) -> RecordResult<bool> + 'static) -> Self {
        self.methods.gt = Some(ordering(gt));
        self
    }

    #[must_use]
    pub fn with_ge(mut self, ge: impl Fn(&Record, &Value) -> RecordResult<bool> + 'static) -> Self {
        self.methods.ge = Some(ordering(ge));
        self
    }

    #[must_use]
    pub fn with_hash(mut self, hash: impl Fn(&Record) -> RecordResult<i64> + 'static) -> Self {
        self.methods.hash = Some(Rc::new(move |record: &Record, _: &mut CycleGuard| hash(record)));
        self
    }

    /// User-defined iteration over the values `iter` returns.
    #[must_use]
    pub fn with_iter(mut self, iter: impl Fn(&Record) -> RecordResult<Vec<Value>> + 'static) -> Self {
        self.methods.iter = Some(Rc::new(move |record: &Record| -> RecordResult<FieldValues> {
            Ok(FieldValues::from_values(iter(record)?))
        }));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct bases in declaration order.
    #[must_use]
    pub fn bases(&self) -> &[RecordType] {
        &self.bases
    }

    /// Own declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn attrs(&self) -> &IndexMap<String, Value> {
        &self.attrs
    }
}

fn ordering(cmp: impl Fn(&Record, &Value) -> RecordResult<bool> + 'static) -> CmpFn {
    Rc::new(move |record: &Record, other: &Value, _: &mut CycleGuard| cmp(record, other))
}

/// A built record type. Cloning shares the type.
#[derive(Clone)]
pub struct RecordType(Rc<TypeInner>);

struct TypeInner {
    uid: u64,
    decl: ClassDecl,
    /// Linearized ancestors, nearest first, excluding this type.
    mro: Vec<RecordType>,
    table: FieldTable,
    visible: Vec<usize>,
    hashed: Vec<usize>,
    options: RecordOptions,
    meta: Rc<dyn RecordMeta>,
    methods: Methods,
    post_init: Option<PostInit>,
}

impl RecordType {
    /// Builds a type from its declaration.
    ///
    /// `inherited` replaces the options otherwise taken from the bases.
    pub(crate) fn build(
        decl: ClassDecl,
        inherited: Option<RecordOptions>,
        patch: &OptionsPatch,
        meta: Option<Rc<dyn RecordMeta>>,
        tracer: &mut dyn DefinitionTracer,
    ) -> RecordResult<Self> {
        let mro = compute_c3_mro(&decl.bases)?;
        // each base carries fully resolved options, so the last one wins outright
        let options = inherited
            .or_else(|| decl.bases.last().map(Self::options))
            .unwrap_or_default()
            .patched(patch);
        let meta = meta
            .or_else(|| decl.bases.first().map(|base| Rc::clone(&base.0.meta)))
            .unwrap_or_else(|| Rc::new(DefaultMeta));

        // most general ancestor first, so a nearer override lands last
        let ancestor_fields: Vec<&[Field]> = mro
            .iter()
            .rev()
            .map(|ancestor| ancestor.declaration().fields())
            .collect();
        let table = meta.resolve(&decl, &ancestor_fields, tracer);

        let post_init = decl
            .post_init
            .clone()
            .or_else(|| mro.iter().find_map(|ancestor| ancestor.0.post_init.clone()));

        let methods = meta.synthesize(
            &SynthContext {
                class_name: decl.name(),
                table: &table,
                options,
                user_methods: &decl.methods,
                post_init: post_init.as_ref(),
            },
            tracer,
        )?;

        let visible = table.visible_indices(options.hide_internals).to_vec();
        let hashed = table.hashed_indices(options.hide_internals).to_vec();
        Ok(Self(Rc::new(TypeInner {
            uid: NEXT_TYPE_UID.fetch_add(1, Ordering::Relaxed),
            decl,
            mro,
            table,
            visible,
            hashed,
            options,
            meta,
            methods,
            post_init,
        })))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.0.decl.name()
    }

    /// Process-unique identifier of this type.
    #[must_use]
    pub fn uid(&self) -> u64 {
        self.0.uid
    }

    #[must_use]
    pub fn bases(&self) -> &[RecordType] {
        self.0.decl.bases()
    }

    /// Linearized ancestors, nearest first, excluding this type.
    #[must_use]
    pub fn mro(&self) -> &[RecordType] {
        &self.0.mro
    }

    /// The resolved field table.
    #[must_use]
    pub fn fields(&self) -> &FieldTable {
        &self.0.table
    }

    #[must_use]
    pub fn options(&self) -> RecordOptions {
        self.0.options
    }

    #[must_use]
    pub fn declaration(&self) -> &ClassDecl {
        &self.0.decl
    }

    #[must_use]
    pub fn meta(&self) -> &dyn RecordMeta {
        self.0.meta.as_ref()
    }

    #[must_use]
    pub fn post_init_hook(&self) -> Option<&PostInit> {
        self.0.post_init.as_ref()
    }

    /// Operations instances dispatch to.
    #[must_use]
    pub fn methods(&self) -> &Methods {
        &self.0.methods
    }

    /// Table positions of the fields repr, eq, order and iteration use.
    #[must_use]
    pub fn visible_indices(&self) -> &[usize] {
        &self.0.visible
    }

    /// Table positions of the fields the generated hash uses.
    #[must_use]
    pub fn hashed_indices(&self) -> &[usize] {
        &self.0.hashed
    }

    /// True if `other` is this type or one of its ancestors.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Self) -> bool {
        self.uid() == other.uid() || self.0.mro.iter().any(|ancestor| ancestor.uid() == other.uid())
    }

    /// True if either type inherits from the other.
    #[must_use]
    pub fn is_related(&self, other: &Self) -> bool {
        self.is_subclass_of(other) || other.is_subclass_of(self)
    }

    /// Looks up an unannotated class attribute on this type, then along the MRO.
    #[must_use]
    pub fn class_attr(&self, name: &str) -> Option<Value> {
        std::iter::once(self)
            .chain(&self.0.mro)
            .find_map(|ty| ty.0.decl.attrs.get(name).cloned())
    }

    /// Hash identifying the type; combined into generated instance hashes.
    #[must_use]
    pub fn type_hash(&self) -> i64 {
        let uid = i64::try_from(self.uid()).unwrap_or(i64::MAX);
        hash_lanes(&[hash_str(self.name()), hash_int(uid)])
    }

    /// Creates an instance.
    ///
    /// Without a constructor the instance takes no arguments: defaulted fields
    /// receive their defaults and required fields stay unset.
    pub fn construct(&self, args: impl Into<Args>) -> RecordResult<Record> {
        let args = args.into();
        let record = Record::allocate(self);
        match &self.0.methods.init {
            Some(init) => init(&record, args)?,
            None => {
                if !args.is_empty() {
                    return Err(ExcType::type_error_no_args(self.name(), args.len()));
                }
                for (index, field) in self.0.table.iter().enumerate() {
                    if let Some(default) = field.default() {
                        record.init_slot(index, Some(default.materialize()));
                    }
                }
            }
        }
        record.seal();
        Ok(record)
    }

    /// Rendered constructor parameters, e.g. `(name: str, age: int = 3)`.
    #[must_use]
    pub fn signature(&self) -> String {
        let extra = match (&self.0.post_init, self.0.options.init) {
            (Some(hook), true) => hook.signature_parts(),
            _ if self.0.options.kwargs => vec!["**kwargs".to_owned()],
            _ => Vec::new(),
        };
        self.0.table.signature(&extra)
    }

    /// Rebuilds the type from its declaration with `patch` applied over its
    /// resolved options. The original type is unchanged.
    pub fn redecorate(&self, patch: &OptionsPatch) -> RecordResult<Self> {
        Self::redecorate_traced(self, patch, &mut crate::tracer::NoopTracer)
    }

    pub(crate) fn redecorate_traced(&self, patch: &OptionsPatch, tracer: &mut dyn DefinitionTracer) -> RecordResult<Self> {
        Self::build(
            self.0.decl.clone(),
            Some(self.options()),
            patch,
            Some(Rc::clone(&self.0.meta)),
            tracer,
        )
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.uid() == other.uid()
    }
}

impl Eq for RecordType {}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<record type '{}'>", self.name())
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
