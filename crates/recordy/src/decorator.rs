//! The definition entry point.

use std::rc::Rc;

use crate::{
    class::{ClassDecl, RecordMeta, RecordType},
    exception::RecordResult,
    options::OptionsPatch,
    tracer::{DefinitionTracer, NoopTracer},
};

/// Builds record types from declarations.
///
/// Holds the explicitly given options, an optional build customisation and a
/// tracer. One decorator can build any number of types:
///
/// ```
/// use recordy::{ClassDecl, Decorator, OptionsPatch, Value};
///
/// let mut decorator = Decorator::new().options(OptionsPatch::new().frozen(true));
/// let point = decorator
///     .apply(ClassDecl::new("Point").field("x", "int").field("y", "int"))
///     .unwrap();
/// let p = point.construct(vec![Value::Int(1), Value::Int(2)]).unwrap();
/// assert_eq!(p.repr(), "Point(x=1, y=2)");
/// assert!(p.set("x", 5).is_err());
/// ```
#[derive(Debug)]
pub struct Decorator<Tr: DefinitionTracer = NoopTracer> {
    patch: OptionsPatch,
    meta: Option<Rc<dyn RecordMeta>>,
    tracer: Tr,
}

impl Decorator<NoopTracer> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patch: OptionsPatch::default(),
            meta: None,
            tracer: NoopTracer,
        }
    }
}

impl Default for Decorator<NoopTracer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tr: DefinitionTracer> Decorator<Tr> {
    /// Sets the options given explicitly; unset flags are inherited from bases.
    #[must_use]
    pub fn options(mut self, patch: OptionsPatch) -> Self {
        self.patch = patch;
        self
    }

    /// Uses a custom build behaviour instead of the one inherited from the first base.
    #[must_use]
    pub fn meta(mut self, meta: impl RecordMeta + 'static) -> Self {
        self.meta = Some(Rc::new(meta));
        self
    }

    /// Replaces the tracer.
    #[must_use]
    pub fn with_tracer<T: DefinitionTracer>(self, tracer: T) -> Decorator<T> {
        Decorator {
            patch: self.patch,
            meta: self.meta,
            tracer,
        }
    }

    #[must_use]
    pub fn tracer(&self) -> &Tr {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut Tr {
        &mut self.tracer
    }

    #[must_use]
    pub fn into_tracer(self) -> Tr {
        self.tracer
    }

    /// Builds a record type.
    ///
    /// Fails with a TypeError when the bases cannot be linearized and with an
    /// InitSignatureError when the post-init hook conflicts with the fields.
    pub fn apply(&mut self, decl: ClassDecl) -> RecordResult<RecordType> {
        RecordType::build(decl, None, &self.patch, self.meta.clone(), &mut self.tracer)
    }

    /// Rebuilds an existing type with this decorator's options applied over its own.
    pub fn reapply(&mut self, ty: &RecordType) -> RecordResult<RecordType> {
        ty.redecorate_traced(&self.patch, &mut self.tracer)
    }
}

/// Builds a record type with default options.
pub fn dataclass(decl: ClassDecl) -> RecordResult<RecordType> {
    Decorator::new().apply(decl)
}
