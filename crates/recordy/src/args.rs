//! Construction arguments and the post-init hook.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    exception::{ExcType, RecordResult},
    field::FieldTable,
    record::Record,
    value::Value,
};

/// Arguments passed to a record constructor.
#[derive(Debug, Clone, Default)]
pub struct Args {
    positional: Vec<Value>,
    keywords: IndexMap<String, Value>,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword-only arguments.
    #[must_use]
    pub fn from_keywords(keywords: IndexMap<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            keywords,
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a keyword argument; a repeated name replaces the earlier value.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    #[must_use]
    pub fn keywords(&self) -> &IndexMap<String, Value> {
        &self.keywords
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Value>, IndexMap<String, Value>) {
        (self.positional, self.keywords)
    }
}

impl From<Vec<Value>> for Args {
    fn from(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: IndexMap::new(),
        }
    }
}

/// Signature of a post-init hook body.
pub type PostInitFn = Rc<dyn Fn(&Record, PostInitArgs) -> RecordResult<()>>;

/// A user hook run after the generated constructor assigned every field.
///
/// Construction arguments that do not bind to a field are routed to the hook's
/// parameters: positional leftovers fill its positional parameters in order,
/// keyword leftovers match parameters by name. `*args`/`**kwargs` captures take
/// whatever remains. The parameter list is checked against the field table when
/// the record type is built, so a conflict fails the definition, not a construction.
#[derive(Clone)]
pub struct PostInit {
    params: Vec<HookParam>,
    kw_only: Vec<HookParam>,
    var_args: bool,
    var_kwargs: bool,
    func: PostInitFn,
}

#[derive(Debug, Clone)]
struct HookParam {
    name: String,
    default: Option<Value>,
}

impl HookParam {
    fn render(&self) -> String {
        match &self.default {
            Some(default) => format!("{}={}", self.name, default.py_repr()),
            None => self.name.clone(),
        }
    }
}

impl PostInit {
    /// A hook without parameters.
    pub fn new(func: impl Fn(&Record, PostInitArgs) -> RecordResult<()> + 'static) -> Self {
        Self {
            params: Vec::new(),
            kw_only: Vec::new(),
            var_args: false,
            var_kwargs: false,
            func: Rc::new(func),
        }
    }

    /// Adds a required positional-or-keyword parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(HookParam {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Adds a positional-or-keyword parameter with a default.
    #[must_use]
    pub fn param_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(HookParam {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Adds a required keyword-only parameter.
    #[must_use]
    pub fn kw_only(mut self, name: impl Into<String>) -> Self {
        self.kw_only.push(HookParam {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Adds a keyword-only parameter with a default.
    #[must_use]
    pub fn kw_only_with_default(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.kw_only.push(HookParam {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Captures surplus positional arguments.
    #[must_use]
    pub fn var_args(mut self) -> Self {
        self.var_args = true;
        self
    }

    /// Captures surplus keyword arguments.
    #[must_use]
    pub fn var_kwargs(mut self) -> Self {
        self.var_kwargs = true;
        self
    }

    /// Parameter names in declaration order, positional first.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().chain(&self.kw_only).map(|p| p.name.as_str())
    }

    /// Checks the parameter list against the resolved field table.
    pub(crate) fn validate(&self, class_name: &str, table: &FieldTable) -> RecordResult<()> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.params.len() + self.kw_only.len());
        for name in self.param_names() {
            if table.contains(name) {
                return Err(ExcType::init_signature_field_collision(class_name, name));
            }
            if seen.contains(&name) {
                return Err(ExcType::init_signature_duplicate(class_name, name));
            }
            seen.push(name);
        }
        // a surplus positional argument could fill a defaulted field or a hook parameter
        if let (Some(param), Some(field)) = (self.params.first(), table.first_defaulted()) {
            return Err(ExcType::init_signature_ambiguous(class_name, &param.name, field.name()));
        }
        Ok(())
    }

    /// Binds the arguments left over after field binding.
    ///
    /// `field_count` and `given_positional` only feed the too-many-positional message.
    pub(crate) fn bind(
        &self,
        class_name: &str,
        surplus_positional: Vec<Value>,
        surplus_keywords: IndexMap<String, Value>,
        absorb_keywords: bool,
        field_count: usize,
    ) -> RecordResult<PostInitArgs> {
        let given_positional = field_count + surplus_positional.len();
        let mut bound = PostInitArgs::default();
        let mut positional = surplus_positional.into_iter();

        for (param, value) in self.params.iter().zip(positional.by_ref()) {
            bound.named.insert(param.name.clone(), value);
        }
        let rest: Vec<Value> = positional.collect();
        if !rest.is_empty() {
            if !self.var_args {
                return Err(ExcType::type_error_too_many_positional(
                    class_name,
                    field_count + self.params.len(),
                    given_positional,
                ));
            }
            bound.var_args = rest;
        }

        for (key, value) in surplus_keywords {
            let is_param = self.params.iter().chain(&self.kw_only).any(|p| p.name == key);
            if is_param {
                if bound.named.contains_key(&key) {
                    return Err(ExcType::type_error_multiple_values(class_name, &key));
                }
                bound.named.insert(key, value);
            } else if self.var_kwargs {
                bound.var_kwargs.insert(key, value);
            } else if !absorb_keywords {
                return Err(ExcType::type_error_unexpected_keyword(class_name, &key));
            }
        }

        let mut missing: Vec<&str> = Vec::new();
        for param in self.params.iter().chain(&self.kw_only) {
            if bound.named.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    bound.named.insert(param.name.clone(), default.clone());
                }
                None => missing.push(&param.name),
            }
        }
        if !missing.is_empty() {
            return Err(ExcType::type_error_missing_positional_with_names(class_name, &missing));
        }
        Ok(bound)
    }

    pub(crate) fn call(&self, record: &Record, args: PostInitArgs) -> RecordResult<()> {
        (self.func)(record, args)
    }

    /// Rendered parameters appended to the constructor signature.
    #[must_use]
    pub fn signature_parts(&self) -> Vec<String> {
        let mut parts: Vec<String> = self.params.iter().map(HookParam::render).collect();
        if self.var_args {
            parts.push("*args".to_owned());
        } else if !self.kw_only.is_empty() {
            parts.push("*".to_owned());
        }
        parts.extend(self.kw_only.iter().map(HookParam::render));
        if self.var_kwargs {
            parts.push("**kwargs".to_owned());
        }
        parts
    }
}

impl fmt::Debug for PostInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostInit({})", self.signature_parts().join(", "))
    }
}

/// Arguments bound to a post-init hook's parameters.
#[derive(Debug, Clone, Default)]
pub struct PostInitArgs {
    named: IndexMap<String, Value>,
    var_args: Vec<Value>,
    var_kwargs: IndexMap<String, Value>,
}

impl PostInitArgs {
    /// Value bound to a declared parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Removes and returns the value bound to a declared parameter.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.named.shift_remove(name)
    }

    #[must_use]
    pub fn var_args(&self) -> &[Value] {
        &self.var_args
    }

    #[must_use]
    pub fn var_kwargs(&self) -> &IndexMap<String, Value> {
        &self.var_kwargs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field::Field, resolver::resolve};

    fn table(fields: &[Field]) -> FieldTable {
        resolve("T", fields, &[])
    }

    fn noop(_: &Record, _: PostInitArgs) -> RecordResult<()> {
        Ok(())
    }

    #[test]
    fn collision_with_field_fails_validation() {
        let hook = PostInit::new(noop).param("a");
        let err = hook.validate("T", &table(&[Field::new("a", "int")])).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::InitSignatureError);
        assert!(err.is(ExcType::TypeError));
    }

    #[test]
    fn positional_param_with_defaulted_field_is_ambiguous() {
        let fields = [Field::new("a", "int"), Field::new("b", "int").with_default(Value::Int(0))];
        let err = PostInit::new(noop).param("c").validate("T", &table(&fields)).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::InitSignatureError);

        // keyword-only parameters cannot compete for positions
        PostInit::new(noop).kw_only("c").validate("T", &table(&fields)).unwrap();
    }

    #[test]
    fn surplus_arguments_route_to_hook() {
        let hook = PostInit::new(noop).param("c").var_args().var_kwargs();
        let mut keywords = IndexMap::new();
        keywords.insert("extra".to_owned(), Value::Int(9));
        let mut bound = hook
            .bind("T", vec![Value::Int(1), Value::Int(2)], keywords, false, 1)
            .unwrap();
        assert_eq!(bound.take("c"), Some(Value::Int(1)));
        assert_eq!(bound.var_args(), [Value::Int(2)]);
        assert_eq!(bound.var_kwargs().get("extra"), Some(&Value::Int(9)));
    }

    #[test]
    fn missing_hook_parameter() {
        let hook = PostInit::new(noop).kw_only("c");
        let err = hook.bind("T", Vec::new(), IndexMap::new(), false, 1).unwrap_err();
        assert_eq!(err.message(), Some("T() missing 1 required positional argument: 'c'"));
    }

    #[test]
    fn signature_rendering() {
        let hook = PostInit::new(noop).param("c").kw_only_with_default("d", Value::Int(1)).var_kwargs();
        assert_eq!(hook.signature_parts(), ["c", "*", "d=1", "**kwargs"]);
    }
}
