use pretty_assertions::{assert_eq, assert_ne};
use recordy::{Args, ClassDecl, Decorator, ExcType, HashPolicy, OptionsPatch, RecordType, TypeHint, Value, dataclass};

fn build(patch: OptionsPatch, decl: ClassDecl) -> RecordType {
    Decorator::new().options(patch).apply(decl).unwrap()
}

#[test]
fn only_hashed_fields_contribute() {
    let keyed = build(
        OptionsPatch::new().unsafe_hash(true),
        ClassDecl::new("Keyed")
            .field("id", TypeHint::hashed("int"))
            .field("note", "str"),
    );
    let a = keyed.construct(Args::new().arg(1).arg("x")).unwrap();
    let b = keyed.construct(Args::new().arg(1).arg("y")).unwrap();
    let c = keyed.construct(Args::new().arg(2).arg("x")).unwrap();
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    assert_ne!(a.hash().unwrap(), c.hash().unwrap());
    // equality still looks at every visible field
    assert!(a.ne_value(&b.into()));
}

#[test]
fn hash_marker_in_text_annotation() {
    let ty = build(
        OptionsPatch::new().unsafe_hash(true),
        ClassDecl::new("Tagged").field("tag", "Hashed[str]"),
    );
    assert_eq!(ty.hashed_indices(), [0]);
    let a = ty.construct(vec![Value::str("a")]).unwrap();
    let b = ty.construct(vec![Value::str("b")]).unwrap();
    assert_ne!(a.hash().unwrap(), b.hash().unwrap());
}

#[test]
fn equal_types_hash_by_type_without_hashed_fields() {
    let decl = ClassDecl::new("Flag").field("on", "bool");
    let first = build(OptionsPatch::new().frozen(true), decl.clone());
    let second = build(OptionsPatch::new().frozen(true), decl);

    let on = first.construct(vec![Value::Bool(true)]).unwrap();
    let off = first.construct(vec![Value::Bool(false)]).unwrap();
    assert_eq!(on.hash().unwrap(), off.hash().unwrap());

    let elsewhere = second.construct(vec![Value::Bool(true)]).unwrap();
    assert_ne!(on.hash().unwrap(), elsewhere.hash().unwrap());
}

#[test]
fn eq_without_hash_is_unhashable() {
    let ty = dataclass(ClassDecl::new("Pet").field("name", "str")).unwrap();
    assert_eq!(ty.options().hash_policy(), HashPolicy::Unhashable);
    let err = ty.construct(vec![Value::str("Rex")]).unwrap().hash().unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);
    assert_eq!(err.message(), Some("unhashable type: 'Pet'"));

    let explicit = build(
        OptionsPatch::new().unsafe_hash(false).frozen(true),
        ClassDecl::new("Frozen").field("name", "str"),
    );
    assert!(explicit.construct(vec![Value::str("x")]).unwrap().hash().is_err());
}

#[test]
fn frozen_eq_gets_generated_hash() {
    let ty = build(
        OptionsPatch::new().frozen(true),
        ClassDecl::new("Point")
            .field("x", TypeHint::hashed("int"))
            .field("y", TypeHint::hashed("int")),
    );
    assert_eq!(ty.options().hash_policy(), HashPolicy::Generated);
    let a = ty.construct(vec![Value::Int(1), Value::Int(2)]).unwrap();
    let b = ty.construct(vec![Value::Int(1), Value::Int(2)]).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    assert_eq!(Value::from(a).py_hash().unwrap(), Value::from(b).py_hash().unwrap());
}

#[test]
fn identity_hash_without_eq() {
    let ty = build(OptionsPatch::new().eq(false), ClassDecl::new("Handle").field("id", "int"));
    assert_eq!(ty.options().hash_policy(), HashPolicy::Identity);
    let h = ty.construct(vec![Value::Int(1)]).unwrap();
    assert_eq!(h.hash().unwrap(), h.clone().hash().unwrap());
}

#[test]
fn internal_fields_hidden_from_hash() {
    let decl = ClassDecl::new("Entry")
        .field("key", TypeHint::hashed("str"))
        .field_with_default("_rev", TypeHint::hashed("int"), Value::Int(0));

    let hidden = build(OptionsPatch::new().unsafe_hash(true), decl.clone());
    assert_eq!(hidden.hashed_indices(), [0]);
    let a = hidden.construct(Args::new().arg("k").kwarg("_rev", 1)).unwrap();
    let b = hidden.construct(Args::new().arg("k").kwarg("_rev", 2)).unwrap();
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());

    let shown = build(OptionsPatch::new().unsafe_hash(true).hide_internals(false), decl);
    assert_eq!(shown.hashed_indices(), [0, 1]);
    let a = shown.construct(Args::new().arg("k").kwarg("_rev", 1)).unwrap();
    let b = shown.construct(Args::new().arg("k").kwarg("_rev", 2)).unwrap();
    assert_ne!(a.hash().unwrap(), b.hash().unwrap());
}

#[test]
fn unhashable_field_value_fails() {
    let ty = build(
        OptionsPatch::new().unsafe_hash(true),
        ClassDecl::new("Bag").field("items", TypeHint::hashed("list")),
    );
    let bag = ty.construct(vec![Value::empty_list()]).unwrap();
    assert_eq!(bag.hash().unwrap_err().message(), Some("unhashable type: 'list'"));
}

#[test]
fn nested_records_hash_through_their_type() {
    let inner = build(
        OptionsPatch::new().frozen(true),
        ClassDecl::new("Inner").field("v", TypeHint::hashed("int")),
    );
    let outer = build(
        OptionsPatch::new().frozen(true),
        ClassDecl::new("Outer").field("inner", TypeHint::hashed("Inner")),
    );
    let make = |v: i64| {
        let i = inner.construct(vec![Value::Int(v)]).unwrap();
        outer.construct(vec![Value::from(i)]).unwrap()
    };
    assert_eq!(make(1).hash().unwrap(), make(1).hash().unwrap());
    assert_ne!(make(1).hash().unwrap(), make(2).hash().unwrap());
}

#[test]
fn user_defined_hash_is_kept() {
    let ty = build(
        OptionsPatch::new().frozen(true),
        ClassDecl::new("Constant").field("x", "int").with_hash(|_| Ok(42)),
    );
    assert_eq!(ty.construct(vec![Value::Int(7)]).unwrap().hash().unwrap(), 42);
}

#[test]
fn self_referencing_record_hash_is_a_recursion_error() {
    let node = build(
        OptionsPatch::new().unsafe_hash(true),
        ClassDecl::new("Node")
            .field("id", TypeHint::hashed("int"))
            .field_with_default("next", TypeHint::hashed("Optional[Node]"), Value::None),
    );
    let a = node.construct(vec![Value::Int(1)]).unwrap();
    let b = node.construct(vec![Value::Int(1)]).unwrap();
    a.set("next", a.clone()).unwrap();
    b.set("next", b.clone()).unwrap();

    let err = a.hash().unwrap_err();
    assert_eq!(err.exc_type(), ExcType::RecursionError);
    assert_eq!(err.message(), Some("maximum recursion depth exceeded while hashing a record"));
    assert!(Value::from(b.clone()).py_hash().is_err());
    // equality on the same cycles still terminates
    assert_eq!(a, b);

    // breaking the cycle makes both hashable again, and equal hashes follow equality
    a.set("next", Value::None).unwrap();
    b.set("next", Value::None).unwrap();
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());
}
