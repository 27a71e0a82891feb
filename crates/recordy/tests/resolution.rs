use pretty_assertions::assert_eq;
use recordy::{Args, ClassDecl, ExcType, Field, RecordType, TypeHint, Value, dataclass, resolver::resolve};

fn pet() -> RecordType {
    dataclass(
        ClassDecl::new("Pet")
            .field("name", "str")
            .field("species", "str")
            .field("fluffy", "bool")
            .field_with_default("foods", "Dict", Value::empty_dict()),
    )
    .unwrap()
}

fn names(ty: &RecordType) -> Vec<&str> {
    ty.fields().names().collect()
}

#[test]
fn pet_signature_order() {
    let pet = pet();
    assert_eq!(names(&pet), ["name", "species", "fluffy", "foods"]);
    assert_eq!(pet.signature(), "(name: str, species: str, fluffy: bool, foods: Dict = {})");
}

#[test]
fn subclass_required_field_moves_before_inherited_default() {
    let pet = pet();
    let hungry = dataclass(ClassDecl::new("HungryPet").base(&pet).field("hungry", "bool")).unwrap();
    assert_eq!(names(&hungry), ["name", "species", "fluffy", "hungry", "foods"]);
    assert_eq!(
        hungry.signature(),
        "(name: str, species: str, fluffy: bool, hungry: bool, foods: Dict = {})"
    );
    // the base table is untouched
    assert_eq!(names(&pet), ["name", "species", "fluffy", "foods"]);
}

#[test]
fn redeclared_field_keeps_first_position() {
    let base = dataclass(
        ClassDecl::new("Base")
            .field("a", "int")
            .field("b", "int")
            .field("c", "int"),
    )
    .unwrap();
    let sub = dataclass(ClassDecl::new("Sub").base(&base).field("d", "int").field("a", "str")).unwrap();
    assert_eq!(names(&sub), ["a", "b", "c", "d"]);
    assert_eq!(sub.fields().get("a").unwrap().hint(), &TypeHint::named("str"));
}

#[test]
fn redeclared_field_can_gain_or_lose_a_default() {
    let base = dataclass(
        ClassDecl::new("Base")
            .field("a", "int")
            .field_with_default("b", "int", Value::Int(1))
            .field_with_default("c", "int", Value::Int(2)),
    )
    .unwrap();

    let drops = dataclass(ClassDecl::new("Drops").base(&base).field("c", "int")).unwrap();
    assert_eq!(names(&drops), ["a", "c", "b"]);
    assert!(!drops.fields().get("c").unwrap().has_default());

    let gains = dataclass(ClassDecl::new("Gains").base(&base).field_with_default("a", "int", Value::Int(0))).unwrap();
    assert_eq!(names(&gains), ["a", "b", "c"]);
    assert_eq!(gains.fields().required_count(), 0);
}

#[test]
fn required_after_defaulted_in_base_is_legal() {
    let base = dataclass(ClassDecl::new("Base").field_with_default("x", "int", Value::Int(0))).unwrap();
    let sub = dataclass(ClassDecl::new("Sub").base(&base).field("y", "int")).unwrap();
    assert_eq!(names(&sub), ["y", "x"]);
    let instance = sub.construct(vec![Value::Int(5)]).unwrap();
    assert_eq!(instance.repr(), "Sub(y=5, x=0)");
}

#[test]
fn class_attributes_are_not_fields() {
    let ty = dataclass(ClassDecl::new("Counter").field("n", "int").attr("unit", "items")).unwrap();
    assert_eq!(names(&ty), ["n"]);
    let counter = ty.construct(vec![Value::Int(3)]).unwrap();
    assert_eq!(counter.get("unit").unwrap(), Value::str("items"));
    assert_eq!(counter.repr(), "Counter(n=3)");

    let sub = dataclass(ClassDecl::new("SubCounter").base(&ty)).unwrap();
    assert_eq!(sub.class_attr("unit"), Some(Value::str("items")));
}

#[test]
fn multiple_bases_merge_most_general_first() {
    let left = dataclass(ClassDecl::new("Left").field("a", "int").field("shared", "int")).unwrap();
    let right = dataclass(ClassDecl::new("Right").field("b", "int").field("shared", "str")).unwrap();
    let both = dataclass(ClassDecl::new("Both").base(&left).base(&right)).unwrap();
    let mro: Vec<&str> = both.mro().iter().map(RecordType::name).collect();
    assert_eq!(mro, ["Left", "Right"]);
    // Right is merged before Left, which comes first in the linearization and wins
    assert_eq!(names(&both), ["b", "shared", "a"]);
    assert_eq!(both.fields().get("shared").unwrap().hint().to_string(), "int");
}

#[test]
fn diamond_linearization() {
    let root = dataclass(ClassDecl::new("Root").field("r", "int")).unwrap();
    let left = dataclass(ClassDecl::new("Left").base(&root).field("l", "int")).unwrap();
    let right = dataclass(ClassDecl::new("Right").base(&root).field("x", "int")).unwrap();
    let bottom = dataclass(ClassDecl::new("Bottom").base(&left).base(&right)).unwrap();
    let mro: Vec<&str> = bottom.mro().iter().map(RecordType::name).collect();
    assert_eq!(mro, ["Left", "Right", "Root"]);
    assert_eq!(names(&bottom), ["r", "x", "l"]);
    assert!(bottom.is_subclass_of(&root));
    assert!(!root.is_subclass_of(&bottom));
    assert!(root.is_related(&bottom));
}

#[test]
fn diamond_keeps_the_nearer_override() {
    let root = dataclass(ClassDecl::new("Root").field_with_default("x", "int", Value::Int(0))).unwrap();
    let left = dataclass(ClassDecl::new("Left").base(&root).field_with_default("x", "int", Value::Int(1))).unwrap();
    let right = dataclass(ClassDecl::new("Right").base(&root).field_with_default("z", "int", Value::Int(2))).unwrap();
    let bottom = dataclass(ClassDecl::new("Bottom").base(&left).base(&right)).unwrap();

    // Root's x is merged first, then replaced by the nearer Left's declaration
    let x = bottom.fields().get("x").unwrap();
    assert_eq!(x.default().unwrap().materialize(), Value::Int(1));
    assert_eq!(names(&bottom), ["x", "z"]);
    assert_eq!(bottom.construct(Args::new()).unwrap().repr(), "Bottom(x=1, z=2)");

    // declaring the bases the other way round still lets Left's override win
    let flipped = dataclass(ClassDecl::new("Flipped").base(&right).base(&left)).unwrap();
    assert_eq!(flipped.construct(Args::new()).unwrap().repr(), "Flipped(x=1, z=2)");
}

#[test]
fn inconsistent_bases_fail() {
    let a = dataclass(ClassDecl::new("A")).unwrap();
    let b = dataclass(ClassDecl::new("B").base(&a)).unwrap();
    let err = dataclass(ClassDecl::new("C").base(&a).base(&b)).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);
    assert_eq!(
        err.message(),
        Some("Cannot create a consistent method resolution order (MRO) for bases A, B")
    );

    let err = dataclass(ClassDecl::new("D").base(&a).base(&a)).unwrap_err();
    assert_eq!(err.message(), Some("duplicate base class A"));
}

#[test]
fn identical_declarations_resolve_identically() {
    let own = [
        Field::new("a", "int").with_default(Value::Int(1)),
        Field::new("b", "List[int]"),
        Field::new("_c", "str"),
    ];
    assert_eq!(resolve("X", &own, &[]), resolve("Y", &own, &[]));
    assert_eq!(pet().fields(), pet().fields());
}

#[test]
fn internal_marker_in_text_annotation() {
    let ty = dataclass(
        ClassDecl::new("Cache")
            .field("key", "str")
            .field_with_default("store", "Internal[Dict[str, int]]", Value::empty_dict())
            .field_with_default("_hits", "int", Value::Int(0)),
    )
    .unwrap();
    let internal: Vec<&str> = ty
        .fields()
        .iter()
        .filter(|f| f.is_internal())
        .map(Field::name)
        .collect();
    assert_eq!(internal, ["store", "_hits"]);
    let cache = ty.construct(vec![Value::str("k")]).unwrap();
    assert_eq!(cache.repr(), "Cache(key='k')");
}
