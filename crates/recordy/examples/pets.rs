use recordy::{
    Args, ClassDecl, Decorator, OptionsPatch, PostInit, PostInitArgs, Record, StderrTracer, TypeHint, Value, as_dict,
    dataclass, replace,
};

fn main() {
    // --- Declaring a type ---
    let pet = dataclass(
        ClassDecl::new("Pet")
            .field("name", "str")
            .field("species", "str")
            .field("fluffy", "bool")
            .field_with_default("foods", "Dict", Value::empty_dict()),
    )
    .unwrap();
    println!("Pet{}", pet.signature()); // Pet(name: str, species: str, fluffy: bool, foods: Dict = {})

    let rex = pet
        .construct(Args::new().arg("Rex").arg("dog").arg(true))
        .unwrap();
    println!("{rex}"); // Pet(name='Rex', species='dog', fluffy=True, foods={})

    // --- Inheritance: required fields move ahead of inherited defaults ---
    let mut traced = Decorator::new().with_tracer(StderrTracer::new());
    let hungry = traced
        .apply(ClassDecl::new("HungryPet").base(&pet).field("hungry", "bool"))
        .unwrap();
    println!("HungryPet{}", hungry.signature());

    // --- Frozen, hashed, with a post-init hook ---
    let mut frozen = Decorator::new().options(OptionsPatch::new().frozen(true));
    let tag = frozen
        .apply(
            ClassDecl::new("Tag")
                .field("key", TypeHint::hashed("str"))
                .field("note", "str")
                .post_init(
                    PostInit::new(|record: &Record, args: PostInitArgs| {
                        if args.get("loud").is_some_and(|v| *v == Value::Bool(true)) {
                            record.set("shout", format!("{}!", record.get("key")?))?;
                        }
                        Ok(())
                    })
                    .kw_only_with_default("loud", false),
                ),
        )
        .unwrap();
    println!("Tag{}", tag.signature()); // Tag(key: str, note: str, *, loud=False)

    let a = tag
        .construct(Args::new().arg("colour").arg("red").kwarg("loud", true))
        .unwrap();
    let b = replace(&a, [("note".to_owned(), Value::str("blue"))].into_iter().collect()).unwrap();
    assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    println!("{} {}", a.get("shout").unwrap(), a.set("key", "size").unwrap_err());

    println!("{}", as_dict(&a).unwrap()); // {'key': 'colour', 'note': 'red'}
}
