use criterion::{Bencher, Criterion, black_box, criterion_group, criterion_main};
use recordy::{Args, ClassDecl, Decorator, OptionsPatch, RecordType, TypeHint, Value, dataclass};

fn simple() -> RecordType {
    dataclass(ClassDecl::new("Point").field("x", "int").field("y", "int")).unwrap()
}

fn with_defaults() -> RecordType {
    dataclass(
        ClassDecl::new("Pet")
            .field("name", "str")
            .field_with_default("age", "int", Value::Int(1))
            .field_with_default("foods", "List[str]", Value::empty_list())
            .field_with_default("owners", "Dict[str, str]", Value::empty_dict()),
    )
    .unwrap()
}

fn frozen_hashed() -> RecordType {
    Decorator::new()
        .options(OptionsPatch::new().frozen(true))
        .apply(
            ClassDecl::new("Key")
                .field("scope", TypeHint::hashed("str"))
                .field("id", TypeHint::hashed("int")),
        )
        .unwrap()
}

/// Constructs one instance per iteration after checking the repr once.
fn run_construct(bench: &mut Bencher, ty: &RecordType, args: &Args, expected: &str) {
    let record = ty.construct(args.clone()).unwrap();
    assert_eq!(record.repr(), expected);

    bench.iter(|| {
        let record = ty.construct(black_box(args.clone())).unwrap();
        black_box(record);
    });
}

fn criterion_benchmark(c: &mut Criterion) {
    let point = simple();
    let point_args = Args::new().arg(1).arg(2);
    c.bench_function("construct_simple", |b| {
        run_construct(b, &point, &point_args, "Point(x=1, y=2)");
    });

    let pet = with_defaults();
    let pet_args = Args::new().arg("Rex");
    c.bench_function("construct_copied_defaults", |b| {
        run_construct(b, &pet, &pet_args, "Pet(name='Rex', age=1, foods=[], owners={})");
    });

    let keyword_args = Args::new().kwarg("age", 4).kwarg("name", "Rex");
    c.bench_function("construct_keywords", |b| {
        run_construct(b, &pet, &keyword_args, "Pet(name='Rex', age=4, foods=[], owners={})");
    });

    let key = frozen_hashed();
    let record = key.construct(Args::new().arg("users").arg(42)).unwrap();
    c.bench_function("hash_generated", |b| {
        b.iter(|| black_box(record.hash().unwrap()));
    });

    c.bench_function("define_subclass", |b| {
        b.iter(|| {
            let sub = dataclass(ClassDecl::new("Dog").base(&pet).field("good", "bool")).unwrap();
            black_box(sub);
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
