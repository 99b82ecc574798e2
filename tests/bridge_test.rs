mod common;

use agora::bridge::{CacheKey, HostValue, Level};
use agora::error::ErrorKind;
use agora::pattern::Pattern;

use common::{eval, Point};


#[test]
fn primitives_round_trip() {
    let mut universe = common::setup().unwrap();

    let values = vec![
        HostValue::Nil,
        HostValue::Boolean(true),
        HostValue::Integer(42),
        HostValue::Float(2.5),
        HostValue::Text("hi".to_string()),
        HostValue::Package("geometry".to_string()),
        HostValue::Class("Point".to_string()),
    ];
    for value in values {
        let up = universe.up(value.clone()).unwrap();
        assert_eq!(up.down().unwrap(), value);
        assert_eq!(universe.up(up.down().unwrap()).unwrap(), up);
    }
}

#[test]
fn generators_are_shared_per_class() {
    let mut universe = common::setup().unwrap();

    let one = universe.up(HostValue::Integer(1)).unwrap();
    let two = universe.up(HostValue::Integer(2)).unwrap();
    assert_eq!(one.generator(), two.generator());

    let yes = universe.up(HostValue::Boolean(true)).unwrap();
    assert_ne!(one.generator(), yes.generator());
    assert_eq!(
        universe
            .bridge()
            .cached(&CacheKey::new("Integer", Level::Instance)),
        Some(one.generator())
    );

    let before = universe.bridge().cache_len();
    universe.up(HostValue::Integer(3)).unwrap();
    assert_eq!(universe.bridge().cache_len(), before);
}

#[test]
fn truth_values_have_their_own_generators() {
    let mut universe = common::setup().unwrap();

    let yes = universe.up(HostValue::Boolean(true)).unwrap();
    let no = universe.up(HostValue::Boolean(false)).unwrap();
    assert_ne!(yes.generator(), no.generator());

    let boolean = universe
        .class_generator("Boolean", Level::Instance)
        .unwrap();
    let heap = universe.heap();
    assert_eq!(heap.get(yes.generator()).unwrap().parent(), Some(boolean));
    assert_eq!(heap.get(no.generator()).unwrap().parent(), Some(boolean));

    // Both still understand what Boolean declares.
    assert_eq!(eval(&mut universe, "true not").unwrap(), HostValue::Boolean(false));
    assert_eq!(eval(&mut universe, "false | true").unwrap(), HostValue::Boolean(true));
    assert_eq!(
        eval(&mut universe, "host lang True").unwrap(),
        HostValue::Class("True".to_string())
    );
}

#[test]
fn toplevel_constants() {
    let mut universe = common::setup().unwrap();

    assert_eq!(eval(&mut universe, "null").unwrap(), HostValue::Nil);
    assert_eq!(eval(&mut universe, "true").unwrap(), HostValue::Boolean(true));
    assert_eq!(eval(&mut universe, "false").unwrap(), HostValue::Boolean(false));
    assert_eq!(eval(&mut universe, "host").unwrap(), HostValue::Package(String::new()));
    assert_eq!(eval(&mut universe, "null isNil").unwrap(), HostValue::Boolean(true));
    assert_eq!(eval(&mut universe, "3 isNil").unwrap(), HostValue::Boolean(false));
    assert_eq!(eval(&mut universe, "3 primitive").unwrap(), HostValue::Boolean(true));
}

#[test]
fn packages() {
    let mut universe = common::setup().unwrap();

    assert_eq!(
        eval(&mut universe, "host geometry").unwrap(),
        HostValue::Package("geometry".to_string())
    );
    assert_eq!(
        eval(&mut universe, "host geometry Point").unwrap(),
        HostValue::Class("Point".to_string())
    );
    assert_eq!(
        eval(&mut universe, "host lang Integer").unwrap(),
        HostValue::Class("Integer".to_string())
    );
    assert_eq!(
        eval(&mut universe, "host geometry name").unwrap(),
        HostValue::Text("geometry".to_string())
    );

    let err = universe.evaluate("host nowhere").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::unary("nowhere")));
}

#[test]
fn constructors_and_fields() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate("p VARIABLE: (host geometry Point newInteger: 3 integer: 4)")
        .unwrap();
    assert_eq!(eval(&mut universe, "p x").unwrap(), HostValue::Integer(3));
    assert_eq!(eval(&mut universe, "p y").unwrap(), HostValue::Integer(4));

    assert_eq!(eval(&mut universe, "p x: 10; p x").unwrap(), HostValue::Integer(10));
    let p = universe.evaluate("p").unwrap();
    assert_eq!(universe.load::<Point>(&p).unwrap(), Point { x: 10, y: 4 });

    let q = universe.evaluate("host geometry Point new").unwrap();
    assert_eq!(universe.load::<Point>(&q).unwrap(), Point { x: 0, y: 0 });
    assert_eq!(universe.print_string(&q).unwrap(), "a Point");
}

#[test]
fn instance_and_static_methods() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate("p VARIABLE: (host geometry Point newInteger: 1 integer: 1)")
        .unwrap();
    let moved = universe.evaluate("p moveByInteger: 2 integer: 3").unwrap();
    assert_eq!(universe.load::<Point>(&moved).unwrap(), Point { x: 3, y: 4 });
    // The native mutated the receiver in place.
    assert_eq!(eval(&mut universe, "p x").unwrap(), HostValue::Integer(3));

    let origin = universe.evaluate("host geometry Point origin").unwrap();
    assert_eq!(universe.load::<Point>(&origin).unwrap(), Point { x: 0, y: 0 });

    // Statics live on the class side only.
    let err = universe.evaluate("p origin").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::unary("origin")));
    let err = universe.evaluate("host geometry Point x").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::unary("x")));
}

#[test]
fn bad_native_arguments() {
    let mut universe = common::setup().unwrap();

    let err = universe
        .evaluate("host geometry Point newInteger: \"a\" integer: 1")
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PrimException { .. }));
    assert!(err.cont().is_some());
}

#[test]
fn instances_inherit_object_and_root() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate("p VARIABLE: (host geometry Point new)")
        .unwrap();
    assert_eq!(eval(&mut universe, "p isNil").unwrap(), HostValue::Boolean(false));
    assert_eq!(
        eval(&mut universe, "p printString").unwrap(),
        HostValue::Text("a Point".to_string())
    );
    // Reifiers are reached through the root identity.
    assert_eq!(
        eval(&mut universe, "p x > 0 IFTRUE: 1 IFFALSE: 2").unwrap(),
        HostValue::Integer(2)
    );
}

#[test]
fn cloning_instances() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate(
            "p VARIABLE: (host geometry Point newInteger: 1 integer: 2);
             q VARIABLE: p CLONE;
             q x: 5",
        )
        .unwrap();
    assert_eq!(eval(&mut universe, "p x").unwrap(), HostValue::Integer(1));
    assert_eq!(eval(&mut universe, "q x").unwrap(), HostValue::Integer(5));
}

#[test]
fn store_and_load() {
    let mut universe = common::setup().unwrap();

    let object = universe.store(&Point { x: 7, y: -2 }).unwrap();
    assert_eq!(universe.load::<Point>(&object).unwrap(), Point { x: 7, y: -2 });
    assert_eq!(universe.up(object.down().unwrap()).unwrap(), object);

    let greeting = universe.store(&"hello".to_string()).unwrap();
    assert_eq!(greeting.down().unwrap(), HostValue::Text("hello".to_string()));
    assert!(universe.load::<Point>(&greeting).is_err());

    let root = universe.root();
    assert!(universe.load::<i64>(&root).is_err());
}

#[test]
fn inspect_bridged_generators() {
    let mut universe = common::setup().unwrap();

    let class = universe.up(HostValue::Class("Point".to_string())).unwrap();
    let listing = universe.inspect(&class).unwrap();
    assert!(listing.contains("Point"));
    assert!(listing.contains("newInteger:integer:"));
    assert!(listing.contains("origin"));

    let point = universe.store(&Point { x: 0, y: 0 }).unwrap();
    let listing = universe.inspect(&point).unwrap();
    assert!(listing.contains("moveByInteger:integer:"));
    assert!(listing.contains("x: -> VarSet(field x)"));
}
