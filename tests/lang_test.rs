mod common;

use agora::bridge::HostValue;
use agora::error::ErrorKind;
use agora::pattern::Pattern;

use common::{eval, text};


#[test]
fn basic_arithmetic() {
    let mut universe = common::setup().unwrap();

    assert_eq!(eval(&mut universe, "1 + 2").unwrap(), HostValue::Integer(3));
    // Binary operators share one precedence and associate left.
    assert_eq!(eval(&mut universe, "3 + 4 * 2").unwrap(), HostValue::Integer(14));
    assert_eq!(eval(&mut universe, "3 + (4 * 2)").unwrap(), HostValue::Integer(11));
    assert_eq!(eval(&mut universe, "1 + 0.5").unwrap(), HostValue::Float(1.5));
    assert_eq!(eval(&mut universe, "7 / 2").unwrap(), HostValue::Integer(3));
    assert_eq!(eval(&mut universe, "2 - 5 abs").unwrap(), HostValue::Integer(-3));
}

#[test]
fn string_operations() {
    let mut universe = common::setup().unwrap();

    assert_eq!(eval(&mut universe, "\"ab\" + \"cd\"").unwrap(), text("abcd"));
    assert_eq!(eval(&mut universe, "\"hello\" size").unwrap(), HostValue::Integer(5));
}

#[test]
fn illegal_argument() {
    let mut universe = common::setup().unwrap();

    let err = universe.evaluate("1 + \"hi\"").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ProgramError(_)));
    assert_eq!(err.message(), "Illegal Argument for +");
    assert!(err.cont().is_some());

    // Arguments without a host value cannot cross into a native.
    let err = universe.evaluate("1 + root").unwrap_err();
    assert_eq!(err.message(), "Illegal Argument for +");

    let err = universe.evaluate("1 / 0").unwrap_err();
    assert_eq!(err.message(), "Division by zero");
}

#[test]
fn halt() {
    let mut universe = common::setup().unwrap();

    let err = universe.evaluate("\"Test Halt\" HALT").unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::Halt("Test Halt".to_string()));
}

#[test]
fn conditionals() {
    let mut universe = common::setup().unwrap();

    assert_eq!(
        eval(&mut universe, "1 > 5 IFTRUE: \"hello\" IFFALSE: \"bye\"").unwrap(),
        text("bye")
    );
    assert_eq!(
        eval(&mut universe, "1 < 5 IFTRUE: \"hello\" IFFALSE: \"bye\"").unwrap(),
        text("hello")
    );
    assert_eq!(eval(&mut universe, "1 > 5 IFTRUE: \"hello\"").unwrap(), HostValue::Nil);
    assert_eq!(eval(&mut universe, "1 > 5 IFFALSE: 7").unwrap(), HostValue::Integer(7));
    assert_eq!(eval(&mut universe, "true & false | true").unwrap(), HostValue::Boolean(true));
    assert_eq!(eval(&mut universe, "(1 = 1) not").unwrap(), HostValue::Boolean(false));
}

#[test]
fn conditionals_evaluate_one_branch() {
    let mut universe = common::setup().unwrap();

    let result = eval(
        &mut universe,
        "count VARIABLE: 0;
         1 > 5 IFTRUE: (count := 1) IFFALSE: (count := 2);
         count",
    );
    assert_eq!(result.unwrap(), HostValue::Integer(2));

    let result = eval(&mut universe, "true IFTRUE: 1 IFFALSE: (\"unreachable\" HALT)");
    assert_eq!(result.unwrap(), HostValue::Integer(1));
}

#[test]
fn variables() {
    let mut universe = common::setup().unwrap();

    let result = eval(
        &mut universe,
        "x VARIABLE: \"hello\";
         SELF x: \"bye\";
         SELF x",
    );
    assert_eq!(result.unwrap(), text("bye"));

    assert_eq!(eval(&mut universe, "x := x + \"!\"; x").unwrap(), text("bye!"));
    // Assignment answers the assigned value.
    assert_eq!(eval(&mut universe, "x := 3").unwrap(), HostValue::Integer(3));
    // Declarations persist across evaluations.
    assert_eq!(eval(&mut universe, "x").unwrap(), HostValue::Integer(3));
}

#[test]
fn constants_are_read_only() {
    let mut universe = common::setup().unwrap();

    assert_eq!(eval(&mut universe, "k CONSTANT: 3; k").unwrap(), HostValue::Integer(3));
    let err = universe.evaluate("k := 4").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::keyword(vec!["k:"])));
    assert_eq!(eval(&mut universe, "k").unwrap(), HostValue::Integer(3));
}

#[test]
fn message_not_understood() {
    let mut universe = common::setup().unwrap();

    let err = universe.evaluate("foo").unwrap_err();
    match err.kind() {
        ErrorKind::MessageNotUnderstood { pattern, receiver } => {
            assert_eq!(*pattern, Pattern::unary("foo"));
            assert_eq!(*receiver, universe.root());
        }
        other => panic!("Unexpected error {:?}", other),
    }

    let err = universe.evaluate("3 frobnicate: 4").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::keyword(vec!["frobnicate:"])));
}

#[test]
fn private_members_stay_private() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate(
            "o VARIABLE: {
                 y VARIABLE: 4;
                 getY PUBLIC METHOD: y;
                 (setY: v) PUBLIC METHOD: [ y := v ]
             }",
        )
        .unwrap();
    assert_eq!(eval(&mut universe, "o getY").unwrap(), HostValue::Integer(4));
    assert_eq!(eval(&mut universe, "o setY: 9; o getY").unwrap(), HostValue::Integer(9));

    let err = universe.evaluate("o y").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::unary("y")));
    let err = universe.evaluate("o y: 5").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::keyword(vec!["y:"])));
    assert_eq!(eval(&mut universe, "o getY").unwrap(), HostValue::Integer(9));
}

#[test]
fn methods_with_arguments() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate(
            "calc VARIABLE: {
                 (add: a to: b) PUBLIC METHOD: a + b;
                 (twice: a) PUBLIC METHOD: [ SELF add: a to: a ]
             }",
        )
        .unwrap();
    assert_eq!(eval(&mut universe, "calc add: 2 to: 3").unwrap(), HostValue::Integer(5));
    assert_eq!(eval(&mut universe, "calc twice: 21").unwrap(), HostValue::Integer(42));

    let err = universe.evaluate("calc add: 1").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::keyword(vec!["add:"])));
}

#[test]
fn toplevel_methods() {
    let mut universe = common::setup().unwrap();

    universe.evaluate("(square: n) METHOD: n * n").unwrap();
    assert_eq!(eval(&mut universe, "square: 7").unwrap(), HostValue::Integer(49));
    assert_eq!(eval(&mut universe, "SELF square: 3").unwrap(), HostValue::Integer(9));
}

#[test]
fn formals_are_read_only() {
    let mut universe = common::setup().unwrap();

    universe.evaluate("(bump: n) METHOD: [ n := n + 1 ]").unwrap();
    let err = universe.evaluate("bump: 1").unwrap_err();
    assert_eq!(err.pattern(), Some(&Pattern::keyword(vec!["n:"])));
}

#[test]
fn delegation_and_shadowing() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate(
            "base VARIABLE: {
                 name PUBLIC METHOD: \"base\";
                 kind PUBLIC METHOD: \"generic\";
                 child PUBLIC CONSTANT: { name PUBLIC METHOD: \"child\" }
             }",
        )
        .unwrap();
    assert_eq!(eval(&mut universe, "base name").unwrap(), text("base"));
    assert_eq!(eval(&mut universe, "base child name").unwrap(), text("child"));
    assert_eq!(eval(&mut universe, "base child kind").unwrap(), text("generic"));
}

#[test]
fn super_sends() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate(
            "outer VARIABLE: {
                 greet PUBLIC METHOD: \"outer\";
                 inner PUBLIC CONSTANT: {
                     greet PUBLIC METHOD: [ SUPER greet + \" via inner\" ]
                 }
             }",
        )
        .unwrap();
    assert_eq!(eval(&mut universe, "outer inner greet").unwrap(), text("outer via inner"));

    let err = universe.evaluate("SUPER").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ReifierMisused { .. }));
}

#[test]
fn self_is_the_receiver() {
    let mut universe = common::setup().unwrap();

    let root = universe.root();
    assert_eq!(universe.evaluate("SELF").unwrap(), root);
    assert_eq!(universe.evaluate("root").unwrap(), root);

    universe
        .evaluate("o VARIABLE: { me PUBLIC METHOD: SELF }")
        .unwrap();
    let o = universe.evaluate("o").unwrap();
    assert_eq!(universe.evaluate("o me").unwrap(), o);
}

#[test]
fn cloning() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate(
            "counter VARIABLE: {
                 n VARIABLE: 0;
                 bump PUBLIC METHOD: [ n := n + 1 ];
                 count PUBLIC METHOD: n
             };
             copy VARIABLE: counter CLONE;
             counter bump;
             counter bump;
             copy bump",
        )
        .unwrap();
    assert_eq!(eval(&mut universe, "counter count").unwrap(), HostValue::Integer(2));
    assert_eq!(eval(&mut universe, "copy count").unwrap(), HostValue::Integer(1));

    // Immutable host values clone to themselves.
    assert_eq!(eval(&mut universe, "5 CLONE").unwrap(), HostValue::Integer(5));
}

#[test]
fn public_misuse() {
    let mut universe = common::setup().unwrap();

    universe.evaluate("m METHOD: [ z PUBLIC VARIABLE: 1 ]").unwrap();
    let err = universe.evaluate("m").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::ReifierMisused { .. }));

    // Allowed at toplevel.
    assert_eq!(eval(&mut universe, "w PUBLIC VARIABLE: 2; w").unwrap(), HostValue::Integer(2));
    assert_eq!(eval(&mut universe, "root w").unwrap(), HostValue::Integer(2));
}

#[test]
fn try_catch() {
    let mut universe = common::setup().unwrap();

    let result = eval(
        &mut universe,
        "TRY: [ (oops: 42) RAISE; 0 ] CATCH: { (oops: v) PUBLIC METHOD: v + 1 }",
    );
    assert_eq!(result.unwrap(), HostValue::Integer(43));

    // No exception: the protected value is answered.
    let result = eval(&mut universe, "TRY: [ 7 ] CATCH: { }");
    assert_eq!(result.unwrap(), HostValue::Integer(7));
}

#[test]
fn uncaught_exception() {
    let mut universe = common::setup().unwrap();

    let err = universe.evaluate("(oops: 1) RAISE").unwrap_err();
    match err.kind() {
        ErrorKind::Exception(record) => {
            assert_eq!(record.pattern, Pattern::keyword(vec!["oops:"]));
            assert_eq!(record.handler, None);
        }
        other => panic!("Unexpected error {:?}", other),
    }
}

#[test]
fn unhandled_patterns_propagate_outward() {
    let mut universe = common::setup().unwrap();

    let result = eval(
        &mut universe,
        "TRY: [
             TRY: [ (oops: 1) RAISE ] CATCH: { other PUBLIC METHOD: 2 }
         ] CATCH: { (oops: v) PUBLIC METHOD: v + 10 }",
    );
    assert_eq!(result.unwrap(), HostValue::Integer(11));
}

#[test]
fn exceptions_raised_in_methods_reach_the_caller_handler() {
    let mut universe = common::setup().unwrap();

    universe.evaluate("fail METHOD: [ (failed) RAISE ]").unwrap();
    let result = eval(
        &mut universe,
        "TRY: [ fail ] CATCH: { failed PUBLIC METHOD: \"recovered\" }",
    );
    assert_eq!(result.unwrap(), text("recovered"));
}

#[test]
fn halt_is_not_caught() {
    let mut universe = common::setup().unwrap();

    let err = universe
        .evaluate("TRY: [ \"stop\" HALT ] CATCH: { }")
        .unwrap_err();
    assert_eq!(*err.kind(), ErrorKind::Halt("stop".to_string()));
}

#[test]
fn errors_carry_the_send_trace() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate(
            "outer METHOD: [ inner ];
             inner METHOD: [ 1 + \"x\" ]",
        )
        .unwrap();
    let err = universe.evaluate("outer").unwrap_err();
    let patterns = err
        .cont()
        .unwrap()
        .iter()
        .filter_map(|frame| frame.pattern().cloned())
        .collect::<Vec<_>>();
    assert!(patterns.contains(&Pattern::unary("outer")));
    assert!(patterns.contains(&Pattern::unary("inner")));
    assert!(patterns.contains(&Pattern::operator("+")));
    // Sends are unwound once evaluation returns.
    assert_eq!(universe.sends().depth(), 1);
}

#[test]
fn runaway_recursion() {
    let mut universe = common::setup().unwrap();

    universe.evaluate("loop METHOD: [ loop ]").unwrap();
    let generators = universe.heap().len();
    let err = universe.evaluate("loop").unwrap_err();
    assert_eq!(err.message(), "Maximum send depth exceeded");

    // The universe stays usable and the abandoned activations are gone.
    assert_eq!(universe.sends().depth(), 1);
    assert_eq!(universe.heap().len(), generators);
    assert_eq!(eval(&mut universe, "1 + 1").unwrap(), HostValue::Integer(2));
}

#[test]
fn deep_recursion() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate("(f: n) METHOD: ((n > 0) IFTRUE: (f: n - 1) IFFALSE: 0)")
        .unwrap();
    assert_eq!(eval(&mut universe, "f: 250").unwrap(), HostValue::Integer(0));

    universe
        .evaluate("(sum: n) METHOD: ((n > 0) IFTRUE: [ n + (sum: n - 1) ] IFFALSE: [ 0 ])")
        .unwrap();
    assert_eq!(eval(&mut universe, "sum: 200").unwrap(), HostValue::Integer(20100));
}

#[test]
fn activations_release_their_scopes() {
    let mut universe = common::setup().unwrap();

    universe.evaluate("(id: n) METHOD: n; id: 1").unwrap();
    let generators = universe.heap().len();
    let cells = universe.heap().cell_count();
    for _ in 0..1000 {
        assert_eq!(eval(&mut universe, "id: 1").unwrap(), HostValue::Integer(1));
    }
    assert_eq!(universe.heap().len(), generators);
    assert_eq!(universe.heap().cell_count(), cells);

    universe
        .evaluate(
            "(down: n) METHOD: ((n > 0) IFTRUE: [ k VARIABLE: n - 1; down: k ] IFFALSE: [ 0 ]);
             down: 1",
        )
        .unwrap();
    let generators = universe.heap().len();
    for _ in 0..20 {
        assert_eq!(eval(&mut universe, "down: 50").unwrap(), HostValue::Integer(0));
    }
    assert_eq!(universe.heap().len(), generators);
}

#[test]
fn captured_objects_outlive_their_activation() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate(
            "holder VARIABLE: null;
             keep METHOD: [ c VARIABLE: 7; holder := { get PUBLIC METHOD: c }; 0 ];
             (make: n) METHOD: { value PUBLIC METHOD: n };
             (id: n) METHOD: n;
             keep;
             made VARIABLE: (make: 5)",
        )
        .unwrap();
    for _ in 0..10 {
        universe.evaluate("id: (make: 1); id: 2").unwrap();
    }
    assert_eq!(eval(&mut universe, "holder get").unwrap(), HostValue::Integer(7));
    assert_eq!(eval(&mut universe, "made value").unwrap(), HostValue::Integer(5));
    assert_eq!(eval(&mut universe, "(make: 6) value").unwrap(), HostValue::Integer(6));
}

#[test]
fn raised_objects_reach_the_handler() {
    let mut universe = common::setup().unwrap();

    universe
        .evaluate("fail METHOD: [ (oops: { v PUBLIC METHOD: 9 }) RAISE ]")
        .unwrap();
    let result = eval(
        &mut universe,
        "TRY: [ fail ] CATCH: { (oops: o) PUBLIC METHOD: o v }",
    );
    assert_eq!(result.unwrap(), HostValue::Integer(9));
}

#[test]
fn assignment_without_spaces() {
    let mut universe = common::setup().unwrap();

    assert_eq!(eval(&mut universe, "x VARIABLE: 1; x:=2; x").unwrap(), HostValue::Integer(2));
    assert_eq!(eval(&mut universe, "x:=x+1").unwrap(), HostValue::Integer(3));
}

#[test]
fn print_and_inspect() {
    let mut universe = common::setup().unwrap();

    let root = universe.root();
    assert_eq!(universe.print_string(&root).unwrap(), "root");

    let o = universe
        .evaluate("{ n VARIABLE: 1; get PUBLIC METHOD: n }")
        .unwrap();
    let listing = universe.inspect(&o).unwrap();
    assert!(listing.contains("get -> "));
    assert!(listing.contains("private n -> "));
    assert!(listing.contains("private n: -> "));
}
