use super::*;

use crate::model::Slot;


struct Fixture {
    heap: Heap,
    top: GeneratorId,
    parent: GeneratorId,
    child: GeneratorId,
    child_private: GeneratorId,
}

fn getter(heap: &mut Heap, owner: GeneratorId) -> Attribute {
    let cell = heap.alloc_cell(AgoraObject::new(owner));
    Attribute::VarGet(Slot::Cell(cell))
}

// top(Empty) <- parent{a, shared} <- child{shared; private: {secret}}
fn fixture() -> Fixture {
    let mut heap = Heap::new();
    let top = heap.alloc(Generator::Empty);
    let parent = heap.alloc(Generator::internal(top, None));
    let child_private = heap.alloc(Generator::internal(top, None));
    let child = heap.alloc(Generator::internal(parent, Some(child_private)));

    let a = getter(&mut heap, parent);
    heap.install(parent, Pattern::unary("a"), a).unwrap();
    let shared = getter(&mut heap, parent);
    heap.install(parent, Pattern::unary("shared"), shared).unwrap();
    let shared = getter(&mut heap, child);
    heap.install(child, Pattern::unary("shared"), shared).unwrap();
    let secret = getter(&mut heap, child);
    heap.install(child_private, Pattern::unary("secret"), secret)
        .unwrap();

    Fixture {
        heap,
        top,
        parent,
        child,
        child_private,
    }
}

#[test]
fn lookup_is_table_local() {
    let f = fixture();
    assert!(f.heap.lookup(f.parent, &Pattern::unary("a")).is_some());
    assert!(f.heap.lookup(f.child, &Pattern::unary("a")).is_none());
    assert!(f.heap.lookup(f.top, &Pattern::unary("a")).is_none());
}

#[test]
fn delegation_and_shadowing() {
    let f = fixture();
    let a = f
        .heap
        .resolve(f.child, &Pattern::unary("a"), false)
        .unwrap()
        .unwrap();
    assert_eq!(a.holder, f.parent);

    let shared = f
        .heap
        .resolve(f.child, &Pattern::unary("shared"), false)
        .unwrap()
        .unwrap();
    assert_eq!(shared.holder, f.child);
    assert_eq!(
        Some(&shared.attribute),
        f.heap.lookup(f.child, &Pattern::unary("shared"))
    );
}

#[test]
fn miss_walks_to_empty() {
    let f = fixture();
    let res = f
        .heap
        .resolve(f.child, &Pattern::unary("nothing"), true)
        .unwrap();
    assert_eq!(res, None);
}

#[test]
fn private_view_only_when_asked() {
    let f = fixture();
    let secret = Pattern::unary("secret");
    assert_eq!(f.heap.resolve(f.child, &secret, false).unwrap(), None);

    let res = f.heap.resolve(f.child, &secret, true).unwrap().unwrap();
    assert_eq!(res.holder, f.child);
    assert_eq!(
        Some(&res.attribute),
        f.heap.lookup(f.child_private, &secret)
    );
}

#[test]
fn deterministic() {
    let f = fixture();
    let p = Pattern::unary("shared");
    let first = f.heap.resolve(f.child, &p, true).unwrap();
    for _ in 0..10 {
        assert_eq!(f.heap.resolve(f.child, &p, true).unwrap(), first);
    }
}

#[test]
fn wrapping_drops_private_view() {
    let mut f = fixture();
    let wrapper = f.heap.alloc(Generator::Wrapping {
        identity: AgoraObject::new(f.child),
    });
    let outer = f.heap.alloc(Generator::internal(wrapper, None));

    let res = f
        .heap
        .resolve(outer, &Pattern::unary("a"), true)
        .unwrap()
        .unwrap();
    assert_eq!(res.holder, f.parent);
    assert_eq!(
        f.heap
            .resolve(outer, &Pattern::unary("secret"), true)
            .unwrap(),
        None
    );
}

#[test]
fn install_requires_internal() {
    let mut f = fixture();
    let attribute = getter(&mut f.heap, f.top);
    assert!(f
        .heap
        .install(f.top, Pattern::unary("x"), attribute)
        .is_err());
}

#[test]
fn install_replaces() {
    let mut f = fixture();
    let replacement = getter(&mut f.heap, f.top);
    f.heap
        .install(f.parent, Pattern::unary("a"), replacement.clone())
        .unwrap();
    assert_eq!(
        f.heap.lookup(f.parent, &Pattern::unary("a")),
        Some(&replacement)
    );
}

#[test]
fn duplicate_gets_fresh_cells() {
    let mut heap = Heap::new();
    let top = heap.alloc(Generator::Empty);
    let source = heap.alloc(Generator::internal(top, None));
    let cell = heap.alloc_cell(AgoraObject::new(top));
    heap.install(source, Pattern::unary("x"), Attribute::VarGet(Slot::Cell(cell)))
        .unwrap();
    heap.install(
        source,
        Pattern::keyword(vec!["x:"]),
        Attribute::VarSet(Slot::Cell(cell)),
    )
    .unwrap();

    let copy = heap.duplicate(source, None).unwrap();
    let get = heap.lookup(copy, &Pattern::unary("x")).unwrap().cell();
    let set = heap
        .lookup(copy, &Pattern::keyword(vec!["x:"]))
        .unwrap()
        .cell();
    assert_eq!(get, set);
    assert_ne!(get, Some(cell));
    assert_eq!(heap.get(copy).unwrap().parent(), Some(top));

    heap.set_cell(get.unwrap(), AgoraObject::new(copy)).unwrap();
    assert_eq!(heap.cell(cell).unwrap(), &AgoraObject::new(top));
}

#[test]
fn leave_releases_scope() {
    let mut f = fixture();
    let (generators, cells) = (f.heap.len(), f.heap.cell_count());

    f.heap.enter();
    let scratch = f.heap.alloc(Generator::internal(f.parent, None));
    let x = getter(&mut f.heap, scratch);
    f.heap.install(scratch, Pattern::unary("x"), x).unwrap();
    f.heap.leave(&[]);

    assert_eq!(f.heap.len(), generators);
    assert_eq!(f.heap.cell_count(), cells);
    // Generators allocated afterwards reuse the released ids.
    assert_eq!(f.heap.alloc(Generator::Empty), scratch);
}

#[test]
fn retained_objects_keep_scope() {
    let mut f = fixture();
    let generators = f.heap.len();

    f.heap.enter();
    let answer = AgoraObject::new(f.heap.alloc(Generator::internal(f.parent, None)));
    f.heap.leave(&[&answer]);
    assert_eq!(f.heap.len(), generators + 1);

    // Answers allocated before the scope do not keep it.
    f.heap.enter();
    f.heap.alloc(Generator::internal(f.parent, None));
    f.heap.leave(&[&AgoraObject::new(f.child)]);
    assert_eq!(f.heap.len(), generators + 1);
}

#[test]
fn references_from_older_structures_escape() {
    let mut f = fixture();
    let held = f.heap.alloc_cell(AgoraObject::new(f.top));
    let generators = f.heap.len();

    // Stored into a cell that predates the scope.
    f.heap.enter();
    let object = f.heap.alloc(Generator::internal(f.parent, None));
    f.heap.set_cell(held, AgoraObject::new(object)).unwrap();
    f.heap.leave(&[]);
    assert_eq!(f.heap.len(), generators + 1);
    assert_eq!(f.heap.cell(held).unwrap(), &AgoraObject::new(object));

    // A fresh cell bound in a generator that predates the scope.
    let cells = f.heap.cell_count();
    f.heap.enter();
    let y = getter(&mut f.heap, f.top);
    f.heap.install(f.parent, Pattern::unary("y"), y.clone()).unwrap();
    f.heap.leave(&[]);
    assert_eq!(f.heap.cell_count(), cells + 1);
    assert_eq!(f.heap.lookup(f.parent, &Pattern::unary("y")), Some(&y));
}

#[test]
fn escapes_reach_every_crossed_scope() {
    let mut f = fixture();
    let held = f.heap.alloc_cell(AgoraObject::new(f.top));
    let generators = f.heap.len();

    f.heap.enter();
    let outer = f.heap.alloc(Generator::internal(f.parent, None));
    f.heap.enter();
    let inner = f.heap.alloc(Generator::internal(outer, None));
    // Pointing at an older generator is not an escape.
    let local = f.heap.alloc_cell(AgoraObject::new(outer));
    f.heap.leave(&[]);
    f.heap.enter();
    let kept = f.heap.alloc(Generator::internal(outer, None));
    f.heap.set_cell(held, AgoraObject::new(kept)).unwrap();
    f.heap.leave(&[]);
    f.heap.leave(&[]);

    assert!(f.heap.cell(local).is_err());
    assert_eq!(f.heap.len(), generators + 2);
    assert_eq!(f.heap.get(kept).unwrap().parent(), Some(outer));
    assert_eq!(inner, kept);
}

#[test]
fn pinned_generators_survive_all_scopes() {
    let mut f = fixture();
    let generators = f.heap.len();

    f.heap.enter();
    f.heap.enter();
    let cached = f.heap.alloc(Generator::internal(f.top, None));
    f.heap.pin(cached);
    f.heap.leave(&[]);
    f.heap.leave(&[]);
    assert_eq!(f.heap.len(), generators + 1);

    // Unbalanced leaves are ignored.
    f.heap.leave(&[]);
    assert_eq!(f.heap.len(), generators + 1);
}

#[test]
fn open_scopes_are_not_persisted() {
    let mut f = fixture();
    f.heap.enter();
    let json = serde_json::to_string(&f.heap).unwrap();
    let restored: Heap = serde_json::from_str(&json).unwrap();
    f.heap.leave(&[]);
    assert_eq!(restored, f.heap);
}
