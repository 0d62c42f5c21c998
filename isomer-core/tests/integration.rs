//! Integration tests for derived equality, cyclic data and value-keyed maps.

use isomer_core::{DeepEqual, EqualTo, KeyMap, Pointer, Shared, Value, ValueKey, Visited, canonical};
use std::cell::RefCell;
use std::rc::Rc;

/// A document where only the content matters for equality.
#[derive(Debug, Clone, DeepEqual)]
struct Document {
    title: String,
    tags: Vec<String>,
    #[deep_equal(ignore)]
    revision: u64,
}

#[derive(Debug, DeepEqual)]
enum Shape {
    Empty,
    Circle(f64),
    Rect { width: f64, height: f64 },
    Labeled(String, #[deep_equal(ignore)] u32),
}

#[derive(Debug, DeepEqual)]
struct Pair<T>(T, T);

/// A node in a singly linked, possibly cyclic list.
#[derive(Debug, DeepEqual)]
struct LinkedNode {
    value: String,
    next: Option<Shared<LinkedNode>>,
}

fn doc(title: &str, revision: u64) -> Document {
    Document {
        title: title.to_string(),
        tags: vec!["draft".to_string()],
        revision,
    }
}

/// Builds a ring of nodes with the given labels.
fn ring(labels: &[&str]) -> Vec<Shared<LinkedNode>> {
    let nodes: Vec<_> = labels
        .iter()
        .map(|l| {
            Rc::new(RefCell::new(LinkedNode {
                value: l.to_string(),
                next: None,
            }))
        })
        .collect();
    for (i, node) in nodes.iter().enumerate() {
        let next = Rc::clone(&nodes[(i + 1) % nodes.len()]);
        node.borrow_mut().next = Some(next);
    }
    nodes
}

fn unlink(nodes: &[Shared<LinkedNode>]) {
    for node in nodes {
        node.borrow_mut().next = None;
    }
}

#[test]
fn ignored_fields_do_not_matter() {
    assert!(doc("notes", 1).deep_equal(&doc("notes", 2)));
    assert!(!doc("notes", 1).deep_equal(&doc("todo", 1)));

    let mut tagged = doc("notes", 1);
    tagged.tags.push("final".to_string());
    assert!(!tagged.deep_equal(&doc("notes", 1)));
}

#[test]
fn derived_enums() {
    assert!(Shape::Empty.deep_equal(&Shape::Empty));
    assert!(!Shape::Empty.deep_equal(&Shape::Circle(0.0)));
    assert!(Shape::Circle(f64::NAN).deep_equal(&Shape::Circle(f64::NAN)));
    assert!(
        Shape::Rect { width: 1.0, height: 2.0 }.deep_equal(&Shape::Rect { width: 1.0, height: 2.0 })
    );
    assert!(
        !Shape::Rect { width: 1.0, height: 2.0 }.deep_equal(&Shape::Rect { width: 2.0, height: 1.0 })
    );
    assert!(Shape::Labeled("a".into(), 1).deep_equal(&Shape::Labeled("a".into(), 9)));
    assert!(!Shape::Labeled("a".into(), 1).deep_equal(&Shape::Labeled("b".into(), 1)));
}

#[test]
fn derived_generics() {
    assert!(Pair(1u8, 2u8).deep_equal(&Pair(1, 2)));
    assert!(!Pair(1u8, 2u8).deep_equal(&Pair(2, 1)));
    assert!(Pair(Value::from("x"), Value::Nil).deep_equal(&Pair(Value::from("x"), Value::Nil)));
}

#[test]
fn derived_canonical_form_skips_ignored_fields() {
    let a = doc("notes", 1).canonical();
    let b = doc("notes", 2).canonical();
    assert!(a.is_some());
    assert_eq!(a, b);
    assert_ne!(a, doc("todo", 1).canonical());

    assert_ne!(Shape::Circle(1.0).canonical(), Shape::Empty.canonical());
    assert_eq!(
        Shape::Labeled("a".into(), 1).canonical(),
        Shape::Labeled("a".into(), 2).canonical()
    );
}

#[test]
fn aggregates_inside_values() {
    let a = Value::list([Value::aggregate(doc("notes", 1)), Value::from(3u32)]);
    let b = Value::list([Value::aggregate(doc("notes", 7)), Value::from(3u32)]);
    let c = Value::list([Value::aggregate(doc("todo", 1)), Value::from(3u32)]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(Value::aggregate(Shape::Empty), Value::aggregate(doc("notes", 1)));
    assert_eq!(
        canonical::fingerprint(&a).unwrap(),
        canonical::fingerprint(&b).unwrap()
    );
}

#[test]
fn aggregate_keys_are_fingerprinted() {
    let key = |revision| ValueKey::new(Value::aggregate(doc("notes", revision)));
    assert!(key(1).fingerprint().is_some());
    assert_eq!(key(1).fingerprint(), key(2).fingerprint());

    let mut m = KeyMap::new();
    key(1).set_to_map(&mut m, "first");
    key(2).set_to_map(&mut m, "second");
    assert_eq!(m.len(), 1);
    assert_eq!(key(3).get_from_map(&m), Some(&"second"));

    let other = ValueKey::new(Value::aggregate(doc("todo", 1)));
    assert_eq!(other.get_from_map(&m), None);
}

#[test]
fn cyclic_lists_terminate() {
    let a = ring(&["x", "y"]);
    let b = ring(&["x", "y"]);
    let c = ring(&["x", "z"]);

    let mut visited = Visited::new();
    assert!(a[0].deep_equal_in(&b[0], &mut visited));
    assert_eq!(visited.len(), 2);
    assert!(!a[0].deep_equal(&c[0]));
    assert!(a[0].borrow().canonical().is_none());

    unlink(&a);
    unlink(&b);
    unlink(&c);
}

#[test]
fn rings_compare_by_unrolled_structure() {
    let a = ring(&["x"]);
    let b = ring(&["x", "x"]);
    // Both unroll to the same infinite sequence of labels.
    assert!(a[0].deep_equal(&b[0]));

    let c = ring(&["x", "y"]);
    assert!(!a[0].deep_equal(&c[0]));

    unlink(&a);
    unlink(&b);
    unlink(&c);
}

#[test]
fn cyclic_values_terminate() {
    let make = || {
        let node = Rc::new(RefCell::new(Value::Nil));
        *node.borrow_mut() = Value::dict([
            ("name", Value::from("root")),
            ("self", Value::Pointer(Pointer::to(&node))),
        ]);
        node
    };
    let a = make();
    let b = make();
    assert_eq!(Value::Pointer(Pointer::to(&a)), Value::Pointer(Pointer::to(&b)));

    *a.borrow_mut() = Value::Nil;
    *b.borrow_mut() = Value::Nil;
}

#[test]
fn composite_key_built_independently() {
    let key = || ValueKey::new(Value::dict([("a", Value::from("b")), ("c", Value::U64(4))]));
    let mut m = KeyMap::new();
    key().set_to_map(&mut m, Value::from("foo"));

    assert_eq!(key().get_from_map(&m), Some(&Value::from("foo")));
    assert_eq!(m.len(), 1);
    assert_eq!(key().delete_from_map(&mut m), Some(Value::from("foo")));
    assert!(m.is_empty());
}

#[test]
fn value_keyed_map_values() {
    let a = Value::map([
        (Value::dict([("a", Value::from("b")), ("c", Value::U64(4))]), Value::from("foo")),
        (Value::from("plain"), Value::Bool(true)),
    ]);
    let b = Value::map([
        (Value::from("plain"), Value::Bool(true)),
        (Value::dict([("c", Value::U64(4)), ("a", Value::from("b"))]), Value::from("foo")),
    ]);
    assert_eq!(a, b);

    let Value::Map(entries) = &a else {
        unreachable!();
    };
    let lookup = ValueKey::new(Value::dict([("c", Value::U64(4)), ("a", Value::from("b"))]));
    assert_eq!(lookup.get_from_map(entries), Some(&Value::from("foo")));
}

#[test]
fn keys_as_custom_values() {
    let a = Value::custom(ValueKey::new("id"));
    assert_eq!(a, Value::custom(ValueKey::new("id")));
    assert_ne!(a, Value::custom(ValueKey::new("other")));
    assert_ne!(a, Value::from("id"));
}

/// Declared equality that accepts any integer with the same value.
#[derive(Debug)]
struct Loose(i64);

impl EqualTo for Loose {
    fn equal_to(&self, other: &Value) -> bool {
        match other {
            Value::I32(n) => i64::from(*n) == self.0,
            Value::I64(n) => *n == self.0,
            _ => false,
        }
    }
}

#[test]
fn plain_key_finds_stored_declared_equality_key() {
    let stored = ValueKey::new(Value::dict([("id", Value::custom(Loose(7)))]));
    let plain = || ValueKey::new(Value::dict([("id", Value::I32(7))]));
    assert!(stored.fingerprint().is_none());
    assert!(plain().fingerprint().is_some());
    assert!(stored.equal(&plain()));

    let mut m = KeyMap::new();
    stored.set_to_map(&mut m, 1u32);
    assert_eq!(plain().get_from_map(&m), Some(&1));

    plain().set_to_map(&mut m, 2);
    assert_eq!(m.len(), 1);
    assert_eq!(plain().delete_from_map(&mut m), Some(2));
    assert!(m.is_empty());
}

#[test]
fn shared_pointer_keys_match_consistently() {
    let node = |s: &str| Rc::new(RefCell::new(Value::from(s)));
    let ptr = |n: &Shared<Value>| Value::Pointer(Pointer::to(n));
    let (p, t, q, s) = (node("x"), node("y"), node("y"), node("x"));

    let a = Value::map([
        (ptr(&p), Value::U8(1)),
        (Value::from("k"), ptr(&p)),
        (ptr(&t), Value::U8(0)),
    ]);
    let mismatched = Value::map([
        (ptr(&q), Value::U8(0)),
        (ptr(&s), Value::U8(1)),
        (Value::from("k"), ptr(&q)),
    ]);
    let matched = Value::map([
        (ptr(&q), Value::U8(0)),
        (ptr(&s), Value::U8(1)),
        (Value::from("k"), ptr(&s)),
    ]);
    assert_ne!(a, mismatched);
    assert_ne!(mismatched, a);
    assert_eq!(a, matched);
}
