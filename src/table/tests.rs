use std::rc::Rc;

use super::*;

fn obj(s: &str) -> Rc<ObjString> {
    Rc::new(ObjString::new(s.as_bytes()))
}

#[test]
fn set_then_get_roundtrips() {
    let mut table = Table::new();
    let key = obj("hello");
    assert!(table.set(&key, Value::Number(1.0)));
    assert_eq!(table.get(&key), Some(&Value::Number(1.0)));
}

#[test]
fn set_on_existing_key_overwrites_and_reports_not_new() {
    let mut table = Table::new();
    let key = obj("hello");
    assert!(table.set(&key, Value::Nil));
    assert!(!table.set(&key, Value::Number(2.0)));
    assert_eq!(table.get(&key), Some(&Value::Number(2.0)));
}

#[test]
fn get_on_empty_table_is_none() {
    let table = Table::new();
    let key = obj("missing");
    assert_eq!(table.get(&key), None);
}

#[test]
fn delete_leaves_tombstone_and_preserves_probe_chain() {
    let mut table = Table::new();
    // With MIN_CAPACITY = 8, pick three keys and force a collision pattern
    // by deleting the middle key; the third key must still resolve even
    // though its probe sequence passes through the tombstone.
    let keys: Vec<_> = (0..3).map(|i| obj(&format!("key{i}"))).collect();
    for (i, k) in keys.iter().enumerate() {
        table.set(k, Value::Number(i as f64));
    }
    assert!(table.delete(&keys[0]));
    assert!(!table.delete(&keys[0]), "second delete of the same key is a no-op");
    for k in &keys[1..] {
        assert!(table.get(k).is_some());
    }
    assert_eq!(table.get(&keys[0]), None);
}

#[test]
fn load_factor_never_exceeds_three_quarters_after_any_insert() {
    let mut table = Table::new();
    for i in 0..200 {
        let key = obj(&format!("item-{i}"));
        table.set(&key, Value::Nil);
        assert!(table.load_factor() <= 0.75 + f64::EPSILON);
    }
}

#[test]
fn find_string_returns_same_identity_for_byte_equal_content() {
    let mut table = Table::new();
    let a = obj("shared");
    table.set(&a, Value::Nil);
    let found = table.find_string(b"shared", a.hash).expect("should be found");
    assert!(Rc::ptr_eq(&found, &a));
}

#[test]
fn find_string_misses_when_absent() {
    let table = Table::new();
    assert!(table.find_string(b"nope", fnv1a(b"nope")).is_none());
}

#[test]
fn find_string_misses_on_hash_collision_with_different_bytes() {
    let mut table = Table::new();
    let a = obj("alpha");
    table.set(&a, Value::Nil);
    // Same hash bucket territory (small table), different content: must
    // not be mistaken for a hit.
    assert!(table.find_string(b"totally-different-content", a.hash).is_none());
}

#[test]
fn rehash_drops_tombstones_and_recomputes_count() {
    let mut table = Table::new();
    let keys: Vec<_> = (0..10).map(|i| obj(&format!("k{i}"))).collect();
    for k in &keys {
        table.set(k, Value::Nil);
    }
    for k in &keys[..5] {
        table.delete(k);
    }
    // Force another rehash by inserting enough new keys to cross the load
    // factor threshold again; tombstones should not accumulate forever.
    for i in 10..40 {
        table.set(&obj(&format!("k{i}")), Value::Nil);
    }
    assert_eq!(table.len(), 5 + 30);
    assert!(table.load_factor() <= 0.75 + f64::EPSILON);
}

#[test]
fn randomized_insert_delete_preserves_invariants() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut table = Table::new();
    let mut live: Vec<Rc<ObjString>> = Vec::new();

    for _ in 0..2000 {
        if live.is_empty() || rng.gen_bool(0.7) {
            let text = format!("s{}", rng.gen::<u32>());
            let k = obj(&text);
            table.set(&k, Value::Nil);
            live.push(k);
        } else {
            let idx = rng.gen_range(0..live.len());
            let k = live.swap_remove(idx);
            table.delete(&k);
        }
        assert!(table.load_factor() <= 0.75 + f64::EPSILON);
    }

    for k in &live {
        assert!(table.get(k).is_some());
    }
}
