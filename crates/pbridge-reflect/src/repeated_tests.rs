use std::cell::Cell;
use std::ptr::NonNull;

use crate::{ElementPolicy, OwnedElements, PtrElement, RepeatedField, RepeatedPtrField};

/// Counts deletions, then frees like [`OwnedElements`].
#[derive(Default)]
struct CountingPolicy {
    deleted: Cell<usize>,
}

impl<T: PtrElement> ElementPolicy<T> for CountingPolicy {
    fn delete(&self, elem: NonNull<T>) {
        self.deleted.set(self.deleted.get() + 1);
        OwnedElements.delete(elem);
    }
}

fn boxed(bytes: &[u8]) -> NonNull<Vec<u8>> {
    NonNull::from(Box::leak(Box::new(bytes.to_vec())))
}

#[test]
fn repeated_field_keeps_order() {
    let mut r = RepeatedField::new();
    r.push(1u64);
    r.push(2);

    assert_eq!(r.as_slice(), [1, 2]);
    assert_eq!(r.get(2), None);

    r.clear();
    assert!(r.is_empty());
}

#[test]
fn clear_keeps_elements_for_reuse() {
    let mut r = RepeatedPtrField::<Vec<u8>>::new();
    r.add().extend_from_slice(b"one");
    r.add().extend_from_slice(b"two");
    let first = r.get(0).unwrap() as *const Vec<u8>;

    r.clear();
    assert_eq!(r.len(), 0);
    assert_eq!(r.cleared_count(), 2);

    let reused = r.add_from_cleared().unwrap();
    assert_eq!(reused.as_ptr().cast_const(), first);
    assert_eq!(r.get(0).unwrap(), &Vec::<u8>::new());
    assert_eq!(r.cleared_count(), 1);
}

#[test]
fn add_from_cleared_is_none_without_spares() {
    let mut r = RepeatedPtrField::<Vec<u8>>::new();
    r.add();

    assert!(r.add_from_cleared().is_none());
    assert_eq!(r.len(), 1);
}

#[test]
fn add_allocated_appends_when_nothing_is_cleared() {
    let policy = CountingPolicy::default();
    let mut r = RepeatedPtrField::new();

    r.add_allocated(&policy, boxed(b"a"));
    r.add_allocated(&policy, boxed(b"b"));

    assert_eq!(policy.deleted.get(), 0);
    let items: Vec<_> = r.iter().cloned().collect();
    assert_eq!(items, [b"a".to_vec(), b"b".to_vec()]);
}

#[test]
fn add_allocated_discards_the_cleared_element_in_the_way() {
    let policy = CountingPolicy::default();
    let mut r = RepeatedPtrField::<Vec<u8>>::new();
    r.add();
    r.add();
    r.clear();

    r.add_allocated(&policy, boxed(b"fresh"));

    assert_eq!(policy.deleted.get(), 1);
    assert_eq!(r.len(), 1);
    assert_eq!(r.cleared_count(), 1);
    assert_eq!(r.get(0).unwrap().as_slice(), b"fresh");
}

#[test]
fn debug_lists_live_elements() {
    let mut r = RepeatedPtrField::<Vec<u8>>::new();
    r.add().push(1);
    r.add().push(2);
    r.clear();
    r.add().push(3);

    insta::assert_snapshot!(format!("{r:?}"), @"[[3]]");
}
