// Common test utilities for integration tests
//
// Shared fixtures: unique class names, a destructor that counts calls per
// class, and helpers for registering small hierarchies.

#![allow(dead_code)]

use classlink::{Class, ClassSpec, Instance};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

static NAME_ID: AtomicUsize = AtomicUsize::new(0);

/// Returns a class name no other test uses.
///
/// Kept short so it survives name truncation.
pub fn unique_name(prefix: &str) -> String {
    let id = NAME_ID.fetch_add(1, Ordering::SeqCst);
    format!("{prefix}{id}")
}

fn destructions() -> &'static Mutex<HashMap<usize, Vec<usize>>> {
    static CALLS: OnceLock<Mutex<HashMap<usize, Vec<usize>>>> = OnceLock::new();
    CALLS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Destructor that records `(instance class, owning class)` calls.
pub fn counting_destructor(instance: &mut Instance, class: Class) {
    destructions()
        .lock()
        .unwrap()
        .entry(instance.class().id())
        .or_default()
        .push(class.id());
}

/// Destructor that records its call, then runs its ancestors' cleanup.
pub fn chaining_destructor(instance: &mut Instance, class: Class) {
    counting_destructor(instance, class);
    class.destruct_parent(instance);
}

/// Owning classes of every destructor run for instances of `class`, in
/// call order.
pub fn destructor_calls(class: &Class) -> Vec<Class> {
    let ids = destructions()
        .lock()
        .unwrap()
        .get(&class.id())
        .cloned()
        .unwrap_or_default();
    ids.into_iter()
        .map(|id| {
            class
                .ancestors()
                .find(|ancestor| ancestor.id() == id)
                .expect("destructor owner must be on the chain")
        })
        .collect()
}

/// Registers a class under the built-in root.
pub fn object_subclass(prefix: &str, size: usize) -> Class {
    Class::register(ClassSpec::new(unique_name(prefix), size).parent(Class::object()))
        .expect("Failed to register test class")
}

/// Registers a child of `parent` with the same size.
pub fn subclass_of(prefix: &str, parent: Class) -> Class {
    Class::register(ClassSpec::new(unique_name(prefix), parent.size()).parent(parent))
        .expect("Failed to register test subclass")
}
