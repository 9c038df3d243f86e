//! Runtime type queries on instances.
//!
//! All queries compare class handles by identity. Two classes registered
//! under the same name never answer for each other.

use crate::runtime::{Class, Instance};

/// Class the instance was created with.
#[must_use]
pub fn identity(instance: &Instance) -> Class {
    instance.class()
}

/// Whether `instance` was created with exactly `class`.
#[must_use]
pub fn is_exact_class(instance: &Instance, class: &Class) -> bool {
    instance.class() == *class
}

/// Whether `class` is on the ancestor chain of `instance`, its own class
/// included.
///
/// The walk ends at the first match or at the root; chains are finite
/// because registration bounds them.
#[must_use]
pub fn inherits_from(instance: &Instance, class: &Class) -> bool {
    instance.class().is_subclass_of(class)
}

/// Capability root of the instance's chain, if it has one.
#[must_use]
pub fn capability_root(instance: &Instance) -> Option<Class> {
    instance.class().capability_root()
}
