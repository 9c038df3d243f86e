//! Capability dispatch for `classlink` instances.
//!
//! Every instance descending from a capability root carries a
//! [`Capabilities`] table with three entries:
//!
//! - **differs**: inequality between two instances
//! - **clone**: a new instance copied from this one
//! - **display**: a human-readable dump to a byte sink
//!
//! # Dispatch Protocol
//!
//! 1. The base constructor installs the default table
//! 2. Each derived constructor delegates to its parent, then overwrites the
//!    entries it specializes; the last writer wins
//! 3. Callers go through [`display_of`], [`clone_of`] and [`differs_of`],
//!    which check the instance descends from a capability root before
//!    calling through its table
//!
//! Instances outside every capability root get a neutral result: no output,
//! an [`Error::TypeMismatch`], or "always differs". An instance under a
//! capability root whose table is not installed yet is a
//! [`Error::ProtocolViolation`], and its construction fails.
//!
//! # Example
//!
//! ```rust
//! use classlink::runtime::dispatch;
//! use classlink::{Class, Instance};
//!
//! let a = Instance::of(&Class::object()).unwrap();
//! let b = Instance::of(&Class::object()).unwrap();
//!
//! assert!(!dispatch::differs_of(&a, &a));
//! assert!(dispatch::differs_of(&a, &b));
//!
//! let mut out = Vec::new();
//! dispatch::display_of(&a, &mut out).unwrap();
//! assert!(String::from_utf8(out).unwrap().contains("Class: abstract object"));
//! ```

use crate::error::{Error, Result, Violation};
use crate::runtime::{Args, Class, Instance};
use std::fmt;
use std::io;

/// Inequality entry: `true` when the two instances differ.
pub type DiffersFn = fn(&Instance, &Instance) -> bool;

/// Copy entry.
pub type CloneFn = fn(&Instance) -> Result<Instance>;

/// Display entry.
pub type DisplayFn = fn(&Instance, &mut dyn io::Write) -> io::Result<()>;

/// Names of the table entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// [`DiffersFn`] entry
    Differs,
    /// [`CloneFn`] entry
    Clone,
    /// [`DisplayFn`] entry
    Display,
}

impl Capability {
    const fn bit(self) -> u8 {
        match self {
            Capability::Differs => 1,
            Capability::Clone => 1 << 1,
            Capability::Display => 1 << 2,
        }
    }
}

/// Per-instance dispatch table.
///
/// Tracks which entries were replaced since the defaults were installed.
#[derive(Clone, Copy)]
pub struct Capabilities {
    differs: DiffersFn,
    clone: CloneFn,
    display: DisplayFn,
    overridden: u8,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            differs: default_differs,
            clone: default_clone,
            display: default_display,
            overridden: 0,
        }
    }
}

impl Capabilities {
    /// Current `differs` entry.
    #[must_use]
    pub fn differs_fn(&self) -> DiffersFn {
        self.differs
    }

    /// Current `clone` entry.
    #[must_use]
    pub fn clone_fn(&self) -> CloneFn {
        self.clone
    }

    /// Current `display` entry.
    #[must_use]
    pub fn display_fn(&self) -> DisplayFn {
        self.display
    }

    /// Replaces the `differs` entry.
    pub fn set_differs(&mut self, differs: DiffersFn) -> &mut Self {
        self.differs = differs;
        self.overridden |= Capability::Differs.bit();
        self
    }

    /// Replaces the `clone` entry.
    pub fn set_clone(&mut self, clone: CloneFn) -> &mut Self {
        self.clone = clone;
        self.overridden |= Capability::Clone.bit();
        self
    }

    /// Replaces the `display` entry.
    pub fn set_display(&mut self, display: DisplayFn) -> &mut Self {
        self.display = display;
        self.overridden |= Capability::Display.bit();
        self
    }

    /// Whether `capability` was replaced after the defaults were installed.
    #[must_use]
    pub fn is_overridden(&self, capability: Capability) -> bool {
        self.overridden & capability.bit() != 0
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("differs", &self.is_overridden(Capability::Differs))
            .field("clone", &self.is_overridden(Capability::Clone))
            .field("display", &self.is_overridden(Capability::Display))
            .finish()
    }
}

/// Constructor of every capability root.
///
/// Installs the default table, which marks the instance base-initialized.
/// A custom root constructor must call this before anything else.
///
/// # Errors
///
/// Never fails; the signature matches [`crate::runtime::Constructor`].
pub fn base_constructor(
    instance: &mut Instance,
    class: Class,
    _args: &mut Args,
) -> Result<()> {
    instance.install_capabilities(Capabilities::default());
    classlink_log::trace!(
        "base-initialized `{}` through `{}`",
        instance.class().name(),
        class.name()
    );
    Ok(())
}

/// Default `differs`: identity inequality.
///
/// Distinct instances always differ, whatever their fields hold.
#[must_use]
pub fn default_differs(a: &Instance, b: &Instance) -> bool {
    a.id() != b.id()
}

/// Default `clone`: a fresh instance of the capability root.
///
/// Derived state is not copied. Classes that add fields override this.
///
/// # Errors
///
/// [`Error::TypeMismatch`] if `instance` has no capability root, or any
/// error from instantiating the root.
pub fn default_clone(instance: &Instance) -> Result<Instance> {
    let root = instance
        .class()
        .capability_root()
        .ok_or_else(|| mismatch(instance))?;
    Instance::of(&root)
}

/// Default `display`: address, class name, size and parent name.
///
/// # Errors
///
/// Propagates write errors from `sink`.
pub fn default_display(
    instance: &Instance,
    sink: &mut dyn io::Write,
) -> io::Result<()> {
    let class = instance.class();
    writeln!(sink, "Object: {:#x}", instance.id())?;
    writeln!(sink, "Class: {}", class.name())?;
    writeln!(sink, "Size: {}", class.size())?;
    if let Some(parent) = class.parent() {
        writeln!(sink, "Parent: {}", parent.name())?;
    }
    Ok(())
}

fn mismatch(instance: &Instance) -> Error {
    Error::TypeMismatch {
        expected: Class::object().name().to_string(),
        found: instance.class().name().to_string(),
    }
}

/// Returns the table if `instance` descends from a capability root.
///
/// An instance under a capability root without a table is still being
/// constructed and was dispatched before delegating to its parent. That is
/// a protocol violation, reported here and again when construction ends.
fn guard(instance: &Instance, operation: &str) -> Result<Capabilities> {
    let class = instance.class();
    if class.capability_root().is_none() {
        classlink_log::debug!(
            "{operation}: `{}` does not descend from a capability root",
            class.name()
        );
        return Err(mismatch(instance));
    }
    match instance.capabilities() {
        Some(table) => Ok(*table),
        None => {
            instance.mark_dispatched_early();
            classlink_log::debug!(
                "{operation}: `{}` has no capability table yet",
                class.name()
            );
            Err(Error::violation(class.name(), Violation::BaseNotInitialized))
        }
    }
}

/// Writes `instance` to `sink` through its `display` entry.
///
/// Does nothing for instances outside every capability root.
///
/// # Errors
///
/// Propagates write errors from the entry. An instance whose base
/// constructor has not run yet is an error wrapping
/// [`Error::ProtocolViolation`].
pub fn display_of(instance: &Instance, sink: &mut dyn io::Write) -> io::Result<()> {
    match guard(instance, "display") {
        Ok(table) => (table.display)(instance, sink),
        Err(Error::TypeMismatch { .. }) => Ok(()),
        Err(err) => Err(io::Error::other(err)),
    }
}

/// Copies `instance` through its `clone` entry.
///
/// # Errors
///
/// [`Error::TypeMismatch`] for instances outside every capability root,
/// [`Error::ProtocolViolation`] before the base constructor ran, or
/// whatever the entry returns.
pub fn clone_of(instance: &Instance) -> Result<Instance> {
    let table = guard(instance, "clone")?;
    (table.clone)(instance)
}

/// Compares two instances through the `differs` entry of `a`.
///
/// Returns `true` if either instance is outside every capability root or
/// has not been base-initialized.
#[must_use]
pub fn differs_of(a: &Instance, b: &Instance) -> bool {
    match (guard(a, "differs"), guard(b, "differs")) {
        (Ok(table), Ok(_)) => (table.differs)(a, b),
        _ => true,
    }
}

/// Negation of [`differs_of`].
#[must_use]
pub fn equals_of(a: &Instance, b: &Instance) -> bool {
    !differs_of(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ClassSpec;

    fn quiet_display(_instance: &Instance, sink: &mut dyn io::Write) -> io::Result<()> {
        write!(sink, "quiet")
    }

    fn never_differs(_a: &Instance, _b: &Instance) -> bool {
        false
    }

    fn quiet_constructor(
        instance: &mut Instance,
        class: Class,
        args: &mut Args,
    ) -> Result<()> {
        class.construct_parent(instance, args)?;
        instance
            .capabilities_mut()?
            .set_display(quiet_display)
            .set_differs(never_differs);
        Ok(())
    }

    fn early_constructor(
        instance: &mut Instance,
        class: Class,
        args: &mut Args,
    ) -> Result<()> {
        assert!(matches!(
            clone_of(instance),
            Err(Error::ProtocolViolation {
                violation: Violation::BaseNotInitialized,
                ..
            })
        ));
        assert!(display_of(instance, &mut Vec::new()).is_err());
        assert!(differs_of(instance, instance));
        class.construct_parent(instance, args)
    }

    fn display_string(instance: &Instance) -> String {
        let mut out = Vec::new();
        display_of(instance, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_default_table() {
        let table = Capabilities::default();
        assert!(!table.is_overridden(Capability::Differs));
        assert!(!table.is_overridden(Capability::Clone));
        assert!(!table.is_overridden(Capability::Display));
    }

    #[test]
    fn test_setters_record_overrides() {
        let mut table = Capabilities::default();
        table.set_display(quiet_display);

        assert!(table.is_overridden(Capability::Display));
        assert!(!table.is_overridden(Capability::Clone));
        assert!(format!("{table:?}").contains("display: true"));
    }

    #[test]
    fn test_default_display_format() {
        let root = Class::register(ClassSpec::base("DispRoot", 8)).unwrap();
        let child =
            Class::register(ClassSpec::new("DispChild", 8).parent(root)).unwrap();

        let root_text = display_string(&Instance::of(&root).unwrap());
        assert!(root_text.starts_with("Object: 0x"));
        assert!(root_text.contains("Class: DispRoot\nSize: 8\n"));
        assert!(!root_text.contains("Parent:"));

        let child_text = display_string(&Instance::of(&child).unwrap());
        assert!(child_text.ends_with("Class: DispChild\nSize: 8\nParent: DispRoot\n"));
    }

    #[test]
    fn test_override_wins() {
        let class = Class::register(
            ClassSpec::new("DispQuiet", 8)
                .parent(Class::object())
                .constructor(quiet_constructor),
        )
        .unwrap();
        let a = Instance::of(&class).unwrap();
        let b = Instance::of(&class).unwrap();

        assert_eq!(display_string(&a), "quiet");
        assert!(equals_of(&a, &b));
    }

    #[test]
    fn test_guard_rejects_foreign_instances() {
        let plain = Class::register(ClassSpec::new("DispPlain", 8)).unwrap();
        let foreign = Instance::of(&plain).unwrap();
        let object = Instance::of(&Class::object()).unwrap();

        assert_eq!(display_string(&foreign), "");
        assert!(differs_of(&foreign, &foreign));
        assert!(differs_of(&object, &foreign));
        assert!(!equals_of(&foreign, &foreign));
        assert_eq!(
            clone_of(&foreign).unwrap_err(),
            Error::TypeMismatch {
                expected: Class::object().name().to_string(),
                found: "DispPlain".to_string(),
            }
        );
    }

    #[test]
    fn test_dispatch_before_delegation_fails() {
        let class = Class::register(
            ClassSpec::new("DispEarly", 8)
                .parent(Class::object())
                .constructor(early_constructor),
        )
        .unwrap();

        match Instance::of(&class) {
            Err(Error::ProtocolViolation { violation, .. }) => {
                assert_eq!(violation, Violation::BaseNotInitialized);
            }
            other => panic!("expected a protocol violation, got {other:?}"),
        }
    }

    #[test]
    fn test_default_clone_makes_root_instance() {
        let root = Class::register(ClassSpec::base("DispCloneRoot", 8)).unwrap();
        let original = Instance::of(&root).unwrap();
        let copy = clone_of(&original).unwrap();

        assert_eq!(copy.class(), root);
        assert!(differs_of(&original, &copy));
    }
}
