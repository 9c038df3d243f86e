//! Instance allocation and lifecycle management.
//!
//! This module implements the instance side of the runtime:
//! - Zeroed field blocks sized exactly to the class
//! - Constructor invocation with protocol checks afterwards
//! - Exactly-once destruction through ownership
//!
//! # Architecture
//!
//! An [`Instance`] owns a heap record holding:
//! - The class tag, written once before any constructor runs
//! - The capability table, absent until the base constructor installs it
//! - The field block, whose leading bytes are the parent's block
//!
//! The record is boxed so every instance keeps a stable address, which is
//! its identity for the default `differs`.
//!
//! # Ownership
//!
//! `Instance` is move-only. Dropping it runs the destructor declared by the
//! instance's own class, if any, and frees the block. There is no way to
//! destroy the same instance twice or to reach it afterwards.

use crate::error::{Error, Result, Violation};
use crate::runtime::dispatch::{Capabilities, Capability};
use crate::runtime::field::{self, Field, View, ViewMut};
use crate::runtime::{Args, Class};
use std::cell::Cell;
use std::fmt;

/// Heap record behind an [`Instance`].
struct RawInstance {
    /// Class tag, never reassigned
    class: Class,
    /// Dispatch table; `Some` marks the instance as base-initialized
    table: Option<Capabilities>,
    fields: Box<[u8]>,
    /// Set once the constructor chain finished and passed the checks
    constructed: bool,
    /// Set when dispatch reached the instance before its table existed
    dispatched_early: Cell<bool>,
}

/// Owned instance of a registered class.
///
/// # Example
///
/// ```rust
/// use classlink::{Class, ClassSpec, Instance, args};
///
/// let point = Class::register(ClassSpec::new("point", 16).parent(Class::object())).unwrap();
/// let mut p = Instance::new(&point, &mut args![]).unwrap();
///
/// p.set(8, 42u32).unwrap();
/// assert_eq!(p.get::<u32>(8).unwrap(), 42);
/// assert_eq!(p.class(), point);
/// assert_eq!(p.size(), 16);
/// ```
pub struct Instance {
    raw: Box<RawInstance>,
}

impl Instance {
    /// Allocates and constructs an instance of `class`.
    ///
    /// The constructor (the class's own or its nearest ancestor's) runs once
    /// with `args`.
    ///
    /// # Errors
    ///
    /// - [`Error::AllocationFailure`] if the field block cannot be allocated
    /// - [`Error::ProtocolViolation`] if a class descending from a
    ///   capability root finished construction without the base constructor
    ///   having run, dispatched a capability before it ran, or did not
    ///   override `clone` when it must
    /// - Any error returned by the constructor chain
    ///
    /// A failed instance is released without running its destructor.
    pub fn new(class: &Class, args: &mut Args) -> Result<Self> {
        let fields = allocate(class.size())?;
        let mut instance = Instance {
            raw: Box::new(RawInstance {
                class: *class,
                table: None,
                fields,
                constructed: false,
                dispatched_early: Cell::new(false),
            }),
        };

        class.construct(&mut instance, args)?;
        instance.check_protocol()?;
        instance.raw.constructed = true;

        classlink_log::trace!(
            "instantiated `{}` at {:#x}",
            class.name(),
            instance.id()
        );
        Ok(instance)
    }

    /// Allocates and constructs an instance with no arguments.
    ///
    /// # Errors
    ///
    /// See [`Instance::new`].
    pub fn of(class: &Class) -> Result<Self> {
        Self::new(class, &mut Args::new())
    }

    fn check_protocol(&self) -> Result<()> {
        let class = self.class();
        let Some(root) = class.capability_root() else {
            return Ok(());
        };
        let Some(table) = &self.raw.table else {
            return Err(Error::violation(
                class.name(),
                Violation::BaseNotInitialized,
            ));
        };
        if self.raw.dispatched_early.get() {
            return Err(Error::violation(
                class.name(),
                Violation::BaseNotInitialized,
            ));
        }

        if !table.is_overridden(Capability::Clone) {
            if class.requires_clone_override() {
                return Err(Error::violation(
                    class.name(),
                    Violation::CloneNotOverridden,
                ));
            }
            if class.size() > root.size() && !class.mark_clone_warned() {
                classlink_log::warn!(
                    "class `{}` adds {} bytes of fields but keeps the default clone; copies will lose them",
                    class.name(),
                    class.size() - root.size()
                );
            }
        }
        Ok(())
    }

    /// Class this instance was created with.
    #[must_use]
    pub fn class(&self) -> Class {
        self.raw.class
    }

    /// Size of the field block, equal to `self.class().size()`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.raw.fields.len()
    }

    /// Stable identity of this instance (its address).
    #[must_use]
    pub fn id(&self) -> usize {
        std::ptr::from_ref::<RawInstance>(&self.raw).addr()
    }

    /// Whether the base constructor has installed the capability table.
    #[must_use]
    pub fn is_base_initialized(&self) -> bool {
        self.raw.table.is_some()
    }

    /// Capability table, `None` before the base constructor ran or for
    /// classes outside any capability root.
    #[must_use]
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.raw.table.as_ref()
    }

    /// Mutable capability table, for constructors installing overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] with
    /// [`Violation::BaseNotInitialized`] if the base constructor has not run
    /// yet, which means the calling constructor skipped delegation.
    pub fn capabilities_mut(&mut self) -> Result<&mut Capabilities> {
        let name = self.raw.class.name();
        self.raw
            .table
            .as_mut()
            .ok_or_else(|| Error::violation(name, Violation::BaseNotInitialized))
    }

    /// Records that a capability was dispatched before the table existed.
    pub(crate) fn mark_dispatched_early(&self) {
        self.raw.dispatched_early.set(true);
    }

    pub(crate) fn install_capabilities(&mut self, table: Capabilities) {
        self.raw.table = Some(table);
    }

    /// The whole field block.
    #[must_use]
    pub fn fields(&self) -> &[u8] {
        &self.raw.fields
    }

    /// The whole field block, mutably.
    pub fn fields_mut(&mut self) -> &mut [u8] {
        &mut self.raw.fields
    }

    /// Reads a field at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldOutOfBounds`] if the field does not fit in the
    /// block.
    pub fn get<T: Field>(&self, offset: usize) -> Result<T> {
        field::get(&self.raw.fields, offset)
    }

    /// Writes a field at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldOutOfBounds`] if the field does not fit in the
    /// block.
    pub fn set<T: Field>(&mut self, offset: usize, value: T) -> Result<()> {
        field::set(&mut self.raw.fields, offset, value)
    }

    /// Views this instance as `ancestor`, limited to its prefix of the block.
    ///
    /// Returns `None` if `ancestor` is not on this instance's chain.
    #[must_use]
    pub fn upcast(&self, ancestor: &Class) -> Option<View<'_>> {
        self.class()
            .is_subclass_of(ancestor)
            .then(|| View::new(*ancestor, &self.raw.fields[..ancestor.size()]))
    }

    /// Mutable counterpart of [`Instance::upcast`].
    #[must_use]
    pub fn upcast_mut(&mut self, ancestor: &Class) -> Option<ViewMut<'_>> {
        if !self.class().is_subclass_of(ancestor) {
            return None;
        }
        Some(ViewMut::new(
            *ancestor,
            &mut self.raw.fields[..ancestor.size()],
        ))
    }
}

/// Allocates a zeroed block, reporting failure instead of aborting.
fn allocate(size: usize) -> Result<Box<[u8]>> {
    let mut block = Vec::new();
    block
        .try_reserve_exact(size)
        .map_err(|_| Error::AllocationFailure { size })?;
    block.resize(size, 0u8);
    Ok(block.into_boxed_slice())
}

impl Drop for Instance {
    fn drop(&mut self) {
        if !self.raw.constructed {
            return;
        }
        let class = self.class();
        if let Some(destructor) = class.destructor() {
            destructor(self, class);
        }
        classlink_log::trace!("destroyed `{}` at {:#x}", class.name(), self.id());
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        // Identity, never contents
        self.id() == other.id()
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &format_args!("{:#x}", self.id()))
            .field("class", &self.class().name())
            .field("size", &self.size())
            .field("base_initialized", &self.is_base_initialized())
            .finish()
    }
}

/// Allocates and constructs an instance of `class`.
///
/// # Errors
///
/// See [`Instance::new`].
pub fn instantiate(class: &Class, args: &mut Args) -> Result<Instance> {
    Instance::new(class, args)
}

/// Destroys an instance. Passing `None` does nothing.
///
/// Equivalent to dropping the instance: the destructor declared by its
/// class runs, if there is one, then the block is freed.
pub fn destroy(instance: impl Into<Option<Instance>>) {
    if let Some(instance) = instance.into() {
        drop(instance);
    }
}

/// Size of the instance's class, or 0 for `None`.
#[must_use]
pub fn size_of(instance: Option<&Instance>) -> usize {
    instance.map_or(0, Instance::size)
}
