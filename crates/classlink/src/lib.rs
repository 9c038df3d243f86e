//! `classlink`: A Single-Inheritance Object Runtime
//!
//! `classlink` links plain data blocks into a class hierarchy at runtime. It
//! provides:
//!
//! - **Class Descriptors** registered once, with a bounded ancestor chain
//! - **Owned Instances** whose field blocks extend their parent's as a prefix
//! - **Runtime Type Queries** by class identity, never by name
//! - **Capability Dispatch** for `differs`, `clone` and `display`, guarded
//!   against instances outside the hierarchy
//!
//! # Architecture
//!
//! - **Registry Layer**: append-only class descriptors with `'static`
//!   lifetime
//! - **Lifecycle Layer**: move-only instances; drop runs destruction once
//! - **Dispatch Layer**: per-instance tables installed by constructors
//!
//! # Example
//!
//! ```rust
//! use classlink::{Args, Class, ClassSpec, Instance, Result, runtime};
//! use std::io::Write;
//!
//! fn counter_display(instance: &Instance, sink: &mut dyn Write) -> std::io::Result<()> {
//!     writeln!(sink, "counter = {}", instance.get::<u32>(8).unwrap_or(0))
//! }
//!
//! fn counter_constructor(instance: &mut Instance, class: Class, args: &mut Args) -> Result<()> {
//!     class.construct_parent(instance, args)?;
//!     instance.set(8, u32::try_from(args.int()?).unwrap_or(0))?;
//!     instance.capabilities_mut()?.set_display(counter_display);
//!     Ok(())
//! }
//!
//! let counter = Class::register(
//!     ClassSpec::new("counter", 12)
//!         .parent(Class::object())
//!         .constructor(counter_constructor),
//! )
//! .unwrap();
//!
//! let c = Instance::new(&counter, &mut classlink::args![5]).unwrap();
//! let mut out = Vec::new();
//! runtime::display_of(&c, &mut out).unwrap();
//! assert_eq!(out, b"counter = 5\n");
//! ```

pub mod error;
pub mod runtime;

// Re-export commonly used types
pub use error::{Error, Result, Violation};
pub use runtime::{
    Args, Capabilities, Capability, Class, ClassSpec, Constructor, Destructor, Instance,
    InstanceArena, Key, RuntimeConfig, Value,
};
