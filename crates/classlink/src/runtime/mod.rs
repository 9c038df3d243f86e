//! `classlink` runtime module.
//!
//! This module provides the object runtime, including:
//!
//! - Class registration and the process-wide registry
//! - Instance allocation, construction and destruction
//! - Inheritance-aware type queries
//! - Per-instance capability dispatch
//!
//! # Architecture
//!
//! The runtime is organized into several modules:
//!
//! - [`config`]: One-time runtime configuration
//! - [`class`]: Class descriptors, registration and the ancestor chain
//! - [`args`]: Constructor argument cursor
//! - [`object`]: Owned instances and their lifecycle
//! - [`field`]: Typed field access and ancestor views
//! - [`rtti`]: `identity`, `is_exact_class` and `inherits_from`
//! - [`dispatch`]: Capability tables and guarded entry points
//! - [`arena`]: Key-addressed instance ownership for containers
//!
//! # Initialization
//!
//! The registry and the built-in root class come up on first use with the
//! configuration read from the environment. Call [`init`] first to install
//! an explicit [`RuntimeConfig`] instead.
//!
//! # Example
//!
//! ```rust
//! use classlink::runtime::{self, Class, ClassSpec, Instance};
//!
//! let shape = Class::register(ClassSpec::new("shape", 16).parent(Class::object())).unwrap();
//! let s = Instance::of(&shape).unwrap();
//!
//! assert!(runtime::inherits_from(&s, &Class::object()));
//! assert_eq!(runtime::size_of(Some(&s)), 16);
//! ```

pub mod arena;
pub mod args;
pub mod class;
pub mod config;
pub mod dispatch;
pub mod field;
pub mod object;
pub mod rtti;

pub use arena::{InstanceArena, Key};
pub use args::{Args, Value};
pub use class::{
    Ancestors, BASE_CLASS_NAME, BASE_INSTANCE_SIZE, Class, ClassSpec, Constructor,
    Destructor, registered_count,
};
pub use config::{RuntimeConfig, config, init};
pub use dispatch::{
    Capabilities, Capability, CloneFn, DiffersFn, DisplayFn, base_constructor,
    clone_of, default_clone, default_differs, default_display, differs_of,
    display_of, equals_of,
};
pub use field::{Field, View, ViewMut};
pub use object::{Instance, destroy, instantiate, size_of};
pub use rtti::{capability_root, identity, inherits_from, is_exact_class};
