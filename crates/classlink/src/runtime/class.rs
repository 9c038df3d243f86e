//! Class descriptors and the process-wide class registry.
//!
//! This module implements the class side of the runtime:
//! - Class registration with size, name, parent, constructor and destructor
//! - Single inheritance with a bounded, acyclic ancestor chain
//! - Explicit constructor and destructor delegation along the chain
//!
//! # Architecture
//!
//! Classes are **registered once** and never deallocated:
//! - Each registration yields a distinct [`Class`] handle, even when the
//!   arguments repeat (the registry does not intern)
//! - Descriptor metadata has `'static` lifetime and is immutable
//! - A parent must be registered before its children, so a chain can never
//!   loop back on itself
//!
//! # Capability roots
//!
//! A class registered with [`ClassSpec::base`] is a capability root: its
//! constructor installs the default dispatch table (see
//! [`crate::runtime::dispatch`]). Every class that descends from a
//! capability root inherits the three base capabilities.

use crate::error::{Error, Result, Violation};
use crate::runtime::dispatch::base_constructor;
use crate::runtime::{Args, Instance, config};
use fxhash::FxHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{OnceLock, PoisonError, RwLock};

/// Field block size of the built-in root class, [`Class::object`].
pub const BASE_INSTANCE_SIZE: usize = 8;

/// Name of the built-in root class.
pub const BASE_CLASS_NAME: &str = "abstract object";

/// Constructor signature.
///
/// Called with the instance under construction, the class that owns the
/// constructor, and the argument cursor. A constructor for a derived class
/// first calls [`Class::construct_parent`] and then specializes fields and
/// capability entries.
pub type Constructor = fn(&mut Instance, Class, &mut Args) -> Result<()>;

/// Destructor signature.
///
/// Called with the instance being destroyed and the class that owns the
/// destructor. The runtime only runs the destructor the instance's own
/// class declares; ancestors' cleanup happens only through
/// [`Class::destruct_parent`].
pub type Destructor = fn(&mut Instance, Class);

/// Descriptor data, leaked on registration.
struct ClassInner {
    /// Registration serial, unique per handle
    id: usize,
    name: Box<str>,
    size: usize,
    parent: Option<Class>,
    constructor: Option<Constructor>,
    destructor: Option<Destructor>,
    /// Capability root flag
    base: bool,
    /// Number of classes in the chain, this one included
    depth: usize,
    require_clone_override: bool,
    clone_warned: AtomicBool,
}

/// Append-only index of every registered class.
struct ClassRegistry {
    /// Truncated name -> handles in registration order
    by_name: RwLock<FxHashMap<Box<str>, Vec<Class>>>,
    count: AtomicUsize,
}

static REGISTRY: OnceLock<ClassRegistry> = OnceLock::new();

static OBJECT: OnceLock<Class> = OnceLock::new();

fn registry() -> &'static ClassRegistry {
    REGISTRY.get_or_init(|| ClassRegistry {
        by_name: RwLock::new(FxHashMap::default()),
        count: AtomicUsize::new(0),
    })
}

/// Registration request for a class.
///
/// # Example
///
/// ```rust
/// use classlink::{Class, ClassSpec};
///
/// let point = Class::register(
///     ClassSpec::new("point", 24).parent(Class::object()),
/// )
/// .unwrap();
///
/// assert_eq!(point.size(), 24);
/// assert_eq!(point.parent(), Some(Class::object()));
/// ```
#[derive(Clone)]
pub struct ClassSpec {
    name: String,
    size: usize,
    parent: Option<Class>,
    constructor: Option<Constructor>,
    destructor: Option<Destructor>,
    base: bool,
    require_clone_override: bool,
}

impl ClassSpec {
    /// Starts a request for a class with `size` bytes of fields.
    #[must_use]
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        ClassSpec {
            name: name.into(),
            size,
            parent: None,
            constructor: None,
            destructor: None,
            base: false,
            require_clone_override: false,
        }
    }

    /// Starts a request for a capability root.
    ///
    /// Without an explicit constructor the class uses
    /// [`base_constructor`]. A custom constructor must call it itself.
    #[must_use]
    pub fn base(name: impl Into<String>, size: usize) -> Self {
        ClassSpec {
            base: true,
            ..ClassSpec::new(name, size)
        }
    }

    /// Sets the parent class.
    #[must_use]
    pub fn parent(mut self, parent: Class) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the constructor.
    #[must_use]
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Sets the destructor.
    #[must_use]
    pub fn destructor(mut self, destructor: Destructor) -> Self {
        self.destructor = Some(destructor);
        self
    }

    /// Makes instantiation fail unless the constructor chain overrides
    /// `clone`.
    #[must_use]
    pub fn require_clone_override(mut self) -> Self {
        self.require_clone_override = true;
        self
    }
}

impl fmt::Debug for ClassSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSpec")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("parent", &self.parent.map(|p| p.name()))
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// Handle to a registered class descriptor.
///
/// Handles are cheap to copy and compare by identity: two classes with the
/// same name are still different classes.
///
/// # Example
///
/// ```rust
/// use classlink::{Class, ClassSpec};
///
/// let a = Class::register(ClassSpec::new("twin", 8)).unwrap();
/// let b = Class::register(ClassSpec::new("twin", 8)).unwrap();
///
/// assert_ne!(a, b);
/// assert_eq!(a.name(), b.name());
/// ```
#[derive(Clone, Copy)]
pub struct Class {
    inner: &'static ClassInner,
}

impl Class {
    /// Registers a new class.
    ///
    /// # Errors
    ///
    /// - [`Error::ProtocolViolation`] if the size is smaller than the
    ///   parent's, or a capability root was given a parent
    /// - [`Error::InheritanceTooDeep`] if the chain would exceed
    ///   [`crate::runtime::RuntimeConfig::max_depth`]
    pub fn register(spec: ClassSpec) -> Result<Class> {
        let config = config();
        let name = truncate_name(&spec.name, config.name_capacity());
        if name.len() < spec.name.len() {
            classlink_log::debug!(
                "class name `{}` truncated to `{name}`",
                spec.name
            );
        }

        if let Some(parent) = spec.parent {
            if spec.base {
                return Err(Error::violation(name, Violation::BaseWithParent));
            }
            if spec.size < parent.size() {
                return Err(Error::violation(
                    name,
                    Violation::SizeSmallerThanParent {
                        size: spec.size,
                        parent_size: parent.size(),
                    },
                ));
            }
        }

        let depth = spec.parent.map_or(1, |parent| parent.depth() + 1);
        if depth > config.max_depth() {
            return Err(Error::InheritanceTooDeep {
                depth,
                limit: config.max_depth(),
            });
        }

        let constructor = if spec.base {
            spec.constructor.or(Some(base_constructor as Constructor))
        } else {
            spec.constructor
        };

        Ok(Self::commit(ClassInner {
            id: 0,
            name: name.into(),
            size: spec.size,
            parent: spec.parent,
            constructor,
            destructor: spec.destructor,
            base: spec.base,
            depth,
            require_clone_override: spec.require_clone_override,
            clone_warned: AtomicBool::new(false),
        }))
    }

    fn commit(mut inner: ClassInner) -> Class {
        let registry = registry();
        let mut by_name = registry
            .by_name
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        inner.id = registry.count.fetch_add(1, Ordering::Relaxed);
        let class = Class {
            inner: Box::leak(Box::new(inner)),
        };
        by_name
            .entry(class.inner.name.clone())
            .or_default()
            .push(class);
        drop(by_name);

        classlink_log::debug!(
            "registered class `{}` (#{}, {} bytes, parent: {:?})",
            class.name(),
            class.id(),
            class.size(),
            class.parent().map(|p| p.name())
        );
        class
    }

    /// Returns the built-in capability root, `"abstract object"`.
    ///
    /// Registered on first use, or by [`crate::runtime::init`].
    #[must_use]
    pub fn object() -> Class {
        *OBJECT.get_or_init(|| {
            let config = config();
            Self::commit(ClassInner {
                id: 0,
                name: truncate_name(BASE_CLASS_NAME, config.name_capacity())
                    .into(),
                size: BASE_INSTANCE_SIZE,
                parent: None,
                constructor: Some(base_constructor as Constructor),
                destructor: None,
                base: true,
                depth: 1,
                require_clone_override: false,
                clone_warned: AtomicBool::new(false),
            })
        })
    }

    /// Returns every class registered under `name`, oldest first.
    ///
    /// The name is truncated the same way registration truncates it.
    #[must_use]
    pub fn named(name: &str) -> Vec<Class> {
        let name = truncate_name(name, config().name_capacity());
        registry()
            .by_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Registration serial number, unique per handle.
    #[must_use]
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Class name, possibly truncated at registration.
    #[must_use]
    pub fn name(&self) -> &'static str {
        &self.inner.name
    }

    /// Size of the field block of every instance, in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Parent class, `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<Class> {
        self.inner.parent
    }

    /// Whether this class was registered as a capability root.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.inner.base
    }

    /// Number of classes in the ancestor chain, this one included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    /// Whether instantiation demands a `clone` override.
    #[must_use]
    pub fn requires_clone_override(&self) -> bool {
        self.inner.require_clone_override
    }

    /// Iterates the ancestor chain, starting with this class and ending at
    /// its root.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors {
        Ancestors { next: Some(*self) }
    }

    /// Topmost ancestor.
    #[must_use]
    pub fn root(&self) -> Class {
        // The chain always yields at least `self`.
        self.ancestors().last().unwrap_or(*self)
    }

    /// Nearest capability root on the chain, if any.
    #[must_use]
    pub fn capability_root(&self) -> Option<Class> {
        let root = self.root();
        root.is_base().then_some(root)
    }

    /// Checks if `ancestor` appears on this class's chain.
    ///
    /// A class is a subclass of itself.
    ///
    /// ```rust
    /// use classlink::{Class, ClassSpec};
    ///
    /// let shape = Class::register(ClassSpec::new("shape", 8).parent(Class::object())).unwrap();
    /// let circle = Class::register(ClassSpec::new("circle", 16).parent(shape)).unwrap();
    ///
    /// assert!(circle.is_subclass_of(&shape));
    /// assert!(circle.is_subclass_of(&Class::object()));
    /// assert!(!shape.is_subclass_of(&circle));
    /// ```
    #[must_use]
    pub fn is_subclass_of(&self, ancestor: &Class) -> bool {
        self.ancestors().any(|class| class == *ancestor)
    }

    fn nearest_constructor(&self) -> Option<(Class, Constructor)> {
        self.ancestors()
            .find_map(|class| class.inner.constructor.map(|ctor| (class, ctor)))
    }

    /// Destructor this class itself declares. Never inherited.
    pub(crate) fn destructor(&self) -> Option<Destructor> {
        self.inner.destructor
    }

    fn nearest_destructor(&self) -> Option<(Class, Destructor)> {
        self.ancestors()
            .find_map(|class| class.inner.destructor.map(|dtor| (class, dtor)))
    }

    /// Runs this class's constructor on `instance`.
    ///
    /// A class registered without a constructor is built by its nearest
    /// ancestor's constructor. Destructors are not inherited this way.
    pub(crate) fn construct(
        &self,
        instance: &mut Instance,
        args: &mut Args,
    ) -> Result<()> {
        match self.nearest_constructor() {
            Some((owner, constructor)) => constructor(instance, owner, args),
            None => Ok(()),
        }
    }

    /// Delegates construction to the parent's constructor.
    ///
    /// Call this first from a derived constructor, passing the class the
    /// constructor received.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `instance` does not descend from
    /// this class, or whatever the parent's constructor returns.
    pub fn construct_parent(
        &self,
        instance: &mut Instance,
        args: &mut Args,
    ) -> Result<()> {
        self.check_descends(instance)?;
        match self.parent() {
            Some(parent) => parent.construct(instance, args),
            None => Ok(()),
        }
    }

    /// Runs the nearest ancestor destructor above this class.
    ///
    /// The runtime only calls the class's own destructor. A destructor that
    /// needs its ancestors' cleanup calls this with the class it received.
    /// Does nothing if `instance` does not descend from this class.
    pub fn destruct_parent(&self, instance: &mut Instance) {
        if self.check_descends(instance).is_err() {
            return;
        }
        if let Some((owner, destructor)) =
            self.parent().and_then(|parent| parent.nearest_destructor())
        {
            destructor(instance, owner);
        }
    }

    fn check_descends(&self, instance: &Instance) -> Result<()> {
        if instance.class().is_subclass_of(self) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: self.name().to_string(),
                found: instance.class().name().to_string(),
            })
        }
    }

    /// Marks the missing-clone warning as issued, returning whether it had
    /// been issued before.
    pub(crate) fn mark_clone_warned(&self) -> bool {
        self.inner.clone_warned.swap(true, Ordering::Relaxed)
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        // Identity, never name
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::from_ref(self.inner).hash(state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("size", &self.size())
            .field("parent", &self.parent().map(|p| p.name()))
            .finish()
    }
}

/// Iterator over a class and its ancestors, see [`Class::ancestors`].
#[derive(Debug, Clone)]
pub struct Ancestors {
    next: Option<Class>,
}

impl Iterator for Ancestors {
    type Item = Class;

    fn next(&mut self) -> Option<Class> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Number of classes registered so far, the built-in root included once it
/// exists.
#[must_use]
pub fn registered_count() -> usize {
    registry().count.load(Ordering::Relaxed)
}

/// Cuts `name` to at most `capacity - 1` bytes on a character boundary.
fn truncate_name(name: &str, capacity: usize) -> &str {
    let limit = capacity.saturating_sub(1);
    if name.len() <= limit {
        return name;
    }
    let mut end = limit;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
