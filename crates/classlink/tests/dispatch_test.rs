//! Capability dispatch tests
//!
//! Tests for:
//! - The root-only scenario: differs, clone and inheritance on a bare root
//! - Display overrides installed by a derived constructor
//! - The default clone dropping derived state
//! - Guarded entry points on instances outside every capability root
//! - Dispatch from a constructor before it delegates to its parent
//!
//! Run with: `cargo test --test dispatch_test`

mod common;

use classlink::runtime::{
    clone_of, default_display, differs_of, display_of, equals_of, inherits_from,
    is_exact_class,
};
use classlink::{Args, Capability, Class, ClassSpec, Error, Instance, Result, Violation};
use common::unique_name;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

fn render(instance: &Instance) -> String {
    let mut out = Vec::new();
    display_of(instance, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn root_class() -> Class {
    Class::register(ClassSpec::base(unique_name("R"), 8)).unwrap()
}

// ============================================================================
// Root only
// ============================================================================

#[test]
fn test_root_end_to_end() {
    let r = root_class();
    assert!(r.parent().is_none());

    let a = Instance::of(&r).unwrap();
    let b = Instance::of(&r).unwrap();

    assert!(!differs_of(&a, &a));
    assert!(differs_of(&a, &b));
    assert!(equals_of(&a, &a));
    assert!(inherits_from(&a, &r));

    let c = clone_of(&a).unwrap();
    assert!(inherits_from(&c, &r));
    assert_ne!(c.id(), a.id());
    assert!(differs_of(&a, &c));
}

#[test]
fn test_root_default_display() {
    let r = root_class();
    let a = Instance::of(&r).unwrap();
    let text = render(&a);

    assert_eq!(
        text,
        format!("Object: {:#x}\nClass: {}\nSize: 8\n", a.id(), r.name())
    );
}

#[test]
fn test_equal_contents_still_differ_by_default() {
    let r = root_class();
    let mut a = Instance::of(&r).unwrap();
    let mut b = Instance::of(&r).unwrap();
    a.set(0, 5u64).unwrap();
    b.set(0, 5u64).unwrap();

    assert_eq!(a.fields(), b.fields());
    assert!(differs_of(&a, &b));
}

// ============================================================================
// Inheritance + override
// ============================================================================

fn d_display(_instance: &Instance, sink: &mut dyn Write) -> io::Result<()> {
    write!(sink, "D instance")
}

fn d_constructor(instance: &mut Instance, class: Class, args: &mut Args) -> Result<()> {
    class.construct_parent(instance, args)?;
    instance.capabilities_mut()?.set_display(d_display);
    Ok(())
}

#[test]
fn test_derived_display_override() {
    let r = root_class();
    let d = Class::register(
        ClassSpec::new(unique_name("D"), 8)
            .parent(r)
            .constructor(d_constructor),
    )
    .unwrap();
    let instance = Instance::of(&d).unwrap();

    assert!(inherits_from(&instance, &r));
    assert!(!is_exact_class(&instance, &r));
    assert!(is_exact_class(&instance, &d));
    assert_eq!(render(&instance), "D instance");

    let table = instance.capabilities().unwrap();
    assert!(table.is_overridden(Capability::Display));
    assert!(!table.is_overridden(Capability::Clone));
}

fn verbose_display(instance: &Instance, sink: &mut dyn Write) -> io::Result<()> {
    default_display(instance, sink)?;
    writeln!(sink, "extra: yes")
}

fn verbose_constructor(instance: &mut Instance, class: Class, args: &mut Args) -> Result<()> {
    class.construct_parent(instance, args)?;
    instance.capabilities_mut()?.set_display(verbose_display);
    Ok(())
}

#[test]
fn test_last_constructor_wins() {
    let r = root_class();
    let d = Class::register(
        ClassSpec::new(unique_name("D"), 8)
            .parent(r)
            .constructor(d_constructor),
    )
    .unwrap();
    let e = Class::register(
        ClassSpec::new(unique_name("E"), 8)
            .parent(d)
            .constructor(verbose_constructor),
    )
    .unwrap();

    let text = render(&Instance::of(&e).unwrap());
    assert!(!text.contains("D instance"));
    assert!(text.contains(&format!("Parent: {}\n", d.name())));
    assert!(text.ends_with("extra: yes\n"));
}

// ============================================================================
// Clone hazard
// ============================================================================

const PAYLOAD: usize = 8;

fn payload_constructor(instance: &mut Instance, class: Class, args: &mut Args) -> Result<()> {
    class.construct_parent(instance, args)?;
    instance.set(PAYLOAD, args.int()?)?;
    Ok(())
}

#[test]
fn test_clone_without_override_loses_derived_state() {
    let r = root_class();
    let d = Class::register(
        ClassSpec::new(unique_name("Lossy"), 16)
            .parent(r)
            .constructor(payload_constructor),
    )
    .unwrap();

    let original = Instance::new(&d, &mut classlink::args![42]).unwrap();
    assert_eq!(original.get::<i64>(PAYLOAD), Ok(42));

    let copy = clone_of(&original).unwrap();

    // The copy is a bare root instance: the derived payload is gone.
    assert!(is_exact_class(&copy, &r));
    assert!(!inherits_from(&copy, &d));
    assert!(copy.upcast(&d).is_none());
    assert_eq!(copy.size(), r.size());
    assert!(copy.fields().iter().all(|byte| *byte == 0));
    assert!(copy.get::<i64>(PAYLOAD).is_err());
}

#[test]
fn test_clone_override_can_be_required() {
    let r = root_class();
    let name = unique_name("Strict");
    let strict = Class::register(
        ClassSpec::new(name.as_str(), 16)
            .parent(r)
            .constructor(payload_constructor)
            .require_clone_override(),
    )
    .unwrap();

    assert_eq!(
        Instance::new(&strict, &mut classlink::args![1]).unwrap_err(),
        Error::ProtocolViolation {
            class: name,
            violation: Violation::CloneNotOverridden,
        }
    );
}

fn payload_clone(instance: &Instance) -> Result<Instance> {
    let payload = instance.get::<i64>(PAYLOAD)?;
    Instance::new(&instance.class(), &mut classlink::args![payload])
}

fn copying_constructor(instance: &mut Instance, class: Class, args: &mut Args) -> Result<()> {
    payload_constructor(instance, class, args)?;
    instance.capabilities_mut()?.set_clone(payload_clone);
    Ok(())
}

#[test]
fn test_clone_override_copies_state() {
    let r = root_class();
    let d = Class::register(
        ClassSpec::new(unique_name("Copy"), 16)
            .parent(r)
            .constructor(copying_constructor)
            .require_clone_override(),
    )
    .unwrap();

    let original = Instance::new(&d, &mut classlink::args![9]).unwrap();
    let copy = clone_of(&original).unwrap();

    assert!(is_exact_class(&copy, &d));
    assert_eq!(copy.get::<i64>(PAYLOAD), Ok(9));
    assert!(differs_of(&original, &copy));
}

// ============================================================================
// Guards
// ============================================================================

#[test]
fn test_guards_on_foreign_instance() {
    let stranger = Class::register(ClassSpec::new(unique_name("Alien"), 8)).unwrap();
    let alien = Instance::of(&stranger).unwrap();
    let r = Instance::of(&root_class()).unwrap();

    assert_eq!(render(&alien), "");
    assert!(differs_of(&alien, &alien));
    assert!(differs_of(&r, &alien));
    assert!(differs_of(&alien, &r));
    assert!(matches!(
        clone_of(&alien),
        Err(Error::TypeMismatch { found, .. }) if found == stranger.name()
    ));
}

static EARLY_REJECTIONS: AtomicUsize = AtomicUsize::new(0);

fn clone_before_delegating(instance: &mut Instance, class: Class, args: &mut Args) -> Result<()> {
    if let Err(Error::ProtocolViolation {
        violation: Violation::BaseNotInitialized,
        ..
    }) = clone_of(instance)
    {
        EARLY_REJECTIONS.fetch_add(1, Ordering::SeqCst);
    }
    let mut sink = Vec::new();
    let display = display_of(instance, &mut sink);
    assert!(display.is_err());
    assert!(sink.is_empty());
    class.construct_parent(instance, args)
}

#[test]
fn test_dispatch_before_delegation_fails() {
    let r = root_class();
    let early = Class::register(
        ClassSpec::new(unique_name("Early"), 8)
            .parent(r)
            .constructor(clone_before_delegating),
    )
    .unwrap();

    let before = EARLY_REJECTIONS.load(Ordering::SeqCst);
    assert!(matches!(
        Instance::of(&early),
        Err(Error::ProtocolViolation {
            violation: Violation::BaseNotInitialized,
            ..
        })
    ));
    assert_eq!(EARLY_REJECTIONS.load(Ordering::SeqCst), before + 1);

    // The root itself is unaffected.
    let a = Instance::of(&r).unwrap();
    assert!(clone_of(&a).is_ok());
}
