//! Instance arena with generational keys.
//!
//! Containers built on the runtime hold [`Key`]s instead of references to
//! instances they do not own. The arena owns the instances:
//!
//! - **Stable keys**: a key stays valid until its instance is removed
//! - **Stale detection**: a freed slot bumps its generation, so old keys
//!   miss instead of reaching a different instance
//! - **Slot reuse**: freed slots are recycled, keys never are
//!
//! # Example
//!
//! ```
//! use classlink::runtime::InstanceArena;
//! use classlink::{Class, Instance};
//!
//! let mut arena = InstanceArena::new();
//! let key = arena.insert(Instance::of(&Class::object()).unwrap());
//!
//! assert!(arena.contains(key));
//! let instance = arena.remove(key).unwrap();
//! assert!(arena.get(key).is_none());
//! drop(instance);
//! ```

use crate::runtime::Instance;

/// Handle to an instance owned by an [`InstanceArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    index: usize,
    generation: u32,
}

impl Key {
    /// Slot index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Slot generation at insertion time.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot {
    generation: u32,
    instance: Option<Instance>,
}

/// Owner of instances addressed by [`Key`].
#[derive(Default)]
pub struct InstanceArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    len: usize,
}

impl InstanceArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `instance` and returns its key.
    pub fn insert(&mut self, instance: Instance) -> Key {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.instance = Some(instance);
            return Key {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            instance: Some(instance),
        });
        Key {
            index,
            generation: 0,
        }
    }

    fn slot(&self, key: Key) -> Option<&Slot> {
        self.slots
            .get(key.index)
            .filter(|slot| slot.generation == key.generation)
    }

    /// Instance under `key`, `None` once it was removed.
    #[must_use]
    pub fn get(&self, key: Key) -> Option<&Instance> {
        self.slot(key)?.instance.as_ref()
    }

    /// Mutable instance under `key`.
    #[must_use]
    pub fn get_mut(&mut self, key: Key) -> Option<&mut Instance> {
        self.slots
            .get_mut(key.index)
            .filter(|slot| slot.generation == key.generation)?
            .instance
            .as_mut()
    }

    /// Whether `key` still refers to a live instance.
    #[must_use]
    pub fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    /// Removes and returns the instance under `key`, invalidating the key.
    ///
    /// Returns `None` for stale keys.
    pub fn remove(&mut self, key: Key) -> Option<Instance> {
        let slot = self
            .slots
            .get_mut(key.index)
            .filter(|slot| slot.generation == key.generation)?;
        let instance = slot.instance.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;
        Some(instance)
    }

    /// Number of live instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates live instances with their keys, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Instance)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.instance.as_ref().map(|instance| {
                (
                    Key {
                        index,
                        generation: slot.generation,
                    },
                    instance,
                )
            })
        })
    }

    /// Destroys every instance. Outstanding keys become stale.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.instance.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
        self.len = 0;
    }
}

impl std::fmt::Debug for InstanceArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceArena")
            .field("len", &self.len)
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Class, ClassSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    fn count_drop(_instance: &mut Instance, _class: Class) {
        DROPS.fetch_add(1, Ordering::SeqCst);
    }

    fn object() -> Instance {
        Instance::of(&Class::object()).unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let mut arena = InstanceArena::new();
        let a = arena.insert(object());
        let b = arena.insert(object());

        assert_eq!(arena.len(), 2);
        assert_ne!(a, b);
        assert_ne!(arena.get(a).unwrap().id(), arena.get(b).unwrap().id());
    }

    #[test]
    fn test_stale_key_after_reuse() {
        let mut arena = InstanceArena::new();
        let old = arena.insert(object());
        arena.remove(old).unwrap();

        let new = arena.insert(object());
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(arena.get(old).is_none());
        assert!(arena.get_mut(old).is_none());
        assert!(arena.remove(old).is_none());
        assert!(arena.contains(new));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_clear_runs_destructors() {
        let class = Class::register(
            ClassSpec::new("ArenaCounted", 8)
                .parent(Class::object())
                .destructor(count_drop),
        )
        .unwrap();

        let mut arena = InstanceArena::new();
        let keys: Vec<_> = (0..3)
            .map(|_| arena.insert(Instance::of(&class).unwrap()))
            .collect();
        assert_eq!(arena.iter().count(), 3);

        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(DROPS.load(Ordering::SeqCst), 3);
        assert!(keys.iter().all(|key| !arena.contains(*key)));
    }
}
