//! Generational arena backing all model entities
//!
//! Entities live in slots indexed by [`EntityKey`]; each slot carries a
//! generation counter that is bumped on removal, so keys held after a removal
//! go stale instead of aliasing whatever reuses the slot. All lookups on
//! stale keys return `None`.

use serde::{Deserialize, Serialize};

use crate::entity::EntityData;

/// Stable handle to one entity in a [`EntityArena`].
///
/// Keys are cheap to copy and remain valid until the entity is removed;
/// afterwards they are detectably stale forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    idx: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    data: Option<EntityData>,
}

/// Slot storage for entities with generation-checked lookups
#[derive(Debug, Default)]
pub struct EntityArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity and return its key, reusing freed slots when possible.
    pub fn insert(&mut self, data: EntityData) -> EntityKey {
        self.live += 1;
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.data = Some(data);
            return EntityKey {
                idx,
                generation: slot.generation,
            };
        }
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            data: Some(data),
        });
        EntityKey { idx, generation: 0 }
    }

    /// Remove an entity, invalidating its key. Returns `None` for stale keys.
    pub fn remove(&mut self, key: EntityKey) -> Option<EntityData> {
        let slot = self.slots.get_mut(key.idx as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.idx);
        self.live -= 1;
        Some(data)
    }

    pub fn get(&self, key: EntityKey) -> Option<&EntityData> {
        let slot = self.slots.get(key.idx as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.data.as_ref()
    }

    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut EntityData> {
        let slot = self.slots.get_mut(key.idx as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.data.as_mut()
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &EntityData)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.data.as_ref().map(|data| {
                (
                    EntityKey {
                        idx: idx as u32,
                        generation: slot.generation,
                    },
                    data,
                )
            })
        })
    }

    /// Drop every entity. Keys handed out before the clear all go stale.
    pub fn clear(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.data.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(idx as u32);
            }
        }
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Alias;

    fn alias(name: &str) -> EntityData {
        EntityData::Alias(Alias::new(name))
    }

    #[test]
    fn test_insert_and_get() {
        let mut arena = EntityArena::new();
        let a = arena.insert(alias("a"));
        let b = arena.insert(alias("b"));
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a).unwrap().name(), Some("a"));
        assert_eq!(arena.get(b).unwrap().name(), Some("b"));
    }

    #[test]
    fn test_removed_key_goes_stale() {
        let mut arena = EntityArena::new();
        let a = arena.insert(alias("a"));
        assert!(arena.remove(a).is_some());
        assert!(arena.get(a).is_none());
        assert!(arena.remove(a).is_none());
        assert!(!arena.contains(a));
        assert!(arena.is_empty());
    }

    #[test]
    fn test_slot_reuse_does_not_revive_old_keys() {
        let mut arena = EntityArena::new();
        let a = arena.insert(alias("a"));
        arena.remove(a);
        let b = arena.insert(alias("b"));
        // The slot is reused but the old key stays dead.
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).unwrap().name(), Some("b"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_iter_skips_freed_slots() {
        let mut arena = EntityArena::new();
        let a = arena.insert(alias("a"));
        let _b = arena.insert(alias("b"));
        let _c = arena.insert(alias("c"));
        arena.remove(a);

        let names: Vec<_> = arena
            .iter()
            .map(|(_, data)| data.name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut arena = EntityArena::new();
        let a = arena.insert(alias("a"));
        let b = arena.insert(alias("b"));
        arena.clear();
        assert!(arena.is_empty());
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_none());
        let c = arena.insert(alias("c"));
        assert!(arena.contains(c));
    }
}
