//! Owned child lists
//!
//! Every parent/child relationship in the model goes through [`ChildList`]:
//! an ordered list of entity keys whose entries are owned by the list's
//! entity. All mutations follow the same contract: the ownership change and
//! list edit happen first, the list's event fires second, and registered
//! synchronizers run third, so listeners and derived lists always observe a
//! consistent model.
//!
//! Lists are addressed by [`ListRef`] (owner key + role) rather than borrowed
//! directly, which is what lets synchronizers mutate other lists while a
//! cascade is in flight.

use std::cmp::Ordering;
use std::mem;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::arena::EntityKey;
use crate::entity::{EntityData, EntityKind};
use crate::error::{ModelError, Result};
use crate::event::{Event, EventKind, Subject};
use crate::model::Model;
use crate::sync::Synchronizer;

/// Which child list of an entity is being addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListRole {
    Members,
    Aliases,
    Attributes,
    Elements,
    Values,
}

impl ListRole {
    pub fn label(&self) -> &'static str {
        match self {
            ListRole::Members => "members",
            ListRole::Aliases => "aliases",
            ListRole::Attributes => "attributes",
            ListRole::Elements => "elements",
            ListRole::Values => "values",
        }
    }
}

/// Address of one owned child list: an owner entity plus a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListRef {
    pub owner: EntityKey,
    pub role: ListRole,
}

impl ListRef {
    pub fn new(owner: EntityKey, role: ListRole) -> Self {
        Self { owner, role }
    }
}

/// Ordered, owned children plus the event kinds and synchronizers bound to
/// the list
#[derive(Debug)]
pub struct ChildList {
    pub(crate) items: Vec<EntityKey>,
    pub(crate) added: EventKind,
    pub(crate) removed: EventKind,
    pub(crate) syncs: Vec<Synchronizer>,
}

impl ChildList {
    pub(crate) fn new(added: EventKind, removed: EventKind) -> Self {
        Self {
            items: Vec::new(),
            added,
            removed,
            syncs: Vec::new(),
        }
    }

    pub fn items(&self) -> &[EntityKey] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, child: EntityKey) -> bool {
        self.items.contains(&child)
    }
}

fn list_of(entity: &EntityData, role: ListRole) -> Option<&ChildList> {
    match (entity, role) {
        (EntityData::Library(l), ListRole::Members) => Some(&l.members),
        (EntityData::BusinessObject(b), ListRole::Aliases) => Some(&b.aliases),
        (EntityData::Facet(f), ListRole::Aliases) => f.kind.allows_aliases().then_some(&f.aliases),
        (EntityData::Facet(f), ListRole::Attributes) => {
            f.kind.carries_fields().then_some(&f.attributes)
        }
        (EntityData::Facet(f), ListRole::Elements) => {
            f.kind.carries_fields().then_some(&f.elements)
        }
        (EntityData::Enumeration(e), ListRole::Values) => Some(&e.values),
        _ => None,
    }
}

fn list_of_mut(entity: &mut EntityData, role: ListRole) -> Option<&mut ChildList> {
    match (entity, role) {
        (EntityData::Library(l), ListRole::Members) => Some(&mut l.members),
        (EntityData::BusinessObject(b), ListRole::Aliases) => Some(&mut b.aliases),
        (EntityData::Facet(f), ListRole::Aliases) => {
            f.kind.allows_aliases().then_some(&mut f.aliases)
        }
        (EntityData::Facet(f), ListRole::Attributes) => {
            f.kind.carries_fields().then_some(&mut f.attributes)
        }
        (EntityData::Facet(f), ListRole::Elements) => {
            f.kind.carries_fields().then_some(&mut f.elements)
        }
        (EntityData::Enumeration(e), ListRole::Values) => Some(&mut e.values),
        _ => None,
    }
}

/// The entity kinds a list role will hold.
fn role_accepts(role: ListRole, entity: &EntityData) -> bool {
    match role {
        ListRole::Members => entity.member_kind().is_some(),
        ListRole::Aliases => entity.kind() == EntityKind::Alias,
        ListRole::Attributes => entity.kind() == EntityKind::Attribute,
        ListRole::Elements => entity.kind() == EntityKind::Element,
        ListRole::Values => entity.kind() == EntityKind::EnumValue,
    }
}

impl Model {
    pub(crate) fn list(&self, list: ListRef) -> Result<&ChildList> {
        let entity = self.entity(list.owner)?;
        list_of(entity, list.role).ok_or_else(|| {
            ModelError::unsupported(entity.kind().label(), format!("{} list", list.role.label()))
        })
    }

    pub(crate) fn list_mut(&mut self, list: ListRef) -> Result<&mut ChildList> {
        let entity = self.entity_mut(list.owner)?;
        let label = entity.kind().label();
        list_of_mut(entity, list.role)
            .ok_or_else(|| ModelError::unsupported(label, format!("{} list", list.role.label())))
    }

    /// Child keys of a list, in order.
    pub fn children(&self, list: ListRef) -> Result<&[EntityKey]> {
        Ok(&self.list(list)?.items)
    }

    /// First child whose name matches, or `None`.
    pub fn child_by_name(&self, list: ListRef, name: &str) -> Result<Option<EntityKey>> {
        for key in &self.list(list)?.items {
            if self.arena.get(*key).and_then(EntityData::name) == Some(name) {
                return Ok(Some(*key));
            }
        }
        Ok(None)
    }

    /// Append a child to a list.
    pub fn add_child(&mut self, list: ListRef, child: EntityKey) -> Result<()> {
        self.ensure_editable_for(list.owner, "add child")?;
        let len = self.list(list)?.len();
        self.insert_child_raw(list, len, child)
    }

    /// Insert a child at an index.
    pub fn insert_child(&mut self, list: ListRef, index: usize, child: EntityKey) -> Result<()> {
        self.ensure_editable_for(list.owner, "insert child")?;
        self.insert_child_raw(list, index, child)
    }

    /// Insertion without the editability guard, for internal callers and
    /// synchronizer cascades. Carries the full contract otherwise: the
    /// child must be unowned (re-adding to the same list is a no-op), the
    /// index must be within bounds, the list's added event fires, and the
    /// list's synchronizers run last.
    pub(crate) fn insert_child_raw(
        &mut self,
        list: ListRef,
        index: usize,
        child: EntityKey,
    ) -> Result<()> {
        let entity = self.entity(child)?;
        if !role_accepts(list.role, entity) {
            return Err(ModelError::unsupported(
                entity.kind().label(),
                format!("insert into {} list", list.role.label()),
            ));
        }
        let child_owner = entity.owner();

        let l = self.list(list)?;
        if l.items.contains(&child) {
            return Ok(());
        }
        let len = l.items.len();
        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        if child_owner.is_some() {
            return Err(ModelError::invalid_state(
                "entity is already owned and cannot be added to another list",
            ));
        }
        let added = l.added;

        self.entity_mut(child)?.set_owner(Some(list.owner));
        self.list_mut(list)?.items.insert(index, child);
        self.publish(Event::structural(added, Subject::Entity(list.owner), child));
        self.cascade_added(list, index, child);
        Ok(())
    }

    /// Detach a child from a list. No-op when the child is not present.
    pub fn remove_child(&mut self, list: ListRef, child: EntityKey) -> Result<()> {
        self.ensure_editable_for(list.owner, "remove child")?;
        self.remove_child_raw(list, child)
    }

    pub(crate) fn remove_child_raw(&mut self, list: ListRef, child: EntityKey) -> Result<()> {
        let l = self.list(list)?;
        let Some(pos) = l.items.iter().position(|k| *k == child) else {
            return Ok(());
        };
        let removed = l.removed;
        self.list_mut(list)?.items.remove(pos);
        if let Some(entity) = self.arena.get_mut(child) {
            entity.set_owner(None);
        }
        self.publish(Event::structural(removed, Subject::Entity(list.owner), child));
        self.cascade_removed(list, child);
        Ok(())
    }

    /// Swap a child with its predecessor. No-op at the head or when absent.
    pub fn move_child_up(&mut self, list: ListRef, child: EntityKey) -> Result<()> {
        self.ensure_editable_for(list.owner, "move child")?;
        self.move_child_up_raw(list, child)
    }

    pub(crate) fn move_child_up_raw(&mut self, list: ListRef, child: EntityKey) -> Result<()> {
        let l = self.list(list)?;
        let Some(pos) = l.items.iter().position(|k| *k == child) else {
            return Ok(());
        };
        if pos == 0 {
            return Ok(());
        }
        self.list_mut(list)?.items.swap(pos - 1, pos);
        let order = self.list(list)?.items.clone();
        self.publish(Event::structural(
            EventKind::ChildrenReordered,
            Subject::Entity(list.owner),
            child,
        ));
        self.cascade_reordered(list, &order);
        Ok(())
    }

    /// Swap a child with its successor. No-op at the tail or when absent.
    pub fn move_child_down(&mut self, list: ListRef, child: EntityKey) -> Result<()> {
        self.ensure_editable_for(list.owner, "move child")?;
        self.move_child_down_raw(list, child)
    }

    pub(crate) fn move_child_down_raw(&mut self, list: ListRef, child: EntityKey) -> Result<()> {
        let l = self.list(list)?;
        let Some(pos) = l.items.iter().position(|k| *k == child) else {
            return Ok(());
        };
        if pos + 1 == l.items.len() {
            return Ok(());
        }
        self.list_mut(list)?.items.swap(pos, pos + 1);
        let order = self.list(list)?.items.clone();
        self.publish(Event::structural(
            EventKind::ChildrenReordered,
            Subject::Entity(list.owner),
            child,
        ));
        self.cascade_reordered(list, &order);
        Ok(())
    }

    /// Stable-sort a list with a caller comparator over entity payloads.
    /// Fires one `ChildrenReordered` and resorts derived lists to match.
    pub fn sort_children_by<F>(&mut self, list: ListRef, mut cmp: F) -> Result<()>
    where
        F: FnMut(&EntityData, &EntityData) -> Ordering,
    {
        self.ensure_editable_for(list.owner, "sort children")?;
        let mut items = mem::take(&mut self.list_mut(list)?.items);
        items.sort_by(|a, b| match (self.arena.get(*a), self.arena.get(*b)) {
            (Some(ea), Some(eb)) => cmp(ea, eb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        let order = items.clone();
        self.list_mut(list)?.items = items;
        self.publish(Event::bare(EventKind::ChildrenReordered, Subject::Entity(list.owner)));
        self.cascade_reordered(list, &order);
        Ok(())
    }

    /// Stable-sort a list by entity name; unnamed children sort first.
    pub fn sort_children_by_name(&mut self, list: ListRef) -> Result<()> {
        self.sort_children_by(list, |a, b| a.name().cmp(&b.name()))
    }

    /// Replace a list's order wholesale (same members, new order). Used by
    /// synchronizers to mirror a resort into a derived list.
    pub(crate) fn set_list_order(&mut self, list: ListRef, order: Vec<EntityKey>) -> Result<()> {
        if self.list(list)?.items == order {
            return Ok(());
        }
        self.list_mut(list)?.items = order.clone();
        self.publish(Event::bare(EventKind::ChildrenReordered, Subject::Entity(list.owner)));
        self.cascade_reordered(list, &order);
        Ok(())
    }

    /// Register a derived-list synchronizer on a source list. The
    /// synchronizer is immediately backfilled with one add callback per
    /// current child, so the derived list reflects children that were
    /// present before registration.
    pub fn register_synchronizer(&mut self, list: ListRef, mut sync: Synchronizer) -> Result<()> {
        self.list(list)?;
        self.list(sync.derived())?;
        let children = self.list(list)?.items.clone();
        for (index, child) in children.into_iter().enumerate() {
            sync.on_source_added(self, index, child);
        }
        trace!(source = ?list, derived = ?sync.derived(), "register synchronizer");
        self.list_mut(list)?.syncs.push(sync);
        Ok(())
    }

    /// Drop the synchronizer targeting a derived list. Children already
    /// derived remain in place. No-op when no such synchronizer exists.
    pub fn unregister_synchronizer(&mut self, list: ListRef, derived: ListRef) -> Result<()> {
        self.list_mut(list)?.syncs.retain(|s| s.derived() != derived);
        Ok(())
    }

    /// Detach and return the synchronizer targeting a derived list, for
    /// callers that need to walk its source-to-derived map.
    pub(crate) fn take_synchronizer(
        &mut self,
        list: ListRef,
        derived: ListRef,
    ) -> Option<Synchronizer> {
        let l = self.list_mut(list).ok()?;
        let pos = l.syncs.iter().position(|s| s.derived() == derived)?;
        Some(l.syncs.remove(pos))
    }

    /// The list an entity currently sits in, resolved from its owner and
    /// kind. `None` for roots, detached entities, and fixed facets (which
    /// sit in slots, not lists).
    pub(crate) fn containing_list(&self, key: EntityKey) -> Option<ListRef> {
        let entity = self.arena.get(key)?;
        let owner = entity.owner()?;
        let role = match entity.kind() {
            EntityKind::Alias => ListRole::Aliases,
            EntityKind::Attribute => ListRole::Attributes,
            EntityKind::Element => ListRole::Elements,
            EntityKind::EnumValue => ListRole::Values,
            EntityKind::BusinessObject | EntityKind::SimpleType | EntityKind::Enumeration => {
                ListRole::Members
            }
            EntityKind::Facet => match self.arena.get(owner)?.kind() {
                EntityKind::Library => ListRole::Members,
                _ => return None,
            },
            EntityKind::Library => return None,
        };
        let list = ListRef::new(owner, role);
        match self.list(list) {
            Ok(l) if l.items.contains(&key) => Some(list),
            _ => None,
        }
    }

    // Cascade helpers. Synchronizers are lifted out of the list while they
    // run so they can mutate the model; any synchronizer registered during
    // the cascade lands behind the restored originals.

    fn take_syncs(&mut self, list: ListRef) -> Option<Vec<Synchronizer>> {
        match self.list_mut(list) {
            Ok(l) if !l.syncs.is_empty() => Some(mem::take(&mut l.syncs)),
            _ => None,
        }
    }

    fn restore_syncs(&mut self, list: ListRef, mut syncs: Vec<Synchronizer>) {
        if let Ok(l) = self.list_mut(list) {
            syncs.append(&mut l.syncs);
            l.syncs = syncs;
        }
    }

    fn cascade_added(&mut self, list: ListRef, index: usize, child: EntityKey) {
        let Some(mut syncs) = self.take_syncs(list) else {
            return;
        };
        for sync in &mut syncs {
            sync.on_source_added(self, index, child);
        }
        self.restore_syncs(list, syncs);
    }

    fn cascade_removed(&mut self, list: ListRef, child: EntityKey) {
        let Some(mut syncs) = self.take_syncs(list) else {
            return;
        };
        for sync in &mut syncs {
            sync.on_source_removed(self, child);
        }
        self.restore_syncs(list, syncs);
    }

    pub(crate) fn cascade_renamed(&mut self, list: ListRef, child: EntityKey, old_name: &str) {
        let Some(mut syncs) = self.take_syncs(list) else {
            return;
        };
        for sync in &mut syncs {
            sync.on_source_renamed(self, list, child, old_name);
        }
        self.restore_syncs(list, syncs);
    }

    fn cascade_reordered(&mut self, list: ListRef, order: &[EntityKey]) {
        let Some(mut syncs) = self.take_syncs(list) else {
            return;
        };
        for sync in &mut syncs {
            sync.on_source_reordered(self, order);
        }
        self.restore_syncs(list, syncs);
    }

    /// Refresh the derived names produced for one derived-list owner, after
    /// something its naming depends on (a contextual facet label) changed.
    pub(crate) fn refresh_derived_names_for(&mut self, list: ListRef, derived_owner: EntityKey) {
        let Some(mut syncs) = self.take_syncs(list) else {
            return;
        };
        for sync in &mut syncs {
            if sync.derived().owner == derived_owner {
                sync.refresh_derived_names(self, list);
            }
        }
        self.restore_syncs(list, syncs);
    }
}
