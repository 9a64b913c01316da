//! Derived-list synchronizers
//!
//! A synchronizer watches one source child list and maintains a derived
//! child list whose entries' names are computed from the source names. The
//! source-to-derived pairing is held in an explicit key map, so renames and
//! reorders never have to guess which derived entry belongs to which source
//! by recomputing names.
//!
//! Derived entries are created and removed through the ordinary list
//! operations, so every hop of a cascade publishes its own events and drives
//! its own synchronizers. That is what chains business object aliases into
//! facet aliases and facet aliases into list-facet aliases.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::arena::EntityKey;
use crate::children::ListRef;
use crate::entity::{Alias, EntityData};
use crate::model::Model;

/// How a derived entry's name is computed from its source's name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveRule {
    /// `{source}_{facet token}`, the token taken from the derived list's
    /// owning facet.
    FacetAlias,
    /// `{source}_List`, for list-view facets fed by a content facet's
    /// alias list.
    ListFacetAlias,
}

/// Mirrors one source list into one derived list
#[derive(Debug)]
pub struct Synchronizer {
    derived: ListRef,
    rule: DeriveRule,
    map: HashMap<EntityKey, EntityKey>,
}

impl Synchronizer {
    /// Synchronizer deriving facet aliases from an owner's alias list.
    pub fn facet_alias(derived: ListRef) -> Self {
        Self {
            derived,
            rule: DeriveRule::FacetAlias,
            map: HashMap::new(),
        }
    }

    /// Synchronizer deriving list-facet aliases from a content facet's
    /// alias list.
    pub fn list_facet_alias(derived: ListRef) -> Self {
        Self {
            derived,
            rule: DeriveRule::ListFacetAlias,
            map: HashMap::new(),
        }
    }

    pub fn derived(&self) -> ListRef {
        self.derived
    }

    /// All derived entries this synchronizer maintains.
    pub(crate) fn derived_keys(&self) -> Vec<EntityKey> {
        self.map.values().copied().collect()
    }

    /// A source name usable for derivation: present and non-empty.
    fn source_name(model: &Model, source: EntityKey) -> Option<String> {
        model
            .entity(source)
            .ok()
            .and_then(EntityData::name)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    /// The name a derived entry should carry for a source name. `None`
    /// when the rule's inputs are incomplete (an unlabeled contextual
    /// facet has no token yet).
    fn derived_name(&self, model: &Model, source_name: &str) -> Option<String> {
        match self.rule {
            DeriveRule::FacetAlias => {
                let facet = model.facet(self.derived.owner).ok()?;
                let token = facet.token()?;
                Some(format!("{source_name}_{token}"))
            }
            DeriveRule::ListFacetAlias => Some(format!("{source_name}_List")),
        }
    }

    fn create_derived(&mut self, model: &mut Model, index: usize, source: EntityKey, name: &str) {
        let derived = model.insert_entity(EntityData::Alias(Alias::new(name)));
        let len = model.list(self.derived).map(|l| l.len()).unwrap_or(0);
        let index = index.min(len);
        match model.insert_child_raw(self.derived, index, derived) {
            Ok(()) => {
                trace!(?source, ?derived, name, "derived entry created");
                self.map.insert(source, derived);
            }
            Err(err) => {
                model.discard_detached(derived);
                warn!(%err, ?source, "derived entry insertion failed");
            }
        }
    }

    fn remove_derived(&mut self, model: &mut Model, source: EntityKey) {
        let Some(derived) = self.map.remove(&source) else {
            return;
        };
        if model.remove_child_raw(self.derived, derived).is_ok() {
            model.discard_detached(derived);
        }
    }

    /// A source child appeared at `index`. Unnamed sources get no derived
    /// entry; named ones get exactly one, at the mirrored position.
    pub(crate) fn on_source_added(&mut self, model: &mut Model, index: usize, source: EntityKey) {
        if self.map.contains_key(&source) {
            return;
        }
        let Some(name) = Self::source_name(model, source) else {
            return;
        };
        let Some(derived_name) = self.derived_name(model, &name) else {
            return;
        };
        self.create_derived(model, index, source, &derived_name);
    }

    /// A source child left the list: its derived entry (if any) is removed
    /// and discarded.
    pub(crate) fn on_source_removed(&mut self, model: &mut Model, source: EntityKey) {
        self.remove_derived(model, source);
    }

    /// A source child was renamed. The mapped derived entry is renamed in
    /// place; a source renamed to empty loses its entry, and a previously
    /// unnamed source gains one at the mirrored position.
    pub(crate) fn on_source_renamed(
        &mut self,
        model: &mut Model,
        source_list: ListRef,
        source: EntityKey,
        old_name: &str,
    ) {
        trace!(?source, old_name, "source renamed");
        self.reconcile(model, source_list, source);
    }

    /// The source list was reordered: mirror the new order into the derived
    /// list. Derived entries keep the relative order of their sources;
    /// entries without a source (added out-of-band) stay behind them.
    pub(crate) fn on_source_reordered(&mut self, model: &mut Model, order: &[EntityKey]) {
        let Ok(current) = model.list(self.derived).map(|l| l.items().to_vec()) else {
            return;
        };
        let mut desired: Vec<EntityKey> = order
            .iter()
            .filter_map(|source| self.map.get(source).copied())
            .filter(|derived| current.contains(derived))
            .collect();
        for derived in &current {
            if !desired.contains(derived) {
                desired.push(*derived);
            }
        }
        if desired != current {
            if let Err(err) = model.set_list_order(self.derived, desired) {
                warn!(%err, "derived list reorder failed");
            }
        }
    }

    /// Re-derive every entry's name from the current source names, e.g.
    /// after the derived list's owning facet changed its label.
    pub(crate) fn refresh_derived_names(&mut self, model: &mut Model, source_list: ListRef) {
        let sources = model
            .list(source_list)
            .map(|l| l.items().to_vec())
            .unwrap_or_default();
        for source in sources {
            self.reconcile(model, source_list, source);
        }
    }

    /// Bring one source's derived entry in line with what the rule says it
    /// should be: create, rename, or remove as needed.
    fn reconcile(&mut self, model: &mut Model, source_list: ListRef, source: EntityKey) {
        let want = Self::source_name(model, source)
            .and_then(|name| self.derived_name(model, &name));
        match (self.map.get(&source).copied(), want) {
            (Some(derived), Some(want)) => {
                let current = model
                    .entity(derived)
                    .ok()
                    .and_then(EntityData::name)
                    .map(str::to_string);
                if current.as_deref() != Some(&want) {
                    if let Err(err) = model.rename_raw(derived, &want) {
                        warn!(%err, ?derived, "derived entry rename failed");
                    }
                }
            }
            (Some(_), None) => self.remove_derived(model, source),
            (None, Some(want)) => {
                // Mirrored position: count the mapped sources ahead of this one.
                let index = model
                    .list(source_list)
                    .map(|l| {
                        l.items()
                            .iter()
                            .take_while(|k| **k != source)
                            .filter(|k| self.map.contains_key(*k))
                            .count()
                    })
                    .unwrap_or(0);
                self.create_derived(model, index, source, &want);
            }
            (None, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::children::ListRole;
    use crate::entity::FacetKind;
    use crate::model::Model;

    fn detached_bo(model: &mut Model) -> EntityKey {
        model.create_business_object("Order").unwrap()
    }

    #[test]
    fn test_unnamed_source_is_skipped() {
        let mut model = Model::new();
        let bo = detached_bo(&mut model);
        let summary = model.facet_of(bo, FacetKind::Summary).unwrap();

        model.add_alias(bo, "").unwrap();
        assert!(model.aliases(summary).unwrap().is_empty());
    }

    #[test]
    fn test_backfill_on_registration() {
        let mut model = Model::new();
        let bo = detached_bo(&mut model);
        model.add_alias(bo, "PurchaseOrder").unwrap();

        // A contextual facet attached after the alias exists is backfilled.
        let facet = model
            .create_contextual_facet(FacetKind::Custom, Some("Audit"))
            .unwrap();
        model.attach_contextual_facet(bo, facet).unwrap();

        let derived = model.aliases(facet).unwrap();
        assert_eq!(derived.len(), 1);
        assert_eq!(
            model.entity(derived[0]).unwrap().name(),
            Some("PurchaseOrder_Audit")
        );
    }

    #[test]
    fn test_unregister_leaves_derived_entries() {
        let mut model = Model::new();
        let bo = detached_bo(&mut model);
        let facet = model
            .create_contextual_facet(FacetKind::Query, Some("Search"))
            .unwrap();
        model.attach_contextual_facet(bo, facet).unwrap();
        model.add_alias(bo, "PO").unwrap();
        assert_eq!(model.aliases(facet).unwrap().len(), 1);

        model.detach_contextual_facet(facet).unwrap();
        // Previously derived entries stay; new aliases no longer mirror.
        model.add_alias(bo, "Order2").unwrap();
        assert_eq!(model.aliases(facet).unwrap().len(), 1);
    }

    #[test]
    fn test_reorder_mirror_skips_unnamed_gaps() {
        let mut model = Model::new();
        let bo = detached_bo(&mut model);
        let summary = model.facet_of(bo, FacetKind::Summary).unwrap();
        let bo_aliases = ListRef::new(bo, ListRole::Aliases);

        let _a = model.add_alias(bo, "A").unwrap();
        let _unnamed = model.add_alias(bo, "").unwrap();
        let b = model.add_alias(bo, "B").unwrap();
        let names = |model: &Model| -> Vec<String> {
            model
                .aliases(summary)
                .unwrap()
                .iter()
                .map(|k| model.entity(*k).unwrap().name().unwrap().to_string())
                .collect()
        };
        assert_eq!(names(&model), vec!["A_Summary", "B_Summary"]);

        // Moving B above the unnamed gap does not disturb the mirror yet.
        model.move_child_up(bo_aliases, b).unwrap();
        assert_eq!(names(&model), vec!["A_Summary", "B_Summary"]);

        // Moving B above A does.
        model.move_child_up(bo_aliases, b).unwrap();
        assert_eq!(names(&model), vec!["B_Summary", "A_Summary"]);
    }

    #[test]
    fn test_rename_to_empty_drops_derived_entry() {
        let mut model = Model::new();
        let bo = detached_bo(&mut model);
        let summary = model.facet_of(bo, FacetKind::Summary).unwrap();
        let alias = model.add_alias(bo, "Legacy").unwrap();
        assert_eq!(model.aliases(summary).unwrap().len(), 1);

        model.rename(alias, "").unwrap();
        assert!(model.aliases(summary).unwrap().is_empty());

        model.rename(alias, "Fresh").unwrap();
        let derived = model.aliases(summary).unwrap();
        assert_eq!(derived.len(), 1);
        assert_eq!(model.entity(derived[0]).unwrap().name(), Some("Fresh_Summary"));
    }
}
