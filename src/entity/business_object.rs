//! Business objects and their facet wiring
//!
//! A business object always carries five fixed facets (identity, summary,
//! detail, and the two list views). Its alias list drives three facet alias
//! lists through synchronizers, and each content facet's alias list drives
//! its list view in turn, which is what produces the two-hop cascade:
//! adding alias `A` yields `A_Summary` on the summary facet and
//! `A_Summary_List` on the summary list facet.

use tracing::debug;

use crate::arena::EntityKey;
use crate::children::{ChildList, ListRef, ListRole};
use crate::entity::{EntityData, Facet, FacetKind};
use crate::error::{ModelError, Result};
use crate::event::{Event, EventKind, Subject};
use crate::model::Model;
use crate::sync::Synchronizer;

/// A complex member type with fixed facets and alias-driven derivation
#[derive(Debug)]
pub struct BusinessObject {
    pub(crate) name: String,
    pub(crate) documentation: Option<String>,
    pub(crate) owner: Option<EntityKey>,
    pub(crate) aliases: ChildList,
    pub(crate) id_facet: EntityKey,
    pub(crate) summary_facet: EntityKey,
    pub(crate) detail_facet: EntityKey,
    pub(crate) summary_list_facet: EntityKey,
    pub(crate) detail_list_facet: EntityKey,
    /// Contextual facets attached by reference; owned by their libraries.
    pub(crate) attached_facets: Vec<EntityKey>,
}

impl BusinessObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_facet(&self) -> EntityKey {
        self.id_facet
    }

    pub fn summary_facet(&self) -> EntityKey {
        self.summary_facet
    }

    pub fn detail_facet(&self) -> EntityKey {
        self.detail_facet
    }

    pub fn summary_list_facet(&self) -> EntityKey {
        self.summary_list_facet
    }

    pub fn detail_list_facet(&self) -> EntityKey {
        self.detail_list_facet
    }

    pub fn attached_facets(&self) -> &[EntityKey] {
        &self.attached_facets
    }
}

impl Model {
    /// Create a detached business object with its five fixed facets and
    /// the synchronizers that keep facet alias lists derived from the
    /// business object's own alias list.
    pub fn create_business_object(&mut self, name: &str) -> Result<EntityKey> {
        let id = self.insert_entity(EntityData::Facet(Facet::new(FacetKind::Id, None)));
        let summary = self.insert_entity(EntityData::Facet(Facet::new(FacetKind::Summary, None)));
        let detail = self.insert_entity(EntityData::Facet(Facet::new(FacetKind::Detail, None)));
        let summary_list =
            self.insert_entity(EntityData::Facet(Facet::new(FacetKind::SummaryList, None)));
        let detail_list =
            self.insert_entity(EntityData::Facet(Facet::new(FacetKind::DetailList, None)));

        let bo = self.insert_entity(EntityData::BusinessObject(BusinessObject {
            name: name.to_string(),
            documentation: None,
            owner: None,
            aliases: ChildList::new(EventKind::AliasAdded, EventKind::AliasRemoved),
            id_facet: id,
            summary_facet: summary,
            detail_facet: detail,
            summary_list_facet: summary_list,
            detail_list_facet: detail_list,
            attached_facets: Vec::new(),
        }));
        for facet in [id, summary, detail, summary_list, detail_list] {
            if let Some(entity) = self.arena.get_mut(facet) {
                entity.set_owner(Some(bo));
            }
        }

        let bo_aliases = ListRef::new(bo, ListRole::Aliases);
        for facet in [id, summary, detail] {
            self.register_synchronizer(
                bo_aliases,
                Synchronizer::facet_alias(ListRef::new(facet, ListRole::Aliases)),
            )?;
        }
        self.register_synchronizer(
            ListRef::new(summary, ListRole::Aliases),
            Synchronizer::list_facet_alias(ListRef::new(summary_list, ListRole::Aliases)),
        )?;
        self.register_synchronizer(
            ListRef::new(detail, ListRole::Aliases),
            Synchronizer::list_facet_alias(ListRef::new(detail_list, ListRole::Aliases)),
        )?;
        debug!(name, ?bo, "created business object");
        Ok(bo)
    }

    /// The fixed facet of a business object for one of the five fixed kinds.
    pub fn facet_of(&self, business_object: EntityKey, kind: FacetKind) -> Result<EntityKey> {
        let bo = self.business_object(business_object)?;
        match kind {
            FacetKind::Id => Ok(bo.id_facet),
            FacetKind::Summary => Ok(bo.summary_facet),
            FacetKind::Detail => Ok(bo.detail_facet),
            FacetKind::SummaryList => Ok(bo.summary_list_facet),
            FacetKind::DetailList => Ok(bo.detail_list_facet),
            other => Err(ModelError::unsupported(other.label(), "fixed facet lookup")),
        }
    }

    /// All facets of a business object: the five fixed ones, then any
    /// attached contextual facets in attachment order.
    pub fn facets_of(&self, business_object: EntityKey) -> Result<Vec<EntityKey>> {
        let bo = self.business_object(business_object)?;
        let mut facets = vec![
            bo.id_facet,
            bo.summary_facet,
            bo.detail_facet,
            bo.summary_list_facet,
            bo.detail_list_facet,
        ];
        facets.extend_from_slice(&bo.attached_facets);
        Ok(facets)
    }

    /// Swap one of the three content facets (identity, summary, detail)
    /// for a replacement. Only legal while the business object is detached;
    /// the old facet detaches with its derived aliases, the replacement is
    /// rewired and backfilled from the current alias list.
    pub fn replace_facet(&mut self, business_object: EntityKey, facet: EntityKey) -> Result<()> {
        let bo = self.business_object(business_object)?;
        if bo.owner.is_some() {
            return Err(ModelError::invalid_state(
                "facets can only be replaced while the business object is detached",
            ));
        }
        let new_kind = self.facet(facet)?.kind;
        if !matches!(new_kind, FacetKind::Id | FacetKind::Summary | FacetKind::Detail) {
            return Err(ModelError::unsupported(new_kind.label(), "replace fixed facet"));
        }
        if self.facet(facet)?.owner.is_some() {
            return Err(ModelError::invalid_state("replacement facet is already owned"));
        }

        let bo = self.business_object(business_object)?;
        let (old, view) = match new_kind {
            FacetKind::Id => (bo.id_facet, None),
            FacetKind::Summary => (bo.summary_facet, Some(bo.summary_list_facet)),
            FacetKind::Detail => (bo.detail_facet, Some(bo.detail_list_facet)),
            _ => unreachable!(),
        };
        if old == facet {
            return Ok(());
        }

        let bo_aliases = ListRef::new(business_object, ListRole::Aliases);
        self.unregister_synchronizer(bo_aliases, ListRef::new(old, ListRole::Aliases))?;
        if let Some(view) = view {
            self.retire_view_sync(old, view)?;
        }

        if let Some(entity) = self.arena.get_mut(old) {
            entity.set_owner(None);
        }
        if let Some(entity) = self.arena.get_mut(facet) {
            entity.set_owner(Some(business_object));
        }
        {
            let bo = self.business_object_mut(business_object)?;
            match new_kind {
                FacetKind::Id => bo.id_facet = facet,
                FacetKind::Summary => bo.summary_facet = facet,
                FacetKind::Detail => bo.detail_facet = facet,
                _ => unreachable!(),
            }
        }

        let old_identity = self.identity(old);
        let new_identity = self.identity(facet);
        self.publish(Event {
            kind: EventKind::FacetReplaced,
            subject: Subject::Entity(business_object),
            item: Some(facet),
            old: Some(old_identity),
            new: Some(new_identity),
        });

        self.register_synchronizer(
            bo_aliases,
            Synchronizer::facet_alias(ListRef::new(facet, ListRole::Aliases)),
        )?;
        if let Some(view) = view {
            self.register_synchronizer(
                ListRef::new(facet, ListRole::Aliases),
                Synchronizer::list_facet_alias(ListRef::new(view, ListRole::Aliases)),
            )?;
        }
        Ok(())
    }

    /// Attach a contextual facet to a business object by reference. The
    /// facet's alias list starts mirroring the business object's aliases
    /// immediately, which backfills one derived alias per existing alias.
    pub fn attach_contextual_facet(
        &mut self,
        business_object: EntityKey,
        facet: EntityKey,
    ) -> Result<()> {
        let f = self.facet(facet)?;
        if !f.kind.is_contextual() {
            return Err(ModelError::unsupported(f.kind.label(), "attach to business object"));
        }
        if let Some(current) = f.extends {
            if current == business_object {
                return Ok(());
            }
            return Err(ModelError::invalid_state(
                "facet is already attached to a business object",
            ));
        }
        self.business_object(business_object)?;
        self.ensure_editable_for(business_object, "attach facet")?;
        self.ensure_editable_for(facet, "attach facet")?;

        self.business_object_mut(business_object)?.attached_facets.push(facet);
        if let EntityData::Facet(f) = self.entity_mut(facet)? {
            f.extends = Some(business_object);
        }
        self.publish(Event::structural(
            EventKind::FacetAdded,
            Subject::Entity(business_object),
            facet,
        ));
        self.register_synchronizer(
            ListRef::new(business_object, ListRole::Aliases),
            Synchronizer::facet_alias(ListRef::new(facet, ListRole::Aliases)),
        )?;
        Ok(())
    }

    /// Detach a contextual facet. Derived aliases already on the facet
    /// remain, matching synchronizer unregistration semantics. No-op when
    /// the facet is not attached.
    pub fn detach_contextual_facet(&mut self, facet: EntityKey) -> Result<()> {
        let Some(business_object) = self.facet(facet)?.extends else {
            return Ok(());
        };
        self.ensure_editable_for(business_object, "detach facet")?;
        self.ensure_editable_for(facet, "detach facet")?;

        self.unregister_synchronizer(
            ListRef::new(business_object, ListRole::Aliases),
            ListRef::new(facet, ListRole::Aliases),
        )?;
        self.business_object_mut(business_object)?
            .attached_facets
            .retain(|f| *f != facet);
        if let EntityData::Facet(f) = self.entity_mut(facet)? {
            f.extends = None;
        }
        self.publish(Event::structural(
            EventKind::FacetRemoved,
            Subject::Entity(business_object),
            facet,
        ));
        Ok(())
    }

    /// Drop the old source facet's list-view synchronizer and discard the
    /// view aliases it derived, so a replacement facet starts from a clean
    /// view list.
    fn retire_view_sync(&mut self, source: EntityKey, view: EntityKey) -> Result<()> {
        let source_list = ListRef::new(source, ListRole::Aliases);
        let view_list = ListRef::new(view, ListRole::Aliases);
        let Some(sync) = self.take_synchronizer(source_list, view_list) else {
            return Ok(());
        };
        for derived in sync.derived_keys() {
            self.remove_child_raw(view_list, derived)?;
            self.discard_detached(derived);
        }
        Ok(())
    }
}
