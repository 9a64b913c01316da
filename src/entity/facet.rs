//! Facets: the views a business object exposes
//!
//! Capability differences between facet kinds (aliasable, carries fields,
//! contextual, list view) live in one table on [`FacetKind`] rather than in
//! per-kind types, so adding a kind means extending the table.

use serde::{Deserialize, Serialize};

use crate::arena::EntityKey;
use crate::children::{ChildList, ListRef, ListRole};
use crate::entity::EntityData;
use crate::error::{ModelError, Result};
use crate::event::{Event, EventKind, Subject};
use crate::model::Model;

/// Facet kind and capability table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    Id,
    Summary,
    Detail,
    SummaryList,
    DetailList,
    Custom,
    Query,
    Choice,
    Shared,
    Action,
}

impl FacetKind {
    pub fn label(&self) -> &'static str {
        match self {
            FacetKind::Id => "identity facet",
            FacetKind::Summary => "summary facet",
            FacetKind::Detail => "detail facet",
            FacetKind::SummaryList => "summary list facet",
            FacetKind::DetailList => "detail list facet",
            FacetKind::Custom => "custom facet",
            FacetKind::Query => "query facet",
            FacetKind::Choice => "choice facet",
            FacetKind::Shared => "shared facet",
            FacetKind::Action => "action facet",
        }
    }

    /// Name token for fixed-role kinds; contextual kinds take their token
    /// from the facet label instead.
    pub fn fixed_token(&self) -> Option<&'static str> {
        match self {
            FacetKind::Id => Some("ID"),
            FacetKind::Summary => Some("Summary"),
            FacetKind::Detail => Some("Detail"),
            FacetKind::SummaryList => Some("Summary_List"),
            FacetKind::DetailList => Some("Detail_List"),
            FacetKind::Shared => Some("Shared"),
            FacetKind::Action => Some("Action"),
            FacetKind::Custom | FacetKind::Query | FacetKind::Choice => None,
        }
    }

    pub fn allows_aliases(&self) -> bool {
        !matches!(self, FacetKind::Shared | FacetKind::Action)
    }

    /// Whether the facet carries its own attributes and elements. List
    /// views mirror another facet's content and carry none.
    pub fn carries_fields(&self) -> bool {
        !self.is_list_view()
    }

    /// Contextual kinds are authored as library members and attached to a
    /// business object by reference.
    pub fn is_contextual(&self) -> bool {
        matches!(self, FacetKind::Custom | FacetKind::Query | FacetKind::Choice)
    }

    pub fn is_list_view(&self) -> bool {
        matches!(self, FacetKind::SummaryList | FacetKind::DetailList)
    }

    /// The list-view kind derived from this kind, if any.
    pub fn list_view(&self) -> Option<FacetKind> {
        match self {
            FacetKind::Summary => Some(FacetKind::SummaryList),
            FacetKind::Detail => Some(FacetKind::DetailList),
            _ => None,
        }
    }
}

/// One view of a business object: aliases plus attribute/element content
#[derive(Debug)]
pub struct Facet {
    pub(crate) kind: FacetKind,
    pub(crate) label: Option<String>,
    pub(crate) documentation: Option<String>,
    pub(crate) owner: Option<EntityKey>,
    /// Business object a contextual facet is attached to.
    pub(crate) extends: Option<EntityKey>,
    pub(crate) aliases: ChildList,
    pub(crate) attributes: ChildList,
    pub(crate) elements: ChildList,
}

impl Facet {
    pub(crate) fn new(kind: FacetKind, label: Option<String>) -> Self {
        Self {
            kind,
            label,
            documentation: None,
            owner: None,
            extends: None,
            aliases: ChildList::new(EventKind::AliasAdded, EventKind::AliasRemoved),
            attributes: ChildList::new(EventKind::AttributeAdded, EventKind::AttributeRemoved),
            elements: ChildList::new(EventKind::ElementAdded, EventKind::ElementRemoved),
        }
    }

    pub fn kind(&self) -> FacetKind {
        self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The business object this contextual facet is attached to.
    pub fn extends(&self) -> Option<EntityKey> {
        self.extends
    }

    /// Name token: the kind's fixed token, or the label for contextual
    /// kinds. An unlabeled contextual facet has no token.
    pub fn token(&self) -> Option<&str> {
        match self.kind.fixed_token() {
            Some(token) => Some(token),
            None => self.label.as_deref(),
        }
    }
}

impl Model {
    /// Create a detached contextual facet. It becomes usable by adding it
    /// to a library and attaching it to a business object.
    pub fn create_contextual_facet(
        &mut self,
        kind: FacetKind,
        label: Option<&str>,
    ) -> Result<EntityKey> {
        if !kind.is_contextual() {
            return Err(ModelError::unsupported(kind.label(), "create as contextual facet"));
        }
        Ok(self.insert_entity(EntityData::Facet(Facet::new(kind, label.map(str::to_string)))))
    }

    /// Remove and discard all locally authored content of a facet (its
    /// attributes and elements). Alias lists are derivation-managed and
    /// untouched. Emits a single `FacetCleared` after the bulk edit.
    pub fn clear_facet(&mut self, facet: EntityKey) -> Result<()> {
        self.ensure_editable_for(facet, "clear facet")?;
        let f = self.facet(facet)?;
        if !f.kind.carries_fields() {
            return Ok(());
        }
        let attributes = f.attributes.items().to_vec();
        let elements = f.elements.items().to_vec();
        if attributes.is_empty() && elements.is_empty() {
            return Ok(());
        }
        {
            let _guard = self.suppress_events();
            for attr in attributes {
                self.remove_child_raw(ListRef::new(facet, ListRole::Attributes), attr)?;
                self.discard_detached(attr);
            }
            for elem in elements {
                self.remove_child_raw(ListRef::new(facet, ListRole::Elements), elem)?;
                self.discard_detached(elem);
            }
        }
        self.publish(Event::bare(EventKind::FacetCleared, Subject::Entity(facet)));
        Ok(())
    }
}
