//! Entity payloads stored in the model arena
//!
//! Every addressable thing in a model (library, member, facet, alias, field,
//! enumeration value) is one [`EntityData`] variant in the arena. The structs
//! themselves are thin data holders; all mutation goes through `Model`
//! methods so ownership, events, and synchronizer cascades stay consistent.

mod alias;
mod business_object;
mod facet;
mod field;
mod library;
mod simple;

pub use alias::Alias;
pub use business_object::BusinessObject;
pub use facet::{Facet, FacetKind};
pub use field::{Attribute, Element};
pub use library::{Library, LibraryKind, MemberKind, NamespaceImport};
pub(crate) use library::uniquify_prefix;
pub use simple::{EnumValue, Enumeration, SimpleType};

use serde::{Deserialize, Serialize};

use crate::arena::EntityKey;
use crate::error::Result;
use crate::event::{Event, EventKind, Subject};
use crate::model::Model;

/// Discriminant of an [`EntityData`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Library,
    BusinessObject,
    Facet,
    Alias,
    Attribute,
    Element,
    SimpleType,
    Enumeration,
    EnumValue,
}

impl EntityKind {
    /// Human-readable label used in error messages and identities.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Library => "library",
            EntityKind::BusinessObject => "business object",
            EntityKind::Facet => "facet",
            EntityKind::Alias => "alias",
            EntityKind::Attribute => "attribute",
            EntityKind::Element => "element",
            EntityKind::SimpleType => "simple type",
            EntityKind::Enumeration => "enumeration",
            EntityKind::EnumValue => "enumeration value",
        }
    }
}

/// One entity's typed payload
#[derive(Debug)]
pub enum EntityData {
    Library(Library),
    BusinessObject(BusinessObject),
    Facet(Facet),
    Alias(Alias),
    Attribute(Attribute),
    Element(Element),
    SimpleType(SimpleType),
    Enumeration(Enumeration),
    EnumValue(EnumValue),
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Library(_) => EntityKind::Library,
            EntityData::BusinessObject(_) => EntityKind::BusinessObject,
            EntityData::Facet(_) => EntityKind::Facet,
            EntityData::Alias(_) => EntityKind::Alias,
            EntityData::Attribute(_) => EntityKind::Attribute,
            EntityData::Element(_) => EntityKind::Element,
            EntityData::SimpleType(_) => EntityKind::SimpleType,
            EntityData::Enumeration(_) => EntityKind::Enumeration,
            EntityData::EnumValue(_) => EntityKind::EnumValue,
        }
    }

    /// The entity's name, if it has one. Fixed facets report their kind
    /// token; contextual facets report their label, so an unlabeled
    /// contextual facet is unnamed.
    pub fn name(&self) -> Option<&str> {
        match self {
            EntityData::Library(l) => Some(&l.name),
            EntityData::BusinessObject(b) => Some(&b.name),
            EntityData::Facet(f) => f.token(),
            EntityData::Alias(a) => Some(&a.name),
            EntityData::Attribute(a) => Some(&a.name),
            EntityData::Element(e) => Some(&e.name),
            EntityData::SimpleType(s) => Some(&s.name),
            EntityData::Enumeration(e) => Some(&e.name),
            EntityData::EnumValue(v) => Some(&v.literal),
        }
    }

    /// The owning entity, `None` while detached. Libraries are roots and
    /// never report an owner.
    pub fn owner(&self) -> Option<EntityKey> {
        match self {
            EntityData::Library(_) => None,
            EntityData::BusinessObject(b) => b.owner,
            EntityData::Facet(f) => f.owner,
            EntityData::Alias(a) => a.owner,
            EntityData::Attribute(a) => a.owner,
            EntityData::Element(e) => e.owner,
            EntityData::SimpleType(s) => s.owner,
            EntityData::Enumeration(e) => e.owner,
            EntityData::EnumValue(v) => v.owner,
        }
    }

    pub(crate) fn set_owner(&mut self, owner: Option<EntityKey>) {
        match self {
            EntityData::Library(_) => {}
            EntityData::BusinessObject(b) => b.owner = owner,
            EntityData::Facet(f) => f.owner = owner,
            EntityData::Alias(a) => a.owner = owner,
            EntityData::Attribute(a) => a.owner = owner,
            EntityData::Element(e) => e.owner = owner,
            EntityData::SimpleType(s) => s.owner = owner,
            EntityData::Enumeration(e) => e.owner = owner,
            EntityData::EnumValue(v) => v.owner = owner,
        }
    }

    /// Overwrite the name field without any cascade. Contextual facets store
    /// the name as their label; fixed facets are rejected before this point.
    pub(crate) fn set_name_raw(&mut self, name: &str) {
        match self {
            EntityData::Library(l) => l.name = name.to_string(),
            EntityData::BusinessObject(b) => b.name = name.to_string(),
            EntityData::Facet(f) => f.label = Some(name.to_string()),
            EntityData::Alias(a) => a.name = name.to_string(),
            EntityData::Attribute(a) => a.name = name.to_string(),
            EntityData::Element(e) => e.name = name.to_string(),
            EntityData::SimpleType(s) => s.name = name.to_string(),
            EntityData::Enumeration(e) => e.name = name.to_string(),
            EntityData::EnumValue(v) => v.literal = name.to_string(),
        }
    }

    /// How this entity counts against a library's member allow-list, if it
    /// can be a library member at all.
    pub fn member_kind(&self) -> Option<MemberKind> {
        match self {
            EntityData::BusinessObject(_) => Some(MemberKind::BusinessObject),
            EntityData::SimpleType(_) => Some(MemberKind::SimpleType),
            EntityData::Enumeration(_) => Some(MemberKind::Enumeration),
            EntityData::Facet(f) if f.kind.is_contextual() => Some(MemberKind::ContextualFacet),
            _ => None,
        }
    }

    pub fn documentation(&self) -> Option<&str> {
        match self {
            EntityData::Library(l) => l.documentation.as_deref(),
            EntityData::BusinessObject(b) => b.documentation.as_deref(),
            EntityData::Facet(f) => f.documentation.as_deref(),
            EntityData::SimpleType(s) => s.documentation.as_deref(),
            EntityData::Enumeration(e) => e.documentation.as_deref(),
            _ => None,
        }
    }

    /// Set the documentation field. Returns false for entity kinds that do
    /// not carry documentation.
    pub(crate) fn set_documentation_raw(&mut self, documentation: Option<String>) -> bool {
        match self {
            EntityData::Library(l) => l.documentation = documentation,
            EntityData::BusinessObject(b) => b.documentation = documentation,
            EntityData::Facet(f) => f.documentation = documentation,
            EntityData::SimpleType(s) => s.documentation = documentation,
            EntityData::Enumeration(e) => e.documentation = documentation,
            _ => return false,
        }
        true
    }
}

impl Model {
    /// Set or clear an entity's documentation text.
    pub fn set_documentation(&mut self, key: EntityKey, documentation: Option<&str>) -> Result<()> {
        self.ensure_editable_for(key, "set documentation")?;
        let entity = self.entity(key)?;
        let old = entity.documentation().map(str::to_string);
        let new = documentation.map(str::to_string);
        if old == new {
            return Ok(());
        }
        if !self.entity_mut(key)?.set_documentation_raw(new.clone()) {
            let label = self.entity(key)?.kind().label();
            return Err(crate::error::ModelError::unsupported(
                label,
                "set documentation",
            ));
        }
        self.publish(Event::valued(
            EventKind::DocumentationModified,
            Subject::Entity(key),
            old,
            new,
        ));
        Ok(())
    }
}
