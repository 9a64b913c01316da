//! Attributes and elements: the fields a facet carries

use crate::arena::EntityKey;
use crate::children::{ListRef, ListRole};
use crate::entity::EntityData;
use crate::error::{ModelError, Result};
use crate::event::{Event, EventKind, Subject};
use crate::model::Model;

/// A named attribute with an optional type reference
#[derive(Debug)]
pub struct Attribute {
    pub(crate) name: String,
    pub(crate) owner: Option<EntityKey>,
    pub(crate) type_ref: Option<EntityKey>,
    pub(crate) mandatory: bool,
}

impl Attribute {
    pub(crate) fn new(name: &str, mandatory: bool) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            type_ref: None,
            mandatory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> Option<EntityKey> {
        self.type_ref
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }
}

/// A named element with an optional type reference
#[derive(Debug)]
pub struct Element {
    pub(crate) name: String,
    pub(crate) owner: Option<EntityKey>,
    pub(crate) type_ref: Option<EntityKey>,
    pub(crate) repeatable: bool,
}

impl Element {
    pub(crate) fn new(name: &str, repeatable: bool) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            type_ref: None,
            repeatable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> Option<EntityKey> {
        self.type_ref
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }
}

impl Model {
    /// Append an attribute to a facet that carries fields.
    pub fn add_attribute(
        &mut self,
        facet: EntityKey,
        name: &str,
        mandatory: bool,
    ) -> Result<EntityKey> {
        self.ensure_editable_for(facet, "add attribute")?;
        let list = ListRef::new(facet, ListRole::Attributes);
        let len = self.children(list)?.len();
        let attribute = self.insert_entity(EntityData::Attribute(Attribute::new(name, mandatory)));
        match self.insert_child_raw(list, len, attribute) {
            Ok(()) => Ok(attribute),
            Err(err) => {
                self.discard_detached(attribute);
                Err(err)
            }
        }
    }

    /// Append an element to a facet that carries fields.
    pub fn add_element(
        &mut self,
        facet: EntityKey,
        name: &str,
        repeatable: bool,
    ) -> Result<EntityKey> {
        self.ensure_editable_for(facet, "add element")?;
        let list = ListRef::new(facet, ListRole::Elements);
        let len = self.children(list)?.len();
        let element = self.insert_entity(EntityData::Element(Element::new(name, repeatable)));
        match self.insert_child_raw(list, len, element) {
            Ok(()) => Ok(element),
            Err(err) => {
                self.discard_detached(element);
                Err(err)
            }
        }
    }

    /// Point an attribute at a type. The target must be a library member
    /// (simple type, enumeration, business object, or contextual facet);
    /// `None` clears the assignment.
    pub fn assign_attribute_type(
        &mut self,
        attribute: EntityKey,
        type_ref: Option<EntityKey>,
    ) -> Result<()> {
        self.ensure_editable_for(attribute, "assign type")?;
        self.check_type_target(type_ref)?;
        let old = match self.entity(attribute)? {
            EntityData::Attribute(a) => a.type_ref,
            other => {
                return Err(ModelError::unsupported(other.kind().label(), "assign attribute type"))
            }
        };
        if old == type_ref {
            return Ok(());
        }
        if let EntityData::Attribute(a) = self.entity_mut(attribute)? {
            a.type_ref = type_ref;
        }
        self.publish_type_assignment(attribute, old, type_ref);
        Ok(())
    }

    /// Point an element at a type; same target rules as attributes.
    pub fn assign_element_type(
        &mut self,
        element: EntityKey,
        type_ref: Option<EntityKey>,
    ) -> Result<()> {
        self.ensure_editable_for(element, "assign type")?;
        self.check_type_target(type_ref)?;
        let old = match self.entity(element)? {
            EntityData::Element(e) => e.type_ref,
            other => {
                return Err(ModelError::unsupported(other.kind().label(), "assign element type"))
            }
        };
        if old == type_ref {
            return Ok(());
        }
        if let EntityData::Element(e) = self.entity_mut(element)? {
            e.type_ref = type_ref;
        }
        self.publish_type_assignment(element, old, type_ref);
        Ok(())
    }

    pub fn attributes(&self, facet: EntityKey) -> Result<&[EntityKey]> {
        self.children(ListRef::new(facet, ListRole::Attributes))
    }

    pub fn elements(&self, facet: EntityKey) -> Result<&[EntityKey]> {
        self.children(ListRef::new(facet, ListRole::Elements))
    }

    fn check_type_target(&self, type_ref: Option<EntityKey>) -> Result<()> {
        let Some(target) = type_ref else {
            return Ok(());
        };
        if self.entity(target)?.member_kind().is_none() {
            let label = self.entity(target)?.kind().label();
            return Err(ModelError::invalid_state(format!(
                "{label} cannot be the target of a type reference"
            )));
        }
        Ok(())
    }

    pub(crate) fn publish_type_assignment(
        &self,
        subject: EntityKey,
        old: Option<EntityKey>,
        new: Option<EntityKey>,
    ) {
        self.publish(Event::valued(
            EventKind::TypeAssignmentModified,
            Subject::Entity(subject),
            old.map(|k| self.identity(k)),
            new.map(|k| self.identity(k)),
        ));
    }
}
