//! Simple types, enumerations, and enumeration values

use crate::arena::EntityKey;
use crate::children::{ChildList, ListRef, ListRole};
use crate::entity::EntityData;
use crate::error::{ModelError, Result};
use crate::event::EventKind;
use crate::model::Model;

/// A named scalar type, optionally constrained by a base type and pattern
#[derive(Debug)]
pub struct SimpleType {
    pub(crate) name: String,
    pub(crate) owner: Option<EntityKey>,
    pub(crate) base_type: Option<EntityKey>,
    pub(crate) pattern: Option<String>,
    pub(crate) documentation: Option<String>,
}

impl SimpleType {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            base_type: None,
            pattern: None,
            documentation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_type(&self) -> Option<EntityKey> {
        self.base_type
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }
}

/// An enumeration member type with an ordered value list
#[derive(Debug)]
pub struct Enumeration {
    pub(crate) name: String,
    pub(crate) owner: Option<EntityKey>,
    /// Open enumerations admit values beyond the declared list.
    pub(crate) open: bool,
    pub(crate) documentation: Option<String>,
    pub(crate) values: ChildList,
}

impl Enumeration {
    pub(crate) fn new(name: &str, open: bool) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            open,
            documentation: None,
            values: ChildList::new(EventKind::ValueAdded, EventKind::ValueRemoved),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// One literal of an enumeration
#[derive(Debug)]
pub struct EnumValue {
    pub(crate) literal: String,
    pub(crate) owner: Option<EntityKey>,
}

impl EnumValue {
    pub(crate) fn new(literal: &str) -> Self {
        Self {
            literal: literal.to_string(),
            owner: None,
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }
}

impl Model {
    /// Create a detached simple type.
    pub fn create_simple_type(&mut self, name: &str) -> EntityKey {
        self.insert_entity(EntityData::SimpleType(SimpleType::new(name)))
    }

    /// Create a detached enumeration.
    pub fn create_enumeration(&mut self, name: &str, open: bool) -> EntityKey {
        self.insert_entity(EntityData::Enumeration(Enumeration::new(name, open)))
    }

    /// Append a literal to an enumeration's value list.
    pub fn add_enum_value(&mut self, enumeration: EntityKey, literal: &str) -> Result<EntityKey> {
        self.ensure_editable_for(enumeration, "add value")?;
        let list = ListRef::new(enumeration, ListRole::Values);
        let len = self.children(list)?.len();
        let value = self.insert_entity(EntityData::EnumValue(EnumValue::new(literal)));
        match self.insert_child_raw(list, len, value) {
            Ok(()) => Ok(value),
            Err(err) => {
                self.discard_detached(value);
                Err(err)
            }
        }
    }

    pub fn enum_values(&self, enumeration: EntityKey) -> Result<&[EntityKey]> {
        self.children(ListRef::new(enumeration, ListRole::Values))
    }

    /// Constrain a simple type by another library member; `None` clears it.
    pub fn assign_simple_type_base(
        &mut self,
        simple_type: EntityKey,
        base: Option<EntityKey>,
    ) -> Result<()> {
        self.ensure_editable_for(simple_type, "assign base type")?;
        if let Some(target) = base {
            if self.entity(target)?.member_kind().is_none() {
                let label = self.entity(target)?.kind().label();
                return Err(ModelError::invalid_state(format!(
                    "{label} cannot be the base of a simple type"
                )));
            }
        }
        let old = match self.entity(simple_type)? {
            EntityData::SimpleType(s) => s.base_type,
            other => {
                return Err(ModelError::unsupported(other.kind().label(), "assign base type"))
            }
        };
        if old == base {
            return Ok(());
        }
        if let EntityData::SimpleType(s) = self.entity_mut(simple_type)? {
            s.base_type = base;
        }
        self.publish_type_assignment(simple_type, old, base);
        Ok(())
    }

    /// Set the lexical pattern constraint of a simple type.
    pub fn set_simple_type_pattern(
        &mut self,
        simple_type: EntityKey,
        pattern: Option<&str>,
    ) -> Result<()> {
        self.ensure_editable_for(simple_type, "set pattern")?;
        match self.entity_mut(simple_type)? {
            EntityData::SimpleType(s) => {
                s.pattern = pattern.map(str::to_string);
                Ok(())
            }
            other => Err(ModelError::unsupported(other.kind().label(), "set pattern")),
        }
    }
}
