//! Aliases: alternate names for business objects and their facets
//!
//! Users author aliases on business objects only. Facet alias lists mirror
//! the business object's list through synchronizers and are never edited
//! directly.

use crate::arena::EntityKey;
use crate::children::{ListRef, ListRole};
use crate::entity::{EntityData, EntityKind};
use crate::error::{ModelError, Result};
use crate::model::Model;

/// An alternate name
#[derive(Debug)]
pub struct Alias {
    pub(crate) name: String,
    pub(crate) owner: Option<EntityKey>,
}

impl Alias {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Model {
    /// Append an alias to a business object. Derived aliases for each facet
    /// appear as a side effect of the synchronizer cascade.
    pub fn add_alias(&mut self, business_object: EntityKey, name: &str) -> Result<EntityKey> {
        if self.entity(business_object)?.kind() != EntityKind::BusinessObject {
            let label = self.entity(business_object)?.kind().label();
            return Err(ModelError::unsupported(label, "add alias"));
        }
        self.ensure_editable_for(business_object, "add alias")?;
        let list = ListRef::new(business_object, ListRole::Aliases);
        let len = self.children(list)?.len();
        let alias = self.insert_entity(EntityData::Alias(Alias::new(name)));
        match self.insert_child_raw(list, len, alias) {
            Ok(()) => Ok(alias),
            Err(err) => {
                self.discard_detached(alias);
                Err(err)
            }
        }
    }

    /// Remove and discard a business object alias; its derived facet
    /// aliases disappear through the cascade. Aliases owned by facets are
    /// derivation-managed and cannot be removed directly.
    pub fn remove_alias(&mut self, alias: EntityKey) -> Result<()> {
        let Some(owner) = self.entity(alias)?.owner() else {
            return Ok(());
        };
        if self.entity(owner)?.kind() != EntityKind::BusinessObject {
            return Err(ModelError::unsupported("derived alias", "remove directly"));
        }
        self.ensure_editable_for(alias, "remove alias")?;
        self.remove_child_raw(ListRef::new(owner, ListRole::Aliases), alias)?;
        self.discard_detached(alias);
        Ok(())
    }

    /// Alias keys of a business object or facet, in order.
    pub fn aliases(&self, owner: EntityKey) -> Result<&[EntityKey]> {
        self.children(ListRef::new(owner, ListRole::Aliases))
    }
}
