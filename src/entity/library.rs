//! Libraries: the root containers of the model
//!
//! A library owns a members list (business objects, simple types,
//! enumerations, contextual facets) and carries the identity fields the
//! model registry enforces uniqueness over: namespace + name, and the
//! optional resource URL.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::arena::EntityKey;
use crate::children::{ChildList, ListRef, ListRole};
use crate::entity::EntityData;
use crate::error::{ModelError, Result};
use crate::event::{Event, EventKind, Subject};
use crate::model::Model;

/// Whether a library is user-editable or a built-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
    User,
    BuiltIn,
}

impl LibraryKind {
    pub fn label(&self) -> &'static str {
        match self {
            LibraryKind::User => "user library",
            LibraryKind::BuiltIn => "built-in library",
        }
    }

    /// Member kinds a library of this kind may contain.
    pub fn allowed_members(&self) -> &'static [MemberKind] {
        match self {
            LibraryKind::User => &[
                MemberKind::BusinessObject,
                MemberKind::SimpleType,
                MemberKind::Enumeration,
                MemberKind::ContextualFacet,
            ],
            LibraryKind::BuiltIn => &[MemberKind::SimpleType, MemberKind::Enumeration],
        }
    }
}

/// Kinds of entity a library members list can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    BusinessObject,
    SimpleType,
    Enumeration,
    ContextualFacet,
}

impl MemberKind {
    pub fn label(&self) -> &'static str {
        match self {
            MemberKind::BusinessObject => "business object",
            MemberKind::SimpleType => "simple type",
            MemberKind::Enumeration => "enumeration",
            MemberKind::ContextualFacet => "contextual facet",
        }
    }
}

/// A prefix-to-namespace binding declared by a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceImport {
    pub prefix: String,
    pub namespace: String,
}

/// Root container entity
#[derive(Debug)]
pub struct Library {
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) prefix: Option<String>,
    pub(crate) resource_url: Option<String>,
    pub(crate) version_scheme: Option<String>,
    pub(crate) documentation: Option<String>,
    pub(crate) kind: LibraryKind,
    pub(crate) read_only: bool,
    pub(crate) imports: Vec<NamespaceImport>,
    pub(crate) members: ChildList,
}

impl Library {
    pub(crate) fn new(name: &str, namespace: &str, kind: LibraryKind) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            prefix: None,
            resource_url: None,
            version_scheme: None,
            documentation: None,
            kind,
            read_only: false,
            imports: Vec::new(),
            members: ChildList::new(EventKind::MemberAdded, EventKind::MemberRemoved),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn resource_url(&self) -> Option<&str> {
        self.resource_url.as_deref()
    }

    pub fn version_scheme(&self) -> Option<&str> {
        self.version_scheme.as_deref()
    }

    pub fn kind(&self) -> LibraryKind {
        self.kind
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn imports(&self) -> &[NamespaceImport] {
        &self.imports
    }
}

/// Pick an import prefix not already bound in `existing`, suffixing a
/// counter when the wanted prefix is taken.
pub(crate) fn uniquify_prefix(existing: &[NamespaceImport], want: &str) -> String {
    let taken = |p: &str| existing.iter().any(|i| i.prefix == p);
    if !taken(want) {
        return want.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{want}{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl Model {
    /// Create a detached user library. It joins the registry only through
    /// `add_library`, which is where uniqueness is enforced.
    pub fn create_library(&mut self, name: &str, namespace: &str) -> EntityKey {
        self.insert_entity(EntityData::Library(Library::new(
            name,
            namespace,
            LibraryKind::User,
        )))
    }

    /// Rename a library, re-checking registry uniqueness first.
    pub fn set_library_name(&mut self, library: EntityKey, name: &str) -> Result<()> {
        self.ensure_editable_for(library, "rename library")?;
        let lib = self.library(library)?;
        let old = lib.name.clone();
        if old == name {
            return Ok(());
        }
        let namespace = lib.namespace.clone();
        let url = lib.resource_url.clone();
        self.check_duplicate(&namespace, name, url.as_deref(), Some(library))?;
        self.library_mut(library)?.name = name.to_string();
        self.publish(Event::valued(
            EventKind::NameModified,
            Subject::Entity(library),
            Some(old),
            Some(name.to_string()),
        ));
        Ok(())
    }

    /// Move a library to a different namespace, re-checking uniqueness.
    pub fn set_library_namespace(&mut self, library: EntityKey, namespace: &str) -> Result<()> {
        self.ensure_editable_for(library, "change namespace")?;
        let lib = self.library(library)?;
        let old = lib.namespace.clone();
        if old == namespace {
            return Ok(());
        }
        let name = lib.name.clone();
        let url = lib.resource_url.clone();
        self.check_duplicate(namespace, &name, url.as_deref(), Some(library))?;
        self.library_mut(library)?.namespace = namespace.to_string();
        self.publish(Event::valued(
            EventKind::NamespaceModified,
            Subject::Entity(library),
            Some(old),
            Some(namespace.to_string()),
        ));
        Ok(())
    }

    pub fn set_library_prefix(&mut self, library: EntityKey, prefix: Option<&str>) -> Result<()> {
        self.ensure_editable_for(library, "change prefix")?;
        let old = self.library(library)?.prefix.clone();
        let new = prefix.map(str::to_string);
        if old == new {
            return Ok(());
        }
        self.library_mut(library)?.prefix = new.clone();
        self.publish(Event::valued(
            EventKind::PrefixModified,
            Subject::Entity(library),
            old,
            new,
        ));
        Ok(())
    }

    /// Point a library at a backing resource, re-checking URL uniqueness.
    pub fn set_library_resource_url(&mut self, library: EntityKey, url: Option<&str>) -> Result<()> {
        self.ensure_editable_for(library, "change resource URL")?;
        let lib = self.library(library)?;
        let old = lib.resource_url.clone();
        let new = url.map(str::to_string);
        if old == new {
            return Ok(());
        }
        let namespace = lib.namespace.clone();
        let name = lib.name.clone();
        self.check_duplicate(&namespace, &name, new.as_deref(), Some(library))?;
        self.library_mut(library)?.resource_url = new.clone();
        self.publish(Event::valued(
            EventKind::ResourceUrlModified,
            Subject::Entity(library),
            old,
            new,
        ));
        Ok(())
    }

    /// Select the version scheme a library's namespace is interpreted
    /// under. The scheme id is not validated here; lookups resolve it
    /// against the scheme registry at call time.
    pub fn set_library_version_scheme(
        &mut self,
        library: EntityKey,
        scheme_id: Option<&str>,
    ) -> Result<()> {
        self.ensure_editable_for(library, "change version scheme")?;
        let old = self.library(library)?.version_scheme.clone();
        let new = scheme_id.map(str::to_string);
        if old == new {
            return Ok(());
        }
        self.library_mut(library)?.version_scheme = new.clone();
        self.publish(Event::valued(
            EventKind::VersionSchemeModified,
            Subject::Entity(library),
            old,
            new,
        ));
        Ok(())
    }

    /// Mark a user library read-only (or editable again). Read-only
    /// libraries reject all structural edits until unmarked.
    pub fn set_library_read_only(&mut self, library: EntityKey, read_only: bool) -> Result<()> {
        let lib = self.library(library)?;
        if lib.kind == LibraryKind::BuiltIn {
            return Err(ModelError::unsupported(lib.kind.label(), "change read-only"));
        }
        self.library_mut(library)?.read_only = read_only;
        Ok(())
    }

    /// Declare a prefix-to-namespace import. Re-declaring the identical
    /// binding is a no-op; rebinding a taken prefix is an error.
    pub fn add_import(&mut self, library: EntityKey, prefix: &str, namespace: &str) -> Result<()> {
        self.ensure_editable_for(library, "add import")?;
        if prefix.is_empty() {
            return Err(ModelError::invalid_state("import prefix must not be empty"));
        }
        self.add_import_raw(library, prefix, namespace)
    }

    pub(crate) fn add_import_raw(
        &mut self,
        library: EntityKey,
        prefix: &str,
        namespace: &str,
    ) -> Result<()> {
        let lib = self.library(library)?;
        if let Some(existing) = lib.imports.iter().find(|i| i.prefix == prefix) {
            if existing.namespace == namespace {
                return Ok(());
            }
            return Err(ModelError::duplicate(format!(
                "import prefix {prefix:?} already bound to {:?} in library {:?}",
                existing.namespace, lib.name
            )));
        }
        self.library_mut(library)?.imports.push(NamespaceImport {
            prefix: prefix.to_string(),
            namespace: namespace.to_string(),
        });
        self.publish(Event::valued(
            EventKind::ImportAdded,
            Subject::Entity(library),
            None,
            Some(format!("{prefix}={namespace}")),
        ));
        Ok(())
    }

    /// Remove an import by prefix. No-op when the prefix is not declared.
    pub fn remove_import(&mut self, library: EntityKey, prefix: &str) -> Result<()> {
        self.ensure_editable_for(library, "remove import")?;
        let lib = self.library_mut(library)?;
        let Some(pos) = lib.imports.iter().position(|i| i.prefix == prefix) else {
            return Ok(());
        };
        let removed = lib.imports.remove(pos);
        self.publish(Event::valued(
            EventKind::ImportRemoved,
            Subject::Entity(library),
            Some(format!("{}={}", removed.prefix, removed.namespace)),
            None,
        ));
        Ok(())
    }

    /// Append a member to a library, enforcing the library kind's member
    /// allow-list.
    pub fn add_member(&mut self, library: EntityKey, member: EntityKey) -> Result<()> {
        self.ensure_editable_for(library, "add member")?;
        self.add_member_raw(library, member)
    }

    pub(crate) fn add_member_raw(&mut self, library: EntityKey, member: EntityKey) -> Result<()> {
        let lib = self.library(library)?;
        let allowed = lib.kind.allowed_members();
        let lib_label = lib.kind.label();
        let kind = self
            .entity(member)?
            .member_kind()
            .ok_or_else(|| {
                let label = self.entity(member).map(|e| e.kind().label()).unwrap_or("entity");
                ModelError::unsupported(lib_label, format!("add {label} as member"))
            })?;
        if !allowed.contains(&kind) {
            return Err(ModelError::unsupported(
                lib_label,
                format!("add {} member", kind.label()),
            ));
        }
        let list = ListRef::new(library, ListRole::Members);
        let len = self.children(list)?.len();
        debug!(member = ?member, library = ?library, "add member");
        self.insert_child_raw(list, len, member)
    }

    /// Detach a member from a library. No-op when the member is not in the
    /// library's members list.
    pub fn remove_member(&mut self, library: EntityKey, member: EntityKey) -> Result<()> {
        self.ensure_editable_for(library, "remove member")?;
        self.library(library)?;
        self.remove_child_raw(ListRef::new(library, ListRole::Members), member)
    }

    pub fn members(&self, library: EntityKey) -> Result<&[EntityKey]> {
        self.library(library)?;
        self.children(ListRef::new(library, ListRole::Members))
    }

    /// First member of a library with the given name.
    pub fn member_by_name(&self, library: EntityKey, name: &str) -> Result<Option<EntityKey>> {
        self.library(library)?;
        self.child_by_name(ListRef::new(library, ListRole::Members), name)
    }
}
