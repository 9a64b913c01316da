//! The model: entity storage, the library registry, and cross-cutting
//! operations
//!
//! One `Model` owns one arena of entities, one event bus, and one registry
//! of libraries. It is a single-writer structure: all mutation goes through
//! `&mut self` methods, listeners are `Rc`-held, and nothing here is `Send`.

use std::rc::Rc;

use tracing::{debug, info, warn};
use url::Url;

use crate::arena::{EntityArena, EntityKey};
use crate::children::{ListRef, ListRole};
use crate::config::{BuiltinLibraryDef, ModelConfig};
use crate::entity::{
    uniquify_prefix, Alias, Attribute, BusinessObject, Element, EntityData, EntityKind, EnumValue,
    Enumeration, Facet, Library, LibraryKind, SimpleType,
};
use crate::error::{ModelError, Result};
use crate::event::{Event, EventBus, EventGuard, EventKind, ModelListener, Subject};
use crate::version::{VersionScheme, VersionSchemeRegistry};

/// In-memory semantic model of a set of schema libraries
pub struct Model {
    pub(crate) arena: EntityArena,
    libraries: Vec<EntityKey>,
    bus: EventBus,
    schemes: VersionSchemeRegistry,
    config: ModelConfig,
}

impl Model {
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    /// Build a model from configuration: event delivery default, the
    /// default version scheme, and the built-in libraries to install.
    pub fn with_config(config: ModelConfig) -> Self {
        let mut model = Self {
            arena: EntityArena::new(),
            libraries: Vec::new(),
            bus: EventBus::new(config.events_enabled),
            schemes: VersionSchemeRegistry::default(),
            config,
        };
        model.install_builtins();
        model
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    // ======================================================================
    // Entity access
    // ======================================================================

    pub(crate) fn insert_entity(&mut self, data: EntityData) -> EntityKey {
        self.arena.insert(data)
    }

    /// Whether a key refers to a live entity.
    pub fn contains(&self, key: EntityKey) -> bool {
        self.arena.contains(key)
    }

    pub fn entity_count(&self) -> usize {
        self.arena.len()
    }

    pub fn entity(&self, key: EntityKey) -> Result<&EntityData> {
        self.arena.get(key).ok_or(ModelError::UnknownEntity)
    }

    pub(crate) fn entity_mut(&mut self, key: EntityKey) -> Result<&mut EntityData> {
        self.arena.get_mut(key).ok_or(ModelError::UnknownEntity)
    }

    pub fn library(&self, key: EntityKey) -> Result<&Library> {
        match self.entity(key)? {
            EntityData::Library(l) => Ok(l),
            other => Err(ModelError::unsupported(other.kind().label(), "use as library")),
        }
    }

    pub(crate) fn library_mut(&mut self, key: EntityKey) -> Result<&mut Library> {
        match self.entity_mut(key)? {
            EntityData::Library(l) => Ok(l),
            other => Err(ModelError::unsupported(other.kind().label(), "use as library")),
        }
    }

    pub fn business_object(&self, key: EntityKey) -> Result<&BusinessObject> {
        match self.entity(key)? {
            EntityData::BusinessObject(b) => Ok(b),
            other => Err(ModelError::unsupported(
                other.kind().label(),
                "use as business object",
            )),
        }
    }

    pub(crate) fn business_object_mut(&mut self, key: EntityKey) -> Result<&mut BusinessObject> {
        match self.entity_mut(key)? {
            EntityData::BusinessObject(b) => Ok(b),
            other => Err(ModelError::unsupported(
                other.kind().label(),
                "use as business object",
            )),
        }
    }

    pub fn facet(&self, key: EntityKey) -> Result<&Facet> {
        match self.entity(key)? {
            EntityData::Facet(f) => Ok(f),
            other => Err(ModelError::unsupported(other.kind().label(), "use as facet")),
        }
    }

    pub fn alias(&self, key: EntityKey) -> Result<&Alias> {
        match self.entity(key)? {
            EntityData::Alias(a) => Ok(a),
            other => Err(ModelError::unsupported(other.kind().label(), "use as alias")),
        }
    }

    pub fn attribute(&self, key: EntityKey) -> Result<&Attribute> {
        match self.entity(key)? {
            EntityData::Attribute(a) => Ok(a),
            other => Err(ModelError::unsupported(other.kind().label(), "use as attribute")),
        }
    }

    pub fn element(&self, key: EntityKey) -> Result<&Element> {
        match self.entity(key)? {
            EntityData::Element(e) => Ok(e),
            other => Err(ModelError::unsupported(other.kind().label(), "use as element")),
        }
    }

    pub fn simple_type(&self, key: EntityKey) -> Result<&SimpleType> {
        match self.entity(key)? {
            EntityData::SimpleType(s) => Ok(s),
            other => Err(ModelError::unsupported(other.kind().label(), "use as simple type")),
        }
    }

    pub fn enumeration(&self, key: EntityKey) -> Result<&Enumeration> {
        match self.entity(key)? {
            EntityData::Enumeration(e) => Ok(e),
            other => Err(ModelError::unsupported(other.kind().label(), "use as enumeration")),
        }
    }

    pub fn enum_value(&self, key: EntityKey) -> Result<&EnumValue> {
        match self.entity(key)? {
            EntityData::EnumValue(v) => Ok(v),
            other => Err(ModelError::unsupported(
                other.kind().label(),
                "use as enumeration value",
            )),
        }
    }

    // ======================================================================
    // Library registry
    // ======================================================================

    /// Registered libraries in registration order, built-ins first.
    pub fn libraries(&self) -> &[EntityKey] {
        &self.libraries
    }

    pub fn user_libraries(&self) -> Vec<EntityKey> {
        self.libraries_of_kind(LibraryKind::User)
    }

    pub fn builtin_libraries(&self) -> Vec<EntityKey> {
        self.libraries_of_kind(LibraryKind::BuiltIn)
    }

    fn libraries_of_kind(&self, kind: LibraryKind) -> Vec<EntityKey> {
        self.libraries
            .iter()
            .copied()
            .filter(|k| self.library(*k).map(|l| l.kind == kind).unwrap_or(false))
            .collect()
    }

    pub fn is_registered(&self, library: EntityKey) -> bool {
        self.libraries.contains(&library)
    }

    /// The registered library with a namespace + name pair, if any.
    pub fn find_library(&self, namespace: &str, name: &str) -> Option<EntityKey> {
        self.libraries.iter().copied().find(|k| {
            self.library(*k)
                .map(|l| l.namespace == namespace && l.name == name)
                .unwrap_or(false)
        })
    }

    /// The registered library assigned a resource URL, compared after
    /// normalization.
    pub fn library_by_url(&self, url: &str) -> Option<EntityKey> {
        let wanted = normalize_url(url);
        self.libraries.iter().copied().find(|k| {
            self.library(*k)
                .ok()
                .and_then(|l| l.resource_url.as_deref())
                .map(|u| normalize_url(u) == wanted)
                .unwrap_or(false)
        })
    }

    /// Register a library. Uniqueness of (namespace, name) and of the
    /// normalized resource URL is checked before anything is mutated.
    /// Registering an already registered library is a no-op.
    pub fn add_library(&mut self, library: EntityKey) -> Result<()> {
        let lib = self.library(library)?;
        if self.libraries.contains(&library) {
            return Ok(());
        }
        let namespace = lib.namespace.clone();
        let name = lib.name.clone();
        let url = lib.resource_url.clone();
        self.check_duplicate(&namespace, &name, url.as_deref(), None)?;

        if self.library(library)?.version_scheme.is_none() {
            self.library_mut(library)?.version_scheme =
                Some(self.config.default_version_scheme.clone());
        }
        self.libraries.push(library);
        info!(name = %name, namespace = %namespace, "library registered");
        self.publish(Event::structural(EventKind::LibraryAdded, Subject::Model, library));
        self.assign_default_imports(library);
        Ok(())
    }

    /// Deregister a library. Its entities stay alive and keyed; only the
    /// registry entry goes away. No-op when not registered.
    pub fn remove_library(&mut self, library: EntityKey) -> Result<()> {
        let Some(pos) = self.libraries.iter().position(|k| *k == library) else {
            return Ok(());
        };
        self.libraries.remove(pos);
        if let Ok(lib) = self.library(library) {
            info!(name = %lib.name, "library deregistered");
        }
        self.publish(Event::structural(EventKind::LibraryRemoved, Subject::Model, library));
        Ok(())
    }

    /// Reject a (namespace, name) pair or normalized resource URL already
    /// taken by a registered library other than `excluding`.
    pub(crate) fn check_duplicate(
        &self,
        namespace: &str,
        name: &str,
        url: Option<&str>,
        excluding: Option<EntityKey>,
    ) -> Result<()> {
        let wanted_url = url.map(normalize_url);
        for key in &self.libraries {
            if excluding == Some(*key) {
                continue;
            }
            let Ok(lib) = self.library(*key) else {
                continue;
            };
            if lib.namespace == namespace && lib.name == name {
                return Err(ModelError::duplicate(format!(
                    "library {name:?} already exists in namespace {namespace}"
                )));
            }
            if let (Some(wanted), Some(existing)) = (&wanted_url, lib.resource_url.as_deref()) {
                if *wanted == normalize_url(existing) {
                    return Err(ModelError::duplicate(format!(
                        "resource URL {wanted} is already assigned to library {:?}",
                        lib.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn install_builtins(&mut self) {
        let defs = self.config.builtins.clone();
        for def in &defs {
            self.install_builtin(def);
        }
    }

    fn install_builtin(&mut self, def: &BuiltinLibraryDef) {
        if self.check_duplicate(&def.namespace, &def.name, None, None).is_err() {
            warn!(name = %def.name, "skipping built-in library with duplicate identity");
            return;
        }
        let mut lib = Library::new(&def.name, &def.namespace, LibraryKind::BuiltIn);
        lib.prefix = Some(def.prefix.clone());
        lib.version_scheme = Some(self.config.default_version_scheme.clone());
        let key = self.insert_entity(EntityData::Library(lib));
        for type_name in &def.simple_types {
            let st = self.insert_entity(EntityData::SimpleType(SimpleType::new(type_name)));
            if let Err(err) = self.add_member_raw(key, st) {
                warn!(%err, type_name, "skipping built-in simple type");
                self.discard_detached(st);
            }
        }
        self.libraries.push(key);
        debug!(name = %def.name, namespace = %def.namespace, "built-in library installed");
        self.publish(Event::structural(EventKind::LibraryAdded, Subject::Model, key));
    }

    /// Give a newly registered user library one import per built-in
    /// library it does not import yet, uniquifying prefixes as needed.
    fn assign_default_imports(&mut self, library: EntityKey) {
        let Ok(lib) = self.library(library) else {
            return;
        };
        if lib.kind != LibraryKind::User {
            return;
        }
        let imported: Vec<String> = lib.imports.iter().map(|i| i.namespace.clone()).collect();
        let builtins: Vec<(String, String)> = self
            .libraries
            .iter()
            .filter_map(|k| {
                let l = self.library(*k).ok()?;
                if l.kind != LibraryKind::BuiltIn {
                    return None;
                }
                Some((
                    l.prefix.clone().unwrap_or_else(|| "lib".to_string()),
                    l.namespace.clone(),
                ))
            })
            .collect();
        for (prefix, namespace) in builtins {
            if imported.contains(&namespace) {
                continue;
            }
            let unique = match self.library(library) {
                Ok(lib) => uniquify_prefix(&lib.imports, &prefix),
                Err(_) => return,
            };
            if let Err(err) = self.add_import_raw(library, &unique, &namespace) {
                warn!(%err, namespace, "default import skipped");
            }
        }
    }

    // ======================================================================
    // Naming and identity
    // ======================================================================

    /// Rename an entity. Cascades through any synchronizer watching the
    /// list the entity sits in. Libraries re-check registry uniqueness;
    /// fixed facets and derived aliases are not renameable.
    pub fn rename(&mut self, key: EntityKey, name: &str) -> Result<()> {
        match self.entity(key)?.kind() {
            EntityKind::Library => return self.set_library_name(key, name),
            EntityKind::Facet => {
                let kind = self.facet(key)?.kind;
                if !kind.is_contextual() {
                    return Err(ModelError::unsupported(kind.label(), "rename"));
                }
            }
            EntityKind::Alias => {
                let owned_by_facet = self
                    .entity(key)?
                    .owner()
                    .and_then(|o| self.arena.get(o))
                    .map(|e| e.kind() == EntityKind::Facet)
                    .unwrap_or(false);
                if owned_by_facet {
                    return Err(ModelError::unsupported("derived alias", "rename directly"));
                }
            }
            _ => {}
        }
        self.ensure_editable_for(key, "rename")?;
        self.rename_raw(key, name)
    }

    /// Rename without guards: sets the name, publishes `NameModified`, and
    /// cascades. Synchronizers use this on derived entries, so the
    /// secondary renames of a cascade are observable events themselves.
    pub(crate) fn rename_raw(&mut self, key: EntityKey, name: &str) -> Result<()> {
        let old = self.entity(key)?.name().unwrap_or("").to_string();
        if old == name {
            return Ok(());
        }
        self.entity_mut(key)?.set_name_raw(name);
        self.publish(Event::valued(
            EventKind::NameModified,
            Subject::Entity(key),
            (!old.is_empty()).then(|| old.clone()),
            (!name.is_empty()).then(|| name.to_string()),
        ));
        if let Some(list) = self.containing_list(key) {
            self.cascade_renamed(list, key, &old);
        }
        // A contextual facet's label feeds the derived names of its alias
        // list; relabeling re-derives them.
        let extends = self.facet(key).ok().and_then(|f| f.extends);
        if let Some(business_object) = extends {
            self.refresh_derived_names_for(ListRef::new(business_object, ListRole::Aliases), key);
        }
        Ok(())
    }

    /// Display identity: the owner chain from the library root, e.g.
    /// `http://example.org/ns/v1 : Shipping/Order/Summary`.
    pub fn identity(&self, key: EntityKey) -> String {
        let mut segments: Vec<String> = Vec::new();
        let mut namespace: Option<String> = None;
        let mut cursor = Some(key);
        let mut hops = 0;
        while let Some(k) = cursor {
            hops += 1;
            if hops > 64 {
                break;
            }
            let Some(entity) = self.arena.get(k) else {
                segments.push("(unknown)".to_string());
                break;
            };
            if let EntityData::Library(l) = entity {
                namespace = Some(l.namespace.clone());
                segments.push(l.name.clone());
                break;
            }
            segments.push(
                entity
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "(unnamed)".to_string()),
            );
            cursor = entity.owner();
        }
        segments.reverse();
        let path = segments.join("/");
        match namespace {
            Some(ns) => format!("{ns} : {path}"),
            None => path,
        }
    }

    // ======================================================================
    // Versions
    // ======================================================================

    pub fn version_schemes(&self) -> &VersionSchemeRegistry {
        &self.schemes
    }

    pub fn register_version_scheme(&mut self, scheme: Rc<dyn VersionScheme>) {
        self.schemes.register(scheme);
    }

    /// The scheme a library's namespace is interpreted under, resolved
    /// against the scheme registry.
    pub fn active_version_scheme(&self, library: EntityKey) -> Result<Rc<dyn VersionScheme>> {
        let lib = self.library(library)?;
        let Some(id) = lib.version_scheme.as_deref() else {
            return Err(ModelError::invalid_state(format!(
                "library {:?} has no version scheme",
                lib.name
            )));
        };
        self.schemes.get(id).ok_or_else(|| {
            ModelError::invalid_state(format!("version scheme {id:?} is not registered"))
        })
    }

    /// The version identifier embedded in a library's namespace.
    pub fn library_version(&self, library: EntityKey) -> Result<String> {
        let scheme = self.active_version_scheme(library)?;
        scheme.version_identifier(&self.library(library)?.namespace)
    }

    /// A library's namespace with the version segment removed.
    pub fn library_base_namespace(&self, library: EntityKey) -> Result<String> {
        let scheme = self.active_version_scheme(library)?;
        Ok(scheme.base_namespace(&self.library(library)?.namespace))
    }

    /// Re-version a library by rewriting the version segment of its
    /// namespace. Fires `NamespaceModified` like any namespace change.
    pub fn set_library_version(&mut self, library: EntityKey, identifier: &str) -> Result<()> {
        let scheme = self.active_version_scheme(library)?;
        let namespace = scheme.set_version_identifier(&self.library(library)?.namespace, identifier)?;
        self.set_library_namespace(library, &namespace)
    }

    /// Whether `library` is a later version of the same base namespace as
    /// `other` under a shared scheme. False whenever the libraries are not
    /// comparable (different schemes, different base namespaces, or
    /// unparseable versions).
    pub fn is_later_version(&self, library: EntityKey, other: EntityKey) -> bool {
        let (Ok(a), Ok(b)) = (self.library(library), self.library(other)) else {
            return false;
        };
        let (Some(sa), Some(sb)) = (a.version_scheme.as_deref(), b.version_scheme.as_deref())
        else {
            return false;
        };
        if sa != sb {
            return false;
        }
        let Some(scheme) = self.schemes.get(sa) else {
            return false;
        };
        if scheme.base_namespace(&a.namespace) != scheme.base_namespace(&b.namespace) {
            return false;
        }
        let (Ok(va), Ok(vb)) = (
            scheme.version_identifier(&a.namespace),
            scheme.version_identifier(&b.namespace),
        ) else {
            return false;
        };
        matches!(scheme.compare_versions(&va, &vb), Ok(std::cmp::Ordering::Greater))
    }

    // ======================================================================
    // Events
    // ======================================================================

    pub fn add_listener(&mut self, listener: Rc<dyn ModelListener>) {
        self.bus.add_listener(listener);
    }

    pub fn remove_listener(&mut self, listener: &Rc<dyn ModelListener>) {
        self.bus.remove_listener(listener);
    }

    pub fn events_enabled(&self) -> bool {
        self.bus.is_enabled()
    }

    /// Flip event delivery on or off, returning the previous value so
    /// callers can restore it.
    pub fn set_events_enabled(&self, enabled: bool) -> bool {
        self.bus.set_enabled(enabled)
    }

    /// Suppress event delivery until the returned guard drops. Structural
    /// maintenance (ownership, synchronized lists) still runs; only
    /// listener delivery is silenced.
    pub fn suppress_events(&self) -> EventGuard {
        EventGuard::new(self.bus.suppression_flag())
    }

    pub(crate) fn publish(&self, event: Event) {
        self.bus.publish(&event);
    }

    // ======================================================================
    // Guards
    // ======================================================================

    /// The library an entity ultimately belongs to, walking owners.
    pub fn owning_library(&self, key: EntityKey) -> Option<EntityKey> {
        let mut cursor = key;
        let mut hops = 0;
        loop {
            hops += 1;
            if hops > 64 {
                return None;
            }
            let entity = self.arena.get(cursor)?;
            if matches!(entity, EntityData::Library(_)) {
                return Some(cursor);
            }
            cursor = entity.owner()?;
        }
    }

    /// Reject edits inside built-in and read-only libraries. Entities not
    /// (yet) under any library are freely editable.
    pub(crate) fn ensure_editable_for(&self, key: EntityKey, operation: &str) -> Result<()> {
        let Some(library) = self.owning_library(key) else {
            return Ok(());
        };
        let Ok(lib) = self.library(library) else {
            return Ok(());
        };
        if lib.kind == LibraryKind::BuiltIn {
            return Err(ModelError::unsupported(lib.kind.label(), operation));
        }
        if lib.read_only {
            return Err(ModelError::invalid_state(format!(
                "library {:?} is read-only",
                lib.name
            )));
        }
        Ok(())
    }

    // ======================================================================
    // Bulk operations
    // ======================================================================

    /// Move a member between libraries as one logical edit: the individual
    /// remove/add events are suppressed and a single `MemberMoved` is
    /// published with the member's old and new identities.
    pub fn move_member(&mut self, member: EntityKey, from: EntityKey, to: EntityKey) -> Result<()> {
        self.library(from)?;
        self.library(to)?;
        if from == to {
            return Ok(());
        }
        let from_members = ListRef::new(from, ListRole::Members);
        let Some(pos) = self.list(from_members)?.items.iter().position(|k| *k == member) else {
            return Err(ModelError::invalid_state(
                "member is not in the source library",
            ));
        };
        self.ensure_editable_for(from, "move member out")?;

        let old_identity = self.identity(member);
        {
            let _guard = self.suppress_events();
            self.remove_child_raw(from_members, member)?;
            if let Err(err) = self.add_member(to, member) {
                // Put the member back at its old position; the move never
                // happened.
                let _restored = self.insert_child_raw(from_members, pos, member);
                return Err(err);
            }
        }
        let new_identity = self.identity(member);
        debug!(member = ?member, from = %old_identity, to = %new_identity, "member moved");
        self.publish(Event {
            kind: EventKind::MemberMoved,
            subject: Subject::Entity(member),
            item: None,
            old: Some(old_identity),
            new: Some(new_identity),
        });
        Ok(())
    }

    /// Tear the model down to its built-ins: every registered library is
    /// deregistered (with `LibraryRemoved` events), all entities are
    /// dropped, and the configured built-ins are reinstalled.
    pub fn reset(&mut self) {
        for library in self.libraries.clone() {
            if let Err(err) = self.remove_library(library) {
                warn!(%err, "reset: library deregistration failed");
            }
        }
        self.arena.clear();
        self.install_builtins();
        debug!("model reset");
    }

    // ======================================================================
    // Entity lifetime
    // ======================================================================

    /// Drop a detached entity and everything it owns from the arena. Keys
    /// into the discarded subtree become stale. Owned entities, registered
    /// libraries, and attached contextual facets must be detached first.
    pub fn discard(&mut self, key: EntityKey) -> Result<()> {
        let entity = self.entity(key)?;
        if entity.owner().is_some() {
            return Err(ModelError::invalid_state(
                "entity is owned; remove it from its list before discarding",
            ));
        }
        match entity {
            EntityData::Library(_) if self.libraries.contains(&key) => {
                return Err(ModelError::invalid_state(
                    "library is registered; remove it from the model before discarding",
                ));
            }
            EntityData::Facet(f) if f.extends.is_some() => {
                return Err(ModelError::invalid_state(
                    "contextual facet is attached; detach it before discarding",
                ));
            }
            _ => {}
        }
        self.discard_detached(key);
        Ok(())
    }

    /// Discard without guards. No events fire: this is reclamation of a
    /// subtree that listeners can no longer reach.
    pub(crate) fn discard_detached(&mut self, key: EntityKey) {
        let mut stack = vec![key];
        let mut doomed: Vec<EntityKey> = Vec::new();
        let mut to_detach: Vec<EntityKey> = Vec::new();
        while let Some(k) = stack.pop() {
            let Some(entity) = self.arena.get(k) else {
                continue;
            };
            doomed.push(k);
            match entity {
                EntityData::Library(l) => stack.extend(l.members.items().iter().copied()),
                EntityData::BusinessObject(b) => {
                    stack.extend(b.aliases.items().iter().copied());
                    stack.extend([
                        b.id_facet,
                        b.summary_facet,
                        b.detail_facet,
                        b.summary_list_facet,
                        b.detail_list_facet,
                    ]);
                    // Attached contextual facets belong to their libraries;
                    // they survive, but their extension target is gone.
                    to_detach.extend(b.attached_facets.iter().copied());
                }
                EntityData::Facet(f) => {
                    stack.extend(f.aliases.items().iter().copied());
                    stack.extend(f.attributes.items().iter().copied());
                    stack.extend(f.elements.items().iter().copied());
                }
                EntityData::Enumeration(e) => stack.extend(e.values.items().iter().copied()),
                _ => {}
            }
        }
        for facet in to_detach {
            if let Some(EntityData::Facet(f)) = self.arena.get_mut(facet) {
                f.extends = None;
            }
        }
        for k in doomed {
            self.arena.remove(k);
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical form for resource URL comparison: parsed and re-serialized
/// when possible (normalizing case, default ports, and path dots), the
/// trimmed raw string otherwise.
fn normalize_url(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.trim().to_string(),
    }
}
