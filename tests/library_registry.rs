//! Library registry scenarios: uniqueness, built-ins, imports, versioning

mod common;

use common::{init_tracing, Recorder};
use tessella_model::{EventKind, Model, ModelError};

// =============================================================================
// Uniqueness
// =============================================================================

#[test]
fn test_duplicate_namespace_and_name_is_rejected() {
    init_tracing();
    let mut model = Model::new();
    let first = model.create_library("Lib1", "http://ex.org/ns/v1");
    model.add_library(first).unwrap();
    let before = model.libraries().len();

    let second = model.create_library("Lib1", "http://ex.org/ns/v1");
    let err = model.add_library(second).unwrap_err();
    assert!(matches!(err, ModelError::DuplicateKey { .. }));
    assert_eq!(model.libraries().len(), before);
    assert_eq!(model.find_library("http://ex.org/ns/v1", "Lib1"), Some(first));

    // Same name in a different namespace is fine.
    let third = model.create_library("Lib1", "http://ex.org/other/v1");
    model.add_library(third).unwrap();
}

#[test]
fn test_duplicate_resource_url_is_rejected_after_normalization() {
    let mut model = Model::new();
    let first = model.create_library("Catalog", "http://ex.org/catalog/v1");
    model.add_library(first).unwrap();
    model
        .set_library_resource_url(first, Some("http://repo.ex.org/catalog.tsl"))
        .unwrap();

    let second = model.create_library("Orders", "http://ex.org/orders/v1");
    // Differing case and an explicit default port still collide.
    let err = model
        .set_library_resource_url(second, Some("HTTP://Repo.Ex.org:80/catalog.tsl"))
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateKey { .. }));
    assert_eq!(model.library(second).unwrap().resource_url(), None);

    assert_eq!(
        model.library_by_url("http://repo.ex.org:80/catalog.tsl"),
        Some(first)
    );
}

#[test]
fn test_failed_rename_leaves_the_model_unchanged() {
    let mut model = Model::new();
    let first = model.create_library("Lib1", "http://ex.org/ns/v1");
    let second = model.create_library("Lib2", "http://ex.org/ns/v1");
    model.add_library(first).unwrap();
    model.add_library(second).unwrap();

    assert!(model.set_library_name(second, "Lib1").is_err());
    assert_eq!(model.library(second).unwrap().name(), "Lib2");

    // Moving into an occupied namespace only conflicts when the names
    // collide too.
    let third = model.create_library("Lib1", "http://ex.org/elsewhere/v1");
    model.add_library(third).unwrap();
    let err = model
        .set_library_namespace(third, "http://ex.org/ns/v1")
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateKey { .. }));
    assert_eq!(
        model.library(third).unwrap().namespace(),
        "http://ex.org/elsewhere/v1"
    );
    let fourth = model.create_library("Lib4", "http://ex.org/elsewhere2/v1");
    model.add_library(fourth).unwrap();
    model
        .set_library_namespace(fourth, "http://ex.org/ns/v1")
        .unwrap();
}

// =============================================================================
// Built-ins and read-only libraries
// =============================================================================

#[test]
fn test_builtin_library_is_installed_and_immutable() {
    let mut model = Model::new();
    let builtins = model.builtin_libraries();
    assert_eq!(builtins.len(), 1);
    let primitives = builtins[0];
    assert_eq!(model.library(primitives).unwrap().name(), "TessellaPrimitives");
    assert!(model.member_by_name(primitives, "string").unwrap().is_some());

    let st = model.create_simple_type("Extra");
    let err = model.add_member(primitives, st).unwrap_err();
    assert!(matches!(err, ModelError::UnsupportedOperation { .. }));
    let err = model.rename(primitives, "Renamed").unwrap_err();
    assert!(matches!(err, ModelError::UnsupportedOperation { .. }));
}

#[test]
fn test_read_only_library_rejects_structural_edits() {
    let mut model = Model::new();
    let lib = model.create_library("Frozen", "http://ex.org/frozen/v1");
    model.add_library(lib).unwrap();
    let bo = model.create_business_object("Doc").unwrap();
    model.add_member(lib, bo).unwrap();

    model.set_library_read_only(lib, true).unwrap();
    assert!(matches!(
        model.add_alias(bo, "D").unwrap_err(),
        ModelError::InvalidState(_)
    ));
    assert!(model.rename(bo, "Doc2").is_err());

    model.set_library_read_only(lib, false).unwrap();
    model.add_alias(bo, "D").unwrap();
}

// =============================================================================
// Imports
// =============================================================================

#[test]
fn test_registration_assigns_default_builtin_imports() {
    let mut model = Model::new();
    let lib = model.create_library("Orders", "http://ex.org/orders/v1");
    model.add_library(lib).unwrap();

    let imports = model.library(lib).unwrap().imports().to_vec();
    assert!(imports
        .iter()
        .any(|i| i.prefix == "tsp" && i.namespace.contains("primitives")));
}

#[test]
fn test_default_import_prefix_is_uniquified_on_collision() {
    let mut model = Model::new();
    let lib = model.create_library("Orders", "http://ex.org/orders/v1");
    model.add_import(lib, "tsp", "http://ex.org/taken/v1").unwrap();
    model.add_library(lib).unwrap();

    let imports = model.library(lib).unwrap().imports().to_vec();
    assert!(imports
        .iter()
        .any(|i| i.prefix == "tsp1" && i.namespace.contains("primitives")));
}

#[test]
fn test_import_prefix_remapping_is_rejected() {
    let mut model = Model::new();
    let lib = model.create_library("Orders", "http://ex.org/orders/v1");
    model.add_library(lib).unwrap();
    let recorder = Recorder::install(&mut model);

    model.add_import(lib, "cat", "http://ex.org/catalog/v1").unwrap();
    // Re-declaring the identical binding is a no-op.
    model.add_import(lib, "cat", "http://ex.org/catalog/v1").unwrap();
    assert_eq!(recorder.count_of(EventKind::ImportAdded), 1);

    let err = model
        .add_import(lib, "cat", "http://ex.org/other/v1")
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateKey { .. }));

    model.remove_import(lib, "cat").unwrap();
    model.remove_import(lib, "cat").unwrap();
    assert_eq!(recorder.count_of(EventKind::ImportRemoved), 1);
}

// =============================================================================
// Versioning
// =============================================================================

#[test]
fn test_decimal_dot_orders_versions_numerically() {
    let mut model = Model::new();
    let old = model.create_library("Lib", "http://example.org/ns/v1_2");
    let new = model.create_library("Lib", "http://example.org/ns/v1_10");
    model.add_library(old).unwrap();
    model.add_library(new).unwrap();

    assert_eq!(model.library_version(old).unwrap(), "1.2");
    assert_eq!(model.library_version(new).unwrap(), "1.10");
    assert!(model.is_later_version(new, old));
    assert!(!model.is_later_version(old, new));
    assert!(!model.is_later_version(old, old));
}

#[test]
fn test_different_base_namespaces_are_not_comparable() {
    let mut model = Model::new();
    let a = model.create_library("Lib", "http://example.org/a/v2");
    let b = model.create_library("Lib", "http://example.org/b/v1");
    model.add_library(a).unwrap();
    model.add_library(b).unwrap();
    assert!(!model.is_later_version(a, b));
    assert!(!model.is_later_version(b, a));
}

#[test]
fn test_unknown_scheme_id_is_stored_but_inactive() {
    let mut model = Model::new();
    let lib = model.create_library("Lib", "http://example.org/ns/v1");
    model.add_library(lib).unwrap();

    model
        .set_library_version_scheme(lib, Some("calendar"))
        .unwrap();
    assert_eq!(model.library(lib).unwrap().version_scheme(), Some("calendar"));
    assert!(model.active_version_scheme(lib).is_err());
    assert!(!model.is_later_version(lib, lib));
}

#[test]
fn test_set_library_version_rewrites_the_namespace() {
    let mut model = Model::new();
    let lib = model.create_library("Lib", "http://example.org/ns/v1");
    model.add_library(lib).unwrap();
    let recorder = Recorder::install(&mut model);

    model.set_library_version(lib, "2.0").unwrap();
    assert_eq!(
        model.library(lib).unwrap().namespace(),
        "http://example.org/ns/v2_0"
    );
    assert_eq!(model.library_version(lib).unwrap(), "2.0");
    assert_eq!(model.library_base_namespace(lib).unwrap(), "http://example.org/ns");
    assert_eq!(recorder.count_of(EventKind::NamespaceModified), 1);

    let err = model.set_library_version(lib, "2.beta").unwrap_err();
    assert!(matches!(err, ModelError::InvalidVersionIdentifier { .. }));
}
