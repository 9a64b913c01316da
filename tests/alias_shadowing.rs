//! Alias shadowing scenarios
//!
//! A business object's aliases are mirrored onto its facets and, from the
//! summary/detail facets, onto their list views. These tests drive the full
//! chain through the public mutation surface and check the derived lists
//! stay congruent under add, remove, rename, reorder, and sort.

mod common;

use common::{alias_names, Recorder};
use tessella_model::{EntityKey, EventKind, FacetKind, ListRef, ListRole, Model};

fn shipping_model() -> (Model, EntityKey, EntityKey) {
    let mut model = Model::new();
    let lib = model.create_library("Shipping", "http://ex.org/ns/v1");
    model.add_library(lib).unwrap();
    let order = model.create_business_object("Order").unwrap();
    model.add_member(lib, order).unwrap();
    (model, lib, order)
}

// =============================================================================
// Derivation across the facet chain
// =============================================================================

#[test]
fn test_alias_is_shadowed_onto_every_facet() {
    let (mut model, _, order) = shipping_model();
    model.add_alias(order, "A1").unwrap();

    let expectations = [
        (FacetKind::Id, "A1_ID"),
        (FacetKind::Summary, "A1_Summary"),
        (FacetKind::Detail, "A1_Detail"),
        (FacetKind::SummaryList, "A1_Summary_List"),
        (FacetKind::DetailList, "A1_Detail_List"),
    ];
    for (kind, expected) in expectations {
        let facet = model.facet_of(order, kind).unwrap();
        assert_eq!(alias_names(&model, facet), vec![expected.to_string()]);
    }
}

#[test]
fn test_derived_aliases_are_owned_by_their_facets() {
    let (mut model, _, order) = shipping_model();
    let alias = model.add_alias(order, "PO").unwrap();
    assert_eq!(model.entity(alias).unwrap().owner(), Some(order));

    let summary = model.facet_of(order, FacetKind::Summary).unwrap();
    let derived = model.aliases(summary).unwrap()[0];
    assert_eq!(model.entity(derived).unwrap().owner(), Some(summary));
}

#[test]
fn test_rename_updates_derived_without_duplicate_added_events() {
    let (mut model, _, order) = shipping_model();
    let recorder = Recorder::install(&mut model);
    let alias = model.add_alias(order, "A1").unwrap();

    // One authored alias, five derived (three facets + two list views).
    assert_eq!(recorder.count_of(EventKind::AliasAdded), 6);

    model.rename(alias, "A2").unwrap();
    let summary = model.facet_of(order, FacetKind::Summary).unwrap();
    assert_eq!(alias_names(&model, summary), vec!["A2_Summary".to_string()]);
    let summary_list = model.facet_of(order, FacetKind::SummaryList).unwrap();
    assert_eq!(
        alias_names(&model, summary_list),
        vec!["A2_Summary_List".to_string()]
    );

    // The rename cascades as renames: no new AliasAdded anywhere.
    assert_eq!(recorder.count_of(EventKind::AliasAdded), 6);
    assert_eq!(recorder.count_of(EventKind::NameModified), 6);
}

#[test]
fn test_remove_alias_clears_the_whole_chain() {
    let (mut model, _, order) = shipping_model();
    let alias = model.add_alias(order, "A1").unwrap();
    let recorder = Recorder::install(&mut model);

    model.remove_alias(alias).unwrap();
    assert_eq!(recorder.count_of(EventKind::AliasRemoved), 6);
    for kind in [
        FacetKind::Id,
        FacetKind::Summary,
        FacetKind::Detail,
        FacetKind::SummaryList,
        FacetKind::DetailList,
    ] {
        let facet = model.facet_of(order, kind).unwrap();
        assert!(model.aliases(facet).unwrap().is_empty());
    }
    assert!(!model.contains(alias));
}

#[test]
fn test_derived_aliases_reject_direct_edits() {
    let (mut model, _, order) = shipping_model();
    model.add_alias(order, "A1").unwrap();
    let summary = model.facet_of(order, FacetKind::Summary).unwrap();
    let derived = model.aliases(summary).unwrap()[0];

    assert!(model.rename(derived, "Rogue").is_err());
    assert!(model.remove_alias(derived).is_err());
    assert_eq!(alias_names(&model, summary), vec!["A1_Summary".to_string()]);
}

// =============================================================================
// Order congruence
// =============================================================================

#[test]
fn test_reorder_mirrors_into_derived_lists() {
    let (mut model, _, order) = shipping_model();
    model.add_alias(order, "B").unwrap();
    let a = model.add_alias(order, "A").unwrap();
    let summary = model.facet_of(order, FacetKind::Summary).unwrap();
    let summary_list = model.facet_of(order, FacetKind::SummaryList).unwrap();
    assert_eq!(alias_names(&model, summary), vec!["B_Summary", "A_Summary"]);

    let bo_aliases = ListRef::new(order, ListRole::Aliases);
    model.move_child_up(bo_aliases, a).unwrap();
    assert_eq!(alias_names(&model, summary), vec!["A_Summary", "B_Summary"]);
    assert_eq!(
        alias_names(&model, summary_list),
        vec!["A_Summary_List", "B_Summary_List"]
    );

    model.move_child_down(bo_aliases, a).unwrap();
    assert_eq!(alias_names(&model, summary), vec!["B_Summary", "A_Summary"]);
}

#[test]
fn test_sort_mirrors_into_derived_lists() {
    let (mut model, _, order) = shipping_model();
    for name in ["Gamma", "Alpha", "Beta"] {
        model.add_alias(order, name).unwrap();
    }
    let bo_aliases = ListRef::new(order, ListRole::Aliases);
    model.sort_children_by_name(bo_aliases).unwrap();

    assert_eq!(alias_names(&model, order), vec!["Alpha", "Beta", "Gamma"]);
    let detail = model.facet_of(order, FacetKind::Detail).unwrap();
    assert_eq!(
        alias_names(&model, detail),
        vec!["Alpha_Detail", "Beta_Detail", "Gamma_Detail"]
    );
    let detail_list = model.facet_of(order, FacetKind::DetailList).unwrap();
    assert_eq!(
        alias_names(&model, detail_list),
        vec!["Alpha_Detail_List", "Beta_Detail_List", "Gamma_Detail_List"]
    );
}

// =============================================================================
// Contextual facets
// =============================================================================

#[test]
fn test_attached_contextual_facet_mirrors_and_relabels() {
    let (mut model, lib, order) = shipping_model();
    model.add_alias(order, "PO").unwrap();

    let audit = model
        .create_contextual_facet(FacetKind::Custom, Some("Audit"))
        .unwrap();
    model.add_member(lib, audit).unwrap();
    model.attach_contextual_facet(order, audit).unwrap();

    // Attachment backfills from the existing alias list.
    assert_eq!(alias_names(&model, audit), vec!["PO_Audit".to_string()]);

    // Relabeling the facet re-derives the suffix of every shadowed alias.
    model.rename(audit, "History").unwrap();
    assert_eq!(alias_names(&model, audit), vec!["PO_History".to_string()]);

    // New aliases keep flowing to the attached facet.
    model.add_alias(order, "Req").unwrap();
    assert_eq!(
        alias_names(&model, audit),
        vec!["PO_History".to_string(), "Req_History".to_string()]
    );
}

#[test]
fn test_detach_stops_mirroring_but_keeps_derived() {
    let (mut model, lib, order) = shipping_model();
    let query = model
        .create_contextual_facet(FacetKind::Query, Some("Search"))
        .unwrap();
    model.add_member(lib, query).unwrap();
    model.attach_contextual_facet(order, query).unwrap();
    model.add_alias(order, "PO").unwrap();
    assert_eq!(alias_names(&model, query), vec!["PO_Search".to_string()]);

    model.detach_contextual_facet(query).unwrap();
    model.add_alias(order, "Req").unwrap();
    // The derived alias from before the detach stays put.
    assert_eq!(alias_names(&model, query), vec!["PO_Search".to_string()]);
}
