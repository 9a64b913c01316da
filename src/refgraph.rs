//! Cross-reference graph over type assignments
//!
//! A [`ReferenceGraph`] is a snapshot: build it from a model, query it, and
//! rebuild after further edits. Nodes are entity keys, edges are type
//! references (attribute types, element types, simple type bases).

use std::collections::{HashMap, HashSet, VecDeque};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

pub use petgraph::Direction;

use crate::arena::EntityKey;
use crate::entity::EntityData;
use crate::model::Model;

/// Why a reference edge exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    AttributeType,
    ElementType,
    SimpleTypeBase,
}

/// One entity in a closure, with its hop distance from the start
#[derive(Debug, Clone, Serialize)]
pub struct ClosureEntry {
    pub key: EntityKey,
    pub depth: usize,
}

/// One fuzzy-search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub key: EntityKey,
    pub name: String,
    pub identity: String,
    pub score: i64,
}

/// Directed graph of type references between model entities
pub struct ReferenceGraph {
    graph: DiGraph<EntityKey, RefKind>,
    nodes: HashMap<EntityKey, NodeIndex>,
}

impl ReferenceGraph {
    /// Snapshot the reference structure of every registered library.
    ///
    /// Business objects contribute the references of their five fixed
    /// facets; contextual facets contribute their own, as members of
    /// whichever library they live in.
    pub fn build(model: &Model) -> Self {
        let mut rg = Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        };
        for library in model.libraries() {
            let Ok(members) = model.members(*library) else {
                continue;
            };
            for member in members.to_vec() {
                rg.add_member_edges(model, member);
            }
        }
        rg
    }

    fn node(&mut self, key: EntityKey) -> NodeIndex {
        match self.nodes.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.graph.add_node(key);
                self.nodes.insert(key, idx);
                idx
            }
        }
    }

    fn add_edge(&mut self, from: EntityKey, to: EntityKey, kind: RefKind) {
        let a = self.node(from);
        let b = self.node(to);
        self.graph.add_edge(a, b, kind);
    }

    fn add_member_edges(&mut self, model: &Model, member: EntityKey) {
        match model.entity(member) {
            Ok(EntityData::SimpleType(s)) => {
                if let Some(base) = s.base_type() {
                    self.add_edge(member, base, RefKind::SimpleTypeBase);
                }
            }
            Ok(EntityData::BusinessObject(b)) => {
                let facets = [
                    b.id_facet(),
                    b.summary_facet(),
                    b.detail_facet(),
                    b.summary_list_facet(),
                    b.detail_list_facet(),
                ];
                for facet in facets {
                    self.add_facet_edges(model, member, facet);
                }
            }
            Ok(EntityData::Facet(f)) if f.kind().is_contextual() => {
                self.add_facet_edges(model, member, member);
            }
            _ => {}
        }
    }

    fn add_facet_edges(&mut self, model: &Model, source: EntityKey, facet: EntityKey) {
        if let Ok(attributes) = model.attributes(facet) {
            for key in attributes.to_vec() {
                if let Some(target) = model.attribute(key).ok().and_then(|a| a.type_ref()) {
                    self.add_edge(source, target, RefKind::AttributeType);
                }
            }
        }
        if let Ok(elements) = model.elements(facet) {
            for key in elements.to_vec() {
                if let Some(target) = model.element(key).ok().and_then(|e| e.type_ref()) {
                    self.add_edge(source, target, RefKind::ElementType);
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Entities this entity references directly, deduplicated.
    pub fn refs_out(&self, key: EntityKey) -> Vec<EntityKey> {
        self.neighbors(key, Direction::Outgoing)
    }

    /// Entities that reference this entity directly, deduplicated.
    pub fn refs_in(&self, key: EntityKey) -> Vec<EntityKey> {
        self.neighbors(key, Direction::Incoming)
    }

    fn neighbors(&self, key: EntityKey, direction: Direction) -> Vec<EntityKey> {
        let Some(&idx) = self.nodes.get(&key) else {
            return Vec::new();
        };
        let mut out: Vec<EntityKey> = Vec::new();
        for neighbor in self.graph.neighbors_directed(idx, direction) {
            let k = self.graph[neighbor];
            if !out.contains(&k) {
                out.push(k);
            }
        }
        out
    }

    /// Breadth-first closure from an entity, excluding the entity itself.
    /// `max_depth: None` walks to a fixpoint.
    pub fn closure(
        &self,
        key: EntityKey,
        direction: Direction,
        max_depth: Option<usize>,
    ) -> Vec<ClosureEntry> {
        let Some(&start) = self.nodes.get(&key) else {
            return Vec::new();
        };
        let mut seen: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::from([(start, 0)]);
        let mut out = Vec::new();
        while let Some((node, depth)) = queue.pop_front() {
            if node != start {
                out.push(ClosureEntry {
                    key: self.graph[node],
                    depth,
                });
            }
            if let Some(max) = max_depth {
                if depth >= max {
                    continue;
                }
            }
            for next in self.graph.neighbors_directed(node, direction) {
                if seen.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        out
    }

    /// How many references cross into a library from outside it. Counts
    /// edges, so two attributes referencing the same member count twice.
    pub fn count_references_to_library(&self, model: &Model, library: EntityKey) -> usize {
        self.graph
            .edge_indices()
            .filter(|e| {
                let Some((a, b)) = self.graph.edge_endpoints(*e) else {
                    return false;
                };
                let source = self.graph[a];
                let target = self.graph[b];
                model.owning_library(target) == Some(library)
                    && model.owning_library(source) != Some(library)
            })
            .count()
    }

    /// Fuzzy-match library members by name, best scores first.
    pub fn search(model: &Model, query: &str, limit: usize) -> Vec<SearchResult> {
        let matcher = SkimMatcherV2::default();
        let mut results: Vec<SearchResult> = Vec::new();
        for library in model.libraries() {
            let Ok(members) = model.members(*library) else {
                continue;
            };
            for member in members {
                let Some(name) = model.entity(*member).ok().and_then(EntityData::name) else {
                    continue;
                };
                if let Some(score) = matcher.fuzzy_match(name, query) {
                    results.push(SearchResult {
                        key: *member,
                        name: name.to_string(),
                        identity: model.identity(*member),
                        score,
                    });
                }
            }
        }
        results.sort_by(|a, b| b.score.cmp(&a.score));
        results.truncate(limit);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> (Model, EntityKey, EntityKey, EntityKey, EntityKey) {
        let mut model = Model::new();
        let types_lib = model.create_library("CommonTypes", "http://example.org/common/v1");
        model.add_library(types_lib).unwrap();
        let code = model.create_simple_type("TrackingCode");
        model.add_member(types_lib, code).unwrap();

        let lib = model.create_library("Shipping", "http://example.org/shipping/v1");
        model.add_library(lib).unwrap();
        let order = model.create_business_object("Order").unwrap();
        model.add_member(lib, order).unwrap();
        let summary = model.facet_of(order, crate::entity::FacetKind::Summary).unwrap();
        let attr = model.add_attribute(summary, "code", true).unwrap();
        model.assign_attribute_type(attr, Some(code)).unwrap();

        (model, types_lib, lib, order, code)
    }

    #[test]
    fn test_refs_out_and_in() {
        let (model, _, _, order, code) = sample_model();
        let graph = ReferenceGraph::build(&model);
        assert_eq!(graph.refs_out(order), vec![code]);
        assert_eq!(graph.refs_in(code), vec![order]);
        assert!(graph.refs_out(code).is_empty());
    }

    #[test]
    fn test_closure_depth() {
        let (mut model, types_lib, _, order, code) = sample_model();
        // base chain: DeepCode -> TrackingCode, Order -> TrackingCode
        let deep = model.create_simple_type("DeepCode");
        model.add_member(types_lib, deep).unwrap();
        model.assign_simple_type_base(code, Some(deep)).unwrap();

        let graph = ReferenceGraph::build(&model);
        let closure = graph.closure(order, Direction::Outgoing, None);
        let depths: Vec<(EntityKey, usize)> = closure.iter().map(|c| (c.key, c.depth)).collect();
        assert_eq!(depths, vec![(code, 1), (deep, 2)]);

        let bounded = graph.closure(order, Direction::Outgoing, Some(1));
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].key, code);
    }

    #[test]
    fn test_cross_library_reference_count() {
        let (model, types_lib, lib, _, _) = sample_model();
        let graph = ReferenceGraph::build(&model);
        // Order (in Shipping) references TrackingCode (in CommonTypes).
        assert_eq!(graph.count_references_to_library(&model, types_lib), 1);
        assert_eq!(graph.count_references_to_library(&model, lib), 0);
    }

    #[test]
    fn test_search_ranks_by_score() {
        let (model, _, _, _, _) = sample_model();
        let hits = ReferenceGraph::search(&model, "track", 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].name, "TrackingCode");
        assert!(hits[0].identity.contains("CommonTypes"));

        assert!(ReferenceGraph::search(&model, "zzzz", 10).is_empty());
    }
}
