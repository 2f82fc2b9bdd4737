//! Pure traversal queries over the registry.
//!
//! Relationships are walked in both directions: "related" and "reachable"
//! ignore edge orientation. Queries scan relationships in registration
//! order, the one order that is stable across rebuilds of the same input,
//! since ids are random per build.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Dfs;

use crate::id::Id;
use crate::model::{Element, ElementKind, Model};

/// Distinct elements of `kind` directly linked to `elem` as either endpoint,
/// in order of first encounter.
pub fn related_elements<'a>(model: &'a Model, elem: Id, kind: ElementKind) -> Vec<&'a Element> {
    let mut found: Vec<&Element> = Vec::new();
    for r in model.relationships() {
        let other = if r.source == elem {
            r.destination
        } else if r.destination == elem {
            r.source
        } else {
            continue;
        };
        let Some(e) = model.element(other) else {
            continue;
        };
        if e.kind == kind && !found.iter().any(|f| f.id == e.id) {
            found.push(e);
        }
    }
    found
}

/// Ids of all elements reachable from `root` through relationships in either
/// direction, `root` included. Empty when `root` is not in the model.
pub fn reachable(model: &Model, root: Id) -> BTreeSet<Id> {
    if model.element(root).is_none() {
        return BTreeSet::new();
    }

    // Undirected projection of the registry. The visited set bounds the
    // walk to the number of elements.
    let mut graph: UnGraph<Id, ()> = UnGraph::default();
    let mut indices: HashMap<Id, NodeIndex> = HashMap::new();
    for e in model.elements() {
        indices.insert(e.id, graph.add_node(e.id));
    }
    for r in model.relationships() {
        if let (Some(&s), Some(&d)) = (indices.get(&r.source), indices.get(&r.destination)) {
            graph.add_edge(s, d, ());
        }
    }

    let mut reached = BTreeSet::new();
    let mut dfs = Dfs::new(&graph, indices[&root]);
    while let Some(idx) = dfs.next(&graph) {
        reached.insert(graph[idx]);
    }
    reached
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_model() -> (Model, Id, Id, Id, Id) {
        let mut m = Model::new();
        let a = m.add_software_system("A", "");
        let b = m.add_software_system("B", "");
        let c = m.add_software_system("C", "");
        let d = m.add_software_system("D", "");
        m.add_relationship(a, b, "uses").unwrap();
        m.add_relationship(b, c, "uses").unwrap();
        (m, a, b, c, d)
    }

    #[test]
    fn reachable_follows_edges_both_ways() {
        let (m, a, b, c, d) = chain_model();
        let from_a = reachable(&m, a);
        assert_eq!(from_a, BTreeSet::from([a, b, c]));
        // C only has an incoming edge; traversal is undirected.
        assert_eq!(reachable(&m, c), BTreeSet::from([a, b, c]));
        assert_eq!(reachable(&m, d), BTreeSet::from([d]));
    }

    #[test]
    fn related_filters_by_kind_and_dedups() {
        let mut m = Model::new();
        let sys = m.add_software_system("Sys", "");
        let p = m.add_person("User", "");
        let other = m.add_software_system("Other", "");
        // Two relationships to the same person, both directions.
        m.add_relationship(p, sys, "uses").unwrap();
        m.add_relationship(sys, p, "notifies").unwrap();
        m.add_relationship(sys, other, "reads").unwrap();

        let people = related_elements(&m, sys, ElementKind::Person);
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].id, p);

        let systems = related_elements(&m, sys, ElementKind::SoftwareSystem);
        assert_eq!(systems.len(), 1);
        assert_eq!(systems[0].id, other);
    }
}
