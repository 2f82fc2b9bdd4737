//! View population engine.
//!
//! Implements the inclusion and exclusion operations a view definition can
//! request: the broad `add_all`, the narrower `add_default`, neighbor and
//! influencer expansion, and the pruning family. Every element addition
//! triggers relationship auto-completion so a view never holds a dangling
//! relationship, and `finalize` runs the closing sweeps once a view stops
//! changing.
//!
//! All scans follow the registry's registration order. Ids are random per
//! build, so registration order is the one order that is stable when the
//! same input is rebuilt; repeated builds produce identically ordered
//! views.

use std::collections::BTreeSet;

use log::debug;

use crate::animation;
use crate::id::Id;
use crate::model::{ElementKind, Model};
use crate::reachability::{reachable, related_elements};
use crate::view::{ElementView, RelationshipView, View, ViewScope};

impl View {
    /// Adds the element to the view if present in the model and not already
    /// included, then completes relationships against the elements already
    /// there.
    pub fn add_element(&mut self, model: &Model, id: Id) {
        if self.contains(id) || model.element(id).is_none() {
            return;
        }
        self.element_views.push(ElementView::new(id));
        self.complete_relationships(model, id);
    }

    pub fn add_elements<I: IntoIterator<Item = Id>>(&mut self, model: &Model, ids: I) {
        for id in ids {
            self.add_element(model, id);
        }
    }

    /// Adds the full relevant element sets for the view's scope.
    pub fn add_all(&mut self, model: &Model) {
        match self.scope.clone() {
            ViewScope::Landscape | ViewScope::Context { .. } => {
                self.add_elements(model, model.people().iter().map(|e| e.id).collect::<Vec<_>>());
                self.add_elements(model, model.systems().iter().map(|e| e.id).collect::<Vec<_>>());
            }
            ViewScope::Container { system } => {
                self.add_elements(model, model.people().iter().map(|e| e.id).collect::<Vec<_>>());
                // The target system itself never appears in its own
                // container view.
                self.add_elements(
                    model,
                    model.systems().iter().map(|e| e.id).filter(|id| *id != system).collect::<Vec<_>>(),
                );
                self.add_elements(
                    model,
                    model.containers_of(system).iter().map(|e| e.id).collect::<Vec<_>>(),
                );
            }
            ViewScope::Component { container } => {
                self.add_elements(model, model.people().iter().map(|e| e.id).collect::<Vec<_>>());
                self.add_elements(model, model.systems().iter().map(|e| e.id).collect::<Vec<_>>());
                if let Some(system) = model.element(container).and_then(|c| c.parent) {
                    self.add_elements(
                        model,
                        model.containers_of(system).iter().map(|e| e.id).collect::<Vec<_>>(),
                    );
                }
                self.add_elements(
                    model,
                    model.components_of(container).iter().map(|e| e.id).collect::<Vec<_>>(),
                );
            }
            ViewScope::Deployment { ref environment } => {
                for node in model.deployment_nodes() {
                    if environment_matches(node.environment.as_deref(), environment.as_deref()) {
                        self.add_deployment_subtree(model, node.id, environment.as_deref());
                    }
                }
            }
        }
        debug!(view_key = self.key.as_str(), elements = self.element_views.len(); "added all elements");
    }

    /// Adds the "sensible starting point" element set for the view's scope.
    pub fn add_default(&mut self, model: &Model) {
        match self.scope.clone() {
            ViewScope::Landscape | ViewScope::Deployment { .. } => self.add_all(model),
            ViewScope::Context { system } => {
                self.add_element(model, system);
                self.add_neighbors(model, system);
            }
            ViewScope::Container { system } => {
                let containers: Vec<Id> = model.containers_of(system).iter().map(|e| e.id).collect();
                self.add_elements(model, containers.iter().copied());
                for c in containers {
                    self.add_related(model, c, ElementKind::SoftwareSystem);
                    self.add_related(model, c, ElementKind::Person);
                }
            }
            ViewScope::Component { container } => {
                let components: Vec<Id> = model.components_of(container).iter().map(|e| e.id).collect();
                self.add_elements(model, components.iter().copied());
                for c in components {
                    self.add_related(model, c, ElementKind::Container);
                    self.add_related(model, c, ElementKind::SoftwareSystem);
                    self.add_related(model, c, ElementKind::Person);
                }
            }
        }
    }

    /// Adds the elements of the kinds applicable to the view's scope that
    /// have any direct relationship with `elem`.
    pub fn add_neighbors(&mut self, model: &Model, elem: Id) {
        match self.scope {
            ViewScope::Landscape | ViewScope::Context { .. } => {
                self.add_related(model, elem, ElementKind::Person);
                self.add_related(model, elem, ElementKind::SoftwareSystem);
            }
            ViewScope::Container { .. } => {
                self.add_related(model, elem, ElementKind::Person);
                self.add_related(model, elem, ElementKind::SoftwareSystem);
                self.add_related(model, elem, ElementKind::Container);
            }
            ViewScope::Component { .. } => {
                self.add_related(model, elem, ElementKind::Person);
                self.add_related(model, elem, ElementKind::SoftwareSystem);
                self.add_related(model, elem, ElementKind::Container);
                self.add_related(model, elem, ElementKind::Component);
            }
            ViewScope::Deployment { .. } => {
                self.add_related(model, elem, ElementKind::InfrastructureNode);
                self.add_related(model, elem, ElementKind::ContainerInstance);
            }
        }
    }

    fn add_related(&mut self, model: &Model, elem: Id, kind: ElementKind) {
        let ids: Vec<Id> = related_elements(model, elem, kind).iter().map(|e| e.id).collect();
        self.add_elements(model, ids);
    }

    fn add_deployment_subtree(&mut self, model: &Model, node: Id, environment: Option<&str>) {
        self.add_element(model, node);
        for inf in model.infrastructure_of(node) {
            if environment_matches(inf.environment.as_deref(), environment) {
                self.add_element(model, inf.id);
            }
        }
        for ci in model.instances_of(node) {
            if environment_matches(ci.environment.as_deref(), environment) {
                self.add_element(model, ci.id);
            }
        }
        for child in model.child_nodes(node) {
            if environment_matches(child.environment.as_deref(), environment) {
                self.add_deployment_subtree(model, child.id, environment);
            }
        }
    }

    /// Expands influencers of a container view: people and systems with a
    /// relationship touching any element of the target system's scope. After
    /// expansion, relationship views with neither endpoint inside the scope
    /// are pruned; the add pass runs before the filter pass, so
    /// influencer-to-influencer edges never survive.
    pub fn add_influencers(&mut self, model: &Model) {
        let ViewScope::Container { system } = self.scope else {
            return;
        };
        let scope = system_scope(model, system);

        let candidates: Vec<Id> = model
            .elements()
            .filter(|e| {
                matches!(e.kind, ElementKind::Person | ElementKind::SoftwareSystem)
                    && !scope.contains(&e.id)
            })
            .map(|e| e.id)
            .collect();
        for cand in candidates {
            let touches_scope = model.relationships().any(|r| {
                (r.source == cand && scope.contains(&r.destination))
                    || (r.destination == cand && scope.contains(&r.source))
            });
            if touches_scope {
                self.add_element(model, cand);
            }
        }

        self.relationship_views.retain(|rv| {
            model
                .relationship(rv.id)
                .is_some_and(|r| scope.contains(&r.source) || scope.contains(&r.destination))
        });
    }

    /// Records the relationship in the view. Rejected when either endpoint
    /// is missing, when already recorded, or when the endpoints do not
    /// share a top-level deployment subtree (automatic inclusion stays
    /// within one deployment island, and static elements never link to
    /// deployment elements).
    pub fn add_relationship_view(&mut self, model: &Model, rel: Id) -> bool {
        if self.relationship_view(rel).is_some() {
            return false;
        }
        let Some(r) = model.relationship(rel) else {
            return false;
        };
        if !self.contains(r.source) || !self.contains(r.destination) {
            return false;
        }
        // `None` for static elements, so static pairs always agree and any
        // static-to-deployment mix disagrees.
        if model.top_level_node(r.source) != model.top_level_node(r.destination) {
            return false;
        }
        self.relationship_views.push(RelationshipView::new(rel));
        true
    }

    /// Adds every registry relationship between `elem` and an element
    /// already in the view.
    fn complete_relationships(&mut self, model: &Model, elem: Id) {
        let candidates: Vec<Id> = model
            .relationships()
            .filter(|r| {
                (r.source == elem && self.contains(r.destination))
                    || (r.destination == elem && self.contains(r.source))
            })
            .map(|r| r.id)
            .collect();
        for rel in candidates {
            self.add_relationship_view(model, rel);
        }
    }

    /// Removes the element view and every relationship view touching it.
    pub fn remove(&mut self, model: &Model, id: Id) {
        self.element_views.retain(|ev| ev.id != id);
        self.relationship_views.retain(|rv| {
            model
                .relationship(rv.id)
                .is_some_and(|r| r.source != id && r.destination != id)
        });
    }

    /// Removes all elements carrying the tag, cascading to relationships.
    pub fn remove_tagged(&mut self, model: &Model, tag: &str) {
        let doomed: Vec<Id> = self
            .element_views
            .iter()
            .filter(|ev| model.element(ev.id).is_some_and(|e| e.has_tag(tag)))
            .map(|ev| ev.id)
            .collect();
        for id in doomed {
            self.remove(model, id);
        }
    }

    /// Removes view elements outside the whole-model transitive closure
    /// from `root`. No-op when the root itself is not in the view.
    pub fn remove_unreachable(&mut self, model: &Model, root: Id) {
        if !self.contains(root) {
            return;
        }
        let kept = reachable(model, root);
        let doomed: Vec<Id> = self
            .element_views
            .iter()
            .map(|ev| ev.id)
            .filter(|id| !kept.contains(id))
            .collect();
        for id in doomed {
            self.remove(model, id);
        }
    }

    /// Removes elements with no relationship view in this view. A local
    /// check, distinct from whole-model reachability.
    pub fn remove_unrelated(&mut self, model: &Model) {
        let doomed: Vec<Id> = self
            .element_views
            .iter()
            .map(|ev| ev.id)
            .filter(|id| {
                !self.relationship_views.iter().any(|rv| {
                    model
                        .relationship(rv.id)
                        .is_some_and(|r| r.source == *id || r.destination == *id)
                })
            })
            .collect();
        for id in doomed {
            self.remove(model, id);
        }
    }

    /// Closing pass once the view definition has been fully applied:
    /// influencer expansion where requested, a final relationship
    /// completion sweep, then animation step inference.
    pub fn finalize(&mut self, model: &Model) {
        if self.influencers {
            self.add_influencers(model);
        }
        let rels: Vec<Id> = model.relationships().map(|r| r.id).collect();
        for rel in rels {
            self.add_relationship_view(model, rel);
        }
        animation::infer_step_relationships(self, model);
        debug!(
            view_key = self.key.as_str(),
            elements = self.element_views.len(),
            relationships = self.relationship_views.len();
            "view finalized"
        );
    }
}

/// The container-view scope of a system: the system element, its containers
/// and their components.
fn system_scope(model: &Model, system: Id) -> BTreeSet<Id> {
    let mut scope = BTreeSet::from([system]);
    for c in model.containers_of(system) {
        scope.insert(c.id);
        for cmp in model.components_of(c.id) {
            scope.insert(cmp.id);
        }
    }
    scope
}

fn environment_matches(element_env: Option<&str>, view_env: Option<&str>) -> bool {
    match (element_env, view_env) {
        (Some(e), Some(v)) => e == v,
        // Either side without a restriction matches everything.
        _ => true,
    }
}
