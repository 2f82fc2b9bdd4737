//! Animation step inference.
//!
//! A view author declares reveal steps as element groups only; which
//! relationships fade in with each step is derived here. A relationship
//! attaches to the first step at which both its endpoints are revealed and
//! at least one of them is newly revealed, and it attaches at most once.

use std::collections::BTreeSet;

use crate::id::Id;
use crate::model::Model;
use crate::view::View;

/// Rewrites the relationship list of every animation step of the view.
/// Step elements not actually present in the view are dropped first.
pub fn infer_step_relationships(view: &mut View, model: &Model) {
    let View {
        element_views,
        relationship_views,
        animation_steps,
        ..
    } = view;

    // View insertion order, itself derived from registration-order scans,
    // so the step contents are stable across rebuilds of the same input.
    let rel_ids: Vec<Id> = relationship_views.iter().map(|rv| rv.id).collect();

    let mut revealed: BTreeSet<Id> = BTreeSet::new();
    let mut attached: BTreeSet<Id> = BTreeSet::new();
    for step in animation_steps.iter_mut() {
        step.elements
            .retain(|id| element_views.iter().any(|ev| ev.id == *id));
        let newly: BTreeSet<Id> = step.elements.iter().copied().collect();
        revealed.extend(newly.iter().copied());

        step.relationships.clear();
        for rel in &rel_ids {
            if attached.contains(rel) {
                continue;
            }
            let Some(r) = model.relationship(*rel) else {
                continue;
            };
            if revealed.contains(&r.source)
                && revealed.contains(&r.destination)
                && (newly.contains(&r.source) || newly.contains(&r.destination))
            {
                step.relationships.push(*rel);
                attached.insert(*rel);
            }
        }
    }
}
