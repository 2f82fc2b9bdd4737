//! Views: named, filtered subgraphs of the model.
//!
//! A view records which elements and relationships of one model build a
//! diagram shows, plus the visual state (coordinates, routing, vertices)
//! the renderer and layout reconciliation care about. The view key is
//! user-assigned and stable across rebuilds; everything else is rebuilt
//! from scratch each pass.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::id::Id;

/// What a view is about, per kind of diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewScope {
    /// Everything at the people/system level.
    Landscape,
    /// One software system in its environment.
    Context { system: Id },
    /// The containers of one software system.
    Container { system: Id },
    /// The components of one container.
    Component { container: Id },
    /// Deployment nodes, restricted to one environment unless global.
    Deployment { environment: Option<String> },
}

/// Line routing for a rendered relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Routing {
    #[default]
    Undefined,
    Direct,
    Curved,
    Orthogonal,
}

/// A bend in a rendered relationship line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

/// An element's membership in a view, with its rendered position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementView {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl ElementView {
    pub fn new(id: Id) -> Self {
        ElementView { id, x: None, y: None }
    }
}

/// A relationship's membership in a view, with its rendered line state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipView {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vertices: Vec<Vertex>,
    #[serde(default, skip_serializing_if = "is_undefined")]
    pub routing: Routing,
    /// Annotation position along the line, 0 (start) to 100 (end).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
}

fn is_undefined(r: &Routing) -> bool {
    *r == Routing::Undefined
}

impl RelationshipView {
    pub fn new(id: Id) -> Self {
        RelationshipView {
            id,
            vertices: Vec::new(),
            routing: Routing::Undefined,
            position: None,
        }
    }
}

/// One step of a reveal animation: the elements it introduces and the
/// relationships inferred to appear with them.
#[derive(Debug, Clone, Default)]
pub struct AnimationStep {
    pub elements: Vec<Id>,
    pub relationships: Vec<Id>,
}

impl AnimationStep {
    pub fn new(elements: Vec<Id>) -> Self {
        AnimationStep {
            elements,
            relationships: Vec::new(),
        }
    }
}

/// A named, filtered subgraph of the model.
#[derive(Debug, Clone)]
pub struct View {
    /// User-assigned key, stable across regenerations.
    pub key: String,
    pub title: String,
    pub description: String,
    pub scope: ViewScope,
    /// Expand influencers during finalization. Container scope only.
    pub influencers: bool,
    pub element_views: Vec<ElementView>,
    pub relationship_views: Vec<RelationshipView>,
    pub animation_steps: Vec<AnimationStep>,
}

impl View {
    pub fn new(key: impl Into<String>, scope: ViewScope) -> Self {
        View {
            key: key.into(),
            title: String::new(),
            description: String::new(),
            scope,
            influencers: false,
            element_views: Vec::new(),
            relationship_views: Vec::new(),
            animation_steps: Vec::new(),
        }
    }

    pub fn element_view(&self, id: Id) -> Option<&ElementView> {
        self.element_views.iter().find(|e| e.id == id)
    }

    pub fn element_view_mut(&mut self, id: Id) -> Option<&mut ElementView> {
        self.element_views.iter_mut().find(|e| e.id == id)
    }

    pub fn relationship_view(&self, id: Id) -> Option<&RelationshipView> {
        self.relationship_views.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.element_view(id).is_some()
    }

    /// Appends a reveal step. Relationship inference runs at finalization.
    pub fn add_animation_step(&mut self, elements: Vec<Id>) {
        self.animation_steps.push(AnimationStep::new(elements));
    }
}

/// The views of a workspace, addressed by key.
#[derive(Debug, Clone, Default)]
pub struct Views {
    views: IndexMap<String, View>,
}

impl Views {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, view: View) -> Result<(), Error> {
        if self.views.contains_key(&view.key) {
            return Err(Error::DuplicateViewKey(view.key));
        }
        self.views.insert(view.key.clone(), view);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&View> {
        self.views.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut View> {
        self.views.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut View> {
        self.views.values_mut()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
