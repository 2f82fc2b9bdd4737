//! Model graph and registry.
//!
//! The [`Model`] owns every element and relationship of one build and maps
//! their random [`Id`]s back to the objects. It is built once per pass (by
//! the external DSL engine, or programmatically through the builder methods
//! here), then treated as read-only while views are populated.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use log::debug;

use crate::error::{Error, ValidationError};
use crate::id::Id;

/// The kind of a model element.
///
/// Closed set: view population and layout reconciliation match on this
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Person,
    SoftwareSystem,
    Container,
    Component,
    DeploymentNode,
    InfrastructureNode,
    ContainerInstance,
}

impl ElementKind {
    /// Lowercase label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Person => "person",
            ElementKind::SoftwareSystem => "software system",
            ElementKind::Container => "container",
            ElementKind::Component => "component",
            ElementKind::DeploymentNode => "deployment node",
            ElementKind::InfrastructureNode => "infrastructure node",
            ElementKind::ContainerInstance => "container instance",
        }
    }

    /// True for the three kinds that live under a deployment node tree.
    pub fn is_deployment(self) -> bool {
        matches!(
            self,
            ElementKind::DeploymentNode
                | ElementKind::InfrastructureNode
                | ElementKind::ContainerInstance
        )
    }
}

/// A node in the architecture graph.
#[derive(Debug, Clone)]
pub struct Element {
    pub id: Id,
    pub name: String,
    pub kind: ElementKind,
    pub description: String,
    /// Technology used by the element if any. Not applicable to people.
    pub technology: String,
    /// Tags attached to the element. Order is not significant.
    pub tags: Vec<String>,
    /// Arbitrary name-value properties, shown in diagram tooltips.
    pub properties: BTreeMap<String, String>,
    /// Owning element: system for containers, container for components,
    /// parent node for deployment children. `None` for top-level elements.
    pub parent: Option<Id>,
    /// Deployment environment, e.g. "Production". Deployment kinds only; a
    /// deployment node without an environment matches every environment.
    pub environment: Option<String>,
    /// Container a container instance instantiates.
    pub container: Option<Id>,
    /// Ordinal of a container instance within its deployment node.
    pub instance: Option<u32>,
}

impl Element {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A directed edge between two elements.
///
/// A (source, destination) pair does not identify a relationship: several
/// relationships may connect the same pair, told apart by description.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub id: Id,
    pub source: Id,
    pub destination: Id,
    pub description: String,
    pub technology: String,
    pub tags: Vec<String>,
}

/// Splits a comma-joined tag string into distinct trimmed tags.
pub fn parse_tags(tags: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.split(',') {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Element and relationship registry for one model build.
///
/// Iteration over the underlying maps follows registration order. Ids are
/// random per build, so registration order is the one order that is stable
/// when the same input is rebuilt; every scan that feeds view contents
/// relies on it.
#[derive(Debug, Default)]
pub struct Model {
    elements: IndexMap<Id, Element>,
    relationships: IndexMap<Id, Relationship>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&self) -> Id {
        loop {
            let id = Id::random();
            if !self.elements.contains_key(&id) && !self.relationships.contains_key(&id) {
                return id;
            }
        }
    }

    fn insert_element(&mut self, mut element: Element) -> Id {
        let id = self.fresh_id();
        element.id = id;
        self.elements.insert(id, element);
        id
    }

    fn blank(name: impl Into<String>, kind: ElementKind) -> Element {
        Element {
            id: Id::from_raw(0), // assigned on insert
            name: name.into(),
            kind,
            description: String::new(),
            technology: String::new(),
            tags: Vec::new(),
            properties: BTreeMap::new(),
            parent: None,
            environment: None,
            container: None,
            instance: None,
        }
    }

    fn expect_kind(&self, id: Id, expected: ElementKind) -> Result<&Element, Error> {
        let e = self.elements.get(&id).ok_or(Error::UnknownElement(id))?;
        if e.kind != expected {
            return Err(Error::KindMismatch {
                id,
                expected: expected.label(),
                actual: e.kind.label(),
            });
        }
        Ok(e)
    }

    // -- builder ----------------------------------------------------------

    pub fn add_person(&mut self, name: impl Into<String>, description: impl Into<String>) -> Id {
        let mut e = Self::blank(name, ElementKind::Person);
        e.description = description.into();
        self.insert_element(e)
    }

    pub fn add_software_system(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Id {
        let mut e = Self::blank(name, ElementKind::SoftwareSystem);
        e.description = description.into();
        self.insert_element(e)
    }

    pub fn add_container(
        &mut self,
        system: Id,
        name: impl Into<String>,
        description: impl Into<String>,
        technology: impl Into<String>,
    ) -> Result<Id, Error> {
        self.expect_kind(system, ElementKind::SoftwareSystem)?;
        let mut e = Self::blank(name, ElementKind::Container);
        e.description = description.into();
        e.technology = technology.into();
        e.parent = Some(system);
        Ok(self.insert_element(e))
    }

    pub fn add_component(
        &mut self,
        container: Id,
        name: impl Into<String>,
        description: impl Into<String>,
        technology: impl Into<String>,
    ) -> Result<Id, Error> {
        self.expect_kind(container, ElementKind::Container)?;
        let mut e = Self::blank(name, ElementKind::Component);
        e.description = description.into();
        e.technology = technology.into();
        e.parent = Some(container);
        Ok(self.insert_element(e))
    }

    /// Adds a deployment node, top-level when `parent` is `None`. An empty
    /// environment means the node belongs to every environment.
    pub fn add_deployment_node(
        &mut self,
        parent: Option<Id>,
        environment: &str,
        name: impl Into<String>,
    ) -> Result<Id, Error> {
        if let Some(p) = parent {
            self.expect_kind(p, ElementKind::DeploymentNode)?;
        }
        let mut e = Self::blank(name, ElementKind::DeploymentNode);
        e.parent = parent;
        if !environment.is_empty() {
            e.environment = Some(environment.to_string());
        }
        Ok(self.insert_element(e))
    }

    pub fn add_infrastructure_node(
        &mut self,
        node: Id,
        name: impl Into<String>,
        technology: impl Into<String>,
    ) -> Result<Id, Error> {
        let environment = self.expect_kind(node, ElementKind::DeploymentNode)?.environment.clone();
        let mut e = Self::blank(name, ElementKind::InfrastructureNode);
        e.technology = technology.into();
        e.parent = Some(node);
        e.environment = environment;
        Ok(self.insert_element(e))
    }

    /// Adds an instance of `container` to the deployment node. The instance
    /// borrows the container's name; `instance` is its ordinal within the
    /// node.
    pub fn add_container_instance(
        &mut self,
        node: Id,
        container: Id,
        instance: u32,
    ) -> Result<Id, Error> {
        let environment = self.expect_kind(node, ElementKind::DeploymentNode)?.environment.clone();
        let name = self.expect_kind(container, ElementKind::Container)?.name.clone();
        let mut e = Self::blank(name, ElementKind::ContainerInstance);
        e.parent = Some(node);
        e.environment = environment;
        e.container = Some(container);
        e.instance = Some(instance);
        Ok(self.insert_element(e))
    }

    pub fn add_relationship(
        &mut self,
        source: Id,
        destination: Id,
        description: impl Into<String>,
    ) -> Result<Id, Error> {
        if !self.elements.contains_key(&source) {
            return Err(Error::UnknownElement(source));
        }
        if !self.elements.contains_key(&destination) {
            return Err(Error::UnknownElement(destination));
        }
        let id = self.fresh_id();
        self.relationships.insert(
            id,
            Relationship {
                id,
                source,
                destination,
                description: description.into(),
                technology: String::new(),
                tags: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Merges comma-joined `tags` into the element's tag set, skipping tags
    /// already present.
    pub fn tag(&mut self, id: Id, tags: &str) -> Result<(), Error> {
        let e = self.elements.get_mut(&id).ok_or(Error::UnknownElement(id))?;
        for tag in parse_tags(tags) {
            if !e.tags.contains(&tag) {
                e.tags.push(tag);
            }
        }
        Ok(())
    }

    pub fn tag_relationship(&mut self, id: Id, tags: &str) -> Result<(), Error> {
        let r = self.relationships.get_mut(&id).ok_or(Error::UnknownElement(id))?;
        for tag in parse_tags(tags) {
            if !r.tags.contains(&tag) {
                r.tags.push(tag);
            }
        }
        Ok(())
    }

    pub fn set_property(&mut self, id: Id, key: &str, value: &str) -> Result<(), Error> {
        let e = self.elements.get_mut(&id).ok_or(Error::UnknownElement(id))?;
        e.properties.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn set_relationship_technology(&mut self, id: Id, technology: &str) -> Result<(), Error> {
        let r = self.relationships.get_mut(&id).ok_or(Error::UnknownElement(id))?;
        r.technology = technology.to_string();
        Ok(())
    }

    // -- lookup -----------------------------------------------------------

    pub fn element(&self, id: Id) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn relationship(&self, id: Id) -> Option<&Relationship> {
        self.relationships.get(&id)
    }

    /// All elements in registration order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// All relationships in registration order.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    fn of_kind(&self, kind: ElementKind) -> Vec<&Element> {
        self.elements.values().filter(|e| e.kind == kind).collect()
    }

    pub fn people(&self) -> Vec<&Element> {
        self.of_kind(ElementKind::Person)
    }

    pub fn systems(&self) -> Vec<&Element> {
        self.of_kind(ElementKind::SoftwareSystem)
    }

    fn children(&self, parent: Id, kind: ElementKind) -> Vec<&Element> {
        self.elements
            .values()
            .filter(|e| e.kind == kind && e.parent == Some(parent))
            .collect()
    }

    pub fn containers_of(&self, system: Id) -> Vec<&Element> {
        self.children(system, ElementKind::Container)
    }

    pub fn components_of(&self, container: Id) -> Vec<&Element> {
        self.children(container, ElementKind::Component)
    }

    /// Top-level deployment nodes.
    pub fn deployment_nodes(&self) -> Vec<&Element> {
        self.elements
            .values()
            .filter(|e| e.kind == ElementKind::DeploymentNode && e.parent.is_none())
            .collect()
    }

    pub fn child_nodes(&self, node: Id) -> Vec<&Element> {
        self.children(node, ElementKind::DeploymentNode)
    }

    pub fn infrastructure_of(&self, node: Id) -> Vec<&Element> {
        self.children(node, ElementKind::InfrastructureNode)
    }

    pub fn instances_of(&self, node: Id) -> Vec<&Element> {
        self.children(node, ElementKind::ContainerInstance)
    }

    /// First element with the given name, in registration order.
    pub fn element_named(&self, name: &str) -> Option<&Element> {
        self.elements.values().find(|e| e.name == name)
    }

    /// Root of the deployment node subtree the element belongs to, `None`
    /// for non-deployment elements.
    pub fn top_level_node(&self, id: Id) -> Option<Id> {
        let e = self.elements.get(&id)?;
        let mut node = match e.kind {
            ElementKind::DeploymentNode => e,
            ElementKind::InfrastructureNode | ElementKind::ContainerInstance => {
                self.elements.get(&e.parent?)?
            }
            _ => return None,
        };
        while let Some(parent) = node.parent {
            node = self.elements.get(&parent)?;
        }
        Some(node.id)
    }

    /// Resolves a relationship reference to exactly one registry
    /// relationship. When several relationships connect the pair the
    /// description is required and must single one out.
    pub fn find_relationship(
        &self,
        source: Id,
        destination: Id,
        description: Option<&str>,
    ) -> Result<&Relationship, Error> {
        let matches: Vec<&Relationship> = self
            .relationships
            .values()
            .filter(|r| {
                r.source == source
                    && r.destination == destination
                    && description.is_none_or(|d| r.description == d)
            })
            .collect();
        match matches.as_slice() {
            [] => Err(Error::RelationshipNotFound {
                source_id: source,
                destination_id: destination,
            }),
            [r] => Ok(r),
            _ if description.is_none() => Err(Error::AmbiguousRelationship {
                source_id: source,
                destination_id: destination,
            }),
            // Duplicate (source, destination, description) triples: keep the
            // first, a documented limitation.
            [r, ..] => Ok(r),
        }
    }

    // -- validation -------------------------------------------------------

    /// Checks structural invariants, collecting every problem found.
    pub fn validate(&self) -> Result<(), Error> {
        let mut errs: Vec<ValidationError> = Vec::new();

        // People and software systems share the global name scope.
        let mut seen: Vec<&str> = Vec::new();
        for e in self
            .elements
            .values()
            .filter(|e| matches!(e.kind, ElementKind::Person | ElementKind::SoftwareSystem))
        {
            if seen.contains(&e.name.as_str()) {
                errs.push(ValidationError {
                    context: format!("{} {:?}", e.kind.label(), e.name),
                    message: "name already in use".to_string(),
                });
            }
            seen.push(&e.name);
        }

        // Children must be uniquely named within their parent.
        for parent in self.elements.values() {
            let mut seen: Vec<&str> = Vec::new();
            for child in self
                .elements
                .values()
                .filter(|e| e.parent == Some(parent.id) && e.kind != ElementKind::ContainerInstance)
            {
                if seen.contains(&child.name.as_str()) {
                    errs.push(ValidationError {
                        context: format!("{} {:?}", child.kind.label(), child.name),
                        message: format!("name already in use in {} {:?}", parent.kind.label(), parent.name),
                    });
                }
                seen.push(&child.name);
            }
        }

        // Relationship endpoints must resolve.
        for r in self.relationships.values() {
            for end in [r.source, r.destination] {
                if !self.elements.contains_key(&end) {
                    errs.push(ValidationError {
                        context: format!("relationship {:?}", r.description),
                        message: format!("unknown endpoint {end}"),
                    });
                }
            }
        }

        if errs.is_empty() {
            Ok(())
        } else {
            debug!(count = errs.len(); "model validation failed");
            Err(Error::Validation(errs))
        }
    }
}
