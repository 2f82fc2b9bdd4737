//! Architecture model views and layout reconciliation.
//!
//! An armature [`Workspace`] holds a software architecture model (people,
//! systems, containers, components and deployment nodes, linked by
//! relationships) and the views defined over it. Views are populated with
//! population operations on [`View`] (bulk inclusion, neighbor and
//! influencer expansion, pruning), relationships are auto-completed so a view never
//! dangles, and animation steps are inferred from the declared element
//! groups.
//!
//! Element ids are random per build, so saved diagram layouts are carried
//! across rebuilds by [`merge_layout`], which matches elements between the
//! old and new model by structural keys (names scoped by their owners)
//! rather than by id.
//!
//! ```
//! use armature::{View, ViewScope, Workspace};
//!
//! let mut ws = Workspace::new("shop");
//! let user = ws.model.add_person("Customer", "A shopper");
//! let shop = ws.model.add_software_system("Shop", "Online store");
//! ws.model.add_relationship(user, shop, "buys from")?;
//!
//! let mut view = View::new("landscape", ViewScope::Landscape);
//! view.add_all(&ws.model);
//! ws.views.add(view)?;
//! ws.finalize();
//!
//! assert!(ws.views.get("landscape").is_some());
//! # Ok::<(), armature::Error>(())
//! ```

mod animation;
mod error;
mod id;
mod layout;
mod model;
mod populate;
mod reachability;
mod view;
mod workspace;

pub use error::{Error, ValidationError};
pub use id::Id;
pub use layout::{
    ElementLayout, RelationshipLayout, ViewLayout, WorkspaceLayout, build_id_map, merge_layout,
};
pub use model::{Element, ElementKind, Model, Relationship, parse_tags};
pub use reachability::{reachable, related_elements};
pub use view::{
    AnimationStep, ElementView, RelationshipView, Routing, Vertex, View, ViewScope, Views,
};
pub use workspace::Workspace;
