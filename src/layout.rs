//! Layout extraction and reconciliation.
//!
//! Element and relationship ids are random per build, so saved visual state
//! cannot be keyed by id across rebuilds. Reconciliation instead matches
//! elements between a remote (saved) model and the freshly built local one
//! by structural keys: names scoped by their owners. People and systems
//! match globally by name, containers within their matched system,
//! components within their matched container, and deployment trees node by
//! node. Container instances match by their mapped container plus ordinal,
//! since they have no name of their own.
//!
//! Relationships match by remapped source, remapped destination and
//! description. Anything unmatched is silently dropped; merging never
//! fails.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::id::Id;
use crate::model::Model;
use crate::view::{Routing, Vertex, Views};

/// Saved visual state of one element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementLayout {
    pub id: Id,
    pub x: i32,
    pub y: i32,
}

/// Saved visual state of one relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipLayout {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vertices: Vec<Vertex>,
    #[serde(default, skip_serializing_if = "routing_is_undefined")]
    pub routing: Routing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
}

fn routing_is_undefined(r: &Routing) -> bool {
    *r == Routing::Undefined
}

/// Saved visual state of one view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewLayout {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ElementLayout>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<RelationshipLayout>,
}

/// Saved visual state of every view of a workspace, keyed by view key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceLayout(pub std::collections::BTreeMap<String, ViewLayout>);

/// Extracts the visual state worth saving: element positions other than the
/// origin, and relationship line state other than the defaults. Views with
/// nothing to save are omitted.
pub fn extract_layout(views: &Views) -> WorkspaceLayout {
    let mut layout = WorkspaceLayout::default();
    for view in views.iter() {
        let elements: Vec<ElementLayout> = view
            .element_views
            .iter()
            .filter(|ev| ev.x.unwrap_or(0) != 0 || ev.y.unwrap_or(0) != 0)
            .map(|ev| ElementLayout {
                id: ev.id,
                x: ev.x.unwrap_or(0),
                y: ev.y.unwrap_or(0),
            })
            .collect();
        let relationships: Vec<RelationshipLayout> = view
            .relationship_views
            .iter()
            .filter(|rv| {
                rv.routing != Routing::Undefined
                    || rv.position.is_some()
                    || !rv.vertices.is_empty()
            })
            .map(|rv| RelationshipLayout {
                id: rv.id,
                vertices: rv.vertices.clone(),
                routing: rv.routing,
                position: rv.position,
            })
            .collect();
        if !elements.is_empty() || !relationships.is_empty() {
            layout
                .0
                .insert(view.key.clone(), ViewLayout { elements, relationships });
        }
    }
    layout
}

/// Applies saved visual state whose ids belong to the current build. Entries
/// for elements or relationships no longer in a view are skipped.
pub fn apply_layout(views: &mut Views, layout: &WorkspaceLayout) {
    for (key, saved) in &layout.0 {
        let Some(view) = views.get_mut(key) else {
            continue;
        };
        for el in &saved.elements {
            if let Some(ev) = view.element_view_mut(el.id) {
                ev.x = Some(el.x);
                ev.y = Some(el.y);
            }
        }
        for rl in &saved.relationships {
            if let Some(rv) = view
                .relationship_views
                .iter_mut()
                .find(|rv| rv.id == rl.id)
            {
                rv.vertices = rl.vertices.clone();
                rv.routing = rl.routing;
                rv.position = rl.position;
            }
        }
    }
}

/// Reconciles a layout saved against `remote` onto the local build: remote
/// ids are translated through the structural-key map, then applied.
pub fn merge_layout(
    local_model: &Model,
    local_views: &mut Views,
    remote_model: &Model,
    layout: &WorkspaceLayout,
) {
    let id_map = build_id_map(remote_model, local_model);
    let remapped = remap_layout(remote_model, local_model, &id_map, layout);
    apply_layout(local_views, &remapped);
    debug!(mapped = id_map.len(), views = remapped.0.len(); "merged saved layout");
}

/// Maps remote element ids to local element ids by structural key.
/// Unmatched elements on either side are simply absent from the map.
pub fn build_id_map(remote: &Model, local: &Model) -> HashMap<Id, Id> {
    let mut map: HashMap<Id, Id> = HashMap::new();

    for rp in remote.people() {
        if let Some(lp) = local.people().into_iter().find(|e| e.name == rp.name) {
            map.insert(rp.id, lp.id);
        }
    }

    for rs in remote.systems() {
        let Some(ls) = local.systems().into_iter().find(|e| e.name == rs.name) else {
            continue;
        };
        map.insert(rs.id, ls.id);
        for rc in remote.containers_of(rs.id) {
            let Some(lc) = local
                .containers_of(ls.id)
                .into_iter()
                .find(|e| e.name == rc.name)
            else {
                continue;
            };
            map.insert(rc.id, lc.id);
            for rcmp in remote.components_of(rc.id) {
                if let Some(lcmp) = local
                    .components_of(lc.id)
                    .into_iter()
                    .find(|e| e.name == rcmp.name)
                {
                    map.insert(rcmp.id, lcmp.id);
                }
            }
        }
    }

    // Container instance matching depends on the container map, so the
    // deployment trees go last.
    for rn in remote.deployment_nodes() {
        if let Some(ln) = local
            .deployment_nodes()
            .into_iter()
            .find(|e| e.name == rn.name && e.environment == rn.environment)
        {
            map_deployment_node(remote, local, rn.id, ln.id, &mut map);
        }
    }

    map
}

fn map_deployment_node(
    remote: &Model,
    local: &Model,
    rnode: Id,
    lnode: Id,
    map: &mut HashMap<Id, Id>,
) {
    map.insert(rnode, lnode);

    for rinf in remote.infrastructure_of(rnode) {
        if let Some(linf) = local
            .infrastructure_of(lnode)
            .into_iter()
            .find(|e| e.name == rinf.name)
        {
            map.insert(rinf.id, linf.id);
        }
    }

    for rci in remote.instances_of(rnode) {
        let Some(lcontainer) = rci.container.and_then(|c| map.get(&c).copied()) else {
            continue;
        };
        if let Some(lci) = local
            .instances_of(lnode)
            .into_iter()
            .find(|e| e.container == Some(lcontainer) && e.instance == rci.instance)
        {
            map.insert(rci.id, lci.id);
        }
    }

    for rchild in remote.child_nodes(rnode) {
        if let Some(lchild) = local
            .child_nodes(lnode)
            .into_iter()
            .find(|e| e.name == rchild.name)
        {
            map_deployment_node(remote, local, rchild.id, lchild.id, map);
        }
    }
}

/// Translates a remote-keyed layout into local ids. Entries whose element
/// or relationship cannot be matched are dropped.
fn remap_layout(
    remote: &Model,
    local: &Model,
    id_map: &HashMap<Id, Id>,
    layout: &WorkspaceLayout,
) -> WorkspaceLayout {
    let mut out = WorkspaceLayout::default();
    for (key, saved) in &layout.0 {
        let elements: Vec<ElementLayout> = saved
            .elements
            .iter()
            .filter_map(|el| {
                id_map.get(&el.id).map(|&id| ElementLayout { id, x: el.x, y: el.y })
            })
            .collect();
        let relationships: Vec<RelationshipLayout> = saved
            .relationships
            .iter()
            .filter_map(|rl| {
                let id = remap_relationship(remote, local, id_map, rl.id)?;
                Some(RelationshipLayout {
                    id,
                    vertices: rl.vertices.clone(),
                    routing: rl.routing,
                    position: rl.position,
                })
            })
            .collect();
        if !elements.is_empty() || !relationships.is_empty() {
            out.0.insert(key.clone(), ViewLayout { elements, relationships });
        }
    }
    out
}

/// A relationship maps when both endpoints map and the local model holds a
/// relationship with the same remapped endpoints and the same description.
fn remap_relationship(
    remote: &Model,
    local: &Model,
    id_map: &HashMap<Id, Id>,
    rel: Id,
) -> Option<Id> {
    let r = remote.relationship(rel)?;
    let source = id_map.get(&r.source).copied()?;
    let destination = id_map.get(&r.destination).copied()?;
    local
        .relationships()
        .find(|l| {
            l.source == source && l.destination == destination && l.description == r.description
        })
        .map(|l| l.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{View, ViewScope};

    fn banking(model: &mut Model) -> (Id, Id, Id, Id) {
        let user = model.add_person("Customer", "");
        let bank = model.add_software_system("Banking", "");
        let web = model.add_container(bank, "Web App", "", "axum").unwrap();
        let db = model.add_container(bank, "Database", "", "Postgres").unwrap();
        model.add_relationship(user, web, "logs in").unwrap();
        model.add_relationship(web, db, "reads").unwrap();
        (user, bank, web, db)
    }

    #[test]
    fn id_map_matches_by_nested_names() {
        let mut remote = Model::new();
        let (ru, rb, rw, rd) = banking(&mut remote);
        let mut local = Model::new();
        // Different registration order, same structure.
        let lb = local.add_software_system("Banking", "");
        let ld = local.add_container(lb, "Database", "", "Postgres").unwrap();
        let lw = local.add_container(lb, "Web App", "", "axum").unwrap();
        let lu = local.add_person("Customer", "");

        let map = build_id_map(&remote, &local);
        assert_eq!(map.get(&ru), Some(&lu));
        assert_eq!(map.get(&rb), Some(&lb));
        assert_eq!(map.get(&rw), Some(&lw));
        assert_eq!(map.get(&rd), Some(&ld));
    }

    #[test]
    fn id_map_scopes_duplicate_names_by_parent() {
        let mut remote = Model::new();
        let rs1 = remote.add_software_system("Sales", "");
        let rs2 = remote.add_software_system("Billing", "");
        let rdb1 = remote.add_container(rs1, "Database", "", "").unwrap();
        let rdb2 = remote.add_container(rs2, "Database", "", "").unwrap();

        let mut local = Model::new();
        let ls2 = local.add_software_system("Billing", "");
        let ldb2 = local.add_container(ls2, "Database", "", "").unwrap();
        let ls1 = local.add_software_system("Sales", "");
        let ldb1 = local.add_container(ls1, "Database", "", "").unwrap();

        let map = build_id_map(&remote, &local);
        // Two containers share a name; each maps inside its own system.
        assert_eq!(map.get(&rdb1), Some(&ldb1));
        assert_eq!(map.get(&rdb2), Some(&ldb2));
    }

    #[test]
    fn id_map_covers_deployment_trees() {
        fn deployed(model: &mut Model) -> (Id, Id, Id) {
            let sys = model.add_software_system("Sys", "");
            let api = model.add_container(sys, "API", "", "").unwrap();
            let cloud = model.add_deployment_node(None, "Prod", "Cloud").unwrap();
            let cluster = model
                .add_deployment_node(Some(cloud), "Prod", "Cluster")
                .unwrap();
            let lb = model.add_infrastructure_node(cloud, "LB", "nginx").unwrap();
            let ci = model.add_container_instance(cluster, api, 2).unwrap();
            (cluster, lb, ci)
        }
        let mut remote = Model::new();
        let (rcluster, rlb, rci) = deployed(&mut remote);
        let mut local = Model::new();
        let (lcluster, llb, lci) = deployed(&mut local);

        let map = build_id_map(&remote, &local);
        assert_eq!(map.get(&rcluster), Some(&lcluster));
        assert_eq!(map.get(&rlb), Some(&llb));
        assert_eq!(map.get(&rci), Some(&lci));
    }

    #[test]
    fn extract_skips_defaults() {
        let mut model = Model::new();
        let (user, _, web, _) = banking(&mut model);
        let mut views = Views::new();
        let mut view = View::new("landscape", ViewScope::Landscape);
        view.add_elements(&model, [user, web]);
        views.add(view).unwrap();

        // Nothing positioned yet.
        assert!(extract_layout(&views).0.is_empty());

        let view = views.get_mut("landscape").unwrap();
        let ev = view.element_view_mut(user).unwrap();
        ev.x = Some(100);
        ev.y = Some(200);

        let layout = extract_layout(&views);
        let saved = &layout.0["landscape"];
        assert_eq!(saved.elements.len(), 1);
        assert_eq!((saved.elements[0].x, saved.elements[0].y), (100, 200));
        // The relationship has default routing and no vertices.
        assert!(saved.relationships.is_empty());
    }

    #[test]
    fn merge_carries_positions_across_rebuilds() {
        let mut remote = Model::new();
        let (ruser, _, rweb, _) = banking(&mut remote);
        let mut remote_views = Views::new();
        let mut view = View::new("landscape", ViewScope::Landscape);
        view.add_elements(&remote, [ruser, rweb]);
        remote_views.add(view).unwrap();
        {
            let view = remote_views.get_mut("landscape").unwrap();
            let ev = view.element_view_mut(ruser).unwrap();
            ev.x = Some(100);
            ev.y = Some(200);
            let rel = remote.find_relationship(ruser, rweb, None).unwrap().id;
            let rv = view
                .relationship_views
                .iter_mut()
                .find(|rv| rv.id == rel)
                .unwrap();
            rv.routing = Routing::Orthogonal;
            rv.vertices = vec![Vertex { x: 5, y: 6 }];
        }
        let saved = extract_layout(&remote_views);

        let mut local = Model::new();
        let (luser, _, lweb, _) = banking(&mut local);
        let mut local_views = Views::new();
        let mut view = View::new("landscape", ViewScope::Landscape);
        view.add_elements(&local, [luser, lweb]);
        local_views.add(view).unwrap();

        merge_layout(&local, &mut local_views, &remote, &saved);

        let view = local_views.get("landscape").unwrap();
        let ev = view.element_view(luser).unwrap();
        assert_eq!((ev.x, ev.y), (Some(100), Some(200)));
        let rel = local.find_relationship(luser, lweb, None).unwrap().id;
        let rv = view.relationship_view(rel).unwrap();
        assert_eq!(rv.routing, Routing::Orthogonal);
        assert_eq!(rv.vertices, vec![Vertex { x: 5, y: 6 }]);
    }

    #[test]
    fn merge_drops_unmatched_entries() {
        let mut remote = Model::new();
        let gone = remote.add_software_system("Retired", "");
        let mut remote_views = Views::new();
        let mut view = View::new("landscape", ViewScope::Landscape);
        view.add_element(&remote, gone);
        remote_views.add(view).unwrap();
        {
            let view = remote_views.get_mut("landscape").unwrap();
            let ev = view.element_view_mut(gone).unwrap();
            ev.x = Some(10);
            ev.y = Some(10);
        }
        let saved = extract_layout(&remote_views);

        let mut local = Model::new();
        let kept = local.add_software_system("Current", "");
        let mut local_views = Views::new();
        let mut view = View::new("landscape", ViewScope::Landscape);
        view.add_element(&local, kept);
        local_views.add(view).unwrap();

        merge_layout(&local, &mut local_views, &remote, &saved);
        let ev = local_views.get("landscape").unwrap().element_view(kept).unwrap();
        assert_eq!((ev.x, ev.y), (None, None));
    }
}
