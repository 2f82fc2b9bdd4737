//! Layout survival across full workspace rebuilds, through the public API.

use armature::{Id, Routing, Vertex, View, ViewScope, Workspace};

/// Builds the same workspace twice the way a generator would: every call
/// produces fresh random ids for the same structure.
fn build() -> Workspace {
    let mut ws = Workspace::new("shop");
    let m = &mut ws.model;
    let customer = m.add_person("Customer", "");
    let shop = m.add_software_system("Shop", "Online store");
    let web = m.add_container(shop, "Storefront", "", "axum").unwrap();
    let db = m.add_container(shop, "Database", "", "Postgres").unwrap();
    m.add_relationship(customer, web, "browses").unwrap();
    m.add_relationship(web, db, "reads").unwrap();

    let mut landscape = View::new("landscape", ViewScope::Landscape);
    landscape.add_all(&ws.model);
    ws.views.add(landscape).unwrap();

    let mut containers = View::new("containers", ViewScope::Container { system: shop });
    containers.add_all(&ws.model);
    ws.views.add(containers).unwrap();

    ws.finalize();
    ws
}

fn named(ws: &Workspace, name: &str) -> Id {
    ws.model.element_named(name).unwrap().id
}

#[test]
fn layout_survives_a_rebuild() {
    let mut old = build();

    // Position an element and style a relationship, as an editor would.
    let web = named(&old, "Storefront");
    let db = named(&old, "Database");
    let rel = old.model.find_relationship(web, db, None).unwrap().id;
    {
        let view = old.views.get_mut("containers").unwrap();
        let ev = view.element_view_mut(web).unwrap();
        ev.x = Some(320);
        ev.y = Some(640);
        let rv = view
            .relationship_views
            .iter_mut()
            .find(|rv| rv.id == rel)
            .unwrap();
        rv.routing = Routing::Curved;
        rv.position = Some(40);
        rv.vertices = vec![Vertex { x: 400, y: 500 }];
    }
    let saved = old.layout();

    // Fresh build, fresh ids.
    let mut new = build();
    let new_web = named(&new, "Storefront");
    assert_ne!(new_web, web, "rebuild should not reuse ids");

    new.merge_layout(&old.model, &saved);

    let view = new.views.get("containers").unwrap();
    let ev = view.element_view(new_web).unwrap();
    assert_eq!((ev.x, ev.y), (Some(320), Some(640)));

    let new_db = named(&new, "Database");
    let new_rel = new.model.find_relationship(new_web, new_db, None).unwrap().id;
    let rv = view.relationship_view(new_rel).unwrap();
    assert_eq!(rv.routing, Routing::Curved);
    assert_eq!(rv.position, Some(40));
    assert_eq!(rv.vertices, vec![Vertex { x: 400, y: 500 }]);
}

#[test]
fn structural_keys_tell_same_named_containers_apart() {
    fn two_systems() -> Workspace {
        let mut ws = Workspace::new("suite");
        let m = &mut ws.model;
        let sales = m.add_software_system("Sales", "");
        let billing = m.add_software_system("Billing", "");
        m.add_container(sales, "Database", "", "").unwrap();
        m.add_container(billing, "Database", "", "").unwrap();
        let mut view = View::new("sales", ViewScope::Container { system: sales });
        view.add_all(m);
        ws.views.add(view).unwrap();
        ws.finalize();
        ws
    }

    let mut old = two_systems();
    let sales = old.model.element_named("Sales").unwrap().id;
    let sales_db = old
        .model
        .containers_of(sales)
        .first()
        .map(|e| e.id)
        .unwrap();
    {
        let view = old.views.get_mut("sales").unwrap();
        let ev = view.element_view_mut(sales_db).unwrap();
        ev.x = Some(10);
        ev.y = Some(20);
    }
    let saved = old.layout();

    let mut new = two_systems();
    new.merge_layout(&old.model, &saved);

    let new_sales = new.model.element_named("Sales").unwrap().id;
    let new_sales_db = new.model.containers_of(new_sales)[0].id;
    let view = new.views.get("sales").unwrap();
    let ev = view.element_view(new_sales_db).unwrap();
    // The position lands on Sales' database, not Billing's.
    assert_eq!((ev.x, ev.y), (Some(10), Some(20)));
}

#[test]
fn layout_wire_format_is_stable() {
    let mut old = build();
    let web = named(&old, "Storefront");
    {
        let view = old.views.get_mut("containers").unwrap();
        let ev = view.element_view_mut(web).unwrap();
        ev.x = Some(100);
        ev.y = Some(200);
    }
    let saved = old.layout();

    let json = serde_json::to_value(&saved).unwrap();
    let entry = &json["containers"]["elements"][0];
    assert_eq!(entry["x"], 100);
    assert_eq!(entry["y"], 200);
    assert_eq!(entry["id"], serde_json::json!(web.to_string()));
    // Default relationship state is not persisted.
    assert!(json["containers"].get("relationships").is_none());

    let round: armature::WorkspaceLayout = serde_json::from_value(json).unwrap();
    let mut fresh = build();
    fresh.merge_layout(&old.model, &round);
    let new_web = named(&fresh, "Storefront");
    let ev = fresh
        .views
        .get("containers")
        .unwrap()
        .element_view(new_web)
        .unwrap();
    assert_eq!((ev.x, ev.y), (Some(100), Some(200)));
}
