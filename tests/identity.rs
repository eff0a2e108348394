extern crate pastel;

use std::cell::RefCell;
use std::rc::Rc;

use pastel::prelude::*;

fn mesh(name: &str) -> Shared<Mesh> {
    Rc::new(RefCell::new(Mesh::new(Some(name))))
}

#[test]
fn weak_and_strong_caches() {
    let mut weak = Cache::weak("Mesh");
    let mut strong = Cache::strong("Mesh");

    let a = mesh("a");
    let b = mesh("b");
    weak.add(&a);
    strong.add(&b);
    assert!(weak.contains("a"));
    assert!(strong.contains("b"));

    let tags = (a.borrow().tag(), b.borrow().tag());
    drop(a);
    drop(b);

    // The weak cache lets go of "a", the strong one keeps "b" alive.
    assert!(!weak.contains("a"));
    weak.prune();
    assert!(weak.is_empty());

    let b = strong.get("b").unwrap();
    assert_eq!(b.borrow().tag(), tags.1);
    assert_eq!(strong.tags(), vec![tags.1]);

    // A name frees up once its weak entry is gone.
    let again = mesh("a");
    weak.add(&again);
    assert_ne!(again.borrow().tag(), tags.0);
    assert_eq!(weak.names(), vec!["a".to_owned()]);
}

#[test]
fn copies_take_new_tags() {
    let mesh = Mesh::new(Some("quad"));
    let copy = mesh.clone();
    assert_eq!(copy.name(), Some("quad"));
    assert_ne!(copy.tag(), mesh.tag());
    assert!(copy.tag() > 0);
    assert_eq!(mesh.describe(), format!("quad ({})", mesh.tag()));
}

#[test]
fn scene_lookups() {
    let mut scene = Scene::new();
    let a = scene.add(Node::named("a"));
    let b = scene.add_child(a, Node::named("b")).unwrap();
    let root = scene.root();

    assert_eq!(scene.find_by_name(root, "b"), Some(b));
    assert_eq!(scene.find_by_name(b, "a"), None);
    assert_eq!(scene.find_by_tag(root, scene[b].tag()), Some(b));
    assert_eq!(scene.find_by_tag(root, 0), None);
}
