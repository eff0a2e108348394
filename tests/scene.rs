extern crate pastel;
#[macro_use]
extern crate approx;
extern crate rand;

use pastel::prelude::*;
use rand::prng::XorShiftRng;
use rand::{Rng, SeedableRng};

#[test]
fn hierarchy() {
    let mut scene = Scene::new();
    let e1 = scene.add(Node::named("e1"));
    let e2 = scene.add_child(e1, Node::named("e2")).unwrap();
    let e3 = scene.add_child(e1, Node::named("e3")).unwrap();
    let e4 = scene.add_child(e3, Node::named("e4")).unwrap();
    // e1 <- (e2, e3 <- (e4))

    assert_eq!(scene.descendants(e1).collect::<Vec<_>>(), [e2, e3, e4]);
    assert_eq!(scene.children(e1).collect::<Vec<_>>(), [e2, e3]);
    assert_eq!(scene.ancestors(e4).collect::<Vec<_>>(), [e3, e1, scene.root()]);
    assert!(scene.set_parent(e1, e4).is_err());

    scene.set_parent(e3, e2).unwrap();
    assert_eq!(scene.children(e1).collect::<Vec<_>>(), [e2]);
    assert_eq!(scene.descendants(e2).collect::<Vec<_>>(), [e3, e4]);

    let removed = scene.remove(e2);
    assert_eq!(removed, [e2, e3, e4]);
    assert!(!scene.contains(e4));
    assert_eq!(scene.descendants(e1).count(), 0);
}

#[test]
fn global_transforms_follow_parents() {
    let mut scene = Scene::new();
    let mut parent = Node::named("parent");
    parent.set_location(Vector3::new(1.0, 0.0, 0.0));
    let parent = scene.add(parent);

    let mut child = Node::named("child");
    child.set_location(Vector3::new(0.0, 2.0, 0.0));
    let child = scene.add_child(parent, child).unwrap();

    let stamp = scene.transform_stamp(child);
    assert_ulps_eq!(scene.global_location(child), Point3::new(1.0, 2.0, 0.0), epsilon = 1e-6);

    scene[parent].set_rotation_axis_angle(Vector3::unit_z(), Deg(90.0));
    assert_ne!(scene.transform_stamp(child), stamp);
    assert_ulps_eq!(scene.global_location(child), Point3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
}

#[test]
fn random_iteration() {
    let mut generator = XorShiftRng::from_seed([7; 16]);
    let mut scene = Scene::new();

    let mut nodes = vec![];
    for i in 0..255 {
        nodes.push(scene.add_detached(Node::named(format!("n{}", i))));
    }

    let mut constructed = vec![];
    constructed.push(nodes.pop().unwrap());

    let mut count = 0;
    for i in 0..254 {
        let idx = generator.gen_range(0, nodes.len());
        let pidx = generator.gen_range(0, constructed.len());

        if pidx == 0 {
            count += 1;
        }

        scene.set_parent(nodes[idx], constructed[pidx]).unwrap();
        let len = scene.descendants(constructed[0]).count();
        assert_eq!(len, i + 1);

        constructed.push(nodes[idx]);
        nodes.remove(idx);
    }

    assert_eq!(scene.children(constructed[0]).count(), count);
    assert_eq!(scene.descendants(constructed[0]).count(), 254);

    for &v in &constructed[1..] {
        assert!(scene.is_ancestor(v, constructed[0]));
    }
}
