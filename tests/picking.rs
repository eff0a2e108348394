extern crate pastel;

use std::cell::RefCell;
use std::rc::Rc;

use pastel::prelude::*;

// A unit square whose lower left corner is at the origin of the node.
fn square() -> Shared<Mesh> {
    let mut mesh = Mesh::new(Some("square"));
    mesh.populate_as_rectangle(Vector2::new(1.0, 1.0), Vector2::new(0.0, 0.0), (1, 1));
    Rc::new(RefCell::new(mesh))
}

fn add_square(scene: &mut Scene, mesh: &Shared<Mesh>, name: &str, x: f32, y: f32) -> NodeHandle {
    let content = MeshNode::new(mesh.clone(), None);
    let mut node = Node::with_content(name, NodeContent::Mesh(content));
    node.set_location(Vector3::new(x, y, -1.0));
    scene.add(node)
}

#[test]
fn pick_then_draw() {
    let (mut engine, probe) = GLEngine::headless(EngineParams::default());
    let mut surfaces = ViewSurfaceManager::new(
        &mut engine,
        ViewSurfaceParams {
            size: IntSize::new(64, 64),
            ..ViewSurfaceParams::default()
        },
    )
    .unwrap();

    let mut scene = Scene::new();
    let camera = scene.add(Node::with_content(
        "camera",
        NodeContent::Camera(Camera::ortho(2.0, 2.0, 0.1, 10.0)),
    ));

    // Quadrants of the view: lower left, lower right and upper left.
    let mesh = square();
    let lower_left = add_square(&mut scene, &mesh, "lower left", -1.0, -1.0);
    let lower_right = add_square(&mut scene, &mesh, "lower right", 0.0, -1.0);
    let upper_left = add_square(&mut scene, &mesh, "upper left", -1.0, 0.0);
    scene[upper_left].set_is_visible(false);

    let root = scene.root();
    let view = scene[camera]
        .camera()
        .unwrap()
        .view_from(&scene.global_transform(camera));

    let mut picking = PickingVisitor::new(&engine);
    let mut pick = |scene: &Scene, engine: &mut GLEngine, x, y| {
        picking
            .pick_node_at(scene, engine, &mut surfaces, &view, root, x, y)
            .unwrap()
    };

    assert_eq!(pick(&scene, &mut engine, 16, 16), Some(lower_left));
    assert_eq!(pick(&scene, &mut engine, 48, 16), Some(lower_right));
    assert_eq!(pick(&scene, &mut engine, 16, 48), None);
    assert_eq!(pick(&scene, &mut engine, 48, 48), None);

    // Drawing afterwards paints over the picking colors.
    probe.clear_draws();
    let mut visitor = DrawingVisitor::new(&engine);
    let stats = visitor.draw_scene(&mut scene, &mut engine, camera).unwrap();
    assert_eq!(stats.drawn, 2);
    assert!(probe.draws().iter().all(|v| v.color == Color4F::white()));
    assert_eq!(probe.window().pixel(16, 16), Some(Color4B::white()));
}
