extern crate env_logger;
extern crate pastel;

use std::cell::RefCell;
use std::rc::Rc;

use pastel::gles::consts::*;
use pastel::prelude::*;

fn quad(name: &str) -> Shared<Mesh> {
    let _ = env_logger::try_init();
    let mut mesh = Mesh::new(Some(name));
    mesh.populate_as_centered_rectangle(Vector2::new(1.0, 1.0), (1, 1));
    Rc::new(RefCell::new(mesh))
}

fn camera(scene: &mut Scene) -> NodeHandle {
    scene.add(Node::with_content(
        "camera",
        NodeContent::Camera(Camera::ortho(2.0, 2.0, 0.1, 10.0)),
    ))
}

fn mesh_node(name: &str, mesh: &Shared<Mesh>, material: Option<&Shared<Material>>) -> Node {
    let content = MeshNode::new(mesh.clone(), material.cloned());
    let mut node = Node::with_content(name, NodeContent::Mesh(content));
    node.set_location(Vector3::new(0.0, 0.0, -1.0));
    node
}

#[test]
fn state_restore() {
    let (mut engine, probe) = GLEngine::headless(EngineParams::default());
    probe.set_capability(DEPTH_TEST, true);

    engine.open();
    engine.enable(DEPTH_TEST, false);
    assert!(!probe.is_enabled(DEPTH_TEST));
    engine.close();

    assert!(probe.is_enabled(DEPTH_TEST));
}

#[test]
fn blend_cycle() {
    let mut material = Material::new(Some("glass"));
    material.set_opacity(128);
    assert_eq!(material.blend_func(), BlendFunc::new(SRC_ALPHA, ONE_MINUS_SRC_ALPHA));

    material.set_opacity(255);
    assert_eq!(material.blend_func(), BlendFunc::new(SRC_ALPHA, ONE_MINUS_SRC_ALPHA));

    material.set_is_opaque(true);
    assert_eq!(material.blend_func(), BlendFunc::new(ONE, ZERO));
}

#[test]
fn translucent_frame_leaves_overlay_state() {
    let (mut engine, probe) = GLEngine::headless(EngineParams::default());

    let mut glass = Material::new(Some("glass"));
    glass.set_opacity(128);
    let glass = Rc::new(RefCell::new(glass));

    let mut scene = Scene::new();
    let camera = camera(&mut scene);
    scene.add(mesh_node("pane", &quad("pane"), Some(&glass)));
    let view = scene[camera]
        .camera()
        .unwrap()
        .view_from(&scene.global_transform(camera));

    let mut visitor = DrawingVisitor::new(&engine);
    engine.open();
    let root = scene.root();
    visitor.visit(&scene, &mut engine, &view, root);
    assert!(probe.is_enabled(BLEND));
    assert_eq!(probe.blend_func(), (SRC_ALPHA, ONE_MINUS_SRC_ALPHA));
    engine.close();

    assert!(!probe.is_enabled(BLEND));
    assert_eq!(probe.current_color(), Color4F::white());
}

#[test]
fn frames_skip_shared_binds() {
    let (mut engine, probe) = GLEngine::headless(EngineParams::default());
    let mesh = quad("shared");

    let mut scene = Scene::new();
    let camera = camera(&mut scene);
    for i in 0..5 {
        scene.add(mesh_node(&format!("copy{}", i), &mesh, None));
    }

    let mut visitor = DrawingVisitor::new(&engine);
    for frame in 1..4 {
        let stats = visitor.draw_scene(&mut scene, &mut engine, camera).unwrap();
        assert_eq!(stats.drawn, 5);
        assert_eq!(visitor.switching().mesh_binds(), frame);
        assert_eq!(visitor.switching().material_binds(), frame);
    }

    assert_eq!(engine.frames(), 3);
    assert_eq!(probe.draws().len(), 15);
}

#[test]
fn environment_map_duty_cycle() {
    let (mut engine, _) = GLEngine::headless(EngineParams::default());
    let mut map = EnvironmentMap::new(&mut engine, Some("env"), 8, DEPTH_COMPONENT16).unwrap();
    map.set_faces_per_snapshot(0.25);

    let mut scene = Scene::new();
    scene.add(mesh_node("pane", &quad("pane"), None));
    let root = scene.root();

    let mut visitor = DrawingVisitor::new(&engine);
    let mut faces = Vec::new();
    for _ in 0..24 {
        engine.open();
        let rendered = visitor
            .draw_environment_map(&scene, &mut engine, &mut map, Point3::new(0.0, 0.0, 0.0), root)
            .unwrap();
        engine.close();
        faces.extend(rendered);
    }

    assert_eq!(faces, TextureKind::Cube.faces().to_vec());
    assert_eq!(engine.framebuffer_binding(), 0);
}
