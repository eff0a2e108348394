extern crate pastel;
#[macro_use]
extern crate approx;

use std::cell::RefCell;
use std::rc::Rc;

use pastel::prelude::*;

struct Rig {
    scene: Scene,
    camera: NodeHandle,
    bones: [NodeHandle; 2],
    skin: NodeHandle,
}

// Two chained bones along +Y, and a skin of one triangle. Vertex 2 follows the
// second bone, the others the first.
fn rig() -> Rig {
    let mut scene = Scene::new();
    let camera = scene.add(Node::with_content(
        "camera",
        NodeContent::Camera(Camera::ortho(8.0, 8.0, 0.1, 10.0)),
    ));

    let mut body = Node::with_content("body", NodeContent::SoftBody);
    body.set_location(Vector3::new(0.0, 0.0, -2.0));
    let body = scene.add(body);

    let b0 = scene
        .add_child(body, Node::with_content("b0", NodeContent::Bone(Bone::new())))
        .unwrap();

    let mut b1 = Node::with_content("b1", NodeContent::Bone(Bone::new()));
    b1.set_location(Vector3::new(0.0, 1.0, 0.0));
    let b1 = scene.add_child(b0, b1).unwrap();

    let mut mesh = Mesh::new(Some("skin"));
    mesh.set_vertex_count(3);
    mesh.set_vertex_unit_count(1);
    mesh.set_vertex_content(
        VertexContent::LOCATION | VertexContent::MATRIX_INDICES | VertexContent::WEIGHTS,
    );

    for (i, &(x, y)) in [(0.0, 1.0), (1.0, 1.0), (0.0, 2.0)].iter().enumerate() {
        mesh.set_vertex_location_at(i, Point3::new(x, y, 0.0));
        mesh.set_vertex_matrix_index_at(i, 0, if i == 2 { 1 } else { 0 });
        mesh.set_vertex_weight_at(i, 0, 1.0);
    }

    let mut section = SkinSection::new(0, 3);
    section.add_bone(b0);
    section.add_bone(b1);

    let mut content = MeshNode::new(Rc::new(RefCell::new(mesh)), None);
    content.skin = Some(SkinMesh::with_sections(vec![section]));
    let skin = scene
        .add_child(body, Node::with_content("skin", NodeContent::Mesh(content)))
        .unwrap();

    scene.bind_rest_pose(body);
    Rig {
        scene,
        camera,
        bones: [b0, b1],
        skin,
    }
}

#[test]
fn bind_and_unbind() {
    let mut rig = rig();
    let y0 = rig.scene.deformed_vertex_location_at(rig.skin, 0, 0).unwrap().y;

    rig.scene[rig.bones[0]].set_rotation_axis_angle(Vector3::unit_z(), Deg(90.0));
    let p = rig.scene.deformed_vertex_location_at(rig.skin, 0, 0).unwrap();
    assert_ulps_eq!(p.x, -y0, epsilon = 1e-5);
    assert_ulps_eq!(p.y, 0.0, epsilon = 1e-5);

    rig.scene[rig.bones[0]].set_rotation_axis_angle(Vector3::unit_z(), Deg(0.0));
    let p = rig.scene.deformed_vertex_location_at(rig.skin, 0, 0).unwrap();
    assert_ulps_eq!(p.y, y0, epsilon = 1e-5);
}

#[test]
fn deformed_faces_follow_bones() {
    let mut rig = rig();
    let rest = rig.scene.deformed_face_at(rig.skin, 0).unwrap();

    rig.scene[rig.bones[1]].set_rotation_axis_angle(Vector3::unit_z(), Deg(180.0));
    let face = rig.scene.deformed_face_at(rig.skin, 0).unwrap();

    // Only the vertex of the second bone moves, swinging around the joint at y = 1.
    // Faces are in the space of the skin.
    assert_ulps_eq!(face.vertices[0], rest.vertices[0], epsilon = 1e-5);
    assert_ulps_eq!(face.vertices[1], rest.vertices[1], epsilon = 1e-5);
    assert_ulps_eq!(face.vertices[2], Point3::new(0.0, 0.0, 0.0), epsilon = 1e-5);
}

#[test]
fn drawn_with_palette() {
    let mut rig = rig();
    let (mut engine, probe) = GLEngine::headless(EngineParams::default());
    let mut visitor = DrawingVisitor::new(&engine);

    rig.scene[rig.bones[0]].set_rotation_axis_angle(Vector3::unit_z(), Deg(90.0));
    let stats = visitor
        .draw_scene(&mut rig.scene, &mut engine, rig.camera)
        .unwrap();
    assert_eq!(stats.drawn, 1);

    let draws = probe.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].count, 3);
    assert!(draws[0].palette_enabled);

    // The camera sits at the origin, so the palette holds the bone transforms in
    // world space.
    let expected =
        Matrix4::from_translation(Vector3::new(0.0, 0.0, -2.0)) * Matrix4::from_angle_z(Deg(90.0));
    assert_ulps_eq!(
        rig.scene.skinned_bone(rig.skin, rig.bones[0]).unwrap().draw_transform(),
        expected,
        epsilon = 1e-5
    );
    assert_ulps_eq!(probe.palette_matrix(0).unwrap(), expected, epsilon = 1e-5);
}
