extern crate pastel;
#[macro_use]
extern crate approx;

use pastel::gles::consts::*;
use pastel::prelude::*;

#[test]
fn disk_with_three_sectors() {
    for rings in 1..5 {
        let mut mesh = Mesh::new(Some("disk"));
        mesh.populate_as_disk(1.0, (rings, 3));
        assert_eq!(mesh.face_count(), 3 * (2 * rings - 1));
    }
}

#[test]
fn sphere_of_two_cones() {
    let mut mesh = Mesh::new(Some("sphere"));
    mesh.populate_as_sphere(1.0, (4, 2));
    assert_eq!(mesh.face_count(), 8);

    let aabb = mesh.bounding_box().unwrap();
    assert_ulps_eq!(aabb.max.y, 1.0, epsilon = 1e-6);
    assert_ulps_eq!(aabb.min.y, -1.0, epsilon = 1e-6);
}

#[test]
fn solid_box_bounds() {
    let bounds = Aabb3::new(Point3::new(-2.0, 0.0, -1.0), Point3::new(2.0, 3.0, 1.0));
    let mut mesh = Mesh::new(Some("box"));
    mesh.populate_as_solid_box(bounds, BoxTextureLayout::Uniform);
    assert_eq!(mesh.bounding_box(), Some(bounds));
}

#[test]
fn buffered_draw() {
    let (mut engine, probe) = GLEngine::headless(EngineParams::default());
    let mut mesh = Mesh::new(Some("box"));
    mesh.populate_as_solid_box(
        Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)),
        BoxTextureLayout::Uniform,
    );

    mesh.create_gl_buffers(&mut engine);
    mesh.release_redundant_data();

    engine.open();
    mesh.bind(&mut engine, 1);
    mesh.draw_range(&mut engine, 6, 6);
    engine.close();

    let draws = probe.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].mode, TRIANGLES);
    assert_eq!(draws[0].count, 6);
    assert!(draws[0].indexed);
}

#[test]
fn archive_round_trip_keeps_faces() {
    let mut mesh = Mesh::new(Some("disk"));
    mesh.populate_as_disk(2.0, (2, 6));

    let bytes = mesh.to_bytes().unwrap();
    let copy = Mesh::from_bytes(Some("copy"), &bytes).unwrap();
    assert_eq!(copy.face_count(), mesh.face_count());
    for f in 0..mesh.face_count() {
        assert_eq!(copy.face_at(f), mesh.face_at(f));
    }
}
