extern crate pastel;
#[macro_use]
extern crate approx;
extern crate rand;

use std::cell::RefCell;
use std::rc::Rc;

use pastel::prelude::*;
use rand::prng::XorShiftRng;
use rand::{Rng, SeedableRng};

fn triangle() -> Shared<Mesh> {
    let mut mesh = Mesh::new(Some("triangle"));
    mesh.set_vertex_content(VertexContent::LOCATION);
    mesh.set_vertex_count(3);
    mesh.set_vertex_location_at(0, Point3::new(0.0, 0.0, 0.0));
    mesh.set_vertex_location_at(1, Point3::new(0.1, 0.0, 0.0));
    mesh.set_vertex_location_at(2, Point3::new(0.0, 0.1, 0.0));
    Rc::new(RefCell::new(mesh))
}

fn emitter(params: EmitterParams) -> MeshParticleEmitter {
    let mut emitter = MeshParticleEmitter::new(params);
    emitter.set_particle_template_mesh(Some(triangle()));
    emitter
}

#[test]
fn recycle() {
    let mut e = emitter(EmitterParams {
        behaviour: ParticleBehaviour::Lifetime { lifetime: 0.5 },
        ..EmitterParams::default()
    });

    assert_eq!(e.emit_particles(100), 100);
    e.transform_particles(true);
    let vertices = e.mesh().vertex_count();
    let capacity = e.current_particle_capacity();

    e.update(1.0);
    assert_eq!(e.particle_count(), 0);

    assert_eq!(e.emit_particles(100), 100);
    assert_eq!(e.particle_count(), 100);
    assert_eq!(e.mesh().vertex_count(), vertices);
    assert_eq!(e.current_particle_capacity(), capacity);
}

#[test]
fn at_capacity() {
    let mut e = emitter(EmitterParams {
        maximum_particle_capacity: Some(10),
        particle_capacity_expansion_increment: 4,
        ..EmitterParams::default()
    });

    assert_eq!(e.emit_particles(20), 10);
    assert!(e.is_full());
    assert!(e.acquire_particle().is_none());
    assert!(e.emit().is_none());
}

#[test]
fn scheduled_emission_is_drawn_once() {
    let mut params = EmitterParams::default();
    params.emission_rate = 10.0;
    params.behaviour = ParticleBehaviour::Ballistic {
        lifetime: 2.0,
        velocity: Vector3::new(0.0, 1.0, 0.0),
        acceleration: Vector3::new(0.0, 0.0, 0.0),
    };

    let mut e = emitter(params);
    e.play();
    e.update(0.5);
    assert_eq!(e.particle_count(), 5);

    let mut scene = Scene::new();
    let camera = scene.add(Node::with_content(
        "camera",
        NodeContent::Camera(Camera::ortho(4.0, 4.0, 0.1, 10.0)),
    ));
    let mut node = Node::with_content("sparks", NodeContent::Emitter(Box::new(e)));
    node.set_location(Vector3::new(0.0, 0.0, -1.0));
    let sparks = scene.add(node);

    let (mut engine, probe) = GLEngine::headless(EngineParams::default());
    let mut visitor = DrawingVisitor::new(&engine);
    let stats = visitor.draw_scene(&mut scene, &mut engine, camera).unwrap();
    assert_eq!(stats.drawn, 1);

    let draws = probe.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].count, 15);
    assert!(!draws[0].indexed);

    // Particles move in the next update, and their vertices follow on the next frame.
    scene[sparks].emitter_mut().unwrap().update(0.5);
    visitor.draw_scene(&mut scene, &mut engine, camera).unwrap();

    let e = scene[sparks].emitter().unwrap();
    let p = e.particle_at(0).unwrap();
    let first = p.first_vertex_offset();
    assert_ulps_eq!(
        e.mesh().vertex_location_at(first),
        Point3::from_vec(p.location()),
        epsilon = 1e-5
    );
}

#[test]
fn random_churn() {
    let mut generator = XorShiftRng::from_seed([3; 16]);
    let mut e = emitter(EmitterParams::default());

    let mut alive = 0;
    for _ in 0..64 {
        if generator.gen() {
            let n = generator.gen_range(1, 8);
            assert_eq!(e.emit_particles(n), n);
            alive += n;
        } else {
            let slots: Vec<_> = (0..e.current_particle_capacity())
                .filter(|&v| e.particle(v).map(|p| p.is_alive()).unwrap_or(false))
                .collect();
            if !slots.is_empty() {
                e.remove_particle(slots[generator.gen_range(0, slots.len())]);
                alive -= 1;
            }
        }

        assert_eq!(e.particle_count(), alive);
        assert!(e.mesh().vertex_count() <= e.current_particle_capacity() * 3);

        // Every live particle owns its own vertices.
        for p in e.particles() {
            let first = p.first_vertex_offset();
            let owner = e.particle_with_vertex_at(first).unwrap();
            assert_eq!(owner.first_vertex_offset(), first);
        }
    }
}
