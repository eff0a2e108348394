//! Mesh particles.
//!
//! Large numbers of small meshes that move independently are merged into the one
//! vertex array of a `MeshParticleEmitter`, and drawn with a single GL call. Each
//! particle is transformed on the CPU, since the draw call leaves no room for a
//! matrix per particle.
//!
//! ```rust,ignore
//! let mut emitter = MeshParticleEmitter::new(EmitterParams {
//!     emission_rate: 50.0,
//!     behaviour: ParticleBehaviour::Lifetime { lifetime: 2.0 },
//!     ..EmitterParams::default()
//! });
//!
//! emitter.set_particle_template_mesh(Some(cube));
//! emitter.play();
//!
//! // Every frame.
//! emitter.update(dt);
//! emitter.transform_particles(in_view);
//! ```

pub mod behaviour;
pub mod emitter;
pub mod particle;

pub use self::emitter::{EmitterParams, MeshParticleEmitter};
pub use self::particle::MeshParticle;

pub mod prelude {
    pub use super::behaviour::ParticleBehaviour;
    pub use super::emitter::{EmitterParams, MeshParticleEmitter};
    pub use super::particle::MeshParticle;
}
