use crate::math::prelude::*;

use super::particle::MeshParticle;

/// How an emitter initializes its particles when they are emitted, and moves them on
/// each update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParticleBehaviour {
    /// Particles stay where they are put until removed.
    Persistent,
    /// Particles die `lifetime` seconds after their emission.
    Lifetime { lifetime: f32 },
    /// Particles leave with `velocity`, speed up by `acceleration`, and die after
    /// `lifetime` seconds.
    Ballistic {
        lifetime: f32,
        velocity: Vector3<f32>,
        acceleration: Vector3<f32>,
    },
    /// Particles fade from one color to another over `lifetime` seconds, then die.
    Fade {
        lifetime: f32,
        from: Color4F,
        to: Color4F,
    },
}

impl Default for ParticleBehaviour {
    fn default() -> Self {
        ParticleBehaviour::Persistent
    }
}

impl ParticleBehaviour {
    /// Sets up a particle that is being emitted. A particle killed here is not emitted.
    pub fn initialize(&self, p: &mut MeshParticle) {
        match *self {
            ParticleBehaviour::Persistent => {}
            ParticleBehaviour::Lifetime { lifetime } => {
                p.lifetime = lifetime;
                p.time_to_live = Some(lifetime);
            }
            ParticleBehaviour::Ballistic {
                lifetime, velocity, ..
            } => {
                p.lifetime = lifetime;
                p.time_to_live = Some(lifetime);
                p.velocity = velocity;
            }
            ParticleBehaviour::Fade { lifetime, from, .. } => {
                p.lifetime = lifetime;
                p.time_to_live = Some(lifetime);
                p.set_color4f(from);
            }
        }
    }

    /// Advances a live particle by `dt` seconds.
    pub fn update(&self, p: &mut MeshParticle, dt: f32) {
        match *self {
            ParticleBehaviour::Persistent => {}
            ParticleBehaviour::Lifetime { .. } => p.age(dt),
            ParticleBehaviour::Ballistic { acceleration, .. } => {
                p.velocity += acceleration * dt;
                let v = p.velocity * dt;
                p.translate_by(v);
                p.age(dt);
            }
            ParticleBehaviour::Fade { from, to, .. } => {
                p.age(dt);
                let t = p.age_fraction();
                p.set_color4f(from.lerp(to, t));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ballistic() {
        let b = ParticleBehaviour::Ballistic {
            lifetime: 1.0,
            velocity: Vector3::new(1.0, 0.0, 0.0),
            acceleration: Vector3::new(0.0, -2.0, 0.0),
        };

        let mut p = MeshParticle::new();
        b.initialize(&mut p);
        p.is_alive = true;

        b.update(&mut p, 0.5);
        assert_ulps_eq!(p.location(), Vector3::new(0.5, -0.5, 0.0), epsilon = 1e-6);
        assert!(p.is_alive());

        b.update(&mut p, 0.5);
        assert!(!p.is_alive());
    }

    #[test]
    fn fade() {
        let b = ParticleBehaviour::Fade {
            lifetime: 2.0,
            from: Color4F::white(),
            to: Color4F::transparent(),
        };

        let mut p = MeshParticle::new();
        p.is_alive = true;
        b.initialize(&mut p);
        b.update(&mut p, 1.0);
        assert_ulps_eq!(p.color4f().a, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn from_json() {
        let b: ParticleBehaviour =
            serde_json::from_str(r#"{"Lifetime":{"lifetime":0.5}}"#).unwrap();
        assert_eq!(b, ParticleBehaviour::Lifetime { lifetime: 0.5 });
    }
}
