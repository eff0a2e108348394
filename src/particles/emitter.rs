use std::fmt;
use std::rc::Rc;

use crate::errors::*;
use crate::gles::consts::DYNAMIC_DRAW;
use crate::gles::engine::GLEngine;
use crate::identity::{Identifiable, Shared};
use crate::materials::material::Material;
use crate::math::prelude::*;
use crate::mesh::mesh::Mesh;
use crate::mesh::vertex_array::VertexContent;
use crate::scene::bounding::BoundingVolume;

use super::behaviour::ParticleBehaviour;
use super::particle::MeshParticle;

/// Settings of a `MeshParticleEmitter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterParams {
    /// The most particles alive at once. Unbounded if `None`.
    pub maximum_particle_capacity: Option<usize>,
    /// The number of particle slots added each time the emitter runs out of them.
    pub particle_capacity_expansion_increment: usize,
    /// Particles emitted per second while playing. Zero disables automatic emission.
    pub emission_rate: f32,
    /// Seconds of emission after `play` before the emitter pauses itself. Forever if
    /// `None`.
    pub emission_duration: Option<f32>,
    /// Whether particles are transformed while the emitter is outside the frustum.
    /// Ignored if the bounding volume is fixed.
    pub should_transform_unseen_particles: bool,
    pub behaviour: ParticleBehaviour,
}

impl Default for EmitterParams {
    fn default() -> Self {
        EmitterParams {
            maximum_particle_capacity: None,
            particle_capacity_expansion_increment: 100,
            emission_rate: 0.0,
            emission_duration: None,
            should_transform_unseen_particles: true,
            behaviour: ParticleBehaviour::Persistent,
        }
    }
}

impl EmitterParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Picks the template mesh of the `n`th particle emitted. `None` falls back to the
/// template of the emitter.
#[derive(Clone)]
pub struct TemplateSelector(Rc<dyn Fn(usize) -> Option<Shared<Mesh>>>);

impl fmt::Debug for TemplateSelector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TemplateSelector")
    }
}

/// Merges many small meshes into one vertex array, drawn with a single call.
///
/// Every particle copies a template mesh into its own range of the combined mesh, and
/// is moved by rewriting its vertices on the CPU. Ranges are never compacted: a dead
/// particle collapses its vertices into a point and leaves its range to the next
/// particle emitted into its slot.
#[derive(Debug)]
pub struct MeshParticleEmitter {
    params: EmitterParams,
    mesh: Mesh,
    material: Option<Shared<Material>>,
    template: Option<Shared<Mesh>>,
    selector: Option<TemplateSelector>,
    indexed: Option<bool>,

    particles: Vec<MeshParticle>,
    current_capacity: usize,
    vertex_high_water: usize,
    index_high_water: usize,

    is_emitting: bool,
    has_played: bool,
    elapsed: f32,
    emission_credit: f32,
    emitted: usize,

    is_particle_transform_dirty: bool,
    fixed_bounds: Option<Aabb3>,
    bounds: Option<Aabb3>,
}

impl Default for MeshParticleEmitter {
    fn default() -> Self {
        MeshParticleEmitter::new(EmitterParams::default())
    }
}

impl MeshParticleEmitter {
    pub fn new(params: EmitterParams) -> Self {
        let mut mesh = Mesh::new(Some("particles"));
        mesh.set_buffer_usage(DYNAMIC_DRAW);

        MeshParticleEmitter {
            params,
            mesh,
            material: None,
            template: None,
            selector: None,
            indexed: None,

            particles: Vec::new(),
            current_capacity: 0,
            vertex_high_water: 0,
            index_high_water: 0,

            is_emitting: false,
            has_played: false,
            elapsed: 0.0,
            emission_credit: 0.0,
            emitted: 0,

            is_particle_transform_dirty: false,
            fixed_bounds: None,
            bounds: None,
        }
    }

    /// An emitter with the same settings, templates and material, and no particles.
    pub fn copy(&self) -> Self {
        let mut mesh = Mesh::new(self.mesh.name());
        mesh.set_buffer_usage(DYNAMIC_DRAW);
        mesh.set_draw_mode(self.mesh.draw_mode());
        mesh.set_vertex_content(self.mesh.vertex_content());

        MeshParticleEmitter {
            params: self.params.clone(),
            mesh,
            material: self.material.clone(),
            template: self.template.clone(),
            selector: self.selector.clone(),
            indexed: None,
            fixed_bounds: self.fixed_bounds,
            ..MeshParticleEmitter::default()
        }
    }

    #[inline]
    pub fn params(&self) -> &EmitterParams {
        &self.params
    }

    pub fn set_behaviour(&mut self, behaviour: ParticleBehaviour) {
        self.params.behaviour = behaviour;
    }

    /// The combined mesh of every particle.
    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[inline]
    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    #[inline]
    pub fn material(&self) -> Option<&Shared<Material>> {
        self.material.as_ref()
    }

    pub fn set_material(&mut self, material: Option<Shared<Material>>) {
        self.material = material;
    }

    #[inline]
    pub fn particle_template_mesh(&self) -> Option<&Shared<Mesh>> {
        self.template.as_ref()
    }

    pub fn set_particle_template_mesh(&mut self, template: Option<Shared<Mesh>>) {
        self.template = template;
    }

    /// Picks the template of each emitted particle, for emitters that draw from a
    /// pool of meshes.
    pub fn set_template_selector<F>(&mut self, selector: F)
    where
        F: Fn(usize) -> Option<Shared<Mesh>> + 'static,
    {
        self.selector = Some(TemplateSelector(Rc::new(selector)));
    }

    pub fn clear_template_selector(&mut self) {
        self.selector = None;
    }

    #[inline]
    pub fn vertex_content(&self) -> VertexContent {
        self.mesh.vertex_content()
    }

    /// Sets the content of the combined mesh. If left empty, the content of the first
    /// template emitted is used. Skinning content is never carried.
    pub fn set_vertex_content(&mut self, content: VertexContent) {
        let content = content - (VertexContent::MATRIX_INDICES | VertexContent::WEIGHTS);
        self.mesh.set_vertex_content(content);
        for p in &mut self.particles {
            p.has_color = content.contains(VertexContent::COLOR);
        }
    }

    // Emission schedule.

    #[inline]
    pub fn emission_rate(&self) -> f32 {
        self.params.emission_rate
    }

    pub fn set_emission_rate(&mut self, rate: f32) {
        self.params.emission_rate = rate.max(0.0);
    }

    /// Seconds between two emissions. Infinite if the rate is zero.
    pub fn emission_interval(&self) -> f32 {
        if self.params.emission_rate > 0.0 {
            1.0 / self.params.emission_rate
        } else {
            ::std::f32::INFINITY
        }
    }

    pub fn set_emission_interval(&mut self, interval: f32) {
        self.params.emission_rate = if interval > 0.0 && interval.is_finite() {
            1.0 / interval
        } else {
            0.0
        };
    }

    #[inline]
    pub fn emission_duration(&self) -> Option<f32> {
        self.params.emission_duration
    }

    pub fn set_emission_duration(&mut self, duration: Option<f32>) {
        self.params.emission_duration = duration;
    }

    /// Seconds since the last `play`.
    #[inline]
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed
    }

    #[inline]
    pub fn should_transform_unseen_particles(&self) -> bool {
        self.params.should_transform_unseen_particles
    }

    pub fn set_should_transform_unseen_particles(&mut self, v: bool) {
        self.params.should_transform_unseen_particles = v;
    }

    /// Starts or restarts automatic emission.
    pub fn play(&mut self) {
        self.is_emitting = true;
        self.has_played = true;
        self.elapsed = 0.0;
        self.emission_credit = 0.0;
    }

    /// Stops automatic emission. Live particles keep moving.
    pub fn pause(&mut self) {
        self.is_emitting = false;
    }

    /// Stops automatic emission and removes every particle.
    pub fn stop(&mut self) {
        self.pause();
        self.remove_all_particles();
    }

    #[inline]
    pub fn is_emitting(&self) -> bool {
        self.is_emitting
    }

    /// True while emitting, or while any particle is alive.
    pub fn is_active(&self) -> bool {
        self.is_emitting || self.particle_count() > 0
    }

    /// True once an emitter that was played is no longer active.
    pub fn is_finished(&self) -> bool {
        self.has_played && !self.is_active()
    }

    // Capacity.

    #[inline]
    pub fn maximum_particle_capacity(&self) -> Option<usize> {
        self.params.maximum_particle_capacity
    }

    pub fn set_maximum_particle_capacity(&mut self, max: Option<usize>) {
        self.params.maximum_particle_capacity = max;
    }

    /// The number of particle slots allocated so far.
    #[inline]
    pub fn current_particle_capacity(&self) -> usize {
        self.current_capacity
    }

    #[inline]
    pub fn particle_capacity_expansion_increment(&self) -> usize {
        self.params.particle_capacity_expansion_increment
    }

    pub fn set_particle_capacity_expansion_increment(&mut self, n: usize) {
        self.params.particle_capacity_expansion_increment = n;
    }

    /// True once the number of live particles reaches the maximum capacity.
    pub fn is_full(&self) -> bool {
        match self.params.maximum_particle_capacity {
            Some(max) => self.particle_count() >= max,
            None => false,
        }
    }

    // Emission.

    /// Reserves a slot for a particle of the next template, reusing the range of a
    /// dead particle if one fits. Returns `None` if the emitter is at capacity.
    pub fn acquire_particle(&mut self) -> Option<usize> {
        let template = self.select_template(None)?;
        self.reserve(&template)
    }

    /// Emits a particle from the template of the emitter. Returns its slot.
    pub fn emit(&mut self) -> Option<usize> {
        let slot = self.acquire_particle()?;
        self.activate(slot)
    }

    /// Emits up to `count` particles, and returns the number emitted. Stops at the first
    /// particle that cannot be emitted.
    pub fn emit_particles(&mut self, count: usize) -> usize {
        let mut n = 0;
        while n < count && self.emit().is_some() {
            n += 1;
        }

        n
    }

    /// Emits a particle built by the caller. Its location, rotation, scale, color and
    /// lifetime are kept. Its template, if any, replaces the template of the emitter.
    pub fn emit_particle(&mut self, particle: MeshParticle) -> Option<usize> {
        let template = self.select_template(particle.template().cloned())?;
        let slot = self.reserve(&template)?;
        self.particles[slot].take_state_from(particle);
        self.particles[slot].set_template(Some(template));
        self.activate(slot)
    }

    fn select_template(&self, given: Option<Shared<Mesh>>) -> Option<Shared<Mesh>> {
        let template = given
            .or_else(|| self.selector.as_ref().and_then(|f| (f.0)(self.emitted)))
            .or_else(|| self.template.clone());

        if template.is_none() {
            warn!("Particle emitter has no template mesh to emit.");
        }

        template
    }

    fn reserve(&mut self, template: &Shared<Mesh>) -> Option<usize> {
        let (vertices, indices) = {
            let t = template.borrow();
            if !self.adopt(&t) {
                return None;
            }

            let indices = if self.indexed == Some(true) {
                if t.has_indices() {
                    t.vertex_index_count()
                } else {
                    t.vertex_count()
                }
            } else {
                0
            };

            (t.vertex_count(), indices)
        };

        let reusable = self.particles.iter().position(|p| {
            !p.is_alive
                && p.vertex_count == 0
                && p.vertex_capacity >= vertices
                && p.vertex_index_capacity >= indices
        });

        let slot = match reusable {
            Some(slot) => slot,
            None => self.make_particle(vertices, indices)?,
        };

        let has_color = self.mesh.has_vertex_content(VertexContent::COLOR);
        let p = &mut self.particles[slot];
        p.reset_for_reuse();
        p.set_template(Some(template.clone()));
        p.has_color = has_color;
        Some(slot)
    }

    /// Takes the content of the first template if the emitter has none yet.
    fn adopt(&mut self, template: &Mesh) -> bool {
        if self.mesh.vertex_content().is_empty() {
            self.set_vertex_content(template.vertex_content());
            self.mesh.set_draw_mode(template.draw_mode());
        }

        if self.indexed.is_none() {
            self.indexed = Some(template.has_indices());
            let units = template.texture_unit_count();
            while self.mesh.texture_unit_count() > 0 && self.mesh.texture_unit_count() < units {
                self.mesh.add_texture_unit();
            }
        }

        if template.has_indices() && self.indexed == Some(false) {
            warn!(
                "Template {} is indexed, but the particle emitter is not.",
                template.describe()
            );
            return false;
        }

        true
    }

    fn make_particle(&mut self, vertices: usize, indices: usize) -> Option<usize> {
        if self.particles.len() >= self.current_capacity && !self.grow(vertices, indices) {
            info!(
                "Particle emitter is at its capacity of {} particles.",
                self.current_capacity
            );
            return None;
        }

        let first_vertex = self.vertex_high_water;
        let first_index = self.index_high_water;
        if self.indexed == Some(true) && first_vertex + vertices > ::std::u16::MAX as usize + 1 {
            warn!("Particle vertices overflow the 16 bit vertex indices.");
            return None;
        }

        self.vertex_high_water += vertices;
        self.index_high_water += indices;
        self.reserve_storage(0, vertices, indices);

        let slot = self.particles.len();
        self.particles.push(MeshParticle {
            slot,
            first_vertex_offset: first_vertex,
            vertex_capacity: vertices,
            first_vertex_index_offset: first_index,
            vertex_index_capacity: indices,
            ..MeshParticle::default()
        });

        Some(slot)
    }

    /// Adds particle slots, up to the maximum capacity.
    fn grow(&mut self, vertices: usize, indices: usize) -> bool {
        let mut capacity = self.current_capacity + self.params.particle_capacity_expansion_increment.max(1);
        if let Some(max) = self.params.maximum_particle_capacity {
            if self.current_capacity >= max {
                return false;
            }

            capacity = capacity.min(max);
        }

        let extra = capacity - self.particles.len();
        self.current_capacity = capacity;
        self.reserve_storage(extra, vertices, indices);
        true
    }

    /// Sizes the combined mesh for `slots` more particles of the given size past the
    /// high water marks.
    fn reserve_storage(&mut self, slots: usize, vertices: usize, indices: usize) {
        let v = self.vertex_high_water + slots * vertices;
        if v > self.mesh.vertex_count() {
            self.mesh.set_vertex_count(v);
        }

        let i = self.index_high_water + slots * indices;
        if i > self.mesh.vertex_index_count() {
            self.mesh.set_vertex_index_count(i);
        }
    }

    fn activate(&mut self, slot: usize) -> Option<usize> {
        {
            let p = &mut self.particles[slot];
            p.is_alive = true;
            self.params.behaviour.initialize(p);
            if !p.is_alive {
                return None;
            }
        }

        self.copy_template(slot);
        self.emitted += 1;
        self.is_particle_transform_dirty = true;
        Some(slot)
    }

    /// Copies the attributes of the template that the transform pass does not write.
    fn copy_template(&mut self, slot: usize) {
        let p = &mut self.particles[slot];
        let template = match p.template() {
            Some(v) => v.clone(),
            None => return,
        };

        let t = template.borrow();
        let mesh = &mut self.mesh;
        let first = p.first_vertex_offset;
        p.vertex_count = t.vertex_count();

        if mesh.has_vertex_content(VertexContent::COLOR) {
            let has_colors = t.has_vertex_content(VertexContent::COLOR);
            for i in 0..p.vertex_count {
                let c = if has_colors {
                    t.vertex_color4b_at(i)
                } else {
                    p.color4b()
                };

                mesh.set_vertex_color4b_at(first + i, c);
            }
        }

        if let Some(last) = t.texture_unit_count().checked_sub(1) {
            for unit in 0..mesh.texture_unit_count() {
                for i in 0..p.vertex_count {
                    let uv = t.vertex_texcoord_at(i, unit.min(last));
                    mesh.set_vertex_texcoord_at(first + i, unit, uv);
                }
            }
        }

        if self.indexed == Some(true) {
            let start = p.first_vertex_index_offset;
            p.vertex_index_count = if t.has_indices() {
                t.vertex_index_count()
            } else {
                p.vertex_count
            };

            for k in 0..p.vertex_index_capacity {
                let v = if k >= p.vertex_index_count {
                    0
                } else if t.has_indices() {
                    t.vertex_index_at(k)
                } else {
                    k
                };

                mesh.set_vertex_index_at(start + k, first + v);
            }
        }

        p.is_transform_dirty = true;
    }

    // Access.

    /// The live particles, in slot order.
    pub fn particles(&self) -> impl Iterator<Item = &MeshParticle> {
        self.particles.iter().filter(|p| p.is_alive)
    }

    /// The number of live particles.
    pub fn particle_count(&self) -> usize {
        self.particles().count()
    }

    /// The `index`th live particle.
    pub fn particle_at(&self, index: usize) -> Option<&MeshParticle> {
        self.particles().nth(index)
    }

    /// The particle in `slot`, dead or alive.
    pub fn particle(&self, slot: usize) -> Option<&MeshParticle> {
        self.particles.get(slot)
    }

    /// Mutable access to the particle in `slot`. The emitter assumes it was moved.
    pub fn particle_mut(&mut self, slot: usize) -> Option<&mut MeshParticle> {
        self.is_particle_transform_dirty = true;
        self.particles.get_mut(slot)
    }

    /// The live particle that owns vertex `index` of the combined mesh.
    pub fn particle_with_vertex_at(&self, index: usize) -> Option<&MeshParticle> {
        self.particles().find(|p| p.vertex_range().contains(&index))
    }

    /// The live particle that owns element `index` of the combined mesh. Elements are
    /// vertex indices if the emitter is indexed, and vertices otherwise.
    pub fn particle_with_vertex_index_at(&self, index: usize) -> Option<&MeshParticle> {
        if self.indexed == Some(true) {
            self.particles().find(|p| p.vertex_index_range().contains(&index))
        } else {
            self.particle_with_vertex_at(index)
        }
    }

    /// The live particle that draws face `face` of the combined mesh.
    pub fn particle_with_face_at(&self, face: usize) -> Option<&MeshParticle> {
        let element = self.mesh.draw_mode().first_element_of_face(face);
        self.particle_with_vertex_index_at(element)
    }

    /// Removes the particle in `slot` at once. Its range is kept for reuse.
    pub fn remove_particle(&mut self, slot: usize) {
        if slot < self.particles.len() && self.particles[slot].vertex_count > 0 {
            self.retire(slot);
        }
    }

    pub fn remove_all_particles(&mut self) {
        for slot in 0..self.particles.len() {
            self.remove_particle(slot);
        }
    }

    /// Collapses the range of a particle into one point so it draws nothing.
    fn retire(&mut self, slot: usize) {
        let p = &mut self.particles[slot];
        p.is_alive = false;
        p.vertex_count = 0;
        p.vertex_index_count = 0;

        if p.vertex_capacity > 0 && self.mesh.has_vertex_content(VertexContent::LOCATION) {
            let first = p.first_vertex_offset;
            let point = self.mesh.vertex_location_at(first);
            for i in first + 1..first + p.vertex_capacity {
                self.mesh.set_vertex_location_at(i, point);
            }
        }

        self.is_particle_transform_dirty = true;
    }

    // Updates.

    /// Advances the particles and the emission schedule by `dt` seconds. Particles
    /// that died are retired before new ones are emitted.
    pub fn update(&mut self, dt: f32) {
        let behaviour = &self.params.behaviour;
        for p in self.particles.iter_mut().filter(|p| p.is_alive) {
            behaviour.update(p, dt);
        }

        for slot in 0..self.particles.len() {
            let p = &self.particles[slot];
            if !p.is_alive && p.vertex_count > 0 {
                self.retire(slot);
            } else if p.is_transform_dirty || p.is_color_dirty {
                self.is_particle_transform_dirty = true;
            }
        }

        if !self.is_emitting {
            return;
        }

        self.elapsed += dt;
        if let Some(duration) = self.params.emission_duration {
            if self.elapsed > duration {
                self.pause();
                return;
            }
        }

        if self.params.emission_rate > 0.0 {
            self.emission_credit += dt * self.params.emission_rate;
            let n = self.emission_credit.floor();
            self.emission_credit -= n;
            self.emit_particles(n as usize);
        }
    }

    #[inline]
    pub fn is_particle_transform_dirty(&self) -> bool {
        self.is_particle_transform_dirty
    }

    pub fn mark_particle_transform_dirty(&mut self) {
        self.is_particle_transform_dirty = true;
    }

    /// Writes the transformed vertices and colors of every dirty particle into the
    /// combined mesh, and refreshes the bounds. Skipped out of view if the bounds are
    /// fixed, or if unseen particles should not be transformed. Returns the number of
    /// particles transformed.
    pub fn transform_particles(&mut self, in_view: bool) -> usize {
        if !self.is_particle_transform_dirty {
            return 0;
        }

        if !in_view
            && (self.fixed_bounds.is_some() || !self.params.should_transform_unseen_particles)
        {
            return 0;
        }

        let mut n = 0;
        let mesh = &mut self.mesh;
        for p in self.particles.iter_mut().filter(|p| p.is_alive) {
            if p.is_transform_dirty {
                transform_vertices(mesh, p);
                n += 1;
            }

            if p.is_color_dirty {
                transform_vertex_colors(mesh, p);
            }
        }

        self.is_particle_transform_dirty = false;
        if self.fixed_bounds.is_none() {
            self.bounds = self.measure();
        }

        n
    }

    fn measure(&self) -> Option<Aabb3> {
        if !self.mesh.has_vertex_content(VertexContent::LOCATION) {
            return None;
        }

        let mesh = &self.mesh;
        Aabb3::from_points(
            self.particles()
                .flat_map(|p| p.vertex_range())
                .map(|i| mesh.vertex_location_at(i)),
        )
    }

    // Bounds.

    /// The box around every live particle, as of the last transform pass.
    pub fn bounding_box(&self) -> Option<Aabb3> {
        self.fixed_bounds.or(self.bounds)
    }

    #[inline]
    pub fn fixed_bounding_box(&self) -> Option<Aabb3> {
        self.fixed_bounds
    }

    /// Declares a box that holds every path a particle may take. Particles are then
    /// never transformed out of view.
    pub fn set_fixed_bounding_box(&mut self, bounds: Option<Aabb3>) {
        self.fixed_bounds = bounds;
    }

    pub fn bounding_volume(&self) -> BoundingVolume {
        match self.bounding_box() {
            Some(b) => BoundingVolume::sphere_and_box(b),
            None => BoundingVolume::None,
        }
    }

    // Drawing.

    /// The number of elements covered by one draw of every particle.
    pub fn drawn_element_count(&self) -> usize {
        if self.indexed == Some(true) {
            self.index_high_water
        } else {
            self.vertex_high_water
        }
    }

    /// Draws every live particle with one call. The mesh must already be bound.
    pub fn draw(&self, engine: &mut GLEngine) {
        if self.particle_count() > 0 {
            self.mesh.draw_range(engine, 0, self.drawn_element_count());
        }
    }
}

fn transform_vertices(mesh: &mut Mesh, p: &mut MeshParticle) {
    p.is_transform_dirty = false;
    let template = match p.template() {
        Some(v) => v.clone(),
        None => return,
    };

    let t = template.borrow();
    if p.vertex_count == 0 || !mesh.has_vertex_content(VertexContent::LOCATION) {
        return;
    }

    let m = p.transform();
    let first = p.first_vertex_offset;
    for i in 0..p.vertex_count {
        mesh.set_vertex_location_at(first + i, m.transform_point(t.vertex_location_at(i)));
    }

    let point = mesh.vertex_location_at(first);
    for i in p.vertex_count..p.vertex_capacity {
        mesh.set_vertex_location_at(first + i, point);
    }

    if mesh.has_vertex_content(VertexContent::NORMAL) && t.has_vertex_content(VertexContent::NORMAL) {
        let rotation = p.rotator().to_matrix();
        let uniform = p.is_uniformly_scaled();
        let s = p.scale();
        let inv = Vector3::new(1.0 / s.x, 1.0 / s.y, 1.0 / s.z);

        for i in 0..p.vertex_count {
            let n = t.vertex_normal_at(i);
            let n = if uniform {
                rotation * n
            } else {
                (rotation * n.mul_element_wise(inv)).normalize()
            };

            mesh.set_vertex_normal_at(first + i, n);
        }
    }
}

fn transform_vertex_colors(mesh: &mut Mesh, p: &mut MeshParticle) {
    p.is_color_dirty = false;
    if !mesh.has_vertex_content(VertexContent::COLOR) {
        return;
    }

    let c = p.color4b();
    for i in p.vertex_range() {
        mesh.set_vertex_color4b_at(i, c);
    }
}

#[cfg(test)]
mod test {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::gles::EngineParams;
    use crate::mesh::mesh::DrawMode;

    fn triangle() -> Shared<Mesh> {
        let mut mesh = Mesh::new(Some("triangle"));
        mesh.set_vertex_content(VertexContent::LOCATION | VertexContent::NORMAL);
        mesh.set_vertex_count(3);
        mesh.set_vertex_location_at(0, Point3::new(0.0, 0.0, 0.0));
        mesh.set_vertex_location_at(1, Point3::new(1.0, 0.0, 0.0));
        mesh.set_vertex_location_at(2, Point3::new(0.0, 1.0, 0.0));
        for i in 0..3 {
            mesh.set_vertex_normal_at(i, Vector3::unit_z());
        }

        Rc::new(RefCell::new(mesh))
    }

    fn emitter(params: EmitterParams) -> MeshParticleEmitter {
        let mut e = MeshParticleEmitter::new(params);
        e.set_particle_template_mesh(Some(triangle()));
        e
    }

    #[test]
    fn emit_and_transform() {
        let mut e = emitter(EmitterParams::default());
        assert_eq!(e.emit(), Some(0));
        assert_eq!(e.emit(), Some(1));
        assert_eq!(e.vertex_content(), VertexContent::LOCATION | VertexContent::NORMAL);
        assert_eq!(e.current_particle_capacity(), 100);
        assert_eq!(e.drawn_element_count(), 6);

        {
            let p = e.particle_mut(1).unwrap();
            p.set_location(Vector3::new(0.0, 0.0, -5.0));
            p.set_rotation_axis_angle(Vector3::unit_y(), Deg(90.0));
        }

        assert_eq!(e.transform_particles(true), 2);
        assert_ulps_eq!(e.mesh().vertex_location_at(4), Point3::new(0.0, 0.0, -6.0), epsilon = 1e-5);
        assert_ulps_eq!(e.mesh().vertex_normal_at(4), Vector3::unit_x(), epsilon = 1e-5);

        let b = e.bounding_box().unwrap();
        assert_ulps_eq!(b.min, Point3::new(0.0, 0.0, -6.0), epsilon = 1e-5);
        assert_ulps_eq!(b.max, Point3::new(1.0, 1.0, 0.0), epsilon = 1e-5);

        // Nothing moved since.
        assert_eq!(e.transform_particles(true), 0);
    }

    #[test]
    fn lookups() {
        let mut e = emitter(EmitterParams::default());
        e.emit_particles(3);

        assert_eq!(e.particle_with_vertex_at(4).map(|p| p.slot()), Some(1));
        assert_eq!(e.particle_with_face_at(2).map(|p| p.slot()), Some(2));
        assert!(e.particle_with_vertex_at(9).is_none());

        e.remove_particle(1);
        assert!(e.particle_with_vertex_at(4).is_none());
        assert_eq!(e.particle_at(1).map(|p| p.slot()), Some(2));
        assert_eq!(e.particle_count(), 2);

        // Removing twice is harmless.
        e.remove_particle(1);
        assert_eq!(e.particle_count(), 2);
    }

    #[test]
    fn retire_collapses_range() {
        let mut e = emitter(EmitterParams::default());
        e.emit_particles(2);
        e.transform_particles(true);

        e.remove_particle(0);
        let p = e.mesh().vertex_location_at(0);
        assert_eq!(e.mesh().vertex_location_at(1), p);
        assert_eq!(e.mesh().vertex_location_at(2), p);

        // The range of slot 0 goes to the next particle.
        assert_eq!(e.emit(), Some(0));
        assert_eq!(e.drawn_element_count(), 6);
    }

    #[test]
    fn capacity() {
        let params = EmitterParams {
            maximum_particle_capacity: Some(5),
            particle_capacity_expansion_increment: 2,
            ..EmitterParams::default()
        };

        let mut e = emitter(params);
        e.emit();
        assert_eq!(e.current_particle_capacity(), 2);
        assert_eq!(e.emit_particles(10), 4);
        assert_eq!(e.current_particle_capacity(), 5);
        assert!(e.is_full());
        assert!(e.acquire_particle().is_none());

        e.remove_particle(3);
        assert!(!e.is_full());
        assert_eq!(e.emit(), Some(3));
    }

    #[test]
    fn stops_without_template() {
        let mut e = MeshParticleEmitter::new(EmitterParams::default());
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        e.set_template_selector(move |_| {
            counter.set(counter.get() + 1);
            None
        });

        assert_eq!(e.emit_particles(10), 0);
        assert_eq!(attempts.get(), 1);
        assert_eq!(e.particle_count(), 0);

        e.set_particle_template_mesh(Some(triangle()));
        assert_eq!(e.emit_particles(10), 10);
        assert_eq!(attempts.get(), 11);
    }

    #[test]
    fn indexed_templates() {
        let mut quad = Mesh::new(Some("quad"));
        quad.set_vertex_content(VertexContent::LOCATION);
        quad.set_vertex_count(4);
        quad.set_vertex_index_count(6);
        for (k, &v) in [0, 1, 2, 2, 1, 3].iter().enumerate() {
            quad.set_vertex_index_at(k, v);
        }

        let mut e = MeshParticleEmitter::default();
        e.set_particle_template_mesh(Some(Rc::new(RefCell::new(quad))));
        e.emit_particles(2);

        assert!(e.mesh().has_indices());
        assert_eq!(e.drawn_element_count(), 12);
        assert_eq!(e.mesh().vertex_index_at(11), 7);
        assert_eq!(e.particle_with_vertex_index_at(7).map(|p| p.slot()), Some(1));
        assert_eq!(e.particle_with_face_at(1).map(|p| p.slot()), Some(0));

        // Non-indexed templates are drawn through sequential indices.
        let p = MeshParticle::with_template(triangle());
        let slot = e.emit_particle(p).unwrap();
        assert_eq!(e.particle(slot).map(|p| p.vertex_index_range()), Some(12..15));
        assert_eq!(e.mesh().vertex_index_at(14), 10);
    }

    #[test]
    fn template_selector() {
        let pool = vec![triangle(), triangle()];
        let picked = pool.clone();

        let mut e = MeshParticleEmitter::default();
        e.set_template_selector(move |n| Some(picked[n % 2].clone()));
        e.emit_particles(3);

        let templates: Vec<_> = e.particles().filter_map(|p| p.template().cloned()).collect();
        assert!(Rc::ptr_eq(&templates[0], &pool[0]));
        assert!(Rc::ptr_eq(&templates[1], &pool[1]));
        assert!(Rc::ptr_eq(&templates[2], &pool[0]));
    }

    #[test]
    fn unseen_particles() {
        let mut e = emitter(EmitterParams {
            should_transform_unseen_particles: false,
            ..EmitterParams::default()
        });

        e.emit();
        assert_eq!(e.transform_particles(false), 0);
        assert!(e.is_particle_transform_dirty());
        assert_eq!(e.transform_particles(true), 1);

        e.set_should_transform_unseen_particles(true);
        e.set_fixed_bounding_box(Some(Aabb3::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        )));
        e.particle_mut(0).unwrap().translate_by(Vector3::unit_x());
        assert_eq!(e.transform_particles(false), 0);
    }

    #[test]
    fn colors() {
        let mut e = emitter(EmitterParams::default());
        e.set_vertex_content(VertexContent::LOCATION | VertexContent::COLOR);
        e.emit();

        e.particle_mut(0).unwrap().set_color4b(Color4B::new(255, 0, 0, 128));
        e.transform_particles(true);
        for i in 0..3 {
            assert_eq!(e.mesh().vertex_color4b_at(i), Color4B::new(255, 0, 0, 128));
        }
    }

    #[test]
    fn schedule() {
        let mut e = emitter(EmitterParams {
            emission_rate: 10.0,
            emission_duration: Some(1.0),
            behaviour: ParticleBehaviour::Lifetime { lifetime: 0.25 },
            ..EmitterParams::default()
        });

        assert!(!e.is_active());
        e.play();
        e.update(0.25);
        assert_eq!(e.particle_count(), 2);
        assert!(e.is_active());

        e.update(0.5);
        assert_eq!(e.particle_count(), 5);

        e.update(0.5);
        assert!(!e.is_emitting());
        e.update(0.5);
        assert_eq!(e.particle_count(), 0);
        assert!(e.is_finished());
    }

    #[test]
    fn draw_once() {
        let mut e = emitter(EmitterParams::default());
        e.set_vertex_content(VertexContent::LOCATION);
        e.emit_particles(4);
        e.remove_particle(3);

        let (mut engine, probe) = GLEngine::headless(EngineParams::default());
        e.mesh().bind(&mut engine, 0);
        e.draw(&mut engine);

        let draws = probe.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].count, 12);
        assert_eq!(e.mesh().draw_mode(), DrawMode::Triangles);
    }

    #[test]
    fn copy() {
        let mut e = emitter(EmitterParams::default());
        e.emit_particles(3);

        let c = e.copy();
        assert_eq!(c.particle_count(), 0);
        assert_eq!(c.params(), e.params());
        assert_eq!(c.vertex_content(), e.vertex_content());
    }

    #[test]
    fn params_from_json() {
        let params = EmitterParams::from_json_str(
            r#"{ "maximum_particle_capacity": 50, "emission_rate": 20.0 }"#,
        )
        .unwrap();

        assert_eq!(params.maximum_particle_capacity, Some(50));
        assert_eq!(params.particle_capacity_expansion_increment, 100);
        assert!(params.should_transform_unseen_particles);
    }
}
