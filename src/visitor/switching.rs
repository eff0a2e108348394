use crate::identity::Tag;

/// Remembers the mesh and material bound last, so consecutive nodes that share them
/// skip rebinding.
///
/// The cache is owned by a visitor and lives for one visit. It must be reset whenever
/// GL state may have been changed behind its back, which `DrawingVisitor` does at the
/// start of every visit.
#[derive(Debug, Default, Clone)]
pub struct SwitchCache {
    mesh: Option<(Tag, usize)>,
    // `Some(None)` records that the last node drew without a material.
    material: Option<Option<Tag>>,
    mesh_binds: usize,
    material_binds: usize,
}

impl SwitchCache {
    pub fn new() -> Self {
        SwitchCache::default()
    }

    /// Forgets what was bound last. The counters are kept.
    pub fn reset_switching(&mut self) {
        self.mesh = None;
        self.material = None;
    }

    /// Returns true if the mesh `tag`, bound with `texture_units` coordinate units,
    /// needs to be bound.
    pub fn switch_mesh(&mut self, tag: Tag, texture_units: usize) -> bool {
        if self.mesh == Some((tag, texture_units)) {
            return false;
        }

        self.mesh = Some((tag, texture_units));
        self.mesh_binds += 1;
        true
    }

    /// Returns true if the material `tag` needs to be bound. `None` stands for
    /// drawing without a material.
    pub fn switch_material(&mut self, tag: Option<Tag>) -> bool {
        if self.material == Some(tag) {
            return false;
        }

        self.material = Some(tag);
        self.material_binds += 1;
        true
    }

    /// Forces the next mesh to be bound.
    pub fn forget_mesh(&mut self) {
        self.mesh = None;
    }

    /// Forces the next material to be bound.
    pub fn forget_material(&mut self) {
        self.material = None;
    }

    #[inline]
    pub fn mesh_binds(&self) -> usize {
        self.mesh_binds
    }

    #[inline]
    pub fn material_binds(&self) -> usize {
        self.material_binds
    }
}
