//! Vertex skinning.
//!
//! A soft body node roots a subtree with bones and skin nodes. A skin node is a mesh
//! node whose mesh carries matrix indices and weights per vertex, split into skin
//! sections. Each section is drawn with one call, after the transform of each of its
//! bones has been loaded into the matrix palette.
//!
//! For a vertex `v` influenced by bones `B` with weights `w`, the deformed vertex is
//! `sum(w * B * Brsb^-1 * Msb * v)`, where `Brsb^-1` is the inverse of the bone
//! relative to the soft body, and `Msb` the skin node relative to the soft body, both
//! recorded once by `Scene::bind_rest_pose`. Moving the soft body itself never requires
//! a rebind.

pub mod bone;
pub mod palette;
pub mod section;
pub mod skeleton;
pub mod skin_mesh;

pub use self::bone::{Bone, SkinnedBone};
pub use self::section::SkinSection;
pub use self::skin_mesh::SkinMesh;

pub mod prelude {
    pub use super::bone::{Bone, SkinnedBone};
    pub use super::palette::{FixedPalette, PaletteBackend, UniformPalette};
    pub use super::section::SkinSection;
    pub use super::skin_mesh::SkinMesh;
}
