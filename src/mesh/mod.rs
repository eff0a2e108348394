//! Vertex arrays, meshes and the generators that populate them.

pub mod font;
pub mod mesh;
pub mod parametric;
pub mod vertex_array;

pub mod prelude {
    pub use super::font::{BitmapFont, Glyph, TextAlignment};
    pub use super::mesh::{DrawMode, Mesh, TexCoords};
    pub use super::parametric::BoxTextureLayout;
    pub use super::vertex_array::{VertexArray, VertexContent};
}
