//! Textures, texture units and materials.
//!
//! A `Material` owns an ordered list of `TextureUnit`s. The first unit binds to GL
//! texture unit 0, the second to unit 1, and so forth. Textures are shared with
//! `Shared<Texture>` and are usually looked up through a `TextureCache`.

pub mod cache;
pub mod material;
pub mod texture;
pub mod texture_unit;

pub mod prelude {
    pub use super::cache::{ImageFileLoader, TextureCache, TextureFileLoader};
    pub use super::material::{AlphaFunc, BlendFunc, Material};
    pub use super::texture::{
        Texture, TextureFilter, TextureImage, TextureKind, TextureParams, TextureWrap,
    };
    pub use super::texture_unit::{TextureEnvMode, TextureUnit};
}
