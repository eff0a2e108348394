//! Surfaces that can be rendered into.
//!
//! A `Framebuffer` has color, depth and stencil slots, each holding either a
//! `Renderbuffer` or a face of a `Texture`. Attachments are shared, so one depth buffer
//! can serve several surfaces. The `ViewSurfaceManager` owns the surfaces tied to the
//! window and keeps them the size of the view.

pub mod attachment;
pub mod env_map;
pub mod framebuffer;
pub mod view;

pub mod prelude {
    pub use super::attachment::{Attachment, Renderbuffer, TextureAttachment};
    pub use super::env_map::EnvironmentMap;
    pub use super::framebuffer::{fill_color, Framebuffer, RenderSurface};
    pub use super::view::{ViewSurfaceManager, ViewSurfaceParams};
}
