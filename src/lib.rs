//! # What is This?
//!
//! Pastel is the rendering substrate of a small 3d scene framework. It turns a scene
//! graph into a stream of correctly-ordered, minimally-redundant OpenGL commands that
//! share one context with a 2d overlay.
//!
//! The major parts are:
//!
//! - `gles`: a state tracker that wraps every mutable piece of GL state, with original-value
//! policies and an `open`/`close` transaction around each frame;
//! - `surfaces`: framebuffers, renderbuffers, texture attachments, multisample resolve and
//! cube-map environment capture;
//! - `materials` and `mesh`: textures, texture units, materials, vertex arrays and parametric
//! mesh generators;
//! - `skinning`: bones, soft bodies, skin sections and CPU deformed-face queries;
//! - `particles`: mesh particles merged into one vertex buffer and drawn with one call;
//! - `scene` and `visitor`: the node arena, culling, the per-frame drawing visitor and
//! color-buffer picking.
//!
//! Everything runs on the rendering thread. GL state is never touched from anywhere else.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;
#[macro_use]
extern crate bitflags;
extern crate bincode;
extern crate cgmath;
extern crate gl;
extern crate image;
extern crate inlinable_string;
extern crate serde_json;
extern crate smallvec;

#[cfg(test)]
#[macro_use]
extern crate approx;

#[macro_use]
pub mod utils;
pub mod errors;
pub mod math;

pub mod identity;

pub mod gles;
pub mod materials;
pub mod mesh;
pub mod surfaces;

pub mod particles;
pub mod scene;
pub mod skinning;
pub mod visitor;

pub mod prelude {
    pub use crate::errors::*;
    pub use crate::gles::prelude::*;
    pub use crate::identity::prelude::*;
    pub use crate::materials::prelude::*;
    pub use crate::math::prelude::*;
    pub use crate::mesh::prelude::*;
    pub use crate::particles::prelude::*;
    pub use crate::scene::prelude::*;
    pub use crate::skinning::prelude::*;
    pub use crate::surfaces::prelude::*;
    pub use crate::visitor::prelude::*;
}
