//! Trackers grouped by the part of GL they wrap.

pub mod arrays;
pub mod capabilities;
pub mod fixed;
pub mod platform;
pub mod state;
pub mod textures;

pub use self::arrays::VertexArrays;
pub use self::capabilities::Capabilities;
pub use self::fixed::{Fog, Hints, LightState, Lighting, MaterialState, Matrices};
pub use self::platform::PlatformLimits;
pub use self::state::GLState;
pub use self::textures::{TextureUnitState, TextureUnits};
