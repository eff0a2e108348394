//! The scene graph: nodes with local transforms, cameras and bounding volumes, stored
//! in an arena and addressed by handles.

pub mod bounding;
pub mod camera;
pub mod graph;
pub mod node;
pub mod rotator;

pub mod prelude {
    pub use super::bounding::BoundingVolume;
    pub use super::camera::{Camera, CameraView};
    pub use super::graph::Scene;
    pub use super::node::{MeshNode, Node, NodeContent, NodeHandle, UserDataCopy};
    pub use super::rotator::Rotator;
}
