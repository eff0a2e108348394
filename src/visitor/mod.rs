//! Drawing and picking the scene graph.
//!
//! A `DrawingVisitor` walks the visible nodes depth first and issues one draw per mesh
//! node, one per skin section, and one per particle emitter. It owns the caches that
//! skip rebinding a mesh or a material shared by consecutive nodes, and resets them at
//! the start of every visit. A `PickingVisitor` draws the same nodes in colors that
//! encode their tags, and reads back the pixel under a touch.
//!
//! ```rust,ignore
//! let mut visitor = DrawingVisitor::new(&engine);
//! let mut picking = PickingVisitor::new(&engine);
//!
//! // Every frame.
//! if let Some((x, y)) = touch {
//!     let picked = picking.pick_node_at(&scene, &mut engine, &mut surfaces, &view, root, x, y)?;
//! }
//!
//! visitor.draw_scene(&mut scene, &mut engine, camera)?;
//! ```

pub mod drawing;
pub mod picking;
pub mod switching;

pub use self::drawing::{Decoration, DrawingVisitor, VisitStats};
pub use self::picking::PickingVisitor;
pub use self::switching::SwitchCache;

pub mod prelude {
    pub use super::drawing::{Decoration, DrawingVisitor, VisitStats};
    pub use super::picking::PickingVisitor;
    pub use super::switching::SwitchCache;
}
