//! Commonly used utilities like handles, pools and hash maps.

#[macro_use]
pub mod handle;
pub mod handle_pool;
pub mod hash;

pub use self::handle::{HandleIndex, HandleLike};
pub use self::handle_pool::{HandlePool, ObjectPool};
pub use self::hash::{FastHashMap, FastHashSet};
