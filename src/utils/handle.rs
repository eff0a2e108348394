use std::fmt::Debug;
use std::hash::Hash;

pub type HandleIndex = u32;

/// An index into a pool, and the version of the slot it was handed out for. A stale
/// handle keeps the old version, so it is told apart from a live one that reuses the
/// slot.
pub trait HandleLike: Debug + Copy + Hash + PartialEq + Eq {
    fn new(index: HandleIndex, version: HandleIndex) -> Self;
    fn index(&self) -> HandleIndex;
    fn version(&self) -> HandleIndex;
}

/// Declares a handle type for one kind of pooled object.
#[macro_export]
macro_rules! impl_handle {
    ($name:ident) => {
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            index: $crate::utils::handle::HandleIndex,
            version: $crate::utils::handle::HandleIndex,
        }

        impl $crate::utils::handle::HandleLike for $name {
            #[inline]
            fn new(
                index: $crate::utils::handle::HandleIndex,
                version: $crate::utils::handle::HandleIndex,
            ) -> Self {
                $name { index, version }
            }

            #[inline]
            fn index(&self) -> $crate::utils::handle::HandleIndex {
                self.index
            }

            #[inline]
            fn version(&self) -> $crate::utils::handle::HandleIndex {
                self.version
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{} ({}, {})", stringify!($name), self.index, self.version)
            }
        }
    };
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::utils::hash::FastHashSet;

    impl_handle!(TestHandle);

    #[test]
    fn versions_tell_handles_apart() {
        let mut set = FastHashSet::default();
        assert!(set.insert(TestHandle::new(1, 1)));
        assert!(!set.insert(TestHandle::new(1, 1)));
        assert!(set.insert(TestHandle::new(1, 2)));
        assert!(set.insert(TestHandle::new(2, 2)));
        assert_eq!(set.len(), 3);

        let h = TestHandle::new(3, 1);
        assert_eq!((h.index(), h.version()), (3, 1));
        assert_eq!(format!("{}", h), "TestHandle (3, 1)");
    }
}
