//! Index types for graph elements.
//!
//! Every relation in the half-edge graph is an index into one of the
//! append-only arenas, never an address. The indices are generic over the
//! underlying integer type so small triangulations can use `u16` and massive
//! ones `u64`. The all-ones value of each width is reserved as the "unset"
//! sentinel.

use std::fmt::{self, Debug};
use std::hash::Hash;

/// Integer widths usable as graph indices.
///
/// Implemented for `u16`, `u32`, and `u64`.
pub trait MeshIndex:
    Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static
{
    /// The unset sentinel.
    const INVALID: Self;

    /// The largest index that can be stored, as a usize.
    fn max_usize() -> usize;

    /// Narrow a usize.
    ///
    /// Callers must have checked the value against [`MeshIndex::max_usize`];
    /// reservations do this once up front.
    fn from_usize(v: usize) -> Self;

    /// Widen to usize.
    fn to_usize(self) -> usize;

    /// Whether this is a stored index rather than the sentinel.
    #[inline]
    fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

macro_rules! impl_mesh_index {
    ($($int:ty),*) => {$(
        impl MeshIndex for $int {
            const INVALID: Self = <$int>::MAX;

            #[inline]
            fn max_usize() -> usize {
                usize::try_from(<$int>::MAX - 1).unwrap_or(usize::MAX)
            }

            #[inline]
            fn from_usize(v: usize) -> Self {
                debug_assert!(v <= Self::max_usize(), "index {} does not fit {}", v, stringify!($int));
                v as $int
            }

            #[inline]
            fn to_usize(self) -> usize {
                self as usize
            }
        }
    )*};
}

impl_mesh_index!(u16, u32, u64);

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $tag:literal) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name<I: MeshIndex = u32>(I);

        impl<I: MeshIndex> $name<I> {
            /// Wrap an arena position.
            #[inline]
            pub fn new(index: usize) -> Self {
                Self(I::from_usize(index))
            }

            /// The unset sentinel.
            #[inline]
            pub fn invalid() -> Self {
                Self(I::INVALID)
            }

            /// The arena position.
            #[inline]
            pub fn index(self) -> usize {
                self.0.to_usize()
            }

            /// Whether this id refers to an element rather than being unset.
            #[inline]
            pub fn is_valid(self) -> bool {
                self.0.is_valid()
            }
        }

        impl<I: MeshIndex> Debug for $name<I> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, concat!($tag, "{}"), self.index())
                } else {
                    f.write_str(concat!($tag, "-"))
                }
            }
        }
    };
}

define_id!(
    /// A vertex. Equal to the sorted index of the vertex's site.
    VertexId,
    "v"
);
define_id!(
    /// A directed half-edge.
    HalfEdgeId,
    "h"
);
define_id!(
    /// A triangle, numbered in closing order.
    TriangleId,
    "t"
);
define_id!(
    /// An undirected edge: the twinned half-edge pair `(2k, 2k + 1)`.
    EdgeId,
    "e"
);

impl<I: MeshIndex> HalfEdgeId<I> {
    /// The oppositely directed half-edge of the same pair.
    #[inline]
    pub fn twin(self) -> Self {
        debug_assert!(self.is_valid(), "twin of an unset half-edge");
        Self::new(self.index() ^ 1)
    }

    /// The undirected edge this half-edge belongs to.
    #[inline]
    pub fn edge(self) -> EdgeId<I> {
        EdgeId::new(self.index() >> 1)
    }
}

impl<I: MeshIndex> EdgeId<I> {
    /// The two half-edges of this edge, lower index first.
    #[inline]
    pub fn halfedges(self) -> [HalfEdgeId<I>; 2] {
        let first = self.index() << 1;
        [HalfEdgeId::new(first), HalfEdgeId::new(first + 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        let v: VertexId = VertexId::new(42);
        assert_eq!(v.index(), 42);
        assert!(v.is_valid());
        assert!(!VertexId::<u16>::invalid().is_valid());
    }

    #[test]
    fn test_twin_pairs() {
        let he: HalfEdgeId = HalfEdgeId::new(6);
        assert_eq!(he.twin().index(), 7);
        assert_eq!(he.twin().twin(), he);
        assert_eq!(he.edge(), he.twin().edge());
        assert_eq!(he.edge().halfedges(), [he, he.twin()]);
    }

    #[test]
    fn test_widths() {
        assert_eq!(u16::max_usize(), 65534);
        assert_eq!(u32::max_usize(), u32::MAX as usize - 1);
        let t: TriangleId<u16> = TriangleId::new(65534);
        assert!(t.is_valid());
    }

    #[test]
    fn test_debug_format() {
        let he: HalfEdgeId = HalfEdgeId::new(42);
        assert_eq!(format!("{:?}", he), "h42");
        assert_eq!(format!("{:?}", TriangleId::<u64>::invalid()), "t-");
    }
}
