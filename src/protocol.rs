//! The construction protocol shared by every sink.
//!
//! An external sweep-line engine discovers Delaunay edges and triangles in its
//! own deterministic order and reports them to a sink through
//! [`DelaunaySink`]. The engine calls, in order:
//!
//! 1. [`reserve`](DelaunaySink::reserve) exactly once,
//! 2. any interleaving of [`process_single_site`](DelaunaySink::process_single_site),
//!    [`insert_new_edge`](DelaunaySink::insert_new_edge) and
//!    [`insert_closing_edge`](DelaunaySink::insert_closing_edge),
//! 3. [`build`](DelaunaySink::build) exactly once.
//!
//! Edge-creating calls return [`EdgeHandle`]s which the engine threads back
//! into later closing calls. A handle is only meaningful to the sink that
//! issued it.
//!
//! # Example
//!
//! ```
//! use delaunay_sink::prelude::*;
//!
//! let s0 = Site::new(0, 0);
//! let s1 = Site::new(1, 1);
//! let s2 = Site::new(2, 2);
//!
//! let mut builder: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
//! builder.reserve(3).unwrap();
//! let (from_1, _) = builder.insert_new_edge(&s0, &s1).unwrap();
//! let (from_2, _) = builder.insert_new_edge(&s1, &s2).unwrap();
//! builder.insert_closing_edge(&s0, &s2, &(), from_1, from_2).unwrap();
//! builder.build().unwrap();
//!
//! let graph = builder.graph().unwrap();
//! assert_eq!(graph.num_triangles(), 1);
//! assert_eq!(graph.num_halfedges(), 6);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Arena, HandleFault, Result, SinkError};

/// The identity contract every site must satisfy.
///
/// The two index spaces are distinct: the initial index is only used to report
/// results, the sorted index only to address the vertex under construction.
pub trait SiteIndex {
    /// Position of the site in the caller's input.
    fn initial_index(&self) -> usize;

    /// Position of the site in the order the sweep discovers sites.
    fn sorted_index(&self) -> usize;
}

/// A plain site identity carrying both index spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Site {
    /// Position of the site in the caller's input.
    pub initial_index: usize,
    /// Position of the site in sweep order.
    pub sorted_index: usize,
}

impl Site {
    /// Create a site from its initial and sorted indices.
    pub fn new(initial_index: usize, sorted_index: usize) -> Self {
        Self {
            initial_index,
            sorted_index,
        }
    }
}

impl SiteIndex for Site {
    #[inline]
    fn initial_index(&self) -> usize {
        self.initial_index
    }

    #[inline]
    fn sorted_index(&self) -> usize {
        self.sorted_index
    }
}

/// Identity of one sink instance, stamped into every handle it issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// What an edge handle designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleTarget {
    /// A half-edge slot in a graph sink's arena.
    HalfEdge(usize),
    /// The initial index of a site, for sinks without edge storage.
    Site(usize),
}

/// An opaque handle to "the edge most recently created from a site".
///
/// Returned by the edge-creating operations and passed back into
/// [`DelaunaySink::insert_closing_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeHandle {
    sink: SinkId,
    target: HandleTarget,
}

impl EdgeHandle {
    pub(crate) fn halfedge(sink: SinkId, index: usize) -> Self {
        Self {
            sink,
            target: HandleTarget::HalfEdge(index),
        }
    }

    pub(crate) fn site(sink: SinkId, initial_index: usize) -> Self {
        Self {
            sink,
            target: HandleTarget::Site(initial_index),
        }
    }

    /// The sink that issued this handle.
    #[inline]
    pub fn sink(&self) -> SinkId {
        self.sink
    }

    /// What this handle designates.
    #[inline]
    pub fn target(&self) -> HandleTarget {
        self.target
    }

    /// Resolve to a half-edge slot, checking the issuing sink.
    pub(crate) fn halfedge_for(self, sink: SinkId) -> Result<usize> {
        if self.sink != sink {
            return Err(SinkError::handle(self, HandleFault::ForeignSink));
        }
        match self.target {
            HandleTarget::HalfEdge(index) => Ok(index),
            HandleTarget::Site(_) => Err(SinkError::handle(self, HandleFault::WrongKind)),
        }
    }

    /// Resolve to a site initial index, checking the issuing sink.
    pub(crate) fn site_for(self, sink: SinkId) -> Result<usize> {
        if self.sink != sink {
            return Err(SinkError::handle(self, HandleFault::ForeignSink));
        }
        match self.target {
            HandleTarget::Site(index) => Ok(index),
            HandleTarget::HalfEdge(_) => Err(SinkError::handle(self, HandleFault::WrongKind)),
        }
    }
}

/// Lifecycle of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildState {
    /// Created, waiting for `reserve`.
    Unreserved,
    /// Capacities fixed, no event received yet.
    Reserved,
    /// At least one construction event received.
    Building,
    /// `build` called; read-only from now on.
    Finalized,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Unreserved => "unreserved",
            BuildState::Reserved => "reserved",
            BuildState::Building => "building",
            BuildState::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Arena capacities derived from the number of sites.
///
/// A planar triangulation of `n` points has at most `2n - 5` triangles and
/// `3n - 6` edges; the reservation rounds these up to `2n` and `6n`
/// half-edges so small inputs fit too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// Upper bound on sites, and therefore vertices.
    pub sites: usize,
    /// Upper bound on triangles.
    pub triangles: usize,
    /// Upper bound on half-edges.
    pub halfedges: usize,
}

impl Reservation {
    /// Capacities for `num_sites` sites.
    pub fn for_sites(num_sites: usize) -> Self {
        Self {
            sites: num_sites,
            triangles: num_sites.saturating_mul(2),
            halfedges: num_sites.saturating_mul(6),
        }
    }

    /// Fail with [`SinkError::CapacityExceeded`] if `len` elements fill `arena`.
    pub(crate) fn check(&self, arena: Arena, len: usize, adding: usize) -> Result<()> {
        let capacity = match arena {
            Arena::Vertices | Arena::Sites => self.sites,
            Arena::Triangles => self.triangles,
            Arena::HalfEdges => self.halfedges,
        };
        if len.checked_add(adding).map_or(true, |n| n > capacity) {
            return Err(SinkError::CapacityExceeded { arena, capacity });
        }
        Ok(())
    }
}

/// Allocate an empty arena with room for `capacity` elements.
pub(crate) fn arena_with_capacity<T>(arena: Arena, capacity: usize) -> Result<Vec<T>> {
    let mut elements = Vec::new();
    elements
        .try_reserve_exact(capacity)
        .map_err(|_| SinkError::CapacityExceeded { arena, capacity })?;
    Ok(elements)
}

/// State machine shared by the sink implementations.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    id: SinkId,
    state: BuildState,
    reservation: Reservation,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            id: SinkId::fresh(),
            state: BuildState::Unreserved,
            reservation: Reservation::for_sites(0),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> SinkId {
        self.id
    }

    #[inline]
    pub(crate) fn state(&self) -> BuildState {
        self.state
    }

    #[inline]
    pub(crate) fn reservation(&self) -> &Reservation {
        &self.reservation
    }

    /// Check that `reserve` is permitted.
    pub(crate) fn check_reserve(&self) -> Result<()> {
        match self.state {
            BuildState::Unreserved => Ok(()),
            state => Err(SinkError::protocol("reserve", state)),
        }
    }

    pub(crate) fn reserve(&mut self, reservation: Reservation) {
        self.reservation = reservation;
        self.state = BuildState::Reserved;
    }

    /// Check that a construction event is permitted.
    pub(crate) fn check_event(&self, operation: &'static str) -> Result<()> {
        match self.state {
            BuildState::Reserved | BuildState::Building => Ok(()),
            state => Err(SinkError::protocol(operation, state)),
        }
    }

    pub(crate) fn mark_building(&mut self) {
        self.state = BuildState::Building;
    }

    /// Check that `build` is permitted.
    pub(crate) fn check_build(&self) -> Result<()> {
        self.check_event("build")
    }

    pub(crate) fn finalize(&mut self) {
        self.state = BuildState::Finalized;
    }

    /// Check that reads are permitted.
    pub(crate) fn check_finalized(&self, operation: &'static str) -> Result<()> {
        match self.state {
            BuildState::Finalized => Ok(()),
            state => Err(SinkError::protocol(operation, state)),
        }
    }
}

/// Options for finalizing a sink.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Run the full topology validation pass in `build` (default: true).
    pub validate: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}

impl BuildOptions {
    /// Set whether `build` validates the finished structure.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Create options that skip the validation pass.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }
}

/// A receiver of sweep-line construction events.
///
/// Both the half-edge graph and the compact index implement this trait and
/// accept the identical event stream.
pub trait DelaunaySink {
    /// Fix arena capacities for at most `num_sites` sites.
    ///
    /// Must be the first call, and may only be made once.
    fn reserve(&mut self, num_sites: usize) -> Result<()>;

    /// Register a site that has no incident edge yet.
    fn process_single_site<S: SiteIndex>(&mut self, site: &S) -> Result<()>;

    /// Record a new Delaunay edge between two sites.
    ///
    /// Returns the handles of the new edge originating at `site2` and at
    /// `site1`, in that order.
    fn insert_new_edge<S: SiteIndex>(
        &mut self,
        site1: &S,
        site2: &S,
    ) -> Result<(EdgeHandle, EdgeHandle)>;

    /// Close the triangle `site1, site2, site3` on a circle event.
    ///
    /// `edge12` and `edge23` are handles previously returned for the edges
    /// from the implicit `site2` towards `site1` and from `site3` towards
    /// `site2`. A new edge between `site3` and `site1` is created; its handles
    /// are returned originating at `site3` and at `site1`, in that order.
    /// `circle` is opaque geometric data that does not affect topology.
    fn insert_closing_edge<S: SiteIndex, C: ?Sized>(
        &mut self,
        site1: &S,
        site3: &S,
        circle: &C,
        edge12: EdgeHandle,
        edge23: EdgeHandle,
    ) -> Result<(EdgeHandle, EdgeHandle)>;

    /// Finish construction. No mutation is accepted afterwards.
    fn build(&mut self) -> Result<()>;

    /// The current lifecycle state.
    fn state(&self) -> BuildState;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_order() {
        let mut life = Lifecycle::new();
        assert_eq!(life.state(), BuildState::Unreserved);
        assert!(life.check_event("process_single_site").is_err());
        assert!(life.check_build().is_err());

        life.check_reserve().unwrap();
        life.reserve(Reservation::for_sites(4));
        assert_eq!(life.state(), BuildState::Reserved);
        assert!(life.check_reserve().is_err());
        life.check_event("insert_new_edge").unwrap();

        life.mark_building();
        life.check_build().unwrap();
        life.finalize();

        assert_eq!(
            life.check_event("insert_new_edge"),
            Err(SinkError::protocol("insert_new_edge", BuildState::Finalized))
        );
        life.check_finalized("graph").unwrap();
    }

    #[test]
    fn test_reservation_bounds() {
        let r = Reservation::for_sites(10);
        assert_eq!(r.triangles, 20);
        assert_eq!(r.halfedges, 60);
        r.check(Arena::HalfEdges, 58, 2).unwrap();
        assert_eq!(
            r.check(Arena::HalfEdges, 60, 2),
            Err(SinkError::CapacityExceeded {
                arena: Arena::HalfEdges,
                capacity: 60
            })
        );
        assert!(r.check(Arena::Sites, usize::MAX, 1).is_err());
    }

    #[test]
    fn test_handles_are_stamped() {
        let a = Lifecycle::new();
        let b = Lifecycle::new();
        assert_ne!(a.id(), b.id());

        let h = EdgeHandle::halfedge(a.id(), 3);
        assert_eq!(h.halfedge_for(a.id()), Ok(3));
        assert_eq!(
            h.halfedge_for(b.id()),
            Err(SinkError::handle(h, HandleFault::ForeignSink))
        );
        assert_eq!(
            h.site_for(a.id()),
            Err(SinkError::handle(h, HandleFault::WrongKind))
        );
    }
}
