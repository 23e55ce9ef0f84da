//! Compact Delaunay triangle index.
//!
//! [`DelaunayIndexBuilder`] accepts the same event stream as the graph
//! builder but keeps no topology: each closed triangle is stored as the three
//! initial indices of its sites. Handles carry a site's initial index instead
//! of an edge, which is all a closure needs to name the implicit middle site.
//!
//! # Example
//!
//! ```
//! use delaunay_sink::prelude::*;
//!
//! let s0 = Site::new(2, 0);
//! let s1 = Site::new(0, 1);
//! let s2 = Site::new(1, 2);
//!
//! let mut builder = DelaunayIndexBuilder::new();
//! builder.reserve(3).unwrap();
//! let (from_1, _) = builder.insert_new_edge(&s0, &s1).unwrap();
//! let (from_2, _) = builder.insert_new_edge(&s1, &s2).unwrap();
//! builder.insert_closing_edge(&s0, &s2, &(), from_1, from_2).unwrap();
//! builder.build().unwrap();
//!
//! let index = builder.into_index().unwrap();
//! assert_eq!(index.triangles(), &[IndexTriangle::new(0, 2, 1)]);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Arena, HandleFault, Result, SinkError};
use crate::protocol::{
    arena_with_capacity, BuildState, DelaunaySink, EdgeHandle, Lifecycle, Reservation, SinkId,
    SiteIndex,
};

/// A triangle stored as the initial indices of its three sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexTriangle {
    sites: [usize; 3],
}

impl IndexTriangle {
    /// Create a triangle from three site initial indices.
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self { sites: [a, b, c] }
    }

    /// The initial index of corner `k` (0, 1 or 2).
    ///
    /// # Panics
    ///
    /// Panics if `k > 2`.
    #[inline]
    pub fn source_index(&self, k: usize) -> usize {
        self.sites[k]
    }

    /// All three initial indices.
    #[inline]
    pub fn sites(&self) -> [usize; 3] {
        self.sites
    }
}

/// A finished compact triangle index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelaunayIndex {
    triangles: Vec<IndexTriangle>,
}

impl DelaunayIndex {
    /// All triangles, in closing order.
    #[inline]
    pub fn triangles(&self) -> &[IndexTriangle] {
        &self.triangles
    }

    /// Get the number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Get a triangle by position.
    #[inline]
    pub fn triangle(&self, i: usize) -> &IndexTriangle {
        &self.triangles[i]
    }

    /// Parallel iterator over all triangles.
    #[cfg(feature = "parallel")]
    pub fn par_triangles(&self) -> rayon::slice::Iter<'_, IndexTriangle> {
        self.triangles.par_iter()
    }
}

/// A sink that records only triangle site triples.
#[derive(Debug)]
pub struct DelaunayIndexBuilder {
    lifecycle: Lifecycle,
    index: DelaunayIndex,
}

impl Default for DelaunayIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DelaunayIndexBuilder {
    /// Create an unreserved builder.
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            index: DelaunayIndex::default(),
        }
    }

    /// The identity stamped into this builder's handles.
    pub fn id(&self) -> SinkId {
        self.lifecycle.id()
    }

    /// The finished index. Only available after [`build`](DelaunaySink::build).
    pub fn index(&self) -> Result<&DelaunayIndex> {
        self.lifecycle.check_finalized("index")?;
        Ok(&self.index)
    }

    /// Take the finished index out of the builder.
    pub fn into_index(self) -> Result<DelaunayIndex> {
        self.lifecycle.check_finalized("into_index")?;
        Ok(self.index)
    }

    fn reservation(&self) -> &Reservation {
        self.lifecycle.reservation()
    }

    /// Sites are not stored, but their sort positions must fit the reservation.
    fn check_site<S: SiteIndex>(&self, site: &S) -> Result<()> {
        self.reservation()
            .check(Arena::Sites, site.sorted_index(), 1)
    }

    fn handle<S: SiteIndex>(&self, site: &S) -> EdgeHandle {
        EdgeHandle::site(self.id(), site.initial_index())
    }
}

impl DelaunaySink for DelaunayIndexBuilder {
    fn reserve(&mut self, num_sites: usize) -> Result<()> {
        self.lifecycle.check_reserve()?;

        let reservation = Reservation::for_sites(num_sites);
        self.index.triangles = arena_with_capacity(Arena::Triangles, reservation.triangles)?;
        self.lifecycle.reserve(reservation);
        log::debug!(
            "index sink {:?} reserved for {} sites ({} triangles)",
            self.id(),
            reservation.sites,
            reservation.triangles
        );
        Ok(())
    }

    fn process_single_site<S: SiteIndex>(&mut self, site: &S) -> Result<()> {
        self.lifecycle.check_event("process_single_site")?;
        self.check_site(site)?;
        self.lifecycle.mark_building();
        Ok(())
    }

    fn insert_new_edge<S: SiteIndex>(
        &mut self,
        site1: &S,
        site2: &S,
    ) -> Result<(EdgeHandle, EdgeHandle)> {
        self.lifecycle.check_event("insert_new_edge")?;
        self.check_site(site1)?;
        self.check_site(site2)?;

        self.lifecycle.mark_building();
        Ok((self.handle(site1), self.handle(site2)))
    }

    fn insert_closing_edge<S: SiteIndex, C: ?Sized>(
        &mut self,
        site1: &S,
        site3: &S,
        _circle: &C,
        edge12: EdgeHandle,
        edge23: EdgeHandle,
    ) -> Result<(EdgeHandle, EdgeHandle)> {
        self.lifecycle.check_event("insert_closing_edge")?;
        self.check_site(site1)?;
        self.check_site(site3)?;
        // edge12 ends at site1, so its handle carries site1.
        if edge12.site_for(self.id())? != site1.initial_index() {
            return Err(SinkError::handle(edge12, HandleFault::Disconnected));
        }
        let site2 = edge23.site_for(self.id())?;
        self.reservation()
            .check(Arena::Triangles, self.index.num_triangles(), 1)?;

        let triangle = IndexTriangle::new(site2, site1.initial_index(), site3.initial_index());
        self.index.triangles.push(triangle);
        self.lifecycle.mark_building();

        log::trace!("circle closes {:?}", triangle.sites());
        Ok((self.handle(site1), self.handle(site3)))
    }

    fn build(&mut self) -> Result<()> {
        self.lifecycle.check_build()?;
        self.lifecycle.finalize();
        log::debug!(
            "index sink {:?} finalized: {} triangles",
            self.id(),
            self.index.num_triangles()
        );
        Ok(())
    }

    fn state(&self) -> BuildState {
        self.lifecycle.state()
    }
}
