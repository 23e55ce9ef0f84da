//! Event-driven construction of the half-edge Delaunay graph.
//!
//! [`DelaunayGraphBuilder`] is the full-topology [`DelaunaySink`]. Vertices are
//! stored at the sorted index of their site; half-edges are appended in
//! twinned pairs; triangles are appended as circle events close them. Every
//! call checks its preconditions before touching the arenas, so a rejected
//! call leaves the graph unchanged.

use super::graph::DelaunayGraph;
use super::index::{HalfEdgeId, MeshIndex, VertexId};
use crate::error::{Arena, HandleFault, Result, SinkError};
use crate::protocol::{
    BuildOptions, BuildState, DelaunaySink, EdgeHandle, Lifecycle, Reservation, SinkId,
    SiteIndex,
};

/// A sink that assembles a [`DelaunayGraph`].
///
/// Builders are move-only: handles carry the builder's [`SinkId`], so a copy
/// would accept handles it never issued.
///
/// # Example
///
/// ```
/// use delaunay_sink::prelude::*;
///
/// let mut builder: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
/// builder.reserve(2).unwrap();
/// builder.process_single_site(&Site::new(1, 0)).unwrap();
/// builder.insert_new_edge(&Site::new(1, 0), &Site::new(0, 1)).unwrap();
/// builder.build().unwrap();
///
/// let graph = builder.into_graph().unwrap();
/// assert_eq!(graph.num_vertices(), 2);
/// assert_eq!(graph.num_edges(), 1);
/// assert_eq!(graph.num_triangles(), 0);
/// ```
#[derive(Debug)]
pub struct DelaunayGraphBuilder<I: MeshIndex = u32> {
    lifecycle: Lifecycle,
    options: BuildOptions,
    graph: DelaunayGraph<I>,
}

impl<I: MeshIndex> Default for DelaunayGraphBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> DelaunayGraphBuilder<I> {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self::with_options(BuildOptions::default())
    }

    /// Create a builder with the given options.
    pub fn with_options(options: BuildOptions) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            options,
            graph: DelaunayGraph::default(),
        }
    }

    /// The identity stamped into this builder's handles.
    pub fn id(&self) -> SinkId {
        self.lifecycle.id()
    }

    /// The finished graph. Only available after [`build`](DelaunaySink::build).
    pub fn graph(&self) -> Result<&DelaunayGraph<I>> {
        self.lifecycle.check_finalized("graph")?;
        Ok(&self.graph)
    }

    /// Take the finished graph out of the builder.
    pub fn into_graph(self) -> Result<DelaunayGraph<I>> {
        self.lifecycle.check_finalized("into_graph")?;
        Ok(self.graph)
    }

    /// Where `site` lives: `Ok(Some(v))` if registered, `Ok(None)` if it is the
    /// next site to be created after `pending` other new sites.
    fn locate<S: SiteIndex>(&self, site: &S, pending: usize) -> Result<Option<VertexId<I>>> {
        let sorted_index = site.sorted_index();
        let known = self.graph.num_vertices();

        if sorted_index < known {
            let v = VertexId::new(sorted_index);
            let registered = self.graph.initial_index(v);
            if registered != site.initial_index() {
                return Err(SinkError::SiteMismatch {
                    sorted_index,
                    given: site.initial_index(),
                    registered,
                });
            }
            return Ok(Some(v));
        }

        let expected = known + pending;
        if sorted_index == expected {
            Ok(None)
        } else {
            Err(SinkError::UnknownSite {
                sorted_index,
                expected,
            })
        }
    }

    /// The vertex of a site that must already be registered.
    fn registered<S: SiteIndex>(&self, site: &S) -> Result<VertexId<I>> {
        match self.locate(site, 0)? {
            Some(v) => Ok(v),
            None => Err(SinkError::UnknownSite {
                sorted_index: site.sorted_index(),
                expected: self.graph.num_vertices(),
            }),
        }
    }

    /// Resolve a handle to a half-edge that does not bound a triangle yet.
    fn open_halfedge(&self, handle: EdgeHandle) -> Result<HalfEdgeId<I>> {
        let index = handle.halfedge_for(self.id())?;
        if index >= self.graph.num_halfedges() {
            return Err(SinkError::handle(handle, HandleFault::NotIssued));
        }
        let he = HalfEdgeId::new(index);
        if !self.graph.is_hull_halfedge(he) {
            return Err(SinkError::handle(handle, HandleFault::Consumed));
        }
        Ok(he)
    }

    fn handle(&self, he: HalfEdgeId<I>) -> EdgeHandle {
        EdgeHandle::halfedge(self.id(), he.index())
    }

    fn reservation(&self) -> &Reservation {
        self.lifecycle.reservation()
    }
}

impl<I: MeshIndex> DelaunaySink for DelaunayGraphBuilder<I> {
    fn reserve(&mut self, num_sites: usize) -> Result<()> {
        self.lifecycle.check_reserve()?;

        let reservation = Reservation::for_sites(num_sites);
        if reservation.halfedges > I::max_usize() {
            return Err(SinkError::IndexOverflow {
                requested: reservation.halfedges,
                max: I::max_usize(),
            });
        }

        self.graph = DelaunayGraph::with_reservation(&reservation)?;
        self.lifecycle.reserve(reservation);
        log::debug!(
            "graph sink {:?} reserved for {} sites ({} triangles, {} half-edges)",
            self.id(),
            reservation.sites,
            reservation.triangles,
            reservation.halfedges
        );
        Ok(())
    }

    fn process_single_site<S: SiteIndex>(&mut self, site: &S) -> Result<()> {
        self.lifecycle.check_event("process_single_site")?;

        if self.locate(site, 0)?.is_some() {
            return Err(SinkError::DuplicateSite {
                sorted_index: site.sorted_index(),
            });
        }
        self.reservation()
            .check(Arena::Vertices, self.graph.num_vertices(), 1)?;

        let v = self.graph.push_vertex(site.initial_index());
        self.lifecycle.mark_building();
        log::trace!("single site {} -> {:?}", site.initial_index(), v);
        Ok(())
    }

    fn insert_new_edge<S: SiteIndex>(
        &mut self,
        site1: &S,
        site2: &S,
    ) -> Result<(EdgeHandle, EdgeHandle)> {
        self.lifecycle.check_event("insert_new_edge")?;

        if site1.sorted_index() == site2.sorted_index() {
            return Err(SinkError::CoincidentSites {
                sorted_index: site1.sorted_index(),
            });
        }

        // A site's first reference creates its vertex; site1 is created first.
        let known1 = self.locate(site1, 0)?;
        let known2 = self.locate(site2, usize::from(known1.is_none()))?;
        let created = usize::from(known1.is_none()) + usize::from(known2.is_none());

        let reservation = self.reservation();
        reservation.check(Arena::Vertices, self.graph.num_vertices(), created)?;
        reservation.check(Arena::HalfEdges, self.graph.num_halfedges(), 2)?;

        let v1 = match known1 {
            Some(v) => v,
            None => self.graph.push_vertex(site1.initial_index()),
        };
        let v2 = match known2 {
            Some(v) => v,
            None => self.graph.push_vertex(site2.initial_index()),
        };

        let from1 = self.graph.push_pair(v1, v2);
        let from2 = from1.twin();
        self.graph.attach(v1, from1);
        self.graph.attach(v2, from2);
        self.lifecycle.mark_building();

        log::trace!(
            "edge {} - {} -> {:?} / {:?}",
            site1.initial_index(),
            site2.initial_index(),
            from2,
            from1
        );
        Ok((self.handle(from2), self.handle(from1)))
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

        let v1 = self.registered(site1)?;
        let v3 = self.registered(site3)?;
        if v1 == v3 {
            return Err(SinkError::CoincidentSites {
                sorted_index: site1.sorted_index(),
            });
        }

        let he12 = self.open_halfedge(edge12)?;
        let he23 = self.open_halfedge(edge23)?;
        if he12 == he23 {
            return Err(SinkError::handle(edge23, HandleFault::Repeated));
        }

        // edge12 runs site2 -> site1 and edge23 runs site3 -> site2.
        if self.graph.destination(he12) != v1 {
            return Err(SinkError::handle(edge12, HandleFault::Disconnected));
        }
        if self.graph.origin(he23) != v3
            || self.graph.destination(he23) != self.graph.origin(he12)
        {
            return Err(SinkError::handle(edge23, HandleFault::Disconnected));
        }

        let reservation = self.reservation();
        reservation.check(Arena::Triangles, self.graph.num_triangles(), 1)?;
        reservation.check(Arena::HalfEdges, self.graph.num_halfedges(), 2)?;

        let from1 = self.graph.push_pair(v1, v3);
        let from3 = from1.twin();
        let t = self.graph.close_triangle([he12, from1, he23]);
        self.lifecycle.mark_building();

        log::trace!(
            "circle {} - {} closes {:?} -> {:?} / {:?}",
            site1.initial_index(),
            site3.initial_index(),
            t,
            from3,
            from1
        );
        Ok((self.handle(from3), self.handle(from1)))
    }

    fn build(&mut self) -> Result<()> {
        self.lifecycle.check_build()?;

        if self.options.validate {
            if let Err(err) = self.graph.validate() {
                log::warn!("graph sink {:?} failed validation: {}", self.id(), err);
                return Err(err);
            }
        }

        self.lifecycle.finalize();
        log::debug!(
            "graph sink {:?} finalized: {} vertices, {} triangles, {} half-edges",
            self.id(),
            self.graph.num_vertices(),
            self.graph.num_triangles(),
            self.graph.num_halfedges()
        );
        Ok(())
    }

    fn state(&self) -> BuildState {
        self.lifecycle.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Triangle, TriangleId};
    use crate::protocol::{HandleTarget, Site};

    /// Sites of the quadrilateral `[(4,2), (0,0), (6,-1), (1,3)]` in sweep order.
    fn quad_sites() -> [Site; 4] {
        [
            Site::new(1, 0),
            Site::new(3, 1),
            Site::new(0, 2),
            Site::new(2, 3),
        ]
    }

    fn build_quad() -> DelaunayGraphBuilder<u32> {
        let [s0, s1, s2, s3] = quad_sites();
        let mut b = DelaunayGraphBuilder::new();
        b.reserve(4).unwrap();
        b.process_single_site(&s0).unwrap();
        let (from_1, _) = b.insert_new_edge(&s0, &s1).unwrap();
        let (from_2, _) = b.insert_new_edge(&s1, &s2).unwrap();
        let (from_2_to_0, _) = b.insert_closing_edge(&s0, &s2, &(), from_1, from_2).unwrap();
        let (from_3, _) = b.insert_new_edge(&s2, &s3).unwrap();
        b.insert_closing_edge(&s0, &s3, &(), from_2_to_0, from_3)
            .unwrap();
        b.build().unwrap();
        b
    }

    #[test]
    fn test_quad_topology() {
        let b = build_quad();
        let g = b.graph().unwrap();

        assert_eq!(g.num_vertices(), 4);
        assert_eq!(g.num_edges(), 5);
        assert_eq!(g.num_halfedges(), 10);
        assert_eq!(g.num_triangles(), 2);
        g.validate().unwrap();

        assert_eq!(g.triangle_sites(TriangleId::new(0)), [3, 1, 0]);
        assert_eq!(g.triangle_sites(TriangleId::new(1)), [0, 1, 2]);

        // Vertices live at the sorted index and report the initial index.
        let initial: Vec<usize> = g.vertices().map(|(_, v)| v.initial_index).collect();
        assert_eq!(initial, vec![1, 3, 0, 2]);
        assert!(g.vertices().all(|(_, v)| !v.is_isolated()));

        // The diagonal (0,0)-(4,2) is the only edge with a triangle on both sides.
        let interior: Vec<_> = g
            .edge_ids()
            .filter(|&e| !g.is_hull_edge(g.edge_halfedges(e)[0]))
            .collect();
        assert_eq!(interior.len(), 1);
        let [a, b] = g.edge_halfedges(interior[0]);
        let mut ends = [g.initial_index(g.origin(a)), g.initial_index(g.origin(b))];
        ends.sort();
        assert_eq!(ends, [0, 1]);
    }

    #[test]
    fn test_first_edge_creates_both_vertices() {
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        b.reserve(2).unwrap();
        let (from_2, from_1) = b
            .insert_new_edge(&Site::new(5, 0), &Site::new(9, 1))
            .unwrap();
        assert_eq!(from_2.target(), HandleTarget::HalfEdge(1));
        assert_eq!(from_1.target(), HandleTarget::HalfEdge(0));
        b.build().unwrap();

        let g = b.graph().unwrap();
        assert_eq!(g.num_vertices(), 2);
        assert_eq!(g.origin(HalfEdgeId::new(0)), VertexId::new(0));
        assert_eq!(g.destination(HalfEdgeId::new(0)), VertexId::new(1));
        assert_eq!(g.vertex(VertexId::new(1)).halfedge, HalfEdgeId::new(1));
    }

    #[test]
    fn test_single_site_gets_incident_edge_later() {
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        b.reserve(3).unwrap();
        b.process_single_site(&Site::new(0, 0)).unwrap();
        b.process_single_site(&Site::new(2, 1)).unwrap();
        b.insert_new_edge(&Site::new(2, 1), &Site::new(1, 2))
            .unwrap();
        b.build().unwrap();

        let g = b.graph().unwrap();
        assert_eq!(g.num_vertices(), 3);
        assert!(g.vertex(VertexId::new(0)).is_isolated());
        assert_eq!(g.vertex(VertexId::new(1)).halfedge, HalfEdgeId::new(0));
        assert_eq!(g.valence(VertexId::new(0)), 0);
    }

    #[test]
    fn test_calls_before_reserve_are_rejected() {
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        let err = b.process_single_site(&Site::new(0, 0)).unwrap_err();
        assert_eq!(
            err,
            SinkError::ProtocolViolation {
                operation: "process_single_site",
                state: BuildState::Unreserved
            }
        );
        assert!(b.build().is_err());
        assert!(b.graph().is_err());

        b.reserve(1).unwrap();
        assert!(matches!(
            b.reserve(1),
            Err(SinkError::ProtocolViolation { operation: "reserve", .. })
        ));
    }

    #[test]
    fn test_mutation_after_build_is_rejected() {
        let mut b = build_quad();
        let [s0, s1, ..] = quad_sites();
        let violation = |operation| SinkError::ProtocolViolation {
            operation,
            state: BuildState::Finalized,
        };

        assert_eq!(
            b.insert_new_edge(&s0, &s1).unwrap_err(),
            violation("insert_new_edge")
        );
        assert_eq!(
            b.process_single_site(&s0).unwrap_err(),
            violation("process_single_site")
        );
        assert_eq!(b.build().unwrap_err(), violation("build"));
        assert_eq!(b.graph().unwrap().num_triangles(), 2);
    }

    #[test]
    fn test_empty_input_finalizes_from_reserved() {
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        b.reserve(0).unwrap();
        assert_eq!(b.state(), BuildState::Reserved);
        b.build().unwrap();
        assert_eq!(b.graph().unwrap().num_vertices(), 0);
    }

    #[test]
    fn test_handle_faults() {
        let [s0, s1, s2, _] = quad_sites();
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        b.reserve(4).unwrap();
        let (from_1, from_0) = b.insert_new_edge(&s0, &s1).unwrap();
        let (from_2, _) = b.insert_new_edge(&s1, &s2).unwrap();

        let mut other: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        other.reserve(4).unwrap();
        let (foreign, _) = other.insert_new_edge(&s0, &s1).unwrap();

        let fault = |r: Result<(EdgeHandle, EdgeHandle)>| match r {
            Err(SinkError::InvalidHandle { fault, .. }) => fault,
            other => panic!("expected a handle fault, got {:?}", other),
        };

        assert_eq!(
            fault(b.insert_closing_edge(&s0, &s2, &(), foreign, from_2)),
            HandleFault::ForeignSink
        );
        assert_eq!(
            fault(b.insert_closing_edge(&s0, &s2, &(), EdgeHandle::site(b.id(), 0), from_2)),
            HandleFault::WrongKind
        );
        assert_eq!(
            fault(b.insert_closing_edge(&s0, &s2, &(), EdgeHandle::halfedge(b.id(), 40), from_2)),
            HandleFault::NotIssued
        );
        assert_eq!(
            fault(b.insert_closing_edge(&s0, &s2, &(), from_2, from_2)),
            HandleFault::Repeated
        );
        // from_0 runs s0 -> s1, so it cannot be the edge arriving at s0.
        assert_eq!(
            fault(b.insert_closing_edge(&s0, &s2, &(), from_0, from_2)),
            HandleFault::Disconnected
        );

        // Nothing above changed the graph.
        assert_eq!(b.graph.num_halfedges(), 4);
        assert_eq!(b.graph.num_triangles(), 0);

        b.insert_closing_edge(&s0, &s2, &(), from_1, from_2)
            .unwrap();
        assert_eq!(
            fault(b.insert_closing_edge(&s0, &s2, &(), from_1, from_2)),
            HandleFault::Consumed
        );
    }

    #[test]
    fn test_site_faults() {
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        b.reserve(3).unwrap();
        b.process_single_site(&Site::new(4, 0)).unwrap();

        assert_eq!(
            b.process_single_site(&Site::new(4, 0)),
            Err(SinkError::DuplicateSite { sorted_index: 0 })
        );
        assert_eq!(
            b.insert_new_edge(&Site::new(4, 0), &Site::new(1, 2)),
            Err(SinkError::UnknownSite {
                sorted_index: 2,
                expected: 1
            })
        );
        assert_eq!(
            b.insert_new_edge(&Site::new(7, 0), &Site::new(1, 1)),
            Err(SinkError::SiteMismatch {
                sorted_index: 0,
                given: 7,
                registered: 4
            })
        );
        assert_eq!(
            b.insert_new_edge(&Site::new(4, 0), &Site::new(4, 0)),
            Err(SinkError::CoincidentSites { sorted_index: 0 })
        );
        assert_eq!(b.graph.num_vertices(), 1);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        b.reserve(2).unwrap();
        b.insert_new_edge(&Site::new(0, 0), &Site::new(1, 1))
            .unwrap();
        assert_eq!(
            b.insert_new_edge(&Site::new(1, 1), &Site::new(2, 2)),
            Err(SinkError::CapacityExceeded {
                arena: Arena::Vertices,
                capacity: 2
            })
        );
        assert_eq!(b.state(), BuildState::Building);
    }

    #[test]
    fn test_halfedge_capacity_is_enforced() {
        let (s0, s1) = (Site::new(0, 0), Site::new(1, 1));
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        b.reserve(2).unwrap();

        // Two sites allow twelve half-edges: six pairs.
        for _ in 0..6 {
            b.insert_new_edge(&s0, &s1).unwrap();
        }
        assert_eq!(
            b.insert_new_edge(&s0, &s1),
            Err(SinkError::CapacityExceeded {
                arena: Arena::HalfEdges,
                capacity: 12
            })
        );
        assert_eq!(b.graph.num_halfedges(), 12);
        assert_eq!(b.graph.num_vertices(), 2);
    }

    #[test]
    fn test_triangle_capacity_is_enforced() {
        let (s0, s1, s2) = (Site::new(0, 0), Site::new(1, 1), Site::new(2, 2));
        let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
        b.reserve(3).unwrap();
        let (from_1, _) = b.insert_new_edge(&s0, &s1).unwrap();
        let (from_2, _) = b.insert_new_edge(&s1, &s2).unwrap();

        // The half-edge budget runs out before six real triangles fit, so
        // fill the triangle arena directly.
        for _ in 0..6 {
            b.graph.triangles.push(Triangle::new(HalfEdgeId::invalid()));
        }
        assert_eq!(
            b.insert_closing_edge(&s0, &s2, &(), from_1, from_2),
            Err(SinkError::CapacityExceeded {
                arena: Arena::Triangles,
                capacity: 6
            })
        );
        assert_eq!(b.graph.num_triangles(), 6);
        assert_eq!(b.graph.num_halfedges(), 4);
        assert!(b.graph.halfedges().all(|(_, he)| he.is_hull()));
    }

    #[test]
    fn test_oversized_reservation_is_reported() {
        let mut b: DelaunayGraphBuilder<u64> = DelaunayGraphBuilder::new();
        assert!(matches!(
            b.reserve(usize::MAX / 8),
            Err(SinkError::CapacityExceeded {
                arena: Arena::Vertices,
                ..
            })
        ));
        assert_eq!(b.state(), BuildState::Unreserved);
        b.reserve(8).unwrap();
    }

    #[test]
    fn test_reservation_must_fit_index_type() {
        let mut b: DelaunayGraphBuilder<u16> = DelaunayGraphBuilder::new();
        assert_eq!(
            b.reserve(20_000),
            Err(SinkError::IndexOverflow {
                requested: 120_000,
                max: 65_534
            })
        );
        assert_eq!(b.state(), BuildState::Unreserved);
        b.reserve(10_000).unwrap();
    }

    #[test]
    fn test_reads_are_stable_after_build() {
        let b = build_quad();
        let g = b.graph().unwrap();
        let first: Vec<[usize; 3]> = g.triangle_site_triples().collect();
        let second: Vec<[usize; 3]> = g.triangle_site_triples().collect();
        assert_eq!(first, second);
        assert_eq!(b.into_graph().unwrap().num_triangles(), 2);
    }
}
