//! Half-edge Delaunay graph.
//!
//! The finished product of a [`DelaunayGraphBuilder`](super::DelaunayGraphBuilder):
//! a doubly-connected edge list over the triangulated sites.
//!
//! # Structure
//!
//! - Each Delaunay edge is split into two **half-edges** pointing in opposite
//!   directions, stored adjacently so that the **twin** is derived from the id
//! - Each half-edge knows its **origin vertex**, its **next** half-edge around
//!   the triangle it bounds, and that **triangle**
//! - Each vertex stores its site's initial index and one outgoing half-edge
//! - Each triangle stores one half-edge on its boundary
//!
//! # Hull
//!
//! Half-edges on the convex hull bound no triangle: their `next` and
//! `triangle` are invalid. All arenas are append-only, so every id stays valid
//! for the lifetime of the graph.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::index::{EdgeId, HalfEdgeId, MeshIndex, TriangleId, VertexId};
use crate::error::{Arena, Result, SinkError};
use crate::protocol::{arena_with_capacity, Reservation};

/// A vertex of the Delaunay graph; one per site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex<I: MeshIndex = u32> {
    /// The initial (input order) index of the site.
    pub initial_index: usize,

    /// One outgoing half-edge. Invalid while the vertex is isolated.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create a new isolated vertex for the site with the given initial index.
    pub fn new(initial_index: usize) -> Self {
        Self {
            initial_index,
            halfedge: HalfEdgeId::invalid(),
        }
    }

    /// Check if no edge touches this vertex.
    #[inline]
    pub fn is_isolated(&self) -> bool {
        !self.halfedge.is_valid()
    }
}

/// A half-edge of the Delaunay graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// The vertex this half-edge originates from.
    pub origin: VertexId<I>,

    /// The next half-edge around the triangle. Invalid on the hull.
    pub next: HalfEdgeId<I>,

    /// The triangle this half-edge bounds. Invalid on the hull.
    pub triangle: TriangleId<I>,
}

impl<I: MeshIndex> HalfEdge<I> {
    /// Create a half-edge from `origin` that bounds no triangle yet.
    pub fn new(origin: VertexId<I>) -> Self {
        Self {
            origin,
            next: HalfEdgeId::invalid(),
            triangle: TriangleId::invalid(),
        }
    }

    /// Check if this half-edge bounds no triangle.
    #[inline]
    pub fn is_hull(&self) -> bool {
        !self.triangle.is_valid()
    }
}

/// A triangular face of the Delaunay graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle<I: MeshIndex = u32> {
    /// One half-edge on the boundary of this triangle.
    pub halfedge: HalfEdgeId<I>,
}

impl<I: MeshIndex> Triangle<I> {
    /// Create a triangle bounded by the cycle through `halfedge`.
    pub fn new(halfedge: HalfEdgeId<I>) -> Self {
        Self { halfedge }
    }
}

/// A finished half-edge Delaunay graph.
///
/// Immutable once handed out by the builder, and safe to share between
/// threads.
#[derive(Debug, Clone)]
pub struct DelaunayGraph<I: MeshIndex = u32> {
    /// Vertices, indexed by the sorted index of their site.
    pub(crate) vertices: Vec<Vertex<I>>,

    /// Half-edges, in twinned pairs `(2k, 2k + 1)`.
    pub(crate) halfedges: Vec<HalfEdge<I>>,

    /// Triangles, in closing order.
    pub(crate) triangles: Vec<Triangle<I>>,
}

impl<I: MeshIndex> Default for DelaunayGraph<I> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            triangles: Vec::new(),
        }
    }
}

impl<I: MeshIndex> DelaunayGraph<I> {
    /// Create an empty graph sized for a reservation.
    pub(crate) fn with_reservation(reservation: &Reservation) -> Result<Self> {
        Ok(Self {
            vertices: arena_with_capacity(Arena::Vertices, reservation.sites)?,
            halfedges: arena_with_capacity(Arena::HalfEdges, reservation.halfedges)?,
            triangles: arena_with_capacity(Arena::Triangles, reservation.triangles)?,
        })
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Get the number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Get the number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex<I> {
        &self.vertices[id.index()]
    }

    /// Get a half-edge by ID.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        &self.halfedges[id.index()]
    }

    /// Get a triangle by ID.
    #[inline]
    pub fn triangle(&self, id: TriangleId<I>) -> &Triangle<I> {
        &self.triangles[id.index()]
    }

    /// Get the initial index of a vertex's site.
    #[inline]
    pub fn initial_index(&self, v: VertexId<I>) -> usize {
        self.vertex(v).initial_index
    }

    // ==================== Topology Queries ====================

    /// Get the twin (opposite) half-edge.
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        he.twin()
    }

    /// Get the next half-edge around the triangle.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).next
    }

    /// Get `next(twin(he))`, the construction's `prev` relation.
    ///
    /// This is the outgoing half-edge that follows `he` when rotating around
    /// its origin, not the predecessor inside the triangle.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.next(self.twin(he))
    }

    /// Get the origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).origin
    }

    /// Get the destination vertex of a half-edge.
    #[inline]
    pub fn destination(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.origin(self.twin(he))
    }

    /// Get the triangle a half-edge bounds.
    #[inline]
    pub fn triangle_of(&self, he: HalfEdgeId<I>) -> TriangleId<I> {
        self.halfedge(he).triangle
    }

    /// Check if a half-edge lies on the hull.
    #[inline]
    pub fn is_hull_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        self.halfedge(he).is_hull()
    }

    /// Check if an edge (represented by one of its half-edges) is on the hull.
    #[inline]
    pub fn is_hull_edge(&self, he: HalfEdgeId<I>) -> bool {
        self.is_hull_halfedge(he) || self.is_hull_halfedge(self.twin(he))
    }

    /// Get the half-edge a triangle starts its boundary cycle from.
    #[inline]
    pub fn triangle_halfedge(&self, t: TriangleId<I>) -> HalfEdgeId<I> {
        self.triangle(t).halfedge
    }

    /// Get both half-edges of an undirected edge.
    #[inline]
    pub fn edge_halfedges(&self, e: EdgeId<I>) -> [HalfEdgeId<I>; 2] {
        e.halfedges()
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all vertices with their IDs.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId<I>, &Vertex<I>)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (VertexId::new(i), v))
    }

    /// Iterate over all half-edge IDs.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all half-edges with their IDs.
    pub fn halfedges(&self) -> impl Iterator<Item = (HalfEdgeId<I>, &HalfEdge<I>)> + '_ {
        self.halfedges
            .iter()
            .enumerate()
            .map(|(i, he)| (HalfEdgeId::new(i), he))
    }

    /// Iterate over all undirected edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId<I>> + '_ {
        (0..self.num_edges()).map(EdgeId::new)
    }

    /// Iterate over all triangle IDs.
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId<I>> + '_ {
        (0..self.triangles.len()).map(TriangleId::new)
    }

    /// Iterate over all triangles with their IDs.
    pub fn triangles(&self) -> impl Iterator<Item = (TriangleId<I>, &Triangle<I>)> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .map(|(i, t)| (TriangleId::new(i), t))
    }

    /// Iterate over the half-edges around a triangle.
    pub fn triangle_halfedges(&self, t: TriangleId<I>) -> TriangleHalfEdgeIter<'_, I> {
        TriangleHalfEdgeIter::new(self, t)
    }

    /// Get the three vertices of a triangle, in boundary order.
    pub fn triangle_vertices(&self, t: TriangleId<I>) -> [VertexId<I>; 3] {
        let he0 = self.triangle_halfedge(t);
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [self.origin(he0), self.origin(he1), self.origin(he2)]
    }

    /// Get the initial indices of a triangle's three sites, in boundary order.
    pub fn triangle_sites(&self, t: TriangleId<I>) -> [usize; 3] {
        self.triangle_vertices(t).map(|v| self.initial_index(v))
    }

    /// Iterate over the site triples of all triangles, in closing order.
    pub fn triangle_site_triples(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangle_ids().map(|t| self.triangle_sites(t))
    }

    /// Site triples of all triangles, computed in parallel.
    #[cfg(feature = "parallel")]
    pub fn par_triangle_sites(&self) -> Vec<[usize; 3]> {
        (0..self.triangles.len())
            .into_par_iter()
            .map(|i| self.triangle_sites(TriangleId::new(i)))
            .collect()
    }

    /// Iterate over the outgoing half-edges of a vertex.
    ///
    /// Rotation crosses triangles, so for a vertex on the hull the walk starts
    /// at the hull half-edge and visits its whole fan.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Iterate over vertices adjacent to a vertex.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.destination(he))
    }

    /// Iterate over triangles adjacent to a vertex.
    pub fn vertex_triangles(&self, v: VertexId<I>) -> impl Iterator<Item = TriangleId<I>> + '_ {
        self.vertex_halfedges(v).filter_map(|he| {
            let t = self.triangle_of(he);
            if t.is_valid() {
                Some(t)
            } else {
                None
            }
        })
    }

    /// Compute the valence (degree) of a vertex.
    pub fn valence(&self, v: VertexId<I>) -> usize {
        self.vertex_halfedges(v).count()
    }

    // ==================== Construction ====================

    /// Append an isolated vertex.
    pub(crate) fn push_vertex(&mut self, initial_index: usize) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(initial_index));
        id
    }

    /// Append a twinned pair of half-edges; returns the half-edge from `a`.
    pub(crate) fn push_pair(&mut self, a: VertexId<I>, b: VertexId<I>) -> HalfEdgeId<I> {
        let id = HalfEdgeId::new(self.halfedges.len());
        self.halfedges.push(HalfEdge::new(a));
        self.halfedges.push(HalfEdge::new(b));
        id
    }

    /// Point an isolated vertex at an outgoing half-edge.
    pub(crate) fn attach(&mut self, v: VertexId<I>, he: HalfEdgeId<I>) {
        let vertex = &mut self.vertices[v.index()];
        if vertex.is_isolated() {
            vertex.halfedge = he;
        }
    }

    /// Close the cycle `he0 -> he1 -> he2 -> he0` into a new triangle.
    pub(crate) fn close_triangle(&mut self, cycle: [HalfEdgeId<I>; 3]) -> TriangleId<I> {
        let id = TriangleId::new(self.triangles.len());
        self.triangles.push(Triangle::new(cycle[0]));
        for k in 0..3 {
            let he = &mut self.halfedges[cycle[k].index()];
            he.next = cycle[(k + 1) % 3];
            he.triangle = id;
        }
        id
    }

    // ==================== Validation ====================

    /// Check that all connectivity is consistent.
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        if self.halfedges.len() % 2 != 0 {
            return Err(SinkError::corrupt("unpaired half-edge"));
        }

        for (vid, v) in self.vertices() {
            if v.halfedge.is_valid() {
                if v.halfedge.index() >= self.halfedges.len() {
                    return Err(SinkError::corrupt(format!(
                        "{:?} points at missing {:?}",
                        vid, v.halfedge
                    )));
                }
                if self.origin(v.halfedge) != vid {
                    return Err(SinkError::corrupt(format!(
                        "{:?} points at {:?}, which does not leave it",
                        vid, v.halfedge
                    )));
                }
            }
        }

        for (heid, he) in self.halfedges() {
            if !he.origin.is_valid() || he.origin.index() >= self.vertices.len() {
                return Err(SinkError::corrupt(format!(
                    "{:?} has missing origin {:?}",
                    heid, he.origin
                )));
            }
            if he.origin == self.destination(heid) {
                return Err(SinkError::corrupt(format!("{:?} is a loop", heid)));
            }
            if he.next.is_valid() != he.triangle.is_valid() {
                return Err(SinkError::corrupt(format!(
                    "{:?} has a partial face link",
                    heid
                )));
            }
            if !he.next.is_valid() {
                continue;
            }
            if he.next.index() >= self.halfedges.len()
                || he.triangle.index() >= self.triangles.len()
            {
                return Err(SinkError::corrupt(format!(
                    "{:?} links outside the graph",
                    heid
                )));
            }
            if self.origin(he.next) != self.destination(heid) {
                return Err(SinkError::corrupt(format!(
                    "{:?} ends where {:?} does not start",
                    heid, he.next
                )));
            }
        }

        for (tid, t) in self.triangles() {
            if !t.halfedge.is_valid() || t.halfedge.index() >= self.halfedges.len() {
                return Err(SinkError::corrupt(format!("{:?} has no boundary", tid)));
            }
            let cycle: Vec<HalfEdgeId<I>> = self.triangle_halfedges(tid).take(4).collect();
            if cycle.len() != 3 || self.next(cycle[2]) != t.halfedge {
                return Err(SinkError::corrupt(format!(
                    "{:?} boundary is not a 3-cycle",
                    tid
                )));
            }
            if cycle.iter().any(|&he| self.triangle_of(he) != tid) {
                return Err(SinkError::corrupt(format!(
                    "{:?} boundary crosses another triangle",
                    tid
                )));
            }
            let [a, b, c] = self.triangle_vertices(tid);
            if a == b || b == c || a == c {
                return Err(SinkError::corrupt(format!("{:?} is degenerate", tid)));
            }
        }

        Ok(())
    }

    /// Check if the graph passes [`validate`](Self::validate).
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Iterator over half-edges around a vertex.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    graph: &'a DelaunayGraph<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    remaining: usize,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(graph: &'a DelaunayGraph<I>, v: VertexId<I>) -> Self {
        let incident = graph.vertex(v).halfedge;
        let mut start = incident;

        // Rewind to the hull half-edge of an open fan. Stepping back from `he`
        // goes through the triangle it bounds: twin(prev-in-triangle(he)).
        if incident.is_valid() {
            let mut steps = graph.num_halfedges();
            while steps > 0 && !graph.is_hull_halfedge(start) {
                let back = graph.twin(graph.next(graph.next(start)));
                if back == incident {
                    start = incident;
                    break;
                }
                start = back;
                steps -= 1;
            }
        }

        Self {
            graph,
            start,
            current: start,
            remaining: if start.is_valid() {
                graph.num_halfedges()
            } else {
                0
            },
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let result = self.current;
        self.remaining -= 1;

        // If he goes v -> w, twin(he) goes w -> v and the half-edge after it
        // in its triangle leaves v again.
        let twin = self.graph.twin(self.current);
        if self.graph.is_hull_halfedge(twin) {
            self.remaining = 0;
        } else {
            self.current = self.graph.next(twin);
            if self.current == self.start {
                self.remaining = 0;
            }
        }

        Some(result)
    }
}

/// Iterator over half-edges around a triangle.
pub struct TriangleHalfEdgeIter<'a, I: MeshIndex = u32> {
    graph: &'a DelaunayGraph<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    done: bool,
}

impl<'a, I: MeshIndex> TriangleHalfEdgeIter<'a, I> {
    fn new(graph: &'a DelaunayGraph<I>, t: TriangleId<I>) -> Self {
        let start = graph.triangle_halfedge(t);
        Self {
            graph,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a, I: MeshIndex> Iterator for TriangleHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;
        self.current = self.graph.next(self.current);

        if self.current == self.start || !self.current.is_valid() {
            self.done = true;
        }

        Some(result)
    }
}
