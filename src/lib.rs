//! # delaunay-sink
//!
//! Construction-time sinks for planar Delaunay triangulations.
//!
//! A sweep-line Voronoi/Delaunay engine discovers edges and triangles in a
//! fixed order and reports them through the [`DelaunaySink`](protocol::DelaunaySink)
//! protocol. This crate does not compute the triangulation; it assembles a
//! persistent representation of it from those events.
//!
//! ## Features
//!
//! - **Half-edge graph**: vertices, triangles and twinned half-edges with
//!   face and vertex traversal, addressed by type-safe indices
//! - **Compact index**: triangles as triples of input point indices
//! - **Checked protocol**: ordering, handle and capacity misuse is reported as
//!   [`SinkError`](error::SinkError) at the offending call
//! - **Replayable traces**: record an event stream once, replay it into any sink
//!
//! ## Quick Start
//!
//! ```
//! use delaunay_sink::prelude::*;
//!
//! // Input points (0,0), (2,0) and (1,2), discovered in x order.
//! let s0 = Site::new(0, 0);
//! let s1 = Site::new(2, 1);
//! let s2 = Site::new(1, 2);
//!
//! let mut builder: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
//! builder.reserve(3).unwrap();
//! builder.process_single_site(&s0).unwrap();
//! let (from_1, _) = builder.insert_new_edge(&s0, &s1).unwrap();
//! let (from_2, _) = builder.insert_new_edge(&s1, &s2).unwrap();
//! builder.insert_closing_edge(&s0, &s2, &(), from_1, from_2).unwrap();
//! builder.build().unwrap();
//!
//! let graph = builder.graph().unwrap();
//! for t in graph.triangle_ids() {
//!     let [a, b, c] = graph.triangle_sites(t);
//!     println!("triangle {:?}: points {} {} {}", t, a, b, c);
//! }
//! ```
//!
//! ## Mesh Traversal
//!
//! ```
//! use delaunay_sink::prelude::*;
//!
//! let mut builder: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
//! Trace::zigzag_strip(5).replay(&mut builder).unwrap();
//! let graph = builder.graph().unwrap();
//!
//! // Iterate over neighbors of a vertex
//! let v = VertexId::new(2);
//! assert_eq!(graph.vertex_neighbors(v).count(), 4);
//!
//! // Walk around a triangle
//! let t = TriangleId::new(0);
//! for he in graph.triangle_halfedges(t) {
//!     assert_eq!(graph.twin(graph.twin(he)), he);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compact;
pub mod error;
pub mod mesh;
pub mod protocol;
pub mod trace;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types:
///
/// ```
/// use delaunay_sink::prelude::*;
/// ```
pub mod prelude {
    pub use crate::compact::{DelaunayIndex, DelaunayIndexBuilder, IndexTriangle};
    pub use crate::error::{Result, SinkError};
    pub use crate::mesh::{
        DelaunayGraph, DelaunayGraphBuilder, EdgeId, HalfEdgeId, MeshIndex, TriangleId, VertexId,
    };
    pub use crate::protocol::{
        BuildOptions, BuildState, DelaunaySink, EdgeHandle, HandleTarget, Site, SiteIndex,
    };
    pub use crate::trace::{HandleRef, Trace};
}
