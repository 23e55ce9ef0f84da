//! Half-edge Delaunay graph and its builder.
//!
//! # Overview
//!
//! [`DelaunayGraphBuilder`] is driven through the construction protocol and,
//! once built, hands out a [`DelaunayGraph`]: a half-edge (doubly-connected
//! edge list) representation of the triangulation with face and vertex
//! traversal.
//!
//! # Index Types
//!
//! Graph elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex (the sorted index of its site)
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`TriangleId`] - Identifies a triangle
//! - [`EdgeId`] - Identifies an undirected edge
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on input size.

mod builder;
mod graph;
mod index;

pub use builder::DelaunayGraphBuilder;
pub use graph::{
    DelaunayGraph, HalfEdge, Triangle, TriangleHalfEdgeIter, Vertex, VertexHalfEdgeIter,
};
pub use index::{EdgeId, HalfEdgeId, MeshIndex, TriangleId, VertexId};
