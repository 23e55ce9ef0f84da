//! Error types for the construction sinks.
//!
//! Every misuse of the construction protocol is reported at the point of
//! violation. A failing call leaves the sink exactly as it was.

use std::fmt;

use thiserror::Error;

use crate::protocol::{BuildState, EdgeHandle};

/// Result type alias using [`SinkError`].
pub type Result<T> = std::result::Result<T, SinkError>;

/// The arenas whose capacity is fixed by `reserve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arena {
    /// One vertex per site.
    Vertices,
    /// Directed half-edges, allocated in twinned pairs.
    HalfEdges,
    /// Closed triangular faces.
    Triangles,
    /// Sort positions of sites, for sinks without vertex storage.
    Sites,
}

impl fmt::Display for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Arena::Vertices => "vertex",
            Arena::HalfEdges => "half-edge",
            Arena::Triangles => "triangle",
            Arena::Sites => "site",
        };
        f.write_str(name)
    }
}

/// Why an edge handle was rejected by a closing operation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleFault {
    /// The handle was issued by a different sink instance.
    #[error("issued by another sink")]
    ForeignSink,
    /// The handle targets the wrong kind of element for this sink.
    #[error("wrong handle kind for this sink")]
    WrongKind,
    /// The referenced half-edge was never issued.
    #[error("half-edge was never issued")]
    NotIssued,
    /// The referenced half-edge already bounds a triangle.
    #[error("half-edge already bounds a triangle")]
    Consumed,
    /// The same handle was passed for both edges of a closure.
    #[error("same half-edge passed twice")]
    Repeated,
    /// The half-edges do not connect the sites named by the closure.
    #[error("half-edges do not connect the closing sites")]
    Disconnected,
}

/// Errors that can occur while driving a sink through the construction protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// An operation was called in a state that does not permit it.
    #[error("`{operation}` is not permitted while the sink is {state}")]
    ProtocolViolation {
        /// The rejected operation.
        operation: &'static str,
        /// The state the sink was in.
        state: BuildState,
    },

    /// A closing operation received a handle it cannot use.
    #[error("invalid edge handle {handle:?}: {fault}")]
    InvalidHandle {
        /// The rejected handle.
        handle: EdgeHandle,
        /// The reason it was rejected.
        fault: HandleFault,
    },

    /// More elements were created than `reserve` accounted for.
    #[error("{arena} capacity of {capacity} exhausted")]
    CapacityExceeded {
        /// The exhausted arena.
        arena: Arena,
        /// The capacity derived from the reservation.
        capacity: usize,
    },

    /// The reservation does not fit the graph's index type.
    #[error("{requested} half-edges exceed the index range (max {max})")]
    IndexOverflow {
        /// Half-edges the reservation would need.
        requested: usize,
        /// The largest index the index type can hold.
        max: usize,
    },

    /// A site was referenced before it was discovered.
    #[error("site with sorted index {sorted_index} is unknown (next new site is {expected})")]
    UnknownSite {
        /// The sorted index of the referenced site.
        sorted_index: usize,
        /// The sorted index the next new site must carry.
        expected: usize,
    },

    /// A standalone site was registered twice.
    #[error("site with sorted index {sorted_index} is already registered")]
    DuplicateSite {
        /// The sorted index of the site.
        sorted_index: usize,
    },

    /// Both endpoints of an edge are the same site.
    #[error("both endpoints are the site with sorted index {sorted_index}")]
    CoincidentSites {
        /// The sorted index of the site.
        sorted_index: usize,
    },

    /// A site's initial index disagrees with the vertex registered for it.
    #[error(
        "site with sorted index {sorted_index} has initial index {given}, \
         but was registered with {registered}"
    )]
    SiteMismatch {
        /// The sorted index of the site.
        sorted_index: usize,
        /// The initial index passed in this call.
        given: usize,
        /// The initial index stored on the vertex.
        registered: usize,
    },

    /// The validation pass found an inconsistent structure.
    #[error("corrupt topology: {details}")]
    CorruptTopology {
        /// Description of the first inconsistency found.
        details: String,
    },

    /// A recorded trace refers to a handle that cannot be resolved.
    #[error("event {event} refers to unresolvable handles of event {referenced}")]
    UnresolvedHandle {
        /// The event holding the reference.
        event: usize,
        /// The referenced event.
        referenced: usize,
    },
}

impl SinkError {
    /// Create a protocol violation error.
    pub fn protocol(operation: &'static str, state: BuildState) -> Self {
        SinkError::ProtocolViolation { operation, state }
    }

    /// Create an invalid handle error.
    pub fn handle(handle: EdgeHandle, fault: HandleFault) -> Self {
        SinkError::InvalidHandle { handle, fault }
    }

    /// Create a corrupt topology error.
    pub fn corrupt<T: fmt::Display>(details: T) -> Self {
        SinkError::CorruptTopology {
            details: details.to_string(),
        }
    }
}
