//! Recorded construction event streams.
//!
//! A [`Trace`] is a fixed sequence of protocol events that can be replayed
//! into any [`DelaunaySink`]. Closing events name the handles they consume by
//! the event that issued them and the position in that event's returned pair,
//! so the same trace drives sinks with different handle kinds.
//!
//! # Example
//!
//! ```
//! use delaunay_sink::prelude::*;
//!
//! let trace = Trace::zigzag_strip(6);
//!
//! let mut graph: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
//! trace.replay(&mut graph).unwrap();
//! let mut index = DelaunayIndexBuilder::new();
//! trace.replay(&mut index).unwrap();
//!
//! assert_eq!(graph.graph().unwrap().num_triangles(), 4);
//! assert_eq!(index.index().unwrap().num_triangles(), 4);
//! ```

use crate::error::{Result, SinkError};
use crate::protocol::{DelaunaySink, EdgeHandle, Site};

/// Which handle of an edge-creating event's returned pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The first handle: the edge from the second or third site.
    First,
    /// The second handle: the edge from the first site.
    Second,
}

/// A reference to a handle issued by an earlier event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleRef {
    /// Position of the issuing event in the trace.
    pub event: usize,
    /// Which of the event's two handles.
    pub slot: Slot,
}

impl HandleRef {
    /// The first handle returned by `event`.
    pub fn first(event: usize) -> Self {
        Self {
            event,
            slot: Slot::First,
        }
    }

    /// The second handle returned by `event`.
    pub fn second(event: usize) -> Self {
        Self {
            event,
            slot: Slot::Second,
        }
    }
}

/// One protocol call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// `process_single_site(site)`.
    SingleSite(Site),
    /// `insert_new_edge(site1, site2)`.
    NewEdge {
        /// First site of the edge.
        site1: Site,
        /// Second site of the edge.
        site2: Site,
    },
    /// `insert_closing_edge(site1, site3, circle, edge12, edge23)`.
    ClosingEdge {
        /// First site of the new edge.
        site1: Site,
        /// Second site of the new edge.
        site3: Site,
        /// The edge from the implicit middle site towards `site1`.
        edge12: HandleRef,
        /// The edge from `site3` towards the implicit middle site.
        edge23: HandleRef,
    },
}

/// A replayable construction event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    num_sites: usize,
    events: Vec<Event>,
}

impl Trace {
    /// Create an empty trace over `num_sites` sites.
    pub fn new(num_sites: usize) -> Self {
        Self {
            num_sites,
            events: Vec::new(),
        }
    }

    /// Number of sites passed to `reserve` on replay.
    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    /// The recorded events.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn push(&mut self, event: Event) -> usize {
        self.events.push(event);
        self.events.len() - 1
    }

    /// Record a standalone site; returns the event position.
    pub fn single_site(&mut self, site: Site) -> usize {
        self.push(Event::SingleSite(site))
    }

    /// Record a new edge; returns the event position.
    pub fn new_edge(&mut self, site1: Site, site2: Site) -> usize {
        self.push(Event::NewEdge { site1, site2 })
    }

    /// Record a triangle closure; returns the event position.
    pub fn closing_edge(
        &mut self,
        site1: Site,
        site3: Site,
        edge12: HandleRef,
        edge23: HandleRef,
    ) -> usize {
        self.push(Event::ClosingEdge {
            site1,
            site3,
            edge12,
            edge23,
        })
    }

    /// Drive `sink` through `reserve`, every event, and `build`.
    pub fn replay<S: DelaunaySink>(&self, sink: &mut S) -> Result<()> {
        sink.reserve(self.num_sites)?;

        let mut issued: Vec<Option<(EdgeHandle, EdgeHandle)>> =
            Vec::with_capacity(self.events.len());
        for (position, event) in self.events.iter().enumerate() {
            let handles = match *event {
                Event::SingleSite(site) => {
                    sink.process_single_site(&site)?;
                    None
                }
                Event::NewEdge { site1, site2 } => Some(sink.insert_new_edge(&site1, &site2)?),
                Event::ClosingEdge {
                    site1,
                    site3,
                    edge12,
                    edge23,
                } => {
                    let edge12 = resolve(&issued, position, edge12)?;
                    let edge23 = resolve(&issued, position, edge23)?;
                    Some(sink.insert_closing_edge(&site1, &site3, &(), edge12, edge23)?)
                }
            };
            issued.push(handles);
        }

        sink.build()
    }

    /// The event stream of a zigzag strip of `n` sites.
    ///
    /// Site `k` sits at `(k, k % 2)`; sites arrive in x order, so the sorted
    /// index equals `k`. Initial indices are assigned in reverse, `n - 1 - k`,
    /// to keep the two index spaces apart. Triangles are `{k, k+1, k+2}`.
    pub fn zigzag_strip(n: usize) -> Self {
        let site = |k: usize| Site::new(n - 1 - k, k);
        let mut trace = Self::new(n);

        match n {
            0 => return trace,
            1 => {
                trace.single_site(site(0));
                return trace;
            }
            _ => {}
        }

        // The open half-edge shared with the next triangle, and its endpoints:
        // it runs from `tail` to `head`.
        let first = trace.new_edge(site(0), site(1));
        let mut open = HandleRef::first(first);
        let (mut tail, mut head) = (1, 0);

        for k in 2..n {
            let edge = trace.new_edge(site(tail), site(k));
            let close = trace.closing_edge(site(head), site(k), open, HandleRef::first(edge));

            // Alternate the fan so consecutive triangles walk along the strip.
            if k % 2 == 0 {
                open = HandleRef::second(edge);
                head = k;
            } else {
                open = HandleRef::first(close);
                tail = k;
            }
        }

        trace
    }
}

fn resolve(
    issued: &[Option<(EdgeHandle, EdgeHandle)>],
    event: usize,
    handle: HandleRef,
) -> Result<EdgeHandle> {
    let unresolved = SinkError::UnresolvedHandle {
        event,
        referenced: handle.event,
    };
    match issued.get(handle.event) {
        Some(Some((first, second))) => Ok(match handle.slot {
            Slot::First => *first,
            Slot::Second => *second,
        }),
        _ => Err(unresolved),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::DelaunayIndexBuilder;
    use crate::mesh::DelaunayGraphBuilder;
    use crate::protocol::BuildState;

    #[test]
    fn test_strip_shape() {
        let trace = Trace::zigzag_strip(5);
        // One opening edge, then an edge and a closure per extra site.
        assert_eq!(trace.events().len(), 1 + 2 * 3);
        assert_eq!(trace.num_sites(), 5);

        let mut b = DelaunayIndexBuilder::new();
        trace.replay(&mut b).unwrap();
        let mut triangles: Vec<[usize; 3]> = b
            .index()
            .unwrap()
            .triangles()
            .iter()
            .map(|t| {
                let mut s = t.sites();
                s.sort();
                s
            })
            .collect();
        triangles.sort();
        // Initial index of site k is 4 - k.
        assert_eq!(triangles, vec![[0, 1, 2], [1, 2, 3], [2, 3, 4]]);
    }

    #[test]
    fn test_tiny_strips() {
        for n in 0..3 {
            let mut b: DelaunayGraphBuilder = DelaunayGraphBuilder::new();
            Trace::zigzag_strip(n).replay(&mut b).unwrap();
            let g = b.graph().unwrap();
            assert_eq!(g.num_vertices(), n);
            assert_eq!(g.num_triangles(), 0);
        }
    }

    #[test]
    fn test_unresolved_handle() {
        let mut trace = Trace::new(3);
        let single = trace.single_site(Site::new(0, 0));
        let edge = trace.new_edge(Site::new(0, 0), Site::new(1, 1));
        trace.closing_edge(
            Site::new(0, 0),
            Site::new(2, 2),
            HandleRef::first(single),
            HandleRef::first(edge),
        );

        let mut b = DelaunayIndexBuilder::new();
        assert_eq!(
            trace.replay(&mut b),
            Err(SinkError::UnresolvedHandle {
                event: 2,
                referenced: 0
            })
        );
        assert_eq!(b.state(), BuildState::Building);
    }
}
