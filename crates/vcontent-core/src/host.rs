#![forbid(unsafe_code)]

//! Render host capability traits.
//!
//! The engine never touches a concrete rendering surface. Node creation,
//! content injection, measurement, scrolling, focus, and timers all go
//! through [`RenderHost`]. Hosts are host-driven: the embedding delivers
//! scroll events with `VirtualContent::handle_scroll` and elapsed timers with
//! `VirtualContent::fire_timer`; nothing in the engine blocks or spawns.

use core::fmt;
use core::time::Duration;

use crate::error::{Result, VirtualContentError};
use crate::geometry::ChunkGeometry;

/// Handle for a timer scheduled through [`Scheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Monotonic clock plus one-shot timers.
///
/// Timers never call back into the engine. When a scheduled timer elapses
/// the embedding hands its id to the instance that scheduled it.
pub trait Scheduler {
    /// Elapsed time since an unspecified epoch, monotonically increasing.
    fn now(&self) -> Duration;

    /// Schedule a one-shot timer `delay` from now.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Cancel a pending timer. Unknown or already-fired ids are ignored.
    fn cancel(&mut self, timer: TimerId);
}

/// Role of a node created by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The virtualized container owned by an instance.
    Container,
    /// Placeholder reserving the height of unmounted chunks.
    Filler,
    /// A mounted chunk.
    Chunk { index: usize },
}

/// A reference to the node an instance should attach to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HostRef<N> {
    #[default]
    Missing,
    /// A node handle.
    Direct(N),
    /// A host-specific selector resolved with [`RenderHost::query_selector`].
    Selector(String),
    /// An array-like collection; resolves to its first element.
    Collection(Vec<N>),
}

impl<N> From<N> for HostRef<N> {
    fn from(node: N) -> Self {
        Self::Direct(node)
    }
}

impl<N> From<Option<N>> for HostRef<N> {
    fn from(node: Option<N>) -> Self {
        node.map_or(Self::Missing, Self::Direct)
    }
}

/// The rendering surface consumed by the windowing engine.
pub trait RenderHost: Scheduler {
    type Node: Clone + PartialEq + fmt::Debug;

    fn create_node(&mut self, kind: NodeKind) -> Self::Node;

    /// Replace the node's content, as markup when `is_html` is set.
    fn set_node_content(&mut self, node: &Self::Node, text: &str, is_html: bool);

    fn set_filler_height(&mut self, node: &Self::Node, height: f64);

    /// Indent the node's first visual line by `left_pad`.
    fn set_leading_indent(&mut self, node: &Self::Node, left_pad: f64);

    /// Append `child` to `parent`, moving it out of any previous parent.
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);

    fn remove_all_children(&mut self, node: &Self::Node);

    /// Remove the node from its parent, if any.
    fn detach(&mut self, node: &Self::Node);

    fn parent_of(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Geometry of a mounted node relative to its container.
    fn measure_geometry(&self, node: &Self::Node) -> ChunkGeometry;

    /// Top edge of the node's bounding box in viewport coordinates.
    fn bounding_top(&self, node: &Self::Node) -> f64;

    fn scroll_position(&self, surface: &Self::Node) -> f64;

    fn set_scroll_position(&mut self, surface: &Self::Node, position: f64);

    fn container_width(&self, node: &Self::Node) -> f64;

    /// Start delivering scroll events for `surface`.
    fn subscribe_scroll(&mut self, surface: &Self::Node);

    /// Stop delivering scroll events for `surface`.
    fn unsubscribe_scroll(&mut self, surface: &Self::Node);

    fn focus(&mut self, surface: &Self::Node);

    /// Look up a node by selector. Hosts without selectors return `None`.
    fn query_selector(&self, _selector: &str) -> Option<Self::Node> {
        None
    }

    /// Resolve a host reference to a direct node handle.
    fn resolve_host_reference(&self, reference: &HostRef<Self::Node>) -> Result<Self::Node> {
        match reference {
            HostRef::Missing => Err(VirtualContentError::invalid_host("no element given")),
            HostRef::Direct(node) => Ok(node.clone()),
            HostRef::Collection(nodes) => nodes
                .first()
                .cloned()
                .ok_or_else(|| VirtualContentError::invalid_host("empty element collection")),
            HostRef::Selector(selector) => self.query_selector(selector).ok_or_else(|| {
                VirtualContentError::invalid_host(format!("no element matches {selector:?}"))
            }),
        }
    }
}
