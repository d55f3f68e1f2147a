#![forbid(unsafe_code)]

//! `vcontent-sim` is a deterministic in-memory render surface for
//! `vcontent-core`.
//!
//! Design goals:
//! - **Host-driven**: tests move the scroll position, advance the clock, and
//!   hand due timers to the instance explicitly.
//! - **Deterministic layout**: block layout with fixed-width glyphs, so chunk
//!   heights follow from text length and container width alone.
//! - **Inspectable**: every node, its parent, content, and geometry can be
//!   read back.
//!
//! [`SimHost`] is a cheap handle; clones share one document, so a test keeps
//! a clone while the instance owns another.
//!
//! # Layout model
//!
//! - A chunk's text (tags stripped for markup) is laid out at
//!   `char_width` per char, wrapped at the chunk's width, with `'\n'`
//!   starting a new line. The leading indent widens the first line. Height is
//!   `lines * line_height`.
//! - A filler is exactly its filler height tall.
//! - Any other node is as tall as its fixed box height if it has one,
//!   otherwise as tall as its children stacked.
//! - Containers start with a fixed box of `viewport_height`, so they scroll
//!   themselves; roots and elements grow with their content unless given a
//!   box.
//! - Widths are inherited from the parent; a detached non-root node is 0
//!   wide.

use core::fmt;
use core::time::Duration;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use vcontent_core::{
    ChunkGeometry, NodeKind, RenderHost, Result, Scheduler, ScrollOutcome, TimerId,
    VirtualContent, VirtualContentError,
};

/// Handle to a node in the simulated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Role of a simulated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimNodeKind {
    /// Top-level node standing in for a page.
    Root,
    /// A plain block created by the test.
    Element,
    Container,
    Filler,
    Chunk { index: usize },
}

impl From<NodeKind> for SimNodeKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Container => Self::Container,
            NodeKind::Filler => Self::Filler,
            NodeKind::Chunk { index } => Self::Chunk { index },
        }
    }
}

/// Metrics for the simulated layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub char_width: f64,
    pub line_height: f64,
    /// Width of root nodes.
    pub viewport_width: f64,
    /// Box height given to new containers.
    pub viewport_height: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 16.0,
            viewport_width: 800.0,
            viewport_height: 400.0,
        }
    }
}

#[derive(Debug, Clone)]
struct SimNode {
    kind: SimNodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    content: String,
    is_html: bool,
    filler_height: f64,
    indent: f64,
    width: Option<f64>,
    box_height: Option<f64>,
    scroll_top: f64,
    selector: Option<String>,
}

impl SimNode {
    fn new(kind: SimNodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            content: String::new(),
            is_html: false,
            filler_height: 0.0,
            indent: 0.0,
            width: None,
            box_height: None,
            scroll_top: 0.0,
            selector: None,
        }
    }
}

#[derive(Debug, Default)]
struct SimDom {
    config: SimConfig,
    nodes: Vec<SimNode>,
    subscribed: BTreeSet<NodeId>,
    focused: Option<NodeId>,
    now: Duration,
    next_timer: u64,
    timers: BTreeMap<TimerId, Duration>,
}

impl SimDom {
    fn node(&self, id: NodeId) -> &SimNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SimNode {
        &mut self.nodes[id.0 as usize]
    }

    fn insert(&mut self, node: SimNode) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        id
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&child| child != id);
        }
    }

    fn width(&self, id: NodeId) -> f64 {
        let node = self.node(id);
        match (node.width, node.parent, node.kind) {
            (Some(width), _, _) => width,
            (None, Some(parent), _) => self.width(parent),
            (None, None, SimNodeKind::Root) => self.config.viewport_width,
            (None, None, _) => 0.0,
        }
    }

    fn text_lines(&self, id: NodeId) -> usize {
        let node = self.node(id);
        let visible = if node.is_html {
            strip_tags(&node.content)
        } else {
            node.content.clone()
        };
        let avail = self.width(id);
        visible
            .split('\n')
            .enumerate()
            .map(|(i, line)| {
                let indent = if i == 0 { node.indent } else { 0.0 };
                let px = indent + line.chars().count() as f64 * self.config.char_width;
                if avail <= 0.0 {
                    1
                } else {
                    ((px / avail).ceil() as usize).max(1)
                }
            })
            .sum()
    }

    fn content_height(&self, id: NodeId) -> f64 {
        let node = self.node(id);
        match node.kind {
            SimNodeKind::Filler => node.filler_height,
            SimNodeKind::Chunk { .. } => self.text_lines(id) as f64 * self.config.line_height,
            _ => node
                .children
                .iter()
                .map(|&child| self.box_height(child))
                .sum(),
        }
    }

    fn box_height(&self, id: NodeId) -> f64 {
        self.node(id)
            .box_height
            .unwrap_or_else(|| self.content_height(id))
    }

    fn offset_in_parent(&self, id: NodeId) -> f64 {
        let Some(parent) = self.node(id).parent else {
            return 0.0;
        };
        self.node(parent)
            .children
            .iter()
            .take_while(|&&child| child != id)
            .map(|&child| self.box_height(child))
            .sum()
    }

    fn page_top(&self, id: NodeId) -> f64 {
        match self.node(id).parent {
            Some(parent) => self.page_top(parent) + self.offset_in_parent(id),
            None => 0.0,
        }
    }

    fn ancestors_scroll(&self, id: NodeId) -> f64 {
        let mut total = 0.0;
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            total += self.node(parent).scroll_top;
            current = self.node(parent).parent;
        }
        total
    }

    fn max_scroll(&self, id: NodeId) -> f64 {
        (self.content_height(id) - self.box_height(id)).max(0.0)
    }

    fn set_scroll(&mut self, id: NodeId, position: f64) {
        let clamped = position.clamp(0.0, self.max_scroll(id));
        self.node_mut(id).scroll_top = clamped;
    }

    fn text_content(&self, id: NodeId) -> String {
        let node = self.node(id);
        let mut out = node.content.clone();
        for &child in &node.children {
            out.push_str(&self.text_content(child));
        }
        out
    }
}

fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    for ch in markup.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Shared handle to a simulated document, clock, and timer queue.
#[derive(Debug, Clone, Default)]
pub struct SimHost {
    dom: Rc<RefCell<SimDom>>,
}

impl SimHost {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            dom: Rc::new(RefCell::new(SimDom {
                config,
                ..SimDom::default()
            })),
        }
    }

    #[must_use]
    pub fn config(&self) -> SimConfig {
        self.dom.borrow().config
    }

    /// Create a detached root, `viewport_width` wide, growing with content.
    pub fn create_root(&self) -> NodeId {
        self.dom
            .borrow_mut()
            .insert(SimNode::new(SimNodeKind::Root))
    }

    /// Create a detached plain block.
    pub fn create_element(&self) -> NodeId {
        self.dom
            .borrow_mut()
            .insert(SimNode::new(SimNodeKind::Element))
    }

    /// Register `selector` for [`RenderHost::query_selector`].
    pub fn set_selector(&self, node: NodeId, selector: &str) {
        self.dom.borrow_mut().node_mut(node).selector = Some(selector.to_string());
    }

    /// Give a node a fixed box height, or let it grow with `None`.
    pub fn set_box_height(&self, node: NodeId, height: Option<f64>) {
        self.dom.borrow_mut().node_mut(node).box_height = height;
    }

    /// Fix a node's width, or inherit it with `None`.
    pub fn set_width(&self, node: NodeId, width: Option<f64>) {
        self.dom.borrow_mut().node_mut(node).width = width;
    }

    /// Mount `child` under `parent`, as a page script would.
    pub fn append(&self, parent: NodeId, child: NodeId) {
        let mut dom = self.dom.borrow_mut();
        dom.detach(child);
        dom.node_mut(child).parent = Some(parent);
        dom.node_mut(parent).children.push(child);
    }

    /// Move the scroll position, clamped to the scrollable range.
    pub fn scroll_to(&self, node: NodeId, position: f64) {
        self.dom.borrow_mut().set_scroll(node, position);
        tracing::trace!(node = %node, position, "sim.scroll");
    }

    #[must_use]
    pub fn scroll_top(&self, node: NodeId) -> f64 {
        self.dom.borrow().node(node).scroll_top
    }

    #[must_use]
    pub fn max_scroll(&self, node: NodeId) -> f64 {
        self.dom.borrow().max_scroll(node)
    }

    #[must_use]
    pub fn kind(&self, node: NodeId) -> SimNodeKind {
        self.dom.borrow().node(node).kind
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.borrow().node(node).parent
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.dom.borrow().node(node).children.clone()
    }

    #[must_use]
    pub fn children_count(&self, node: NodeId) -> usize {
        self.dom.borrow().node(node).children.len()
    }

    /// Chunk indices mounted directly under `node`, in document order.
    #[must_use]
    pub fn mounted_chunks(&self, node: NodeId) -> Vec<usize> {
        let dom = self.dom.borrow();
        dom.node(node)
            .children
            .iter()
            .filter_map(|&child| match dom.node(child).kind {
                SimNodeKind::Chunk { index } => Some(index),
                _ => None,
            })
            .collect()
    }

    /// Heights of the fillers directly under `node`, in document order.
    #[must_use]
    pub fn filler_heights(&self, node: NodeId) -> Vec<f64> {
        let dom = self.dom.borrow();
        dom.node(node)
            .children
            .iter()
            .filter(|&&child| dom.node(child).kind == SimNodeKind::Filler)
            .map(|&child| dom.node(child).filler_height)
            .collect()
    }

    /// Raw content of `node` and its descendants concatenated.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        self.dom.borrow().text_content(node)
    }

    #[must_use]
    pub fn content(&self, node: NodeId) -> String {
        self.dom.borrow().node(node).content.clone()
    }

    #[must_use]
    pub fn is_html(&self, node: NodeId) -> bool {
        self.dom.borrow().node(node).is_html
    }

    #[must_use]
    pub fn indent(&self, node: NodeId) -> f64 {
        self.dom.borrow().node(node).indent
    }

    #[must_use]
    pub fn height(&self, node: NodeId) -> f64 {
        self.dom.borrow().box_height(node)
    }

    #[must_use]
    pub fn content_height(&self, node: NodeId) -> f64 {
        self.dom.borrow().content_height(node)
    }

    #[must_use]
    pub fn is_subscribed(&self, node: NodeId) -> bool {
        self.dom.borrow().subscribed.contains(&node)
    }

    #[must_use]
    pub fn focused(&self) -> Option<NodeId> {
        self.dom.borrow().focused
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.dom.borrow().timers.len()
    }

    /// Advance the clock and return the timers now due, earliest first.
    pub fn advance(&self, dt: Duration) -> Vec<TimerId> {
        let mut dom = self.dom.borrow_mut();
        dom.now = dom.now.saturating_add(dt);
        let now = dom.now;
        let mut due: Vec<(Duration, TimerId)> = dom
            .timers
            .iter()
            .filter(|&(_, &deadline)| deadline <= now)
            .map(|(&id, &deadline)| (deadline, id))
            .collect();
        due.sort();
        for (_, id) in &due {
            dom.timers.remove(id);
        }
        due.into_iter().map(|(_, id)| id).collect()
    }
}

impl Scheduler for SimHost {
    fn now(&self) -> Duration {
        self.dom.borrow().now
    }

    fn schedule(&mut self, delay: Duration) -> TimerId {
        let mut dom = self.dom.borrow_mut();
        dom.next_timer += 1;
        let id = TimerId(dom.next_timer);
        let deadline = dom.now.saturating_add(delay);
        dom.timers.insert(id, deadline);
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        self.dom.borrow_mut().timers.remove(&timer);
    }
}

impl RenderHost for SimHost {
    type Node = NodeId;

    fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let mut dom = self.dom.borrow_mut();
        let mut node = SimNode::new(kind.into());
        if kind == NodeKind::Container {
            node.box_height = Some(dom.config.viewport_height);
        }
        dom.insert(node)
    }

    fn set_node_content(&mut self, node: &NodeId, text: &str, is_html: bool) {
        let mut dom = self.dom.borrow_mut();
        let node = dom.node_mut(*node);
        node.content = text.to_string();
        node.is_html = is_html;
    }

    fn set_filler_height(&mut self, node: &NodeId, height: f64) {
        self.dom.borrow_mut().node_mut(*node).filler_height = height;
    }

    fn set_leading_indent(&mut self, node: &NodeId, left_pad: f64) {
        self.dom.borrow_mut().node_mut(*node).indent = left_pad;
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        self.append(*parent, *child);
    }

    fn remove_all_children(&mut self, node: &NodeId) {
        let mut dom = self.dom.borrow_mut();
        let children = std::mem::take(&mut dom.node_mut(*node).children);
        for child in children {
            dom.node_mut(child).parent = None;
        }
    }

    fn detach(&mut self, node: &NodeId) {
        self.dom.borrow_mut().detach(*node);
    }

    fn parent_of(&self, node: &NodeId) -> Option<NodeId> {
        self.parent(*node)
    }

    fn measure_geometry(&self, node: &NodeId) -> ChunkGeometry {
        let dom = self.dom.borrow();
        ChunkGeometry {
            top: dom.offset_in_parent(*node),
            height: dom.box_height(*node),
            left_pad: dom.node(*node).indent,
        }
    }

    fn bounding_top(&self, node: &NodeId) -> f64 {
        let dom = self.dom.borrow();
        dom.page_top(*node) - dom.ancestors_scroll(*node)
    }

    fn scroll_position(&self, surface: &NodeId) -> f64 {
        self.scroll_top(*surface)
    }

    fn set_scroll_position(&mut self, surface: &NodeId, position: f64) {
        self.dom.borrow_mut().set_scroll(*surface, position);
    }

    fn container_width(&self, node: &NodeId) -> f64 {
        self.dom.borrow().width(*node)
    }

    fn subscribe_scroll(&mut self, surface: &NodeId) {
        self.dom.borrow_mut().subscribed.insert(*surface);
    }

    fn unsubscribe_scroll(&mut self, surface: &NodeId) {
        self.dom.borrow_mut().subscribed.remove(surface);
    }

    fn focus(&mut self, surface: &NodeId) {
        self.dom.borrow_mut().focused = Some(*surface);
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        let dom = self.dom.borrow();
        dom.nodes
            .iter()
            .position(|node| node.selector.as_deref() == Some(selector))
            .and_then(|index| u32::try_from(index).ok())
            .map(NodeId)
    }
}

/// Scroll the instance's surface to `position` and deliver the scroll event
/// if the surface is subscribed.
pub fn scroll(
    view: &mut VirtualContent<SimHost>,
    host: &SimHost,
    position: f64,
) -> Result<ScrollOutcome> {
    let surface = view.scrollable().ok_or(VirtualContentError::Destroyed)?;
    host.scroll_to(surface, position);
    if host.is_subscribed(surface) {
        view.handle_scroll()
    } else {
        Ok(ScrollOutcome::Ignored)
    }
}

/// Advance the clock by `dt` and hand every due timer to the instance.
pub fn advance(
    view: &mut VirtualContent<SimHost>,
    host: &SimHost,
    dt: Duration,
) -> Result<Vec<ScrollOutcome>> {
    host.advance(dt)
        .into_iter()
        .map(|timer| view.fire_timer(timer))
        .collect()
}

/// Scroll, then let the rate limiter settle.
pub fn scroll_settled(
    view: &mut VirtualContent<SimHost>,
    host: &SimHost,
    position: f64,
    settle: Duration,
) -> Result<ScrollOutcome> {
    let immediate = scroll(view, host, position)?;
    let fired = advance(view, host, settle)?;
    Ok(fired.into_iter().last().unwrap_or(immediate))
}
