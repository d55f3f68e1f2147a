#![forbid(unsafe_code)]

//! The `VirtualContent` instance: content assignment, attachment, scroll
//! handling, and teardown.
//!
//! An instance owns one render host handle, one container node, and the
//! current content generation. All methods are driven by the embedding:
//!
//! - [`VirtualContent::handle_scroll`] for every scroll event on the surface,
//! - [`VirtualContent::fire_timer`] when a timer scheduled by the instance
//!   elapses,
//! - [`InstanceRegistry::poll`] for the shared width poller.
//!
//! While a window update is in progress the instance is unsubscribed from the
//! host and ignores any scroll event it is handed anyway.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use crate::config::{ChunkPreProcessor, VirtualContentConfig, WindowMode};
use crate::content::ContentValue;
use crate::error::{Result, VirtualContentError};
use crate::geometry::{ChunkGeometry, GeometryCache, GeometryField, GeometryUpdate};
use crate::host::{HostRef, NodeKind, RenderHost, TimerId};
use crate::rate_limit::{Gate, RateLimiter};
use crate::registry::{InstanceId, InstanceRegistry, WidthWatcher};
use crate::splitter::{ChunkedContent, ContentSplitter, ContentType};
use crate::viewport::ViewportTracker;
use crate::window::{WindowManager, WindowState};

/// Result of delivering a scroll event or a timer to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// Not subscribed, mid-update, or not this instance's timer.
    Ignored,
    /// Waiting on a rate-limit timer.
    Deferred,
    /// Swallowed by a throttle without a trailing edge.
    Dropped,
    /// The pointer was recomputed; the window did not need to change.
    Unchanged,
    /// The mounted window changed.
    Updated,
}

struct Inner<H: RenderHost> {
    id: InstanceId,
    host: H,
    chunk_pre_processor: Option<ChunkPreProcessor>,
    splitter: ContentSplitter,
    content: ChunkedContent,
    cache: GeometryCache,
    window: WindowManager,
    viewport: ViewportTracker,
    limiter: RateLimiter,
    container: H::Node,
    scrollable: Option<H::Node>,
    mounted: Vec<(usize, H::Node)>,
    pointer: usize,
    subscribed: bool,
    destroyed: bool,
}

/// A virtualized view over one large text or markup document.
pub struct VirtualContent<H: RenderHost + 'static> {
    id: InstanceId,
    inner: Rc<RefCell<Inner<H>>>,
}

impl<H: RenderHost + 'static> VirtualContent<H> {
    /// Create an instance whose container is also its scroll surface.
    pub fn create(host: H, config: VirtualContentConfig) -> Self {
        Self::create_with_scrollable(host, config, HostRef::Missing)
    }

    /// Create an instance scrolled by an ancestor surface. A reference that
    /// does not resolve falls back to the container itself.
    pub fn create_with_scrollable(
        mut host: H,
        config: VirtualContentConfig,
        scrollable: HostRef<H::Node>,
    ) -> Self {
        let config = config.validated();
        let id = InstanceId::next();
        let container = host.create_node(NodeKind::Container);
        let surface = host
            .resolve_host_reference(&scrollable)
            .unwrap_or_else(|_| container.clone());
        host.subscribe_scroll(&surface);

        let splitter = ContentSplitter::new(config.chunk_size);
        let inner = Inner {
            id,
            host,
            chunk_pre_processor: config.chunk_pre_processor.clone(),
            content: ChunkedContent::new(String::new(), config.content_type, &splitter),
            splitter,
            cache: GeometryCache::default(),
            window: WindowManager::new(config.mode, config.threshold),
            viewport: ViewportTracker::new(),
            limiter: RateLimiter::new(config.rate_limit_policy, config.rate_limit_interval()),
            container,
            scrollable: Some(surface),
            mounted: Vec::new(),
            pointer: 0,
            subscribed: true,
            destroyed: false,
        };
        tracing::debug!(
            id = %id,
            mode = ?config.mode,
            chunk_size = config.chunk_size,
            threshold = config.threshold,
            "vcontent.create"
        );

        let instance = Self {
            id,
            inner: Rc::new(RefCell::new(inner)),
        };
        if InstanceRegistry::is_tracking()
            && let Err(err) = instance.register()
        {
            tracing::warn!(id = %id, %err, "vcontent.registry.register failed");
        }
        instance
    }

    fn register(&self) -> Result<()> {
        let watcher: Rc<dyn WidthWatcher> = self.inner.clone();
        InstanceRegistry::register(self.id, Rc::downgrade(&watcher))
    }

    /// Replace the content with plain text.
    pub fn set_text(&mut self, value: impl Into<ContentValue>) -> Result<&mut Self> {
        self.inner
            .borrow_mut()
            .set_content(value.into(), ContentType::Text)?;
        Ok(self)
    }

    /// Replace the content with markup.
    pub fn set_html(&mut self, value: impl Into<ContentValue>) -> Result<&mut Self> {
        self.inner
            .borrow_mut()
            .set_content(value.into(), ContentType::Html)?;
        Ok(self)
    }

    #[must_use]
    pub fn is_html_content(&self) -> bool {
        self.inner.borrow().content.content_type().is_html()
    }

    /// Attach the container under `target` and mount the initial window.
    pub fn render_to(&mut self, target: impl Into<HostRef<H::Node>>) -> Result<&mut Self> {
        self.inner.borrow_mut().render_to(&target.into())?;
        Ok(self)
    }

    /// Tear the instance down. Every later mutating call fails with
    /// [`VirtualContentError::Destroyed`].
    pub fn destroy(&mut self) -> Result<&mut Self> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_alive()?;
        inner.teardown();
        drop(inner);
        Ok(self)
    }

    /// Register with the width poller even though the instance was created
    /// before tracking was enabled.
    pub fn track(&mut self) -> Result<&mut Self> {
        self.inner.borrow().ensure_alive()?;
        self.register()?;
        Ok(self)
    }

    #[must_use]
    pub fn is_tracked(&self) -> bool {
        InstanceRegistry::contains(self.id)
    }

    /// Deliver one scroll event from the surface.
    pub fn handle_scroll(&mut self) -> Result<ScrollOutcome> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        inner.ensure_alive()?;
        if !inner.subscribed || inner.window.state() == WindowState::Updating {
            return Ok(ScrollOutcome::Ignored);
        }
        match inner.limiter.on_event(&mut inner.host) {
            Gate::Fire => inner.scroll_tick(),
            Gate::Deferred => Ok(ScrollOutcome::Deferred),
            Gate::Dropped => Ok(ScrollOutcome::Dropped),
        }
    }

    /// Deliver an elapsed timer. Timers this instance did not schedule are
    /// ignored.
    pub fn fire_timer(&mut self, timer: TimerId) -> Result<ScrollOutcome> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        inner.ensure_alive()?;
        if !inner.limiter.on_timer(timer, &inner.host) {
            return Ok(ScrollOutcome::Ignored);
        }
        if inner.window.state() == WindowState::Updating {
            return Ok(ScrollOutcome::Ignored);
        }
        inner.scroll_tick()
    }

    /// Drop cached geometry, store the current width, and re-measure the
    /// mounted chunks.
    pub fn recalculate(&mut self) -> Result<&mut Self> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_alive()?;
        inner.recalculate()?;
        drop(inner);
        Ok(self)
    }

    /// Recalculate if the container width changed since it was last stored.
    pub fn check_width(&mut self) -> Result<bool> {
        let mut inner = self.inner.borrow_mut();
        inner.ensure_alive()?;
        inner.check_width()
    }

    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Text of every chunk in the current generation.
    #[must_use]
    pub fn chunks(&self) -> Vec<String> {
        self.inner
            .borrow()
            .content
            .iter()
            .map(|chunk| chunk.text.to_owned())
            .collect()
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.inner.borrow().content.len()
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.inner.borrow().content.content_type()
    }

    /// Mounted chunk indices in order.
    #[must_use]
    pub fn visible(&self) -> Vec<usize> {
        self.inner.borrow().window.visible().as_slice().to_vec()
    }

    #[must_use]
    pub fn pointer(&self) -> usize {
        self.inner.borrow().pointer
    }

    #[must_use]
    pub fn mode(&self) -> WindowMode {
        self.inner.borrow().window.mode()
    }

    #[must_use]
    pub fn state(&self) -> WindowState {
        self.inner.borrow().window.state()
    }

    #[must_use]
    pub fn container(&self) -> H::Node {
        self.inner.borrow().container.clone()
    }

    /// The scroll surface; `None` once destroyed.
    #[must_use]
    pub fn scrollable(&self) -> Option<H::Node> {
        self.inner.borrow().scrollable.clone()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.borrow().is_attached()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.inner.borrow().subscribed
    }

    /// Rate-limit timer currently pending, if any.
    #[must_use]
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.inner.borrow().limiter.pending()
    }

    /// Cached geometry of a chunk; fields never measured read as `None`.
    #[must_use]
    pub fn cached_geometry(&self, index: usize) -> GeometryUpdate {
        let inner = self.inner.borrow();
        GeometryUpdate {
            offset_top: inner.cache.slot(index, GeometryField::OffsetTop).value(),
            height: inner.cache.slot(index, GeometryField::Height).value(),
            left_pad: inner.cache.slot(index, GeometryField::LeftPad).value(),
        }
    }

    /// Estimated offset of a chunk from the cached heights before it.
    pub fn offset_top_by_heights(&self, index: usize) -> Result<f64> {
        self.inner.borrow().cache.offset_top_by_heights(index)
    }
}

impl<H: RenderHost + 'static> Drop for VirtualContent<H> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_borrow_mut()
            && !inner.destroyed
        {
            inner.teardown();
        }
    }
}

impl<H: RenderHost + 'static> WidthWatcher for RefCell<Inner<H>> {
    fn check_width(&self) -> bool {
        // Busy instances are picked up on the next poll.
        let Ok(mut inner) = self.try_borrow_mut() else {
            return false;
        };
        if inner.destroyed || !inner.is_attached() {
            return false;
        }
        match inner.check_width() {
            Ok(recalculated) => recalculated,
            Err(err) => {
                tracing::warn!(id = %inner.id, %err, "vcontent.recalculate failed");
                false
            }
        }
    }
}

impl<H: RenderHost> Inner<H> {
    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            Err(VirtualContentError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn surface(&self) -> Result<H::Node> {
        self.scrollable.clone().ok_or(VirtualContentError::Destroyed)
    }

    fn is_attached(&self) -> bool {
        self.host.parent_of(&self.container).is_some()
    }

    fn set_content(&mut self, value: ContentValue, content_type: ContentType) -> Result<()> {
        self.ensure_alive()?;
        let source = value.coerce()?;
        let surface = self.surface()?;

        self.content = ChunkedContent::new(source, content_type, &self.splitter);
        self.cache.reset(self.content.len());
        self.pointer = 0;
        self.window.visible_mut().clear();
        self.mounted.clear();
        self.host.remove_all_children(&self.container);
        self.host.set_scroll_position(&surface, 0.0);
        tracing::debug!(
            id = %self.id,
            content_type = ?content_type,
            bytes = self.content.source().len(),
            chunks = self.content.len(),
            "vcontent.set_content"
        );

        if self.is_attached() && !self.content.is_empty() {
            self.perform_update(0, 0, false)?;
        }
        Ok(())
    }

    fn render_to(&mut self, target: &HostRef<H::Node>) -> Result<()> {
        self.ensure_alive()?;
        let target = self.host.resolve_host_reference(target)?;
        self.host.append_child(&target, &self.container);
        let width = self.viewport.store_width(&self.host, &self.container);
        tracing::debug!(
            id = %self.id,
            width,
            chunks = self.content.len(),
            "vcontent.render_to"
        );
        if !self.content.is_empty() {
            self.perform_update(self.pointer, self.pointer, false)?;
        }
        Ok(())
    }

    fn current_pointer(&self, surface: &H::Node) -> usize {
        let scroll_top = ViewportTracker::content_scroll_top(&self.host, &self.container, surface);
        let fallback = ViewportTracker::fallback_pointer(
            self.window.mode(),
            self.window.visible().last(),
            self.content.len(),
        );
        ViewportTracker::current_pointer(&self.cache, scroll_top, fallback)
    }

    /// Rate-limited scroll handler body.
    fn scroll_tick(&mut self) -> Result<ScrollOutcome> {
        let surface = self.surface()?;
        let prev = self.pointer;
        self.pointer = self.current_pointer(&surface);
        tracing::trace!(id = %self.id, prev, pointer = self.pointer, "vcontent.scroll");

        self.check_width()?;

        if !self.window.need_update(prev, self.pointer, self.content.len()) {
            return Ok(ScrollOutcome::Unchanged);
        }
        self.perform_update(prev, self.pointer, true)?;
        Ok(ScrollOutcome::Updated)
    }

    /// Run a window update with scroll delivery suspended.
    fn perform_update(&mut self, prev: usize, next: usize, focus: bool) -> Result<()> {
        let surface = self.surface()?;
        let scroll_top = self.host.scroll_position(&surface);
        let resubscribe = self.subscribed;

        self.window.set_state(WindowState::Updating);
        if resubscribe {
            self.host.unsubscribe_scroll(&surface);
            self.subscribed = false;
        }

        let result = self.update_window(prev, next);

        if focus {
            self.host.focus(&surface);
        }
        if self.window.mode() == WindowMode::Replace {
            self.host.set_scroll_position(&surface, scroll_top);
        }
        if resubscribe {
            self.host.subscribe_scroll(&surface);
            self.subscribed = true;
        }
        self.window.set_state(WindowState::Idle);
        result
    }

    fn update_window(&mut self, prev: usize, next: usize) -> Result<()> {
        let count = self.content.len();
        match self.window.mode() {
            WindowMode::Replace => {
                let range = self.window.window_range(next, count);
                let _span = tracing::debug_span!(
                    "vcontent.update",
                    mode = "replace",
                    prev,
                    pointer = next,
                    start = range.start,
                    end = range.end,
                )
                .entered();

                let lead = self.cache.cumulative_height(0..range.start)?;
                let trail = self.cache.cumulative_height(range.end..count)?;

                self.host.remove_all_children(&self.container);
                self.window.visible_mut().clear();
                self.mounted.clear();

                self.mount_filler(lead);
                for index in range.clone() {
                    let left_pad = if index == range.start {
                        self.cache.left_pad(index)
                    } else {
                        0.0
                    };
                    self.mount_chunk(index, left_pad)?;
                }
                self.mount_filler(trail);

                for (index, node) in &self.mounted {
                    let geometry = self.host.measure_geometry(node);
                    self.cache.record(*index, geometry)?;
                }
                tracing::debug!(lead, trail, mounted = self.mounted.len(), "vcontent.update");
            }
            WindowMode::Append => {
                let range = self.window.append_range(next, count);
                let _span = tracing::debug_span!(
                    "vcontent.update",
                    mode = "append",
                    prev,
                    pointer = next,
                    start = range.start,
                    end = range.end,
                )
                .entered();

                for index in range {
                    let node = self.mount_chunk(index, 0.0)?;
                    let top = self.host.measure_geometry(&node).top;
                    self.cache.record(
                        index,
                        GeometryUpdate {
                            offset_top: Some(top),
                            ..GeometryUpdate::default()
                        },
                    )?;
                }
                tracing::debug!(mounted = self.mounted.len(), "vcontent.update");
            }
        }
        Ok(())
    }

    fn mount_filler(&mut self, height: f64) {
        let filler = self.host.create_node(NodeKind::Filler);
        self.host.set_filler_height(&filler, height);
        self.host.append_child(&self.container, &filler);
    }

    fn mount_chunk(&mut self, index: usize, left_pad: f64) -> Result<H::Node> {
        let chunk = self
            .content
            .get(index)
            .ok_or(VirtualContentError::BadChunkIndex {
                index,
                chunk_count: self.content.len(),
            })?;
        let text = match &self.chunk_pre_processor {
            Some(pre) => Cow::Owned(pre.apply(chunk.text)),
            None => Cow::Borrowed(chunk.text),
        };

        let node = self.host.create_node(NodeKind::Chunk { index });
        self.host.set_leading_indent(&node, left_pad);
        self.host
            .set_node_content(&node, &text, self.content.content_type().is_html());
        self.host.append_child(&self.container, &node);
        self.window.visible_mut().insert(index);
        self.mounted.push((index, node.clone()));
        Ok(node)
    }

    fn check_width(&mut self) -> Result<bool> {
        if !self.viewport.width_changed(&self.host, &self.container) {
            return Ok(false);
        }
        self.recalculate()?;
        Ok(true)
    }

    fn recalculate(&mut self) -> Result<()> {
        self.cache.invalidate();
        let width = self.viewport.store_width(&self.host, &self.container);
        if self.is_attached() {
            for (index, node) in &self.mounted {
                let geometry: ChunkGeometry = self.host.measure_geometry(node);
                self.cache.record(*index, geometry)?;
            }
        }
        tracing::debug!(
            id = %self.id,
            width,
            remeasured = self.mounted.len(),
            "vcontent.recalculate"
        );
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(surface) = self.scrollable.take()
            && self.subscribed
        {
            self.host.unsubscribe_scroll(&surface);
        }
        self.subscribed = false;
        self.limiter.cancel(&mut self.host);

        self.content = ChunkedContent::default();
        self.cache.reset(0);
        self.window.visible_mut().clear();
        self.window.set_state(WindowState::Idle);
        self.mounted.clear();
        self.viewport.forget_width();
        self.pointer = 0;

        self.host.remove_all_children(&self.container);
        self.host.detach(&self.container);
        InstanceRegistry::unregister(self.id);
        self.destroyed = true;
        tracing::debug!(id = %self.id, "vcontent.destroy");
    }
}
