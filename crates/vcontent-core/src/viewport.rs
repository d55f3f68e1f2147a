#![forbid(unsafe_code)]

//! Scroll position to chunk index mapping and width-change detection.

use crate::config::WindowMode;
use crate::geometry::GeometryCache;
use crate::host::RenderHost;

/// Tracks the container's last measured width and resolves the pointer.
#[derive(Debug, Clone, Default)]
pub struct ViewportTracker {
    last_width: Option<f64>,
}

impl ViewportTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_width(&self) -> Option<f64> {
        self.last_width
    }

    /// Distance from the scroll surface's content origin to the container's
    /// origin. Zero when the container scrolls itself.
    pub fn host_offset<H: RenderHost>(host: &H, container: &H::Node, surface: &H::Node) -> f64 {
        if container == surface {
            return 0.0;
        }
        host.bounding_top(container) + host.scroll_position(surface) - host.bounding_top(surface)
    }

    /// Scroll position expressed in the container's coordinate space.
    pub fn content_scroll_top<H: RenderHost>(
        host: &H,
        container: &H::Node,
        surface: &H::Node,
    ) -> f64 {
        host.scroll_position(surface) - Self::host_offset(host, container, surface)
    }

    /// Chunk index at the top of the viewport.
    ///
    /// The greatest index whose cached offset is `<= scroll_top`, or 0 when
    /// the scroll top is above every cached offset. With nothing cached,
    /// falls back to `fallback`.
    #[must_use]
    pub fn current_pointer(cache: &GeometryCache, scroll_top: f64, fallback: usize) -> usize {
        let mut any = false;
        let mut pointer = None;
        for (index, top) in cache.filled_offsets() {
            any = true;
            if top <= scroll_top {
                pointer = Some(index);
            }
        }
        match (any, pointer) {
            (false, _) => fallback,
            (true, found) => found.unwrap_or(0),
        }
    }

    /// Fallback pointer when no offsets are cached: the last mounted chunk in
    /// Append mode, the last chunk in Replace mode.
    #[must_use]
    pub fn fallback_pointer(mode: WindowMode, last_visible: Option<usize>, chunk_count: usize) -> usize {
        match mode {
            WindowMode::Append => last_visible.unwrap_or(0),
            WindowMode::Replace => chunk_count.saturating_sub(1),
        }
    }

    pub fn width_changed<H: RenderHost>(&self, host: &H, container: &H::Node) -> bool {
        self.last_width != Some(host.container_width(container))
    }

    pub fn store_width<H: RenderHost>(&mut self, host: &H, container: &H::Node) -> f64 {
        let width = host.container_width(container);
        self.last_width = Some(width);
        width
    }

    pub fn forget_width(&mut self) {
        self.last_width = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryUpdate;

    fn cache_with_offsets(count: usize, offsets: &[(usize, f64)]) -> GeometryCache {
        let mut cache = GeometryCache::new(count);
        for &(index, top) in offsets {
            cache
                .record(
                    index,
                    GeometryUpdate {
                        offset_top: Some(top),
                        ..GeometryUpdate::default()
                    },
                )
                .unwrap();
        }
        cache
    }

    #[test]
    fn pointer_is_greatest_offset_at_or_above_scroll_top() {
        let cache = cache_with_offsets(10, &[(0, 0.0), (1, 100.0), (2, 200.0), (3, 300.0)]);
        assert_eq!(ViewportTracker::current_pointer(&cache, 0.0, 9), 0);
        assert_eq!(ViewportTracker::current_pointer(&cache, 150.0, 9), 1);
        assert_eq!(ViewportTracker::current_pointer(&cache, 200.0, 9), 2);
        assert_eq!(ViewportTracker::current_pointer(&cache, 5000.0, 9), 3);
    }

    #[test]
    fn pointer_skips_unmeasured_chunks() {
        let cache = cache_with_offsets(10, &[(4, 400.0), (5, 500.0)]);
        assert_eq!(ViewportTracker::current_pointer(&cache, 450.0, 9), 4);
        assert_eq!(ViewportTracker::current_pointer(&cache, 10.0, 9), 0);
    }

    #[test]
    fn empty_cache_uses_fallback() {
        let cache = GeometryCache::new(10);
        assert_eq!(ViewportTracker::current_pointer(&cache, 10.0, 7), 7);
    }

    #[test]
    fn fallback_depends_on_mode() {
        assert_eq!(
            ViewportTracker::fallback_pointer(WindowMode::Append, Some(3), 10),
            3
        );
        assert_eq!(ViewportTracker::fallback_pointer(WindowMode::Append, None, 10), 0);
        assert_eq!(ViewportTracker::fallback_pointer(WindowMode::Replace, None, 10), 9);
        assert_eq!(ViewportTracker::fallback_pointer(WindowMode::Replace, None, 0), 0);
    }
}
