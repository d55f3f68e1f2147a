#![forbid(unsafe_code)]

//! Window bookkeeping and update decisions.
//!
//! # Replace mode
//!
//! The window is `[pointer - threshold, pointer + threshold)` clamped into
//! `[0, chunk_count)`. When clamping would cut one side short and there is
//! room on the other, the window slides over so it keeps `2 * threshold`
//! chunks (never more than `chunk_count`).
//!
//! # Append mode
//!
//! The visible set only grows. An update is needed when any index of the
//! look-ahead `[pointer, min(pointer + threshold, chunk_count))` is not
//! mounted yet.

use std::ops::Range;

use crate::config::WindowMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    #[default]
    Idle,
    /// Mounting or unmounting; scroll delivery is suspended.
    Updating,
}

/// Ordered set of mounted chunk indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    indices: Vec<usize>,
}

impl VisibleSet {
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    #[must_use]
    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// Insert keeping order; duplicates are ignored.
    pub fn insert(&mut self, index: usize) {
        if let Err(at) = self.indices.binary_search(&index) {
            self.indices.insert(at, index);
        }
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

/// Decides when the mounted window must change and what it should hold.
#[derive(Debug, Clone)]
pub struct WindowManager {
    mode: WindowMode,
    threshold: usize,
    state: WindowState,
    visible: VisibleSet,
}

impl WindowManager {
    #[must_use]
    pub fn new(mode: WindowMode, threshold: usize) -> Self {
        Self {
            mode,
            threshold,
            state: WindowState::Idle,
            visible: VisibleSet::default(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn set_state(&mut self, state: WindowState) {
        self.state = state;
    }

    #[must_use]
    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }

    pub fn visible_mut(&mut self) -> &mut VisibleSet {
        &mut self.visible
    }

    /// Replace-mode window around `pointer`.
    #[must_use]
    pub fn window_range(&self, pointer: usize, chunk_count: usize) -> Range<usize> {
        window_range(pointer, self.threshold, chunk_count)
    }

    /// Indices Append mode should mount for `pointer`: everything after the
    /// last mounted chunk up to the end of the look-ahead.
    #[must_use]
    pub fn append_range(&self, pointer: usize, chunk_count: usize) -> Range<usize> {
        let start = self.visible.last().map_or(0, |last| last + 1);
        let end = pointer.saturating_add(self.threshold).min(chunk_count);
        start..end.max(start)
    }

    #[must_use]
    pub fn need_update(&self, prev: usize, next: usize, chunk_count: usize) -> bool {
        match self.mode {
            WindowMode::Replace => {
                prev != next
                    && self.window_range(prev, chunk_count) != self.window_range(next, chunk_count)
            }
            WindowMode::Append => {
                let end = next.saturating_add(self.threshold).min(chunk_count);
                (next..end).any(|index| !self.visible.contains(index))
            }
        }
    }
}

/// `[pointer - threshold, pointer + threshold)` clamped into
/// `[0, chunk_count)`, shifted to keep its width where possible.
#[must_use]
pub fn window_range(pointer: usize, threshold: usize, chunk_count: usize) -> Range<usize> {
    let pointer = pointer.min(chunk_count);
    let mut start = pointer.saturating_sub(threshold);
    let mut end = pointer.saturating_add(threshold);
    // Lost below zero; move it to the end.
    let short = threshold.saturating_sub(pointer);
    end = end.saturating_add(short);
    if end > chunk_count {
        start = start.saturating_sub(end - chunk_count);
        end = chunk_count;
    }
    start..end
}
