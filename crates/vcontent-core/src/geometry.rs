#![forbid(unsafe_code)]

//! Write-once per-chunk geometry cache.
//!
//! Three parallel slot arenas (`offset_top`, `height`, `left_pad`) indexed by
//! chunk index. A slot goes from [`Slot::Empty`] to [`Slot::Filled`] at most
//! once per content generation; later writes for the same slot are ignored.
//! The only way back to `Empty` is a wholesale [`GeometryCache::invalidate`]
//! or [`GeometryCache::reset`].

use std::ops::Range;

use crate::error::{Result, VirtualContentError};

/// Geometry reported by the render host for a mounted chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChunkGeometry {
    /// Offset of the chunk's top edge inside the container.
    pub top: f64,
    /// Rendered height of the chunk.
    pub height: f64,
    /// Horizontal indent of the chunk's first visual line.
    pub left_pad: f64,
}

/// Partial geometry to record; `None` fields leave their slot untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryUpdate {
    pub offset_top: Option<f64>,
    pub height: Option<f64>,
    pub left_pad: Option<f64>,
}

impl From<ChunkGeometry> for GeometryUpdate {
    fn from(geometry: ChunkGeometry) -> Self {
        Self {
            offset_top: Some(geometry.top),
            height: Some(geometry.height),
            left_pad: Some(geometry.left_pad),
        }
    }
}

/// Which slot arena to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryField {
    OffsetTop,
    Height,
    LeftPad,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Slot<T> {
    #[default]
    Empty,
    Filled(T),
}

impl<T: Copy> Slot<T> {
    #[must_use]
    pub fn value(&self) -> Option<T> {
        match self {
            Self::Empty => None,
            Self::Filled(value) => Some(*value),
        }
    }

    /// Fill the slot if it is empty. Returns whether the write took effect.
    fn fill(&mut self, value: T) -> bool {
        match self {
            Self::Empty => {
                *self = Self::Filled(value);
                true
            }
            Self::Filled(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeometryCache {
    offsets: Vec<Slot<f64>>,
    heights: Vec<Slot<f64>>,
    left_pads: Vec<Slot<f64>>,
}

impl GeometryCache {
    #[must_use]
    pub fn new(chunk_count: usize) -> Self {
        let mut cache = Self::default();
        cache.reset(chunk_count);
        cache
    }

    /// Start a new content generation with `chunk_count` empty slots.
    pub fn reset(&mut self, chunk_count: usize) {
        for arena in [&mut self.offsets, &mut self.heights, &mut self.left_pads] {
            arena.clear();
            arena.resize(chunk_count, Slot::Empty);
        }
    }

    /// Empty every slot, keeping the chunk count.
    pub fn invalidate(&mut self) {
        for arena in [&mut self.offsets, &mut self.heights, &mut self.left_pads] {
            arena.fill(Slot::Empty);
        }
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.offsets.len()
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.chunk_count() {
            Ok(())
        } else {
            Err(VirtualContentError::BadChunkIndex {
                index,
                chunk_count: self.chunk_count(),
            })
        }
    }

    /// Record measured geometry; only empty slots are written.
    pub fn record(&mut self, index: usize, update: impl Into<GeometryUpdate>) -> Result<()> {
        self.check(index)?;
        let update = update.into();
        if let Some(top) = update.offset_top {
            self.offsets[index].fill(top);
        }
        if let Some(height) = update.height {
            self.heights[index].fill(height);
        }
        if let Some(pad) = update.left_pad {
            self.left_pads[index].fill(pad);
        }
        Ok(())
    }

    #[must_use]
    pub fn slot(&self, index: usize, field: GeometryField) -> Slot<f64> {
        let arena = match field {
            GeometryField::OffsetTop => &self.offsets,
            GeometryField::Height => &self.heights,
            GeometryField::LeftPad => &self.left_pads,
        };
        arena.get(index).copied().unwrap_or_default()
    }

    /// Filled value, or 0 for an empty slot.
    #[must_use]
    pub fn get(&self, index: usize, field: GeometryField) -> f64 {
        self.slot(index, field).value().unwrap_or(0.0)
    }

    #[must_use]
    pub fn offset_top(&self, index: usize) -> f64 {
        self.get(index, GeometryField::OffsetTop)
    }

    #[must_use]
    pub fn height(&self, index: usize) -> f64 {
        self.get(index, GeometryField::Height)
    }

    #[must_use]
    pub fn left_pad(&self, index: usize) -> f64 {
        self.get(index, GeometryField::LeftPad)
    }

    /// Cached offsets in index order, skipping empty slots.
    pub fn filled_offsets(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.offsets
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.value().map(|top| (index, top)))
    }

    /// Sum of cached heights over `range`; empty slots count as 0.
    pub fn cumulative_height(&self, range: Range<usize>) -> Result<f64> {
        if range.end > self.chunk_count() {
            return Err(VirtualContentError::BadChunkIndex {
                index: range.end,
                chunk_count: self.chunk_count(),
            });
        }
        if range.is_empty() {
            return Ok(0.0);
        }
        Ok(self.heights[range].iter().filter_map(Slot::value).sum())
    }

    /// Offset of chunk `index` estimated from the heights of all chunks
    /// before it.
    pub fn offset_top_by_heights(&self, index: usize) -> Result<f64> {
        if index == 0 {
            return Ok(0.0);
        }
        self.check(index)?;
        self.cumulative_height(0..index)
    }
}
