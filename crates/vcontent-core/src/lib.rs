#![forbid(unsafe_code)]

//! `vcontent-core` renders very large text or markup documents through a
//! small window of mounted chunks.
//!
//! Design goals:
//! - **Only the window is mounted**: content is split into fixed-size chunks
//!   and only the chunks around the viewport exist on the render surface.
//!   Fillers reserve the height of everything else.
//! - **Host-driven**: the render surface, its clock, and its timers sit
//!   behind [`RenderHost`]. The embedding pushes scroll events and elapsed
//!   timers in; nothing blocks, spawns, or calls back.
//! - **Measured once**: chunk geometry is cached write-once per content
//!   generation and only dropped wholesale.
//!
//! # Example
//!
//! ```ignore
//! use vcontent_core::{VirtualContent, VirtualContentConfig, WindowMode};
//!
//! let config = VirtualContentConfig::default()
//!     .with_chunk_size(4096)
//!     .with_mode(WindowMode::Append);
//! let mut view = VirtualContent::create(host, config);
//! view.set_text(big_log)?.render_to(panel)?;
//!
//! // From the embedding's event loop:
//! view.handle_scroll()?;
//! view.fire_timer(timer)?;
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod geometry;
pub mod host;
pub mod instance;
pub mod rate_limit;
pub mod registry;
pub mod splitter;
pub mod viewport;
pub mod window;

pub use config::{
    ChunkPreProcessor, DEFAULT_CHUNK_SIZE, DEFAULT_RATE_LIMIT_MS, DEFAULT_THRESHOLD,
    RateLimitPolicy, VirtualContentConfig, WindowMode,
};
pub use content::ContentValue;
pub use error::{Result, VirtualContentError};
pub use geometry::{ChunkGeometry, GeometryCache, GeometryField, GeometryUpdate, Slot};
pub use host::{HostRef, NodeKind, RenderHost, Scheduler, TimerId};
pub use instance::{ScrollOutcome, VirtualContent};
pub use rate_limit::{Gate, RateLimiter};
pub use registry::{InstanceId, InstanceRegistry, POLL_INTERVAL, WidthWatcher};
pub use splitter::{Chunk, ChunkedContent, ContentSplitter, ContentType};
pub use viewport::ViewportTracker;
pub use window::{VisibleSet, WindowManager, WindowState, window_range};

/// Enable the shared width poller on this thread. Returns `false` when it was
/// already enabled.
pub fn start_tracking() -> bool {
    InstanceRegistry::start_tracking()
}
