//! Shared fixtures: a compact layout where a 1000-char chunk is exactly one
//! viewport (100px) tall.

#![allow(dead_code)]

use std::time::Duration;

use vcontent_core::{RateLimitPolicy, VirtualContent, VirtualContentConfig, WindowMode};
use vcontent_sim::{NodeId, SimConfig, SimHost};

pub const CHUNK: usize = 1000;
pub const CHUNK_PX: f64 = 100.0;
pub const SETTLE: Duration = Duration::from_millis(100);

pub fn compact_host() -> SimHost {
    SimHost::new(SimConfig {
        char_width: 1.0,
        line_height: 10.0,
        viewport_width: 100.0,
        viewport_height: 100.0,
    })
}

pub fn config(mode: WindowMode, threshold: usize) -> VirtualContentConfig {
    VirtualContentConfig::default()
        .with_chunk_size(CHUNK)
        .with_mode(mode)
        .with_threshold(threshold)
}

pub fn throttled(mode: WindowMode, leading: bool, trailing: bool) -> VirtualContentConfig {
    config(mode, 2).with_rate_limit(
        RateLimitPolicy::Throttle { leading, trailing },
        Duration::from_millis(100),
    )
}

/// `chunks` full chunks of plain text, each chunk a distinct letter.
pub fn document(chunks: usize) -> String {
    (0..chunks)
        .map(|i| {
            let letter = char::from(b'a' + (i % 26) as u8);
            letter.to_string().repeat(CHUNK)
        })
        .collect()
}

/// An attached instance showing `chunks` chunks of text.
pub fn mounted(
    mode: WindowMode,
    threshold: usize,
    chunks: usize,
) -> (SimHost, NodeId, VirtualContent<SimHost>) {
    mounted_with(config(mode, threshold), chunks)
}

pub fn mounted_with(
    config: VirtualContentConfig,
    chunks: usize,
) -> (SimHost, NodeId, VirtualContent<SimHost>) {
    let host = compact_host();
    let root = host.create_root();
    let mut view = VirtualContent::create(host.clone(), config);
    view.set_text(document(chunks))
        .unwrap()
        .render_to(root)
        .unwrap();
    (host, root, view)
}
