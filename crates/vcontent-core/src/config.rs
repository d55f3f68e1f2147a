#![forbid(unsafe_code)]

//! Instance configuration.
//!
//! | Field | Default | Notes |
//! |-------|---------|-------|
//! | `chunk_size` | 10240 | chars per chunk; 0 falls back to the default |
//! | `mode` | `replace` | fixed for the instance's lifetime |
//! | `threshold` | 2 | half-window radius (replace) or look-ahead (append) |
//! | `content_type` | `html` | changed by `set_text` / `set_html` |
//! | `rate_limit_ms` | 100 | clamped to 0-10000ms |
//! | `rate_limit_policy` | `debounce` | or throttle with leading/trailing edges |
//!
//! With the `serde` feature the config (minus the pre-processor) round-trips
//! through JSON, and the option names `length`, `type`, and `delay` are
//! accepted as aliases.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::splitter::ContentType;

pub const DEFAULT_CHUNK_SIZE: usize = 10240;
pub const DEFAULT_THRESHOLD: usize = 2;
pub const DEFAULT_RATE_LIMIT_MS: u64 = 100;
pub const MAX_RATE_LIMIT_MS: u64 = 10_000;

/// Windowing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WindowMode {
    /// Keep a sliding window of `2 * threshold` chunks, remounted wholesale.
    #[default]
    Replace,
    /// Mount chunks forward only; never unmount.
    Append,
}

impl WindowMode {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "append" => Some(Self::Append),
            _ => None,
        }
    }
}

/// How scroll events are rate-limited before a window update is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase", tag = "kind"))]
pub enum RateLimitPolicy {
    /// Fire once, `rate_limit` after the last event.
    #[default]
    Debounce,
    /// Fire at most once per `rate_limit`, on the leading and/or trailing edge.
    Throttle { leading: bool, trailing: bool },
}

impl RateLimitPolicy {
    /// Parse `debounce`, `throttle`, `throttle-leading`, or `throttle-trailing`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debounce" => Some(Self::Debounce),
            "throttle" => Some(Self::Throttle {
                leading: true,
                trailing: true,
            }),
            "throttle-leading" => Some(Self::Throttle {
                leading: true,
                trailing: false,
            }),
            "throttle-trailing" => Some(Self::Throttle {
                leading: false,
                trailing: true,
            }),
            _ => None,
        }
    }
}

/// Transform applied to each chunk's text right before injection.
#[derive(Clone)]
pub struct ChunkPreProcessor(Rc<dyn Fn(&str) -> String>);

impl ChunkPreProcessor {
    pub fn new(f: impl Fn(&str) -> String + 'static) -> Self {
        Self(Rc::new(f))
    }

    #[must_use]
    pub fn apply(&self, chunk: &str) -> String {
        (self.0)(chunk)
    }
}

impl fmt::Debug for ChunkPreProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChunkPreProcessor(..)")
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VirtualContentConfig {
    /// Maximum chunk length in chars.
    #[cfg_attr(feature = "serde", serde(alias = "length"))]
    pub chunk_size: usize,
    pub mode: WindowMode,
    pub threshold: usize,
    #[cfg_attr(feature = "serde", serde(alias = "type"))]
    pub content_type: ContentType,
    #[cfg_attr(feature = "serde", serde(alias = "delay"))]
    pub rate_limit_ms: u64,
    pub rate_limit_policy: RateLimitPolicy,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub chunk_pre_processor: Option<ChunkPreProcessor>,
}

impl Default for VirtualContentConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            mode: WindowMode::Replace,
            threshold: DEFAULT_THRESHOLD,
            content_type: ContentType::Html,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            rate_limit_policy: RateLimitPolicy::Debounce,
            chunk_pre_processor: None,
        }
    }
}

impl VirtualContentConfig {
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, policy: RateLimitPolicy, interval: Duration) -> Self {
        self.rate_limit_policy = policy;
        self.rate_limit_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_chunk_pre_processor(mut self, f: impl Fn(&str) -> String + 'static) -> Self {
        self.chunk_pre_processor = Some(ChunkPreProcessor::new(f));
        self
    }

    #[must_use]
    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Load overrides from `VCONTENT_*` environment variables.
    ///
    /// Reads:
    /// - `VCONTENT_CHUNK_SIZE`
    /// - `VCONTENT_MODE` (`replace` / `append`)
    /// - `VCONTENT_THRESHOLD`
    /// - `VCONTENT_CONTENT_TYPE` (`text` / `html`)
    /// - `VCONTENT_RATE_LIMIT_MS`
    /// - `VCONTENT_RATE_LIMIT_POLICY` (see [`RateLimitPolicy::parse`])
    ///
    /// Unparsable values are ignored and the result is validated.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(size) = lookup("VCONTENT_CHUNK_SIZE").and_then(|v| v.trim().parse().ok()) {
            config.chunk_size = size;
        }
        if let Some(mode) = lookup("VCONTENT_MODE").and_then(|v| WindowMode::parse(&v)) {
            config.mode = mode;
        }
        if let Some(threshold) = lookup("VCONTENT_THRESHOLD").and_then(|v| v.trim().parse().ok()) {
            config.threshold = threshold;
        }
        if let Some(ty) = lookup("VCONTENT_CONTENT_TYPE").and_then(|v| ContentType::parse(&v)) {
            config.content_type = ty;
        }
        if let Some(ms) = lookup("VCONTENT_RATE_LIMIT_MS").and_then(|v| v.trim().parse().ok()) {
            config.rate_limit_ms = ms;
        }
        if let Some(policy) =
            lookup("VCONTENT_RATE_LIMIT_POLICY").and_then(|v| RateLimitPolicy::parse(&v))
        {
            config.rate_limit_policy = policy;
        }

        config.validated()
    }

    /// Normalize out-of-range values.
    ///
    /// - `chunk_size == 0` falls back to [`DEFAULT_CHUNK_SIZE`]
    /// - `rate_limit_ms` clamped to `0..=MAX_RATE_LIMIT_MS`
    #[must_use]
    pub fn validated(mut self) -> Self {
        if self.chunk_size == 0 {
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        self.rate_limit_ms = self.rate_limit_ms.min(MAX_RATE_LIMIT_MS);
        self
    }

    /// Parse a JSON object of options.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> crate::error::Result<Self> {
        serde_json::from_str::<Self>(json)
            .map(Self::validated)
            .map_err(|err| crate::error::VirtualContentError::invalid_config(err.to_string()))
    }
}
