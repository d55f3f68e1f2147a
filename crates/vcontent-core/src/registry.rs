#![forbid(unsafe_code)]

//! Per-thread registry of live instances and the shared width poller.
//!
//! Tracking is opt-in: nothing is registered until
//! [`InstanceRegistry::start_tracking`] has been called on the thread that
//! owns the instances. Once enabled, instances created afterwards register
//! themselves, and the embedding drives the poller by calling
//! [`InstanceRegistry::poll`] (or [`InstanceRegistry::poll_wall_clock`]) from
//! its event loop. A poll runs at most once per [`POLL_INTERVAL`] and asks
//! every live instance whether its container width changed.
//!
//! The registry holds weak references only. An entry whose instance has gone
//! away is pruned on the next poll, and the poller idles while no entries
//! remain.

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use web_time::Instant;

use crate::error::{Result, VirtualContentError};

/// Minimum spacing between two width polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a `VirtualContent` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vc#{}", self.0)
    }
}

/// Something the width poller can ask to re-check its container.
pub trait WidthWatcher {
    /// Recalculate if the container width changed. Returns whether a
    /// recalculation happened.
    fn check_width(&self) -> bool;
}

struct Entry {
    id: InstanceId,
    watcher: Weak<dyn WidthWatcher>,
}

#[derive(Default)]
struct RegistryState {
    tracking: bool,
    entries: Vec<Entry>,
    last_poll: Option<Duration>,
    epoch: Option<Instant>,
}

thread_local! {
    static REGISTRY: RefCell<RegistryState> = RefCell::new(RegistryState::default());
}

/// Handle to the current thread's registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceRegistry;

impl InstanceRegistry {
    /// Enable tracking. Returns `false` if it was already enabled.
    pub fn start_tracking() -> bool {
        REGISTRY.with_borrow_mut(|state| {
            if state.tracking {
                return false;
            }
            state.tracking = true;
            tracing::debug!("vcontent.registry.start");
            true
        })
    }

    /// Disable tracking and forget every entry.
    pub fn stop_tracking() {
        REGISTRY.with_borrow_mut(|state| {
            state.tracking = false;
            state.entries.clear();
            state.last_poll = None;
            tracing::debug!("vcontent.registry.stop");
        });
    }

    #[must_use]
    pub fn is_tracking() -> bool {
        REGISTRY.with_borrow(|state| state.tracking)
    }

    /// Whether the shared poller has work: tracking is on and at least one
    /// entry is registered.
    #[must_use]
    pub fn is_polling() -> bool {
        REGISTRY.with_borrow(|state| state.tracking && !state.entries.is_empty())
    }

    pub fn register(id: InstanceId, watcher: Weak<dyn WidthWatcher>) -> Result<()> {
        REGISTRY.with_borrow_mut(|state| {
            if state.entries.iter().any(|entry| entry.id == id) {
                return Err(VirtualContentError::AlreadyTracked { id });
            }
            state.entries.push(Entry { id, watcher });
            tracing::debug!(id = %id, tracked = state.entries.len(), "vcontent.registry.register");
            Ok(())
        })
    }

    /// Remove an entry. Returns whether it was present.
    pub fn unregister(id: InstanceId) -> bool {
        REGISTRY.with_borrow_mut(|state| {
            let before = state.entries.len();
            state.entries.retain(|entry| entry.id != id);
            let removed = state.entries.len() != before;
            if removed {
                tracing::debug!(id = %id, tracked = state.entries.len(), "vcontent.registry.unregister");
            }
            removed
        })
    }

    #[must_use]
    pub fn contains(id: InstanceId) -> bool {
        REGISTRY.with_borrow(|state| state.entries.iter().any(|entry| entry.id == id))
    }

    #[must_use]
    pub fn len() -> usize {
        REGISTRY.with_borrow(|state| state.entries.len())
    }

    #[must_use]
    pub fn is_empty() -> bool {
        Self::len() == 0
    }

    /// Run one width poll if tracking is on and [`POLL_INTERVAL`] has passed
    /// since the previous one. `now` is any monotonic timestamp. Returns the
    /// number of instances that recalculated.
    pub fn poll(now: Duration) -> usize {
        let watchers = REGISTRY.with_borrow_mut(|state| {
            if !state.tracking {
                return Vec::new();
            }
            if let Some(last) = state.last_poll
                && now.saturating_sub(last) < POLL_INTERVAL
            {
                return Vec::new();
            }
            state.last_poll = Some(now);
            state.entries.retain(|entry| entry.watcher.strong_count() > 0);
            state
                .entries
                .iter()
                .filter_map(|entry| entry.watcher.upgrade())
                .collect::<Vec<_>>()
        });
        if watchers.is_empty() {
            return 0;
        }

        // Borrow released: watchers may touch the registry while recalculating.
        let recalculated = watchers
            .iter()
            .filter(|watcher| watcher.check_width())
            .count();
        tracing::trace!(
            polled = watchers.len(),
            recalculated,
            "vcontent.registry.poll"
        );
        recalculated
    }

    /// [`poll`](Self::poll) against the wall clock, measured from the first
    /// call on this thread.
    pub fn poll_wall_clock() -> usize {
        let now = REGISTRY.with_borrow_mut(|state| state.epoch.get_or_insert_with(Instant::now).elapsed());
        Self::poll(now)
    }
}
