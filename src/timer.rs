//! Per-room countdown timers.
//!
//! Each room has at most one active timer. Restarting replaces the old
//! timer, cancellation aborts it, and expiry fires exactly once: a timer
//! that lost a race with cancellation retires without firing. Callers
//! layer their own staleness checks (room epoch) on top, so a tick that
//! slips through after a phase transition is still dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

/// Boxed unit of async work scheduled by the engine.
pub type TimerTask = BoxFuture<'static, ()>;

struct ActiveTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Cancellable per-room countdowns and one-shot delays.
pub struct TimerEngine {
    timers: RwLock<HashMap<String, ActiveTimer>>,
    generation: AtomicU64,
}

impl TimerEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            timers: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        })
    }

    /// Starts a countdown for a room, replacing any timer already
    /// running for it. `on_tick` runs every second with the remaining
    /// count; `on_expire` runs exactly once when the count reaches zero.
    pub async fn start<T, E>(self: &Arc<Self>, room_id: &str, seconds: u32, on_tick: T, on_expire: E)
    where
        T: Fn(u32) -> TimerTask + Send + 'static,
        E: FnOnce() -> TimerTask + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let engine = Arc::clone(self);
        let room = room_id.to_string();

        // Hold the map lock across spawn + insert so the new task cannot
        // observe the map before its own entry exists.
        let mut timers = self.timers.write().await;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;

            let mut remaining = seconds;
            while remaining > 0 {
                interval.tick().await;
                remaining -= 1;
                on_tick(remaining).await;
            }
            // Only the still-current timer may fire the terminal
            // callback; a replaced or cancelled one retires silently.
            if engine.retire(&room, generation).await {
                on_expire().await;
            } else {
                debug!(room_id = %room, "Stale timer retired without firing");
            }
        });

        if let Some(previous) = timers.insert(
            room_id.to_string(),
            ActiveTimer { generation, handle },
        ) {
            previous.handle.abort();
            debug!(room_id = %room_id, "Replaced active timer");
        }
    }

    /// Schedules a one-shot delayed task for a room. Shares the
    /// per-room slot with `start`, so it is cancelled the same way.
    pub async fn schedule<E>(self: &Arc<Self>, room_id: &str, seconds: u32, on_expire: E)
    where
        E: FnOnce() -> TimerTask + Send + 'static,
    {
        self.start(room_id, seconds, |_| futures::future::ready(()).boxed(), on_expire)
            .await;
    }

    /// Cancels the room's active timer. No-op when none is running.
    pub async fn cancel(&self, room_id: &str) {
        let mut timers = self.timers.write().await;
        if let Some(timer) = timers.remove(room_id) {
            timer.handle.abort();
            debug!(room_id = %room_id, "Timer cancelled");
        }
    }

    /// Removes the timer entry if `generation` is still current. Returns
    /// whether the caller owns the terminal callback.
    async fn retire(&self, room_id: &str, generation: u64) -> bool {
        let mut timers = self.timers.write().await;
        match timers.get(room_id) {
            Some(timer) if timer.generation == generation => {
                timers.remove(room_id);
                true
            }
            _ => false,
        }
    }

    /// Whether a timer is currently active for the room.
    pub async fn is_active(&self, room_id: &str) -> bool {
        self.timers.read().await.contains_key(room_id)
    }
}
