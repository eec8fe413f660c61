//! Debouncing of config refreshes.
//!
//! Containers tend to start and stop in bursts (a compose project coming
//! up, a rolling deploy).  Instead of regenerating the config for every
//! event, the first event of a burst schedules a single refresh after a
//! quiet period and every further event until it fires is absorbed.
//!
//! The quiet period is measured from the first event, not the last one, so
//! a constant stream of events still produces a refresh every `laziness`.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use log::info;
use tokio::task::JoinHandle;

type Callback = dyn Fn() -> BoxFuture<'static, ()> + Send + Sync;

#[derive(Default)]
struct PendingRefresh {
    triggered: bool,
    timer: Option<JoinHandle<()>>,
}

struct Shared {
    pending: Mutex<PendingRefresh>,
    /// Held while a refresh runs so that refreshes never overlap.
    running: tokio::sync::Mutex<()>,
    on_fire: Box<Callback>,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, PendingRefresh> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single slot scheduler: at most one refresh is pending at any time.
pub struct RefreshScheduler {
    laziness: Duration,
    shared: Arc<Shared>,
}

impl RefreshScheduler {
    /// `on_fire` runs once per burst, `laziness` after its first event.
    pub fn new<F, Fut>(laziness: Duration, on_fire: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            laziness,
            shared: Arc::new(Shared {
                pending: Mutex::new(PendingRefresh::default()),
                running: tokio::sync::Mutex::new(()),
                on_fire: Box::new(move || on_fire().boxed()),
            }),
        }
    }

    /// Schedules a refresh unless one is already pending.
    ///
    /// Returns `true` if this call scheduled it. Must be called from within
    /// a tokio runtime.
    pub fn notify(&self) -> bool {
        let mut pending = self.shared.pending();
        if pending.triggered {
            return false;
        }

        info!("Triggering refresh in {} seconds", self.laziness.as_secs());
        pending.triggered = true;

        let shared = Arc::clone(&self.shared);
        let laziness = self.laziness;
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(laziness).await;
            {
                let mut pending = shared.pending();
                pending.triggered = false;
                pending.timer = None;
            }
            let _running = shared.running.lock().await;
            (shared.on_fire)().await;
        }));
        true
    }

    pub fn is_pending(&self) -> bool {
        self.shared.pending().triggered
    }

    /// Cancels a refresh that has not fired yet.
    ///
    /// A refresh that already started is left to complete.
    pub fn shutdown(&self) {
        let mut pending = self.shared.pending();
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        pending.triggered = false;
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
