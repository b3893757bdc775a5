//! Shared provider doubles for lifecycle tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use slipway_api::contract::{ProviderError, ServiceProvider};

/// How a [`CountdownProvider`] behaves when stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBehaviour {
    /// Stop succeeds and the service reads as stopped.
    Clean,
    /// Stop returns a failure without stopping anything.
    Fails,
    /// Stop succeeds but the service keeps reading as running.
    Wedges,
}

/// In-process provider double that becomes ready after a fixed number of
/// `is_running` polls.
///
/// Clones share state, so a clone kept outside the registry can observe
/// what the lifecycle did with the boxed original.
#[derive(Clone)]
pub struct CountdownProvider {
    inner: Arc<Inner>,
}

struct Inner {
    ready_after: usize,
    stop: StopBehaviour,
    checks: AtomicUsize,
    stopped: AtomicBool,
    launches: Mutex<Vec<bool>>,
    stops: AtomicUsize,
}

impl CountdownProvider {
    /// Port every running double reports.
    pub const PORT: u16 = 4545;

    /// Creates a double that reads as running from the `ready_after`-th
    /// poll onwards and stops with the given behaviour.
    pub fn new(ready_after: usize, stop: StopBehaviour) -> Self {
        Self {
            inner: Arc::new(Inner {
                ready_after,
                stop,
                checks: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
                launches: Mutex::new(Vec::new()),
                stops: AtomicUsize::new(0),
            }),
        }
    }

    /// Cleanly stopping double ready from the `checks`-th poll onwards.
    pub fn ready_after(checks: usize) -> Self {
        Self::new(checks, StopBehaviour::Clean)
    }

    /// Number of `is_running` polls observed so far.
    pub fn checks(&self) -> usize {
        self.inner.checks.load(Ordering::SeqCst)
    }

    /// The `block` flag of every launch call, in order.
    pub fn launches(&self) -> Vec<bool> {
        self.inner.launches.lock().expect("launch log lock").clone()
    }

    /// Number of stop calls observed so far.
    pub fn stops(&self) -> usize {
        self.inner.stops.load(Ordering::SeqCst)
    }

    fn currently_running(&self) -> bool {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return self.inner.stop == StopBehaviour::Wedges;
        }
        self.inner.checks.load(Ordering::SeqCst) >= self.inner.ready_after
    }
}

impl ServiceProvider for CountdownProvider {
    fn launch(&self, block: bool) -> Result<(), ProviderError> {
        self.inner
            .launches
            .lock()
            .expect("launch log lock")
            .push(block);
        Ok(())
    }

    fn stop(&self) -> Result<(), ProviderError> {
        self.inner.stops.fetch_add(1, Ordering::SeqCst);
        if self.inner.stop == StopBehaviour::Fails {
            return Err(ProviderError::Failed {
                operation: "stop".to_owned(),
                message: "deliberate stop failure".to_owned(),
            });
        }
        self.inner.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.inner.checks.fetch_add(1, Ordering::SeqCst);
        self.currently_running()
    }

    fn port(&self) -> Option<u16> {
        self.currently_running().then_some(Self::PORT)
    }

    fn base_url(&self) -> Option<String> {
        self.currently_running()
            .then(|| format!("tcp://localhost:{}", Self::PORT))
    }
}
