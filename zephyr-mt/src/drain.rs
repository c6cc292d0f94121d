//! Steady-state polling driven by the controller's interrupt line.
//!
//! Every edge on the line is a trigger. Triggers are counted under a
//! mutex: the first trigger makes its caller the drain worker, which keeps
//! reading frames until the count drops to zero. Triggers arriving while a
//! worker is active only bump the count and return, so at most one worker
//! exists and no trigger goes unanswered.

use crate::error::Result;
use crate::port::Transport;
use crate::setup::{FrameStatus, Touchscreen};
use crate::touch::{EventSink, PressureThreshold};
use log::{error, trace};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How triggers received during a drain pass are accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DrainPolicy {
    /// One extra pass per trigger received while draining.
    #[default]
    PerTrigger,
    /// Any number of triggers received while draining collapse into one
    /// extra pass.
    Coalesce,
}

/// Single-flight trigger counter.
#[derive(Debug)]
pub struct Coalescer {
    policy: DrainPolicy,
    pending: Mutex<usize>,
    idle: Condvar,
}

impl Coalescer {
    /// Create an idle coalescer.
    pub fn new(policy: DrainPolicy) -> Self {
        Self {
            policy,
            pending: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    /// Record a trigger.
    ///
    /// If no worker is active the caller becomes the worker and runs `pass`
    /// until no trigger is pending, returning `true`. Otherwise the trigger
    /// is queued for the active worker and `false` is returned at once.
    pub fn trigger<F: FnMut()>(&self, mut pass: F) -> bool {
        {
            let mut pending = self.lock();
            let previous = *pending;
            *pending = match self.policy {
                DrainPolicy::PerTrigger => previous.saturating_add(1),
                DrainPolicy::Coalesce => (previous + 1).min(2),
            };
            if previous != 0 {
                trace!("Drain active, {} passes pending", *pending);
                return false;
            }
        }

        trace!("Drain loop enter");
        let _worker = WorkerGuard(self);
        loop {
            pass();

            let mut pending = self.lock();
            *pending = pending.saturating_sub(1);
            if *pending == 0 {
                self.idle.notify_all();
                break;
            }
        }
        trace!("Drain loop exit");
        true
    }

    /// Block until no worker is active.
    pub fn wait_idle(&self) {
        let mut pending = self.lock();
        while *pending != 0 {
            pending = self
                .idle
                .wait(pending)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Passes still owed by the active worker, zero when idle.
    pub fn pending(&self) -> usize {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets the counter if a pass unwinds, so later triggers start a new worker.
struct WorkerGuard<'a>(&'a Coalescer);

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            *self.0.lock() = 0;
            self.0.idle.notify_all();
        }
    }
}

/// Ready device plus its trigger coalescer.
///
/// `Poller` is shared between the interrupt context, which calls
/// [`trigger`](Self::trigger), and whoever tunes the pressure threshold.
pub struct Poller<T: Transport, S: EventSink> {
    device: Mutex<Touchscreen<T, S>>,
    coalescer: Coalescer,
    threshold: PressureThreshold,
}

impl<T: Transport, S: EventSink> Poller<T, S> {
    /// Start polling a ready device, using its configured drain policy.
    pub fn new(device: Touchscreen<T, S>) -> Self {
        let policy = device.link().config().drain_policy;
        let threshold = device.threshold();
        Self {
            device: Mutex::new(device),
            coalescer: Coalescer::new(policy),
            threshold,
        }
    }

    /// Handle an interrupt edge. Returns `true` if this call drained.
    ///
    /// Frame read failures are logged and do not stop the loop.
    pub fn trigger(&self) -> bool {
        self.coalescer.trigger(|| {
            if let Err(e) = self.read_frame() {
                error!("Failed reading frame: {e}");
            }
        })
    }

    /// Block until the active drain worker, if any, has finished.
    pub fn wait_idle(&self) {
        self.coalescer.wait_idle();
    }

    /// Pressure threshold handle.
    pub fn threshold(&self) -> &PressureThreshold {
        &self.threshold
    }

    /// Run `f` with exclusive access to the device.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut Touchscreen<T, S>) -> R) -> R {
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut device)
    }

    /// Stop polling and return the device.
    pub fn into_inner(self) -> Touchscreen<T, S> {
        self.device
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_frame(&self) -> Result<FrameStatus> {
        self.with_device(Touchscreen::read_frame)
    }
}
