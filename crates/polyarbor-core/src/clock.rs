//! Engine time sources.
//!
//! The scheduler never reads wall-clock time directly. Every frontend supplies
//! a [`ClockSource`] backed by whatever drives its audio output: the
//! `AudioContext` timeline on the web, the rendered-frame counter of the cpal
//! stream on native, and [`ManualClock`] in tests and offline rendering.

use std::cell::Cell;

use crate::error::ClockError;

/// Monotonic engine time in seconds plus a lazy activation lifecycle.
pub trait ClockSource {
    /// Current engine time. Only meaningful while [`is_active`](Self::is_active);
    /// implementations may return 0 before activation.
    fn now(&self) -> f64;

    /// Bring the clock online. Idempotent; must be safe to call from a user
    /// gesture handler any number of times.
    fn resume(&self) -> Result<(), ClockError>;

    fn is_active(&self) -> bool;
}

/// Hand-driven clock. Starts inactive at t = 0.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
    active: Cell<bool>,
    deny_activation: Cell<bool>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that is already running at `t`.
    pub fn running_at(t: f64) -> Self {
        let c = Self::default();
        c.now.set(t);
        c.active.set(true);
        c
    }

    /// Jump to an absolute time. Time never moves backwards.
    pub fn set(&self, t: f64) {
        if t > self.now.get() {
            self.now.set(t);
        }
    }

    pub fn advance(&self, dt: f64) {
        self.set(self.now.get() + dt.max(0.0));
    }

    /// Make subsequent `resume` calls fail, as a blocked autoplay policy would.
    pub fn deny_activation(&self, deny: bool) {
        self.deny_activation.set(deny);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> f64 {
        if self.active.get() {
            self.now.get()
        } else {
            0.0
        }
    }

    fn resume(&self) -> Result<(), ClockError> {
        if self.deny_activation.get() {
            return Err(ClockError::ActivationDenied("manual clock blocked".into()));
        }
        self.active.set(true);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
    fn resume(&self) -> Result<(), ClockError> {
        (**self).resume()
    }
    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for std::rc::Rc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
    fn resume(&self) -> Result<(), ClockError> {
        (**self).resume()
    }
    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}

impl<C: ClockSource + ?Sized> ClockSource for std::sync::Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
    fn resume(&self) -> Result<(), ClockError> {
        (**self).resume()
    }
    fn is_active(&self) -> bool {
        (**self).is_active()
    }
}
