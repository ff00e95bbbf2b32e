//! Cancelable single-shot timer used for the debounce quiet period.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Instant, Sleep};

/// A countdown that can be re-armed or cancelled before it fires.
///
/// Arming while already armed restarts the full period, so a steady stream of
/// `arm` calls keeps it from ever firing.
pub struct Countdown {
    period: Duration,
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl Countdown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            sleep: Box::pin(sleep(period)),
            armed: false,
        }
    }

    /// Start (or restart) the countdown from now.
    pub fn arm(&mut self) {
        self.sleep.as_mut().reset(Instant::now() + self.period);
        self.armed = true;
    }

    /// Disarm without firing. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.then(|| self.sleep.deadline())
    }

    /// Resolve when the armed countdown runs out, disarming it.
    ///
    /// Never resolves while disarmed.
    pub async fn elapsed(&mut self) {
        if !self.armed {
            pending::<()>().await;
        }
        self.sleep.as_mut().await;
        self.armed = false;
    }
}
