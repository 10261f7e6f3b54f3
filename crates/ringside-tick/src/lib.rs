//! Fixed-cadence ticker for Ringside.
//!
//! Every periodic loop in the workspace runs on a [`Ticker`]: the client's
//! readiness poll (1 s), its state sync loop (50 ms), the liveness prober
//! (2 s), and the server's reaper. The ticker owns the schedule and
//! overrun handling so the loops only contain their own work. A late tick
//! never triggers a burst of back-to-back cycles: the next one is due a
//! full period after the late one fired.
//!
//! # Integration
//!
//! A ticker sits inside a `tokio::select!` next to a stop signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = stop_rx.changed() => break,
//!         info = ticker.wait_for_tick() => {
//!             if info.overrun {
//!                 tracing::debug!(tick = info.tick, "previous cycle ran long");
//!             }
//!             do_one_cycle().await;
//!         }
//!     }
//! }
//! ```
//!
//! All deadlines are `tokio::time::Instant`s, so tests can drive a ticker
//! with `tokio::time::pause` and `advance`.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`Ticker`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. Must be non-zero.
    pub period: Duration,
    /// Whether the first tick fires at once instead of after one period.
    pub immediate_first: bool,
    /// Random delay (0..max) added to the first tick, so many clients
    /// started at the same instant do not hit the server in lockstep.
    pub initial_jitter: Duration,
}

impl TickConfig {
    /// Smallest accepted period. Shorter periods are clamped up.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// A config for `period` with an immediate first tick and no jitter.
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            immediate_first: true,
            initial_jitter: Duration::ZERO,
        }
    }

    /// Sets the maximum first-tick jitter.
    pub fn with_jitter(mut self, max: Duration) -> Self {
        self.initial_jitter = max;
        self
    }

    /// Delays the first tick by one period.
    pub fn delayed_start(mut self) -> Self {
        self.immediate_first = false;
        self
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`Ticker::new`].
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(period = ?self.period, "tick period below minimum, clamping");
            self.period = Self::MIN_PERIOD;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`Ticker::wait_for_tick`] for each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired more than a tenth of a period late.
    pub overrun: bool,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Fixed-cadence ticker. One per periodic loop.
#[derive(Debug)]
pub struct Ticker {
    config: TickConfig,
    tick_count: u64,
    next_tick: Instant,
}

impl Ticker {
    /// Creates a ticker. The first tick is due now (or after one period
    /// with [`TickConfig::delayed_start`]), plus any jitter.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_us = config.initial_jitter.as_micros().min(u64::MAX as u128) as u64;
            Duration::from_micros(rand::rng().random_range(0..max_us.max(1)))
        };
        let first = if config.immediate_first {
            Duration::ZERO
        } else {
            config.period
        };

        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            jitter_us = jitter.as_micros() as u64,
            "ticker created"
        );

        Self {
            next_tick: Instant::now() + first + jitter,
            config,
            tick_count: 0,
        }
    }

    /// Waits until the next tick is due.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = self.next_tick;
        let period = self.config.period;

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        if overrun {
            let skipped = late_by.as_nanos() / period.as_nanos();
            if skipped > 0 {
                debug!(
                    tick = self.tick_count,
                    skipped = skipped as u64,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "tick overrun, skipping ahead"
                );
            }
        }
        self.next_tick = now + period;
        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
        }
    }
}
