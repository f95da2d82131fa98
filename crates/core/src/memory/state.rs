//! Shared Pressure State - Lock-Free Process-Wide Flags
//!
//! Every field is a plain atomic accessed with `Ordering::Relaxed`. Observers
//! on different connections read and overwrite the flags without any
//! coordination; last write wins and the next evaluation corrects whatever a
//! racing writer left behind.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::stats::TunerStats;

/// Copy of the shared flags at one instant
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressureFlags {
    /// Memory subsystem reported protocol-wide pressure
    pub under_pressure: bool,
    /// Last evaluation found allocation above 75% of the pressure tier
    pub near_pressure: bool,
    /// Last evaluation found allocation above 75% of the max tier
    pub near_exhaustion: bool,
    /// Connection count maintained outside the core
    pub connection_count: i64,
}

impl PressureFlags {
    /// Either growth-gating flag is set
    #[must_use]
    pub const fn blocks_growth(&self) -> bool {
        self.near_pressure || self.near_exhaustion
    }
}

/// Process-wide pressure state
#[derive(Debug, Default)]
pub struct PressureState {
    under_pressure: AtomicBool,
    near_pressure: AtomicBool,
    near_exhaustion: AtomicBool,
    connection_count: AtomicI64,
}

impl PressureState {
    /// Create state with every flag cleared
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory subsystem reported pressure
    #[must_use]
    pub fn under_pressure(&self) -> bool {
        self.under_pressure.load(Ordering::Relaxed)
    }

    /// Near the pressure tier as of the most recent evaluation
    #[must_use]
    pub fn near_pressure(&self) -> bool {
        self.near_pressure.load(Ordering::Relaxed)
    }

    /// Near the max tier as of the most recent evaluation
    #[must_use]
    pub fn near_exhaustion(&self) -> bool {
        self.near_exhaustion.load(Ordering::Relaxed)
    }

    /// Either hysteresis flag is set; growth monitors stand down while true
    #[must_use]
    pub fn blocks_growth(&self) -> bool {
        self.near_pressure() || self.near_exhaustion()
    }

    /// Connection count as last stored by its external maintainer
    #[must_use]
    pub fn connection_count(&self) -> i64 {
        self.connection_count.load(Ordering::Relaxed)
    }

    /// Store the connection count. The core never calls this.
    pub fn set_connection_count(&self, count: i64) {
        self.connection_count.store(count, Ordering::Relaxed);
    }

    /// Overwrite `under_pressure`, returning the previous value
    pub fn set_under_pressure(&self, value: bool) -> bool {
        self.under_pressure.swap(value, Ordering::Relaxed)
    }

    /// Overwrite `near_pressure`
    pub fn set_near_pressure(&self, value: bool) {
        self.near_pressure.store(value, Ordering::Relaxed);
    }

    /// Overwrite `near_exhaustion`
    pub fn set_near_exhaustion(&self, value: bool) {
        self.near_exhaustion.store(value, Ordering::Relaxed);
    }

    /// Copy all fields. Fields are loaded one at a time, so the copy may mix
    /// values written by different observers.
    #[must_use]
    pub fn snapshot(&self) -> PressureFlags {
        PressureFlags {
            under_pressure: self.under_pressure(),
            near_pressure: self.near_pressure(),
            near_exhaustion: self.near_exhaustion(),
            connection_count: self.connection_count(),
        }
    }
}

/// Tracks the memory subsystem's "entered pressure" / "left pressure" signals
#[derive(Debug, Clone)]
pub struct GlobalPressureTracker {
    state: Arc<PressureState>,
    stats: Arc<TunerStats>,
}

impl GlobalPressureTracker {
    /// Create tracker over shared state
    #[must_use]
    pub const fn new(state: Arc<PressureState>, stats: Arc<TunerStats>) -> Self {
        Self { state, stats }
    }

    /// Memory subsystem entered pressure
    pub fn enter_memory_pressure(&self) {
        self.stats.record_pressure_signal(true);
        if !self.state.set_under_pressure(true) {
            info!("protocol memory pressure entered");
        }
    }

    /// Memory subsystem left pressure
    pub fn leave_memory_pressure(&self) {
        self.stats.record_pressure_signal(false);
        if self.state.set_under_pressure(false) {
            info!("protocol memory pressure left");
        }
    }

    /// Current `under_pressure` value
    #[must_use]
    pub fn under_pressure(&self) -> bool {
        self.state.under_pressure()
    }
}
