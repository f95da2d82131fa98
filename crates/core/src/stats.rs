//! Tuner Statistics - Advisory Counters
//!
//! Relaxed atomic counters bumped from the observation points. Concurrent
//! increments may interleave arbitrarily; values are for monitoring only and
//! never feed back into a decision.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::{EventCategory, TunableParameter};

/// Point-in-time copy of [`TunerStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunerStatsSnapshot {
    /// Pressure evaluations started
    pub evaluations: u64,
    /// Evaluations that bailed out on a missing handle or failed probe
    pub aborted_evaluations: u64,
    /// `memory_pressure` events emitted
    pub pressure_events: u64,
    /// `memory_exhaustion` events emitted
    pub exhaustion_events: u64,
    /// Send buffer increases proposed
    pub send_increases: u64,
    /// Receive buffer increases proposed
    pub receive_increases: u64,
    /// Growth opportunities suppressed by lock bits or pressure
    pub suppressed_growths: u64,
    /// "Entered pressure" signals received
    pub pressure_entered: u64,
    /// "Left pressure" signals received
    pub pressure_left: u64,
}

impl TunerStatsSnapshot {
    /// Total events handed to the sink
    #[must_use]
    pub const fn total_events(&self) -> u64 {
        self.pressure_events + self.exhaustion_events + self.send_increases + self.receive_increases
    }
}

/// Shared tuner counters
#[derive(Debug, Default)]
pub struct TunerStats {
    evaluations: AtomicU64,
    aborted_evaluations: AtomicU64,
    pressure_events: AtomicU64,
    exhaustion_events: AtomicU64,
    send_increases: AtomicU64,
    receive_increases: AtomicU64,
    suppressed_growths: AtomicU64,
    pressure_entered: AtomicU64,
    pressure_left: AtomicU64,
}

impl TunerStats {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an evaluation start
    pub fn record_evaluation(&self) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an evaluation abort
    pub fn record_abort(&self) {
        self.aborted_evaluations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an emitted event
    pub fn record_event(&self, category: EventCategory, parameter: TunableParameter) {
        let counter = match (category, parameter) {
            (EventCategory::MemoryPressure, _) => &self.pressure_events,
            (EventCategory::MemoryExhaustion, _) => &self.exhaustion_events,
            (EventCategory::BufferIncrease, TunableParameter::ReceiveBuffer) => {
                &self.receive_increases
            }
            (EventCategory::BufferIncrease, _) => &self.send_increases,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a suppressed growth opportunity
    pub fn record_suppressed(&self) {
        self.suppressed_growths.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a pressure signal
    pub fn record_pressure_signal(&self, entered: bool) {
        if entered {
            self.pressure_entered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.pressure_left.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Copy all counters
    #[must_use]
    pub fn snapshot(&self) -> TunerStatsSnapshot {
        TunerStatsSnapshot {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            aborted_evaluations: self.aborted_evaluations.load(Ordering::Relaxed),
            pressure_events: self.pressure_events.load(Ordering::Relaxed),
            exhaustion_events: self.exhaustion_events.load(Ordering::Relaxed),
            send_increases: self.send_increases.load(Ordering::Relaxed),
            receive_increases: self.receive_increases.load(Ordering::Relaxed),
            suppressed_growths: self.suppressed_growths.load(Ordering::Relaxed),
            pressure_entered: self.pressure_entered.load(Ordering::Relaxed),
            pressure_left: self.pressure_left.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_counters() {
        let stats = TunerStats::new();
        stats.record_event(EventCategory::MemoryPressure, TunableParameter::ProtocolMem);
        stats.record_event(EventCategory::MemoryExhaustion, TunableParameter::ProtocolMem);
        stats.record_event(EventCategory::BufferIncrease, TunableParameter::SendBuffer);
        stats.record_event(EventCategory::BufferIncrease, TunableParameter::ReceiveBuffer);
        stats.record_event(EventCategory::BufferIncrease, TunableParameter::ReceiveBuffer);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.pressure_events, 1);
        assert_eq!(snapshot.exhaustion_events, 1);
        assert_eq!(snapshot.send_increases, 1);
        assert_eq!(snapshot.receive_increases, 2);
        assert_eq!(snapshot.total_events(), 5);
    }

    #[test]
    fn test_signal_counters() {
        let stats = TunerStats::new();
        stats.record_pressure_signal(true);
        stats.record_pressure_signal(true);
        stats.record_pressure_signal(false);
        stats.record_evaluation();
        stats.record_abort();
        stats.record_suppressed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.pressure_entered, 2);
        assert_eq!(snapshot.pressure_left, 1);
        assert_eq!(snapshot.evaluations, 1);
        assert_eq!(snapshot.aborted_evaluations, 1);
        assert_eq!(snapshot.suppressed_growths, 1);
    }
}
