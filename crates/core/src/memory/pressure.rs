//! Pressure Evaluation - Protocol Memory Classification
//!
//! Compares a connection's view of protocol-wide allocated memory against the
//! three-tier protocol memory table:
//! - above 75% of the pressure tier: `near_pressure`, propose growing every tier
//! - above 75% of the max tier: `near_exhaustion`, propose growing the max tier
//!
//! The two checks are independent and both flags are overwritten on every
//! successful evaluation. A missing handle, unreadable table or zeroed max
//! tier ends the evaluation as "no pressure" and leaves the flags as they were.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::memory::accounting::MemoryAccounting;
use crate::memory::probe::ThresholdProbe;
use crate::memory::state::PressureState;
use crate::sink::EventSink;
use crate::stats::TunerStats;
use crate::types::{nearly_full, ConnectionId, EventCategory, TunableParameter, TuningEvent};

/// Protocol-level memory view of one connection
#[derive(Clone, Copy)]
pub struct ProtocolMemory<'a> {
    /// Protocol-wide allocated memory, in accounting quanta
    pub allocated: u64,
    /// Protocol memory table, in pages
    pub limits: &'a dyn ThresholdProbe,
}

impl<'a> ProtocolMemory<'a> {
    /// Create protocol memory view
    #[must_use]
    pub fn new(allocated: u64, limits: &'a dyn ThresholdProbe) -> Self {
        Self { allocated, limits }
    }
}

impl fmt::Debug for ProtocolMemory<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolMemory")
            .field("allocated", &self.allocated)
            .finish_non_exhaustive()
    }
}

/// Why an evaluation ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortReason {
    NoProtocolState,
    ProbeFailed,
    Uninitialized,
}

impl AbortReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::NoProtocolState => "protocol state unavailable",
            Self::ProbeFailed => "threshold probe failed",
            Self::Uninitialized => "max tier is zero",
        }
    }
}

/// Shared pressure predicate used by every observation point
#[derive(Clone)]
pub struct PressureEvaluator {
    accounting: Arc<MemoryAccounting>,
    state: Arc<PressureState>,
    stats: Arc<TunerStats>,
    sink: Arc<dyn EventSink>,
}

impl PressureEvaluator {
    /// Create evaluator over shared state
    #[must_use]
    pub fn new(
        accounting: Arc<MemoryAccounting>,
        state: Arc<PressureState>,
        stats: Arc<TunerStats>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            accounting,
            state,
            stats,
            sink,
        }
    }

    /// Accounting constants
    #[must_use]
    pub const fn accounting(&self) -> &Arc<MemoryAccounting> {
        &self.accounting
    }

    /// Shared pressure flags
    #[must_use]
    pub const fn state(&self) -> &Arc<PressureState> {
        &self.state
    }

    /// Shared counters
    #[must_use]
    pub const fn stats(&self) -> &Arc<TunerStats> {
        &self.stats
    }

    /// Classify protocol memory for `subject`; `true` means under pressure.
    ///
    /// Emits up to two events (pressure, exhaustion) and overwrites the
    /// `near_pressure`/`near_exhaustion` flags. Never fails.
    pub fn evaluate(&self, subject: ConnectionId, protocol: Option<&ProtocolMemory<'_>>) -> bool {
        self.stats.record_evaluation();

        let Some(protocol) = protocol else {
            return self.abort(subject, AbortReason::NoProtocolState);
        };

        let tiers = match protocol.limits.read_thresholds() {
            Ok(tiers) => tiers,
            Err(e) => {
                trace!(%subject, error = %e, "threshold probe failed");
                return self.abort(subject, AbortReason::ProbeFailed);
            }
        };
        if tiers.max == 0 {
            return self.abort(subject, AbortReason::Uninitialized);
        }

        let limits = self.accounting.thresholds_to_quanta(tiers);
        let allocated = protocol.allocated;

        let near_pressure = nearly_full(allocated, limits.pressure);
        if near_pressure {
            self.emit(TuningEvent::new(
                subject,
                EventCategory::MemoryPressure,
                TunableParameter::ProtocolMem,
                tiers,
                tiers.grow_all_by_quarter(),
            ));
        }
        self.state.set_near_pressure(near_pressure);

        let near_exhaustion = nearly_full(allocated, limits.max);
        if near_exhaustion {
            self.emit(TuningEvent::new(
                subject,
                EventCategory::MemoryExhaustion,
                TunableParameter::ProtocolMem,
                tiers,
                tiers.grow_max_by_quarter(),
            ));
        }
        self.state.set_near_exhaustion(near_exhaustion);

        near_pressure || near_exhaustion
    }

    /// Count, log and hand an event to the sink
    pub(crate) fn emit(&self, event: TuningEvent) {
        self.stats.record_event(event.category, event.parameter);
        debug!(
            subject = %event.subject,
            category = %event.category,
            parameter = %event.parameter,
            old = %event.old_values,
            new = %event.new_values,
            "proposing tunable change"
        );
        self.sink.deliver(event);
    }

    fn abort(&self, subject: ConnectionId, reason: AbortReason) -> bool {
        self.stats.record_abort();
        trace!(%subject, reason = reason.as_str(), "pressure evaluation skipped");
        false
    }
}

impl fmt::Debug for PressureEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PressureEvaluator")
            .field("accounting", &self.accounting)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::memory::probe::MockThresholdProbe;
    use crate::sink::{CollectingSink, MockEventSink};
    use crate::types::ThresholdTriple;

    fn evaluator_with(sink: Arc<dyn EventSink>) -> PressureEvaluator {
        PressureEvaluator::new(
            Arc::new(MemoryAccounting::default()),
            Arc::new(PressureState::new()),
            Arc::new(TunerStats::new()),
            sink,
        )
    }

    #[test]
    fn test_near_pressure_proposes_all_tiers() {
        let sink = Arc::new(CollectingSink::new());
        let evaluator = evaluator_with(sink.clone());
        let tiers = ThresholdTriple::new(40, 100, 400);

        let protocol = ProtocolMemory::new(80, &tiers);
        assert!(evaluator.evaluate(ConnectionId::new(1), Some(&protocol)));
        assert!(evaluator.state().near_pressure());
        assert!(!evaluator.state().near_exhaustion());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let event = events.first().copied();
        assert_eq!(event.map(|e| e.category), Some(EventCategory::MemoryPressure));
        assert_eq!(event.map(|e| e.old_values), Some(tiers));
        assert_eq!(
            event.map(|e| e.new_values),
            Some(ThresholdTriple::new(50, 125, 500))
        );
    }

    #[test]
    fn test_below_thresholds_clears_flags() {
        let sink = Arc::new(CollectingSink::new());
        let evaluator = evaluator_with(sink.clone());
        evaluator.state().set_near_pressure(true);
        evaluator.state().set_near_exhaustion(true);

        let tiers = ThresholdTriple::new(40, 100, 100);
        let protocol = ProtocolMemory::new(70, &tiers);
        assert!(!evaluator.evaluate(ConnectionId::new(1), Some(&protocol)));
        assert!(!evaluator.state().blocks_growth());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_protocol_state_is_no_pressure() {
        let mut sink = MockEventSink::new();
        sink.expect_deliver().never();
        let evaluator = evaluator_with(Arc::new(sink));
        evaluator.state().set_near_pressure(true);

        assert!(!evaluator.evaluate(ConnectionId::new(1), None));
        // stale flag survives an aborted evaluation
        assert!(evaluator.state().near_pressure());
        assert_eq!(evaluator.stats().snapshot().aborted_evaluations, 1);
    }

    #[test]
    fn test_failed_probe_and_zero_max_abort() {
        let mut sink = MockEventSink::new();
        sink.expect_deliver().never();
        let evaluator = evaluator_with(Arc::new(sink));

        let failing = || -> Result<ThresholdTriple, ProbeError> {
            Err(ProbeError::Unavailable {
                source_name: "tcp_mem".to_string(),
            })
        };
        let protocol = ProtocolMemory::new(u64::MAX, &failing);
        assert!(!evaluator.evaluate(ConnectionId::new(1), Some(&protocol)));

        let zeroed = ThresholdTriple::new(10, 10, 0);
        let protocol = ProtocolMemory::new(u64::MAX, &zeroed);
        assert!(!evaluator.evaluate(ConnectionId::new(1), Some(&protocol)));

        let snapshot = evaluator.stats().snapshot();
        assert_eq!(snapshot.evaluations, 2);
        assert_eq!(snapshot.aborted_evaluations, 2);
    }

    #[test]
    fn test_debug_format_does_not_read_thresholds() {
        let mut probe = MockThresholdProbe::new();
        probe.expect_read_thresholds().never();

        let protocol = ProtocolMemory::new(42, &probe);
        let rendered = format!("{protocol:?}");
        assert!(rendered.contains("allocated: 42"));
    }

    #[test]
    fn test_thresholds_scaled_before_comparison() -> Result<(), crate::error::AccountingError> {
        let sink = Arc::new(CollectingSink::new());
        // 16K pages, 4K quanta: pressure tier of 25 pages is 100 quanta
        let evaluator = PressureEvaluator::new(
            Arc::new(MemoryAccounting::new(16_384, 14, 4096, 12)?),
            Arc::new(PressureState::new()),
            Arc::new(TunerStats::new()),
            sink.clone(),
        );
        let tiers = ThresholdTriple::new(10, 25, 1000);

        let protocol = ProtocolMemory::new(76, &tiers);
        assert!(evaluator.evaluate(ConnectionId::new(7), Some(&protocol)));
        let events = sink.drain();
        assert_eq!(events.len(), 1);
        // proposals stay in page units
        assert_eq!(
            events.first().map(|e| e.new_values),
            Some(ThresholdTriple::new(12, 31, 1250))
        );

        let protocol = ProtocolMemory::new(75, &tiers);
        assert!(!evaluator.evaluate(ConnectionId::new(7), Some(&protocol)));
        assert!(sink.is_empty());
        Ok(())
    }
}
