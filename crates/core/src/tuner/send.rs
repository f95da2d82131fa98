//! Send Buffer Growth Monitor
//!
//! Fires when the transport decides to expand a send buffer. By then the
//! transport has already established that the send buffer is not locked,
//! protocol memory pressure is not in effect and the congestion window is
//! full, so none of that is re-checked here. The hysteresis flags left by the
//! most recent evaluation are checked first.

use tracing::trace;

use crate::memory::pressure::PressureEvaluator;
use crate::tuner::{ConnectionSnapshot, GrowthDecision, SuppressReason};
use crate::types::{EventCategory, TunableParameter, TuningEvent};

/// Proposes send buffer max growth when a send buffer is nearly full
#[derive(Debug, Clone)]
pub struct SendBufferMonitor {
    evaluator: PressureEvaluator,
}

impl SendBufferMonitor {
    /// Create monitor sharing `evaluator`
    #[must_use]
    pub const fn new(evaluator: PressureEvaluator) -> Self {
        Self { evaluator }
    }

    /// Growth-opportunity signal for `conn`
    pub fn on_send_buffer_expand(&self, conn: &ConnectionSnapshot<'_>) -> GrowthDecision {
        let Some(send) = conn.send else {
            return GrowthDecision::Skipped;
        };
        if self.evaluator.state().blocks_growth() {
            return self.suppress(conn, SuppressReason::NearPressure);
        }
        if !send.is_nearly_full() {
            return GrowthDecision::NotNeeded;
        }
        if self.evaluator.evaluate(conn.id, conn.protocol.as_ref()) {
            return self.suppress(conn, SuppressReason::MemoryPressure);
        }

        let old = send.configured_limits;
        let event = TuningEvent::new(
            conn.id,
            EventCategory::BufferIncrease,
            TunableParameter::SendBuffer,
            old,
            old.grow_max_by_quarter(),
        );
        self.evaluator.emit(event);
        GrowthDecision::Proposed(event)
    }

    fn suppress(&self, conn: &ConnectionSnapshot<'_>, reason: SuppressReason) -> GrowthDecision {
        self.evaluator.stats().record_suppressed();
        trace!(subject = %conn.id, reason = %reason, "send buffer growth suppressed");
        GrowthDecision::Suppressed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::accounting::MemoryAccounting;
    use crate::memory::pressure::ProtocolMemory;
    use crate::memory::probe::SharedThresholds;
    use crate::memory::state::PressureState;
    use crate::sink::CollectingSink;
    use crate::stats::TunerStats;
    use crate::types::{ConnectionBufferState, ConnectionId, ThresholdTriple};
    use std::sync::Arc;

    fn monitor(sink: Arc<CollectingSink>) -> SendBufferMonitor {
        SendBufferMonitor::new(PressureEvaluator::new(
            Arc::new(MemoryAccounting::default()),
            Arc::new(PressureState::new()),
            Arc::new(TunerStats::new()),
            sink,
        ))
    }

    #[test]
    fn test_nearly_full_proposes_max_growth() {
        let sink = Arc::new(CollectingSink::new());
        let monitor = monitor(sink.clone());
        let tcp_mem = ThresholdTriple::new(1000, 2000, 4000);
        let limits = ThresholdTriple::new(4096, 16_384, 100);

        let conn = ConnectionSnapshot::new(ConnectionId::new(3))
            .with_protocol(ProtocolMemory::new(10, &tcp_mem))
            .with_send(ConnectionBufferState::new(76, limits));

        let decision = monitor.on_send_buffer_expand(&conn);
        let event = decision.event().copied();
        assert_eq!(event.map(|e| e.parameter), Some(TunableParameter::SendBuffer));
        assert_eq!(
            event.map(|e| e.new_values),
            Some(ThresholdTriple::new(4096, 16_384, 125))
        );
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_not_nearly_full_skips_evaluation() {
        let sink = Arc::new(CollectingSink::new());
        let monitor = monitor(sink.clone());
        let conn = ConnectionSnapshot::new(ConnectionId::new(3))
            .with_send(ConnectionBufferState::new(75, ThresholdTriple::new(1, 2, 100)));

        assert_eq!(monitor.on_send_buffer_expand(&conn), GrowthDecision::NotNeeded);
        assert_eq!(monitor.evaluator.stats().snapshot().evaluations, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_pressure_suppresses_growth() {
        let sink = Arc::new(CollectingSink::new());
        let monitor = monitor(sink.clone());
        let tcp_mem = ThresholdTriple::new(10, 100, 1000);
        let conn = ConnectionSnapshot::new(ConnectionId::new(3))
            .with_protocol(ProtocolMemory::new(80, &tcp_mem))
            .with_send(ConnectionBufferState::new(90, ThresholdTriple::new(1, 2, 100)));

        assert_eq!(
            monitor.on_send_buffer_expand(&conn),
            GrowthDecision::Suppressed(SuppressReason::MemoryPressure)
        );
        // only the pressure event from the evaluator
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(events
            .iter()
            .all(|e| e.category != EventCategory::BufferIncrease));
    }

    #[test]
    fn test_stale_flags_block_growth_when_evaluation_aborts() {
        let sink = Arc::new(CollectingSink::new());
        let monitor = monitor(sink.clone());
        monitor.evaluator.state().set_near_pressure(true);
        monitor.evaluator.state().set_near_exhaustion(true);

        let unpublished = SharedThresholds::new();
        let conn = ConnectionSnapshot::new(ConnectionId::new(3))
            .with_protocol(ProtocolMemory::new(10, &unpublished))
            .with_send(ConnectionBufferState::new(90, ThresholdTriple::new(1, 2, 100)));

        assert_eq!(
            monitor.on_send_buffer_expand(&conn),
            GrowthDecision::Suppressed(SuppressReason::NearPressure)
        );
        assert!(monitor.evaluator.state().blocks_growth());
        assert_eq!(monitor.evaluator.stats().snapshot().evaluations, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_missing_namespace_is_skipped() {
        let sink = Arc::new(CollectingSink::new());
        let monitor = monitor(sink.clone());
        let conn = ConnectionSnapshot::new(ConnectionId::new(3));
        assert_eq!(monitor.on_send_buffer_expand(&conn), GrowthDecision::Skipped);
        assert!(sink.is_empty());
    }
}
