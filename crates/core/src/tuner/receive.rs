//! Receive Buffer Growth Monitor
//!
//! Fires on every receive-space recomputation, whether or not the transport
//! is under memory pressure, so the lock bit and the shared hysteresis flags
//! are checked here before anything else.

use tracing::trace;

use crate::memory::pressure::PressureEvaluator;
use crate::tuner::{ConnectionSnapshot, GrowthDecision, SuppressReason};
use crate::types::{EventCategory, TunableParameter, TuningEvent};

/// Proposes receive buffer max growth when a receive buffer is nearly full
#[derive(Debug, Clone)]
pub struct ReceiveBufferMonitor {
    evaluator: PressureEvaluator,
}

impl ReceiveBufferMonitor {
    /// Create monitor sharing `evaluator`
    #[must_use]
    pub const fn new(evaluator: PressureEvaluator) -> Self {
        Self { evaluator }
    }

    /// Receive-space recomputation signal for `conn`
    pub fn on_receive_space_adjust(&self, conn: &ConnectionSnapshot<'_>) -> GrowthDecision {
        let Some(receive) = conn.receive else {
            return GrowthDecision::Skipped;
        };

        if receive.locked {
            return self.suppress(conn, SuppressReason::Locked);
        }
        if self.evaluator.state().blocks_growth() {
            return self.suppress(conn, SuppressReason::NearPressure);
        }
        if !receive.is_nearly_full() {
            return GrowthDecision::NotNeeded;
        }
        if self.evaluator.evaluate(conn.id, conn.protocol.as_ref()) {
            return self.suppress(conn, SuppressReason::MemoryPressure);
        }

        let old = receive.configured_limits;
        let event = TuningEvent::new(
            conn.id,
            EventCategory::BufferIncrease,
            TunableParameter::ReceiveBuffer,
            old,
            old.grow_max_by_quarter(),
        );
        self.evaluator.emit(event);
        GrowthDecision::Proposed(event)
    }

    fn suppress(&self, conn: &ConnectionSnapshot<'_>, reason: SuppressReason) -> GrowthDecision {
        self.evaluator.stats().record_suppressed();
        trace!(subject = %conn.id, reason = %reason, "receive buffer growth suppressed");
        GrowthDecision::Suppressed(reason)
    }
}
