//! Connection Lifecycle Hook

use crate::memory::pressure::PressureEvaluator;
use crate::tuner::ConnectionSnapshot;

/// Seeds the pressure flags when a connection is created
#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    evaluator: PressureEvaluator,
}

impl ConnectionLifecycle {
    /// Create hook sharing `evaluator`
    #[must_use]
    pub const fn new(evaluator: PressureEvaluator) -> Self {
        Self { evaluator }
    }

    /// Connection-creation signal. Runs one evaluation so the flags reflect
    /// current protocol memory before the connection moves any data.
    pub fn on_connection_init(&self, conn: &ConnectionSnapshot<'_>) {
        let _under_pressure = self.evaluator.evaluate(conn.id, conn.protocol.as_ref());
    }
}
