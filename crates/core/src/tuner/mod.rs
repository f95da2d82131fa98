//! Buffer Tuner - Observation-Point Entry Points
//!
//! Each transport observation point maps to one independent entry point:
//!
//! | Observation point              | Entry point                               |
//! |--------------------------------|-------------------------------------------|
//! | protocol entered pressure      | [`BufferTuner::on_enter_memory_pressure`] |
//! | protocol left pressure         | [`BufferTuner::on_leave_memory_pressure`] |
//! | send buffer expansion          | [`BufferTuner::on_send_buffer_expand`]    |
//! | receive space recomputation    | [`BufferTuner::on_receive_space_adjust`]  |
//! | connection creation            | [`BufferTuner::on_connection_init`]       |
//!
//! Entry points take a [`ConnectionSnapshot`] by reference, do a bounded
//! amount of work, and never block, fail or retry. The only coupling between
//! them is the shared [`PressureState`].

pub mod lifecycle;
pub mod receive;
pub mod send;

use std::fmt;
use std::sync::Arc;

use crate::config::TunerConfig;
use crate::error::TunerResult;
use crate::memory::accounting::MemoryAccounting;
use crate::memory::pressure::{PressureEvaluator, ProtocolMemory};
use crate::memory::state::{GlobalPressureTracker, PressureState};
use crate::sink::EventSink;
use crate::stats::TunerStats;
use crate::types::{ConnectionBufferState, ConnectionId, TuningEvent};

pub use lifecycle::ConnectionLifecycle;
pub use receive::ReceiveBufferMonitor;
pub use send::SendBufferMonitor;

/// Per-invocation view of one connection, borrowed from the transport layer
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSnapshot<'a> {
    /// Connection identity
    pub id: ConnectionId,
    /// Protocol memory view; `None` when the protocol state is unavailable
    pub protocol: Option<ProtocolMemory<'a>>,
    /// Send buffer; `None` when the connection's namespace is unavailable
    pub send: Option<ConnectionBufferState>,
    /// Receive buffer; `None` when the connection's namespace is unavailable
    pub receive: Option<ConnectionBufferState>,
}

impl<'a> ConnectionSnapshot<'a> {
    /// Snapshot with nothing but an identity
    #[must_use]
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            protocol: None,
            send: None,
            receive: None,
        }
    }

    /// Attach protocol memory view
    #[must_use]
    pub fn with_protocol(mut self, protocol: ProtocolMemory<'a>) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Attach send buffer state
    #[must_use]
    pub fn with_send(mut self, send: ConnectionBufferState) -> Self {
        self.send = Some(send);
        self
    }

    /// Attach receive buffer state
    #[must_use]
    pub fn with_receive(mut self, receive: ConnectionBufferState) -> Self {
        self.receive = Some(receive);
        self
    }
}

/// Why a growth opportunity produced no proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuppressReason {
    /// Operator locked this buffer's auto-sizing
    Locked,
    /// A previous evaluation left `near_pressure` or `near_exhaustion` set
    NearPressure,
    /// This invocation's evaluation reported pressure
    MemoryPressure,
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Locked => "locked",
            Self::NearPressure => "near_pressure",
            Self::MemoryPressure => "memory_pressure",
        })
    }
}

/// Outcome of a growth monitor invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthDecision {
    /// A buffer increase was proposed and delivered to the sink
    Proposed(TuningEvent),
    /// Growth was warranted by occupancy but withheld
    Suppressed(SuppressReason),
    /// Buffer is not nearly full
    NotNeeded,
    /// Buffer state unavailable for this connection
    Skipped,
}

impl GrowthDecision {
    /// A proposal was emitted
    #[must_use]
    pub const fn is_proposed(&self) -> bool {
        matches!(self, Self::Proposed(_))
    }

    /// Emitted proposal, if any
    #[must_use]
    pub const fn event(&self) -> Option<&TuningEvent> {
        match self {
            Self::Proposed(event) => Some(event),
            _ => None,
        }
    }
}

/// All observation-point handlers over one set of shared state
///
/// Cloning is cheap (shared `Arc`s); hand one clone to each execution context.
#[derive(Debug, Clone)]
pub struct BufferTuner {
    evaluator: PressureEvaluator,
    tracker: GlobalPressureTracker,
    send: SendBufferMonitor,
    receive: ReceiveBufferMonitor,
    lifecycle: ConnectionLifecycle,
}

impl BufferTuner {
    /// Create tuner with fresh pressure state and counters
    #[must_use]
    pub fn new(accounting: Arc<MemoryAccounting>, sink: Arc<dyn EventSink>) -> Self {
        Self::with_shared(
            accounting,
            Arc::new(PressureState::new()),
            Arc::new(TunerStats::new()),
            sink,
        )
    }

    /// Create tuner over caller-provided shared state
    #[must_use]
    pub fn with_shared(
        accounting: Arc<MemoryAccounting>,
        state: Arc<PressureState>,
        stats: Arc<TunerStats>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let tracker = GlobalPressureTracker::new(Arc::clone(&state), Arc::clone(&stats));
        let evaluator = PressureEvaluator::new(accounting, state, stats, sink);
        Self {
            tracker,
            send: SendBufferMonitor::new(evaluator.clone()),
            receive: ReceiveBufferMonitor::new(evaluator.clone()),
            lifecycle: ConnectionLifecycle::new(evaluator.clone()),
            evaluator,
        }
    }

    /// Create tuner from validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn from_config(config: &TunerConfig, sink: Arc<dyn EventSink>) -> TunerResult<Self> {
        let accounting = config.memory_accounting()?;
        Ok(Self::new(Arc::new(accounting), sink))
    }

    /// Accounting constants
    #[must_use]
    pub const fn accounting(&self) -> &Arc<MemoryAccounting> {
        self.evaluator.accounting()
    }

    /// Shared pressure flags
    #[must_use]
    pub const fn state(&self) -> &Arc<PressureState> {
        self.evaluator.state()
    }

    /// Shared counters
    #[must_use]
    pub const fn stats(&self) -> &Arc<TunerStats> {
        self.evaluator.stats()
    }

    /// Run the pressure predicate directly
    pub fn evaluate_pressure(&self, conn: &ConnectionSnapshot<'_>) -> bool {
        self.evaluator.evaluate(conn.id, conn.protocol.as_ref())
    }

    /// Memory subsystem entered pressure
    pub fn on_enter_memory_pressure(&self) {
        self.tracker.enter_memory_pressure();
    }

    /// Memory subsystem left pressure
    pub fn on_leave_memory_pressure(&self) {
        self.tracker.leave_memory_pressure();
    }

    /// Send buffer growth opportunity
    pub fn on_send_buffer_expand(&self, conn: &ConnectionSnapshot<'_>) -> GrowthDecision {
        self.send.on_send_buffer_expand(conn)
    }

    /// Receive space recomputation
    pub fn on_receive_space_adjust(&self, conn: &ConnectionSnapshot<'_>) -> GrowthDecision {
        self.receive.on_receive_space_adjust(conn)
    }

    /// Connection creation
    pub fn on_connection_init(&self, conn: &ConnectionSnapshot<'_>) {
        self.lifecycle.on_connection_init(conn);
    }
}
