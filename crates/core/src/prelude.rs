//! `BufTune` Core Prelude
//!
//! Common imports for hosts wiring observation points to the tuner.

pub use crate::config::{AccountingConfig, SinkConfig, TunerConfig};
pub use crate::error::{AccountingError, ProbeError, TunerError, TunerResult};
pub use crate::memory::{
    MemoryAccounting, PressureEvaluator, PressureFlags, PressureState, ProcSysProbe,
    ProtocolMemory, SharedThresholds, ThresholdProbe,
};
pub use crate::sink::{ChannelSink, CollectingSink, DiscardSink, EventSink};
pub use crate::stats::{TunerStats, TunerStatsSnapshot};
pub use crate::tuner::{BufferTuner, ConnectionSnapshot, GrowthDecision, SuppressReason};
pub use crate::types::{
    ConnectionBufferState, ConnectionId, EventCategory, ThresholdTriple, TunableParameter,
    TuningEvent,
};

pub use std::sync::Arc;
