//! Memory Pressure - Protocol Memory Accounting and Classification
//!
//! - [`accounting`]: page/quantum unit constants and shift-based conversion
//! - [`probe`]: fallible readers of three-tier threshold tables
//! - [`state`]: process-wide pressure flags and the global pressure tracker
//! - [`pressure`]: the shared pressure predicate used by every observation point

pub mod accounting;
pub mod pressure;
pub mod probe;
pub mod state;

pub use accounting::{convert, AccountingUnit, MemoryAccounting};
pub use pressure::{PressureEvaluator, ProtocolMemory};
pub use probe::{parse_thresholds, ProcSysProbe, SharedThresholds, ThresholdProbe};
pub use state::{GlobalPressureTracker, PressureFlags, PressureState};
