//! `BufTune` Core - Reactive TCP Buffer Auto-Tuning
//!
//! This crate decides, on every transport observation point, whether protocol
//! memory is nearing pressure or exhaustion and whether a connection's send or
//! receive buffer limits should grow. It only proposes changes; applying them
//! is left to whoever consumes the emitted [`TuningEvent`]s.
//!
//! # Features
//!
//! - **Non-blocking**: every entry point does a small, fixed amount of work
//! - **Lock-free**: shared flags are relaxed atomics, last write wins
//! - **Fail-safe**: unreadable state means "no pressure", never an error
//! - **Zero-panic policy**: setup returns `Result<T, E>`, hot paths cannot fail
//!
//! # Architecture
//!
//! - [`memory`] - unit conversion, threshold probes, pressure flags and evaluator
//! - [`tuner`] - send/receive growth monitors, connection hook, [`BufferTuner`]
//! - [`sink`] - delivery of proposals to an external consumer
//! - [`config`] - start-of-life configuration
//! - [`stats`] - advisory counters
//!
//! # Example
//!
//! ```rust
//! use buftune_core::prelude::*;
//!
//! fn main() -> TunerResult<()> {
//!     let config = TunerConfig::default();
//!     let sink = Arc::new(CollectingSink::new());
//!     let tuner = BufferTuner::from_config(&config, sink.clone())?;
//!
//!     let tcp_mem = ThresholdTriple::new(188_457, 251_276, 376_914);
//!     let wmem = ThresholdTriple::new(4096, 16_384, 4_194_304);
//!     let conn = ConnectionSnapshot::new(ConnectionId::new(1))
//!         .with_protocol(ProtocolMemory::new(1_000, &tcp_mem))
//!         .with_send(ConnectionBufferState::new(4_000_000, wmem));
//!
//!     let decision = tuner.on_send_buffer_expand(&conn);
//!     assert!(decision.is_proposed());
//!     assert_eq!(sink.len(), 1);
//!     Ok(())
//! }
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::large_stack_arrays,
    clippy::indexing_slicing,
    missing_docs
)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::correctness,
    clippy::suspicious,
    clippy::perf,
    clippy::style,
    clippy::complexity,
    clippy::unreachable,
    clippy::redundant_pattern_matching,
    clippy::manual_let_else,
    clippy::needless_pass_by_ref_mut,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Public modules
pub mod config;
pub mod error;
pub mod prelude;
pub mod types;

// Core functionality modules
pub mod memory;
pub mod sink;
pub mod stats;
pub mod tuner;

// Re-exports for convenience
pub use config::TunerConfig;
pub use error::{AccountingError, ProbeError, TunerError, TunerResult};
pub use memory::{MemoryAccounting, PressureEvaluator, PressureState, ThresholdProbe};
pub use sink::EventSink;
pub use tuner::{BufferTuner, ConnectionSnapshot, GrowthDecision};
pub use types::{ConnectionBufferState, ConnectionId, ThresholdTriple, TuningEvent};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
