//! Core Types - Thresholds, Buffer State and Tuning Events
//!
//! Plain value types shared by the evaluator and the growth monitors.
//! Everything here is `Copy` so snapshots can be taken and handed around
//! without allocation on the observation-point hot path.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Returns `true` when `value` is strictly above 75% of `limit`.
///
/// The ratio is fixed: `4 * value > 3 * limit`. Computed in `u128` so that
/// neither side can overflow for any pair of `u64` inputs.
#[must_use]
pub const fn nearly_full(value: u64, limit: u64) -> bool {
    (value as u128) * 4 > (limit as u128) * 3
}

/// Returns `value + value / 4`, saturating at `u64::MAX`.
#[must_use]
pub const fn grow_by_quarter(value: u64) -> u64 {
    value.saturating_add(value / 4)
}

/// Ordered three-tier budget: (low, pressure, max)
///
/// `low <= pressure <= max` is assumed of callers and never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ThresholdTriple {
    /// Low tier (tcp_mem\[0\] / default minimum)
    pub low: u64,
    /// Pressure tier (tcp_mem\[1\] / default size)
    pub pressure: u64,
    /// Max tier (tcp_mem\[2\] / maximum size)
    pub max: u64,
}

impl ThresholdTriple {
    /// Create new threshold triple
    #[must_use]
    pub const fn new(low: u64, pressure: u64, max: u64) -> Self {
        Self { low, pressure, max }
    }

    /// Build from `[low, pressure, max]`
    #[must_use]
    pub const fn from_array(tiers: [u64; 3]) -> Self {
        let [low, pressure, max] = tiers;
        Self { low, pressure, max }
    }

    /// Tiers as `[low, pressure, max]`
    #[must_use]
    pub const fn to_array(self) -> [u64; 3] {
        [self.low, self.pressure, self.max]
    }

    /// Apply `f` to every tier independently
    #[must_use]
    pub fn map(self, mut f: impl FnMut(u64) -> u64) -> Self {
        Self {
            low: f(self.low),
            pressure: f(self.pressure),
            max: f(self.max),
        }
    }

    /// Every tier grown by a quarter
    #[must_use]
    pub const fn grow_all_by_quarter(self) -> Self {
        Self {
            low: grow_by_quarter(self.low),
            pressure: grow_by_quarter(self.pressure),
            max: grow_by_quarter(self.max),
        }
    }

    /// Only the max tier grown by a quarter
    #[must_use]
    pub const fn grow_max_by_quarter(self) -> Self {
        Self {
            low: self.low,
            pressure: self.pressure,
            max: grow_by_quarter(self.max),
        }
    }
}

impl From<[u64; 3]> for ThresholdTriple {
    fn from(tiers: [u64; 3]) -> Self {
        Self::from_array(tiers)
    }
}

impl fmt::Display for ThresholdTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.low, self.pressure, self.max)
    }
}

/// Opaque connection identity supplied by the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Create new connection id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id value
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{:x}", self.0)
    }
}

/// Per-connection snapshot of one buffer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionBufferState {
    /// Current buffer size in bytes
    pub current_buffer_size: u64,
    /// Configured limits for this buffer class
    pub configured_limits: ThresholdTriple,
    /// Operator has frozen auto-sizing for this buffer
    pub locked: bool,
}

impl ConnectionBufferState {
    /// Create unlocked buffer state
    #[must_use]
    pub const fn new(current_buffer_size: u64, configured_limits: ThresholdTriple) -> Self {
        Self {
            current_buffer_size,
            configured_limits,
            locked: false,
        }
    }

    /// Same state with the lock bit set
    #[must_use]
    pub const fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Buffer occupancy is above 75% of the configured max
    #[must_use]
    pub const fn is_nearly_full(&self) -> bool {
        nearly_full(self.current_buffer_size, self.configured_limits.max)
    }
}

/// What a tuning event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Protocol memory is nearly at the pressure tier
    MemoryPressure,
    /// Protocol memory is nearly at the max tier
    MemoryExhaustion,
    /// A buffer is nearly at its configured max
    BufferIncrease,
}

impl EventCategory {
    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MemoryPressure => "memory_pressure",
            Self::MemoryExhaustion => "memory_exhaustion",
            Self::BufferIncrease => "buffer_increase",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tunable a tuning event proposes to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunableParameter {
    /// Protocol-wide memory table (`tcp_mem`), page units
    ProtocolMem,
    /// Send buffer limits (`tcp_wmem`), bytes
    SendBuffer,
    /// Receive buffer limits (`tcp_rmem`), bytes
    ReceiveBuffer,
}

impl TunableParameter {
    /// Kernel-style tunable name
    #[must_use]
    pub const fn sysctl_name(self) -> &'static str {
        match self {
            Self::ProtocolMem => "tcp_mem",
            Self::SendBuffer => "tcp_wmem",
            Self::ReceiveBuffer => "tcp_rmem",
        }
    }
}

impl fmt::Display for TunableParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sysctl_name())
    }
}

/// Proposed change, handed to the event sink and never retained by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningEvent {
    /// Connection that observed the condition
    pub subject: ConnectionId,
    /// Detected condition
    pub category: EventCategory,
    /// Tunable the proposal applies to
    pub parameter: TunableParameter,
    /// Values observed
    pub old_values: ThresholdTriple,
    /// Values proposed
    pub new_values: ThresholdTriple,
}

impl TuningEvent {
    /// Create new tuning event
    #[must_use]
    pub const fn new(
        subject: ConnectionId,
        category: EventCategory,
        parameter: TunableParameter,
        old_values: ThresholdTriple,
        new_values: ThresholdTriple,
    ) -> Self {
        Self {
            subject,
            category,
            parameter,
            old_values,
            new_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearly_full_boundary() {
        // exactly 75% is not nearly full
        assert!(!nearly_full(75, 100));
        assert!(nearly_full(76, 100));
        assert!(nearly_full(80, 100));
        assert!(!nearly_full(70, 100));
        assert!(!nearly_full(0, 0));
        assert!(nearly_full(1, 0));
    }

    #[test]
    fn test_nearly_full_no_overflow() {
        assert!(nearly_full(u64::MAX, u64::MAX - 1));
        assert!(!nearly_full(u64::MAX / 2, u64::MAX));
    }

    #[test]
    fn test_grow_by_quarter() {
        assert_eq!(grow_by_quarter(100), 125);
        assert_eq!(grow_by_quarter(3), 3);
        assert_eq!(grow_by_quarter(4), 5);
        assert_eq!(grow_by_quarter(0), 0);
        assert_eq!(grow_by_quarter(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_triple_growth() {
        let tiers = ThresholdTriple::new(4096, 131_072, 6_291_456);
        assert_eq!(
            tiers.grow_max_by_quarter(),
            ThresholdTriple::new(4096, 131_072, 7_864_320)
        );
        assert_eq!(
            tiers.grow_all_by_quarter(),
            ThresholdTriple::new(5120, 163_840, 7_864_320)
        );
    }

    #[test]
    fn test_triple_array_conversion() {
        let tiers = ThresholdTriple::from([1, 2, 3]);
        assert_eq!(tiers.to_array(), [1, 2, 3]);
        assert_eq!(tiers.map(|v| v * 10), ThresholdTriple::new(10, 20, 30));
        assert_eq!(tiers.to_string(), "1 2 3");
    }

    #[test]
    fn test_buffer_state() {
        let state = ConnectionBufferState::new(76, ThresholdTriple::new(10, 50, 100));
        assert!(state.is_nearly_full());
        assert!(!state.locked);
        assert!(state.locked().locked);
    }

    #[test]
    fn test_names() {
        assert_eq!(TunableParameter::ProtocolMem.to_string(), "tcp_mem");
        assert_eq!(TunableParameter::SendBuffer.to_string(), "tcp_wmem");
        assert_eq!(TunableParameter::ReceiveBuffer.to_string(), "tcp_rmem");
        assert_eq!(EventCategory::MemoryExhaustion.to_string(), "memory_exhaustion");
        assert_eq!(ConnectionId::new(255).to_string(), "conn#ff");
    }
}
