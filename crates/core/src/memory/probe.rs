//! Threshold Probes - Fallible Access to Shared Threshold Tables
//!
//! The evaluator never assumes a threshold table can be read. Every source
//! goes through [`ThresholdProbe`], and any failure is absorbed by the caller.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ProbeError;
use crate::types::ThresholdTriple;

/// Fallible reader of a three-tier threshold table
#[cfg_attr(test, mockall::automock)]
pub trait ThresholdProbe: Send + Sync {
    /// Read the current table
    ///
    /// # Errors
    ///
    /// Returns error if the table is absent, unreadable or malformed.
    fn read_thresholds(&self) -> Result<ThresholdTriple, ProbeError>;
}

impl ThresholdProbe for ThresholdTriple {
    fn read_thresholds(&self) -> Result<ThresholdTriple, ProbeError> {
        Ok(*self)
    }
}

impl<F> ThresholdProbe for F
where
    F: Fn() -> Result<ThresholdTriple, ProbeError> + Send + Sync,
{
    fn read_thresholds(&self) -> Result<ThresholdTriple, ProbeError> {
        self()
    }
}

/// Parse whitespace-separated `low pressure max`
///
/// # Errors
///
/// Returns [`ProbeError::Malformed`] unless the text holds exactly three unsigned integers.
pub fn parse_thresholds(source_name: &str, text: &str) -> Result<ThresholdTriple, ProbeError> {
    let malformed = |reason: String| ProbeError::Malformed {
        source_name: source_name.to_string(),
        reason,
    };

    let mut tiers = [0_u64; 3];
    let mut count = 0_usize;
    for field in text.split_whitespace() {
        let value = field
            .parse::<u64>()
            .map_err(|e| malformed(format!("'{field}': {e}")))?;
        if let Some(slot) = tiers.get_mut(count) {
            *slot = value;
        }
        count += 1;
    }

    if count != 3 {
        return Err(malformed(format!("expected 3 values, found {count}")));
    }
    Ok(ThresholdTriple::from_array(tiers))
}

/// Reads a sysctl-style file such as `/proc/sys/net/ipv4/tcp_mem`
///
/// Each call performs a file read, so hosts should sample it off the
/// observation path and publish into a [`SharedThresholds`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcSysProbe {
    path: PathBuf,
}

impl ProcSysProbe {
    /// Protocol-wide TCP memory table
    pub const TCP_MEM: &'static str = "/proc/sys/net/ipv4/tcp_mem";
    /// TCP send buffer limits
    pub const TCP_WMEM: &'static str = "/proc/sys/net/ipv4/tcp_wmem";
    /// TCP receive buffer limits
    pub const TCP_RMEM: &'static str = "/proc/sys/net/ipv4/tcp_rmem";

    /// Probe reading `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Probe for the protocol-wide memory table
    #[must_use]
    pub fn tcp_mem() -> Self {
        Self::new(Self::TCP_MEM)
    }

    /// Path being read
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ThresholdProbe for ProcSysProbe {
    fn read_thresholds(&self) -> Result<ThresholdTriple, ProbeError> {
        let source_name = self.path.display().to_string();
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProbeError::Unavailable {
                source_name: source_name.clone(),
            },
            _ => ProbeError::Unreadable {
                source_name: source_name.clone(),
                reason: e.to_string(),
            },
        })?;
        parse_thresholds(&source_name, &text)
    }
}

/// Threshold table published by the host and read lock-free
///
/// Tiers are stored independently; a reader racing a publish may see a mix
/// of old and new tiers, which the evaluator tolerates like any other stale read.
#[derive(Debug, Default)]
pub struct SharedThresholds {
    low: AtomicU64,
    pressure: AtomicU64,
    max: AtomicU64,
}

impl SharedThresholds {
    /// Empty table; reads report [`ProbeError::Unavailable`] until published
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with `tiers`
    #[must_use]
    pub fn with_thresholds(tiers: ThresholdTriple) -> Self {
        let table = Self::new();
        table.publish(tiers);
        table
    }

    /// Replace the table
    pub fn publish(&self, tiers: ThresholdTriple) {
        self.low.store(tiers.low, Ordering::Relaxed);
        self.pressure.store(tiers.pressure, Ordering::Relaxed);
        self.max.store(tiers.max, Ordering::Relaxed);
    }

    /// Read `probe` and publish the result
    ///
    /// # Errors
    ///
    /// Returns the probe error; the published table is left untouched.
    pub fn refresh_from(&self, probe: &dyn ThresholdProbe) -> Result<ThresholdTriple, ProbeError> {
        let tiers = probe.read_thresholds()?;
        self.publish(tiers);
        Ok(tiers)
    }
}

impl ThresholdProbe for SharedThresholds {
    fn read_thresholds(&self) -> Result<ThresholdTriple, ProbeError> {
        let tiers = ThresholdTriple::new(
            self.low.load(Ordering::Relaxed),
            self.pressure.load(Ordering::Relaxed),
            self.max.load(Ordering::Relaxed),
        );
        if tiers == ThresholdTriple::default() {
            return Err(ProbeError::Unavailable {
                source_name: "shared thresholds".to_string(),
            });
        }
        Ok(tiers)
    }
}
