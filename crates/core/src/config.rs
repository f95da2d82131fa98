//! `BufTune` Core Configuration System
//!
//! Start-of-life settings with garde validation. Accounting constants are
//! checked twice: garde for ranges, [`MemoryAccounting::new`] for the
//! size/shift relationship.

use std::env;
use std::fs;
use std::path::Path;

use garde::Validate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TunerError, TunerResult};
use crate::memory::accounting::{
    MemoryAccounting, DEFAULT_ACCOUNTING_QUANTUM, DEFAULT_ACCOUNTING_QUANTUM_SHIFT,
    DEFAULT_PAGE_SHIFT, DEFAULT_PAGE_SIZE,
};
use crate::sink::ChannelSink;

/// Environment variable naming a TOML configuration file
pub const CONFIG_PATH_ENV: &str = "BUFTUNE_CONFIG";

/// Core configuration for the buffer tuner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TunerConfig {
    /// Memory-accounting constants
    #[garde(dive)]
    pub accounting: AccountingConfig,

    /// Event delivery configuration
    #[garde(dive)]
    pub sink: SinkConfig,
}

/// Memory-accounting constants as delivered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AccountingConfig {
    /// Kernel page size in bytes
    #[garde(range(min = 1, max = 1_073_741_824))]
    pub page_size: u64,

    /// Kernel page shift
    #[garde(range(max = 30))]
    pub page_shift: u32,

    /// Socket memory accounting quantum in bytes
    #[garde(range(min = 1, max = 1_073_741_824))]
    pub accounting_quantum: u64,

    /// Socket memory accounting quantum shift
    #[garde(range(max = 30))]
    pub accounting_quantum_shift: u32,

    /// Free buffer pages reported by the host
    #[garde(skip)]
    pub free_buffer_pages: u64,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_shift: DEFAULT_PAGE_SHIFT,
            accounting_quantum: DEFAULT_ACCOUNTING_QUANTUM,
            accounting_quantum_shift: DEFAULT_ACCOUNTING_QUANTUM_SHIFT,
            free_buffer_pages: 0,
        }
    }
}

/// Event delivery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SinkConfig {
    /// Capacity of the bounded event channel
    #[garde(range(min = 1, max = 1_048_576))]
    pub channel_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

impl SinkConfig {
    /// Build a channel sink of the configured capacity
    #[must_use]
    pub fn channel(&self) -> (ChannelSink, crossbeam::channel::Receiver<crate::types::TuningEvent>) {
        ChannelSink::bounded(self.channel_capacity)
    }
}

impl TunerConfig {
    /// Parse and validate TOML
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(text: &str) -> TunerResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> TunerResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading tuner configuration");
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load from the file named by `BUFTUNE_CONFIG`, or defaults when unset
    ///
    /// # Errors
    ///
    /// Returns error if the named file cannot be loaded.
    pub fn from_env() -> TunerResult<Self> {
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(path),
            _ => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any field is out of range or the accounting constants are inconsistent.
    pub fn validate(&self) -> TunerResult<()> {
        garde::Validate::validate(self, &())
            .map_err(|e| TunerError::validation("config", format!("Validation failed: {e}")))?;

        self.memory_accounting()?;
        Ok(())
    }

    /// Immutable accounting constants for sharing across components
    ///
    /// # Errors
    ///
    /// Returns error if a size is not a power of two or its shift does not match.
    pub fn memory_accounting(&self) -> TunerResult<MemoryAccounting> {
        let accounting = &self.accounting;
        let constants = MemoryAccounting::new(
            accounting.page_size,
            accounting.page_shift,
            accounting.accounting_quantum,
            accounting.accounting_quantum_shift,
        )?;
        Ok(constants.with_free_buffer_pages(accounting.free_buffer_pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() -> TunerResult<()> {
        let config = TunerConfig::default();
        config.validate()?;
        let accounting = config.memory_accounting()?;
        assert_eq!(accounting.page().shift(), 12);
        assert_eq!(accounting.quantum().size(), 4096);
        Ok(())
    }

    #[test]
    fn test_from_toml_partial() -> TunerResult<()> {
        let config = TunerConfig::from_toml_str(
            r#"
            [accounting]
            page_size = 65536
            page_shift = 16
            free_buffer_pages = 12345
            "#,
        )?;
        assert_eq!(config.accounting.page_size, 65_536);
        assert_eq!(config.accounting.accounting_quantum, 4096);
        assert_eq!(config.sink.channel_capacity, 1024);
        assert_eq!(config.memory_accounting()?.free_buffer_pages(), 12_345);
        Ok(())
    }

    #[test]
    fn test_inconsistent_shift_rejected() {
        let result = TunerConfig::from_toml_str(
            r#"
            [accounting]
            page_size = 4096
            page_shift = 13
            "#,
        );
        assert!(matches!(result, Err(TunerError::Accounting(_))));
    }

    #[test]
    fn test_range_validation() {
        let mut config = TunerConfig::default();
        config.sink.channel_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(TunerError::Validation { .. })
        ));

        let mut config = TunerConfig::default();
        config.accounting.page_shift = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            TunerConfig::from_toml_str("accounting = 3"),
            Err(TunerError::Toml(_))
        ));
    }

    #[test]
    fn test_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[sink]\nchannel_capacity = 8")?;
        let config = TunerConfig::from_file(file.path())?;
        assert_eq!(config.sink.channel_capacity, 8);

        let (sink, receiver) = config.sink.channel();
        assert_eq!(sink.dropped(), 0);
        assert_eq!(receiver.capacity(), Some(8));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            TunerConfig::from_file("/nonexistent/buftune.toml"),
            Err(TunerError::Io(_))
        ));
    }
}
