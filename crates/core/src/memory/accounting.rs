//! Memory Accounting - Page/Quantum Unit Conversion
//!
//! The protocol-wide memory table is expressed in kernel pages while the
//! allocated-memory counter is expressed in accounting quanta. Both units are
//! powers of two, so conversion is a shift by the difference of exponents.
//! Truncation from right shifts is accepted as-is.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::AccountingError;
use crate::types::ThresholdTriple;

/// Default kernel page size in bytes
pub const DEFAULT_PAGE_SIZE: u64 = 4096;
/// Default kernel page shift
pub const DEFAULT_PAGE_SHIFT: u32 = 12;
/// Default socket memory accounting quantum in bytes
pub const DEFAULT_ACCOUNTING_QUANTUM: u64 = 4096;
/// Default socket memory accounting quantum shift
pub const DEFAULT_ACCOUNTING_QUANTUM_SHIFT: u32 = 12;

/// Power-of-two memory unit: linear size plus its shift exponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountingUnit {
    size: u64,
    shift: u32,
}

impl AccountingUnit {
    /// Create a unit, checking that `1 << shift == size`
    ///
    /// # Errors
    ///
    /// Returns error if `size` is not a power of two or `shift` does not match it.
    pub const fn new(unit: &'static str, size: u64, shift: u32) -> Result<Self, AccountingError> {
        if !size.is_power_of_two() {
            return Err(AccountingError::NotPowerOfTwo { unit, size });
        }
        if size.trailing_zeros() != shift {
            return Err(AccountingError::ShiftMismatch { unit, size, shift });
        }
        Ok(Self { size, shift })
    }

    /// Linear size in bytes
    #[must_use]
    pub const fn size(self) -> u64 {
        self.size
    }

    /// Shift exponent
    #[must_use]
    pub const fn shift(self) -> u32 {
        self.shift
    }
}

/// Re-express `value` counted in `from` units as a count of `to` units.
///
/// Coarser target: right shift by the exponent difference (truncating).
/// Finer target: left shift by the exponent difference (saturating).
#[must_use]
pub const fn convert(value: u64, from: AccountingUnit, to: AccountingUnit) -> u64 {
    if to.shift > from.shift {
        value >> (to.shift - from.shift)
    } else if to.shift < from.shift {
        let factor = 1_u64 << (from.shift - to.shift);
        match value.checked_mul(factor) {
            Some(scaled) => scaled,
            None => u64::MAX,
        }
    } else {
        value
    }
}

/// Process-wide accounting constants, written once at startup
///
/// Shared read-only (typically behind an `Arc`) by every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryAccounting {
    page: AccountingUnit,
    quantum: AccountingUnit,
    free_buffer_pages: u64,
}

impl MemoryAccounting {
    /// Create accounting constants
    ///
    /// # Errors
    ///
    /// Returns error if either unit is not a power of two or its shift is inconsistent.
    pub const fn new(
        page_size: u64,
        page_shift: u32,
        accounting_quantum: u64,
        accounting_quantum_shift: u32,
    ) -> Result<Self, AccountingError> {
        let page = match AccountingUnit::new("page", page_size, page_shift) {
            Ok(unit) => unit,
            Err(e) => return Err(e),
        };
        let quantum =
            match AccountingUnit::new("quantum", accounting_quantum, accounting_quantum_shift) {
                Ok(unit) => unit,
                Err(e) => return Err(e),
            };
        Ok(Self {
            page,
            quantum,
            free_buffer_pages: 0,
        })
    }

    /// Attach the host-reported free buffer page count
    #[must_use]
    pub const fn with_free_buffer_pages(mut self, pages: u64) -> Self {
        self.free_buffer_pages = pages;
        self
    }

    /// Page unit
    #[must_use]
    pub const fn page(&self) -> AccountingUnit {
        self.page
    }

    /// Accounting quantum unit
    #[must_use]
    pub const fn quantum(&self) -> AccountingUnit {
        self.quantum
    }

    /// Free buffer pages reported by the host at startup
    #[must_use]
    pub const fn free_buffer_pages(&self) -> u64 {
        self.free_buffer_pages
    }

    /// Relationship of the quantum to the page
    #[must_use]
    pub fn quantum_vs_page(&self) -> Ordering {
        self.quantum.shift.cmp(&self.page.shift)
    }

    /// Page count to quantum count
    #[must_use]
    pub const fn pages_to_quanta(&self, pages: u64) -> u64 {
        convert(pages, self.page, self.quantum)
    }

    /// Quantum count to page count
    #[must_use]
    pub const fn quanta_to_pages(&self, quanta: u64) -> u64 {
        convert(quanta, self.quantum, self.page)
    }

    /// Convert every tier of a page-unit table to quantum units, independently
    #[must_use]
    pub fn thresholds_to_quanta(&self, pages: ThresholdTriple) -> ThresholdTriple {
        pages.map(|tier| self.pages_to_quanta(tier))
    }
}

impl Default for MemoryAccounting {
    fn default() -> Self {
        Self {
            page: AccountingUnit {
                size: DEFAULT_PAGE_SIZE,
                shift: DEFAULT_PAGE_SHIFT,
            },
            quantum: AccountingUnit {
                size: DEFAULT_ACCOUNTING_QUANTUM,
                shift: DEFAULT_ACCOUNTING_QUANTUM_SHIFT,
            },
            free_buffer_pages: 0,
        }
    }
}
