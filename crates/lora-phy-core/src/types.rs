//! Core types for the LoRa PHY
//!
//! This module defines the fundamental types shared by every stage of the
//! signal chain: complex I/Q samples, symbol values, the error taxonomy and
//! the per-call metrics block.
//!
//! ## Understanding I/Q Samples
//!
//! Signals are represented as complex numbers where:
//! - **I (In-phase)**: the real component, aligned with the reference carrier
//! - **Q (Quadrature)**: the imaginary component, 90° out of phase
//!
//! The core is single precision throughout; `Complex32` is the only sample
//! type that crosses the API boundary.

use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// A single I/Q sample point.
pub type IQSample = Complex32;

/// A symbol value in `[0, 2^SF)`.
///
/// Wide enough for the largest spread factor (SF12, `N = 4096`).
pub type Symbol = u16;

/// Result type for PHY operations.
pub type PhyResult<T> = Result<T, PhyError>;

/// Errors reported by the PHY core.
///
/// Size and parameter violations are returned before any output buffer is
/// mutated; channel errors are absorbed into [`Metrics`] counters unless the
/// packet has to be dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhyError {
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),

    #[error("output capacity exhausted: need {needed}, have {capacity}")]
    Capacity { needed: usize, capacity: usize },

    #[error("input length {len} is not a positive multiple of {unit}")]
    SizeMismatch { len: usize, unit: usize },

    #[error("explicit header rejected: {0}")]
    BadHeader(&'static str),

    #[error("uncorrectable codeword at index {0}")]
    Uncorrectable(usize),
}

/// Metrics of the most recently completed decode/demodulate call.
///
/// Overwritten by each call; valid until the next one. [`crate::Workspace::reset`]
/// clears the block without touching buffers or FFT plans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Payload CRC outcome of the last decode (`true` when CRC is disabled).
    pub crc_ok: bool,
    /// Carrier frequency offset estimate, in fractional FFT bins.
    pub cfo: f32,
    /// Timing offset estimate, in samples.
    pub time_offset: f32,
    /// Codewords with a detected (and, where the rate allows, corrected) error.
    pub corrected: u32,
    /// Codewords flagged uncorrectable.
    pub uncorrectable: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_default() {
        let m = Metrics::default();
        assert!(!m.crc_ok);
        assert_eq!(m.cfo, 0.0);
        assert_eq!(m.corrected, 0);
    }

    #[test]
    fn test_error_display() {
        let err = PhyError::SizeMismatch { len: 100, unit: 128 };
        assert!(err.to_string().contains("128"));
    }
}
