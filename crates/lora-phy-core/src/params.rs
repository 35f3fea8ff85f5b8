//! LoRa Parameters and Configuration
//!
//! This module defines the configurable parameters for the PHY, including
//! spreading factor, bandwidth and coding rate.
//!
//! ## Understanding LoRa Parameters
//!
//! ### Spreading Factor (SF)
//!
//! The spreading factor determines how many chips (sub-symbols) encode each
//! symbol. Higher SF values provide better sensitivity and longer range at a
//! slower data rate.
//!
//! | SF | Chips/Symbol | Bits/Symbol |
//! |----|--------------|-------------|
//! | 7  | 128          | 7           |
//! | 8  | 256          | 8           |
//! | 9  | 512          | 9           |
//! | 10 | 1024         | 10          |
//! | 11 | 2048         | 11          |
//! | 12 | 4096         | 12          |
//!
//! ### Bandwidth (BW)
//!
//! - 125 kHz: standard, best sensitivity
//! - 250 kHz: faster, moderate sensitivity
//! - 500 kHz: fastest, lowest sensitivity
//!
//! ### Coding Rate (CR)
//!
//! Forward error correction adds redundancy:
//! - CR 4/5: one parity bit per nibble, detection only
//! - CR 4/6: two parity bits, detection only
//! - CR 4/7: Hamming(7,4), single-error correction
//! - CR 4/8: Hamming(8,4), single-error correction plus double-error detection

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{PhyError, PhyResult};

/// Spreading factor for LoRa modulation.
///
/// Determines the number of chips per symbol (`2^SF`) and the number of bits
/// encoded per symbol (`SF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpreadingFactor {
    SF7 = 7,
    SF8 = 8,
    SF9 = 9,
    SF10 = 10,
    SF11 = 11,
    SF12 = 12,
}

impl SpreadingFactor {
    /// Create a spreading factor from a raw value.
    pub fn from_u8(value: u8) -> PhyResult<Self> {
        match value {
            7 => Ok(Self::SF7),
            8 => Ok(Self::SF8),
            9 => Ok(Self::SF9),
            10 => Ok(Self::SF10),
            11 => Ok(Self::SF11),
            12 => Ok(Self::SF12),
            _ => Err(PhyError::InvalidParam("spreading factor must be 7..=12")),
        }
    }

    /// Get the raw value.
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Number of chips per symbol (`2^SF`).
    pub fn chips_per_symbol(&self) -> usize {
        1 << self.value()
    }

    /// Number of bits encoded per symbol.
    pub fn bits_per_symbol(&self) -> u8 {
        self.value()
    }
}

impl fmt::Display for SpreadingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SF{}", self.value())
    }
}

impl Default for SpreadingFactor {
    fn default() -> Self {
        Self::SF7
    }
}

/// Coding rate for forward error correction.
///
/// The rate `4/(4+CR)` determines the ratio of data bits to total bits per
/// codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodingRate {
    /// 4/5 - one parity bit per 4 data bits
    CR4_5 = 1,
    /// 4/6 - two parity bits per 4 data bits
    CR4_6 = 2,
    /// 4/7 - Hamming(7,4)
    CR4_7 = 3,
    /// 4/8 - Hamming(8,4) extended
    CR4_8 = 4,
}

impl CodingRate {
    pub fn from_u8(value: u8) -> PhyResult<Self> {
        match value {
            1 => Ok(Self::CR4_5),
            2 => Ok(Self::CR4_6),
            3 => Ok(Self::CR4_7),
            4 => Ok(Self::CR4_8),
            _ => Err(PhyError::InvalidParam("coding rate index must be 1..=4")),
        }
    }

    /// Number of redundancy bits per codeword.
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Codeword width: number of output bits per 4 input bits.
    pub fn output_bits(&self) -> u8 {
        4 + self.value()
    }

    /// The coding rate as a fraction.
    pub fn rate(&self) -> f64 {
        4.0 / (4.0 + self.value() as f64)
    }
}

impl fmt::Display for CodingRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "4/{}", 4 + self.value())
    }
}

impl Default for CodingRate {
    fn default() -> Self {
        Self::CR4_5
    }
}

/// Bandwidth tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bandwidth {
    /// 125 kHz - standard bandwidth, best sensitivity
    Bw125kHz = 125_000,
    /// 250 kHz
    Bw250kHz = 250_000,
    /// 500 kHz
    Bw500kHz = 500_000,
}

impl Bandwidth {
    pub fn from_hz(hz: u32) -> PhyResult<Self> {
        match hz {
            125_000 => Ok(Self::Bw125kHz),
            250_000 => Ok(Self::Bw250kHz),
            500_000 => Ok(Self::Bw500kHz),
            _ => Err(PhyError::InvalidParam("bandwidth must be 125k, 250k or 500k")),
        }
    }

    /// Bandwidth in Hz.
    pub fn hz(&self) -> f64 {
        *self as u32 as f64
    }

    /// Scale factor relative to the widest (500 kHz) channel.
    ///
    /// Used when synthesizing a narrow chirp into a stream running at the
    /// common 500 kHz-referenced sample rate. The packet pipelines run in
    /// normalized baseband (scale 1) where the sample rate is `bw * osr`.
    pub fn scale(&self) -> f32 {
        (self.hz() / Bandwidth::Bw500kHz.hz()) as f32
    }
}

impl Default for Bandwidth {
    fn default() -> Self {
        Self::Bw125kHz
    }
}

/// Optional pre-FFT window applied to dechirped samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    None,
    Hann,
}

impl Default for Window {
    fn default() -> Self {
        Self::None
    }
}

/// Complete PHY parameter set.
///
/// Immutable once a [`crate::Workspace`] has been built from it; the
/// workspace keeps its own snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Spreading factor (7-12).
    pub sf: SpreadingFactor,
    /// Bandwidth tag.
    pub bw: Bandwidth,
    /// Coding rate for the payload.
    pub cr: CodingRate,
    /// Oversampling ratio (1-256).
    pub osr: usize,
    /// Emit/expect the explicit on-air header.
    pub explicit_header: bool,
    /// Append/verify the 16-bit payload CRC.
    pub crc_enabled: bool,
    /// Whiten payload bytes with the LFSR sequence.
    pub whitening_enabled: bool,
    /// Diagonally interleave codewords across symbols.
    pub interleaving_enabled: bool,
    /// Preamble length in upchirps (0 disables the whole frame overhead).
    pub preamble_len: usize,
    /// Preconfigured payload length for implicit-header receive, the way the
    /// radio's payload-length register works; 0 derives the length from the
    /// stream (only exact when no block padding is in play).
    pub payload_len: u8,
    /// Sync word; its two nibbles map to the two on-air sync symbols.
    pub sync_word: u8,
    /// Pre-FFT window.
    pub window: Window,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            sf: SpreadingFactor::default(),
            bw: Bandwidth::default(),
            cr: CodingRate::default(),
            osr: 1,
            explicit_header: false,
            crc_enabled: true,
            whitening_enabled: true,
            interleaving_enabled: true,
            preamble_len: 8,
            payload_len: 0,
            sync_word: 0x12,
            window: Window::None,
        }
    }
}

impl Params {
    /// Create a new builder.
    pub fn builder() -> ParamsBuilder {
        ParamsBuilder::default()
    }

    /// Validate the parameter ranges of the PHY contract.
    pub fn validate(&self) -> PhyResult<()> {
        if !(1..=256).contains(&self.osr) {
            return Err(PhyError::InvalidParam("oversampling ratio must be 1..=256"));
        }
        if self.explicit_header && self.preamble_len == 1 {
            // A framed packet needs at least two preamble symbols for the
            // offset estimator to lock; zero disables framing entirely.
            return Err(PhyError::InvalidParam(
                "explicit header requires preamble_len == 0 or >= 2",
            ));
        }
        Ok(())
    }

    /// Number of chips per symbol (`N = 2^SF`).
    pub fn chips_per_symbol(&self) -> usize {
        self.sf.chips_per_symbol()
    }

    /// Number of samples per symbol (`N * osr`).
    pub fn samples_per_symbol(&self) -> usize {
        self.chips_per_symbol() * self.osr
    }

    /// Sample rate of the normalized baseband in Hz (`bw * osr`).
    pub fn sample_rate(&self) -> f64 {
        self.bw.hz() * self.osr as f64
    }

    /// Symbol duration in seconds.
    pub fn symbol_duration(&self) -> f64 {
        self.chips_per_symbol() as f64 / self.bw.hz()
    }

    /// The two on-air sync symbols derived from the sync word nibbles.
    pub fn sync_symbols(&self) -> [u16; 2] {
        [
            ((self.sync_word >> 4) as u16) << 3,
            ((self.sync_word & 0x0F) as u16) << 3,
        ]
    }

    /// Frame overhead in symbols: preamble, two sync symbols, two downchirps.
    ///
    /// Zero when the preamble is disabled.
    pub fn frame_overhead_symbols(&self) -> usize {
        if self.preamble_len == 0 {
            0
        } else {
            self.preamble_len + 4
        }
    }
}

/// Builder for [`Params`].
///
/// Out-of-range inputs surface from [`ParamsBuilder::build`], so a workspace
/// can never be constructed over an invalid configuration.
#[derive(Debug, Default)]
pub struct ParamsBuilder {
    params: Params,
    error: Option<PhyError>,
}

impl ParamsBuilder {
    pub fn spreading_factor(mut self, sf: u8) -> Self {
        match SpreadingFactor::from_u8(sf) {
            Ok(v) => self.params.sf = v,
            Err(e) => self.error = Some(e),
        }
        self
    }

    pub fn bandwidth(mut self, bw_hz: u32) -> Self {
        match Bandwidth::from_hz(bw_hz) {
            Ok(v) => self.params.bw = v,
            Err(e) => self.error = Some(e),
        }
        self
    }

    pub fn coding_rate(mut self, cr: u8) -> Self {
        match CodingRate::from_u8(cr) {
            Ok(v) => self.params.cr = v,
            Err(e) => self.error = Some(e),
        }
        self
    }

    pub fn oversample(mut self, osr: usize) -> Self {
        self.params.osr = osr;
        self
    }

    pub fn explicit_header(mut self, enabled: bool) -> Self {
        self.params.explicit_header = enabled;
        self
    }

    pub fn crc_enabled(mut self, enabled: bool) -> Self {
        self.params.crc_enabled = enabled;
        self
    }

    pub fn whitening_enabled(mut self, enabled: bool) -> Self {
        self.params.whitening_enabled = enabled;
        self
    }

    pub fn interleaving_enabled(mut self, enabled: bool) -> Self {
        self.params.interleaving_enabled = enabled;
        self
    }

    pub fn preamble_len(mut self, len: usize) -> Self {
        self.params.preamble_len = len;
        self
    }

    pub fn payload_len(mut self, len: u8) -> Self {
        self.params.payload_len = len;
        self
    }

    pub fn sync_word(mut self, word: u8) -> Self {
        self.params.sync_word = word;
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.params.window = window;
        self
    }

    pub fn build(self) -> PhyResult<Params> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.params.validate()?;
        Ok(self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chips_per_symbol() {
        assert_eq!(SpreadingFactor::SF7.chips_per_symbol(), 128);
        assert_eq!(SpreadingFactor::SF8.chips_per_symbol(), 256);
        assert_eq!(SpreadingFactor::SF12.chips_per_symbol(), 4096);
    }

    #[test]
    fn test_sf_range() {
        assert!(SpreadingFactor::from_u8(6).is_err());
        assert!(SpreadingFactor::from_u8(13).is_err());
        assert!(SpreadingFactor::from_u8(7).is_ok());
    }

    #[test]
    fn test_osr_range() {
        let err = Params::builder().oversample(0).build();
        assert!(matches!(err, Err(PhyError::InvalidParam(_))));
        let err = Params::builder().oversample(257).build();
        assert!(matches!(err, Err(PhyError::InvalidParam(_))));
        assert!(Params::builder().oversample(256).build().is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_cr() {
        let err = Params::builder().coding_rate(5).build();
        assert!(matches!(err, Err(PhyError::InvalidParam(_))));
    }

    #[test]
    fn test_symbol_duration() {
        let params = Params::builder()
            .spreading_factor(7)
            .bandwidth(125_000)
            .build()
            .unwrap();
        // SF7 at 125 kHz: 128 chips / 125000 Hz = 1.024 ms
        assert!((params.symbol_duration() - 0.001024).abs() < 1e-9);
    }

    #[test]
    fn test_sync_symbols() {
        let params = Params::builder().sync_word(0x12).build().unwrap();
        assert_eq!(params.sync_symbols(), [8, 16]);
    }

    #[test]
    fn test_bandwidth_scale() {
        assert_eq!(Bandwidth::Bw500kHz.scale(), 1.0);
        assert_eq!(Bandwidth::Bw250kHz.scale(), 0.5);
        assert_eq!(Bandwidth::Bw125kHz.scale(), 0.25);
    }

    #[test]
    fn test_frame_overhead() {
        let p = Params::builder().preamble_len(8).build().unwrap();
        assert_eq!(p.frame_overhead_symbols(), 12);
        let p = Params::builder().preamble_len(0).build().unwrap();
        assert_eq!(p.frame_overhead_symbols(), 0);
    }
}
