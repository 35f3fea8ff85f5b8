//! Data Whitening
//!
//! Whitening (scrambling) removes long runs of identical bits from the
//! payload, giving the transmitted signal DC balance and a flat spectrum.
//!
//! ## How It Works
//!
//! A 9-bit linear feedback shift register generates a fixed pseudo-random
//! byte sequence that is XORed with the data:
//!
//! ```text
//! Data:      1 0 1 1 0 0 1 0
//! Sequence:  1 1 0 1 0 1 1 0   (from LFSR)
//! XOR:       0 1 1 0 0 1 0 0   (transmitted)
//! ```
//!
//! XOR is its own inverse, so the receiver runs the identical generator and
//! applies it again. The seed (`0x01FF`) and feedback taps (bit 0 XOR bit 5
//! of the low byte) are fixed by the reference radio application note; they
//! are part of the bit-exact contract.

use serde::{Deserialize, Serialize};

/// LFSR-based whitening/de-whitening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Whitening {
    key_msb: u8,
    key_lsb: u8,
}

impl Default for Whitening {
    fn default() -> Self {
        Self::new()
    }
}

impl Whitening {
    /// Initial LFSR state: ninth bit set, low byte all ones.
    const SEED_MSB: u8 = 0x01;
    const SEED_LSB: u8 = 0xFF;

    pub fn new() -> Self {
        Self {
            key_msb: Self::SEED_MSB,
            key_lsb: Self::SEED_LSB,
        }
    }

    /// Reset the generator to the seed state.
    pub fn reset(&mut self) {
        self.key_msb = Self::SEED_MSB;
        self.key_lsb = Self::SEED_LSB;
    }

    /// Whiten (or de-whiten) a buffer in place.
    ///
    /// The same call performs both directions; callers reset between packets.
    pub fn process(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= self.key_lsb;
            // 8-bit advance of the 9-bit register between bytes.
            for _ in 0..8 {
                let msb_prev = self.key_msb;
                self.key_msb = (self.key_lsb & 1) ^ ((self.key_lsb >> 5) & 1);
                self.key_lsb = (self.key_lsb >> 1) | (msb_prev << 7);
            }
        }
    }
}
