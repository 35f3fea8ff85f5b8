//! Encoder pipeline: payload bytes to channel symbols
//!
//! ```text
//! payload
//!    │  append 16-bit CRC          (if enabled)
//!    │  whiten payload + CRC       (if enabled)
//!    │  prepend header nibbles     (explicit mode, rate 4/8)
//!    ▼
//! nibbles ── Hamming ── interleave ── Gray⁻¹ ──▶ symbols
//! ```
//!
//! Nibbles are split high-first. The nibble stream is padded with zeros to a
//! whole number of `sf`-codeword blocks; in explicit mode the first block is
//! always coded at 4/8 and carries the header plus the leading payload
//! nibbles. The encoder checks the output capacity before writing anything,
//! so it never produces partial output.

use crate::coding::{gray_to_binary, Hamming, Interleaver};
use crate::crc::data_checksum;
use crate::header::{FrameHeader, HEADER_NIBBLES};
use crate::params::Params;
use crate::types::{PhyError, PhyResult, Symbol};
use crate::whitening::Whitening;

/// Longest payload the length field can describe.
pub const MAX_PAYLOAD_BYTES: usize = 255;

/// Scratch shared by the encode and decode pipelines, allocated once per
/// workspace and sized for the largest possible packet.
#[derive(Debug)]
pub(crate) struct CodingScratch {
    pub bytes: Vec<u8>,
    pub nibbles: Vec<u8>,
    pub codewords: Vec<u8>,
    pub symbols: Vec<Symbol>,
    pub whitening: Whitening,
}

impl CodingScratch {
    pub fn new(sf: usize) -> Self {
        let max_bytes = MAX_PAYLOAD_BYTES + 2; // payload + CRC trailer
        let max_nibbles = HEADER_NIBBLES + 2 * max_bytes;
        let max_blocks = (max_nibbles + sf - 1) / sf;
        Self {
            bytes: vec![0; max_bytes],
            nibbles: vec![0; max_blocks * sf],
            codewords: vec![0; sf],
            symbols: vec![0; 8],
            whitening: Whitening::new(),
        }
    }
}

/// Redundancy of block `index`: the header block is always 4/8.
pub(crate) fn block_rdd(params: &Params, index: usize) -> u8 {
    if params.explicit_header && index == 0 {
        4
    } else {
        params.cr.value()
    }
}

pub(crate) fn interleaver(params: &Params, sf: usize, rdd: u8) -> Interleaver {
    if params.interleaving_enabled {
        Interleaver::new(sf, rdd as usize)
    } else {
        Interleaver::straight(sf, rdd as usize)
    }
}

/// Run the full encode pipeline into `symbols_out`.
///
/// Returns the number of symbols produced.
pub(crate) fn encode_into(
    params: &Params,
    payload: &[u8],
    scratch: &mut CodingScratch,
    symbols_out: &mut [Symbol],
) -> PhyResult<usize> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(PhyError::InvalidParam("payload longer than 255 bytes"));
    }
    let sf = params.sf.value() as usize;

    // Byte stream: payload, then the CRC trailer (little-endian).
    let mut byte_len = payload.len();
    scratch.bytes[..byte_len].copy_from_slice(payload);
    if params.crc_enabled {
        let crc = data_checksum(payload);
        scratch.bytes[byte_len] = (crc & 0xFF) as u8;
        scratch.bytes[byte_len + 1] = (crc >> 8) as u8;
        byte_len += 2;
    }

    if params.whitening_enabled {
        scratch.whitening.reset();
        scratch.whitening.process(&mut scratch.bytes[..byte_len]);
    }

    // Nibble stream: header first (unwhitened), then data, high nibble first.
    let mut nib_len = 0;
    if params.explicit_header {
        let header = FrameHeader::new(payload.len() as u8, params.cr, params.crc_enabled);
        for nibble in header.to_nibbles() {
            scratch.nibbles[nib_len] = nibble;
            nib_len += 1;
        }
    }
    for i in 0..byte_len {
        let byte = scratch.bytes[i];
        scratch.nibbles[nib_len] = byte >> 4;
        scratch.nibbles[nib_len + 1] = byte & 0x0F;
        nib_len += 2;
    }
    while nib_len % sf != 0 {
        scratch.nibbles[nib_len] = 0;
        nib_len += 1;
    }
    let blocks = nib_len / sf;

    let mut total_symbols = 0;
    for b in 0..blocks {
        total_symbols += 4 + block_rdd(params, b) as usize;
    }
    if total_symbols > symbols_out.len() {
        return Err(PhyError::Capacity {
            needed: total_symbols,
            capacity: symbols_out.len(),
        });
    }

    let mut pos = 0;
    for b in 0..blocks {
        let rdd = block_rdd(params, b);
        let hamming = Hamming::new(rdd);
        for k in 0..sf {
            scratch.codewords[k] = hamming.encode(scratch.nibbles[b * sf + k]);
        }

        let n_sym = 4 + rdd as usize;
        let il = interleaver(params, sf, rdd);
        il.interleave_block(&scratch.codewords[..sf], &mut scratch.symbols[..n_sym]);

        for &sym in &scratch.symbols[..n_sym] {
            symbols_out[pos] = gray_to_binary(sym);
            pos += 1;
        }
    }
    debug_assert_eq!(pos, total_symbols);

    Ok(total_symbols)
}
