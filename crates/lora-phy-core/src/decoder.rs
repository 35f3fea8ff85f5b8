//! Decoder pipeline: channel symbols to payload bytes
//!
//! ```text
//! symbols ── Gray ── de-interleave ── Hamming decode ──▶ nibbles
//!    │                                                     │
//!    │   parse + verify header (explicit mode)             │
//!    │   dewhiten payload + CRC                            │
//!    │   verify CRC trailer → metrics.crc_ok               │
//!    ▼                                                     ▼
//! state: Header → Payload → Done | Dropped              payload
//! ```
//!
//! Per-codeword `error`/`bad` flags aggregate into the metrics counters; a
//! `bad` codeword drops the packet with [`PhyError::Uncorrectable`]. A CRC
//! mismatch is not a drop: the bytes are returned and `metrics.crc_ok`
//! records the failure.

use tracing::debug;

use crate::coding::{binary_to_gray, Hamming};
use crate::crc::data_checksum;
use crate::encoder::{block_rdd, interleaver, CodingScratch};
use crate::header::{FrameHeader, HEADER_NIBBLES};
use crate::params::Params;
use crate::types::{Metrics, PhyError, PhyResult, Symbol};

/// Decode one block of `4 + rdd` symbols into `sf` nibbles appended at
/// `scratch.nibbles[nib_len..]`, aggregating flags into `metrics`.
fn decode_block(
    params: &Params,
    chunk: &[Symbol],
    rdd: u8,
    cw_base: usize,
    scratch: &mut CodingScratch,
    nib_len: &mut usize,
    metrics: &mut Metrics,
) -> PhyResult<()> {
    let sf = params.sf.value() as usize;
    debug_assert_eq!(chunk.len(), 4 + rdd as usize);

    for (j, &sym) in chunk.iter().enumerate() {
        scratch.symbols[j] = binary_to_gray(sym);
    }

    let il = interleaver(params, sf, rdd);
    il.deinterleave_block(&scratch.symbols[..chunk.len()], &mut scratch.codewords[..sf]);

    let hamming = Hamming::new(rdd);
    for k in 0..sf {
        let (nibble, flags) = hamming.decode(scratch.codewords[k]);
        if flags.bad {
            metrics.uncorrectable += 1;
            return Err(PhyError::Uncorrectable(cw_base + k));
        }
        if flags.error {
            metrics.corrected += 1;
        }
        scratch.nibbles[*nib_len] = nibble;
        *nib_len += 1;
    }
    Ok(())
}

/// Run the full decode pipeline into `payload_out`.
///
/// Returns the number of payload bytes produced (the CRC trailer is
/// verified and stripped).
pub(crate) fn decode_into(
    params: &Params,
    symbols: &[Symbol],
    scratch: &mut CodingScratch,
    payload_out: &mut [u8],
    metrics: &mut Metrics,
) -> PhyResult<usize> {
    let sf = params.sf.value() as usize;
    metrics.corrected = 0;
    metrics.uncorrectable = 0;
    metrics.crc_ok = false;

    let mut nib_len = 0;
    let payload_len;
    let crc_present;

    if params.explicit_header {
        let header_chunk = 4 + block_rdd(params, 0) as usize;
        if symbols.len() < header_chunk {
            return Err(PhyError::SizeMismatch {
                len: symbols.len(),
                unit: header_chunk,
            });
        }
        decode_block(
            params,
            &symbols[..header_chunk],
            block_rdd(params, 0),
            0,
            scratch,
            &mut nib_len,
            metrics,
        )?;

        let mut header_nibbles = [0u8; HEADER_NIBBLES];
        header_nibbles.copy_from_slice(&scratch.nibbles[..HEADER_NIBBLES]);
        let header = FrameHeader::from_nibbles(&header_nibbles)?;
        debug!(
            payload_len = header.payload_len,
            cr = header.cr.value(),
            crc = header.crc_enabled,
            "explicit header accepted"
        );

        payload_len = header.payload_len as usize;
        crc_present = header.crc_enabled;
        let rdd = header.cr.value();
        let chunk = 4 + rdd as usize;

        let needed_nibbles =
            HEADER_NIBBLES + 2 * (payload_len + if crc_present { 2 } else { 0 });
        let extra_blocks = needed_nibbles.saturating_sub(sf).div_ceil(sf);
        if symbols.len() < header_chunk + extra_blocks * chunk {
            return Err(PhyError::BadHeader("length field inconsistent with input"));
        }

        for b in 0..extra_blocks {
            let start = header_chunk + b * chunk;
            decode_block(
                params,
                &symbols[start..start + chunk],
                rdd,
                (b + 1) * sf,
                scratch,
                &mut nib_len,
                metrics,
            )?;
        }
    } else {
        let rdd = params.cr.value();
        let chunk = 4 + rdd as usize;
        if symbols.len() % chunk != 0 {
            return Err(PhyError::SizeMismatch {
                len: symbols.len(),
                unit: chunk,
            });
        }
        let blocks = symbols.len() / chunk;
        if blocks * sf > scratch.nibbles.len() {
            return Err(PhyError::InvalidParam(
                "symbol stream exceeds the maximum packet size",
            ));
        }
        for b in 0..blocks {
            decode_block(
                params,
                &symbols[b * chunk..(b + 1) * chunk],
                rdd,
                b * sf,
                scratch,
                &mut nib_len,
                metrics,
            )?;
        }

        crc_present = params.crc_enabled;
        if params.payload_len > 0 {
            // Implicit mode: the preconfigured length register governs.
            payload_len = params.payload_len as usize;
            if 2 * (payload_len + if crc_present { 2 } else { 0 }) > nib_len {
                return Err(PhyError::SizeMismatch {
                    len: nib_len / 2,
                    unit: payload_len + if crc_present { 2 } else { 0 },
                });
            }
        } else {
            // No length configured: everything after the blocks is data.
            // Exact only when the nibble padding did not add whole bytes.
            let total_bytes = nib_len / 2;
            payload_len = total_bytes.saturating_sub(if crc_present { 2 } else { 0 });
        }
    }

    // Reassemble bytes after the header nibbles, high nibble first.
    let data_start = if params.explicit_header { HEADER_NIBBLES } else { 0 };
    let byte_len = payload_len + if crc_present { 2 } else { 0 };
    if byte_len > scratch.bytes.len() {
        return Err(PhyError::InvalidParam(
            "symbol stream exceeds the maximum packet size",
        ));
    }
    if 2 * byte_len > nib_len.saturating_sub(data_start) {
        // Degenerate stream: shorter than the CRC trailer it claims.
        return Err(PhyError::SizeMismatch {
            len: (nib_len.saturating_sub(data_start)) / 2,
            unit: byte_len,
        });
    }
    for i in 0..byte_len {
        let hi = scratch.nibbles[data_start + 2 * i];
        let lo = scratch.nibbles[data_start + 2 * i + 1];
        scratch.bytes[i] = (hi << 4) | (lo & 0x0F);
    }

    if params.whitening_enabled {
        scratch.whitening.reset();
        scratch.whitening.process(&mut scratch.bytes[..byte_len]);
    }

    if crc_present {
        let provided =
            scratch.bytes[payload_len] as u16 | ((scratch.bytes[payload_len + 1] as u16) << 8);
        let computed = data_checksum(&scratch.bytes[..payload_len]);
        metrics.crc_ok = provided == computed;
        if !metrics.crc_ok {
            debug!(provided, computed, "payload CRC mismatch");
        }
    } else {
        metrics.crc_ok = true;
    }

    if payload_len > payload_out.len() {
        return Err(PhyError::Capacity {
            needed: payload_len,
            capacity: payload_out.len(),
        });
    }
    payload_out[..payload_len].copy_from_slice(&scratch.bytes[..payload_len]);
    Ok(payload_len)
}
