//! Modulator
//!
//! Walks a symbol array and synthesizes the complete on-air frame:
//!
//! ```text
//! ┌──────────┬───────────┬────────────┬─────────────────┐
//! │ preamble │ sync word │ downchirps │ payload symbols │
//! │ upchirps │ (2 sym)   │ (2 sym)    │                 │
//! └──────────┴───────────┴────────────┴─────────────────┘
//! ```
//!
//! With a zero preamble length the frame overhead is omitted entirely and
//! the output is exactly `symbols.len() * N * osr` samples, which is what
//! the `demodulate(modulate(x)) == x` identity is stated over.
//!
//! One phase accumulator threads through every chirp call, so the frame is
//! phase-continuous from the first preamble sample to the last payload
//! sample.

use crate::chirp::ChirpGenerator;
use crate::params::Params;
use crate::types::{IQSample, PhyError, PhyResult, Symbol};
use crate::workspace::Workspace;

/// Output amplitude of generated chirps.
const AMPLITUDE: f32 = 1.0;

impl Workspace {
    /// Modulate `symbols` into `iq_out`, prefixing the preamble, sync word
    /// and start-frame delimiter when the preamble is enabled.
    ///
    /// Returns the number of samples written, always
    /// `(overhead + symbols.len()) * N * osr`.
    pub fn modulate(&mut self, symbols: &[Symbol], iq_out: &mut [IQSample]) -> PhyResult<usize> {
        modulate_into(&self.params, &self.chirp_gen, symbols, iq_out)
    }
}

/// Modulate `symbols` into `iq_out`, prefixing the frame overhead when the
/// preamble is enabled.
///
/// Returns the number of samples written.
pub(crate) fn modulate_into(
    params: &Params,
    gen: &ChirpGenerator,
    symbols: &[Symbol],
    iq_out: &mut [IQSample],
) -> PhyResult<usize> {
    let sym_len = params.samples_per_symbol();
    let overhead = params.frame_overhead_symbols();
    let total = (overhead + symbols.len()) * sym_len;
    if total > iq_out.len() {
        return Err(PhyError::Capacity {
            needed: total,
            capacity: iq_out.len(),
        });
    }

    let mut phase = 0.0f32;
    let mut pos = 0usize;

    if params.preamble_len > 0 {
        for _ in 0..params.preamble_len {
            gen.write_base_chirp(&mut iq_out[pos..pos + sym_len], false, AMPLITUDE, &mut phase);
            pos += sym_len;
        }
        for sync in params.sync_symbols() {
            gen.write_symbol_chirp(&mut iq_out[pos..pos + sym_len], sync, AMPLITUDE, &mut phase);
            pos += sym_len;
        }
        // Start-frame delimiter.
        for _ in 0..2 {
            gen.write_base_chirp(&mut iq_out[pos..pos + sym_len], true, AMPLITUDE, &mut phase);
            pos += sym_len;
        }
    }

    for &symbol in symbols {
        gen.write_symbol_chirp(&mut iq_out[pos..pos + sym_len], symbol, AMPLITUDE, &mut phase);
        pos += sym_len;
    }

    debug_assert_eq!(pos, total);
    Ok(total)
}
