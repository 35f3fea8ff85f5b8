//! Demodulator
//!
//! Consumes a symbol-aligned sample stream and emits one bin decision per
//! payload symbol:
//!
//! ```text
//! I/Q ──▶ offset estimate (first two preamble upchirps)
//!     ──▶ per symbol: stage window ▸ CFO rotate ▸ dechirp ▸ FFT ▸ argmax
//! ```
//!
//! The receive walk is `Idle → Preamble-sync → Payload`: with a preamble
//! configured, the leading upchirps feed the offset estimator and the
//! preamble, sync word and delimiter symbols are then skipped by count;
//! with a zero preamble every symbol is payload and no estimation runs
//! (data symbols would bias the estimate by their own bin value).
//!
//! Timing compensation offsets the per-symbol window into the stream,
//! zero-filling where the shifted window leaves the input. CFO compensation
//! is folded into the dechirp multiply at chip granularity.

use std::f32::consts::PI;

use tracing::trace;

use crate::detector::detect;
use crate::sync::{self, OffsetEstimate};
use crate::types::{IQSample, PhyError, PhyResult, Symbol};
use crate::workspace::Workspace;

impl Workspace {
    /// Demodulate `iq` into bin decisions.
    ///
    /// The input length must be a positive multiple of `N * osr`. Returns
    /// the number of payload symbols written to `symbols_out` and records
    /// the offset estimates in the metrics.
    pub fn demodulate(&mut self, iq: &[IQSample], symbols_out: &mut [Symbol]) -> PhyResult<usize> {
        let n = self.params.chips_per_symbol();
        let osr = self.params.osr;
        let sym_len = n * osr;

        if iq.is_empty() || iq.len() % sym_len != 0 {
            return Err(PhyError::SizeMismatch {
                len: iq.len(),
                unit: sym_len,
            });
        }
        let num_symbols = iq.len() / sym_len;
        let overhead = self.params.frame_overhead_symbols();
        if num_symbols < overhead {
            return Err(PhyError::SizeMismatch {
                len: num_symbols,
                unit: overhead,
            });
        }
        let data_symbols = num_symbols - overhead;
        if data_symbols > symbols_out.len() {
            return Err(PhyError::Capacity {
                needed: data_symbols,
                capacity: symbols_out.len(),
            });
        }

        // Preamble-sync: only genuine preamble upchirps feed the estimator.
        let est = if self.params.preamble_len >= 1 {
            let est_len = self.params.preamble_len.min(2) * sym_len;
            sync::estimate(
                &iq[..est_len],
                n,
                osr,
                self.chirp_gen.dechirp_reference(),
                self.window.as_deref(),
                &mut self.fft,
                &mut self.fft_buf,
            )
        } else {
            OffsetEstimate::default()
        };
        self.metrics.cfo = est.cfo;
        self.metrics.time_offset = est.time_offset;
        trace!(cfo = est.cfo, time_offset = est.time_offset, "preamble sync");

        let t_off = est.time_offset.round() as isize;
        let rate = -2.0 * PI * est.cfo / n as f32;

        for s in 0..data_symbols {
            let sym_index = overhead + s;

            // Stage the (timing-shifted) symbol window, zero-filling the
            // exposed end.
            let base = (sym_index * sym_len) as isize + t_off;
            for (i, slot) in self.dechirp_scratch.iter_mut().enumerate() {
                let src = base + i as isize;
                *slot = if src >= 0 && (src as usize) < iq.len() {
                    iq[src as usize]
                } else {
                    IQSample::default()
                };
            }

            // Dechirp with the CFO rotation folded in at chip granularity.
            let reference = self.chirp_gen.dechirp_reference();
            match self.window.as_deref() {
                Some(win) => {
                    for i in 0..n {
                        let chip = (sym_index * n + i) as f32;
                        let rot = IQSample::from_polar(1.0, rate * chip);
                        self.fft_buf[i] =
                            self.dechirp_scratch[i * osr] * reference[i] * rot * win[i];
                    }
                }
                None => {
                    for i in 0..n {
                        let chip = (sym_index * n + i) as f32;
                        let rot = IQSample::from_polar(1.0, rate * chip);
                        self.fft_buf[i] = self.dechirp_scratch[i * osr] * reference[i] * rot;
                    }
                }
            }

            let det = detect(&mut self.fft, &mut self.fft_buf);
            symbols_out[s] = det.idx as Symbol;
        }

        Ok(data_symbols)
    }
}
