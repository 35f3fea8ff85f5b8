//! Workspace: the caller-owned handle binding the whole PHY together
//!
//! A [`Workspace`] owns every buffer the signal chain may touch at steady
//! state: the FFT plans and their scratch, the dechirp reference, the
//! per-symbol staging buffers, the coding scratch and the metrics block.
//! Everything is allocated once in [`Workspace::new`]; `encode`, `modulate`,
//! `demodulate` and `decode` never request memory afterwards.
//!
//! The workspace is the only mutable state of the core. It is not shared:
//! each concurrent stream owns its own workspace, and calls on one workspace
//! are strictly serialized through `&mut self`.

use tracing::debug;

use crate::chirp::ChirpGenerator;
use crate::decoder::decode_into;
use crate::encoder::{encode_into, CodingScratch, MAX_PAYLOAD_BYTES};
use crate::fft::FftProcessor;
use crate::header::HEADER_NIBBLES;
use crate::params::{Params, Window};
use crate::sync::{self, OffsetEstimate};
use crate::types::{IQSample, Metrics, PhyResult, Symbol};

/// Largest number of symbols a single packet can occupy under `params`.
pub fn max_packet_symbols(params: &Params) -> usize {
    let sf = params.sf.value() as usize;
    let max_nibbles = HEADER_NIBBLES + 2 * (MAX_PAYLOAD_BYTES + 2);
    let max_blocks = (max_nibbles + sf - 1) / sf;
    params.frame_overhead_symbols() + max_blocks * 8
}

/// Preallocated state for one processing stream.
pub struct Workspace {
    pub(crate) params: Params,
    pub(crate) chirp_gen: ChirpGenerator,
    pub(crate) fft: FftProcessor,
    /// Dechirped symbol staging, `N` bins; holds the spectrum after detect.
    pub(crate) fft_buf: Vec<IQSample>,
    /// Full-rate symbol window staging (`N * osr`), zero-filled at edges
    /// when timing compensation walks off the input.
    pub(crate) dechirp_scratch: Vec<IQSample>,
    /// Window coefficients, present only when a window is configured.
    pub(crate) window: Option<Vec<f32>>,
    pub(crate) coding: CodingScratch,
    /// Symbol staging for the combined transmit/receive helpers.
    pub(crate) symbol_scratch: Vec<Symbol>,
    pub(crate) metrics: Metrics,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("params", &self.params)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl Workspace {
    /// Validate `params`, build the FFT plans and allocate every buffer.
    ///
    /// This is the only allocating entry point of the core.
    pub fn new(params: Params) -> PhyResult<Self> {
        params.validate()?;

        let n = params.chips_per_symbol();
        let chirp_gen = ChirpGenerator::new(&params);
        let fft = FftProcessor::new(n);
        let window = match params.window {
            Window::None => None,
            Window::Hann => Some(
                (0..n)
                    .map(|i| {
                        0.5 * (1.0
                            - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos())
                    })
                    .collect(),
            ),
        };

        debug!(sf = params.sf.value(), cr = params.cr.value(), osr = params.osr, "workspace initialized");

        Ok(Self {
            chirp_gen,
            fft,
            fft_buf: vec![IQSample::default(); n],
            dechirp_scratch: vec![IQSample::default(); params.samples_per_symbol()],
            window,
            coding: CodingScratch::new(params.sf.value() as usize),
            symbol_scratch: vec![0; max_packet_symbols(&params)],
            metrics: Metrics::default(),
            params,
        })
    }

    /// Clear the metrics block; plans and buffers survive.
    pub fn reset(&mut self) {
        self.metrics = Metrics::default();
    }

    /// The parameter snapshot this workspace was built from.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Metrics of the most recently completed call (non-owning view).
    pub fn last_metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Encode payload bytes into channel symbols.
    ///
    /// Returns the number of symbols written to `symbols_out`.
    pub fn encode(&mut self, payload: &[u8], symbols_out: &mut [Symbol]) -> PhyResult<usize> {
        encode_into(&self.params, payload, &mut self.coding, symbols_out)
    }

    /// Decode channel symbols back into payload bytes.
    ///
    /// Returns the number of payload bytes written; the CRC trailer is
    /// verified into [`Metrics::crc_ok`] and stripped.
    pub fn decode(&mut self, symbols: &[Symbol], payload_out: &mut [u8]) -> PhyResult<usize> {
        decode_into(
            &self.params,
            symbols,
            &mut self.coding,
            payload_out,
            &mut self.metrics,
        )
    }

    /// Estimate carrier-frequency and timing offsets from the leading
    /// upchirps of `iq` and record them in the metrics.
    pub fn estimate_offsets(&mut self, iq: &[IQSample]) {
        let n = self.params.chips_per_symbol();
        let est = sync::estimate(
            iq,
            n,
            self.params.osr,
            self.chirp_gen.dechirp_reference(),
            self.window.as_deref(),
            &mut self.fft,
            &mut self.fft_buf,
        );
        self.metrics.cfo = est.cfo;
        self.metrics.time_offset = est.time_offset;
    }

    /// Apply the recorded offsets to `iq` in place: CFO rotation followed by
    /// the rounded timing shift with zero fill at the exposed end.
    pub fn compensate_offsets(&mut self, iq: &mut [IQSample]) {
        sync::compensate(
            iq,
            self.params.chips_per_symbol(),
            self.params.osr,
            OffsetEstimate {
                cfo: self.metrics.cfo,
                time_offset: self.metrics.time_offset,
            },
        );
    }

    /// Encode and modulate in one call, staging symbols internally.
    ///
    /// Returns the number of IQ samples written.
    pub fn transmit(&mut self, payload: &[u8], iq_out: &mut [IQSample]) -> PhyResult<usize> {
        let n_symbols = encode_into(
            &self.params,
            payload,
            &mut self.coding,
            &mut self.symbol_scratch,
        )?;
        crate::modulation::modulate_into(
            &self.params,
            &self.chirp_gen,
            &self.symbol_scratch[..n_symbols],
            iq_out,
        )
    }

    /// Demodulate and decode in one call, staging symbols internally.
    ///
    /// Returns the number of payload bytes written.
    pub fn receive(&mut self, iq: &[IQSample], payload_out: &mut [u8]) -> PhyResult<usize> {
        // Detach the staging buffer so demodulate can borrow the rest of the
        // workspace; moving a Vec does not touch its allocation.
        let mut staged = std::mem::take(&mut self.symbol_scratch);
        let demodulated = self.demodulate(iq, &mut staged);
        self.symbol_scratch = staged;
        let n_symbols = demodulated?;

        decode_into(
            &self.params,
            &self.symbol_scratch[..n_symbols],
            &mut self.coding,
            payload_out,
            &mut self.metrics,
        )
    }
}
