//! Pipeline stage capture
//!
//! For regression and interop work the core can run one packet through the
//! full chain and record every intermediate stage under its reference name:
//!
//! | stage             | contents                       | format            |
//! |-------------------|--------------------------------|-------------------|
//! | `payload`         | raw input bytes                | binary            |
//! | `pre_interleave`  | codewords                      | one decimal/line  |
//! | `post_interleave` | channel symbols                | one decimal/line  |
//! | `iq_samples`      | modulated baseband             | `"re,im"` lines   |
//! | `demod_symbols`   | demodulated bin decisions      | one decimal/line  |
//! | `deinterleave`    | received codewords             | one decimal/line  |
//! | `decoded`         | decoded payload bytes          | binary            |
//!
//! This stage set is the bit-exact interop surface; the file formats match
//! the reference dump tool. Capture runs outside the zero-allocation
//! contract (it builds its own workspace), so it lives beside the hot path
//! rather than inside it.

use std::io::{self, Write};

use crate::coding::{binary_to_gray, gray_to_binary, Hamming};
use crate::crc::data_checksum;
use crate::encoder::interleaver;
use crate::params::Params;
use crate::types::{IQSample, PhyError, PhyResult, Symbol};
use crate::whitening::Whitening;
use crate::workspace::Workspace;

/// One named stage of the capture set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Payload,
    PreInterleave,
    PostInterleave,
    IqSamples,
    DemodSymbols,
    Deinterleave,
    Decoded,
}

impl Stage {
    /// The reference artifact file name for this stage.
    pub fn file_name(&self) -> &'static str {
        match self {
            Stage::Payload => "payload.bin",
            Stage::PreInterleave => "pre_interleave.csv",
            Stage::PostInterleave => "post_interleave.csv",
            Stage::IqSamples => "iq_samples.csv",
            Stage::DemodSymbols => "demod_symbols.csv",
            Stage::Deinterleave => "deinterleave.csv",
            Stage::Decoded => "decoded.bin",
        }
    }
}

/// Every intermediate stage of one packet's TX/RX walk.
#[derive(Debug, Clone, Default)]
pub struct VectorSet {
    pub payload: Vec<u8>,
    pub pre_interleave: Vec<u8>,
    pub post_interleave: Vec<Symbol>,
    pub iq_samples: Vec<IQSample>,
    pub demod_symbols: Vec<Symbol>,
    pub deinterleave: Vec<u8>,
    pub decoded: Vec<u8>,
}

impl VectorSet {
    /// Run `payload` through the pipeline under `params` and record every
    /// stage.
    ///
    /// The capture surface is the headerless pipeline, as in the reference
    /// dump tool; explicit-header configurations are rejected.
    pub fn capture(params: &Params, payload: &[u8]) -> PhyResult<Self> {
        if params.explicit_header {
            return Err(PhyError::InvalidParam(
                "stage capture uses the headerless pipeline",
            ));
        }
        let sf = params.sf.value() as usize;
        let rdd = params.cr.value();

        // Byte stream exactly as the encoder assembles it.
        let mut bytes = payload.to_vec();
        if params.crc_enabled {
            let crc = data_checksum(payload);
            bytes.push((crc & 0xFF) as u8);
            bytes.push((crc >> 8) as u8);
        }
        if params.whitening_enabled {
            Whitening::new().process(&mut bytes);
        }

        let mut nibbles = Vec::with_capacity(2 * bytes.len() + sf);
        for &byte in &bytes {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0F);
        }
        while nibbles.len() % sf != 0 {
            nibbles.push(0);
        }

        let hamming = Hamming::new(rdd);
        let pre_interleave: Vec<u8> = nibbles.iter().map(|&n| hamming.encode(n)).collect();

        let il = interleaver(params, sf, rdd);
        let mut post_interleave = Vec::with_capacity((pre_interleave.len() / sf) * (4 + rdd as usize));
        let mut block_symbols = vec![0u16; 4 + rdd as usize];
        for block in pre_interleave.chunks(sf) {
            il.interleave_block(block, &mut block_symbols);
            post_interleave.extend(block_symbols.iter().map(|&s| gray_to_binary(s)));
        }

        // Through the air and back.
        let mut ws = Workspace::new(params.clone())?;
        let sym_len = params.samples_per_symbol();
        let total = (params.frame_overhead_symbols() + post_interleave.len()) * sym_len;
        let mut iq_samples = vec![IQSample::default(); total];
        crate::modulation::modulate_into(
            params,
            &ws.chirp_gen,
            &post_interleave,
            &mut iq_samples,
        )?;

        let mut demod_symbols = vec![0u16; post_interleave.len()];
        let produced = ws.demodulate(&iq_samples, &mut demod_symbols)?;
        demod_symbols.truncate(produced);

        // Receive-side coding stages.
        let mut deinterleave = vec![0u8; (demod_symbols.len() / (4 + rdd as usize)) * sf];
        let mut gray_block = vec![0u16; 4 + rdd as usize];
        for (b, block) in demod_symbols.chunks(4 + rdd as usize).enumerate() {
            for (j, &s) in block.iter().enumerate() {
                gray_block[j] = binary_to_gray(s);
            }
            il.deinterleave_block(&gray_block, &mut deinterleave[b * sf..(b + 1) * sf]);
        }

        let mut rx_params = params.clone();
        rx_params.payload_len = payload.len() as u8;
        let mut rx = Workspace::new(rx_params)?;
        let mut decoded = vec![0u8; payload.len().max(1)];
        let produced = rx.decode(&demod_symbols, &mut decoded)?;
        decoded.truncate(produced);

        Ok(Self {
            payload: payload.to_vec(),
            pre_interleave,
            post_interleave,
            iq_samples,
            demod_symbols,
            deinterleave,
            decoded,
        })
    }

    /// Write one stage in its reference format.
    pub fn write_stage<W: Write>(&self, stage: Stage, mut out: W) -> io::Result<()> {
        match stage {
            Stage::Payload => out.write_all(&self.payload),
            Stage::Decoded => out.write_all(&self.decoded),
            Stage::PreInterleave => write_decimal(&mut out, self.pre_interleave.iter()),
            Stage::Deinterleave => write_decimal(&mut out, self.deinterleave.iter()),
            Stage::PostInterleave => write_decimal(&mut out, self.post_interleave.iter()),
            Stage::DemodSymbols => write_decimal(&mut out, self.demod_symbols.iter()),
            Stage::IqSamples => {
                for s in &self.iq_samples {
                    writeln!(out, "{},{}", s.re, s.im)?;
                }
                Ok(())
            }
        }
    }
}

fn write_decimal<W: Write, T: std::fmt::Display>(
    out: &mut W,
    values: impl Iterator<Item = T>,
) -> io::Result<()> {
    for v in values {
        writeln!(out, "{v}")?;
    }
    Ok(())
}
