//! Chirp Signal Generation
//!
//! This module implements chirp synthesis for the Chirp Spread Spectrum
//! modulation.
//!
//! ## What is a Chirp?
//!
//! A chirp is a signal whose frequency changes linearly over time:
//!
//! ```text
//! Frequency
//!     ^
//! fmax|        ___/
//!     |     __/
//!     |  __/
//! fmin|_/
//!     +----------> Time
//!       Upchirp
//! ```
//!
//! A modulated symbol starts the sweep at an offset proportional to the
//! symbol value; when the instantaneous frequency reaches the band edge it
//! wraps to the opposite edge, so every symbol still sweeps the full
//! bandwidth in one symbol period.
//!
//! ## Phase Continuity
//!
//! The phase accumulator is threaded through consecutive calls instead of
//! being recomputed from the sample index, so a frame of many symbols is one
//! continuous waveform without phase steps at symbol boundaries.

use std::f32::consts::PI;

use crate::params::Params;
use crate::types::IQSample;

/// Generate one chirp into a caller-supplied buffer.
///
/// - `out`: destination; its length is the number of samples generated
///   (normally `n * ovs`, shorter for partial chirps)
/// - `n`: base samples per symbol (`2^SF`)
/// - `ovs`: oversampling factor
/// - `f0`: initial frequency offset in radians/sample; encodes the symbol
///   value when modulating
/// - `down`: sweep direction
/// - `amplitude`: output amplitude
/// - `bw_scale`: bandwidth relative to the stream's sample-rate bandwidth;
///   1.0 for the normalized baseband
/// - `phase`: phase accumulator, carried across calls
pub fn gen_chirp(
    out: &mut [IQSample],
    n: usize,
    ovs: usize,
    f0: f32,
    down: bool,
    amplitude: f32,
    bw_scale: f32,
    phase: &mut f32,
) {
    let f_lim = PI * bw_scale / ovs as f32;
    let f_step = 2.0 * PI * bw_scale / (n as f32 * (ovs * ovs) as f32);
    // Wrap within half a step of the band edge so grid-aligned sweeps wrap
    // exactly on the edge sample despite accumulated rounding.
    let margin = 0.5 * f_step;

    let mut f = if down { f_lim - f0 } else { -f_lim + f0 };
    for samp in out.iter_mut() {
        *samp = IQSample::from_polar(amplitude, *phase);
        *phase += f;
        if *phase > PI {
            *phase -= 2.0 * PI;
        } else if *phase < -PI {
            *phase += 2.0 * PI;
        }
        if down {
            f -= f_step;
            if f < -f_lim + margin {
                f += 2.0 * f_lim;
            }
        } else {
            f += f_step;
            if f > f_lim - margin {
                f -= 2.0 * f_lim;
            }
        }
    }
}

/// Chirp synthesis bound to one parameter set.
///
/// Precomputes the dechirp reference at construction; symbol chirps are
/// written straight into caller buffers, so nothing here allocates after
/// `new`.
#[derive(Debug, Clone)]
pub struct ChirpGenerator {
    n: usize,
    osr: usize,
    /// Conjugate of the base upchirp at the chip positions the demodulator
    /// samples. Multiplying a received symbol by this collapses it to a
    /// single FFT bin.
    dechirp_ref: Vec<IQSample>,
}

impl ChirpGenerator {
    pub fn new(params: &Params) -> Self {
        let n = params.chips_per_symbol();
        let osr = params.osr;

        let mut base = vec![IQSample::default(); n * osr];
        let mut phase = 0.0f32;
        gen_chirp(&mut base, n, osr, 0.0, false, 1.0, 1.0, &mut phase);

        let dechirp_ref: Vec<IQSample> = (0..n).map(|i| base[i * osr].conj()).collect();

        Self { n, osr, dechirp_ref }
    }

    /// The dechirp reference, one sample per chip.
    pub fn dechirp_reference(&self) -> &[IQSample] {
        &self.dechirp_ref
    }

    /// Initial frequency for a modulated symbol, in radians/sample.
    pub fn symbol_f0(&self, symbol: u16) -> f32 {
        2.0 * PI * symbol as f32 / (self.n * self.osr) as f32
    }

    /// Write the chirp for one modulated symbol.
    pub fn write_symbol_chirp(
        &self,
        out: &mut [IQSample],
        symbol: u16,
        amplitude: f32,
        phase: &mut f32,
    ) {
        gen_chirp(
            out,
            self.n,
            self.osr,
            self.symbol_f0(symbol),
            false,
            amplitude,
            1.0,
            phase,
        );
    }

    /// Write an unmodulated base chirp (preamble upchirp or delimiter
    /// downchirp).
    pub fn write_base_chirp(
        &self,
        out: &mut [IQSample],
        down: bool,
        amplitude: f32,
        phase: &mut f32,
    ) {
        gen_chirp(out, self.n, self.osr, 0.0, down, amplitude, 1.0, phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(sf: u8, osr: usize) -> Params {
        Params::builder()
            .spreading_factor(sf)
            .bandwidth(125_000)
            .oversample(osr)
            .build()
            .unwrap()
    }

    #[test]
    fn test_unit_magnitude() {
        let p = params(7, 2);
        let gen = ChirpGenerator::new(&p);
        let mut buf = vec![IQSample::default(); p.samples_per_symbol()];
        let mut phase = 0.0;
        gen.write_symbol_chirp(&mut buf, 42, 1.0, &mut phase);
        for s in &buf {
            assert_relative_eq!(s.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_dechirp_collapses_to_tone() {
        // Dechirped symbol chirp must advance 2π·x/N per chip.
        let p = params(7, 4);
        let n = p.chips_per_symbol();
        let gen = ChirpGenerator::new(&p);

        let mut buf = vec![IQSample::default(); p.samples_per_symbol()];
        let mut phase = 0.0;
        let symbol = 42u16;
        gen.write_symbol_chirp(&mut buf, symbol, 1.0, &mut phase);

        let reference = gen.dechirp_reference();
        let tone: Vec<IQSample> = (0..n).map(|i| buf[i * p.osr] * reference[i]).collect();

        let expected_step = 2.0 * PI * symbol as f32 / n as f32;
        for i in 1..n {
            let step = (tone[i] * tone[i - 1].conj()).arg();
            let mut diff = step - expected_step;
            while diff > PI {
                diff -= 2.0 * PI;
            }
            while diff < -PI {
                diff += 2.0 * PI;
            }
            assert!(diff.abs() < 1e-2, "chip {i}: phase step off by {diff}");
        }
    }

    #[test]
    fn test_phase_continuity_across_symbols() {
        let p = params(7, 1);
        let gen = ChirpGenerator::new(&p);
        let s = p.samples_per_symbol();
        let mut buf = vec![IQSample::default(); 2 * s];
        let mut phase = 0.0;
        gen.write_symbol_chirp(&mut buf[..s], 3, 1.0, &mut phase);
        let expected_next = IQSample::from_polar(1.0, phase);
        gen.write_symbol_chirp(&mut buf[s..], 90, 1.0, &mut phase);
        // First sample of the second symbol continues from the accumulator.
        assert!((buf[s] - expected_next).norm() < 1e-4);
    }

    #[test]
    fn test_downchirp_reverses_sweep() {
        let p = params(7, 1);
        let n = p.chips_per_symbol();
        let mut up = vec![IQSample::default(); n];
        let mut down = vec![IQSample::default(); n];
        let mut phase = 0.0;
        gen_chirp(&mut up, n, 1, 0.0, false, 1.0, 1.0, &mut phase);
        phase = 0.0;
        gen_chirp(&mut down, n, 1, 0.0, true, 1.0, 1.0, &mut phase);

        // A quarter of the way in, the sweeps sit at -BW/4 and +BW/4.
        let i = n / 4;
        let f_up = (up[i + 1] * up[i].conj()).arg();
        let f_down = (down[i + 1] * down[i].conj()).arg();
        assert!(f_up < 0.0);
        assert!(f_down > 0.0);
        assert_relative_eq!(f_up.abs(), f_down.abs(), epsilon = 1e-3);
    }

    #[test]
    fn test_bandwidth_scale_narrows_sweep() {
        let n = 128;
        let mut full = vec![IQSample::default(); n];
        let mut quarter = vec![IQSample::default(); n];
        let mut phase = 0.0;
        gen_chirp(&mut full, n, 1, 0.0, false, 1.0, 1.0, &mut phase);
        phase = 0.0;
        gen_chirp(&mut quarter, n, 1, 0.0, false, 1.0, 0.25, &mut phase);

        let f_full = (full[1] * full[0].conj()).arg().abs();
        let f_quarter = (quarter[1] * quarter[0].conj()).arg().abs();
        assert_relative_eq!(f_quarter, f_full * 0.25, epsilon = 1e-4);
    }
}
