//! Carrier-frequency and timing offset estimation
//!
//! The estimator consumes the leading preamble upchirps of a frame. Each
//! candidate symbol is dechirped and run through the detector at every
//! sub-sample start; the strongest start supplies the bin and fractional-bin
//! observation.
//!
//! - coarse CFO: mean dominant-bin index across estimation symbols, `/ N`
//! - fine CFO: unwrapped phase drift of the dominant bin between
//!   consecutive symbols, `/ (2π·N)`
//! - timing offset: best sub-sample start minus the signed sub-bin distance
//!   of the mean index scaled by `N · osr`
//!
//! Compensation rotates the stream against the estimated CFO and shifts it
//! by the rounded timing offset with zero fill at the exposed end.

use std::f32::consts::PI;

use crate::detector::detect;
use crate::fft::FftProcessor;
use crate::types::IQSample;

/// Offsets measured from the preamble.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OffsetEstimate {
    /// Carrier frequency offset, fractional-bin units over `N`.
    pub cfo: f32,
    /// Timing offset in samples.
    pub time_offset: f32,
}

/// Fill `bins` with one dechirped symbol taken from `iq` at `start`,
/// stepping by the oversampling ratio, with the optional window applied.
pub(crate) fn dechirp_into(
    bins: &mut [IQSample],
    iq: &[IQSample],
    start: usize,
    osr: usize,
    reference: &[IQSample],
    window: Option<&[f32]>,
) {
    match window {
        Some(win) => {
            for (i, bin) in bins.iter_mut().enumerate() {
                *bin = iq[start + i * osr] * reference[i] * win[i];
            }
        }
        None => {
            for (i, bin) in bins.iter_mut().enumerate() {
                *bin = iq[start + i * osr] * reference[i];
            }
        }
    }
}

/// Estimate CFO and timing offset from up to two leading upchirps.
///
/// `iq` must hold at least one full symbol (`N * osr` samples). All scratch
/// comes from the caller; nothing allocates.
pub(crate) fn estimate(
    iq: &[IQSample],
    n: usize,
    osr: usize,
    reference: &[IQSample],
    window: Option<&[f32]>,
    fft: &mut FftProcessor,
    bins: &mut [IQSample],
) -> OffsetEstimate {
    let sym_len = n * osr;
    let est_syms = (iq.len() / sym_len).min(2);
    if est_syms == 0 {
        return OffsetEstimate::default();
    }

    let mut sum_index = 0.0f32;
    let mut phase_diff = 0.0f32;
    let mut prev_phase = 0.0f32;
    let mut best_power = 0.0f32;
    let mut best_sub = 0usize;

    for s in 0..est_syms {
        // Search the oversampled starts; strict comparisons keep the
        // earliest start on ties.
        dechirp_into(bins, iq, s * sym_len, osr, reference, window);
        let mut det = detect(fft, bins);
        let mut det_sub = 0usize;
        for sub in 1..osr {
            dechirp_into(bins, iq, s * sym_len + sub, osr, reference, window);
            let candidate = detect(fft, bins);
            if candidate.power > det.power {
                det = candidate;
                det_sub = sub;
            }
        }
        if det.power > best_power {
            best_power = det.power;
            best_sub = det_sub;
        }

        sum_index += det.idx as f32 + det.f_index;
        if s > 0 {
            let mut d = det.phase - prev_phase;
            while d > PI {
                d -= 2.0 * PI;
            }
            while d < -PI {
                d += 2.0 * PI;
            }
            phase_diff += d;
        }
        prev_phase = det.phase;
    }

    let mean_index = sum_index / est_syms as f32;
    let cfo_coarse = mean_index / n as f32;
    let cfo_fine = if est_syms > 1 {
        (phase_diff / (est_syms - 1) as f32) / (2.0 * PI * n as f32)
    } else {
        0.0
    };

    // Signed distance of the mean index to its nearest bin, scaled over the
    // full symbol: time_offset = best_sub - frac(mean_idx) * N * osr.
    let frac = mean_index - (mean_index + 0.5).floor();

    OffsetEstimate {
        cfo: cfo_coarse + cfo_fine,
        time_offset: best_sub as f32 - frac * (n * osr) as f32,
    }
}

/// Rotate `iq` against `cfo` and shift it by the rounded timing offset, in
/// place, zero-filling the exposed end.
///
/// The rotation index counts chips, matching the demodulator's folded
/// compensation.
pub(crate) fn compensate(iq: &mut [IQSample], n: usize, osr: usize, est: OffsetEstimate) {
    let rate = -2.0 * PI * est.cfo / n as f32;
    for (i, samp) in iq.iter_mut().enumerate() {
        let chip = (i / osr) as f32;
        *samp *= IQSample::from_polar(1.0, rate * chip);
    }

    let len = iq.len();
    let shift = est.time_offset.round() as isize;
    if shift > 0 {
        let k = (shift as usize).min(len);
        iq.copy_within(k.., 0);
        iq[len - k..].fill(IQSample::default());
    } else if shift < 0 {
        let k = ((-shift) as usize).min(len);
        iq.copy_within(..len - k, k);
        iq[..k].fill(IQSample::default());
    }
}
