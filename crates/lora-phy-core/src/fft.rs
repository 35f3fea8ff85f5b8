//! Fixed-plan FFT
//!
//! CSS demodulation reduces every symbol decision to one forward transform:
//! multiplying a received chirp by the dechirp reference leaves a tone whose
//! FFT bin is the symbol value.
//!
//! ```text
//! Received Chirp × Dechirp Reference = e^(j·2π·k/N·n)
//!
//! where k is the symbol index and N the FFT size
//! ```
//!
//! Forward and inverse plans are built once per workspace; the scratch
//! buffer is sized at construction so `fft_inplace`/`ifft_inplace` never
//! allocate.

use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

use crate::types::IQSample;

/// FFT processor with fixed-size forward and inverse plans.
pub struct FftProcessor {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<IQSample>,
}

impl fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftProcessor").field("size", &self.size).finish()
    }
}

impl FftProcessor {
    /// Build forward and inverse plans for `size` points (a power of two).
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        let scratch = vec![IQSample::default(); scratch_len];

        Self {
            size,
            forward,
            inverse,
            scratch,
        }
    }

    /// The transform size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform in place.
    pub fn fft_inplace(&mut self, buffer: &mut [IQSample]) {
        debug_assert_eq!(buffer.len(), self.size);
        self.forward.process_with_scratch(buffer, &mut self.scratch);
    }

    /// Inverse transform in place, normalized by `1/N`.
    pub fn ifft_inplace(&mut self, buffer: &mut [IQSample]) {
        debug_assert_eq!(buffer.len(), self.size);
        self.inverse.process_with_scratch(buffer, &mut self.scratch);

        let scale = 1.0 / self.size as f32;
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }
}
