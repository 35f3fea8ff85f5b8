//! # LoRa PHY Core
//!
//! A software implementation of the LoRa physical layer: application
//! payloads in, complex baseband I/Q samples out, and back again.
//!
//! ## Signal Flow
//!
//! ```text
//! TX: payload → Whitening → CRC → Hamming FEC → Interleave → Gray⁻¹
//!       → CSS Modulation (preamble + sync + payload chirps) → I/Q
//!
//! RX: I/Q → Offset estimate/compensate → Dechirp + FFT per symbol
//!       → Gray → De-interleave → Hamming decode → De-whiten → payload
//! ```
//!
//! ## The Workspace
//!
//! All mutable state lives in an explicit [`Workspace`] built once per
//! configuration. Every buffer the hot path touches is allocated there;
//! `encode`, `modulate`, `demodulate` and `decode` perform no allocation
//! after [`Workspace::new`] returns. Concurrent streams each own their own
//! workspace; there is no process-wide state.
//!
//! ## Example
//!
//! ```rust
//! use lora_phy_core::{Params, Workspace};
//!
//! let params = Params::builder()
//!     .spreading_factor(7)
//!     .bandwidth(125_000)
//!     .coding_rate(1)
//!     .explicit_header(true)
//!     .build()
//!     .unwrap();
//!
//! let mut tx = Workspace::new(params.clone()).unwrap();
//! let mut iq = vec![num_complex::Complex32::default(); 64 * 128];
//! let n_samples = tx.transmit(b"Hello", &mut iq).unwrap();
//!
//! let mut rx = Workspace::new(params).unwrap();
//! let mut payload = [0u8; 255];
//! let n_bytes = rx.receive(&iq[..n_samples], &mut payload).unwrap();
//! assert_eq!(&payload[..n_bytes], b"Hello");
//! assert!(rx.last_metrics().crc_ok);
//! ```

pub mod chirp;
pub mod coding;
pub mod crc;
pub mod detector;
pub mod fft;
pub mod header;
pub mod params;
pub mod types;
pub mod vectors;
pub mod whitening;
pub mod workspace;

mod decoder;
mod demodulation;
mod encoder;
mod modulation;
mod sync;

pub use encoder::MAX_PAYLOAD_BYTES;
pub use header::FrameHeader;
pub use params::{Bandwidth, CodingRate, Params, ParamsBuilder, SpreadingFactor, Window};
pub use types::{IQSample, Metrics, PhyError, PhyResult, Symbol};
pub use vectors::{Stage, VectorSet};
pub use workspace::{max_packet_symbols, Workspace};
