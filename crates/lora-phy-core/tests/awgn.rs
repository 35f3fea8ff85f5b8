//! Noisy-channel regression: seeded payloads through AWGN.

use lora_phy_core::{IQSample, Params, Workspace};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Add complex white Gaussian noise at the given SNR (signal power is 1 for
/// unit-amplitude chirps).
fn add_awgn(iq: &mut [IQSample], snr_db: f32, rng: &mut impl Rng) {
    let noise_power = 10.0f32.powf(-snr_db / 10.0);
    let sigma = (noise_power / 2.0).sqrt();
    let normal = Normal::new(0.0f32, sigma).unwrap();
    for s in iq.iter_mut() {
        *s += IQSample::new(normal.sample(rng), normal.sample(rng));
    }
}

#[test]
fn five_packets_sf9_at_12db() {
    let params = Params::builder()
        .spreading_factor(9)
        .bandwidth(125_000)
        .coding_rate(1)
        .explicit_header(true)
        .crc_enabled(true)
        .preamble_len(8)
        .build()
        .unwrap();

    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let mut tx = Workspace::new(params.clone()).unwrap();
    let mut rx = Workspace::new(params.clone()).unwrap();

    for packet in 0..5 {
        let payload: Vec<u8> = (0..16).map(|_| rng.gen()).collect();

        let mut symbols = vec![0u16; lora_phy_core::max_packet_symbols(&params)];
        let n_symbols = tx.encode(&payload, &mut symbols).unwrap();

        let total =
            (params.frame_overhead_symbols() + n_symbols) * params.samples_per_symbol();
        let mut iq = vec![IQSample::default(); total];
        tx.modulate(&symbols[..n_symbols], &mut iq).unwrap();

        add_awgn(&mut iq, 12.0, &mut rng);

        let mut rx_symbols = vec![0u16; n_symbols];
        let produced = rx.demodulate(&iq, &mut rx_symbols).unwrap();
        assert_eq!(produced, n_symbols, "packet {packet}");

        let mut decoded = vec![0u8; 255];
        let n_bytes = rx.decode(&rx_symbols[..produced], &mut decoded).unwrap();
        assert_eq!(&decoded[..n_bytes], &payload, "packet {packet}");
        assert!(rx.last_metrics().crc_ok, "packet {packet}");
    }
}

#[test]
fn heavy_fec_still_decodes_at_low_snr() {
    // 4/8 coding with SF10 has ample margin at 6 dB for clean decisions.
    let params = Params::builder()
        .spreading_factor(10)
        .bandwidth(125_000)
        .coding_rate(4)
        .explicit_header(true)
        .preamble_len(8)
        .build()
        .unwrap();

    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let mut tx = Workspace::new(params.clone()).unwrap();
    let mut rx = Workspace::new(params.clone()).unwrap();

    let payload = b"low snr";
    let mut symbols = vec![0u16; lora_phy_core::max_packet_symbols(&params)];
    let n_symbols = tx.encode(payload, &mut symbols).unwrap();

    let total = (params.frame_overhead_symbols() + n_symbols) * params.samples_per_symbol();
    let mut iq = vec![IQSample::default(); total];
    tx.modulate(&symbols[..n_symbols], &mut iq).unwrap();
    add_awgn(&mut iq, 6.0, &mut rng);

    let mut rx_symbols = vec![0u16; n_symbols];
    let produced = rx.demodulate(&iq, &mut rx_symbols).unwrap();
    let mut decoded = vec![0u8; 64];
    let n_bytes = rx.decode(&rx_symbols[..produced], &mut decoded).unwrap();
    assert_eq!(&decoded[..n_bytes], payload);
}
