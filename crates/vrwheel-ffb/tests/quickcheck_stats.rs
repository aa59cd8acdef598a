//! Property-based tests for packet statistics using quickcheck.

use std::time::Instant;

use quickcheck_macros::quickcheck;
use vrwheel_ffb::{FfbDecoder, PacketKind, report_ids};

#[quickcheck]
fn prop_gain_reports_are_counted(gains: Vec<u8>) -> bool {
    let now = Instant::now();
    let mut decoder = FfbDecoder::default();
    for gain in &gains {
        if decoder.ingest(&[report_ids::DEVICE_GAIN, *gain], now).is_err() {
            return false;
        }
    }
    decoder.stats().handled(PacketKind::Gain) == gains.len() as u64
}

#[quickcheck]
fn prop_unsupported_reports_never_touch_effects(payload: Vec<u8>) -> bool {
    let now = Instant::now();
    let mut decoder = FfbDecoder::default();
    for id in report_ids::UNSUPPORTED {
        let mut raw = vec![id];
        raw.extend_from_slice(&payload);
        if decoder.ingest(&raw, now).is_ok() {
            return false;
        }
    }
    decoder.effect_count() == 0
        && decoder.stats().unsupported().len() == report_ids::UNSUPPORTED.len()
}

#[quickcheck]
fn prop_last_gain_wins(first: u8, second: u8) -> bool {
    let now = Instant::now();
    let mut decoder = FfbDecoder::default();
    let ok = decoder.ingest(&[report_ids::DEVICE_GAIN, first], now).is_ok()
        && decoder.ingest(&[report_ids::DEVICE_GAIN, second], now).is_ok();
    ok && (decoder.global_gain() - f32::from(second) / 255.0).abs() < f32::EPSILON
}
