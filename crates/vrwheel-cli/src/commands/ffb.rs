//! Force-feedback report commands

use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;
use vrwheel_ffb::{DEFAULT_SMOOTHING_ALPHA, FfbDecoder, FfbPacket, HapticEstimator};

use crate::commands::FfbCommands;
use crate::error::CliError;
use crate::output;

pub fn execute(cmd: &FfbCommands, json: bool) -> Result<()> {
    match cmd {
        FfbCommands::Decode { reports } => {
            let packets = decode_all(reports)?;
            output::print_packets(&packets, json);
            Ok(())
        }
        FfbCommands::Replay {
            reports,
            ticks,
            interval_ms,
            alpha,
        } => {
            let packets = decode_all(reports)?;
            let steps = replay(
                &packets,
                *ticks,
                Duration::from_millis(*interval_ms),
                alpha.unwrap_or(DEFAULT_SMOOTHING_ALPHA),
            );
            print_replay(&steps, json);
            Ok(())
        }
    }
}

/// Parse a hex dump such as `0a 01 01 01` or `0a:01:01:01`.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);
    hex::decode(digits)
}

fn decode_all(reports: &[String]) -> Result<Vec<FfbPacket>, CliError> {
    reports
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let raw = parse_hex(text).map_err(|source| CliError::InvalidHex { index, source })?;
            FfbPacket::parse(&raw).map_err(|source| CliError::InvalidReport { index, source })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReplayStep {
    pub elapsed_ms: u64,
    pub smoothed: f32,
    pub haptic_intensity: Option<f32>,
    pub playing: usize,
}

/// Apply every packet at the first tick, then run `ticks` decoder ticks.
pub fn replay(packets: &[FfbPacket], ticks: u32, interval: Duration, alpha: f32) -> Vec<ReplayStep> {
    let mut decoder = FfbDecoder::new(alpha, HapticEstimator::default());
    let start = Instant::now();
    for packet in packets {
        decoder.apply(*packet, start);
    }

    (0..=ticks)
        .map(|i| {
            let elapsed = interval.saturating_mul(i);
            let sample = decoder.tick(start + elapsed);
            ReplayStep {
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                smoothed: sample.smoothed,
                haptic_intensity: sample.haptic.map(|h| h.intensity),
                playing: decoder.playing_count(),
            }
        })
        .collect()
}

fn print_replay(steps: &[ReplayStep], json: bool) {
    if json {
        output::print_success_json("steps", &steps);
        return;
    }
    for step in steps {
        let haptic = step
            .haptic_intensity
            .map_or_else(String::new, |i| format!("  haptic={i:.3}"));
        println!(
            "{:>6} ms  smoothed={:+.4}  playing={}{}",
            step.elapsed_ms, step.smoothed, step.playing, haptic
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_parse_hex_accepts_separators_and_prefix() -> TestResult {
        assert_eq!(parse_hex("0a 01 01 02")?, vec![0x0A, 1, 1, 2]);
        assert_eq!(parse_hex("0x0d:80")?, vec![0x0D, 0x80]);
        assert!(parse_hex("0d8").is_err());
        Ok(())
    }

    #[test]
    fn test_decode_reports_index_of_bad_report() -> TestResult {
        let reports = vec!["0d80".to_string(), "ff".to_string()];
        let err = decode_all(&reports).err().ok_or("bad report accepted")?;
        assert!(matches!(err, CliError::InvalidReport { index: 1, .. }));

        let reports = vec!["zz".to_string()];
        let err = decode_all(&reports).err().ok_or("bad hex accepted")?;
        assert!(matches!(err, CliError::InvalidHex { index: 0, .. }));
        Ok(())
    }

    #[test]
    fn test_replay_converges_on_constant_force() -> TestResult {
        let packets = decode_all(&[
            "01 01 01 ffff 0000 0000 ff 00 00 00".to_string(),
            "05 01 8813".to_string(),
            "0a 01 01 01".to_string(),
        ])?;
        let steps = replay(&packets, 40, Duration::from_millis(10), 0.5);
        assert_eq!(steps.len(), 41);
        assert!(steps.first().is_some_and(|s| s.playing == 1));
        let last = steps.last().ok_or("no steps")?;
        assert!((last.smoothed - 0.5).abs() < 0.01);
        Ok(())
    }
}
