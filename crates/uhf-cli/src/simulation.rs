//! Simulated reader setup from command-line options.

use anyhow::{Context, Result, bail};
use std::time::Duration;
use uhf_core::TagDetection;
use uhf_hardware::mock::SimulationConfig;

/// Decode an EPC given as hex, e.g. `E20068110000000001`.
pub fn parse_epc(hex: &str) -> Result<Vec<u8>> {
    let hex = hex.trim();
    if hex.is_empty() || hex.len() % 2 != 0 {
        bail!("EPC must be a non-empty, even-length hex string: {hex:?}");
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            let pair = hex.get(i..i + 2).context("EPC must be ASCII hex")?;
            u8::from_str_radix(pair, 16).with_context(|| format!("invalid hex byte {pair:?}"))
        })
        .collect()
}

/// Build the simulated gateway behaviour.
///
/// An empty `epcs` keeps the default tag population.
pub fn build(round_ms: u64, fail_every: Option<u32>, epcs: &[String]) -> Result<SimulationConfig> {
    let mut config = SimulationConfig {
        round_duration: Duration::from_millis(round_ms),
        fail_every,
        ..SimulationConfig::default()
    };

    if !epcs.is_empty() {
        config.tags = epcs
            .iter()
            .enumerate()
            .map(|(i, epc)| -> Result<TagDetection> {
                Ok(TagDetection::new(parse_epc(epc)?)
                    .with_rssi(-45 - i as i32)
                    .with_antenna(1))
            })
            .collect::<Result<_>>()?;
    }

    Ok(config)
}
