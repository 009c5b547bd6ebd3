use crate::constants::POWER_MASK;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse operational phase of the reader.
///
/// Exactly one value is current at any time. The lifecycle state machine in
/// `uhf-reader` owns it and emits every change on the state stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderState {
    /// Reader created, device not yet initialized.
    Uninitialized,

    /// Device initialization in progress.
    Initializing,

    /// Device initialized and idle.
    Ready,

    /// Continuous inventory requested.
    Scanning,

    /// Device initialization failed.
    Error,

    /// Reader released; terminal.
    Disposed,
}

impl ReaderState {
    /// Wire name of the state as emitted on the state stream.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderState::Uninitialized => "uninitialized",
            ReaderState::Initializing => "initializing",
            ReaderState::Ready => "ready",
            ReaderState::Scanning => "scanning",
            ReaderState::Error => "error",
            ReaderState::Disposed => "disposed",
        }
    }

    /// Whether the reader has been released.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReaderState::Disposed)
    }
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply the device power mask to a raw driver value.
///
/// ```
/// use uhf_core::mask_power;
///
/// assert_eq!(mask_power(26), 26);
/// assert_eq!(mask_power(0x11A), 0x1A);
/// assert_eq!(mask_power(-1), 255);
/// ```
#[must_use]
pub fn mask_power(raw: i32) -> i32 {
    raw & POWER_MASK
}

/// A single tag seen during an inventory round.
///
/// Detections are produced by the gateway and forwarded immediately; nothing
/// in the reader retains them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDetection {
    /// Electronic Product Code as raw bytes.
    pub epc: Vec<u8>,

    /// Received signal strength, if the driver reported one.
    pub rssi: Option<i32>,

    /// Antenna that saw the tag, if the driver reported one.
    pub antenna_id: Option<u8>,

    /// Carrier frequency in kHz, if the driver reported one.
    pub frequency_khz: Option<u32>,
}

impl TagDetection {
    /// Create a detection with only the EPC set.
    pub fn new(epc: impl Into<Vec<u8>>) -> Self {
        Self {
            epc: epc.into(),
            rssi: None,
            antenna_id: None,
            frequency_khz: None,
        }
    }

    /// Set the RSSI.
    pub fn with_rssi(mut self, rssi: i32) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Set the antenna identifier.
    pub fn with_antenna(mut self, antenna_id: u8) -> Self {
        self.antenna_id = Some(antenna_id);
        self
    }

    /// Set the carrier frequency.
    pub fn with_frequency_khz(mut self, frequency_khz: u32) -> Self {
        self.frequency_khz = Some(frequency_khz);
        self
    }

    /// Get the EPC as an upper-case hexadecimal string, two characters per byte.
    pub fn epc_hex(&self) -> String {
        self.epc
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Terminal result of one inventory round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Round finished normally.
    Success {
        /// Distinct tags seen.
        tag_count: u32,
        /// Total reads, including repeats.
        read_count: u32,
    },

    /// Round finished with a driver error.
    Failure {
        /// Driver-specific error code.
        error_code: i32,
    },
}

impl RoundOutcome {
    /// Whether the round succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, RoundOutcome::Success { .. })
    }

    /// Convert into a `Result`, mapping failures to [`crate::Error::RoundFailed`].
    pub fn into_result(self) -> crate::Result<(u32, u32)> {
        match self {
            RoundOutcome::Success {
                tag_count,
                read_count,
            } => Ok((tag_count, read_count)),
            RoundOutcome::Failure { error_code } => Err(crate::Error::RoundFailed { error_code }),
        }
    }
}

/// Tag stream message as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEvent {
    /// EPC as upper-case hex.
    pub epc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,

    #[serde(
        rename = "frequencyKHz",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frequency_khz: Option<u32>,

    #[serde(rename = "antennaId", default, skip_serializing_if = "Option::is_none")]
    pub antenna_id: Option<u8>,
}

impl From<&TagDetection> for TagEvent {
    fn from(detection: &TagDetection) -> Self {
        Self {
            epc: detection.epc_hex(),
            rssi: detection.rssi,
            frequency_khz: detection.frequency_khz,
            antenna_id: detection.antenna_id,
        }
    }
}

impl From<TagDetection> for TagEvent {
    fn from(detection: TagDetection) -> Self {
        Self::from(&detection)
    }
}
