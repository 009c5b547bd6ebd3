//! Core constants for UHF reader control.
//!
//! These values are shared by the hardware gateway, the scan scheduler and the
//! bridge. They describe the supported handheld UHF readers: a default
//! transmit power good for a 5-6 m read range, a per-round tag bound of one
//! byte, and a short/long backoff pair between inventory rounds.
//!
//! # Usage
//!
//! ```
//! use uhf_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(DEFAULT_POWER_DBM, 26);
//! assert!(FAILURE_BACKOFF_MS > SUCCESS_BACKOFF_MS);
//!
//! let backoff = Duration::from_millis(SUCCESS_BACKOFF_MS);
//! assert_eq!(backoff.as_millis(), 100);
//! ```

// ============================================================================
// Transmit Power
// ============================================================================

/// Transmit power applied when the reader becomes ready (dBm).
///
/// Gives roughly a 5-6 m read range on the supported handhelds.
pub const DEFAULT_POWER_DBM: i32 = 26;

/// Mask applied to device-reported power values before caching.
///
/// The driver reports power as a signed integer whose meaningful part is the
/// low byte. The valid semantic range is device specific, so the mask is kept
/// as-is rather than widened or clamped.
pub const POWER_MASK: i32 = 0xFF;

// ============================================================================
// Inventory Rounds
// ============================================================================

/// Upper bound on tags reported by a single inventory round.
pub const MAX_TAGS_PER_ROUND: u16 = 255;

/// Delay before re-issuing a round that finished successfully (milliseconds).
pub const SUCCESS_BACKOFF_MS: u64 = 100;

/// Delay before re-issuing a round that finished with an error (milliseconds).
///
/// Must stay greater than [`SUCCESS_BACKOFF_MS`] so failures never busy-loop.
pub const FAILURE_BACKOFF_MS: u64 = 500;

/// Error code reported when a driver drops a round without a terminal outcome.
pub const ROUND_ABANDONED: i32 = -1;

// ============================================================================
// Diagnostics
// ============================================================================

/// Number of lifecycle transitions kept for diagnostics.
pub const MAX_TRANSITION_HISTORY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_ordering() {
        assert!(FAILURE_BACKOFF_MS > SUCCESS_BACKOFF_MS);
        assert!(SUCCESS_BACKOFF_MS > 0);
    }

    #[test]
    fn test_power_mask_is_one_byte() {
        assert_eq!(POWER_MASK, u8::MAX as i32);
        assert_eq!(0x11A & POWER_MASK, 0x1A);
    }

    #[test]
    fn test_round_bound_fits_in_byte() {
        assert_eq!(MAX_TAGS_PER_ROUND, u8::MAX as u16);
    }
}
