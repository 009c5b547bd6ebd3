//! Gateway trait definition.
//!
//! [`DeviceGateway`] is the contract between the reader control loop and a
//! UHF driver. It owns no policy: no retries, no backoff, no state events.

use crate::error::Result;
use crate::round::RoundSink;

/// Thin synchronous adapter over a UHF reader driver.
///
/// Command methods take `&self`; implementations use interior mutability
/// where the driver needs it. The gateway is shared with the reader task, so
/// it must be `Send + Sync + 'static`.
///
/// # Inventory Rounds
///
/// [`run_inventory_round`](DeviceGateway::run_inventory_round) starts one
/// round and returns without waiting for it. The driver reports through the
/// supplied [`RoundSink`], typically from its own thread: zero or more tags,
/// then exactly one outcome. If the round cannot be started the method
/// returns an error and drops the sink, which reports the round as abandoned.
///
/// # Examples
///
/// ```
/// use uhf_hardware::{DeviceGateway, Result};
///
/// fn apply_power<G: DeviceGateway>(gateway: &G, dbm: i32) -> Result<i32> {
///     gateway.set_power(dbm)?;
///     gateway.get_power()
/// }
/// ```
pub trait DeviceGateway: Send + Sync + 'static {
    /// Power up and initialize the radio.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver could not bring the radio up.
    fn init(&self) -> Result<()>;

    /// Whether the radio is currently initialized.
    fn is_initialized(&self) -> bool;

    /// Release the radio.
    fn deinit(&self);

    /// Set transmit power in dBm.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not initialized, rejects the value,
    /// or cannot be reached.
    fn set_power(&self, dbm: i32) -> Result<()>;

    /// Read transmit power as reported by the device (unmasked).
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not initialized or cannot be read.
    fn get_power(&self) -> Result<i32>;

    /// Start one inventory round reporting at most `max_tags` tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the round could not be started.
    fn run_inventory_round(&self, max_tags: u16, sink: RoundSink) -> Result<()>;
}
