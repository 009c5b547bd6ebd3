//! Transmit power control.
//!
//! [`PowerController`] keeps the last power value the device confirmed and
//! folds every device error into a boolean or the cached value.

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uhf_core::{Error, Result, mask_power};
use uhf_hardware::DeviceGateway;

/// Validates and tracks the configured transmit power.
#[derive(Debug)]
pub struct PowerController<G> {
    gateway: Arc<G>,
    cached: Option<i32>,
}

impl<G: DeviceGateway> PowerController<G> {
    /// Create a controller with an empty cache.
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            cached: None,
        }
    }

    /// Last power value the device confirmed.
    pub fn cached(&self) -> Option<i32> {
        self.cached
    }

    /// Drop the cached value.
    pub fn forget(&mut self) {
        self.cached = None;
    }

    /// Set transmit power, returning the device error on failure.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUninitialized` before init, or
    /// `Error::DeviceCommandFailed` if the device rejects the value.
    pub fn try_set_power(&mut self, dbm: i32) -> Result<i32> {
        if !self.gateway.is_initialized() {
            return Err(Error::DeviceUninitialized);
        }
        self.gateway.set_power(dbm)?;
        self.cached = Some(dbm);
        Ok(dbm)
    }

    /// Set transmit power.
    ///
    /// Returns `true` once the device confirmed the value. Any failure
    /// leaves the cache untouched and returns `false`.
    pub fn set_power(&mut self, dbm: i32) -> bool {
        match self.try_set_power(dbm) {
            Ok(_) => {
                info!(dbm, "transmit power set");
                true
            }
            Err(Error::DeviceUninitialized) => {
                error!(dbm, "cannot set power: device not initialized");
                false
            }
            Err(e) => {
                error!(dbm, error = %e, "failed to set transmit power");
                false
            }
        }
    }

    /// Read transmit power from the device, masked to a byte.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceUninitialized` before init, or
    /// `Error::DeviceCommandFailed` if the device cannot be read.
    pub fn try_get_power(&mut self) -> Result<i32> {
        if !self.gateway.is_initialized() {
            return Err(Error::DeviceUninitialized);
        }
        let raw = self.gateway.get_power()?;
        let dbm = mask_power(raw);
        if dbm != raw {
            debug!(raw, dbm, "masked device power value");
        }
        self.cached = Some(dbm);
        Ok(dbm)
    }

    /// Read transmit power, falling back to the cached value.
    pub fn get_power(&mut self) -> Option<i32> {
        match self.try_get_power() {
            Ok(dbm) => Some(dbm),
            Err(Error::DeviceUninitialized) => self.cached,
            Err(e) => {
                warn!(error = %e, cached = ?self.cached, "power read failed, using cached value");
                self.cached
            }
        }
    }
}
