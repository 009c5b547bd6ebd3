//! Mock gateway implementations for testing and development.
//!
//! - [`MockGateway`]: rounds are completed explicitly by the test.
//! - [`SimulatedGateway`]: rounds complete on their own from a driver thread.

pub mod gateway;
pub mod simulated;

pub use gateway::{MockGateway, MockGatewayHandle, PendingRound};
pub use simulated::{SimulatedGateway, SimulationConfig};
