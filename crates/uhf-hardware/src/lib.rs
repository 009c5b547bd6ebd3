//! Device gateway abstraction for UHF RFID readers.
//!
//! This crate defines the boundary between the reader control loop and the
//! vendor driver. The driver performs radio initialization, transmit power
//! get/set, and single inventory rounds; everything else (scheduling, backoff,
//! lifecycle) lives in `uhf-reader`.
//!
//! # Design Philosophy
//!
//! - **Synchronous commands**: `init`, `set_power` and `get_power` are short
//!   driver calls and are exposed as plain methods.
//! - **Callback rounds**: an inventory round runs on the driver's own thread
//!   and reports through a [`RoundSink`], which can be moved anywhere.
//! - **Injected, not global**: the gateway is handed to the reader at
//!   construction, so tests substitute [`mock::MockGateway`].
//! - **Error-aware**: every fallible call returns [`Result<T>`] with a
//!   [`HardwareError`].
//!
//! # Running a Round
//!
//! ```
//! use uhf_core::{RoundOutcome, TagDetection};
//! use uhf_hardware::{DeviceGateway, RoundEvent, RoundSink};
//! use uhf_hardware::mock::MockGateway;
//!
//! #[tokio::main]
//! async fn main() -> uhf_hardware::Result<()> {
//!     let (gateway, mut handle) = MockGateway::new();
//!     gateway.init()?;
//!
//!     let (sink, mut events) = RoundSink::channel(1);
//!     gateway.run_inventory_round(255, sink)?;
//!
//!     let round = handle.next_round().await.expect("round issued");
//!     round.tag(TagDetection::new(vec![0xAA, 0xBB]));
//!     round.complete(RoundOutcome::Success { tag_count: 1, read_count: 1 });
//!
//!     assert!(matches!(events.recv().await, Some(RoundEvent::Tag { .. })));
//!     assert!(matches!(events.recv().await, Some(RoundEvent::Done { .. })));
//!     Ok(())
//! }
//! ```
//!
//! # Thread Safety
//!
//! [`DeviceGateway`] requires `Send + Sync + 'static`. Round callbacks may be
//! invoked from any thread; [`RoundSink`] forwards them over a channel so the
//! consumer processes them on a single task.

pub mod error;
pub mod mock;
pub mod round;
pub mod traits;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use round::{RoundEvent, RoundSink};
pub use traits::DeviceGateway;
