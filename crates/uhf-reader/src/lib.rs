//! UHF RFID reader control loop.
//!
//! This crate turns a [`DeviceGateway`](uhf_hardware::DeviceGateway) into a
//! continuously scanning reader:
//!
//! - [`lifecycle`]: reader state machine (`initializing`, `ready`,
//!   `scanning`, `error`, `disposed`) with transition history
//! - [`scheduler`]: self re-arming inventory loop with success and failure
//!   backoff and at most one outstanding round
//! - [`power`]: transmit power with a last-confirmed cache
//! - [`dispatcher`]: tag and state streams with one subscriber each
//! - [`reader`]: the [`Reader`] handle and the task that owns all of the above
//!
//! # Example
//!
//! ```
//! use uhf_core::{RoundOutcome, TagDetection};
//! use uhf_hardware::mock::MockGateway;
//! use uhf_reader::Reader;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (gateway, mut device) = MockGateway::new();
//!     let reader = Reader::new(gateway);
//!     let mut tags = reader.subscribe_tags().await;
//!
//!     assert!(reader.init().await);
//!     assert!(reader.start_inventory().await);
//!
//!     let round = device.next_round().await.unwrap();
//!     round.tag(TagDetection::new(vec![0xAA, 0xBB]).with_rssi(-52));
//!     round.complete(RoundOutcome::Success { tag_count: 1, read_count: 1 });
//!
//!     let tag = tags.recv().await.unwrap();
//!     assert_eq!(tag.epc, "AABB");
//!
//!     reader.stop_inventory().await;
//!     reader.shutdown().await.unwrap();
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod lifecycle;
pub mod power;
pub mod reader;
pub mod scheduler;

pub use config::ReaderConfig;
pub use dispatcher::{EventDispatcher, EventStream, StateStream, TagStream};
pub use lifecycle::{Lifecycle, LifecycleEvent, StateTransition};
pub use power::PowerController;
pub use reader::Reader;
pub use scheduler::{RoundFollowUp, ScanScheduler, ScanStats, StartDecision};
