//! Scriptable mock gateway for testing.
//!
//! This module provides a gateway whose rounds are completed by the test, so
//! the timing and content of every callback is under test control. The mock
//! also counts outstanding rounds to catch overlapping round issue.

use crate::{DeviceGateway, HardwareError, Result, RoundSink};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use uhf_core::{RoundOutcome, TagDetection};

/// Mock UHF gateway for testing and development.
///
/// Every round started through [`DeviceGateway::run_inventory_round`] is
/// handed to the paired [`MockGatewayHandle`] as a [`PendingRound`], which
/// the test completes explicitly.
///
/// # Examples
///
/// ```
/// use uhf_core::{RoundOutcome, TagDetection};
/// use uhf_hardware::{DeviceGateway, RoundSink};
/// use uhf_hardware::mock::MockGateway;
///
/// #[tokio::main]
/// async fn main() -> uhf_hardware::Result<()> {
///     let (gateway, mut handle) = MockGateway::new();
///     gateway.init()?;
///     gateway.set_power(26)?;
///     assert_eq!(gateway.get_power()?, 26);
///
///     let (sink, _events) = RoundSink::channel(1);
///     gateway.run_inventory_round(255, sink)?;
///     assert_eq!(handle.outstanding(), 1);
///
///     let round = handle.next_round().await.unwrap();
///     round.complete(RoundOutcome::Success { tag_count: 0, read_count: 0 });
///     assert_eq!(handle.outstanding(), 0);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockGateway {
    /// State shared with the handle
    shared: Arc<Mutex<MockState>>,

    /// Channel for handing rounds to the test
    rounds_tx: mpsc::UnboundedSender<PendingRound>,
}

#[derive(Debug, Default)]
struct MockState {
    initialized: bool,
    init_fails: bool,
    set_power_fails: bool,
    get_power_fails: bool,
    round_start_fails: bool,
    power: i32,
    power_writes: Vec<i32>,
    init_calls: usize,
    deinit_calls: usize,
    rounds_issued: usize,
    outstanding: usize,
    max_outstanding: usize,
    last_max_tags: Option<u16>,
}

fn lock(shared: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockGateway {
    /// Create a new mock gateway.
    ///
    /// Returns a tuple of (MockGateway, MockGatewayHandle) where the handle
    /// scripts device behaviour and completes rounds.
    pub fn new() -> (Self, MockGatewayHandle) {
        let (rounds_tx, rounds_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(MockState::default()));

        let gateway = Self {
            shared: Arc::clone(&shared),
            rounds_tx,
        };

        let handle = MockGatewayHandle { shared, rounds_rx };

        (gateway, handle)
    }
}

impl DeviceGateway for MockGateway {
    fn init(&self) -> Result<()> {
        let mut state = lock(&self.shared);
        state.init_calls += 1;
        if state.init_fails {
            return Err(HardwareError::initialization_failed("mock radio did not respond"));
        }
        state.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        lock(&self.shared).initialized
    }

    fn deinit(&self) {
        let mut state = lock(&self.shared);
        state.initialized = false;
        state.deinit_calls += 1;
    }

    fn set_power(&self, dbm: i32) -> Result<()> {
        let mut state = lock(&self.shared);
        if !state.initialized {
            return Err(HardwareError::NotInitialized);
        }
        if state.set_power_fails {
            return Err(HardwareError::command_failed("set_power", "rejected by device"));
        }
        state.power = dbm;
        state.power_writes.push(dbm);
        Ok(())
    }

    fn get_power(&self) -> Result<i32> {
        let state = lock(&self.shared);
        if !state.initialized {
            return Err(HardwareError::NotInitialized);
        }
        if state.get_power_fails {
            return Err(HardwareError::communication("power read timed out"));
        }
        Ok(state.power)
    }

    fn run_inventory_round(&self, max_tags: u16, sink: RoundSink) -> Result<()> {
        {
            let mut state = lock(&self.shared);
            if !state.initialized {
                return Err(HardwareError::NotInitialized);
            }
            if state.round_start_fails {
                return Err(HardwareError::command_failed("inventory", "radio busy"));
            }
            state.rounds_issued += 1;
            state.outstanding += 1;
            state.max_outstanding = state.max_outstanding.max(state.outstanding);
            state.last_max_tags = Some(max_tags);
        }

        let round = PendingRound {
            sink: Some(sink),
            max_tags,
            issued_at: Instant::now(),
            shared: Arc::clone(&self.shared),
            released: false,
        };

        // A dropped handle drops the round, which reports it as abandoned.
        let _ = self.rounds_tx.send(round);
        Ok(())
    }
}

/// An inventory round waiting for the test to complete it.
#[derive(Debug)]
pub struct PendingRound {
    sink: Option<RoundSink>,
    max_tags: u16,
    issued_at: Instant,
    shared: Arc<Mutex<MockState>>,
    released: bool,
}

impl PendingRound {
    /// Identifier assigned by the reader.
    pub fn round_id(&self) -> u64 {
        self.sink.as_ref().map_or(0, RoundSink::round_id)
    }

    /// Tag bound requested for this round.
    pub fn max_tags(&self) -> u16 {
        self.max_tags
    }

    /// When the gateway was asked to run this round.
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Report a tag from this round.
    pub fn tag(&self, detection: TagDetection) {
        if let Some(sink) = &self.sink {
            sink.tag(detection);
        }
    }

    /// Finish the round with `outcome`.
    ///
    /// The round stops counting as outstanding before the outcome is sent.
    pub fn complete(mut self, outcome: RoundOutcome) {
        self.release();
        if let Some(sink) = self.sink.take() {
            sink.finish(outcome);
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let mut state = lock(&self.shared);
            state.outstanding = state.outstanding.saturating_sub(1);
        }
    }
}

impl Drop for PendingRound {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle for controlling a mock gateway.
///
/// # Examples
///
/// ```
/// use uhf_hardware::DeviceGateway;
/// use uhf_hardware::mock::MockGateway;
///
/// let (gateway, handle) = MockGateway::new();
/// handle.fail_init(true);
/// assert!(gateway.init().is_err());
///
/// handle.fail_init(false);
/// assert!(gateway.init().is_ok());
/// assert_eq!(handle.init_calls(), 2);
/// ```
#[derive(Debug)]
pub struct MockGatewayHandle {
    shared: Arc<Mutex<MockState>>,
    rounds_rx: mpsc::UnboundedReceiver<PendingRound>,
}

impl MockGatewayHandle {
    /// Make `init` fail.
    pub fn fail_init(&self, fail: bool) {
        lock(&self.shared).init_fails = fail;
    }

    /// Make `set_power` fail.
    pub fn fail_set_power(&self, fail: bool) {
        lock(&self.shared).set_power_fails = fail;
    }

    /// Make `get_power` fail.
    pub fn fail_get_power(&self, fail: bool) {
        lock(&self.shared).get_power_fails = fail;
    }

    /// Make `run_inventory_round` refuse to start rounds.
    pub fn fail_round_start(&self, fail: bool) {
        lock(&self.shared).round_start_fails = fail;
    }

    /// Overwrite the raw power value the device reports.
    pub fn set_device_power(&self, raw: i32) {
        lock(&self.shared).power = raw;
    }

    /// Raw power value the device currently holds.
    pub fn device_power(&self) -> i32 {
        lock(&self.shared).power
    }

    /// Every value accepted by `set_power`, in order.
    pub fn power_writes(&self) -> Vec<i32> {
        lock(&self.shared).power_writes.clone()
    }

    /// Whether the radio is initialized.
    pub fn is_initialized(&self) -> bool {
        lock(&self.shared).initialized
    }

    /// Number of `init` calls.
    pub fn init_calls(&self) -> usize {
        lock(&self.shared).init_calls
    }

    /// Number of `deinit` calls.
    pub fn deinit_calls(&self) -> usize {
        lock(&self.shared).deinit_calls
    }

    /// Number of rounds started.
    pub fn rounds_issued(&self) -> usize {
        lock(&self.shared).rounds_issued
    }

    /// Rounds started and not yet completed.
    pub fn outstanding(&self) -> usize {
        lock(&self.shared).outstanding
    }

    /// Highest number of simultaneously outstanding rounds observed.
    pub fn max_outstanding(&self) -> usize {
        lock(&self.shared).max_outstanding
    }

    /// Tag bound passed with the most recent round.
    pub fn last_max_tags(&self) -> Option<u16> {
        lock(&self.shared).last_max_tags
    }

    /// Wait for the next round the reader issues.
    ///
    /// Returns `None` once the gateway has been dropped and every issued
    /// round has been taken.
    pub async fn next_round(&mut self) -> Option<PendingRound> {
        self.rounds_rx.recv().await
    }

    /// Take the next issued round if one is already waiting.
    pub fn try_next_round(&mut self) -> Option<PendingRound> {
        self.rounds_rx.try_recv().ok()
    }
}
