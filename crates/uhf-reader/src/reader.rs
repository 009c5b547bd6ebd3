//! Reader control surface and the task that owns all reader state.
//!
//! # Architecture
//!
//! A [`Reader`] is a handle to one spawned task. Control calls, round
//! callbacks and re-arm timers all reach that task as messages, so the scan
//! session, cached power and lifecycle state have a single writer.
//!
//! ```text
//! ┌──────────┐  Command   ┌──────────────────┐  run_inventory_round  ┌─────────┐
//! │  Reader  │───────────►│                  │──────────────────────►│ Device  │
//! └──────────┘            │   ReaderActor    │                       │ Gateway │
//!                         │                  │◄──────────────────────│         │
//! ┌──────────┐  token     │ lifecycle        │  RoundEvent (sink)    └─────────┘
//! │  Timer   │───────────►│ scheduler, power │
//! └──────────┘            └────────┬─────────┘
//!                                  │ TagEvent / ReaderState
//!                                  ▼
//!                           EventDispatcher
//! ```
//!
//! Control calls never wait on a scan round. Stopping is advisory: the
//! outstanding round runs to completion and is then not re-armed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use uhf_core::constants::MAX_TAGS_PER_ROUND;
use uhf_core::{Error, ReaderState, Result, RoundOutcome, TagDetection};
use uhf_hardware::{DeviceGateway, RoundEvent, RoundSink};

use crate::config::ReaderConfig;
use crate::dispatcher::{EventDispatcher, EventStream, StateStream, TagStream, stream_channel};
use crate::lifecycle::{Lifecycle, LifecycleEvent, StateTransition};
use crate::power::PowerController;
use crate::scheduler::{RoundFollowUp, ScanScheduler, ScanStats, StartDecision};

/// Requests handled by the reader task.
#[derive(Debug)]
enum Command {
    Init(oneshot::Sender<bool>),
    Dispose(oneshot::Sender<()>),
    SetPower(i32, oneshot::Sender<bool>),
    GetPower(oneshot::Sender<Option<i32>>),
    StartInventory(oneshot::Sender<bool>),
    StopInventory(oneshot::Sender<bool>),
    IsInitialized(oneshot::Sender<bool>),
    State(oneshot::Sender<ReaderState>),
    Stats(oneshot::Sender<ScanStats>),
    Transitions(usize, oneshot::Sender<Vec<StateTransition>>),
    SubscribeTags(oneshot::Sender<TagStream>),
    SubscribeStates(oneshot::Sender<StateStream>),
}

/// Handle to a running UHF reader.
///
/// Dropping every handle stops the reader task, which releases the device.
///
/// # Examples
///
/// ```
/// use uhf_core::ReaderState;
/// use uhf_hardware::mock::MockGateway;
/// use uhf_reader::Reader;
///
/// #[tokio::main]
/// async fn main() {
///     let (gateway, _handle) = MockGateway::new();
///     let reader = Reader::new(gateway);
///     let mut states = reader.subscribe_states().await;
///
///     assert!(reader.init().await);
///     assert_eq!(states.recv().await, Some(ReaderState::Initializing));
///     assert_eq!(states.recv().await, Some(ReaderState::Ready));
///     assert_eq!(reader.get_power().await, Some(26));
///
///     reader.shutdown().await.unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct Reader {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl Reader {
    /// Spawn a reader with the default configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new<G: DeviceGateway>(gateway: G) -> Self {
        Self::spawn(Arc::new(gateway), ReaderConfig::default())
    }

    /// Spawn a reader with `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_config<G: DeviceGateway>(gateway: G, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::spawn(Arc::new(gateway), config))
    }

    fn spawn<G: DeviceGateway>(gateway: Arc<G>, config: ReaderConfig) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (round_tx, round_rx) = mpsc::unbounded_channel();
        let (rearm_tx, rearm_rx) = mpsc::unbounded_channel();

        let actor = ReaderActor::new(gateway, config, round_tx, rearm_tx);
        let task = tokio::spawn(actor.run(command_rx, round_rx, rearm_rx));

        Self { commands, task }
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> Result<R> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| Error::ReaderStopped)?;
        rx.await.map_err(|_| Error::ReaderStopped)
    }

    /// Initialize the radio and apply the default power.
    ///
    /// Emits `initializing` then `ready` or `error`.
    pub async fn init(&self) -> bool {
        self.request(Command::Init).await.unwrap_or_else(|e| {
            warn!(error = %e, "init request not delivered");
            false
        })
    }

    /// Stop scanning, release the radio and emit `disposed`.
    pub async fn dispose(&self) {
        if let Err(e) = self.request(Command::Dispose).await {
            warn!(error = %e, "dispose request not delivered");
        }
    }

    /// Set transmit power in dBm.
    pub async fn set_power(&self, dbm: i32) -> bool {
        self.request(|tx| Command::SetPower(dbm, tx))
            .await
            .unwrap_or(false)
    }

    /// Read transmit power, falling back to the last confirmed value.
    pub async fn get_power(&self) -> Option<i32> {
        self.request(Command::GetPower).await.unwrap_or(None)
    }

    /// Start continuous inventory.
    ///
    /// Returns `false` if the radio is not initialized. Starting while
    /// already scanning succeeds without issuing another round.
    pub async fn start_inventory(&self) -> bool {
        self.request(Command::StartInventory)
            .await
            .unwrap_or(false)
    }

    /// Stop continuous inventory. The state moves to `ready` immediately.
    pub async fn stop_inventory(&self) -> bool {
        self.request(Command::StopInventory)
            .await
            .unwrap_or(false)
    }

    /// Whether the radio is initialized.
    pub async fn is_initialized(&self) -> bool {
        self.request(Command::IsInitialized)
            .await
            .unwrap_or(false)
    }

    /// Current lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReaderStopped` if the reader task has exited.
    pub async fn state(&self) -> Result<ReaderState> {
        self.request(Command::State).await
    }

    /// Scan loop counters.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReaderStopped` if the reader task has exited.
    pub async fn scan_stats(&self) -> Result<ScanStats> {
        self.request(Command::Stats).await
    }

    /// The last `count` lifecycle transitions, oldest first.
    ///
    /// At most 100 transitions are retained.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReaderStopped` if the reader task has exited.
    pub async fn transitions(&self, count: usize) -> Result<Vec<StateTransition>> {
        self.request(|tx| Command::Transitions(count, tx)).await
    }

    /// Subscribe to tag events, replacing any previous subscriber.
    ///
    /// The returned stream is already ended if the reader task has exited.
    pub async fn subscribe_tags(&self) -> TagStream {
        self.request(Command::SubscribeTags)
            .await
            .unwrap_or_else(|_| EventStream::closed())
    }

    /// Subscribe to state events, replacing any previous subscriber.
    ///
    /// The returned stream is already ended if the reader task has exited.
    pub async fn subscribe_states(&self) -> StateStream {
        self.request(Command::SubscribeStates)
            .await
            .unwrap_or_else(|_| EventStream::closed())
    }

    /// Stop the reader task and wait for it to release the device.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReaderStopped` if the task panicked.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.commands);
        match self.task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => {
                error!(error = %e, "reader task panicked");
                Err(Error::ReaderStopped)
            }
        }
    }
}

/// Single owner of the reader state.
struct ReaderActor<G> {
    gateway: Arc<G>,
    config: ReaderConfig,
    lifecycle: Lifecycle,
    power: PowerController<G>,
    scheduler: ScanScheduler,
    dispatcher: EventDispatcher,
    round_tx: mpsc::UnboundedSender<RoundEvent>,
    rearm_tx: mpsc::UnboundedSender<u64>,
    rearm_timer: Option<JoinHandle<()>>,
}

impl<G: DeviceGateway> ReaderActor<G> {
    fn new(
        gateway: Arc<G>,
        config: ReaderConfig,
        round_tx: mpsc::UnboundedSender<RoundEvent>,
        rearm_tx: mpsc::UnboundedSender<u64>,
    ) -> Self {
        Self {
            power: PowerController::new(Arc::clone(&gateway)),
            scheduler: ScanScheduler::new(config.success_backoff(), config.failure_backoff()),
            gateway,
            config,
            lifecycle: Lifecycle::new(),
            dispatcher: EventDispatcher::new(),
            round_tx,
            rearm_tx,
            rearm_timer: None,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut rounds: mpsc::UnboundedReceiver<RoundEvent>,
        mut rearms: mpsc::UnboundedReceiver<u64>,
    ) {
        debug!("reader task started");
        loop {
            tokio::select! {
                Some(event) = rounds.recv() => self.handle_round_event(event),
                Some(token) = rearms.recv() => self.handle_rearm(token),
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }
        self.release();
        debug!("reader task stopped");
    }

    fn handle_command(&mut self, command: Command) {
        // A dropped reply receiver means the caller gave up; the work is done anyway.
        match command {
            Command::Init(reply) => {
                let _ = reply.send(self.init());
            }
            Command::Dispose(reply) => {
                self.dispose();
                let _ = reply.send(());
            }
            Command::SetPower(dbm, reply) => {
                let _ = reply.send(self.power.set_power(dbm));
            }
            Command::GetPower(reply) => {
                let _ = reply.send(self.power.get_power());
            }
            Command::StartInventory(reply) => {
                let _ = reply.send(self.start_inventory());
            }
            Command::StopInventory(reply) => {
                let _ = reply.send(self.stop_inventory());
            }
            Command::IsInitialized(reply) => {
                let _ = reply.send(self.gateway.is_initialized());
            }
            Command::State(reply) => {
                let _ = reply.send(self.lifecycle.current());
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.scheduler.stats());
            }
            Command::Transitions(count, reply) => {
                let _ = reply.send(self.lifecycle.last_transitions(count));
            }
            Command::SubscribeTags(reply) => {
                let (tx, stream) = stream_channel();
                self.dispatcher.attach_tags(tx);
                let _ = reply.send(stream);
            }
            Command::SubscribeStates(reply) => {
                let (tx, stream) = stream_channel();
                self.dispatcher.attach_states(tx);
                let _ = reply.send(stream);
            }
        }
    }

    /// Apply a lifecycle event and publish the new state if it changed.
    fn transition(&mut self, event: LifecycleEvent) -> bool {
        match self.lifecycle.apply(event) {
            Ok(Some(transition)) => {
                info!(from = %transition.from, state = %transition.to, %event, "reader state changed");
                self.dispatcher.publish_state(transition.to);
                true
            }
            Ok(None) => true,
            Err(e) => {
                warn!(error = %e, "lifecycle event rejected");
                false
            }
        }
    }

    fn init(&mut self) -> bool {
        match self.lifecycle.current() {
            ReaderState::Disposed => {
                warn!("init requested after dispose");
                return false;
            }
            ReaderState::Ready | ReaderState::Scanning => {
                debug!("init requested while already initialized");
                return self.gateway.is_initialized();
            }
            _ => {}
        }

        if !self.transition(LifecycleEvent::InitRequested) {
            return false;
        }

        match self.gateway.init() {
            Ok(()) => {
                let dbm = self.config.default_power_dbm;
                if !self.power.set_power(dbm) {
                    warn!(dbm, "default power not applied");
                }
                self.transition(LifecycleEvent::InitSucceeded);
                true
            }
            Err(e) => {
                error!(error = %e, "radio init failed");
                self.transition(LifecycleEvent::InitFailed);
                false
            }
        }
    }

    fn start_inventory(&mut self) -> bool {
        if self.lifecycle.current().is_terminal() || !self.gateway.is_initialized() {
            error!(state = %self.lifecycle.current(), "cannot start inventory: device not initialized");
            return false;
        }

        match self.scheduler.request_start() {
            StartDecision::AlreadyActive => {
                debug!("inventory already running");
                true
            }
            StartDecision::AwaitInFlight => {
                self.transition(LifecycleEvent::StartRequested);
                debug!("inventory resumed, waiting for outstanding round");
                true
            }
            StartDecision::IssueRound => {
                self.transition(LifecycleEvent::StartRequested);
                self.issue_round();
                true
            }
        }
    }

    fn stop_inventory(&mut self) -> bool {
        self.scheduler.request_stop();
        self.cancel_rearm();
        if self.lifecycle.current() == ReaderState::Scanning {
            self.transition(LifecycleEvent::ScanStopped);
        }
        info!(in_flight = ?self.scheduler.in_flight(), "inventory stopped");
        true
    }

    fn issue_round(&mut self) {
        let round_id = self.scheduler.begin_round();
        let sink = RoundSink::new(round_id, self.round_tx.clone());
        debug!(round_id, max_tags = MAX_TAGS_PER_ROUND, "issuing inventory round");

        // A refused round drops its sink, which reports it as abandoned and
        // drives the failure backoff.
        if let Err(e) = self.gateway.run_inventory_round(MAX_TAGS_PER_ROUND, sink) {
            warn!(round_id, error = %e, "inventory round refused");
        }
    }

    fn handle_round_event(&mut self, event: RoundEvent) {
        match event {
            RoundEvent::Tag {
                round_id,
                detection,
            } => self.forward_tag(round_id, &detection),
            RoundEvent::Done { round_id, outcome } => self.finish_round(round_id, outcome),
        }
    }

    fn forward_tag(&mut self, round_id: u64, detection: &TagDetection) {
        if self.lifecycle.current().is_terminal() {
            debug!(round_id, "dropping tag after dispose");
            return;
        }
        debug!(round_id, epc = %detection.epc_hex(), "tag detected");
        self.scheduler.record_tag();
        self.dispatcher.publish_tag(detection);
    }

    fn finish_round(&mut self, round_id: u64, outcome: RoundOutcome) {
        match outcome {
            RoundOutcome::Success {
                tag_count,
                read_count,
            } => debug!(round_id, tag_count, read_count, "inventory round finished"),
            RoundOutcome::Failure { error_code } => {
                warn!(round_id, error_code, "inventory round failed");
            }
        }

        match self.scheduler.complete_round(round_id, &outcome) {
            RoundFollowUp::Rearm { token, delay } => self.schedule_rearm(token, delay),
            RoundFollowUp::Stopped => {
                if self.lifecycle.current() == ReaderState::Scanning {
                    self.transition(LifecycleEvent::ScanStopped);
                }
            }
            RoundFollowUp::Stale => {
                debug!(round_id, "ignoring completion of unknown round");
            }
        }
    }

    fn schedule_rearm(&mut self, token: u64, delay: Duration) {
        self.cancel_rearm();
        let tx = self.rearm_tx.clone();
        debug!(token, delay_ms = delay.as_millis() as u64, "re-arming inventory");
        self.rearm_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(token);
        }));
    }

    fn cancel_rearm(&mut self) {
        if let Some(timer) = self.rearm_timer.take() {
            timer.abort();
        }
    }

    fn handle_rearm(&mut self, token: u64) {
        if !self.scheduler.rearm_due(token) {
            debug!(token, "ignoring stale re-arm");
            return;
        }
        self.rearm_timer = None;
        self.transition(LifecycleEvent::RoundContinued);
        self.issue_round();
    }

    fn dispose(&mut self) {
        self.scheduler.request_stop();
        self.cancel_rearm();
        if self.gateway.is_initialized() {
            self.gateway.deinit();
        }
        self.power.forget();
        self.transition(LifecycleEvent::DisposeRequested);
    }

    fn release(&mut self) {
        if self.lifecycle.current() != ReaderState::Disposed {
            self.dispose();
        } else {
            self.cancel_rearm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uhf_hardware::mock::MockGateway;

    #[tokio::test]
    async fn test_shutdown_releases_device() {
        let (gateway, handle) = MockGateway::new();
        let reader = Reader::new(gateway);

        assert!(reader.init().await);
        reader.shutdown().await.unwrap();

        assert!(!handle.is_initialized());
        assert_eq!(handle.deinit_calls(), 1);
    }

    #[tokio::test]
    async fn test_requests_after_task_exit_fall_back() {
        let (gateway, _handle) = MockGateway::new();
        let reader = Reader::new(gateway);
        reader.task.abort();
        tokio::task::yield_now().await;

        assert!(!reader.init().await);
        assert_eq!(reader.get_power().await, None);
        assert!(matches!(reader.state().await, Err(Error::ReaderStopped)));

        let mut tags = reader.subscribe_tags().await;
        assert!(tags.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_with_config_rejects_invalid() {
        let (gateway, _handle) = MockGateway::new();
        let config = ReaderConfig::default().with_failure_backoff(Duration::from_millis(50));
        assert!(matches!(
            Reader::with_config(gateway, config),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_default_power() {
        let (gateway, handle) = MockGateway::new();
        let config = ReaderConfig::default().with_default_power(18);
        let reader = Reader::with_config(gateway, config).unwrap();

        assert!(reader.init().await);
        assert_eq!(handle.power_writes(), vec![18]);
        assert_eq!(reader.get_power().await, Some(18));
    }
}
