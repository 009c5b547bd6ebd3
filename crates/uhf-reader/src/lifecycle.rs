//! Reader lifecycle state machine.
//!
//! # States
//!
//! - `Uninitialized`: reader created, radio untouched
//! - `Initializing`: radio init in progress
//! - `Ready`: radio up, not scanning
//! - `Scanning`: continuous inventory requested
//! - `Error`: radio init failed
//! - `Disposed`: reader released (terminal)
//!
//! # Valid Transitions
//!
//! | From | Event | To |
//! |---|---|---|
//! | Uninitialized, Error | `InitRequested` | Initializing |
//! | Initializing | `InitSucceeded` | Ready |
//! | Initializing | `InitFailed` | Error |
//! | Ready, Error, Scanning | `StartRequested` | Scanning |
//! | Scanning | `RoundContinued` | Scanning |
//! | Scanning, Ready | `ScanStopped` | Ready |
//! | any | `DisposeRequested` | Disposed |
//!
//! A transition whose target equals the current state succeeds without
//! changing anything and produces no transition record, so callers emit
//! nothing for it.
//!
//! # Examples
//!
//! ```
//! use uhf_core::ReaderState;
//! use uhf_reader::{Lifecycle, LifecycleEvent};
//!
//! let mut lifecycle = Lifecycle::new();
//! assert_eq!(lifecycle.current(), ReaderState::Uninitialized);
//!
//! let transition = lifecycle.apply(LifecycleEvent::InitRequested).unwrap();
//! assert_eq!(transition.map(|t| t.to), Some(ReaderState::Initializing));
//!
//! // Not in the table
//! assert!(lifecycle.apply(LifecycleEvent::StartRequested).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use uhf_core::constants::MAX_TRANSITION_HISTORY;
use uhf_core::{Error, ReaderState, Result};

/// Inputs that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Caller asked for radio init.
    InitRequested,

    /// Radio init succeeded.
    InitSucceeded,

    /// Radio init failed.
    InitFailed,

    /// Caller asked to start inventory.
    StartRequested,

    /// A round finished and another one was armed.
    RoundContinued,

    /// Inventory stopped, explicitly or because no continuation was wanted.
    ScanStopped,

    /// Caller asked to release the reader.
    DisposeRequested,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleEvent::InitRequested => "InitRequested",
            LifecycleEvent::InitSucceeded => "InitSucceeded",
            LifecycleEvent::InitFailed => "InitFailed",
            LifecycleEvent::StartRequested => "StartRequested",
            LifecycleEvent::RoundContinued => "RoundContinued",
            LifecycleEvent::ScanStopped => "ScanStopped",
            LifecycleEvent::DisposeRequested => "DisposeRequested",
        };
        write!(f, "{}", name)
    }
}

/// Target state for `event` applied in `from`, or `None` if not allowed.
///
/// # Examples
///
/// ```
/// use uhf_core::ReaderState;
/// use uhf_reader::lifecycle::{LifecycleEvent, next_state};
///
/// assert_eq!(
///     next_state(ReaderState::Ready, LifecycleEvent::StartRequested),
///     Some(ReaderState::Scanning)
/// );
/// assert_eq!(next_state(ReaderState::Disposed, LifecycleEvent::InitRequested), None);
/// ```
pub fn next_state(from: ReaderState, event: LifecycleEvent) -> Option<ReaderState> {
    use LifecycleEvent::*;
    use ReaderState::*;

    match (from, event) {
        (Disposed, DisposeRequested) => Some(Disposed),
        (Disposed, _) => None,
        (_, DisposeRequested) => Some(Disposed),
        (Uninitialized | Error, InitRequested) => Some(Initializing),
        (Initializing, InitSucceeded) => Some(Ready),
        (Initializing, InitFailed) => Some(Error),
        (Ready | Error | Scanning, StartRequested) => Some(Scanning),
        (Scanning, RoundContinued) => Some(Scanning),
        (Scanning | Ready, ScanStopped) => Some(Ready),
        _ => None,
    }
}

/// A single state change with timestamp.
///
/// The `timestamp` field is not serialized as `Instant` is process-specific;
/// deserialized records carry the time of deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: ReaderState,

    /// The state transitioned to.
    pub to: ReaderState,

    /// The event that caused it.
    pub event: LifecycleEvent,

    /// When the transition occurred.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    fn new(from: ReaderState, to: ReaderState, event: LifecycleEvent) -> Self {
        Self {
            from,
            to,
            event,
            timestamp: Instant::now(),
        }
    }
}

/// Tracks the current [`ReaderState`] and recent transitions.
///
/// Not synchronized; the reader task is its only owner.
#[derive(Debug)]
pub struct Lifecycle {
    current: ReaderState,
    history: VecDeque<StateTransition>,
}

impl Lifecycle {
    /// Create a lifecycle in `Uninitialized`.
    pub fn new() -> Self {
        Self {
            current: ReaderState::Uninitialized,
            history: VecDeque::with_capacity(MAX_TRANSITION_HISTORY),
        }
    }

    /// Current state.
    pub fn current(&self) -> ReaderState {
        self.current
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// The last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Apply `event`.
    ///
    /// Returns `Ok(Some(transition))` when the state changed and
    /// `Ok(None)` when the event leaves the state as it is.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStateTransition` if the event is not allowed in
    /// the current state. The state is left unchanged.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<Option<StateTransition>> {
        let target = next_state(self.current, event).ok_or_else(|| {
            Error::InvalidStateTransition {
                from: self.current.to_string(),
                event: event.to_string(),
            }
        })?;

        if target == self.current {
            return Ok(None);
        }

        let transition = StateTransition::new(self.current, target, event);
        self.current = target;

        self.history.push_back(transition.clone());
        if self.history.len() > MAX_TRANSITION_HISTORY {
            self.history.pop_front();
        }

        Ok(Some(transition))
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ready() -> Lifecycle {
        let mut lifecycle = Lifecycle::new();
        lifecycle.apply(LifecycleEvent::InitRequested).unwrap();
        lifecycle.apply(LifecycleEvent::InitSucceeded).unwrap();
        lifecycle
    }

    #[test]
    fn test_new_lifecycle_is_uninitialized() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.current(), ReaderState::Uninitialized);
        assert!(lifecycle.history().is_empty());
    }

    #[rstest]
    #[case(ReaderState::Uninitialized, LifecycleEvent::InitRequested, ReaderState::Initializing)]
    #[case(ReaderState::Error, LifecycleEvent::InitRequested, ReaderState::Initializing)]
    #[case(ReaderState::Initializing, LifecycleEvent::InitSucceeded, ReaderState::Ready)]
    #[case(ReaderState::Initializing, LifecycleEvent::InitFailed, ReaderState::Error)]
    #[case(ReaderState::Ready, LifecycleEvent::StartRequested, ReaderState::Scanning)]
    #[case(ReaderState::Error, LifecycleEvent::StartRequested, ReaderState::Scanning)]
    #[case(ReaderState::Scanning, LifecycleEvent::StartRequested, ReaderState::Scanning)]
    #[case(ReaderState::Scanning, LifecycleEvent::RoundContinued, ReaderState::Scanning)]
    #[case(ReaderState::Scanning, LifecycleEvent::ScanStopped, ReaderState::Ready)]
    #[case(ReaderState::Ready, LifecycleEvent::ScanStopped, ReaderState::Ready)]
    #[case(ReaderState::Uninitialized, LifecycleEvent::DisposeRequested, ReaderState::Disposed)]
    #[case(ReaderState::Scanning, LifecycleEvent::DisposeRequested, ReaderState::Disposed)]
    #[case(ReaderState::Disposed, LifecycleEvent::DisposeRequested, ReaderState::Disposed)]
    fn test_allowed_transitions(
        #[case] from: ReaderState,
        #[case] event: LifecycleEvent,
        #[case] to: ReaderState,
    ) {
        assert_eq!(next_state(from, event), Some(to));
    }

    #[rstest]
    #[case(ReaderState::Uninitialized, LifecycleEvent::StartRequested)]
    #[case(ReaderState::Uninitialized, LifecycleEvent::ScanStopped)]
    #[case(ReaderState::Initializing, LifecycleEvent::StartRequested)]
    #[case(ReaderState::Ready, LifecycleEvent::InitRequested)]
    #[case(ReaderState::Ready, LifecycleEvent::RoundContinued)]
    #[case(ReaderState::Scanning, LifecycleEvent::InitSucceeded)]
    #[case(ReaderState::Disposed, LifecycleEvent::InitRequested)]
    #[case(ReaderState::Disposed, LifecycleEvent::StartRequested)]
    #[case(ReaderState::Disposed, LifecycleEvent::ScanStopped)]
    fn test_rejected_transitions(#[case] from: ReaderState, #[case] event: LifecycleEvent) {
        assert_eq!(next_state(from, event), None);
    }

    #[test]
    fn test_init_flow_records_history() {
        let lifecycle = ready();
        assert_eq!(lifecycle.current(), ReaderState::Ready);

        let history = lifecycle.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, ReaderState::Uninitialized);
        assert_eq!(history[0].to, ReaderState::Initializing);
        assert_eq!(history[1].to, ReaderState::Ready);
        assert_eq!(history[1].event, LifecycleEvent::InitSucceeded);
    }

    #[test]
    fn test_self_transition_is_silent() {
        let mut lifecycle = ready();
        lifecycle.apply(LifecycleEvent::StartRequested).unwrap();

        let repeat = lifecycle.apply(LifecycleEvent::StartRequested).unwrap();
        assert!(repeat.is_none());
        let rearm = lifecycle.apply(LifecycleEvent::RoundContinued).unwrap();
        assert!(rearm.is_none());

        assert_eq!(lifecycle.current(), ReaderState::Scanning);
        assert_eq!(lifecycle.history().len(), 3);
    }

    #[test]
    fn test_rejected_transition_keeps_state() {
        let mut lifecycle = Lifecycle::new();
        let result = lifecycle.apply(LifecycleEvent::StartRequested);

        assert!(matches!(
            result,
            Err(Error::InvalidStateTransition { .. })
        ));
        assert_eq!(lifecycle.current(), ReaderState::Uninitialized);
        assert!(lifecycle.history().is_empty());
    }

    #[test]
    fn test_dispose_is_terminal() {
        let mut lifecycle = ready();
        let transition = lifecycle
            .apply(LifecycleEvent::DisposeRequested)
            .unwrap()
            .unwrap();
        assert_eq!(transition.to, ReaderState::Disposed);

        assert!(lifecycle.apply(LifecycleEvent::InitRequested).is_err());
        assert!(
            lifecycle
                .apply(LifecycleEvent::DisposeRequested)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_history_size_limit() {
        let mut lifecycle = ready();
        for _ in 0..MAX_TRANSITION_HISTORY {
            lifecycle.apply(LifecycleEvent::StartRequested).unwrap();
            lifecycle.apply(LifecycleEvent::ScanStopped).unwrap();
        }

        assert_eq!(lifecycle.history().len(), MAX_TRANSITION_HISTORY);
        let last = lifecycle.last_transitions(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].to, ReaderState::Scanning);
        assert_eq!(last[1].to, ReaderState::Ready);
    }

    #[test]
    fn test_event_display_and_serialization() {
        assert_eq!(LifecycleEvent::ScanStopped.to_string(), "ScanStopped");
        let json = serde_json::to_string(&LifecycleEvent::InitRequested).unwrap();
        assert_eq!(json, "\"init_requested\"");
    }
}
