//! Autonomous simulated gateway.
//!
//! Unlike [`MockGateway`](super::MockGateway), rounds complete on their own:
//! each round runs on a dedicated driver thread, sleeps for the configured
//! round duration, reports a fixed tag population and finishes. Every
//! `fail_every`-th round can be made to fail instead.

use crate::{DeviceGateway, HardwareError, Result, RoundSink};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;
use uhf_core::{RoundOutcome, TagDetection};

/// Behaviour of a [`SimulatedGateway`].
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Tags reported by every successful round.
    pub tags: Vec<TagDetection>,

    /// Time a round spends "on air" before reporting.
    pub round_duration: Duration,

    /// Fail every n-th round (1-based) when set.
    pub fail_every: Option<u32>,

    /// Error code reported by failing rounds.
    pub error_code: i32,

    /// Power reported before any `set_power`.
    pub initial_power: i32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tags: vec![
                TagDetection::new(vec![0xE2, 0x00, 0x68, 0x11, 0x00, 0x00, 0x00, 0x01])
                    .with_rssi(-48)
                    .with_antenna(1)
                    .with_frequency_khz(920_625),
                TagDetection::new(vec![0xE2, 0x00, 0x68, 0x11, 0x00, 0x00, 0x00, 0x02])
                    .with_rssi(-61)
                    .with_antenna(1)
                    .with_frequency_khz(921_125),
            ],
            round_duration: Duration::from_millis(50),
            fail_every: None,
            error_code: 0x0B,
            initial_power: 30,
        }
    }
}

/// Simulated UHF reader that completes rounds from a driver thread.
///
/// # Examples
///
/// ```
/// use uhf_hardware::{DeviceGateway, RoundEvent, RoundSink};
/// use uhf_hardware::mock::{SimulatedGateway, SimulationConfig};
///
/// let gateway = SimulatedGateway::new(SimulationConfig::default());
/// gateway.init().unwrap();
///
/// let (sink, mut events) = RoundSink::channel(1);
/// gateway.run_inventory_round(255, sink).unwrap();
///
/// let mut tags = 0;
/// while let Some(event) = events.blocking_recv() {
///     match event {
///         RoundEvent::Tag { .. } => tags += 1,
///         RoundEvent::Done { .. } => break,
///     }
/// }
/// assert_eq!(tags, 2);
/// ```
#[derive(Debug)]
pub struct SimulatedGateway {
    config: SimulationConfig,
    state: Mutex<SimState>,
}

#[derive(Debug)]
struct SimState {
    initialized: bool,
    power: i32,
    rounds: u32,
}

impl SimulatedGateway {
    /// Create a simulated gateway.
    pub fn new(config: SimulationConfig) -> Self {
        let state = SimState {
            initialized: false,
            power: config.initial_power,
            rounds: 0,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn should_fail(&self, round_no: u32) -> bool {
        self.config
            .fail_every
            .is_some_and(|n| n > 0 && round_no % n == 0)
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl DeviceGateway for SimulatedGateway {
    fn init(&self) -> Result<()> {
        self.state().initialized = true;
        debug!("simulated radio initialized");
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    fn deinit(&self) {
        self.state().initialized = false;
        debug!("simulated radio released");
    }

    fn set_power(&self, dbm: i32) -> Result<()> {
        let mut state = self.state();
        if !state.initialized {
            return Err(HardwareError::NotInitialized);
        }
        state.power = dbm;
        Ok(())
    }

    fn get_power(&self) -> Result<i32> {
        let state = self.state();
        if !state.initialized {
            return Err(HardwareError::NotInitialized);
        }
        Ok(state.power)
    }

    fn run_inventory_round(&self, max_tags: u16, sink: RoundSink) -> Result<()> {
        let round_no = {
            let mut state = self.state();
            if !state.initialized {
                return Err(HardwareError::NotInitialized);
            }
            state.rounds += 1;
            state.rounds
        };

        let fail = self.should_fail(round_no);
        let error_code = self.config.error_code;
        let duration = self.config.round_duration;
        let tags: Vec<TagDetection> = self
            .config
            .tags
            .iter()
            .take(usize::from(max_tags))
            .cloned()
            .collect();

        std::thread::Builder::new()
            .name(format!("uhf-sim-round-{round_no}"))
            .spawn(move || {
                std::thread::sleep(duration);
                if fail {
                    sink.finish(RoundOutcome::Failure { error_code });
                    return;
                }
                let count = tags.len() as u32;
                for tag in tags {
                    sink.tag(tag);
                }
                sink.finish(RoundOutcome::Success {
                    tag_count: count,
                    read_count: count,
                });
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoundEvent;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn quick_config() -> SimulationConfig {
        SimulationConfig {
            round_duration: Duration::from_millis(1),
            ..SimulationConfig::default()
        }
    }

    fn drain(mut events: UnboundedReceiver<RoundEvent>) -> (usize, RoundOutcome) {
        let mut tags = 0;
        while let Some(event) = events.blocking_recv() {
            match event {
                RoundEvent::Tag { .. } => tags += 1,
                RoundEvent::Done { outcome, .. } => return (tags, outcome),
            }
        }
        panic!("round finished without outcome");
    }

    #[test]
    fn test_round_reports_population() {
        let gateway = SimulatedGateway::new(quick_config());
        gateway.init().unwrap();

        let (sink, events) = RoundSink::channel(1);
        gateway.run_inventory_round(255, sink).unwrap();

        let (tags, outcome) = drain(events);
        assert_eq!(tags, 2);
        assert_eq!(
            outcome,
            RoundOutcome::Success {
                tag_count: 2,
                read_count: 2
            }
        );
    }

    #[test]
    fn test_round_respects_tag_bound() {
        let gateway = SimulatedGateway::new(quick_config());
        gateway.init().unwrap();

        let (sink, events) = RoundSink::channel(1);
        gateway.run_inventory_round(1, sink).unwrap();

        let (tags, _) = drain(events);
        assert_eq!(tags, 1);
    }

    #[test]
    fn test_fail_every_nth_round() {
        let gateway = SimulatedGateway::new(SimulationConfig {
            fail_every: Some(2),
            error_code: 5,
            ..quick_config()
        });
        gateway.init().unwrap();

        let mut outcomes = Vec::new();
        for round_id in 1..=4 {
            let (sink, events) = RoundSink::channel(round_id);
            gateway.run_inventory_round(255, sink).unwrap();
            outcomes.push(drain(events).1.is_success());
        }

        assert_eq!(outcomes, vec![true, false, true, false]);
    }

    #[test]
    fn test_power_requires_init() {
        let gateway = SimulatedGateway::default();
        assert!(gateway.get_power().is_err());

        gateway.init().unwrap();
        assert_eq!(gateway.get_power().unwrap(), 30);
        gateway.set_power(22).unwrap();
        assert_eq!(gateway.get_power().unwrap(), 22);

        gateway.deinit();
        assert!(gateway.set_power(20).is_err());
    }
}
