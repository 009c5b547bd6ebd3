//! Continuous inventory policy.
//!
//! [`ScanScheduler`] decides when rounds are issued and re-armed. It does not
//! touch the device or the clock: the reader task asks it for a decision,
//! performs the I/O, and reports back. Keeping the policy free of I/O lets the
//! at-most-one-round rule be checked in isolation.
//!
//! Re-arm requests carry a token. Only the most recent token is honoured, and
//! stopping clears it, so a timer armed before a stop/start cycle cannot issue
//! an extra round.

use std::time::Duration;

use serde::Serialize;
use uhf_core::RoundOutcome;

/// Counters for the scan loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub rounds_issued: u64,
    pub rounds_succeeded: u64,
    pub rounds_failed: u64,
    pub tags_forwarded: u64,
    /// Failed rounds since the last success.
    pub consecutive_failures: u32,
    /// Error code of the most recent failed round.
    pub last_error_code: Option<i32>,
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// Scanning was already requested; nothing changes.
    AlreadyActive,
    /// Issue a round now.
    IssueRound,
    /// A round is still out; its completion re-arms.
    AwaitInFlight,
}

/// What to do once a round has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundFollowUp {
    /// Issue the next round after `delay`, presenting `token` when it fires.
    Rearm { token: u64, delay: Duration },
    /// Scanning is no longer wanted.
    Stopped,
    /// The completion does not belong to the outstanding round.
    Stale,
}

/// Scan loop state: `desired`, the outstanding round and the re-arm token.
#[derive(Debug)]
pub struct ScanScheduler {
    success_backoff: Duration,
    failure_backoff: Duration,
    desired: bool,
    in_flight: Option<u64>,
    next_round_id: u64,
    next_token: u64,
    pending_rearm: Option<u64>,
    stats: ScanStats,
}

impl ScanScheduler {
    pub fn new(success_backoff: Duration, failure_backoff: Duration) -> Self {
        Self {
            success_backoff,
            failure_backoff,
            desired: false,
            in_flight: None,
            next_round_id: 1,
            next_token: 1,
            pending_rearm: None,
            stats: ScanStats::default(),
        }
    }

    /// Whether a round is outstanding.
    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Identifier of the outstanding round.
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Request continuous scanning.
    pub fn request_start(&mut self) -> StartDecision {
        if self.desired {
            return StartDecision::AlreadyActive;
        }
        self.desired = true;
        if self.in_flight.is_some() {
            StartDecision::AwaitInFlight
        } else {
            StartDecision::IssueRound
        }
    }

    /// Withdraw the scanning request.
    ///
    /// Any pending re-arm is cancelled. An outstanding round is left to
    /// finish. Returns whether scanning had been requested.
    pub fn request_stop(&mut self) -> bool {
        let was_desired = self.desired;
        self.desired = false;
        self.pending_rearm = None;
        was_desired
    }

    /// Mark a new round as outstanding and return its id.
    ///
    /// Callers only issue after `IssueRound` or a due re-arm, so no other
    /// round is outstanding here.
    pub fn begin_round(&mut self) -> u64 {
        debug_assert!(self.in_flight.is_none(), "round issued while another is outstanding");
        let round_id = self.next_round_id;
        self.next_round_id += 1;
        self.in_flight = Some(round_id);
        self.stats.rounds_issued += 1;
        round_id
    }

    /// Count a forwarded tag.
    pub fn record_tag(&mut self) {
        self.stats.tags_forwarded += 1;
    }

    /// Record the outcome of `round_id` and decide the follow-up.
    pub fn complete_round(&mut self, round_id: u64, outcome: &RoundOutcome) -> RoundFollowUp {
        if self.in_flight != Some(round_id) {
            return RoundFollowUp::Stale;
        }
        self.in_flight = None;

        let delay = match outcome {
            RoundOutcome::Success { .. } => {
                self.stats.rounds_succeeded += 1;
                self.stats.consecutive_failures = 0;
                self.success_backoff
            }
            RoundOutcome::Failure { error_code } => {
                self.stats.rounds_failed += 1;
                self.stats.consecutive_failures += 1;
                self.stats.last_error_code = Some(*error_code);
                self.failure_backoff
            }
        };

        if !self.desired {
            return RoundFollowUp::Stopped;
        }

        let token = self.next_token;
        self.next_token += 1;
        self.pending_rearm = Some(token);
        RoundFollowUp::Rearm { token, delay }
    }

    /// Consume a fired re-arm token.
    ///
    /// Returns `true` if the caller should issue the next round now.
    pub fn rearm_due(&mut self, token: u64) -> bool {
        if self.pending_rearm != Some(token) || !self.desired || self.in_flight.is_some() {
            return false;
        }
        self.pending_rearm = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SUCCESS: RoundOutcome = RoundOutcome::Success {
        tag_count: 2,
        read_count: 2,
    };
    const FAILURE: RoundOutcome = RoundOutcome::Failure { error_code: 11 };

    fn scheduler() -> ScanScheduler {
        ScanScheduler::new(Duration::from_millis(100), Duration::from_millis(500))
    }

    fn rearm_token(follow_up: RoundFollowUp) -> u64 {
        match follow_up {
            RoundFollowUp::Rearm { token, .. } => token,
            other => panic!("expected rearm, got {other:?}"),
        }
    }

    #[test]
    fn test_start_issues_once() {
        let mut s = scheduler();
        assert_eq!(s.request_start(), StartDecision::IssueRound);
        s.begin_round();
        assert_eq!(s.request_start(), StartDecision::AlreadyActive);
        assert!(s.is_running());
        assert_eq!(s.stats().rounds_issued, 1);
    }

    #[rstest]
    #[case(SUCCESS, Duration::from_millis(100))]
    #[case(FAILURE, Duration::from_millis(500))]
    fn test_backoff_by_outcome(#[case] outcome: RoundOutcome, #[case] expected: Duration) {
        let mut s = scheduler();
        s.request_start();
        let id = s.begin_round();

        match s.complete_round(id, &outcome) {
            RoundFollowUp::Rearm { delay, .. } => assert_eq!(delay, expected),
            other => panic!("expected rearm, got {other:?}"),
        }
        assert!(!s.is_running());
    }

    #[test]
    fn test_stop_while_in_flight() {
        let mut s = scheduler();
        s.request_start();
        let id = s.begin_round();

        assert!(s.request_stop());
        assert!(s.is_running(), "stop does not abort the outstanding round");
        assert_eq!(s.complete_round(id, &SUCCESS), RoundFollowUp::Stopped);
        assert!(!s.is_running());
    }

    #[test]
    fn test_start_during_in_flight_waits() {
        let mut s = scheduler();
        s.request_start();
        let id = s.begin_round();
        s.request_stop();

        assert_eq!(s.request_start(), StartDecision::AwaitInFlight);
        let token = rearm_token(s.complete_round(id, &SUCCESS));
        assert!(s.rearm_due(token));
    }

    #[test]
    fn test_stale_token_after_restart() {
        let mut s = scheduler();
        s.request_start();
        let id = s.begin_round();
        let old = rearm_token(s.complete_round(id, &SUCCESS));

        s.request_stop();
        assert_eq!(s.request_start(), StartDecision::IssueRound);
        s.begin_round();

        assert!(!s.rearm_due(old));
    }

    #[test]
    fn test_token_is_single_use() {
        let mut s = scheduler();
        s.request_start();
        let id = s.begin_round();
        let token = rearm_token(s.complete_round(id, &SUCCESS));

        assert!(s.rearm_due(token));
        assert!(!s.rearm_due(token));
    }

    #[test]
    fn test_unknown_round_is_stale() {
        let mut s = scheduler();
        s.request_start();
        let id = s.begin_round();

        assert_eq!(s.complete_round(id + 1, &SUCCESS), RoundFollowUp::Stale);
        assert!(s.is_running());
        assert_eq!(s.stats().rounds_succeeded, 0);
    }

    #[test]
    fn test_stats_track_failures() {
        let mut s = scheduler();
        s.request_start();

        for _ in 0..2 {
            let id = s.begin_round();
            let token = rearm_token(s.complete_round(id, &FAILURE));
            assert!(s.rearm_due(token));
        }
        assert_eq!(s.stats().consecutive_failures, 2);
        assert_eq!(s.stats().last_error_code, Some(11));

        let id = s.begin_round();
        s.record_tag();
        s.complete_round(id, &SUCCESS);

        let stats = s.stats();
        assert_eq!(stats.rounds_issued, 3);
        assert_eq!(stats.rounds_failed, 2);
        assert_eq!(stats.rounds_succeeded, 1);
        assert_eq!(stats.tags_forwarded, 1);
        assert_eq!(stats.consecutive_failures, 0);
    }
}
