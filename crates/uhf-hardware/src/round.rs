//! Inventory round callbacks.
//!
//! A driver reports an inventory round through a [`RoundSink`]: zero or more
//! [`RoundSink::tag`] calls followed by exactly one [`RoundSink::finish`].
//! `finish` consumes the sink, so a second terminal outcome cannot be
//! reported, and dropping a sink without finishing reports an abandoned round.
//! Both calls are plain channel sends and are safe from any thread.

use tokio::sync::mpsc;
use uhf_core::constants::ROUND_ABANDONED;
use uhf_core::{RoundOutcome, TagDetection};

/// Callback delivered by a running inventory round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    /// A tag was seen.
    Tag {
        round_id: u64,
        detection: TagDetection,
    },

    /// The round finished.
    Done { round_id: u64, outcome: RoundOutcome },
}

impl RoundEvent {
    /// Round this event belongs to.
    pub fn round_id(&self) -> u64 {
        match self {
            Self::Tag { round_id, .. } | Self::Done { round_id, .. } => *round_id,
        }
    }
}

/// Reporting handle for one inventory round.
#[derive(Debug)]
pub struct RoundSink {
    round_id: u64,
    tx: mpsc::UnboundedSender<RoundEvent>,
    finished: bool,
}

impl RoundSink {
    /// Create a sink that reports into `tx`.
    pub fn new(round_id: u64, tx: mpsc::UnboundedSender<RoundEvent>) -> Self {
        Self {
            round_id,
            tx,
            finished: false,
        }
    }

    /// Create a sink together with its receiving end.
    ///
    /// # Examples
    ///
    /// ```
    /// use uhf_core::TagDetection;
    /// use uhf_hardware::{RoundEvent, RoundSink};
    ///
    /// let (sink, mut events) = RoundSink::channel(7);
    /// sink.tag(TagDetection::new(vec![0x01]));
    /// drop(sink);
    ///
    /// assert!(matches!(events.try_recv(), Ok(RoundEvent::Tag { round_id: 7, .. })));
    /// assert!(matches!(events.try_recv(), Ok(RoundEvent::Done { round_id: 7, .. })));
    /// ```
    pub fn channel(round_id: u64) -> (Self, mpsc::UnboundedReceiver<RoundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(round_id, tx), rx)
    }

    /// Identifier of the round this sink reports for.
    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    /// Report a tag seen during the round.
    pub fn tag(&self, detection: TagDetection) {
        // Receiver gone means the reader shut down; nothing left to notify.
        let _ = self.tx.send(RoundEvent::Tag {
            round_id: self.round_id,
            detection,
        });
    }

    /// Report the terminal outcome of the round.
    pub fn finish(mut self, outcome: RoundOutcome) {
        self.finished = true;
        let _ = self.tx.send(RoundEvent::Done {
            round_id: self.round_id,
            outcome,
        });
    }
}

impl Drop for RoundSink {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(round_id = self.round_id, "inventory round dropped without outcome");
            let _ = self.tx.send(RoundEvent::Done {
                round_id: self.round_id,
                outcome: RoundOutcome::Failure {
                    error_code: ROUND_ABANDONED,
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_precede_done() {
        let (sink, mut rx) = RoundSink::channel(3);
        sink.tag(TagDetection::new(vec![0xAA, 0xBB]));
        sink.tag(TagDetection::new(vec![0xCC, 0xDD]));
        sink.finish(RoundOutcome::Success {
            tag_count: 2,
            read_count: 2,
        });

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        let done = rx.try_recv().unwrap();

        assert!(matches!(first, RoundEvent::Tag { round_id: 3, .. }));
        assert!(matches!(second, RoundEvent::Tag { round_id: 3, .. }));
        assert_eq!(
            done,
            RoundEvent::Done {
                round_id: 3,
                outcome: RoundOutcome::Success {
                    tag_count: 2,
                    read_count: 2
                }
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_finish_reports_exactly_once() {
        let (sink, mut rx) = RoundSink::channel(1);
        sink.finish(RoundOutcome::Failure { error_code: 4 });

        assert!(matches!(rx.try_recv(), Ok(RoundEvent::Done { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_without_finish_reports_abandoned() {
        let (sink, mut rx) = RoundSink::channel(9);
        drop(sink);

        assert_eq!(
            rx.try_recv().unwrap(),
            RoundEvent::Done {
                round_id: 9,
                outcome: RoundOutcome::Failure {
                    error_code: ROUND_ABANDONED
                }
            }
        );
    }

    #[test]
    fn test_sink_survives_closed_receiver() {
        let (sink, rx) = RoundSink::channel(2);
        drop(rx);
        sink.tag(TagDetection::new(vec![0x01]));
        sink.finish(RoundOutcome::Failure { error_code: 1 });
    }

    #[test]
    fn test_sink_is_usable_from_driver_thread() {
        let (sink, mut rx) = RoundSink::channel(5);
        std::thread::spawn(move || {
            sink.tag(TagDetection::new(vec![0x0A]));
            sink.finish(RoundOutcome::Success {
                tag_count: 1,
                read_count: 1,
            });
        })
        .join()
        .unwrap();

        assert_eq!(rx.try_recv().unwrap().round_id(), 5);
        assert_eq!(rx.try_recv().unwrap().round_id(), 5);
    }
}
