//! Tag and state event delivery.
//!
//! Each stream has at most one subscriber. Publishing is a non-blocking send
//! into an unbounded channel; with no subscriber the event is dropped.

use tokio::sync::mpsc;
use tracing::debug;
use uhf_core::{ReaderState, TagDetection, TagEvent};

/// Receiving end of an event subscription.
///
/// The stream ends (`recv` returns `None`) when it is replaced by a newer
/// subscription or the reader shuts down.
#[derive(Debug)]
pub struct EventStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

/// Stream of detected tags.
pub type TagStream = EventStream<TagEvent>;

/// Stream of lifecycle states.
pub type StateStream = EventStream<ReaderState>;

impl<T> EventStream<T> {
    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next event if one is waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// A stream that has already ended.
    pub fn closed() -> Self {
        let (_, stream) = stream_channel();
        stream
    }
}

/// Create a connected sender and stream.
pub fn stream_channel<T>() -> (mpsc::UnboundedSender<T>, EventStream<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, EventStream { rx })
}

/// Relays events to the current subscriber of each stream.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    tags: Option<mpsc::UnboundedSender<TagEvent>>,
    states: Option<mpsc::UnboundedSender<ReaderState>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `tx` as the tag subscriber, ending any previous stream.
    pub fn attach_tags(&mut self, tx: mpsc::UnboundedSender<TagEvent>) {
        if self.tags.replace(tx).is_some() {
            debug!("tag subscriber replaced");
        }
    }

    /// Install `tx` as the state subscriber, ending any previous stream.
    pub fn attach_states(&mut self, tx: mpsc::UnboundedSender<ReaderState>) {
        if self.states.replace(tx).is_some() {
            debug!("state subscriber replaced");
        }
    }

    /// Forward a detection to the tag subscriber.
    pub fn publish_tag(&mut self, detection: &TagDetection) {
        if let Some(tx) = &self.tags {
            if tx.send(TagEvent::from(detection)).is_err() {
                debug!("tag subscriber gone");
                self.tags = None;
            }
        }
    }

    /// Forward a state change to the state subscriber.
    pub fn publish_state(&mut self, state: ReaderState) {
        if let Some(tx) = &self.states {
            if tx.send(state).is_err() {
                debug!("state subscriber gone");
                self.states = None;
            }
        }
    }
}
