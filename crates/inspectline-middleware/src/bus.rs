//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others, and so the single-threaded line loop never waits on a slow
//! consumer.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Motion`] | Items reaching the end of the line |
//! | [`Topic::Inspection`] | Arrivals at the inspection point and applied verdicts |
//! | [`Topic::Actuator`] | Pusher phase changes |
//! | [`Topic::Audit`] | One record per processed item, plus faults |

use inspectline_types::Event;
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Motion,
    Inspection,
    Actuator,
    Audit,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    motion: broadcast::Sender<Event>,
    inspection: broadcast::Sender<Event>,
    actuator: broadcast::Sender<Event>,
    audit: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus. `capacity` applies to every topic channel
    /// independently and must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let (motion, _) = broadcast::channel(capacity);
        let (inspection, _) = broadcast::channel(capacity);
        let (actuator, _) = broadcast::channel(capacity);
        let (audit, _) = broadcast::channel(capacity);
        Self {
            motion,
            inspection,
            actuator,
            audit,
        }
    }

    /// Publish `event` to `topic`.
    ///
    /// Returns the number of subscribers handed the event.  Publishing with
    /// nobody listening is normal and returns `0`.
    pub fn publish_to(&self, topic: Topic, event: Event) -> usize {
        match self.topic_sender(topic).send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                trace!(?topic, id = %event.id, "no subscribers; event dropped");
                0
            }
        }
    }

    /// Subscribe to one topic.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Motion => &self.motion,
            Topic::Inspection => &self.inspection,
            Topic::Actuator => &self.actuator,
            Topic::Audit => &self.audit,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic receiver
// ---------------------------------------------------------------------------

/// A receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(RecvError::Lagged(n))` – the subscriber fell behind and `n`
    ///   messages were dropped.
    /// * `Err(RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Drain every event currently buffered without waiting.  Lag is logged
    /// and skipped over.  Suited to synchronous consumers polling once per
    /// tick.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => out.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "TopicReceiver lagged");
                }
                Err(_) => return out,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
