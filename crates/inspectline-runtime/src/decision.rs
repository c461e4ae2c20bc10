//! Decision sources – where inspection verdicts come from.
//!
//! The line loop only needs "is a verdict available, and which one".  Any
//! trigger (a key press, a vision classifier, a test script) is adapted to
//! the [`DecisionSource`] trait:
//!
//! - [`ChannelDecisions`] – the receiving half of an unbounded Tokio mpsc
//!   channel.  The sending half, [`DecisionSender`], is `Clone + Send` and can
//!   live on any thread (e.g. a terminal prompt).  Verdicts that arrive while
//!   nothing is awaiting one are discarded, just like a key pressed outside
//!   the decision window.
//! - [`ScriptedDecisions`] – a fixed queue of verdicts consumed one per
//!   arrival, with an optional fallback once the queue runs dry.
//!
//! # Example
//!
//! ```rust
//! use inspectline_runtime::decision::{decision_channel, DecisionSource};
//! use inspectline_types::Decision;
//!
//! let (tx, mut rx) = decision_channel();
//! assert!(tx.send(Decision::Reject));
//! assert_eq!(rx.poll(), Some(Decision::Reject));
//! assert_eq!(rx.poll(), None);
//! ```

use std::collections::VecDeque;

use inspectline_types::Decision;
use tokio::sync::mpsc;

/// Something that can hand the line loop at most one verdict per tick.
pub trait DecisionSource: Send {
    /// Take the next available verdict, if any.  Only called while an item
    /// is awaiting a verdict.
    fn poll(&mut self) -> Option<Decision>;

    /// Throw away verdicts that arrived while nothing was awaiting one and
    /// return how many were dropped.  Sources that only produce verdicts on
    /// demand keep the default.
    fn discard_stale(&mut self) -> usize {
        0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Channel-backed source
// ─────────────────────────────────────────────────────────────────────────────

/// Create a connected [`DecisionSender`] / [`ChannelDecisions`] pair.
pub fn decision_channel() -> (DecisionSender, ChannelDecisions) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DecisionSender { tx }, ChannelDecisions { rx })
}

/// Sending half of a decision channel.
#[derive(Clone, Debug)]
pub struct DecisionSender {
    tx: mpsc::UnboundedSender<Decision>,
}

impl DecisionSender {
    /// Queue a verdict.  Returns `false` once the line loop has gone away.
    pub fn send(&self, decision: Decision) -> bool {
        self.tx.send(decision).is_ok()
    }
}

/// Receiving half of a decision channel, owned by the line loop.
#[derive(Debug)]
pub struct ChannelDecisions {
    rx: mpsc::UnboundedReceiver<Decision>,
}

impl DecisionSource for ChannelDecisions {
    fn poll(&mut self) -> Option<Decision> {
        self.rx.try_recv().ok()
    }

    fn discard_stale(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted source
// ─────────────────────────────────────────────────────────────────────────────

/// A fixed sequence of verdicts, one per arrival.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    queue: VecDeque<Decision>,
    fallback: Option<Decision>,
}

impl ScriptedDecisions {
    pub fn new(verdicts: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            queue: verdicts.into_iter().collect(),
            fallback: None,
        }
    }

    /// Verdict to hand out after the script is exhausted.  Without one the
    /// line waits forever at the next arrival.
    pub fn with_fallback(mut self, fallback: Decision) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Verdicts still queued.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl DecisionSource for ScriptedDecisions {
    fn poll(&mut self) -> Option<Decision> {
        self.queue.pop_front().or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_delivers_in_send_order() {
        let (tx, mut rx) = decision_channel();
        tx.send(Decision::Accept);
        tx.send(Decision::Reject);
        assert_eq!(rx.poll(), Some(Decision::Accept));
        assert_eq!(rx.poll(), Some(Decision::Reject));
        assert_eq!(rx.poll(), None);
    }

    #[test]
    fn channel_discards_stale_verdicts() {
        let (tx, mut rx) = decision_channel();
        tx.send(Decision::Accept);
        tx.send(Decision::Accept);
        assert_eq!(rx.discard_stale(), 2);
        assert_eq!(rx.poll(), None);
    }

    #[test]
    fn sender_reports_closed_channel() {
        let (tx, rx) = decision_channel();
        drop(rx);
        assert!(!tx.send(Decision::Reject));
    }

    #[test]
    fn sender_works_across_threads() {
        let (tx, mut rx) = decision_channel();
        let worker = std::thread::spawn(move || tx.send(Decision::Reject));
        assert!(worker.join().unwrap());
        assert_eq!(rx.poll(), Some(Decision::Reject));
    }

    #[test]
    fn script_runs_out_then_uses_fallback() {
        let mut script = ScriptedDecisions::new([Decision::Reject]).with_fallback(Decision::Accept);
        assert_eq!(script.remaining(), 1);
        assert_eq!(script.poll(), Some(Decision::Reject));
        assert_eq!(script.poll(), Some(Decision::Accept));
        assert_eq!(script.poll(), Some(Decision::Accept));
    }

    #[test]
    fn script_never_discards() {
        let mut script = ScriptedDecisions::new([Decision::Accept]);
        assert_eq!(script.discard_stale(), 0);
        assert_eq!(script.poll(), Some(Decision::Accept));
        assert_eq!(script.poll(), None);
    }
}
