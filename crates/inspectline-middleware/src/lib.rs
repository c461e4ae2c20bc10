//! `inspectline-middleware` – routes line events to whoever is listening
//! (loggers, dashboards, audit sinks) without caring what they do with them.
//!
//! # Modules
//!
//! - [`bus`] – topic-partitioned publish/subscribe event bus built on Tokio
//!   broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
