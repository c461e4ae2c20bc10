//! `inspectline-hal` – render/physics backend boundary.
//!
//! The simulation core never reads anything back from the visualiser; it only
//! pushes body poses through the [`RenderBackend`][render::RenderBackend]
//! trait.
//!
//! # Modules
//!
//! - [`render`] – the [`RenderBackend`][render::RenderBackend] trait.
//! - [`sim`] – in-process backends for headless runs and tests:
//!   [`RecordingRenderer`][sim::RecordingRenderer],
//!   [`TracingRenderer`][sim::TracingRenderer] and
//!   [`NullRenderer`][sim::NullRenderer].

pub mod render;
pub mod sim;

pub use render::RenderBackend;
pub use sim::{NullRenderer, RecordingRenderer, TracingRenderer};
