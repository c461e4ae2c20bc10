//! `inspectline-runtime` – orchestration for the inspection line.
//!
//! # Modules
//!
//! - [`line_loop`] – [`LineLoop`][line_loop::LineLoop]: the per-tick
//!   orchestrator that gates the belt, applies verdicts, steps the pusher and
//!   commits poses to the render backend.
//! - [`decision`] – [`DecisionSource`][decision::DecisionSource] and its
//!   channel and scripted implementations.
//! - [`traceability`] – one [`TraceRecord`][traceability::TraceRecord] per
//!   processed item, written to a JSON-lines file or kept in memory.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with an optional OTLP span exporter.
//!
//! # Gating
//!
//! Only the loop moves the belt.  Components never call each other across
//! tick phases, so the order in [`LineLoop::tick`] is the whole story.

pub mod decision;
pub mod line_loop;
pub mod telemetry;
pub mod traceability;

pub use decision::{
    ChannelDecisions, DecisionSender, DecisionSource, ScriptedDecisions, decision_channel,
};
pub use line_loop::{LineLoop, LineSnapshot};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use traceability::{
    JsonLinesTraceLog, MemoryTraceLog, TraceLogError, TraceRecord, TraceSink, TraceStatus,
};

// Re-export the render seam so binaries can pick a backend without a direct
// dependency on inspectline-hal.
pub use inspectline_hal::{NullRenderer, RecordingRenderer, RenderBackend, TracingRenderer};
