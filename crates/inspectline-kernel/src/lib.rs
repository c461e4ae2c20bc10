//! `inspectline-kernel` – line state and the rules that move it.
//!
//! The kernel owns every piece of per-item and per-mechanism state but does
//! not decide *when* to step; that is the job of the line loop in
//! `inspectline-runtime`.
//!
//! # Modules
//!
//! - [`registry`] – [`ItemRegistry`][registry::ItemRegistry]: the leaf data
//!   store of item positions and states.  Writes are visible immediately and
//!   mark the item dirty for the next render commit.
//! - [`conveyor`] – [`ConveyorController`][conveyor::ConveyorController]:
//!   advances items along the travel axis and detects the single item that
//!   reaches the inspection point on a tick.
//! - [`inspection_gate`] – [`InspectionGate`][inspection_gate::InspectionGate]:
//!   holds the line while a verdict is pending and applies exactly one
//!   verdict per arrival.
//! - [`reject_actuator`] – [`RejectActuator`][reject_actuator::RejectActuator]:
//!   the pusher state machine that sweeps a rejected item off the belt.

pub mod conveyor;
pub mod inspection_gate;
pub mod registry;
pub mod reject_actuator;

pub use conveyor::{ConveyorController, ConveyorEvent};
pub use inspection_gate::InspectionGate;
pub use registry::ItemRegistry;
pub use reject_actuator::{ActuatorStep, PusherPhase, RejectActuator};
