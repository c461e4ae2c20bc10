//! Shared vocabulary for the InspectLine workspace: items and their states,
//! line geometry, bus events and the workspace-wide error type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod config;

pub use config::{BatchSpec, LineConfig};

/// Opaque, stable identifier for one item travelling the line.
///
/// Handles are issued sequentially by the item registry and double as the
/// body identifier handed to the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemHandle(pub u32);

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Position in line-local coordinates.
///
/// `x` is the travel axis, `y` the lateral axis (the pusher's axis) and `z`
/// the height above ground.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Orientation quaternion. The core never mutates it; it is forwarded to the
/// render backend as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `angle_rad` about the travel (x) axis. A quarter turn lays
    /// the pusher arm cylinder along the lateral axis.
    pub fn about_x(angle_rad: f64) -> Self {
        let half = angle_rad * 0.5;
        Quaternion {
            x: half.sin(),
            y: 0.0,
            z: 0.0,
            w: half.cos(),
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Lifecycle state of an item on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    /// Travelling towards the inspection point.
    OnConveyor,
    /// Stopped at the inspection point awaiting (or just given) a verdict.
    AtInspection,
    /// Accepted; travelling towards the end of the line.
    AcceptedToEnd,
    /// Rejected; being removed from the line by the pusher.
    RejectedAnimating,
    /// Finished. Inert from here on.
    Processed,
}

impl ItemState {
    /// `true` once the item will never move again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemState::Processed)
    }

    /// `true` while the item still takes part in longitudinal line flow,
    /// i.e. it is neither processed nor owned by the pusher.
    pub fn is_in_flow(self) -> bool {
        !matches!(self, ItemState::Processed | ItemState::RejectedAnimating)
    }

    /// `true` for the states the conveyor advances along the travel axis.
    pub fn is_conveyed(self) -> bool {
        matches!(self, ItemState::OnConveyor | ItemState::AcceptedToEnd)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemState::OnConveyor => "ON_CONVEYOR",
            ItemState::AtInspection => "AT_INSPECTION",
            ItemState::AcceptedToEnd => "ACCEPTED_TO_END",
            ItemState::RejectedAnimating => "REJECTED_ANIMATING",
            ItemState::Processed => "PROCESSED",
        };
        f.write_str(s)
    }
}

/// Inspection verdict for the item at the inspection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accept => f.write_str("ACCEPT"),
            Decision::Reject => f.write_str("REJECT"),
        }
    }
}

/// One unit travelling the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub handle: ItemHandle,
    pub position: Vec3,
    pub orientation: Quaternion,
    pub state: ItemState,
    /// Display/logging classification; never consulted by decision logic.
    pub batch_tag: String,
    /// Verdict recorded at inspection, kept for the audit trail.
    pub outcome: Option<Decision>,
}

/// Per-tick change report for one item, handed to render/log collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemDelta {
    pub handle: ItemHandle,
    pub position: Vec3,
    pub state: ItemState,
}

/// A body the render backend knows how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyId {
    Item(ItemHandle),
    /// The flat pusher plate of the reject actuator.
    Pusher,
    /// The arm rigidly attached behind the pusher plate.
    Arm,
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyId::Item(h) => write!(f, "{h}"),
            BodyId::Pusher => f.write_str("pusher"),
            BodyId::Arm => f.write_str("arm"),
        }
    }
}

/// Data-free view of the reject actuator's phase, used in events and
/// snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PusherPhaseKind {
    Retracted,
    Extending,
    Extended,
    Retracting,
}

impl fmt::Display for PusherPhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PusherPhaseKind::Retracted => "RETRACTED",
            PusherPhaseKind::Extending => "EXTENDING",
            PusherPhaseKind::Extended => "EXTENDED",
            PusherPhaseKind::Retracting => "RETRACTING",
        };
        f.write_str(s)
    }
}

/// Unified event wrapper published on the line event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"inspectline-runtime::line_loop"`
    pub source: String,
    /// Simulation tick on which the event happened.
    pub tick: u64,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current wall-clock time.
    pub fn new(source: impl Into<String>, tick: u64, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            tick,
            payload,
        }
    }
}

/// Variants of data routed over the line event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// An item stopped at the inspection point and awaits a verdict.
    ItemArrived { item: ItemHandle, batch_tag: String },
    /// A verdict was applied to the item at inspection.
    DecisionApplied { item: ItemHandle, decision: Decision },
    /// An accepted item was conveyed onto the end-of-line coordinate.
    ReachedLineEnd { item: ItemHandle, position: Vec3 },
    /// The item reached its terminal state.
    ItemProcessed { item: ItemHandle, outcome: Decision },
    /// The reject actuator changed phase.
    PusherPhaseChanged {
        item: ItemHandle,
        from: PusherPhaseKind,
        to: PusherPhaseKind,
    },
    Fault { component: String, message: String },
}

/// Workspace-wide error type. Every variant is a logical precondition
/// violation; none of them is transient.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineError {
    #[error("Invalid decision: {reason}")]
    InvalidDecision { reason: String },

    #[error("Reject actuator busy with {active}; activation refused")]
    ActuatorBusy { active: ItemHandle },

    #[error("Unknown item handle: {0}")]
    UnknownItem(ItemHandle),

    #[error("Invalid line configuration: {0}")]
    InvalidConfig(String),

    #[error("Render backend fault on {body}: {details}")]
    Render { body: BodyId, details: String },
}
