//! [`RejectActuator`] – the pusher that sweeps rejected items off the belt.
//!
//! A pusher plate sits beside the belt at the inspection point with an arm
//! rigidly attached behind it.  On activation it runs a fixed timeline, one
//! [`step`][RejectActuator::step] per tick:
//!
//! ```text
//!  Retracted ──activate──▶ Extending ──target reached──▶ Extended
//!      ▲                                                    │
//!      └──── retracted position reached ◀── Retracting ◀────┘ dwell elapsed
//! ```
//!
//! - **Extending** – the plate moves towards the belt at `pusher_speed`.
//!   Once its leading face reaches the item's facing side the item is
//!   *captured*: from then on its lateral position is slaved to the plate
//!   face, so the item is carried rigidly ahead of the plate.
//! - **Extended** – holds for `dwell_ticks` ticks.
//! - **Retracting** – the plate returns; the item stays where it was left.
//!   On arrival the item becomes [`ItemState::Processed`] and is released.
//!
//! The active item lives inside the phase variants, so an item bound while
//! retracted cannot be represented.

use inspectline_types::{
    ItemHandle, ItemState, LineConfig, LineError, PusherPhaseKind, Vec3,
};
use tracing::{debug, info};

use crate::registry::ItemRegistry;

/// Pusher phase with the data each phase owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PusherPhase {
    Retracted,
    Extending { item: ItemHandle, captured: bool },
    Extended { item: ItemHandle, dwell_ticks: u32 },
    Retracting { item: ItemHandle },
}

impl PusherPhase {
    pub fn kind(&self) -> PusherPhaseKind {
        match self {
            PusherPhase::Retracted => PusherPhaseKind::Retracted,
            PusherPhase::Extending { .. } => PusherPhaseKind::Extending,
            PusherPhase::Extended { .. } => PusherPhaseKind::Extended,
            PusherPhase::Retracting { .. } => PusherPhaseKind::Retracting,
        }
    }

    /// The item being serviced, if any.
    pub fn item(&self) -> Option<ItemHandle> {
        match *self {
            PusherPhase::Retracted => None,
            PusherPhase::Extending { item, .. }
            | PusherPhase::Extended { item, .. }
            | PusherPhase::Retracting { item } => Some(item),
        }
    }
}

/// Outcome of one [`RejectActuator::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorStep {
    /// The pusher plate (and arm) changed position this tick.
    pub moved: bool,
    /// `(from, to)` when the phase changed this tick.
    pub transition: Option<(PusherPhaseKind, PusherPhaseKind)>,
    /// The item whose reject completed this tick.
    pub released: Option<ItemHandle>,
}

/// Singleton pusher + arm state machine.
#[derive(Debug, Clone)]
pub struct RejectActuator {
    phase: PusherPhase,
    /// Lateral coordinate of the pusher plate centre.
    pusher_lateral: f64,
    retracted: f64,
    extended: f64,
    /// `+1.0` / `-1.0`: lateral direction of the extension stroke.
    direction: f64,
    step: f64,
    dwell_ticks: u32,
    pusher_half_depth: f64,
    item_half_extent: f64,
    arm_offset: f64,
    /// Travel-axis and height coordinates of the plate; both fixed.
    mount_x: f64,
    mount_z: f64,
}

impl RejectActuator {
    /// Build a retracted actuator mounted at the inspection point.
    pub fn new(config: &LineConfig) -> Self {
        Self {
            phase: PusherPhase::Retracted,
            pusher_lateral: config.pusher_retracted_lateral,
            retracted: config.pusher_retracted_lateral,
            extended: config.pusher_extended_lateral(),
            direction: config.push_direction(),
            step: config.pusher_step(),
            dwell_ticks: config.dwell_ticks(),
            pusher_half_depth: config.pusher_half_depth,
            item_half_extent: config.item_half_extent,
            arm_offset: config.arm_offset,
            mount_x: config.inspection_x,
            mount_z: config.pusher_height,
        }
    }

    pub fn phase(&self) -> PusherPhase {
        self.phase
    }

    pub fn is_retracted(&self) -> bool {
        matches!(self.phase, PusherPhase::Retracted)
    }

    /// The item currently being rejected.
    pub fn active_item(&self) -> Option<ItemHandle> {
        self.phase.item()
    }

    /// Centre of the pusher plate.
    pub fn pusher_position(&self) -> Vec3 {
        Vec3::new(self.mount_x, self.pusher_lateral, self.mount_z)
    }

    /// Centre of the arm; a pure follower of the plate.
    pub fn arm_position(&self) -> Vec3 {
        Vec3::new(
            self.mount_x,
            self.pusher_lateral - self.direction * self.arm_offset,
            self.mount_z,
        )
    }

    /// Start a reject stroke for `item`.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::ActuatorBusy`] when a stroke is already in
    /// progress.  The running stroke is left untouched.
    pub fn activate(&mut self, item: ItemHandle) -> Result<(), LineError> {
        if let Some(active) = self.phase.item() {
            return Err(LineError::ActuatorBusy { active });
        }
        self.phase = PusherPhase::Extending {
            item,
            captured: false,
        };
        info!(item = %item, "reject actuator activated");
        Ok(())
    }

    /// Advance the stroke by one tick.  A no-op while retracted.
    ///
    /// # Errors
    ///
    /// Only [`LineError::UnknownItem`] if the bound item vanished from the
    /// registry.
    pub fn step(&mut self, registry: &mut ItemRegistry) -> Result<ActuatorStep, LineError> {
        let before = self.phase.kind();
        let mut out = ActuatorStep::default();

        self.phase = match self.phase {
            PusherPhase::Retracted => return Ok(out),

            PusherPhase::Extending { item, captured } => {
                let mut next = self.pusher_lateral + self.direction * self.step;
                let reached = (next - self.extended) * self.direction >= 0.0;
                if reached {
                    next = self.extended;
                }
                self.pusher_lateral = next;
                out.moved = true;

                let face = next + self.direction * self.pusher_half_depth;
                let target = registry.get(item)?.position;
                let item_face = target.y - self.direction * self.item_half_extent;
                let captured = captured || (face - item_face) * self.direction >= 0.0;
                if captured {
                    let carried = Vec3 {
                        y: face + self.direction * self.item_half_extent,
                        ..target
                    };
                    registry.set_position(item, carried)?;
                }

                if reached {
                    PusherPhase::Extended {
                        item,
                        dwell_ticks: 0,
                    }
                } else {
                    PusherPhase::Extending { item, captured }
                }
            }

            PusherPhase::Extended { item, dwell_ticks } => {
                let dwell_ticks = dwell_ticks + 1;
                if dwell_ticks >= self.dwell_ticks {
                    PusherPhase::Retracting { item }
                } else {
                    PusherPhase::Extended { item, dwell_ticks }
                }
            }

            PusherPhase::Retracting { item } => {
                let mut next = self.pusher_lateral - self.direction * self.step;
                out.moved = true;
                if (self.retracted - next) * self.direction >= 0.0 {
                    next = self.retracted;
                    self.pusher_lateral = next;
                    registry.set_state(item, ItemState::Processed)?;
                    out.released = Some(item);
                    info!(item = %item, "reject complete; pusher retracted");
                    PusherPhase::Retracted
                } else {
                    self.pusher_lateral = next;
                    PusherPhase::Retracting { item }
                }
            }
        };

        let after = self.phase.kind();
        if after != before {
            debug!(from = %before, to = %after, "pusher phase change");
            out.transition = Some((before, after));
        }
        Ok(out)
    }
}
