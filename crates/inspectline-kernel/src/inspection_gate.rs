//! [`InspectionGate`] – holds the line while a verdict is pending.
//!
//! The gate tracks two things:
//!
//! | Field | Set by | Cleared by |
//! |---|---|---|
//! | `pending_item` | [`on_arrival`][InspectionGate::on_arrival] | ACCEPT, or [`release`][InspectionGate::release] after a reject stroke |
//! | `decision_pending` | [`on_arrival`][InspectionGate::on_arrival] | any valid [`decide`][InspectionGate::decide] |
//!
//! After a REJECT the item stays bound as `pending_item` until the pusher is
//! fully retracted, so the inspection slot remains logically occupied and the
//! belt stays stopped for the whole stroke.
//!
//! # Example
//!
//! ```
//! use inspectline_kernel::{InspectionGate, ItemRegistry, RejectActuator};
//! use inspectline_types::{Decision, ItemState, LineConfig, Quaternion, Vec3};
//!
//! let cfg = LineConfig::default();
//! let mut registry = ItemRegistry::new();
//! let mut actuator = RejectActuator::new(&cfg);
//! let mut gate = InspectionGate::new();
//!
//! let item = registry.create_item(Vec3::default(), Quaternion::IDENTITY, "B0");
//! registry.set_state(item, ItemState::AtInspection).unwrap();
//!
//! // Nothing pending yet: the verdict is refused.
//! assert!(gate.decide(Decision::Accept, &mut registry, &mut actuator).is_err());
//!
//! gate.on_arrival(item);
//! gate.decide(Decision::Accept, &mut registry, &mut actuator).unwrap();
//! assert_eq!(registry.get(item).unwrap().state, ItemState::AcceptedToEnd);
//! assert!(!gate.is_decision_pending());
//! ```

use inspectline_types::{Decision, ItemHandle, ItemState, LineError};
use tracing::{info, warn};

use crate::registry::ItemRegistry;
use crate::reject_actuator::RejectActuator;

/// Decision gate for the item at the inspection point.
#[derive(Debug, Default, Clone)]
pub struct InspectionGate {
    pending_item: Option<ItemHandle>,
    decision_pending: bool,
}

impl InspectionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The item occupying the inspection slot, including a rejected item
    /// whose stroke has not finished.
    pub fn pending_item(&self) -> Option<ItemHandle> {
        self.pending_item
    }

    /// `true` between an arrival and its verdict.
    pub fn is_decision_pending(&self) -> bool {
        self.decision_pending
    }

    /// Bind the item that just stopped at the inspection point.  This is the
    /// only way the gate becomes occupied.
    pub fn on_arrival(&mut self, item: ItemHandle) {
        if let Some(stale) = self.pending_item {
            warn!(%stale, %item, "arrival while inspection slot still bound");
        }
        self.pending_item = Some(item);
        self.decision_pending = true;
        info!(%item, "awaiting inspection verdict");
    }

    /// Apply the verdict for the pending item and return its handle.
    ///
    /// - [`Decision::Accept`] sends the item on to the end of the line and
    ///   frees the slot.
    /// - [`Decision::Reject`] hands the item to `actuator`; the slot stays
    ///   bound until [`release`][Self::release].
    ///
    /// # Errors
    ///
    /// - [`LineError::InvalidDecision`] when no verdict is pending (including
    ///   a second verdict for the same arrival).  Nothing is changed.
    /// - [`LineError::ActuatorBusy`] when a reject arrives while the pusher is
    ///   still mid-stroke.  Nothing is changed.
    pub fn decide(
        &mut self,
        outcome: Decision,
        registry: &mut ItemRegistry,
        actuator: &mut RejectActuator,
    ) -> Result<ItemHandle, LineError> {
        let item = match (self.decision_pending, self.pending_item) {
            (true, Some(item)) => item,
            _ => {
                return Err(LineError::InvalidDecision {
                    reason: format!("{outcome} submitted with no item awaiting a verdict"),
                });
            }
        };
        // Validate the handle before touching anything.
        registry.get(item)?;

        match outcome {
            Decision::Accept => {
                registry.set_state(item, ItemState::AcceptedToEnd)?;
                self.pending_item = None;
            }
            Decision::Reject => {
                actuator.activate(item)?;
                registry.set_state(item, ItemState::RejectedAnimating)?;
            }
        }
        registry.set_outcome(item, outcome)?;
        self.decision_pending = false;
        info!(%item, decision = %outcome, "inspection verdict applied");
        Ok(item)
    }

    /// Clear a stale `pending_item` left behind by a finished reject stroke.
    /// Returns `true` when the slot was freed.
    pub fn release(&mut self, item: ItemHandle) -> bool {
        if self.pending_item == Some(item) && !self.decision_pending {
            self.pending_item = None;
            return true;
        }
        false
    }
}
