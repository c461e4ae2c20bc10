//! [`ConveyorController`] – longitudinal motion and inspection arrival.
//!
//! When the line loop decides the belt is running, [`ConveyorController::advance`]
//! moves every conveyed item forward by `speed * tick_secs`:
//!
//! - the **inspection candidate** (frontmost [`ItemState::OnConveyor`] item)
//!   is the only item checked against the inspection coordinate.  Reaching
//!   or passing it clamps the item exactly onto the coordinate and flips it
//!   to [`ItemState::AtInspection`];
//! - every other `OnConveyor` item advances unconditionally;
//! - [`ItemState::AcceptedToEnd`] items clamp onto the end-of-line coordinate
//!   and become [`ItemState::Processed`].
//!
//! All reads happen before the first write, so the candidate cannot change
//! halfway through a tick.

use inspectline_types::{ItemHandle, ItemState, LineConfig, LineError, Vec3};
use tracing::{debug, info};

use crate::registry::ItemRegistry;

/// Something noteworthy that happened during one conveyor advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConveyorEvent {
    /// The item stopped at the inspection point.
    ArrivedAtInspection(ItemHandle),
    /// An accepted item came to rest at the end of the line.
    ReachedLineEnd(ItemHandle),
}

/// Advances items along the travel axis.
#[derive(Debug, Clone)]
pub struct ConveyorController {
    inspection_x: f64,
    end_x: f64,
    step: f64,
}

impl ConveyorController {
    pub fn new(config: &LineConfig) -> Self {
        Self {
            inspection_x: config.inspection_x,
            end_x: config.end_x,
            step: config.travel_per_tick(),
        }
    }

    /// The frontmost item still travelling towards inspection.
    pub fn inspection_candidate(registry: &ItemRegistry) -> Option<ItemHandle> {
        registry
            .frontmost(|s| s == ItemState::OnConveyor)
            .map(|i| i.handle)
    }

    /// Move every conveyed item one tick forward.
    ///
    /// Returns the arrival / end-of-line events raised this tick, in item
    /// order.
    ///
    /// # Errors
    ///
    /// Only [`LineError::UnknownItem`], which would mean the registry changed
    /// underneath the controller.
    pub fn advance(&self, registry: &mut ItemRegistry) -> Result<Vec<ConveyorEvent>, LineError> {
        let candidate = Self::inspection_candidate(registry);
        let moving: Vec<(ItemHandle, ItemState, Vec3)> = registry
            .items()
            .iter()
            .filter(|i| i.state.is_conveyed())
            .map(|i| (i.handle, i.state, i.position))
            .collect();

        let mut events = Vec::new();
        for (handle, state, position) in moving {
            let mut next = Vec3 {
                x: position.x + self.step,
                ..position
            };
            match state {
                ItemState::OnConveyor if Some(handle) == candidate => {
                    if next.x >= self.inspection_x {
                        next.x = self.inspection_x;
                        registry.set_state(handle, ItemState::AtInspection)?;
                        info!(item = %handle, "item arrived at inspection");
                        events.push(ConveyorEvent::ArrivedAtInspection(handle));
                    }
                }
                ItemState::OnConveyor => {}
                ItemState::AcceptedToEnd => {
                    if next.x >= self.end_x {
                        next.x = self.end_x;
                        registry.set_state(handle, ItemState::Processed)?;
                        debug!(item = %handle, "accepted item reached end of line");
                        events.push(ConveyorEvent::ReachedLineEnd(handle));
                    }
                }
                _ => continue,
            }
            registry.set_position(handle, next)?;
        }
        Ok(events)
    }
}
