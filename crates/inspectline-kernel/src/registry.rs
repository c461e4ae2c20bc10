//! [`ItemRegistry`] – per-item position and state records.
//!
//! The registry validates nothing beyond handle existence; every invariant
//! (single occupancy, ordering, gating) is enforced by the controllers that
//! call it.  Items are stored in creation order, which is also rearmost to
//! frontmost along the travel axis.

use std::collections::BTreeSet;

use inspectline_types::{Decision, Item, ItemHandle, ItemState, LineError, Quaternion, Vec3};

/// Leaf data store for every item on the line.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    items: Vec<Item>,
    /// Items written since the last [`take_dirty`][Self::take_dirty].
    dirty: BTreeSet<ItemHandle>,
}

impl ItemRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an item in the [`ItemState::OnConveyor`] state and return its
    /// handle.  Handles are issued sequentially from zero.
    pub fn create_item(
        &mut self,
        start: Vec3,
        orientation: Quaternion,
        batch_tag: impl Into<String>,
    ) -> ItemHandle {
        let handle = ItemHandle(self.items.len() as u32);
        self.items.push(Item {
            handle,
            position: start,
            orientation,
            state: ItemState::OnConveyor,
            batch_tag: batch_tag.into(),
            outcome: None,
        });
        self.dirty.insert(handle);
        handle
    }

    /// Look up an item.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::UnknownItem`] when `handle` was never issued.
    pub fn get(&self, handle: ItemHandle) -> Result<&Item, LineError> {
        self.items
            .get(handle.0 as usize)
            .ok_or(LineError::UnknownItem(handle))
    }

    /// Overwrite an item's position.
    pub fn set_position(&mut self, handle: ItemHandle, position: Vec3) -> Result<(), LineError> {
        self.get_mut(handle)?.position = position;
        self.dirty.insert(handle);
        Ok(())
    }

    /// Overwrite an item's state.
    pub fn set_state(&mut self, handle: ItemHandle, state: ItemState) -> Result<(), LineError> {
        self.get_mut(handle)?.state = state;
        self.dirty.insert(handle);
        Ok(())
    }

    /// Record the inspection verdict for the audit trail.
    pub fn set_outcome(&mut self, handle: ItemHandle, outcome: Decision) -> Result<(), LineError> {
        self.get_mut(handle)?.outcome = Some(outcome);
        Ok(())
    }

    /// All items, rearmost first.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items currently in `state`.
    pub fn count_in(&self, state: ItemState) -> usize {
        self.items.iter().filter(|i| i.state == state).count()
    }

    /// The frontmost item whose state satisfies `pred`.
    pub fn frontmost(&self, pred: impl Fn(ItemState) -> bool) -> Option<&Item> {
        self.items.iter().rev().find(|i| pred(i.state))
    }

    /// `true` once every item has reached [`ItemState::Processed`].
    pub fn all_processed(&self) -> bool {
        self.items.iter().all(|i| i.state.is_terminal())
    }

    /// Drain the set of items written since the previous call, in handle
    /// order.
    pub fn take_dirty(&mut self) -> Vec<ItemHandle> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    fn get_mut(&mut self, handle: ItemHandle) -> Result<&mut Item, LineError> {
        self.items
            .get_mut(handle.0 as usize)
            .ok_or(LineError::UnknownItem(handle))
    }
}
