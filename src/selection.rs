use serde::Serialize;

use crate::{endpoints::Endpoint, platform::Direction, reconcile::PinnedSelection};

/// An endpoint as presented to the user, with the three independent markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListing {
    pub id: String,
    pub name: String,
    /// Windows' current default
    pub is_default: bool,
    /// The committed pin
    pub is_chosen: bool,
    /// Selected, but not committed yet
    pub is_pending: bool,
}

/// What the user has picked vs what's been committed (and is being enforced).
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    committed: PinnedSelection,
    pending_output_id: String,
    pending_input_id: String,
}

impl SelectionState {
    /// Starts with nothing pending beyond what's already committed.
    pub fn new(committed: PinnedSelection) -> Self {
        Self {
            pending_output_id: committed.output_device_id.clone(),
            pending_input_id: committed.input_device_id.clone(),
            committed,
        }
    }
    pub fn committed(&self) -> &PinnedSelection {
        &self.committed
    }
    pub fn pending(&self, direction: Direction) -> &str {
        match direction {
            Direction::Render => &self.pending_output_id,
            Direction::Capture => &self.pending_input_id,
        }
    }
    pub fn select(&mut self, direction: Direction, endpoint_id: &str) {
        let pending = match direction {
            Direction::Render => &mut self.pending_output_id,
            Direction::Capture => &mut self.pending_input_id,
        };
        *pending = endpoint_id.to_owned();
    }
    pub fn has_unsaved_changes(&self) -> bool {
        Direction::ALL
            .into_iter()
            .any(|direction| self.pending(direction) != self.committed.pinned(direction))
    }
    /// Throws away pending choices.
    pub fn reset(&mut self) {
        self.pending_output_id = self.committed.output_device_id.clone();
        self.pending_input_id = self.committed.input_device_id.clone();
    }
    /// Pending ID for `direction` if committing would need to apply it.
    ///
    /// An empty pending choice never clears a pin, use [`Self::unpin`] for that.
    pub fn pending_change(&self, direction: Direction) -> Option<&str> {
        let pending = self.pending(direction);
        (!pending.is_empty() && pending != self.committed.pinned(direction)).then_some(pending)
    }
    /// Records that the pending choice for `direction` was applied successfully.
    pub fn mark_committed(&mut self, direction: Direction) {
        let pending = self.pending(direction).to_owned();
        *self.committed.pinned_mut(direction) = pending;
    }
    pub fn unpin(&mut self, direction: Direction) {
        self.committed.pinned_mut(direction).clear();
        self.select(direction, "");
    }
    pub fn set_auto_switch(&mut self, enabled: bool) {
        self.committed.auto_switch = enabled;
    }
    /// Replaces the committed state (e.g. the settings file changed), keeping pending choices.
    pub fn replace_committed(&mut self, committed: PinnedSelection) {
        let had_changes = self.has_unsaved_changes();
        self.committed = committed;
        if !had_changes {
            self.reset();
        }
    }
    pub fn listing(&self, endpoints: Vec<Endpoint>) -> Vec<DeviceListing> {
        endpoints
            .into_iter()
            .map(|endpoint| {
                let has_id = !endpoint.id.is_empty();
                let is_chosen = has_id && endpoint.id == self.committed.pinned(endpoint.direction);
                let is_pending = has_id && endpoint.id == self.pending(endpoint.direction);
                DeviceListing {
                    is_default: endpoint.is_system_default,
                    is_chosen,
                    is_pending,
                    id: endpoint.id,
                    name: endpoint.name,
                }
            })
            .collect()
    }
}
