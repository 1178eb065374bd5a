use serde::{Deserialize, Serialize};

pub const FINGER_SLOTS: usize = 10;
pub const FINGERS_PER_HAND: usize = 5;

/// Pressed state of every finger slot; slots 0-4 belong to the primary hand, 5-9 to the second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerState([bool; FINGER_SLOTS]);

impl FingerState {
    pub fn new(slots: [bool; FINGER_SLOTS]) -> Self {
        Self(slots)
    }

    pub fn is_down(&self, slot: usize) -> bool {
        self.0.get(slot).copied().unwrap_or(false)
    }

    pub fn down_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(slot, down)| down.then_some(slot))
    }

    /// Slots whose value differs from `previous`, in ascending order.
    pub fn changes_since(&self, previous: &FingerState) -> Vec<FingerChange> {
        (0..FINGER_SLOTS)
            .filter(|&slot| self.0[slot] != previous.0[slot])
            .map(|slot| FingerChange {
                slot,
                down: self.0[slot],
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerChange {
    pub slot: usize,
    pub down: bool,
}
