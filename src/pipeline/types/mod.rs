mod finger_state;
mod hand;

pub use finger_state::{FingerChange, FingerState, FINGERS_PER_HAND, FINGER_SLOTS};
pub use hand::{landmark, HandObservation, Handedness, Landmark};
