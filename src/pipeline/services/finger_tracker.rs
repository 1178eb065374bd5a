use crate::error::TrackerError;
use crate::pipeline::types::{
    landmark, FingerChange, FingerState, HandObservation, FINGERS_PER_HAND, FINGER_SLOTS,
};
use tracing::{debug, warn};

/// The landmarker never reports more hands than this; extra hands are ignored.
pub const MAX_HANDS: usize = 2;
const SECOND_HAND_BASE: usize = FINGERS_PER_HAND;

/// (tip, reference joint) per finger, thumb first. The thumb compares against its IP joint,
/// every other finger against its PIP joint.
const TIP_AND_REFERENCE: [(usize, usize); FINGERS_PER_HAND] = [
    (landmark::THUMB_TIP, landmark::THUMB_IP),
    (landmark::INDEX_FINGER_TIP, landmark::INDEX_FINGER_PIP),
    (landmark::MIDDLE_FINGER_TIP, landmark::MIDDLE_FINGER_PIP),
    (landmark::RING_FINGER_TIP, landmark::RING_FINGER_PIP),
    (landmark::PINKY_TIP, landmark::PINKY_PIP),
];

/// Turns per-frame hand observations into the 10-slot finger state and reports what changed.
#[derive(Debug, Default)]
pub struct FingerStateTracker {
    state: FingerState,
}

impl FingerStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FingerState {
        self.state
    }

    /// Applies one analysis cycle. Slots not confirmed by a visible hand resolve to up.
    pub fn update(&mut self, hands: &[HandObservation]) -> Vec<FingerChange> {
        let mut slots = [false; FINGER_SLOTS];
        for (slot, down) in observe(hands) {
            slots[slot] = down;
        }
        self.apply(FingerState::new(slots))
    }

    /// Forces every slot up, reporting the slots that were down.
    pub fn reset(&mut self) -> Vec<FingerChange> {
        self.apply(FingerState::default())
    }

    fn apply(&mut self, next: FingerState) -> Vec<FingerChange> {
        let changes = next.changes_since(&self.state);
        self.state = next;
        changes
    }
}

/// Global `(slot, is_down)` pairs for every finger of every usable hand in this cycle.
///
/// Hands are ordered by horizontal center. With two hands the leftmost one takes slots
/// 5-9 and the other slots 0-4; a lone hand always takes slots 0-4. A hand missing a
/// required landmark is skipped and its slots stay unconfirmed.
pub fn observe(hands: &[HandObservation]) -> Vec<(usize, bool)> {
    if hands.len() > MAX_HANDS {
        warn!(
            "Landmarker reported {} hands, only the first {} are tracked",
            hands.len(),
            MAX_HANDS
        );
    }
    let mut ordered: Vec<&HandObservation> = hands.iter().take(MAX_HANDS).collect();
    ordered.sort_by(|a, b| a.center_x().total_cmp(&b.center_x()));

    let hand_count = ordered.len();
    let mut observations = Vec::with_capacity(hand_count * FINGERS_PER_HAND);
    for (position, hand) in ordered.into_iter().enumerate() {
        let base = slot_base(position, hand_count);
        match finger_positions(hand) {
            Ok(fingers) => {
                observations.extend(
                    fingers
                        .iter()
                        .enumerate()
                        .map(|(finger, &down)| (base + finger, down)),
                );
            }
            Err(e) => {
                warn!("Skipping hand at slot base {}: {}", base, e);
            }
        }
    }
    debug!("Observed {} finger positions", observations.len());
    observations
}

fn slot_base(position: usize, hand_count: usize) -> usize {
    if hand_count == MAX_HANDS && position == 0 {
        SECOND_HAND_BASE
    } else {
        0
    }
}

/// Down/up per finger, thumb to pinky. A finger is down when its tip sits lower in the image
/// (larger y) than its reference joint. A hand held upside down reads inverted.
pub fn finger_positions(hand: &HandObservation) -> Result<[bool; FINGERS_PER_HAND], TrackerError> {
    let mut fingers = [false; FINGERS_PER_HAND];
    for (finger, &(tip, reference)) in TIP_AND_REFERENCE.iter().enumerate() {
        let point = |index: usize| {
            hand.landmarks
                .get(index)
                .ok_or(TrackerError::MissingLandmark {
                    needed: index,
                    found: hand.landmarks.len(),
                })
        };
        fingers[finger] = point(tip)?.y > point(reference)?.y;
    }
    Ok(fingers)
}
