use serde::{Deserialize, Serialize};

/// Landmark indices in the 21-point hand model reported by the landmarker.
pub mod landmark {
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;

    pub const COUNT: usize = 21;

    /// Joints a fingertip is compared against, thumb first.
    pub const REFERENCE_JOINTS: [usize; 5] = [
        THUMB_IP,
        INDEX_FINGER_PIP,
        MIDDLE_FINGER_PIP,
        RING_FINGER_PIP,
        PINKY_PIP,
    ];

    /// Bone segments used when drawing a hand skeleton.
    pub const CONNECTIONS: [(usize, usize); 21] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 4),
        (0, 5),
        (5, 6),
        (6, 7),
        (7, 8),
        (5, 9),
        (9, 10),
        (10, 11),
        (11, 12),
        (9, 13),
        (13, 14),
        (14, 15),
        (15, 16),
        (13, 17),
        (17, 18),
        (18, 19),
        (19, 20),
        (0, 17),
    ];
}

/// A landmark position normalised to the image: x and y in `0.0..=1.0`, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// One hand as reported by the landmarker for a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
}

impl HandObservation {
    pub fn new(landmarks: Vec<Landmark>, handedness: Handedness) -> Self {
        Self {
            landmarks,
            handedness,
        }
    }

    /// Mean x of all landmarks, used to order hands left to right.
    pub fn center_x(&self) -> f32 {
        if self.landmarks.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.landmarks.iter().map(|landmark| landmark.x).sum();
        sum / self.landmarks.len() as f32
    }
}
