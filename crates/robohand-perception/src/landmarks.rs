//! Hand landmark geometry as produced by the landmark detection engine.
//!
//! One detection is 21 normalised points (x to the right, y downwards, z
//! unused) in the standard hand-model order: wrist, then four joints per
//! finger from thumb to little finger.

use robohand_types::{Finger, HandError, Handedness};
use serde::Deserialize;

/// Number of points in one hand detection.
pub const LANDMARK_COUNT: usize = 21;

/// Index of each fingertip, thumb first.
pub const FINGERTIPS: [usize; 5] = [4, 8, 12, 16, 20];

/// One normalised landmark.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// A single detected hand: its 21 landmarks plus the left/right label.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    handedness: Handedness,
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(handedness: Handedness, points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { handedness, points }
    }

    /// Build from a slice that must hold exactly [`LANDMARK_COUNT`] points.
    ///
    /// # Errors
    ///
    /// Returns [`HandError::InvalidLandmarks`] for any other length.
    pub fn from_slice(handedness: Handedness, points: &[Landmark]) -> Result<Self, HandError> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            HandError::InvalidLandmarks(format!(
                "expected {LANDMARK_COUNT} points, got {}",
                points.len()
            ))
        })?;
        Ok(Self::new(handedness, points))
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Landmark `index`; callers pass indices below [`LANDMARK_COUNT`].
    pub(crate) fn point(&self, index: usize) -> Landmark {
        self.points[index]
    }

    /// Tip landmark of `finger`.
    pub fn tip(&self, finger: Finger) -> Landmark {
        self.points[FINGERTIPS[finger.position()]]
    }
}

/// JSON form of one detection: `{"handedness":"Right","landmarks":[[x,y],...]}`.
/// A third coordinate per point is accepted and kept as `z`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDetection {
    handedness: Handedness,
    landmarks: Vec<Vec<f32>>,
}

impl TryFrom<RawDetection> for HandLandmarks {
    type Error = HandError;

    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        let points = raw
            .landmarks
            .iter()
            .enumerate()
            .map(|(i, coords)| match coords.as_slice() {
                [x, y] => Ok(Landmark::new(*x, *y)),
                [x, y, z] => Ok(Landmark { x: *x, y: *y, z: *z }),
                _ => Err(HandError::InvalidLandmarks(format!(
                    "point {i} has {} coordinates",
                    coords.len()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        HandLandmarks::from_slice(raw.handedness, &points)
    }
}
