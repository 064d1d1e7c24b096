//! Quaternion to roll/pitch conversion and the per-frame attitude record.

use std::time::Duration;

use glam::DQuat;
use tracing::trace;

/// Roll and pitch in degrees, as produced by an attitude source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
}

impl Attitude {
    pub const LEVEL: Attitude = Attitude {
        roll: 0.0,
        pitch: 0.0,
    };

    pub const fn new(roll: f64, pitch: f64) -> Self {
        Self { roll, pitch }
    }

    /// Attitude of a unit orientation quaternion.
    pub fn from_quat(q: DQuat) -> Self {
        let (roll, pitch) = to_euler(q);
        Self { roll, pitch }
    }
}

/// Everything the renderers need for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub roll: f64,
    pub pitch: f64,
    /// Time since the loop started.
    pub timestamp: Duration,
    /// The feed dropped out and `roll`/`pitch` are the last good values.
    pub stale: bool,
}

impl FrameInput {
    pub fn new(attitude: Attitude, timestamp: Duration) -> Self {
        Self {
            roll: attitude.roll,
            pitch: attitude.pitch,
            timestamp,
            stale: false,
        }
    }

    pub fn attitude(&self) -> Attitude {
        Attitude::new(self.roll, self.pitch)
    }
}

/// Roll (about x) and pitch (about y) of a unit quaternion, in degrees.
///
/// Roll covers (-180, 180], pitch [-90, 90]. Yaw is not recovered. The `asin`
/// argument is clamped to [-1, 1] so float drift past a gimbal pole can't
/// produce NaN.
pub fn to_euler(q: DQuat) -> (f64, f64) {
    let DQuat { x, y, z, w } = q;

    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    let sinp = 2.0 * (w * y - z * x);
    if sinp.abs() > 1.0 {
        trace!(sinp, "Clamped pitch sine");
    }
    let pitch = sinp.clamp(-1.0, 1.0).asin();

    (roll.to_degrees(), pitch.to_degrees())
}
