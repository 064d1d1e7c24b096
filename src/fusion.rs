use ahrs::{Ahrs, Madgwick};
use glam::{DQuat, DVec3};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::debug;

use crate::error::{InstrumentError, Result};

/// One step of gyro/accelerometer sensor fusion.
pub trait FusionFilter {
    /// Advances `previous` by one sample. Gyro in rad/s (bias already
    /// removed), accelerometer in any consistent unit.
    fn update(&mut self, previous: DQuat, gyro: DVec3, accel: DVec3) -> DQuat;
}

/// Madgwick gradient-descent filter.
///
/// The caller owns the running quaternion; the filter is re-seeded with it on
/// every step so a source can swap or reset its estimate freely.
pub struct MadgwickFusion {
    filter: Madgwick<f64>,
}

impl MadgwickFusion {
    pub fn new(sample_rate_hz: f64, beta: f64) -> Result<Self> {
        if !(sample_rate_hz > 0.0) {
            return Err(InstrumentError::InvalidConfiguration(format!(
                "sample rate must be positive, got {sample_rate_hz}"
            )));
        }
        debug!(sample_rate_hz, beta, "Madgwick filter created");
        Ok(Self {
            filter: Madgwick::new(1.0 / sample_rate_hz, beta),
        })
    }
}

impl FusionFilter for MadgwickFusion {
    fn update(&mut self, previous: DQuat, gyro: DVec3, accel: DVec3) -> DQuat {
        self.filter.quat = UnitQuaternion::new_unchecked(Quaternion::new(
            previous.w, previous.x, previous.y, previous.z,
        ));
        let gyro = Vector3::new(gyro.x, gyro.y, gyro.z);
        let accel = Vector3::new(accel.x, accel.y, accel.z);
        if let Err(err) = self.filter.update_imu(&gyro, &accel) {
            // Zero accelerometer norm; keep the last estimate.
            debug!(?err, "Madgwick update rejected sample");
            return previous;
        }
        let q = self.filter.quat;
        DQuat::from_xyzw(q.coords[0], q.coords[1], q.coords[2], q.coords[3])
    }
}
