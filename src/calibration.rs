//! Gyro bias estimation at startup and its per-sample correction.

use glam::DVec3;
use tracing::info;

use crate::config::CalibrationMethod;
use crate::error::{InstrumentError, Result};
use crate::feed::ImuFeed;

/// Constant gyro offset (rad/s), fixed once calibration finishes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiasVector(DVec3);

impl BiasVector {
    pub const ZERO: BiasVector = BiasVector(DVec3::ZERO);

    pub const fn new(bias: DVec3) -> Self {
        Self(bias)
    }

    pub fn from_array(bias: [f64; 3]) -> Self {
        Self(DVec3::from_array(bias))
    }

    pub fn value(&self) -> DVec3 {
        self.0
    }
}

/// Per-axis mean of `samples` gyro readings taken with the board at rest.
pub fn calibrate<F: ImuFeed + ?Sized>(feed: &mut F, samples: usize) -> Result<BiasVector> {
    if samples == 0 {
        return Err(InstrumentError::InvalidConfiguration(
            "calibration needs at least one sample".to_string(),
        ));
    }
    let mut sum = DVec3::ZERO;
    for _ in 0..samples {
        sum += feed.next_sample()?.gyro;
    }
    let bias = sum / samples as f64;
    info!(
        samples,
        bias_x = bias.x,
        bias_y = bias.y,
        bias_z = bias.z,
        "Gyro calibration complete"
    );
    Ok(BiasVector(bias))
}

/// Per-axis midpoint of the observed gyro range, ignoring the first
/// `discard` readings while the sensor settles.
pub fn calibrate_midrange<F: ImuFeed + ?Sized>(
    feed: &mut F,
    samples: usize,
    discard: usize,
) -> Result<BiasVector> {
    if discard >= samples {
        return Err(InstrumentError::InvalidConfiguration(format!(
            "mid-range calibration needs more than {discard} samples, got {samples}"
        )));
    }
    let mut min = DVec3::splat(f64::INFINITY);
    let mut max = DVec3::splat(f64::NEG_INFINITY);
    for index in 0..samples {
        let gyro = feed.next_sample()?.gyro;
        if index < discard {
            continue;
        }
        min = min.min(gyro);
        max = max.max(gyro);
    }
    let bias = (max + min) / 2.0;
    info!(
        samples,
        discard,
        bias_x = bias.x,
        bias_y = bias.y,
        bias_z = bias.z,
        "Gyro mid-range calibration complete"
    );
    Ok(BiasVector(bias))
}

/// Runs whichever calibration the config asks for.
pub fn calibrate_with<F: ImuFeed + ?Sized>(
    feed: &mut F,
    method: CalibrationMethod,
    samples: usize,
) -> Result<BiasVector> {
    match method {
        CalibrationMethod::Mean => calibrate(feed, samples),
        CalibrationMethod::MidRange { discard } => calibrate_midrange(feed, samples, discard),
    }
}

/// Calibrated bias followed by a hand-tuned residual.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiasCorrection {
    pub calibrated: BiasVector,
    pub manual: BiasVector,
}

impl BiasCorrection {
    pub fn new(calibrated: BiasVector, manual: BiasVector) -> Self {
        Self { calibrated, manual }
    }

    pub fn apply(&self, gyro: DVec3) -> DVec3 {
        gyro - self.calibrated.value() - self.manual.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ImuSample;

    /// Replays a fixed gyro sequence, looping.
    struct Scripted {
        gyro: Vec<DVec3>,
        cursor: usize,
    }

    impl Scripted {
        fn new(gyro: Vec<DVec3>) -> Self {
            Self { gyro, cursor: 0 }
        }
    }

    impl ImuFeed for Scripted {
        fn next_sample(&mut self) -> Result<ImuSample> {
            let gyro = self.gyro[self.cursor % self.gyro.len()];
            self.cursor += 1;
            Ok(ImuSample::new(gyro, DVec3::new(0.0, 0.0, 9.81)))
        }
    }

    struct Dead;

    impl ImuFeed for Dead {
        fn next_sample(&mut self) -> Result<ImuSample> {
            Err(InstrumentError::FeedUnavailable("unplugged".into()))
        }
    }

    #[test]
    fn constant_source_returns_its_value() {
        let v = DVec3::new(0.0068, -0.0015, -0.0024);
        for n in [1, 2, 7, 1000] {
            let bias = calibrate(&mut Scripted::new(vec![v]), n).unwrap();
            assert!((bias.value() - v).abs().max_element() < 1e-12, "n = {n}");
        }
    }

    #[test]
    fn mean_of_alternating_readings() {
        let mut feed = Scripted::new(vec![DVec3::new(1.0, 0.0, -2.0), DVec3::new(3.0, 0.0, 2.0)]);
        let bias = calibrate(&mut feed, 4).unwrap();
        assert_eq!(bias.value(), DVec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn zero_samples_is_invalid() {
        let err = calibrate(&mut Scripted::new(vec![DVec3::ONE]), 0).unwrap_err();
        assert!(matches!(err, InstrumentError::InvalidConfiguration(_)));
    }

    #[test]
    fn feed_errors_propagate() {
        assert!(calibrate(&mut Dead, 5).unwrap_err().is_recoverable());
    }

    #[test]
    fn midrange_ignores_settling_samples() {
        let mut feed = Scripted::new(vec![
            DVec3::splat(50.0),
            DVec3::splat(-50.0),
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(3.0, 2.0, -1.0),
            DVec3::new(2.0, 4.0, 1.0),
        ]);
        let bias = calibrate_midrange(&mut feed, 5, 2).unwrap();
        assert_eq!(bias.value(), DVec3::new(2.0, 3.0, 1.0));
    }

    #[test]
    fn midrange_must_keep_a_sample() {
        let mut feed = Scripted::new(vec![DVec3::ONE]);
        assert!(calibrate_midrange(&mut feed, 3, 3).is_err());
        assert!(calibrate_with(&mut feed, CalibrationMethod::MidRange { discard: 0 }, 1).is_ok());
    }

    #[test]
    fn correction_subtracts_both_biases() {
        let correction = BiasCorrection::new(
            BiasVector::new(DVec3::new(0.1, 0.2, 0.3)),
            BiasVector::from_array([0.01, 0.0, -0.01]),
        );
        let corrected = correction.apply(DVec3::new(1.0, 1.0, 1.0));
        assert!((corrected - DVec3::new(0.89, 0.8, 0.71)).abs().max_element() < 1e-12);
        assert_eq!(BiasCorrection::default().apply(DVec3::ONE), DVec3::ONE);
    }
}
