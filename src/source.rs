// ============================================================================
// ATTITUDE SOURCES
// ============================================================================

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use glam::DQuat;
use tracing::{debug, info, warn};

use crate::calibration::{calibrate_with, BiasCorrection, BiasVector};
use crate::config::InstrumentConfig;
use crate::error::{InstrumentError, Result};
use crate::feed::ImuFeed;
use crate::fusion::FusionFilter;
use crate::orientation::Attitude;

/// Arrow keys the window forwards to the active source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualKey {
    Up,
    Down,
    Left,
    Right,
}

/// Anything that can tell the instrument the current roll and pitch.
pub trait AttitudeSource {
    /// Called once per frame.
    fn next_attitude(&mut self) -> Result<Attitude>;

    /// Keyboard input from the window. Ignored unless the source is manual.
    fn handle_key(&mut self, _key: ManualKey) {}
}

impl<S: AttitudeSource + ?Sized> AttitudeSource for Box<S> {
    fn next_attitude(&mut self) -> Result<Attitude> {
        (**self).next_attitude()
    }

    fn handle_key(&mut self, key: ManualKey) {
        (**self).handle_key(key)
    }
}

// ============================================================================
// MANUAL CONTROL
// ============================================================================

/// Keyboard-driven attitude for bench testing without a sensor.
#[derive(Debug, Clone)]
pub struct ManualControl {
    attitude: Attitude,
    step: f64,
}

impl ManualControl {
    pub fn new(step: f64) -> Self {
        Self {
            attitude: Attitude::LEVEL,
            step,
        }
    }

    pub fn with_attitude(mut self, attitude: Attitude) -> Self {
        self.attitude = attitude;
        self
    }

    pub fn attitude(&self) -> Attitude {
        self.attitude
    }
}

impl AttitudeSource for ManualControl {
    fn next_attitude(&mut self) -> Result<Attitude> {
        Ok(self.attitude)
    }

    fn handle_key(&mut self, key: ManualKey) {
        match key {
            ManualKey::Up => self.attitude.pitch += self.step,
            ManualKey::Down => self.attitude.pitch -= self.step,
            ManualKey::Right => self.attitude.roll += self.step,
            ManualKey::Left => self.attitude.roll -= self.step,
        }
        debug!(roll = self.attitude.roll, pitch = self.attitude.pitch, "Manual attitude");
    }
}

// ============================================================================
// SENSOR PIPELINE
// ============================================================================

/// Feed, bias correction and fusion chained into roll and pitch.
pub struct SensorAttitude<F, U> {
    feed: F,
    filter: U,
    correction: BiasCorrection,
    quat: DQuat,
    samples_per_frame: usize,
}

impl<F: ImuFeed, U: FusionFilter> SensorAttitude<F, U> {
    pub fn new(feed: F, filter: U, correction: BiasCorrection, samples_per_frame: usize) -> Self {
        Self {
            feed,
            filter,
            correction,
            quat: DQuat::IDENTITY,
            samples_per_frame: samples_per_frame.max(1),
        }
    }

    /// Calibrates against `feed` (which must be at rest) and builds the
    /// pipeline from the config's sensor settings.
    pub fn calibrated(mut feed: F, filter: U, config: &InstrumentConfig) -> Result<Self> {
        info!(
            samples = config.calibration_samples,
            "Calibrating gyro, keep the platform still"
        );
        let bias = calibrate_with(
            &mut feed,
            config.calibration_method,
            config.calibration_samples,
        )?;
        let correction = BiasCorrection::new(bias, BiasVector::from_array(config.manual_gyro_bias));
        Ok(Self::new(feed, filter, correction, config.samples_per_frame))
    }

    pub fn correction(&self) -> BiasCorrection {
        self.correction
    }

    pub fn quaternion(&self) -> DQuat {
        self.quat
    }
}

impl<F: ImuFeed, U: FusionFilter> AttitudeSource for SensorAttitude<F, U> {
    fn next_attitude(&mut self) -> Result<Attitude> {
        for _ in 0..self.samples_per_frame {
            let sample = self.feed.next_sample()?;
            let gyro = self.correction.apply(sample.gyro);
            self.quat = self.filter.update(self.quat, gyro, sample.accel);
        }
        Ok(Attitude::from_quat(self.quat))
    }
}

// ============================================================================
// THREADED HANDOFF
// ============================================================================

/// Newest attitude produced on another thread.
///
/// Until the sampler delivers its first attitude there is nothing to hold,
/// so the source reports the feed as unavailable.
pub struct ChannelAttitude {
    receiver: Receiver<Attitude>,
    latest: Option<Attitude>,
}

impl ChannelAttitude {
    pub fn new(receiver: Receiver<Attitude>) -> Self {
        Self {
            receiver,
            latest: None,
        }
    }

    /// Builds a source on a sampling thread and streams its attitudes back.
    ///
    /// `build` runs on the new thread, so slow setup such as calibration
    /// never holds up the window. The thread exits when the source fails or
    /// the receiving side is dropped.
    pub fn spawn<S, B>(build: B) -> (Self, JoinHandle<()>)
    where
        S: AttitudeSource,
        B: FnOnce() -> Result<S> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || {
            let mut source = match build() {
                Ok(source) => source,
                Err(err) => {
                    warn!(%err, "Attitude source failed to start");
                    return;
                }
            };
            loop {
                match source.next_attitude() {
                    Ok(attitude) => {
                        if sender.send(attitude).is_err() {
                            debug!("Renderer hung up, stopping sampler");
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(%err, "Attitude source stopped");
                        return;
                    }
                }
            }
        });
        (Self::new(receiver), handle)
    }
}

impl AttitudeSource for ChannelAttitude {
    fn next_attitude(&mut self) -> Result<Attitude> {
        let mut fresh = false;
        loop {
            match self.receiver.try_recv() {
                Ok(attitude) => {
                    self.latest = Some(attitude);
                    fresh = true;
                }
                Err(TryRecvError::Empty) => {
                    return self.latest.ok_or_else(|| {
                        InstrumentError::FeedUnavailable("no attitude sampled yet".to_string())
                    })
                }
                Err(TryRecvError::Disconnected) => {
                    return match self.latest {
                        Some(attitude) if fresh => Ok(attitude),
                        _ => Err(InstrumentError::FeedUnavailable(
                            "sampling thread disconnected".to_string(),
                        )),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ImuSample;
    use glam::DVec3;

    #[test]
    fn arrow_keys_step_the_manual_attitude() {
        let mut manual = ManualControl::new(1.0);
        manual.handle_key(ManualKey::Up);
        manual.handle_key(ManualKey::Up);
        manual.handle_key(ManualKey::Left);
        assert_eq!(manual.next_attitude().unwrap(), Attitude::new(-1.0, 2.0));
        manual.handle_key(ManualKey::Down);
        manual.handle_key(ManualKey::Right);
        manual.handle_key(ManualKey::Right);
        assert_eq!(manual.attitude(), Attitude::new(1.0, 1.0));
    }

    #[test]
    fn boxed_sources_forward_keys() {
        let mut source: Box<dyn AttitudeSource> =
            Box::new(ManualControl::new(2.5).with_attitude(Attitude::new(10.0, 0.0)));
        source.handle_key(ManualKey::Right);
        assert_eq!(source.next_attitude().unwrap(), Attitude::new(12.5, 0.0));
    }

    struct Constant(ImuSample);

    impl ImuFeed for Constant {
        fn next_sample(&mut self) -> Result<ImuSample> {
            Ok(self.0)
        }
    }

    /// Records what the pipeline feeds into the filter.
    #[derive(Default)]
    struct Recorder {
        gyro: Vec<DVec3>,
    }

    impl FusionFilter for &mut Recorder {
        fn update(&mut self, previous: DQuat, gyro: DVec3, _accel: DVec3) -> DQuat {
            self.gyro.push(gyro);
            previous
        }
    }

    #[test]
    fn pipeline_corrects_gyro_before_fusion() {
        let sample = ImuSample::new(DVec3::new(0.5, 0.5, 0.5), DVec3::new(0.0, 0.0, 9.81));
        let correction = BiasCorrection::new(
            BiasVector::new(DVec3::splat(0.2)),
            BiasVector::new(DVec3::splat(0.1)),
        );
        let mut recorder = Recorder::default();
        {
            let mut source = SensorAttitude::new(Constant(sample), &mut recorder, correction, 4);
            assert_eq!(source.next_attitude().unwrap(), Attitude::LEVEL);
        }
        assert_eq!(recorder.gyro.len(), 4);
        assert!((recorder.gyro[0] - DVec3::splat(0.2)).abs().max_element() < 1e-12);
    }

    #[test]
    fn calibrated_pipeline_removes_resting_bias() {
        let bias = DVec3::new(0.01, -0.02, 0.03);
        let sample = ImuSample::new(bias, DVec3::new(0.0, 0.0, 9.81));
        let config = InstrumentConfig::builder().calibration_samples(10).build();
        let mut recorder = Recorder::default();
        {
            let mut source =
                SensorAttitude::calibrated(Constant(sample), &mut recorder, &config).unwrap();
            let calibrated = source.correction().calibrated.value();
            assert!((calibrated - bias).abs().max_element() < 1e-12);
            source.next_attitude().unwrap();
        }
        assert!(recorder.gyro.iter().all(|g| g.abs().max_element() < 1e-12));
    }

    #[test]
    fn channel_returns_newest_value() {
        let (sender, receiver) = mpsc::channel();
        let mut source = ChannelAttitude::new(receiver);

        sender.send(Attitude::new(1.0, 1.0)).unwrap();
        sender.send(Attitude::new(2.0, 2.0)).unwrap();
        sender.send(Attitude::new(3.0, -3.0)).unwrap();
        assert_eq!(source.next_attitude().unwrap(), Attitude::new(3.0, -3.0));
        // Nothing new: keep showing the last value.
        assert_eq!(source.next_attitude().unwrap(), Attitude::new(3.0, -3.0));

        sender.send(Attitude::new(4.0, 0.0)).unwrap();
        drop(sender);
        assert_eq!(source.next_attitude().unwrap(), Attitude::new(4.0, 0.0));
        assert!(source.next_attitude().unwrap_err().is_recoverable());
    }

    #[test]
    fn channel_is_unavailable_until_first_sample() {
        let (sender, receiver) = mpsc::channel();
        let mut source = ChannelAttitude::new(receiver);
        // Sender alive but silent, as during calibration on the sampler.
        for _ in 0..3 {
            let err = source.next_attitude().unwrap_err();
            assert!(matches!(err, InstrumentError::FeedUnavailable(_)));
        }
        sender.send(Attitude::new(5.0, -2.0)).unwrap();
        assert_eq!(source.next_attitude().unwrap(), Attitude::new(5.0, -2.0));
    }

    #[test]
    fn failed_startup_never_reports_an_attitude() {
        let (mut source, handle) = ChannelAttitude::spawn(|| -> Result<ManualControl> {
            Err(InstrumentError::FeedUnavailable("calibration hit end of input".into()))
        });
        handle.join().unwrap();
        assert!(source.next_attitude().unwrap_err().is_recoverable());
    }

    #[test]
    fn spawned_sampler_streams_and_stops_on_failure() {
        struct Countdown(u32);

        impl AttitudeSource for Countdown {
            fn next_attitude(&mut self) -> Result<Attitude> {
                if self.0 == 0 {
                    return Err(InstrumentError::FeedUnavailable("done".into()));
                }
                self.0 -= 1;
                Ok(Attitude::new(self.0 as f64, 0.0))
            }
        }

        let (mut source, handle) = ChannelAttitude::spawn(|| Ok(Countdown(3)));
        handle.join().unwrap();
        assert_eq!(source.next_attitude().unwrap(), Attitude::new(0.0, 0.0));
        assert!(source.next_attitude().is_err());
    }
}
