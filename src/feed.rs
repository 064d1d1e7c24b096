// ============================================================================
// RAW IMU FEEDS
// ============================================================================

use std::io::BufRead;

use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::error::{InstrumentError, Result};

/// One gyro (rad/s) and accelerometer (m/s^2) reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuSample {
    pub gyro: DVec3,
    pub accel: DVec3,
}

impl ImuSample {
    pub const fn new(gyro: DVec3, accel: DVec3) -> Self {
        Self { gyro, accel }
    }
}

/// Source of raw IMU samples. Blocks until the next sample is ready.
pub trait ImuFeed {
    fn next_sample(&mut self) -> Result<ImuSample>;
}

impl<F: ImuFeed + ?Sized> ImuFeed for Box<F> {
    fn next_sample(&mut self) -> Result<ImuSample> {
        (**self).next_sample()
    }
}

// ============================================================================
// LINE FEED
// ============================================================================

/// Reads `gx gy gz ax ay az` lines from a text stream (a serial port dump,
/// a pipe, stdin). Commas and whitespace both separate fields; blank lines
/// and `#` comments are skipped.
pub struct LineFeed<R> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead> LineFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }
}

fn parse_sample(line: &str) -> Option<ImuSample> {
    let values: Vec<f64> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match values[..] {
        [gx, gy, gz, ax, ay, az] => Some(ImuSample::new(
            DVec3::new(gx, gy, gz),
            DVec3::new(ax, ay, az),
        )),
        _ => None,
    }
}

impl<R: BufRead> ImuFeed for LineFeed<R> {
    fn next_sample(&mut self) -> Result<ImuSample> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|e| InstrumentError::FeedUnavailable(e.to_string()))?;
            if read == 0 {
                return Err(InstrumentError::FeedUnavailable(format!(
                    "end of input after {} lines",
                    self.line_number
                )));
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match parse_sample(trimmed) {
                Some(sample) => return Ok(sample),
                None => warn!(line = self.line_number, text = trimmed, "Skipping malformed IMU line"),
            }
        }
    }
}

// ============================================================================
// SIMULATED IMU
// ============================================================================

/// Board at rest: gravity on +z, a constant gyro bias plus white noise.
pub struct SimulatedImu<G = StdRng> {
    rng: G,
    gyro_bias: DVec3,
    gyro_noise: f64,
    accel_noise: f64,
}

impl SimulatedImu {
    pub fn new(gyro_bias: DVec3) -> Self {
        Self::with_rng(StdRng::from_os_rng(), gyro_bias)
    }
}

impl<G: Rng> SimulatedImu<G> {
    pub fn with_rng(rng: G, gyro_bias: DVec3) -> Self {
        debug!(?gyro_bias, "Simulated IMU created");
        Self {
            rng,
            gyro_bias,
            gyro_noise: 0.002,
            accel_noise: 0.05,
        }
    }

    pub fn with_noise(mut self, gyro_noise: f64, accel_noise: f64) -> Self {
        self.gyro_noise = gyro_noise;
        self.accel_noise = accel_noise;
        self
    }

    fn noise(&mut self, amplitude: f64) -> DVec3 {
        if amplitude <= 0.0 {
            return DVec3::ZERO;
        }
        DVec3::new(
            self.rng.random_range(-amplitude..=amplitude),
            self.rng.random_range(-amplitude..=amplitude),
            self.rng.random_range(-amplitude..=amplitude),
        )
    }
}

impl<G: Rng> ImuFeed for SimulatedImu<G> {
    fn next_sample(&mut self) -> Result<ImuSample> {
        let gyro = self.gyro_bias + self.noise(self.gyro_noise);
        let accel = DVec3::new(0.0, 0.0, 9.81) + self.noise(self.accel_noise);
        Ok(ImuSample::new(gyro, accel))
    }
}
