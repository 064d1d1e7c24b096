use std::path::{Path, PathBuf};

use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{InstrumentError, Result};
use crate::orientation::FrameInput;
use crate::surface::Point;

// ============================================================================
// COLOR
// ============================================================================

/// RGB color used by every instrument element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::new(0x00, 0x00, 0x00);
    /// Out-of-envelope alarm color, also used for markers and labels.
    pub const RED: Color = Color::new(0xff, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn as_tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

/// One fixed color per cube face, in `CubeFace` order.
pub const CUBE_FACE_COLORS: [Color; 6] = [
    Color::new(0x3a, 0x7b, 0xd5),
    Color::new(0xe0, 0x8e, 0x2b),
    Color::new(0x4c, 0xaf, 0x50),
    Color::new(0xab, 0x47, 0xbc),
    Color::new(0x26, 0xa6, 0x9a),
    Color::new(0xfd, 0xd8, 0x35),
];

// ============================================================================
// AXIS CONVENTION
// ============================================================================

/// Physical attitude axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Roll,
    Pitch,
}

/// Which physical angle drives a visual element, and with what sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisFeed {
    pub axis: Axis,
    #[serde(default)]
    pub inverted: bool,
}

impl AxisFeed {
    pub const fn direct(axis: Axis) -> Self {
        Self {
            axis,
            inverted: false,
        }
    }

    pub const fn inverted(axis: Axis) -> Self {
        Self {
            axis,
            inverted: true,
        }
    }

    /// Reads this feed's angle (degrees) out of a frame input.
    pub fn read(&self, input: &FrameInput) -> f64 {
        let value = match self.axis {
            Axis::Roll => input.roll,
            Axis::Pitch => input.pitch,
        };
        if self.inverted {
            -value
        } else {
            value
        }
    }
}

/// Wiring of one ladder strip: the angle that picks its fill color and the
/// angle its tape scrolls with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderWiring {
    pub color: AxisFeed,
    pub tape: AxisFeed,
}

/// Every place where a physical angle reaches a visual element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisConvention {
    /// Strip along the left edge (the pitch ladder).
    pub vertical_ladder: LadderWiring,
    /// Strip along the top edge (the roll ladder).
    pub horizontal_ladder: LadderWiring,
    pub roll_dial: AxisFeed,
    pub pitch_dial: AxisFeed,
    pub cube_roll: AxisFeed,
    pub cube_pitch: AxisFeed,
}

impl AxisConvention {
    /// Wiring of the deployed rover instrument.
    ///
    /// Ladders are colored by their own axis. The vertical tape scrolls with
    /// roll and the horizontal tape with negated pitch, as on the rover
    /// display. The pitch dial is fed negated pitch so its moving dot lines up
    /// with the printed labels.
    pub const fn standard() -> Self {
        Self {
            vertical_ladder: LadderWiring {
                color: AxisFeed::direct(Axis::Pitch),
                tape: AxisFeed::direct(Axis::Roll),
            },
            horizontal_ladder: LadderWiring {
                color: AxisFeed::direct(Axis::Roll),
                tape: AxisFeed::inverted(Axis::Pitch),
            },
            roll_dial: AxisFeed::direct(Axis::Roll),
            pitch_dial: AxisFeed::inverted(Axis::Pitch),
            cube_roll: AxisFeed::direct(Axis::Roll),
            cube_pitch: AxisFeed::direct(Axis::Pitch),
        }
    }

    /// Every element driven by its own axis with no sign flips.
    pub const fn direct() -> Self {
        Self {
            vertical_ladder: LadderWiring {
                color: AxisFeed::direct(Axis::Pitch),
                tape: AxisFeed::direct(Axis::Pitch),
            },
            horizontal_ladder: LadderWiring {
                color: AxisFeed::direct(Axis::Roll),
                tape: AxisFeed::direct(Axis::Roll),
            },
            roll_dial: AxisFeed::direct(Axis::Roll),
            pitch_dial: AxisFeed::direct(Axis::Pitch),
            cube_roll: AxisFeed::direct(Axis::Roll),
            cube_pitch: AxisFeed::direct(Axis::Pitch),
        }
    }
}

impl Default for AxisConvention {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// CALIBRATION METHOD
// ============================================================================

/// How the gyro bias is estimated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CalibrationMethod {
    /// Per-axis arithmetic mean of every sample.
    #[default]
    Mean,
    /// Per-axis midpoint of the observed range after dropping the first
    /// `discard` samples.
    MidRange { discard: usize },
}

// ============================================================================
// SCREEN GEOMETRY
// ============================================================================

/// Viewport size and its center; fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    width: usize,
    height: usize,
}

impl ScreenGeometry {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(InstrumentError::InvalidConfiguration(format!(
                "screen must have a positive size, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Integer center, as the rover display placed it.
    pub fn center(&self) -> Point {
        Point::new((self.width / 2) as f64, (self.height / 2) as f64)
    }

    /// Center of the roll dial (left quarter).
    pub fn roll_dial_center(&self) -> Point {
        Point::new((self.width / 4) as f64, (self.height / 2) as f64)
    }

    /// Center of the pitch dial (right quarter).
    pub fn pitch_dial_center(&self) -> Point {
        Point::new((3 * self.width / 4) as f64, (self.height / 2) as f64)
    }
}

// ============================================================================
// INSTRUMENT CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    // Window configuration
    #[builder(default = "Attitude Instrument".to_string())]
    pub title: String,
    #[builder(default = 640)]
    pub window_width: usize,
    #[builder(default = 380)]
    pub window_height: usize,
    #[builder(default = 60.0)]
    pub max_framerate: f64,

    // Horizon ladder configuration
    #[builder(default = 10.0)]
    pub ladder_thickness: f64,
    #[builder(default = 10)]
    pub ladder_tick_interval: u32,
    #[builder(default = 40)]
    pub ladder_span: u32,
    #[builder(default = 24.0)]
    pub ladder_font_size: f32,
    #[builder(default = 10.0)]
    pub ladder_marker_size: f64,

    // Dial configuration
    #[builder(default = 100.0)]
    pub dial_radius: f64,
    #[builder(default = 4.0)]
    pub dial_thickness: f32,
    #[builder(default = 10.0)]
    pub dial_marker_length: f64,
    #[builder(default = 30)]
    pub dial_tick_interval: u32,
    #[builder(default = 2.0)]
    pub dial_tick_thickness: f32,
    #[builder(default = 5.0)]
    pub dial_dot_radius: f64,
    #[builder(default = 24.0)]
    pub dial_font_size: f32,
    #[builder(default = true)]
    pub dial_readouts: bool,
    #[builder(default = 0.5)]
    pub dial_image_scale: f64,

    // Cube configuration
    #[builder(default = 50.0)]
    pub cube_size: f64,
    #[builder(default = 500.0)]
    pub cube_depth: f64,
    #[builder(default = 2.0)]
    pub cube_edge_thickness: f32,

    // Sensor pipeline configuration
    #[builder(default = 1000)]
    pub calibration_samples: usize,
    #[builder(default)]
    pub calibration_method: CalibrationMethod,
    #[builder(default = [0.0; 3])]
    pub manual_gyro_bias: [f64; 3],
    #[builder(default = 10)]
    pub samples_per_frame: usize,
    #[builder(default = 100.0)]
    pub sample_rate_hz: f64,
    #[builder(default = 0.033)]
    pub madgwick_beta: f64,
    #[builder(default = 1.0)]
    pub manual_step: f64,

    // Conventions
    #[builder(default)]
    pub axis_convention: AxisConvention,

    // Colors
    #[builder(default = Color::WHITE)]
    pub background_color: Color,
    #[builder(default = Color::RED)]
    pub marker_color: Color,
    #[builder(default = Color::BLACK)]
    pub cube_edge_color: Color,
    #[builder(default = CUBE_FACE_COLORS)]
    pub cube_face_colors: [Color; 6],

    // Font configuration
    pub font_path: Option<PathBuf>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl InstrumentConfig {
    /// Loads a TOML file; keys missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: InstrumentConfig = toml::from_str(&contents)?;
        info!(?path, "Loaded config");
        Ok(config)
    }

    pub fn geometry(&self) -> Result<ScreenGeometry> {
        ScreenGeometry::new(self.window_width, self.window_height)
    }

    /// Rejects every setting the engine cannot start with.
    pub fn validate(&self) -> Result<()> {
        self.geometry()?;
        let positive = [
            ("max_framerate", self.max_framerate),
            ("ladder_thickness", self.ladder_thickness),
            ("dial_radius", self.dial_radius),
            ("cube_size", self.cube_size),
            ("cube_depth", self.cube_depth),
            ("sample_rate_hz", self.sample_rate_hz),
            ("dial_image_scale", self.dial_image_scale),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(InstrumentError::InvalidConfiguration(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.ladder_tick_interval == 0 || self.dial_tick_interval == 0 {
            return Err(InstrumentError::InvalidConfiguration(
                "tick intervals must be at least one degree".to_string(),
            ));
        }
        if self.ladder_span == 0 {
            return Err(InstrumentError::InvalidConfiguration(
                "ladder_span must be at least one degree".to_string(),
            ));
        }
        if self.ladder_span % self.ladder_tick_interval != 0 {
            return Err(InstrumentError::InvalidConfiguration(format!(
                "ladder_span {} is not a multiple of ladder_tick_interval {}",
                self.ladder_span, self.ladder_tick_interval
            )));
        }
        if self.calibration_samples == 0 {
            return Err(InstrumentError::InvalidConfiguration(
                "calibration needs at least one sample".to_string(),
            ));
        }
        if let CalibrationMethod::MidRange { discard } = self.calibration_method {
            if discard >= self.calibration_samples {
                return Err(InstrumentError::InvalidConfiguration(format!(
                    "mid-range calibration discards {discard} of {} samples",
                    self.calibration_samples
                )));
            }
        }
        if self.samples_per_frame == 0 {
            return Err(InstrumentError::InvalidConfiguration(
                "samples_per_frame must be at least one".to_string(),
            ));
        }
        Ok(())
    }
}
