// ============================================================================
// CRATE CONFIGURATION & MODULES
// ============================================================================

//! Attitude instrument: horizon ladders, roll and pitch dials and a
//! perspective cube, drawn from a roll/pitch estimate every frame.

pub mod calibration;
pub mod canvas;
pub mod color;
pub mod config;
pub mod cube;
pub mod dial;
pub mod error;
pub mod feed;
pub mod fusion;
pub mod horizon;
pub mod instrument;
pub mod orientation;
pub mod source;
pub mod surface;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use calibration::{calibrate, calibrate_midrange, calibrate_with, BiasCorrection, BiasVector};
pub use canvas::{load_font, Canvas};
pub use color::color_for;
pub use config::{
    Axis, AxisConvention, AxisFeed, CalibrationMethod, Color, InstrumentConfig, LadderWiring,
    ScreenGeometry,
};
pub use cube::{CubeFace, CubeRenderer};
pub use dial::DialRenderer;
pub use error::{InstrumentError, Result};
pub use feed::{ImuFeed, ImuSample, LineFeed, SimulatedImu};
pub use fusion::{FusionFilter, MadgwickFusion};
pub use horizon::{HorizonLayout, HorizonRenderer};
pub use instrument::{FrameBuffer, FramePacer, InstrumentLoop};
pub use orientation::{to_euler, Attitude, FrameInput};
pub use source::{AttitudeSource, ChannelAttitude, ManualControl, ManualKey, SensorAttitude};
pub use surface::{Bitmap, DrawCommand, Point, Rect, Scene, Surface};
