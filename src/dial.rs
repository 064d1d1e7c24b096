//! Protractor dials for roll and pitch.

use tracing::debug;

use crate::color::color_for;
use crate::config::{Axis, Color, InstrumentConfig};
use crate::error::{InstrumentError, Result};
use crate::surface::{Bitmap, Point, Surface};

/// Screen angle (degrees, counter-clockwise from +x) of a printed tick.
///
/// Roll dials put 0 at the top, pitch dials put 0 at the right.
pub fn tick_screen_angle(axis: Axis, angle: f64) -> f64 {
    match axis {
        Axis::Roll => 90.0 - angle,
        Axis::Pitch => angle,
    }
}

/// Screen angle of the moving dot for a live reading.
///
/// The pitch dot runs opposite to the printed pitch ticks.
pub fn marker_screen_angle(axis: Axis, live: f64) -> f64 {
    match axis {
        Axis::Roll => 90.0 - live,
        Axis::Pitch => -live,
    }
}

#[derive(Debug, Clone)]
pub struct DialRenderer {
    radius: f64,
    thickness: f32,
    marker_length: f64,
    tick_interval: u32,
    tick_thickness: f32,
    dot_radius: f64,
    font_size: f32,
    marker_color: Color,
    image_scale: f64,
    roll_image: Option<Bitmap>,
    pitch_image: Option<Bitmap>,
}

impl DialRenderer {
    pub fn new(config: &InstrumentConfig) -> Result<Self> {
        check_radius(config.dial_radius)?;
        Ok(Self {
            radius: config.dial_radius,
            thickness: config.dial_thickness,
            marker_length: config.dial_marker_length,
            tick_interval: config.dial_tick_interval.max(1),
            tick_thickness: config.dial_tick_thickness,
            dot_radius: config.dial_dot_radius,
            font_size: config.dial_font_size,
            marker_color: config.marker_color,
            image_scale: config.dial_image_scale,
            roll_image: None,
            pitch_image: None,
        })
    }

    /// Adds a picture of the platform inside one dial; it is scaled once here
    /// and turned with the live angle every frame.
    pub fn with_image(mut self, axis: Axis, image: &Bitmap) -> Self {
        let scaled = image.scaled(self.image_scale);
        debug!(?axis, width = scaled.width(), height = scaled.height(), "Dial image attached");
        match axis {
            Axis::Roll => self.roll_image = Some(scaled),
            Axis::Pitch => self.pitch_image = Some(scaled),
        }
        self
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn image(&self, axis: Axis) -> Option<&Bitmap> {
        match axis {
            Axis::Roll => self.roll_image.as_ref(),
            Axis::Pitch => self.pitch_image.as_ref(),
        }
    }

    /// Center of the dot for `live` on a dial of `radius` around `center`.
    pub fn marker_position(center: Point, radius: f64, live: f64, axis: Axis) -> Point {
        center.polar(radius, marker_screen_angle(axis, live))
    }

    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        center: Point,
        radius: f64,
        live: f64,
        axis: Axis,
    ) -> Result<()> {
        check_radius(radius)?;

        if let Some(image) = self.image(axis) {
            let rotated = image.rotated(-live);
            let origin = Point::new(
                center.x - (rotated.width() / 2) as f64,
                center.y - (rotated.height() / 2) as f64,
            );
            surface.image(origin, &rotated);
        }

        surface.stroke_circle(center, radius, self.thickness, color_for(live));

        let interval = self.tick_interval as usize;
        for tick in (-90..=90).step_by(interval) {
            let screen_angle = tick_screen_angle(axis, tick as f64);
            let inner = center.polar(radius, screen_angle);
            let outer = center.polar(radius + self.marker_length, screen_angle);
            surface.line(inner, outer, self.tick_thickness, self.marker_color);
            surface.text(
                Point::new(outer.x, outer.y - 10.0),
                &tick.to_string(),
                self.font_size,
                self.marker_color,
                u8::MAX,
            );
        }

        let dot = Self::marker_position(center, radius, live, axis);
        surface.fill_circle(dot, self.dot_radius, self.marker_color);
        Ok(())
    }

    /// Numeric readout centered under a dial.
    pub fn readout<S: Surface + ?Sized>(&self, surface: &mut S, center: Point, label: &str, value: f64) {
        let top = center.y + self.radius + 20.0;
        surface.text(
            Point::new(center.x, top + self.font_size as f64 / 2.0),
            &format!("{label}: {value:.3}°"),
            self.font_size,
            self.marker_color,
            u8::MAX,
        );
    }
}

fn check_radius(radius: f64) -> Result<()> {
    if radius > 0.0 {
        Ok(())
    } else {
        Err(InstrumentError::InvalidConfiguration(format!(
            "dial radius must be positive, got {radius}"
        )))
    }
}
