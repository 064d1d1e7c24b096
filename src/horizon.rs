//! Artificial horizon ladders: a vertical strip down the left edge and a
//! horizontal strip across the top, each with scrolling tick labels and a
//! fixed center marker.

use crate::color::color_for;
use crate::config::{Color, InstrumentConfig, LadderWiring, ScreenGeometry};
use crate::orientation::FrameInput;
use crate::surface::{Point, Rect, Surface};

/// One scrolling tick label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickLabel {
    pub value: i32,
    pub position: Point,
    /// 255 at the center tick, 0 at the span edge.
    pub alpha: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LadderLayout {
    pub strip: Rect,
    pub color: Color,
    pub labels: Vec<TickLabel>,
    pub marker: [Point; 3],
}

/// Everything the horizon draws for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonLayout {
    pub vertical: LadderLayout,
    pub horizontal: LadderLayout,
}

/// Draws both ladders. Holds only configuration; no state survives a frame.
#[derive(Debug, Clone)]
pub struct HorizonRenderer {
    geometry: ScreenGeometry,
    thickness: f64,
    tick_interval: u32,
    span: u32,
    font_size: f32,
    marker_size: f64,
    marker_color: Color,
    vertical: LadderWiring,
    horizontal: LadderWiring,
}

impl HorizonRenderer {
    pub fn new(config: &InstrumentConfig, geometry: ScreenGeometry) -> Self {
        Self {
            geometry,
            thickness: config.ladder_thickness,
            tick_interval: config.ladder_tick_interval.max(1),
            span: config.ladder_span.max(1),
            font_size: config.ladder_font_size,
            marker_size: config.ladder_marker_size,
            marker_color: config.marker_color,
            vertical: config.axis_convention.vertical_ladder,
            horizontal: config.axis_convention.horizontal_ladder,
        }
    }

    fn ticks(&self) -> impl Iterator<Item = i32> {
        let span = self.span as i32;
        (-span..=span).step_by(self.tick_interval as usize)
    }

    fn alpha(&self, tick: i32) -> u8 {
        let fade = 1.0 - (tick.abs() as f64) / (self.span as f64);
        (255.0 * fade.max(0.0)) as u8
    }

    pub fn layout(&self, input: &FrameInput) -> HorizonLayout {
        let (width, height) = (
            self.geometry.width() as f64,
            self.geometry.height() as f64,
        );
        let center = self.geometry.center();
        let t = self.thickness;
        let m = self.marker_size;

        let live = self.vertical.tape.read(input);
        let vertical = LadderLayout {
            strip: Rect::new(0.0, 0.0, t, height),
            color: color_for(self.vertical.color.read(input)),
            labels: self
                .ticks()
                .map(|tick| TickLabel {
                    value: tick,
                    position: Point::new(3.0 * t, center.y - (height / 180.0) * (tick as f64 - live)),
                    alpha: self.alpha(tick),
                })
                .collect(),
            marker: [
                Point::new(4.0 * t, center.y),
                Point::new(5.0 * t, center.y + m),
                Point::new(5.0 * t, center.y - m),
            ],
        };

        let live = self.horizontal.tape.read(input);
        let horizontal = LadderLayout {
            strip: Rect::new(0.0, 0.0, width, t),
            color: color_for(self.horizontal.color.read(input)),
            labels: self
                .ticks()
                .map(|tick| TickLabel {
                    value: tick,
                    position: Point::new(center.x + (width / 180.0) * (tick as f64 - live), 3.0 * t),
                    alpha: self.alpha(tick),
                })
                .collect(),
            marker: [
                Point::new(center.x - m, 4.0 * t),
                Point::new(center.x + m, 4.0 * t),
                Point::new(center.x, 3.0 * t),
            ],
        };

        HorizonLayout {
            vertical,
            horizontal,
        }
    }

    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S, input: &FrameInput) {
        let layout = self.layout(input);
        for ladder in [&layout.vertical, &layout.horizontal] {
            surface.fill_rect(ladder.strip, ladder.color);
            for label in &ladder.labels {
                surface.text(
                    label.position,
                    &label.value.to_string(),
                    self.font_size,
                    self.marker_color,
                    label.alpha,
                );
            }
            surface.polygon(&ladder.marker, self.marker_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AxisConvention;
    use crate::surface::{DrawCommand, Scene};
    use std::time::Duration;

    fn input(roll: f64, pitch: f64) -> FrameInput {
        FrameInput {
            roll,
            pitch,
            timestamp: Duration::ZERO,
            stale: false,
        }
    }

    fn renderer(convention: AxisConvention) -> HorizonRenderer {
        let config = InstrumentConfig::builder().axis_convention(convention).build();
        HorizonRenderer::new(&config, config.geometry().unwrap())
    }

    #[test]
    fn level_labels_are_evenly_spaced_around_center() {
        let layout = renderer(AxisConvention::direct()).layout(&input(0.0, 0.0));
        let values: Vec<i32> = layout.vertical.labels.iter().map(|l| l.value).collect();
        assert_eq!(values, vec![-40, -30, -20, -10, 0, 10, 20, 30, 40]);
        let zero = layout.vertical.labels[4];
        assert_eq!(zero.position, Point::new(30.0, 190.0));
        assert_eq!(zero.alpha, 255);
        let top = layout.vertical.labels[8];
        assert!((top.position.y - (190.0 - 380.0 / 180.0 * 40.0)).abs() < 1e-9);
    }

    #[test]
    fn edge_labels_are_emitted_fully_transparent() {
        let layout = renderer(AxisConvention::direct()).layout(&input(12.0, -7.0));
        for ladder in [&layout.vertical, &layout.horizontal] {
            assert_eq!(ladder.labels.len(), 9);
            assert_eq!(ladder.labels[0].alpha, 0);
            assert_eq!(ladder.labels[8].alpha, 0);
            assert_eq!(ladder.labels[2].alpha, 127);
        }
    }

    #[test]
    fn markers_never_move() {
        let r = renderer(AxisConvention::standard());
        let rest = r.layout(&input(0.0, 0.0));
        for (roll, pitch) in [(45.0, 0.0), (-80.0, 33.0), (120.0, -95.0)] {
            let moved = r.layout(&input(roll, pitch));
            assert_eq!(moved.vertical.marker, rest.vertical.marker);
            assert_eq!(moved.horizontal.marker, rest.horizontal.marker);
        }
        assert_eq!(
            rest.vertical.marker,
            [
                Point::new(40.0, 190.0),
                Point::new(50.0, 200.0),
                Point::new(50.0, 180.0)
            ]
        );
        assert_eq!(
            rest.horizontal.marker,
            [
                Point::new(310.0, 40.0),
                Point::new(330.0, 40.0),
                Point::new(320.0, 30.0)
            ]
        );
    }

    #[test]
    fn horizontal_tape_scrolls_with_live_angle() {
        let layout = renderer(AxisConvention::direct()).layout(&input(18.0, 0.0));
        // The 18 degree point of the tape sits under the marker.
        let ten = layout.horizontal.labels[5];
        assert_eq!(ten.value, 10);
        assert!((ten.position.x - (320.0 + 640.0 / 180.0 * -8.0)).abs() < 1e-9);
        assert_eq!(ten.position.y, 30.0);
    }

    #[test]
    fn standard_convention_feeds_tapes_from_the_cross_axis() {
        let layout = renderer(AxisConvention::standard()).layout(&input(45.0, 20.0));
        let forty = layout.vertical.labels[8];
        assert!((forty.position.y - (190.0 + 380.0 / 36.0)).abs() < 1e-9);
        // Horizontal tape follows negated pitch.
        let zero = layout.horizontal.labels[4];
        assert!((zero.position.x - (320.0 + 640.0 / 180.0 * 20.0)).abs() < 1e-9);
        assert_eq!(layout.vertical.color, color_for(20.0));
        assert_eq!(layout.horizontal.color, color_for(45.0));
    }

    #[test]
    fn strips_span_their_edges() {
        let layout = renderer(AxisConvention::standard()).layout(&input(0.0, 0.0));
        assert_eq!(layout.vertical.strip, Rect::new(0.0, 0.0, 10.0, 380.0));
        assert_eq!(layout.horizontal.strip, Rect::new(0.0, 0.0, 640.0, 10.0));
        assert_eq!(layout.vertical.color, Color::new(0, 255, 0));
    }

    #[test]
    fn render_draws_strip_then_labels_then_marker() {
        let r = renderer(AxisConvention::standard());
        let mut scene = Scene::new();
        r.render(&mut scene, &input(5.0, 5.0));
        let commands = scene.commands();
        assert_eq!(commands.len(), 2 * (1 + 9 + 1));
        assert!(matches!(commands[0], DrawCommand::FillRect { .. }));
        assert!(matches!(commands[10], DrawCommand::Polygon { .. }));
        assert!(matches!(commands[11], DrawCommand::FillRect { .. }));
        assert_eq!(scene.texts("-40").count(), 2);
    }
}
