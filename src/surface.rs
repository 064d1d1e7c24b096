use crate::config::Color;
use crate::error::{InstrumentError, Result};

// ============================================================================
// GEOMETRY
// ============================================================================

/// Screen-space point, pixels, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from `self` along a counter-clockwise screen angle
    /// (degrees, 0 pointing right, 90 pointing up).
    pub fn polar(self, radius: f64, screen_angle_deg: f64) -> Self {
        let rad = screen_angle_deg.to_radians();
        Self::new(self.x + radius * rad.cos(), self.y - radius * rad.sin())
    }

    pub fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

// ============================================================================
// BITMAP
// ============================================================================

/// Owned RGBA image blitted inside a dial.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    rgba: Vec<u8>,
}

impl Bitmap {
    pub fn from_rgba(width: usize, height: usize, rgba: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(InstrumentError::InvalidConfiguration(format!(
                "bitmap must have a positive size, got {width}x{height}"
            )));
        }
        if rgba.len() != width * height * 4 {
            return Err(InstrumentError::Surface(format!(
                "bitmap buffer holds {} bytes, {width}x{height} RGBA needs {}",
                rgba.len(),
                width * height * 4
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Fully transparent bitmap.
    pub fn transparent(width: usize, height: usize) -> Result<Self> {
        Self::from_rgba(width, height, vec![0; width * height * 4])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn rgba_mut(&mut self) -> &mut [u8] {
        &mut self.rgba
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }

    /// Nearest-neighbour rescale; never collapses below one pixel.
    pub fn scaled(&self, factor: f64) -> Bitmap {
        let width = ((self.width as f64 * factor) as usize).max(1);
        let height = ((self.height as f64 * factor) as usize).max(1);
        let mut rgba = Vec::with_capacity(width * height * 4);
        for y in 0..height {
            let sy = ((y as f64 / factor) as usize).min(self.height - 1);
            for x in 0..width {
                let sx = ((x as f64 / factor) as usize).min(self.width - 1);
                rgba.extend_from_slice(&self.pixel(sx, sy));
            }
        }
        Bitmap {
            width,
            height,
            rgba,
        }
    }

    /// Rotates counter-clockwise by `degrees` (as seen on screen).
    ///
    /// The result is sized to the rotated bounding box, so its dimensions
    /// change with the angle; uncovered corners are transparent.
    pub fn rotated(&self, degrees: f64) -> Bitmap {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let (w, h) = (self.width as f64, self.height as f64);
        let width = ((w * cos.abs() + h * sin.abs()).round() as usize).max(1);
        let height = ((w * sin.abs() + h * cos.abs()).round() as usize).max(1);
        let (src_cx, src_cy) = (w / 2.0, h / 2.0);
        let (dst_cx, dst_cy) = (width as f64 / 2.0, height as f64 / 2.0);

        let mut rgba = vec![0u8; width * height * 4];
        for y in 0..height {
            for x in 0..width {
                let dx = x as f64 + 0.5 - dst_cx;
                let dy = y as f64 + 0.5 - dst_cy;
                // Inverse of the on-screen counter-clockwise rotation.
                let sx = dx * cos - dy * sin + src_cx;
                let sy = dx * sin + dy * cos + src_cy;
                if sx < 0.0 || sy < 0.0 || sx >= w || sy >= h {
                    continue;
                }
                let idx = (y * width + x) * 4;
                rgba[idx..idx + 4].copy_from_slice(&self.pixel(sx as usize, sy as usize));
            }
        }
        Bitmap {
            width,
            height,
            rgba,
        }
    }
}

// ============================================================================
// SURFACE
// ============================================================================

/// Abstract 2D raster target every renderer draws through.
pub trait Surface {
    /// Fills the whole surface.
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, thickness: f32, color: Color);
    fn line(&mut self, from: Point, to: Point, thickness: f32, color: Color);
    /// Filled convex polygon.
    fn polygon(&mut self, points: &[Point], color: Color);
    fn fill_circle(&mut self, center: Point, radius: f64, color: Color);
    fn stroke_circle(&mut self, center: Point, radius: f64, thickness: f32, color: Color);
    /// Text centered on `center`, blended with `alpha` (0 transparent).
    fn text(&mut self, center: Point, text: &str, font_size: f32, color: Color, alpha: u8);
    /// Bitmap with its top-left corner at `origin`.
    fn image(&mut self, origin: Point, bitmap: &Bitmap);
}

// ============================================================================
// RETAINED MODE ABSTRACTIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        thickness: f32,
        color: Color,
    },
    Line {
        from: Point,
        to: Point,
        thickness: f32,
        color: Color,
    },
    Polygon {
        points: Vec<Point>,
        color: Color,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: Color,
    },
    StrokeCircle {
        center: Point,
        radius: f64,
        thickness: f32,
        color: Color,
    },
    Text {
        center: Point,
        text: String,
        font_size: f32,
        color: Color,
        alpha: u8,
    },
    Image {
        origin: Point,
        bitmap: Bitmap,
    },
}

/// Recorded frame: renderers draw into it, then it is replayed onto a
/// rasterizing surface.
#[derive(Debug, Default)]
pub struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Text commands whose string equals `text`.
    pub fn texts<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a DrawCommand> + 'a {
        self.commands
            .iter()
            .filter(move |c| matches!(c, DrawCommand::Text { text: t, .. } if t == text))
    }

    pub fn render<S: Surface + ?Sized>(&self, target: &mut S) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => target.clear(*color),
                DrawCommand::FillRect { rect, color } => target.fill_rect(*rect, *color),
                DrawCommand::StrokeRect {
                    rect,
                    thickness,
                    color,
                } => target.stroke_rect(*rect, *thickness, *color),
                DrawCommand::Line {
                    from,
                    to,
                    thickness,
                    color,
                } => target.line(*from, *to, *thickness, *color),
                DrawCommand::Polygon { points, color } => target.polygon(points, *color),
                DrawCommand::FillCircle {
                    center,
                    radius,
                    color,
                } => target.fill_circle(*center, *radius, *color),
                DrawCommand::StrokeCircle {
                    center,
                    radius,
                    thickness,
                    color,
                } => target.stroke_circle(*center, *radius, *thickness, *color),
                DrawCommand::Text {
                    center,
                    text,
                    font_size,
                    color,
                    alpha,
                } => target.text(*center, text, *font_size, *color, *alpha),
                DrawCommand::Image { origin, bitmap } => target.image(*origin, bitmap),
            }
        }
    }
}

impl Surface for Scene {
    fn clear(&mut self, color: Color) {
        self.add_command(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.add_command(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, thickness: f32, color: Color) {
        self.add_command(DrawCommand::StrokeRect {
            rect,
            thickness,
            color,
        });
    }

    fn line(&mut self, from: Point, to: Point, thickness: f32, color: Color) {
        self.add_command(DrawCommand::Line {
            from,
            to,
            thickness,
            color,
        });
    }

    fn polygon(&mut self, points: &[Point], color: Color) {
        self.add_command(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        self.add_command(DrawCommand::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, thickness: f32, color: Color) {
        self.add_command(DrawCommand::StrokeCircle {
            center,
            radius,
            thickness,
            color,
        });
    }

    fn text(&mut self, center: Point, text: &str, font_size: f32, color: Color, alpha: u8) {
        self.add_command(DrawCommand::Text {
            center,
            text: text.to_string(),
            font_size,
            color,
            alpha,
        });
    }

    fn image(&mut self, origin: Point, bitmap: &Bitmap) {
        self.add_command(DrawCommand::Image {
            origin,
            bitmap: bitmap.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize) -> Bitmap {
        Bitmap::from_rgba(width, height, vec![0xff; width * height * 4]).unwrap()
    }

    #[test]
    fn polar_uses_screen_orientation() {
        let c = Point::new(100.0, 100.0);
        let up = c.polar(10.0, 90.0);
        assert!((up.x - 100.0).abs() < 1e-9);
        assert!((up.y - 90.0).abs() < 1e-9);
        let right = c.polar(10.0, 0.0);
        assert!((right.x - 110.0).abs() < 1e-9);
        assert!((right.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn bitmap_rejects_mismatched_buffers() {
        assert!(Bitmap::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(matches!(
            Bitmap::from_rgba(0, 2, vec![]),
            Err(InstrumentError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let bitmap = solid(40, 10);
        let turned = bitmap.rotated(90.0);
        assert_eq!((turned.width(), turned.height()), (10, 40));
        let back = bitmap.rotated(180.0);
        assert_eq!((back.width(), back.height()), (40, 10));
    }

    #[test]
    fn diagonal_turn_grows_bounding_box_with_transparent_corners() {
        let bitmap = solid(20, 20);
        let turned = bitmap.rotated(45.0);
        assert_eq!(turned.width(), 28);
        assert_eq!(turned.height(), 28);
        assert_eq!(turned.pixel(0, 0)[3], 0);
        assert_eq!(turned.pixel(14, 14)[3], 0xff);
    }

    #[test]
    fn counter_clockwise_turn_moves_top_marker_left() {
        // Opaque column along the top-center of a 9x9 tile.
        let mut bitmap = Bitmap::transparent(9, 9).unwrap();
        for y in 0..3 {
            let idx = (y * 9 + 4) * 4;
            bitmap.rgba_mut()[idx..idx + 4].copy_from_slice(&[0, 0, 0, 0xff]);
        }
        let turned = bitmap.rotated(90.0);
        // After a quarter turn counter-clockwise the marker points left.
        assert_eq!(turned.pixel(0, 4)[3], 0xff);
        assert_eq!(turned.pixel(8, 4)[3], 0);
    }

    #[test]
    fn scaling_keeps_at_least_one_pixel() {
        let bitmap = solid(10, 4);
        let half = bitmap.scaled(0.5);
        assert_eq!((half.width(), half.height()), (5, 2));
        let tiny = bitmap.scaled(0.01);
        assert_eq!((tiny.width(), tiny.height()), (1, 1));
    }

    #[test]
    fn scene_replays_in_order() {
        let mut scene = Scene::new();
        scene.clear(Color::WHITE);
        scene.text(Point::new(1.0, 2.0), "10", 24.0, Color::RED, 128);
        scene.line(Point::default(), Point::new(3.0, 3.0), 2.0, Color::BLACK);

        let mut copy = Scene::new();
        scene.render(&mut copy);
        assert_eq!(copy.commands(), scene.commands());
        assert_eq!(scene.texts("10").count(), 1);
        assert_eq!(scene.texts("20").count(), 0);
    }
}
