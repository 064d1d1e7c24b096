// ============================================================================
// IMMEDIATE-MODE RASTERIZER
// ============================================================================

use std::path::{Path, PathBuf};

use rusttype::{point, Font, PositionedGlyph, Scale};
use tracing::{info, warn};

use crate::config::Color;
use crate::error::{InstrumentError, Result};
use crate::surface::{Bitmap, Point, Rect, Surface};

/// Fonts tried when the config names none.
const FALLBACK_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads the label font. Without one the instrument still runs, minus text.
pub fn load_font(configured: Option<&Path>) -> Option<Font<'static>> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(FALLBACK_FONTS.iter().map(PathBuf::from));
    for path in candidates {
        let Ok(data) = std::fs::read(&path) else {
            continue;
        };
        match Font::try_from_vec(data) {
            Some(font) => {
                info!(?path, "Loaded label font");
                return Some(font);
            }
            None => warn!(?path, "Not a usable font file"),
        }
    }
    warn!("No label font found, labels will not be drawn");
    None
}

/// RGBA8 pixel buffer borrowed for one frame.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: usize,
    height: usize,
    font: Option<&'a Font<'static>>,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 || frame.len() != width * height * 4 {
            return Err(InstrumentError::Surface(format!(
                "{} byte buffer cannot back a {width}x{height} RGBA frame",
                frame.len()
            )));
        }
        Ok(Self {
            frame,
            width,
            height,
            font: None,
        })
    }

    pub fn with_font(mut self, font: Option<&'a Font<'static>>) -> Self {
        self.font = font;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.frame[idx],
            self.frame[idx + 1],
            self.frame[idx + 2],
            self.frame[idx + 3],
        ]
    }

    fn blend(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 {
            return;
        }
        set_pixel(self.frame, self.width, x as usize, y as usize, color, alpha);
    }

    /// Pixel bounds clamped to the frame, inclusive.
    fn clip(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<(i32, i32, i32, i32)> {
        let x0 = min_x.floor().max(0.0) as i32;
        let y0 = min_y.floor().max(0.0) as i32;
        let x1 = max_x.ceil().min(self.width as f64 - 1.0) as i32;
        let y1 = max_y.ceil().min(self.height as f64 - 1.0) as i32;
        (x0 <= x1 && y0 <= y1).then_some((x0, y0, x1, y1))
    }
}

// ============================================================================
// DRAWING PRIMITIVES
// ============================================================================

/// Source-over blend of one pixel; out-of-bounds writes are dropped.
fn set_pixel(frame: &mut [u8], width: usize, x: usize, y: usize, color: Color, alpha: f32) {
    if x < width && y < frame.len() / (width * 4) {
        let idx = (y * width + x) * 4;
        let a = alpha.clamp(0.0, 1.0);
        let dst_a = frame[idx + 3] as f32 / 255.0;
        let out_a = a + dst_a * (1.0 - a);
        if out_a <= 0.0 {
            return;
        }
        let (r, g, b) = color.as_tuple();
        let mix = |src: u8, dst: u8| {
            ((src as f32 * a + dst as f32 * dst_a * (1.0 - a)) / out_a).round() as u8
        };
        let out = [
            mix(r, frame[idx]),
            mix(g, frame[idx + 1]),
            mix(b, frame[idx + 2]),
            (out_a * 255.0).round() as u8,
        ];
        frame[idx..idx + 4].copy_from_slice(&out);
    }
}

impl Surface for Canvas<'_> {
    fn clear(&mut self, color: Color) {
        let (r, g, b) = color.as_tuple();
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[r, g, b, 0xff]);
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(
            rect.x,
            rect.y,
            rect.x + rect.width - 1.0,
            rect.y + rect.height - 1.0,
        ) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.blend(x, y, color, 1.0);
            }
        }
    }

    fn stroke_rect(&mut self, rect: Rect, thickness: f32, color: Color) {
        let (left, top) = (rect.x, rect.y);
        let (right, bottom) = (rect.x + rect.width, rect.y + rect.height);
        for (from, to) in [
            (Point::new(left, top), Point::new(right, top)),
            (Point::new(left, bottom), Point::new(right, bottom)),
            (Point::new(left, top), Point::new(left, bottom)),
            (Point::new(right, top), Point::new(right, bottom)),
        ] {
            self.line(from, to, thickness, color);
        }
    }

    fn line(&mut self, from: Point, to: Point, thickness: f32, color: Color) {
        let pad = thickness as f64 + 1.0;
        let Some((x0, y0, x1, y1)) = self.clip(
            from.x.min(to.x) - pad,
            from.y.min(to.y) - pad,
            from.x.max(to.x) + pad,
            from.y.max(to.y) + pad,
        ) else {
            return;
        };
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let len_sq = dx * dx + dy * dy;
        let half = thickness as f64 / 2.0;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let px = x as f64 - from.x;
                let py = y as f64 - from.y;
                let t = if len_sq > 0.0 {
                    ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let lx = from.x + t * dx;
                let ly = from.y + t * dy;
                let dist = ((lx - x as f64).powi(2) + (ly - y as f64).powi(2)).sqrt();
                let aa = (1.0 - (dist - half).clamp(0.0, 1.0)).clamp(0.0, 1.0);
                if aa > 0.01 {
                    self.blend(x, y, color, aa as f32);
                }
            }
        }
    }

    fn polygon(&mut self, points: &[Point], color: Color) {
        if points.len() < 3 {
            return;
        }
        let (min_x, max_x) = points
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
        let (min_y, max_y) = points
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let Some((x0, y0, x1, y1)) = self.clip(min_x, min_y, max_x, max_y) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let sample = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if inside_convex(points, sample) {
                    self.blend(x, y, color, 1.0);
                }
            }
        }
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(
            center.x - radius - 1.0,
            center.y - radius - 1.0,
            center.x + radius + 1.0,
            center.y + radius + 1.0,
        ) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dist = Point::new(x as f64, y as f64).distance(center);
                let aa = if dist > radius {
                    1.0 - (dist - radius).min(1.0)
                } else {
                    1.0
                };
                if aa > 0.0 {
                    self.blend(x, y, color, aa as f32);
                }
            }
        }
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, thickness: f32, color: Color) {
        let inner = radius - thickness as f64;
        let Some((x0, y0, x1, y1)) = self.clip(
            center.x - radius - 1.0,
            center.y - radius - 1.0,
            center.x + radius + 1.0,
            center.y + radius + 1.0,
        ) else {
            return;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dist = Point::new(x as f64, y as f64).distance(center);
                let aa = if dist > radius {
                    1.0 - (dist - radius).min(1.0)
                } else if dist < inner {
                    1.0 - (inner - dist).min(1.0)
                } else {
                    1.0
                };
                if aa > 0.0 {
                    self.blend(x, y, color, aa as f32);
                }
            }
        }
    }

    fn text(&mut self, center: Point, text: &str, font_size: f32, color: Color, alpha: u8) {
        let Some(font) = self.font else {
            return;
        };
        if alpha == 0 {
            return;
        }
        let opacity = alpha as f32 / 255.0;
        let scale = Scale::uniform(font_size);
        let v_metrics = font.v_metrics(scale);
        let glyphs: Vec<PositionedGlyph> = font
            .layout(text, scale, point(0.0, v_metrics.ascent))
            .collect();
        let (min_x, max_x, min_y, max_y) = glyphs
            .iter()
            .filter_map(|g| g.pixel_bounding_box())
            .fold(
                (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
                |(min_x, max_x, min_y, max_y), bb| {
                    (
                        min_x.min(bb.min.x),
                        max_x.max(bb.max.x),
                        min_y.min(bb.min.y),
                        max_y.max(bb.max.y),
                    )
                },
            );
        let width_px = if min_x < max_x { max_x - min_x } else { 0 };
        let height_px = if min_y < max_y { max_y - min_y } else { 0 };
        let offset_x = center.x.round() as i32 - width_px / 2;
        let offset_y = center.y.round() as i32 - height_px / 2;
        for glyph in glyphs {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    let px = offset_x + gx as i32 + bb.min.x - min_x;
                    let py = offset_y + gy as i32 + bb.min.y - min_y;
                    self.blend(px, py, color, v * opacity);
                });
            }
        }
    }

    fn image(&mut self, origin: Point, bitmap: &Bitmap) {
        let ox = origin.x.round() as i32;
        let oy = origin.y.round() as i32;
        for y in 0..bitmap.height() {
            for x in 0..bitmap.width() {
                let [r, g, b, a] = bitmap.pixel(x, y);
                if a == 0 {
                    continue;
                }
                self.blend(
                    ox + x as i32,
                    oy + y as i32,
                    Color::new(r, g, b),
                    a as f32 / 255.0,
                );
            }
        }
    }
}

/// Same-side test against every edge; accepts either winding.
fn inside_convex(points: &[Point], p: Point) -> bool {
    let mut sign = 0.0f64;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        if cross.abs() < f64::EPSILON {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}
