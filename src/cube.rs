//! Perspective attitude cube with backface culling and an edge overlay.

use glam::{DMat3, DVec3};
use tracing::debug;

use crate::config::{Color, InstrumentConfig, ScreenGeometry};
use crate::error::{InstrumentError, Result};
use crate::surface::{Point, Surface};

/// Smallest `depth + z` still projected.
const MIN_PROJECTION_DEPTH: f64 = 1e-6;

/// Object-space vertex signs, `±size/2` per axis.
const VERTEX_SIGNS: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, -1.0, 1.0],
];

const EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Cube faces, named from the viewer's side at rest (screen y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CubeFace {
    /// `z = -size/2`, the face towards the camera.
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::Front,
        CubeFace::Back,
        CubeFace::Left,
        CubeFace::Right,
        CubeFace::Top,
        CubeFace::Bottom,
    ];

    /// Vertex indices wound so `(b - a) x (c - a)` points into the cube.
    pub const fn vertices(self) -> [usize; 4] {
        match self {
            CubeFace::Front => [0, 3, 2, 1],
            CubeFace::Back => [4, 5, 6, 7],
            CubeFace::Left => [0, 1, 5, 4],
            CubeFace::Right => [3, 7, 6, 2],
            CubeFace::Top => [0, 4, 7, 3],
            CubeFace::Bottom => [1, 2, 6, 5],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone)]
pub struct CubeRenderer {
    center: Point,
    half: f64,
    depth: f64,
    edge_thickness: f32,
    edge_color: Color,
    face_colors: [Color; 6],
}

impl CubeRenderer {
    pub fn new(config: &InstrumentConfig, geometry: ScreenGeometry) -> Result<Self> {
        if !(config.cube_size > 0.0) || !(config.cube_depth > 0.0) {
            return Err(InstrumentError::InvalidConfiguration(format!(
                "cube size and depth must be positive, got {} and {}",
                config.cube_size, config.cube_depth
            )));
        }
        Ok(Self {
            center: geometry.center(),
            half: config.cube_size / 2.0,
            depth: config.cube_depth,
            edge_thickness: config.cube_edge_thickness,
            edge_color: config.cube_edge_color,
            face_colors: config.cube_face_colors,
        })
    }

    fn object_vertex(&self, index: usize) -> DVec3 {
        DVec3::from_array(VERTEX_SIGNS[index]) * self.half
    }

    /// Pitch about X, then roll about the pitched frame's Z axis.
    fn rotation(roll: f64, pitch: f64) -> DMat3 {
        DMat3::from_rotation_x(pitch) * DMat3::from_rotation_z(roll)
    }

    /// Rotated object-space vertices.
    pub fn rotated_vertices(&self, roll: f64, pitch: f64) -> [DVec3; 8] {
        let rotation = Self::rotation(roll, pitch);
        std::array::from_fn(|i| rotation * self.object_vertex(i))
    }

    /// Screen position of every vertex; `None` where the vertex reaches the
    /// projection plane.
    pub fn project(&self, roll: f64, pitch: f64) -> [Option<Point>; 8] {
        let rotated = self.rotated_vertices(roll, pitch);
        std::array::from_fn(|i| {
            let v = rotated[i];
            let denominator = self.depth + v.z;
            if denominator <= MIN_PROJECTION_DEPTH {
                debug!(vertex = i, z = v.z, "Skipping vertex behind projection plane");
                return None;
            }
            let scale = self.depth / denominator;
            Some(Point::new(
                scale * v.x + self.center.x,
                scale * v.y + self.center.y,
            ))
        })
    }

    /// Faces whose rotated normal faces the viewer, in `CubeFace::ALL` order.
    pub fn visible_faces(&self, roll: f64, pitch: f64) -> Vec<CubeFace> {
        let rotation = Self::rotation(roll, pitch);
        let viewer = DVec3::new(0.0, 0.0, -1.0);
        CubeFace::ALL
            .into_iter()
            .filter(|face| {
                let [a, b, c, _] = face.vertices().map(|i| self.object_vertex(i));
                let normal = (b - a).cross(c - a);
                (rotation * normal).dot(viewer) < 0.0
            })
            .collect()
    }

    /// Draws the visible faces, then every edge on top. Angles in radians.
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S, roll: f64, pitch: f64) {
        let projected = self.project(roll, pitch);

        for face in self.visible_faces(roll, pitch) {
            let corners: Option<Vec<Point>> =
                face.vertices().iter().map(|&i| projected[i]).collect();
            match corners {
                Some(corners) => surface.polygon(&corners, self.face_colors[face.index()]),
                None => debug!(?face, "Skipping face with unprojected vertex"),
            }
        }

        for (a, b) in EDGES {
            if let (Some(from), Some(to)) = (projected[a], projected[b]) {
                surface.line(from, to, self.edge_thickness, self.edge_color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, Scene};
    use rand::Rng;

    fn cube() -> CubeRenderer {
        let config = InstrumentConfig::default();
        CubeRenderer::new(&config, config.geometry().unwrap()).unwrap()
    }

    #[test]
    fn rejects_degenerate_cube() {
        let config = InstrumentConfig::builder().cube_size(0.0).build();
        assert!(CubeRenderer::new(&config, config.geometry().unwrap()).is_err());
        let config = InstrumentConfig::builder().cube_depth(-1.0).build();
        assert!(CubeRenderer::new(&config, config.geometry().unwrap()).is_err());
    }

    #[test]
    fn rest_projection_is_a_pure_perspective_offset() {
        let projected = cube().project(0.0, 0.0);
        for (i, point) in projected.iter().enumerate() {
            let [sx, sy, sz] = VERTEX_SIGNS[i];
            let scale = 500.0 / (500.0 + 25.0 * sz);
            let expected = Point::new(320.0 + scale * 25.0 * sx, 190.0 + scale * 25.0 * sy);
            let point = point.unwrap();
            assert!(point.distance(expected) < 1e-9, "vertex {i}: {point:?}");
        }
    }

    #[test]
    fn rest_shows_only_the_camera_facing_face() {
        assert_eq!(cube().visible_faces(0.0, 0.0), vec![CubeFace::Front]);
        // Rolling about the view axis never exposes another face.
        assert_eq!(cube().visible_faces(0.7, 0.0), vec![CubeFace::Front]);
    }

    #[test]
    fn pitched_and_rolled_cube_shows_three_faces() {
        let faces = cube().visible_faces(30f64.to_radians(), 20f64.to_radians());
        assert_eq!(faces, vec![CubeFace::Front, CubeFace::Left, CubeFace::Top]);

        let mut rng = rand::rng();
        for _ in 0..1000 {
            let roll = rng.random_range(0.05..1.5);
            let pitch = rng.random_range(0.05..1.5);
            let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            assert_eq!(cube().visible_faces(sign * roll, -sign * pitch).len(), 3);
        }
    }

    #[test]
    fn opposite_faces_are_never_both_visible() {
        let mut rng = rand::rng();
        let renderer = cube();
        for _ in 0..1000 {
            let roll = rng.random_range(-3.1..3.1);
            let pitch = rng.random_range(-1.5..1.5);
            let faces = renderer.visible_faces(roll, pitch);
            for (a, b) in [
                (CubeFace::Front, CubeFace::Back),
                (CubeFace::Left, CubeFace::Right),
                (CubeFace::Top, CubeFace::Bottom),
            ] {
                assert!(!(faces.contains(&a) && faces.contains(&b)));
            }
        }
    }

    #[test]
    fn render_draws_faces_then_all_twelve_edges() {
        let mut scene = Scene::new();
        cube().render(&mut scene, 0.4, 0.3);
        let commands = scene.commands();
        assert_eq!(commands.len(), 3 + 12);
        assert!(commands[..3]
            .iter()
            .all(|c| matches!(c, DrawCommand::Polygon { points, .. } if points.len() == 4)));
        assert!(commands[3..].iter().all(|c| matches!(
            c,
            DrawCommand::Line { color, thickness, .. } if *color == Color::BLACK && *thickness == 2.0
        )));
    }

    #[test]
    fn vertices_at_the_projection_plane_are_skipped() {
        let config = InstrumentConfig::builder().cube_depth(20.0).build();
        let renderer = CubeRenderer::new(&config, config.geometry().unwrap()).unwrap();
        let projected = renderer.project(0.0, 0.0);
        // The near face (z = -25) is behind a 20 pixel focal depth.
        assert!(projected[..4].iter().all(Option::is_none));
        assert!(projected[4..].iter().all(Option::is_some));

        let mut scene = Scene::new();
        renderer.render(&mut scene, 0.0, 0.0);
        // No face can be filled and only the four far edges survive.
        assert_eq!(scene.commands().len(), 4);
    }
}
