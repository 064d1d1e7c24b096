// ============================================================================
// INSTRUMENT LOOP
// ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::{Pixels, SurfaceTexture};
use rusttype::Font;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::canvas::Canvas;
use crate::config::{Axis, Color, InstrumentConfig, ScreenGeometry};
use crate::cube::CubeRenderer;
use crate::dial::DialRenderer;
use crate::error::{InstrumentError, Result};
use crate::horizon::HorizonRenderer;
use crate::orientation::{Attitude, FrameInput};
use crate::source::{AttitudeSource, ManualKey};
use crate::surface::{Bitmap, Point, Scene, Surface};

/// Fixed-cadence frame budget.
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_duration: Duration,
    last_frame: Option<Instant>,
}

impl FramePacer {
    pub fn new(max_framerate: f64) -> Result<Self> {
        if !(max_framerate > 0.0) || !max_framerate.is_finite() {
            return Err(InstrumentError::InvalidConfiguration(format!(
                "max_framerate must be positive, got {max_framerate}"
            )));
        }
        Ok(Self {
            frame_duration: Duration::from_secs_f64(1.0 / max_framerate),
            last_frame: None,
        })
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Whether a frame is due at `now`. The first frame always is.
    pub fn ready(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    /// Time left until the next frame is due.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_frame {
            Some(last) => self
                .frame_duration
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }
}

/// Owned RGBA back buffer, redrawn from scratch every frame.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    rgba: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(geometry: ScreenGeometry) -> Self {
        let (width, height) = (geometry.width(), geometry.height());
        Self {
            width,
            height,
            rgba: vec![0; width * height * 4],
        }
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

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }

    pub fn canvas<'a>(&'a mut self, font: Option<&'a Font<'static>>) -> Result<Canvas<'a>> {
        Ok(Canvas::new(&mut self.rgba, self.width, self.height)?.with_font(font))
    }
}

/// Drives one attitude source through the horizon, dials and cube.
pub struct InstrumentLoop<S> {
    config: InstrumentConfig,
    geometry: ScreenGeometry,
    horizon: HorizonRenderer,
    dial: DialRenderer,
    cube: CubeRenderer,
    source: S,
    font: Option<Font<'static>>,
    back_buffer: FrameBuffer,
    attitude: Attitude,
    stale: bool,
    pacer: FramePacer,
}

impl<S: AttitudeSource> InstrumentLoop<S> {
    pub fn new(config: InstrumentConfig, source: S) -> Result<Self> {
        config.validate()?;
        let geometry = config.geometry()?;
        let horizon = HorizonRenderer::new(&config, geometry);
        let dial = DialRenderer::new(&config)?;
        let cube = CubeRenderer::new(&config, geometry)?;
        let pacer = FramePacer::new(config.max_framerate)?;
        info!(
            width = geometry.width(),
            height = geometry.height(),
            fps = config.max_framerate,
            "Instrument ready"
        );
        Ok(Self {
            back_buffer: FrameBuffer::new(geometry),
            config,
            geometry,
            horizon,
            dial,
            cube,
            source,
            font: None,
            attitude: Attitude::LEVEL,
            stale: false,
            pacer,
        })
    }

    pub fn with_font(mut self, font: Option<Font<'static>>) -> Self {
        self.font = font;
        self
    }

    pub fn with_dial_image(mut self, axis: Axis, image: &Bitmap) -> Self {
        self.dial = self.dial.with_image(axis, image);
        self
    }

    pub fn geometry(&self) -> ScreenGeometry {
        self.geometry
    }

    pub fn back_buffer(&self) -> &FrameBuffer {
        &self.back_buffer
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Polls the source once. A lost feed keeps the last attitude and marks
    /// the frame stale; every other source error is fatal.
    pub fn advance(&mut self, timestamp: Duration) -> Result<FrameInput> {
        match self.source.next_attitude() {
            Ok(attitude) => {
                if self.stale {
                    info!("Attitude feed recovered");
                }
                self.stale = false;
                self.attitude = attitude;
            }
            Err(err) if err.is_recoverable() => {
                if !self.stale {
                    warn!(%err, roll = self.attitude.roll, pitch = self.attitude.pitch, "Holding last attitude");
                }
                self.stale = true;
            }
            Err(err) => return Err(err),
        }
        Ok(FrameInput {
            roll: self.attitude.roll,
            pitch: self.attitude.pitch,
            timestamp,
            stale: self.stale,
        })
    }

    /// Records one full frame: clear, horizon, dials, cube, stale flag.
    pub fn compose(&self, input: &FrameInput) -> Result<Scene> {
        let convention = &self.config.axis_convention;
        let mut scene = Scene::new();
        scene.clear(self.config.background_color);

        self.horizon.render(&mut scene, input);

        let radius = self.dial.radius();
        let roll_center = self.geometry.roll_dial_center();
        let pitch_center = self.geometry.pitch_dial_center();
        self.dial.render(
            &mut scene,
            roll_center,
            radius,
            convention.roll_dial.read(input),
            Axis::Roll,
        )?;
        self.dial.render(
            &mut scene,
            pitch_center,
            radius,
            convention.pitch_dial.read(input),
            Axis::Pitch,
        )?;
        if self.config.dial_readouts {
            self.dial.readout(&mut scene, roll_center, "Roll", input.roll);
            self.dial.readout(&mut scene, pitch_center, "Pitch", input.pitch);
        }

        self.cube.render(
            &mut scene,
            convention.cube_roll.read(input).to_radians(),
            convention.cube_pitch.read(input).to_radians(),
        );

        if input.stale {
            let corner = Point::new(
                self.geometry.width() as f64 - 20.0,
                self.geometry.height() as f64 - 20.0,
            );
            scene.text(corner, "!", self.config.dial_font_size, Color::RED, u8::MAX);
        }
        Ok(scene)
    }

    /// Advances, composes and rasterizes one frame into the back buffer.
    pub fn render_frame(&mut self, timestamp: Duration) -> Result<FrameInput> {
        let input = self.advance(timestamp)?;
        let scene = self.compose(&input)?;
        let mut canvas = self.back_buffer.canvas(self.font.as_ref())?;
        scene.render(&mut canvas);
        Ok(input)
    }

    /// Opens the window and renders until it is closed.
    pub fn run(&mut self, title: &str) -> Result<()> {
        let (width, height) = (self.geometry.width(), self.geometry.height());

        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width as f64, height as f64))
            .with_resizable(false)
            .build(&event_loop)?;
        let window = Arc::new(window);

        let size = window.inner_size();
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(width as u32, height as u32, surface_texture)?;

        let started = Instant::now();
        let mut fatal: Option<InstrumentError> = None;
        let fatal_slot = &mut fatal;
        let window_clone = window.clone();

        event_loop.run(move |event, window_target| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    info!("Window closed");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                        warn!(%err, "Failed to resize surface");
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed {
                        if let Some(key) = manual_key(&event.logical_key) {
                            self.source.handle_key(key);
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    let presented = self.render_frame(started.elapsed()).and_then(|_| {
                        pixels.frame_mut().copy_from_slice(self.back_buffer.rgba());
                        pixels.render().map_err(InstrumentError::from)
                    });
                    if let Err(err) = presented {
                        error!(%err, "Frame failed");
                        *fatal_slot = Some(err);
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                let now = Instant::now();
                if self.pacer.ready(now) {
                    window_clone.request_redraw();
                    self.pacer.mark(now);
                }
                window_target.set_control_flow(ControlFlow::WaitUntil(now + self.pacer.remaining(now)));
            }
            _ => {}
        })?;

        match fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn manual_key(key: &Key) -> Option<ManualKey> {
    match key {
        Key::Named(NamedKey::ArrowUp) => Some(ManualKey::Up),
        Key::Named(NamedKey::ArrowDown) => Some(ManualKey::Down),
        Key::Named(NamedKey::ArrowLeft) => Some(ManualKey::Left),
        Key::Named(NamedKey::ArrowRight) => Some(ManualKey::Right),
        _ => None,
    }
}
