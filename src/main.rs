use std::env;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use glam::DVec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use attitude_instrument::{
    load_font, AttitudeSource, Axis, Bitmap, Canvas, ChannelAttitude, Color, InstrumentConfig,
    InstrumentLoop, LineFeed, MadgwickFusion, ManualControl, Point, Rect, SensorAttitude,
    SimulatedImu, Surface,
};

/// Where attitudes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// `gx gy gz ax ay az` lines on stdin.
    Stdin,
    /// A noisy board at rest.
    Simulate,
    /// Arrow keys.
    Manual,
}

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    title: Option<String>,
    font: Option<PathBuf>,
    mode: Mode,
    images: bool,
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        title: None,
        font: None,
        mode: Mode::Stdin,
        images: true,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = args.next().map(PathBuf::from),
            "--title" => parsed.title = args.next(),
            "--font" => parsed.font = args.next().map(PathBuf::from),
            "--manual" => parsed.mode = Mode::Manual,
            "--simulate" => parsed.mode = Mode::Simulate,
            "--stdin" => parsed.mode = Mode::Stdin,
            "--no-image" => parsed.images = false,
            other => eprintln!("ignoring unknown argument {other}"),
        }
    }
    parsed
}

/// Flat rover outline shown inside a dial: rear view for roll, side view
/// for pitch.
fn rover_outline(axis: Axis) -> attitude_instrument::Result<Bitmap> {
    let (width, height) = (200, 140);
    let body = Color::new(0x55, 0x5b, 0x66);
    let wheel = Color::BLACK;
    let mut bitmap = Bitmap::transparent(width, height)?;
    let mut canvas = Canvas::new(bitmap.rgba_mut(), width, height)?;
    match axis {
        Axis::Roll => {
            canvas.fill_rect(Rect::new(30.0, 50.0, 140.0, 45.0), body);
            canvas.fill_rect(Rect::new(95.0, 18.0, 10.0, 32.0), body);
            canvas.fill_rect(Rect::new(78.0, 6.0, 44.0, 14.0), body);
            for x in [12.0, 166.0] {
                canvas.fill_rect(Rect::new(x, 80.0, 22.0, 52.0), wheel);
            }
        }
        Axis::Pitch => {
            canvas.fill_rect(Rect::new(20.0, 55.0, 160.0, 40.0), body);
            canvas.fill_rect(Rect::new(140.0, 18.0, 8.0, 37.0), body);
            canvas.fill_rect(Rect::new(128.0, 6.0, 34.0, 14.0), body);
            for x in [42.0, 100.0, 158.0] {
                canvas.fill_circle(Point::new(x, 112.0), 20.0, wheel);
            }
        }
    }
    Ok(bitmap)
}

fn build_source(mode: Mode, config: &InstrumentConfig) -> Result<Box<dyn AttitudeSource>> {
    let source: Box<dyn AttitudeSource> = match mode {
        Mode::Manual => {
            info!(step = config.manual_step, "Manual mode, use the arrow keys");
            Box::new(ManualControl::new(config.manual_step))
        }
        Mode::Simulate => {
            let feed = SimulatedImu::new(DVec3::new(0.0068, -0.0015, -0.0024));
            let filter = MadgwickFusion::new(config.sample_rate_hz, config.madgwick_beta)?;
            Box::new(SensorAttitude::calibrated(feed, filter, config)?)
        }
        Mode::Stdin => {
            info!("Reading IMU samples from stdin");
            let config = config.clone();
            // Stdin blocks, so sample on a separate thread.
            let (source, _sampler) = ChannelAttitude::spawn(move || {
                let feed = LineFeed::new(BufReader::new(io::stdin()));
                let filter = MadgwickFusion::new(config.sample_rate_hz, config.madgwick_beta)?;
                SensorAttitude::calibrated(feed, filter, &config)
            });
            Box::new(source)
        }
    };
    Ok(source)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attitude_instrument=info".into()),
        )
        .init();

    let args = parse_args();
    let mut config = match &args.config {
        Some(path) => InstrumentConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => InstrumentConfig::default(),
    };
    if let Some(title) = args.title {
        config.title = title;
    }
    if args.font.is_some() {
        config.font_path = args.font;
    }
    config.validate()?;

    let font = load_font(config.font_path.as_deref());
    let source = build_source(args.mode, &config)?;
    let title = config.title.clone();

    let mut instrument = InstrumentLoop::new(config, source)?.with_font(font);
    if args.images {
        instrument = instrument
            .with_dial_image(Axis::Roll, &rover_outline(Axis::Roll)?)
            .with_dial_image(Axis::Pitch, &rover_outline(Axis::Pitch)?);
    }
    info!(mode = ?args.mode, "Starting instrument");
    instrument.run(&title)?;
    Ok(())
}
