use attitude_instrument::{Attitude, ChannelAttitude, InstrumentConfig, InstrumentLoop};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use rand::Rng;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let config = InstrumentConfig::builder()
        .title("Channel demo".to_string())
        .dial_radius(90.0)
        .build();

    // Create a channel for streaming attitudes to the window
    let (sender, receiver) = mpsc::channel();

    // Sweep roll and pitch with a little jitter until the window closes
    thread::spawn(move || {
        let mut rng = rand::rng();
        let mut t: f64 = 0.0;
        loop {
            let attitude = Attitude::new(
                60.0 * (t * 0.7).sin() + rng.random_range(-0.5..0.5),
                35.0 * (t * 0.4).cos() + rng.random_range(-0.5..0.5),
            );
            if sender.send(attitude).is_err() {
                break;
            }
            t += 0.02;
            thread::sleep(Duration::from_millis(20));
        }
    });

    println!("Displaying the instrument with a sweeping attitude");
    println!("Press Ctrl+C or close the window to exit");

    let title = config.title.clone();
    let mut instrument = InstrumentLoop::new(config, ChannelAttitude::new(receiver))?;
    instrument.run(&title)?;
    Ok(())
}
