use thiserror::Error;

/// Errors surfaced by the instrument engine.
///
/// Numeric trouble (an `asin` argument drifting past ±1, a vertex landing on
/// the projection plane) never shows up here; it is clamped or skipped where
/// it happens and only logged.
#[derive(Debug, Error)]
pub enum InstrumentError {
    /// Rejected before the first frame: zero calibration samples, a
    /// non-positive radius, size, depth or framerate.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The sample feed is disconnected or exhausted. The loop keeps drawing
    /// the last known attitude when it sees this.
    #[error("sensor feed unavailable: {0}")]
    FeedUnavailable(String),

    /// The display surface cannot be used (unsupported size, bad buffer).
    #[error("display surface failure: {0}")]
    Surface(String),

    #[error(transparent)]
    Pixels(#[from] pixels::Error),

    #[error(transparent)]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error(transparent)]
    Window(#[from] winit::error::OsError),

    #[error("failed to read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl InstrumentError {
    /// Whether the frame loop may carry on after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, InstrumentError::FeedUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, InstrumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_feed_loss_is_recoverable() {
        assert!(InstrumentError::FeedUnavailable("eof".into()).is_recoverable());
        assert!(!InstrumentError::InvalidConfiguration("n = 0".into()).is_recoverable());
        assert!(!InstrumentError::Surface("too small".into()).is_recoverable());
    }

    #[test]
    fn messages_name_the_cause() {
        let err = InstrumentError::InvalidConfiguration("calibration needs at least one sample".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: calibration needs at least one sample"
        );
    }
}
