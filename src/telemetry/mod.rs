//! Telemetry acquisition
//!
//! Sources are polled on a dedicated worker thread so a slow fetch never
//! blocks a frame. The feed decides when to poll and hands completed
//! fetches back to the frame loop in request order.

mod feed;
mod source;
mod worker;

pub use feed::*;
pub use source::*;
pub use worker::*;

/// Errors surfaced by telemetry fetches
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryError {
    /// The source failed to produce records (I/O, parse, upstream error)
    Source {
        source_name: String,
        message: String,
    },
    /// The source has nothing to report
    NoData { source_name: String },
    /// The fetch worker is no longer running
    WorkerStopped,
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source {
                source_name,
                message,
            } => {
                write!(f, "Telemetry source '{}' failed: {}", source_name, message)
            }
            Self::NoData { source_name } => {
                write!(f, "Telemetry source '{}' returned no data", source_name)
            }
            Self::WorkerStopped => write!(f, "Telemetry worker stopped"),
        }
    }
}

impl std::error::Error for TelemetryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_source() {
        let err = TelemetryError::Source {
            source_name: "positions.json".into(),
            message: "connection reset".into(),
        };
        assert_eq!(
            err.to_string(),
            "Telemetry source 'positions.json' failed: connection reset"
        );

        let err: anyhow::Error = TelemetryError::WorkerStopped.into();
        assert!(err.to_string().contains("stopped"));
    }
}
