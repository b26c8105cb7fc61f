use crate::scan::MAX_LINES;
use serde::{Deserialize, Serialize};

/// Control messages received from the client as JSON text frames.
///
/// Unrecognized `action` values deserialize to `Unknown` and are dropped
/// without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ControlCommand {
    Start,
    Stop,
    #[serde(other)]
    Unknown,
}

/// Acknowledgements sent to the client as JSON text frames
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusMessage {
    /// Streaming has begun; tells the client how to size its texture
    #[serde(rename_all = "camelCase")]
    Recording {
        message: String,
        width: u32,
        max_lines: u32,
    },

    /// Streaming has ceased; no binary frame follows this message
    Stopped { message: String },
}

impl StatusMessage {
    pub fn recording(width: u32) -> Self {
        Self::Recording {
            message: "Recording started".to_string(),
            width,
            max_lines: MAX_LINES,
        }
    }

    pub fn stopped() -> Self {
        Self::Stopped {
            message: "Recording stopped".to_string(),
        }
    }
}
