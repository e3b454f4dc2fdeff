//! Single-shot camera capture through an external frame source.
//!
//! Capture is snapshot-then-release: one frame is grabbed and the device is
//! freed before the call returns. There is no continuous stream to manage.

use crate::evidence::ImageBlob;
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

pub trait FrameSource: Send {
    /// Grabs one still frame and releases the device.
    fn capture_frame(&mut self) -> Result<ImageBlob, CameraError>;
}

/// Shells out to a configured command expected to write JPEG bytes to stdout.
pub struct CommandCamera {
    command: String,
}

impl CommandCamera {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl FrameSource for CommandCamera {
    fn capture_frame(&mut self) -> Result<ImageBlob, CameraError> {
        let words = shell_words::split(&self.command)
            .map_err(|err| CameraError::Unavailable(err.to_string()))?;
        let (program, args) = words
            .split_first()
            .ok_or_else(|| CameraError::Unavailable("empty capture command".to_string()))?;
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| CameraError::Unavailable(err.to_string()))?;
        if !output.status.success() {
            return Err(CameraError::Unavailable(format!(
                "capture command exited with {}",
                output.status
            )));
        }
        if output.stdout.is_empty() {
            return Err(CameraError::Unavailable(
                "capture command produced no frame data".to_string(),
            ));
        }
        Ok(ImageBlob {
            bytes: output.stdout,
        })
    }
}
