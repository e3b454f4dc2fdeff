//! One-shot geolocation acquisition for the SOS flow.
//!
//! A fix is requested exactly once per flow instance and never retried. A
//! missing fix does not prevent submission; the location field is simply
//! omitted from the report payload.

use std::process::Command;
use thiserror::Error;

/// A resolved coordinate pair, immutable after acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPosition {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPosition {
    /// Textual form sent to the intake endpoint.
    pub fn as_report_field(&self) -> String {
        format!("{}, {}", self.lat, self.lng)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeoError {
    #[error("unable to resolve location: {0}")]
    PermissionDenied(String),
    #[error("no location source is available")]
    Unsupported,
}

pub trait LocationSource: Send {
    /// Resolves a single fix. Called once per flow; failures are final.
    fn resolve(&self) -> Result<GeoPosition, GeoError>;
}

/// Fix supplied directly through configuration.
pub struct StaticFix {
    position: GeoPosition,
}

impl StaticFix {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            position: GeoPosition { lat, lng },
        }
    }
}

impl LocationSource for StaticFix {
    fn resolve(&self) -> Result<GeoPosition, GeoError> {
        Ok(self.position)
    }
}

/// Shells out to a configured command expected to print `lat lng` on stdout.
pub struct CommandFix {
    command: String,
}

impl CommandFix {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl LocationSource for CommandFix {
    fn resolve(&self) -> Result<GeoPosition, GeoError> {
        let words = shell_words::split(&self.command)
            .map_err(|err| GeoError::PermissionDenied(err.to_string()))?;
        let (program, args) = words
            .split_first()
            .ok_or_else(|| GeoError::PermissionDenied("empty location command".to_string()))?;
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| GeoError::PermissionDenied(err.to_string()))?;
        if !output.status.success() {
            return Err(GeoError::PermissionDenied(format!(
                "location command exited with {}",
                output.status
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        parse_fix(&text).ok_or_else(|| {
            GeoError::PermissionDenied(format!("unparseable location output: {:?}", text.trim()))
        })
    }
}

/// Accepts `lat lng` or `lat, lng`; anything else is a failed fix.
pub(crate) fn parse_fix(text: &str) -> Option<GeoPosition> {
    let mut parts = text.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty());
    let lat = parts.next()?.parse::<f64>().ok()?;
    let lng = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(GeoPosition { lat, lng })
}
