//! Severity analysis proxy for image evidence.
//!
//! The client only ferries bytes: detection and classification happen behind
//! the external predict endpoint.

use serde::Deserialize;
use thiserror::Error;

/// Severity label reserved for analysis failures and accidents the analyzer
/// could not grade.
pub const SEVERITY_UNKNOWN: &str = "Unknown";

/// Outcome of one analysis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityAssessment {
    pub accident_detected: bool,
    pub severity: Option<String>,
}

impl SeverityAssessment {
    /// Severity as the flow stores it: detected accidents without a grade
    /// fall back to "Unknown"; non-accidents resolve to none.
    pub fn resolved_severity(&self) -> Option<String> {
        if self.accident_detected {
            Some(
                self.severity
                    .clone()
                    .unwrap_or_else(|| SEVERITY_UNKNOWN.to_string()),
            )
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis transport failure: {0}")]
    Transport(String),
}

pub trait SeverityClient: Send + Sync {
    fn analyze(&self, image: &[u8]) -> Result<SeverityAssessment, AnalysisError>;
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default, rename = "accidentDetected")]
    accident_detected: bool,
    #[serde(default)]
    severity: Option<String>,
}

/// Blocking HTTP client for the external predict endpoint.
pub struct HttpSeverityClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpSeverityClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AnalysisError> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;
        Ok(Self {
            base_url: trim_trailing_slash(base_url.into()),
            http,
        })
    }
}

impl SeverityClient for HttpSeverityClient {
    fn analyze(&self, image: &[u8]) -> Result<SeverityAssessment, AnalysisError> {
        let url = format!("{}/api/predict", self.base_url);
        let body = serde_json::json!({ "image": base64_encode(image) });
        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AnalysisError::Transport(format!(
                "predict endpoint returned {}",
                response.status()
            )));
        }
        let parsed: PredictResponse = response
            .json()
            .map_err(|err| AnalysisError::Transport(err.to_string()))?;
        Ok(SeverityAssessment {
            accident_detected: parsed.accident_detected,
            severity: parsed.severity,
        })
    }
}

pub(crate) fn trim_trailing_slash(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

/// Minimal base64 encoder (no external dependency needed).
fn base64_encode(input: &[u8]) -> String {
    const CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((input.len() + 2) / 3 * 4);
    for chunk in input.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = if chunk.len() > 1 { chunk[1] as u32 } else { 0 };
        let b2 = if chunk.len() > 2 { chunk[2] as u32 } else { 0 };
        let triple = (b0 << 16) | (b1 << 8) | b2;
        out.push(CHARS[((triple >> 18) & 0x3F) as usize] as char);
        out.push(CHARS[((triple >> 12) & 0x3F) as usize] as char);
        if chunk.len() > 1 {
            out.push(CHARS[((triple >> 6) & 0x3F) as usize] as char);
        } else {
            out.push('=');
        }
        if chunk.len() > 2 {
            out.push(CHARS[(triple & 0x3F) as usize] as char);
        } else {
            out.push('=');
        }
    }
    out
}
