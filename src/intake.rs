//! Report intake client: the single multipart submission plus the thin
//! listing/resolve surface the API exposes for stored reports.

use crate::analysis::trim_trailing_slash;
use crate::audio::AudioClip;
use crate::evidence::MediaFile;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

/// Fixed title attached to every SOS submission.
pub const REPORT_TITLE: &str = "SOS Alert";

/// Fully assembled report, ready for one multipart POST.
#[derive(Debug, Clone)]
pub struct SosReport {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub location: Option<String>,
    pub audio: Option<AudioClip>,
    pub image: Option<(Vec<u8>, String)>,
    pub video: Option<MediaFile>,
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("intake transport failure: {0}")]
    Transport(String),
    #[error("intake rejected the report: {0}")]
    Rejected(String),
}

/// What the intake endpoint echoed back for a stored report.
#[derive(Debug, Clone, Default)]
pub struct IntakeReceipt {
    pub id: Option<u64>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
}

pub trait IntakeClient: Send + Sync {
    /// Sends one report. Never retried automatically.
    fn send(&self, report: &SosReport) -> Result<IntakeReceipt, IntakeError>;
}

#[derive(Deserialize, Default)]
struct IntakeResponse {
    id: Option<u64>,
    image_url: Option<String>,
    video_url: Option<String>,
    audio_url: Option<String>,
    error: Option<String>,
}

/// One stored report as returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSummary {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reported_at: Option<String>,
}

/// Blocking HTTP client for the external intake endpoint.
pub struct HttpIntakeClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpIntakeClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, IntakeError> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|err| IntakeError::Transport(err.to_string()))?;
        Ok(Self {
            base_url: trim_trailing_slash(base_url.into()),
            http,
        })
    }

    fn sos_url(&self) -> String {
        format!("{}/api/sos/", self.base_url)
    }

    /// Recent reports, most recent first.
    pub fn recent_reports(&self) -> Result<Vec<ReportSummary>, IntakeError> {
        let response = self
            .http
            .get(self.sos_url())
            .send()
            .map_err(|err| IntakeError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(IntakeError::Transport(format!(
                "listing endpoint returned {}",
                response.status()
            )));
        }
        response
            .json()
            .map_err(|err| IntakeError::Transport(err.to_string()))
    }

    /// Marks one stored report resolved.
    pub fn resolve(&self, id: u64) -> Result<(), IntakeError> {
        let url = format!("{}/api/sos/{id}/resolve", self.base_url);
        let response = self
            .http
            .put(url)
            .send()
            .map_err(|err| IntakeError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(IntakeError::Transport(format!(
                "resolve endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

impl IntakeClient for HttpIntakeClient {
    fn send(&self, report: &SosReport) -> Result<IntakeReceipt, IntakeError> {
        let mut form = Form::new()
            .text("user_id", report.user_id.clone())
            .text("title", report.title.clone())
            .text("description", report.description.clone())
            .text("severity", report.severity.clone());
        if let Some(location) = &report.location {
            form = form.text("location", location.clone());
        }
        if let Some(audio) = &report.audio {
            form = form.part(
                "audio",
                Part::bytes(audio.bytes.clone()).file_name(audio.file_name()),
            );
        }
        if let Some((bytes, name)) = &report.image {
            form = form.part("image", Part::bytes(bytes.clone()).file_name(name.clone()));
        }
        if let Some(video) = &report.video {
            form = form.part(
                "video",
                Part::bytes(video.bytes.clone()).file_name(video.file_name.clone()),
            );
        }

        let response = self
            .http
            .post(self.sos_url())
            .multipart(form)
            .send()
            .map_err(|err| IntakeError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(IntakeError::Transport(format!(
                "intake endpoint returned {}",
                response.status()
            )));
        }
        let parsed: IntakeResponse = response
            .json()
            .map_err(|err| IntakeError::Transport(err.to_string()))?;
        // A 2xx with an error body still counts as a rejected report.
        if let Some(error) = parsed.error {
            return Err(IntakeError::Rejected(error));
        }
        Ok(IntakeReceipt {
            id: parsed.id,
            image_url: parsed.image_url,
            video_url: parsed.video_url,
            audio_url: parsed.audio_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intake_response_surfaces_error_body() {
        let parsed: IntakeResponse =
            serde_json::from_str(r#"{"error": "Media upload failed: boom"}"#).expect("parse");
        assert_eq!(parsed.error.as_deref(), Some("Media upload failed: boom"));

        let parsed: IntakeResponse = serde_json::from_str(
            r#"{"message": "SOS alert sent!", "id": 7, "image_url": "http://cdn/img.jpg"}"#,
        )
        .expect("parse");
        assert!(parsed.error.is_none());
        assert_eq!(parsed.id, Some(7));
        assert_eq!(parsed.image_url.as_deref(), Some("http://cdn/img.jpg"));
    }

    #[test]
    fn report_summary_tolerates_sparse_rows() {
        let rows: Vec<ReportSummary> = serde_json::from_str(
            r#"[
                {"id": 1, "title": "SOS Alert", "severity": "High", "status": "Pending"},
                {"id": 2, "title": "SOS Alert"}
            ]"#,
        )
        .expect("parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].severity.as_deref(), Some("High"));
        assert!(rows[1].severity.is_none());
    }

    #[test]
    fn sos_url_keeps_the_trailing_slash_the_api_expects() {
        let client = HttpIntakeClient::new("http://127.0.0.1:5000/").expect("client");
        assert_eq!(client.sos_url(), "http://127.0.0.1:5000/api/sos/");
    }
}
