//! The SOS flow state machine: evidence in, one guarded submission out.
//!
//! One `SosFlow` instance owns all state for a single emergency-page visit:
//! the one-shot fix, the recorded clip, the image slot, the resolved severity,
//! and the auto-submit countdown. Events are applied on a single thread in
//! arrival order, so the only synchronization primitive the flow needs is the
//! single-shot submission lock, set before any network work inside `submit`.

use crate::analysis::{SeverityClient, SEVERITY_UNKNOWN};
use crate::audio::AudioClip;
use crate::evidence::{EvidenceBundle, ImageBlob, MediaFile};
use crate::geo::{GeoError, GeoPosition};
use crate::intake::{IntakeClient, IntakeReceipt, SosReport, REPORT_TITLE};
use std::sync::Arc;


/// Description shown to responders before severity is known.
pub const BASE_DESCRIPTION: &str = "Emergency reported via SOS. Please respond immediately.";

/// Where the flow stands with respect to submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Analyzing,
    Armed(u32),
    Submitting,
    Sent,
    Failed,
}

/// Everything that can happen to a running flow.
#[derive(Debug)]
pub enum FlowEvent {
    LocationResolved(GeoPosition),
    LocationFailed(GeoError),
    AudioReady(AudioClip),
    AudioFailed(String),
    FrameCaptured(ImageBlob),
    PhotoUploaded(MediaFile),
    VideoUploaded(MediaFile),
    CaptureReset,
    Tick,
    Confirm,
    Cancel,
}

/// User-visible outcomes emitted while handling events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    LocationShared(String),
    LocationError(String),
    AudioRecorded,
    AudioError(String),
    Analyzing,
    SeverityAssessed(String),
    NoAccidentDetected,
    Armed(u32),
    Countdown(u32),
    Cancelled,
    Sent,
    Failed(String),
}

pub struct SosFlow {
    analyzer: Arc<dyn SeverityClient>,
    intake: Arc<dyn IntakeClient>,
    user_id: String,
    countdown_secs: u32,
    position: Option<GeoPosition>,
    evidence: EvidenceBundle,
    severity: Option<String>,
    state: SubmissionState,
    armed_once: bool,
    submitting: bool,
    sent: bool,
    receipt: Option<IntakeReceipt>,
}

impl SosFlow {
    pub fn new(
        analyzer: Arc<dyn SeverityClient>,
        intake: Arc<dyn IntakeClient>,
        user_id: String,
        countdown_secs: u32,
    ) -> Self {
        Self {
            analyzer,
            intake,
            user_id,
            countdown_secs,
            position: None,
            evidence: EvidenceBundle::default(),
            severity: None,
            state: SubmissionState::Idle,
            armed_once: false,
            submitting: false,
            sent: false,
            receipt: None,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn severity(&self) -> Option<&str> {
        self.severity.as_deref()
    }

    pub fn position(&self) -> Option<GeoPosition> {
        self.position
    }

    pub fn receipt(&self) -> Option<&IntakeReceipt> {
        self.receipt.as_ref()
    }

    /// Applies one event and returns the user-visible outcomes.
    pub fn handle(&mut self, event: FlowEvent) -> Vec<Notice> {
        match event {
            FlowEvent::LocationResolved(position) => {
                // The fix is immutable after acquisition; late duplicates are dropped.
                if self.position.is_some() {
                    return Vec::new();
                }
                self.position = Some(position);
                vec![Notice::LocationShared(position.as_report_field())]
            }
            FlowEvent::LocationFailed(err) => vec![Notice::LocationError(err.to_string())],
            FlowEvent::AudioReady(clip) => {
                self.evidence.audio = Some(clip);
                vec![Notice::AudioRecorded]
            }
            FlowEvent::AudioFailed(message) => vec![Notice::AudioError(message)],
            FlowEvent::FrameCaptured(image) => {
                self.evidence.visual.set_captured(image);
                self.analyze_current_image()
            }
            FlowEvent::PhotoUploaded(file) => {
                self.evidence.visual.set_uploaded(file);
                self.analyze_current_image()
            }
            FlowEvent::VideoUploaded(file) => {
                self.evidence.video = Some(file);
                Vec::new()
            }
            FlowEvent::CaptureReset => {
                self.evidence.visual.clear();
                self.severity = None;
                Vec::new()
            }
            FlowEvent::Tick => self.tick(),
            FlowEvent::Confirm => self.submit(),
            FlowEvent::Cancel => self.cancel(),
        }
    }

    fn analyze_current_image(&mut self) -> Vec<Notice> {
        let outcome = match self.evidence.visual.image_bytes() {
            Some(bytes) => {
                // Keep any armed countdown running while a replacement image
                // is analyzed; arming itself only ever happens once.
                let prior = self.state;
                self.state = SubmissionState::Analyzing;
                let outcome = self.analyzer.analyze(bytes);
                self.state = prior;
                outcome
            }
            None => return Vec::new(),
        };

        let mut notices = vec![Notice::Analyzing];
        match outcome {
            Ok(assessment) => self.severity = assessment.resolved_severity(),
            Err(err) => {
                tracing::debug!("analysis failed: {err}");
                self.severity = Some(SEVERITY_UNKNOWN.to_string());
            }
        }
        match self.severity.clone() {
            Some(severity) => {
                notices.push(Notice::SeverityAssessed(severity));
                notices.extend(self.arm_if_ready());
            }
            None => notices.push(Notice::NoAccidentDetected),
        }
        notices
    }

    fn arm_if_ready(&mut self) -> Vec<Notice> {
        // One arming per flow instance, and never after a completed send.
        if self.armed_once || self.sent || self.severity.is_none() {
            return Vec::new();
        }
        self.armed_once = true;
        self.state = SubmissionState::Armed(self.countdown_secs);
        vec![Notice::Armed(self.countdown_secs)]
    }

    fn tick(&mut self) -> Vec<Notice> {
        let SubmissionState::Armed(remaining) = self.state else {
            return Vec::new();
        };
        if remaining <= 1 {
            self.state = SubmissionState::Armed(0);
            let mut notices = vec![Notice::Countdown(0)];
            notices.extend(self.submit());
            notices
        } else {
            let next = remaining - 1;
            self.state = SubmissionState::Armed(next);
            vec![Notice::Countdown(next)]
        }
    }

    fn cancel(&mut self) -> Vec<Notice> {
        match self.state {
            SubmissionState::Armed(_) => {
                self.state = SubmissionState::Idle;
                vec![Notice::Cancelled]
            }
            _ => Vec::new(),
        }
    }

    fn submit(&mut self) -> Vec<Notice> {
        // Single-shot lock, taken before any network work begins. A duplicate
        // trigger while a submission is in flight is an intentional no-op.
        if self.submitting || self.sent {
            return Vec::new();
        }
        self.submitting = true;
        self.state = SubmissionState::Submitting;

        // Last-chance verification when severity never resolved but image
        // evidence exists: an unconfirmed accident abandons the submission.
        if self.severity.is_none() {
            if let Some(bytes) = self.evidence.visual.image_bytes() {
                let confirmed = match self.analyzer.analyze(bytes) {
                    Ok(assessment) if assessment.accident_detected => {
                        assessment.resolved_severity()
                    }
                    Ok(_) => None,
                    Err(err) => {
                        tracing::debug!("verification failed: {err}");
                        None
                    }
                };
                match confirmed {
                    Some(severity) => self.severity = Some(severity),
                    None => {
                        self.submitting = false;
                        self.state = SubmissionState::Failed;
                        return vec![Notice::Failed(
                            "No accident detected from the photo evidence. SOS alert not sent."
                                .to_string(),
                        )];
                    }
                }
            }
        }

        let report = self.build_report();
        match self.intake.send(&report) {
            Ok(receipt) => {
                // The lock stays held: a completed SOS is final.
                self.sent = true;
                self.state = SubmissionState::Sent;
                self.receipt = Some(receipt);
                vec![Notice::Sent]
            }
            Err(err) => {
                self.submitting = false;
                self.state = SubmissionState::Failed;
                vec![Notice::Failed(err.to_string())]
            }
        }
    }

    fn build_report(&self) -> SosReport {
        SosReport {
            user_id: self.user_id.clone(),
            title: REPORT_TITLE.to_string(),
            description: report_description(self.severity.as_deref()),
            severity: self
                .severity
                .clone()
                .unwrap_or_else(|| SEVERITY_UNKNOWN.to_string()),
            location: self.position.map(|position| position.as_report_field()),
            audio: self.evidence.audio.clone(),
            image: self
                .evidence
                .visual
                .as_image_part()
                .map(|(bytes, name)| (bytes.to_vec(), name.to_string())),
            video: self.evidence.video.clone(),
        }
    }
}

/// Description shown to responders; embeds the severity once known.
pub fn report_description(severity: Option<&str>) -> String {
    match severity {
        Some(severity) => {
            format!("Emergency reported via SOS. Severity: {severity}. Please respond immediately.")
        }
        None => BASE_DESCRIPTION.to_string(),
    }
}
