//! sosbeacon binary: wires real devices and HTTP clients into the flow loop.
//!
//! Layout mirrors the page this replaces: location and audio workers start at
//! mount, evidence arrives from flags or stdin commands, and a one-second
//! ticker drives the auto-submit countdown. All events funnel into one
//! channel so the flow state machine runs on a single thread.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{unbounded, Sender};
use sosbeacon::analysis::HttpSeverityClient;
use sosbeacon::audio::{self, Recorder};
use sosbeacon::camera::{CommandCamera, FrameSource};
use sosbeacon::config::AppConfig;
use sosbeacon::evidence::MediaFile;
use sosbeacon::flow::{FlowEvent, Notice, SosFlow, SubmissionState};
use sosbeacon::geo::{CommandFix, GeoError, LocationSource, StaticFix};
use sosbeacon::identity;
use sosbeacon::intake::HttpIntakeClient;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

enum LoopEvent {
    Flow(FlowEvent),
    Quit,
}

fn main() -> Result<()> {
    let config = AppConfig::parse();
    sosbeacon::init_tracing(&config);

    if config.list_input_devices {
        let devices = audio::list_input_devices();
        if devices.is_empty() {
            println!("No audio input devices detected.");
        } else {
            println!("Available audio input devices:");
            for name in devices {
                println!("  {name}");
            }
        }
        return Ok(());
    }

    let intake =
        HttpIntakeClient::new(&config.api_base_url).context("building intake client")?;

    if config.list_reports {
        for report in intake.recent_reports().context("listing reports")? {
            println!(
                "#{} {} severity={} status={}",
                report.id,
                report.title,
                report.severity.as_deref().unwrap_or("-"),
                report.status.as_deref().unwrap_or("-"),
            );
        }
        return Ok(());
    }

    if let Some(id) = config.resolve {
        intake.resolve(id).context("resolving report")?;
        println!("Report {id} marked resolved.");
        return Ok(());
    }

    run_flow(config, intake)
}

fn run_flow(config: AppConfig, intake: HttpIntakeClient) -> Result<()> {
    let analyzer =
        HttpSeverityClient::new(&config.api_base_url).context("building analysis client")?;
    let user_id = identity::resolve_user_id(config.user_id.as_deref());
    let mut flow = SosFlow::new(
        Arc::new(analyzer),
        Arc::new(intake),
        user_id,
        config.countdown_secs,
    );

    let (tx, rx) = unbounded::<LoopEvent>();

    spawn_location_worker(&config, tx.clone());
    if config.no_audio {
        tracing::debug!("automatic audio recording disabled");
    } else {
        spawn_audio_worker(&config, tx.clone());
    }
    spawn_ticker(tx.clone());
    spawn_input_worker(config.camera_cmd.clone(), tx.clone());

    // Startup evidence from flags feeds the same path as interactive commands.
    if let Some(path) = &config.photo {
        let file = load_media(path)?;
        let _ = tx.send(LoopEvent::Flow(FlowEvent::PhotoUploaded(file)));
    }
    if let Some(path) = &config.video {
        let file = load_media(path)?;
        let _ = tx.send(LoopEvent::Flow(FlowEvent::VideoUploaded(file)));
    }

    println!("SOS flow started.");
    println!("Commands: capture | photo <file> | video <file> | reset | send | cancel | quit");

    for message in rx.iter() {
        match message {
            LoopEvent::Quit => break,
            LoopEvent::Flow(event) => {
                for notice in flow.handle(event) {
                    print_notice(&notice);
                }
                if flow.state() == SubmissionState::Sent {
                    if let Some(receipt) = flow.receipt() {
                        tracing::debug!(
                            "media uploaded: image={:?} video={:?} audio={:?}",
                            receipt.image_url,
                            receipt.video_url,
                            receipt.audio_url
                        );
                    }
                    break;
                }
            }
        }
    }
    Ok(())
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::LocationShared(position) => {
            println!("Your location will be shared with responders: {position}");
        }
        Notice::LocationError(message) => {
            println!("Unable to get your location. {message}");
        }
        Notice::AudioRecorded => println!("Audio recorded successfully."),
        Notice::AudioError(message) => {
            println!("Could not access microphone. {message}");
        }
        Notice::Analyzing => println!("Analyzing situation..."),
        Notice::SeverityAssessed(severity) => println!("Detected severity: {severity}"),
        Notice::NoAccidentDetected => println!("No accident detected in the image."),
        Notice::Armed(secs) => {
            println!("Auto submitting in {secs} seconds... (type 'cancel' to stop)");
        }
        Notice::Countdown(secs) => println!("Auto submitting in {secs} seconds..."),
        Notice::Cancelled => println!("SOS alert cancelled."),
        Notice::Sent => println!("SOS emergency reported successfully!"),
        Notice::Failed(message) => println!("Error reporting SOS: {message}"),
    }
}

fn spawn_location_worker(config: &AppConfig, tx: Sender<LoopEvent>) {
    let source: Option<Box<dyn LocationSource>> = if let Some((lat, lng)) = config.static_fix() {
        Some(Box::new(StaticFix::new(lat, lng)))
    } else {
        config
            .geo_cmd
            .clone()
            .map(|cmd| Box::new(CommandFix::new(cmd)) as Box<dyn LocationSource>)
    };
    thread::spawn(move || {
        let event = match source {
            Some(source) => match source.resolve() {
                Ok(fix) => FlowEvent::LocationResolved(fix),
                Err(err) => FlowEvent::LocationFailed(err),
            },
            None => FlowEvent::LocationFailed(GeoError::Unsupported),
        };
        let _ = tx.send(LoopEvent::Flow(event));
    });
}

fn spawn_audio_worker(config: &AppConfig, tx: Sender<LoopEvent>) {
    let device = config.input_device.clone();
    let record_ms = config.record_ms;
    thread::spawn(move || {
        let event = match Recorder::new(device.as_deref()) {
            Ok(recorder) => {
                tracing::debug!("recording from {}", recorder.device_name());
                match recorder.record_for(Duration::from_millis(record_ms)) {
                    Ok(clip) => FlowEvent::AudioReady(clip),
                    Err(err) => FlowEvent::AudioFailed(err.to_string()),
                }
            }
            Err(err) => FlowEvent::AudioFailed(err.to_string()),
        };
        let _ = tx.send(LoopEvent::Flow(event));
    });
}

fn spawn_ticker(tx: Sender<LoopEvent>) {
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(1));
        if tx.send(LoopEvent::Flow(FlowEvent::Tick)).is_err() {
            break;
        }
    });
}

fn spawn_input_worker(camera_cmd: Option<String>, tx: Sender<LoopEvent>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            let event = match line.split_once(' ') {
                Some(("photo", path)) => match load_media(Path::new(path.trim())) {
                    Ok(file) => LoopEvent::Flow(FlowEvent::PhotoUploaded(file)),
                    Err(err) => {
                        eprintln!("photo upload failed: {err:#}");
                        continue;
                    }
                },
                Some(("video", path)) => match load_media(Path::new(path.trim())) {
                    Ok(file) => LoopEvent::Flow(FlowEvent::VideoUploaded(file)),
                    Err(err) => {
                        eprintln!("video upload failed: {err:#}");
                        continue;
                    }
                },
                None if line == "capture" => {
                    let Some(cmd) = camera_cmd.as_deref() else {
                        eprintln!("no camera command configured (--camera-cmd)");
                        continue;
                    };
                    match CommandCamera::new(cmd).capture_frame() {
                        Ok(frame) => LoopEvent::Flow(FlowEvent::FrameCaptured(frame)),
                        Err(err) => {
                            eprintln!("Could not access camera. {err}");
                            continue;
                        }
                    }
                }
                None if line == "reset" => LoopEvent::Flow(FlowEvent::CaptureReset),
                None if line == "send" => LoopEvent::Flow(FlowEvent::Confirm),
                None if line == "cancel" => LoopEvent::Flow(FlowEvent::Cancel),
                None if line == "quit" => LoopEvent::Quit,
                None if line.is_empty() => continue,
                _ => {
                    eprintln!("unknown command: {line}");
                    continue;
                }
            };
            let quitting = matches!(event, LoopEvent::Quit);
            if tx.send(event).is_err() || quitting {
                break;
            }
        }
    });
}

fn load_media(path: &Path) -> Result<MediaFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.bin")
        .to_string();
    Ok(MediaFile { bytes, file_name })
}
