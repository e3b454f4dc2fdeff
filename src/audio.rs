//! Automatic microphone capture for the SOS flow.
//!
//! Recording starts at flow mount and stops after a fixed wall-clock duration,
//! independent of how the device delivers data. The result is exactly one WAV
//! clip. Microphone failure degrades the flow instead of blocking it.

use crate::lock_or_recover;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// File name used for the recorded clip in the multipart payload.
pub const AUDIO_CLIP_NAME: &str = "sos_audio.wav";

/// One recorded audio clip, already WAV-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn file_name(&self) -> &'static str {
        AUDIO_CLIP_NAME
    }
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),
}

/// Collects delivered sample chunks into the final clip.
///
/// Only the first non-empty chunk is kept; a short clip recorded without a
/// timeslice is expected to arrive whole, and later chunks are dropped rather
/// than concatenated. An empty first delivery therefore yields an empty clip.
#[derive(Debug, Default)]
pub struct ClipAssembler {
    chunk: Option<Vec<f32>>,
}

impl ClipAssembler {
    pub fn push_chunk(&mut self, chunk: Vec<f32>) {
        if chunk.is_empty() || self.chunk.is_some() {
            return;
        }
        self.chunk = Some(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.chunk.is_none()
    }

    pub fn finish(self, sample_rate: u32) -> AudioClip {
        let samples = self.chunk.unwrap_or_default();
        AudioClip {
            bytes: encode_wav_mono16(&samples, sample_rate),
        }
    }
}

/// Microphone recorder bound to one input device for the flow's lifetime.
pub struct Recorder {
    device: cpal::Device,
    device_name: String,
}

impl Recorder {
    pub fn new(preferred: Option<&str>) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = match preferred {
            Some(name) => host
                .input_devices()
                .map_err(|err| AudioError::MicrophoneUnavailable(err.to_string()))?
                .find(|device| {
                    device
                        .name()
                        .map(|candidate| candidate.contains(name))
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    AudioError::MicrophoneUnavailable(format!(
                        "no input device matching {name:?}"
                    ))
                })?,
            None => host.default_input_device().ok_or_else(|| {
                AudioError::MicrophoneUnavailable("no default input device".to_string())
            })?,
        };
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());
        Ok(Self {
            device,
            device_name,
        })
    }

    pub fn device_name(&self) -> String {
        self.device_name.clone()
    }

    /// Records for the full wall-clock duration and yields exactly one clip.
    pub fn record_for(&self, duration: Duration) -> Result<AudioClip, AudioError> {
        let config = self
            .device
            .default_input_config()
            .map_err(|err| AudioError::MicrophoneUnavailable(err.to_string()))?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();

        let samples: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&samples);
        let stream = match sample_format {
            cpal::SampleFormat::F32 => self.device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mut guard = lock_or_recover(&sink, "recorder samples");
                    push_mono(&mut guard, data, channels);
                },
                stream_error,
                None,
            ),
            cpal::SampleFormat::I16 => self.device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<f32> = data
                        .iter()
                        .map(|sample| f32::from(*sample) / f32::from(i16::MAX))
                        .collect();
                    let mut guard = lock_or_recover(&sink, "recorder samples");
                    push_mono(&mut guard, &converted, channels);
                },
                stream_error,
                None,
            ),
            cpal::SampleFormat::U16 => self.device.build_input_stream(
                &config.into(),
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<f32> = data
                        .iter()
                        .map(|sample| f32::from(*sample) / f32::from(u16::MAX) * 2.0 - 1.0)
                        .collect();
                    let mut guard = lock_or_recover(&sink, "recorder samples");
                    push_mono(&mut guard, &converted, channels);
                },
                stream_error,
                None,
            ),
            other => {
                return Err(AudioError::MicrophoneUnavailable(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|err| AudioError::MicrophoneUnavailable(err.to_string()))?;

        stream
            .play()
            .map_err(|err| AudioError::MicrophoneUnavailable(err.to_string()))?;
        // Wall-clock cutoff; data callbacks keep filling the buffer until drop.
        std::thread::sleep(duration);
        drop(stream);

        let recorded = {
            let guard = lock_or_recover(&samples, "recorder samples");
            guard.clone()
        };
        let mut assembler = ClipAssembler::default();
        assembler.push_chunk(recorded);
        Ok(assembler.finish(sample_rate))
    }
}

fn stream_error(err: cpal::StreamError) {
    tracing::debug!("input stream error: {err}");
}

fn push_mono(sink: &mut Vec<f32>, data: &[f32], channels: usize) {
    if channels <= 1 {
        sink.extend_from_slice(data);
        return;
    }
    for frame in data.chunks(channels) {
        let sum: f32 = frame.iter().sum();
        sink.push(sum / channels as f32);
    }
}

/// Input device names, honoring the test override used by integration tests.
pub fn list_input_devices() -> Vec<String> {
    if let Ok(spec) = std::env::var("SOSBEACON_TEST_DEVICES") {
        return spec
            .split(',')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
    }
    let host = cpal::default_host();
    match host.input_devices() {
        Ok(devices) => devices.filter_map(|device| device.name().ok()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Minimal 16-bit mono PCM WAV encoder for the recorded clip.
pub(crate) fn encode_wav_mono16(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16_u32.to_le_bytes());
    out.extend_from_slice(&1_u16.to_le_bytes());
    out.extend_from_slice(&1_u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2_u16.to_le_bytes());
    out.extend_from_slice(&16_u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        out.extend_from_slice(&((clamped * f32::from(i16::MAX)) as i16).to_le_bytes());
    }
    out
}
