//! CLI configuration assembly so flags, env overrides, and defaults resolve consistently.

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;
pub const DEFAULT_RECORD_MS: u64 = 10_000;

/// Runtime configuration for one SOS flow instance.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sosbeacon",
    version,
    about = "Headless SOS capture and auto-submit client"
)]
pub struct AppConfig {
    /// Base URL of the emergency-reporting API.
    #[arg(long, env = "SOSBEACON_API", default_value = "http://127.0.0.1:5000")]
    pub api_base_url: String,

    /// Audio input device name; the default input device is used when omitted.
    #[arg(long)]
    pub input_device: Option<String>,

    /// List available audio input devices and exit.
    #[arg(long)]
    pub list_input_devices: bool,

    /// Latitude of a fixed one-shot location fix.
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of a fixed one-shot location fix.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Command printing "lat lng" on stdout, used when no fixed fix is given.
    #[arg(long, env = "SOSBEACON_GEO_CMD")]
    pub geo_cmd: Option<String>,

    /// Command writing one JPEG frame to stdout for the `capture` action.
    #[arg(long, env = "SOSBEACON_CAMERA_CMD")]
    pub camera_cmd: Option<String>,

    /// Photo file attached as uploaded evidence at startup.
    #[arg(long, value_name = "FILE")]
    pub photo: Option<PathBuf>,

    /// Video file attached as uploaded evidence at startup.
    #[arg(long, value_name = "FILE")]
    pub video: Option<PathBuf>,

    /// Auto-submit countdown length in seconds.
    #[arg(long, default_value_t = DEFAULT_COUNTDOWN_SECS)]
    pub countdown_secs: u32,

    /// Automatic microphone recording duration in milliseconds.
    #[arg(long, default_value_t = DEFAULT_RECORD_MS)]
    pub record_ms: u64,

    /// Skip the automatic microphone recording.
    #[arg(long)]
    pub no_audio: bool,

    /// Write structured logs to the trace file.
    #[arg(long)]
    pub logs: bool,

    /// Disable all log output even when --logs is set.
    #[arg(long)]
    pub no_logs: bool,

    /// List recent SOS reports from the API and exit.
    #[arg(long)]
    pub list_reports: bool,

    /// Mark the given SOS report resolved and exit.
    #[arg(long, value_name = "ID")]
    pub resolve: Option<u64>,

    /// Identity token override; falls back to the stored token, then anonymous.
    #[arg(long, env = "SOSBEACON_USER_ID")]
    pub user_id: Option<String>,
}

impl AppConfig {
    /// Fixed coordinates when both flags were supplied.
    pub fn static_fix(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_flow_contract() {
        let config = AppConfig::parse_from(["sosbeacon"]);
        assert_eq!(config.countdown_secs, 10);
        assert_eq!(config.record_ms, 10_000);
        assert_eq!(config.api_base_url, "http://127.0.0.1:5000");
        assert!(config.static_fix().is_none());
        assert!(!config.no_audio);
    }

    #[test]
    fn static_fix_requires_both_coordinates() {
        let config = AppConfig::parse_from(["sosbeacon", "--lat", "12.9", "--lng", "77.6"]);
        assert_eq!(config.static_fix(), Some((12.9, 77.6)));

        assert!(AppConfig::try_parse_from(["sosbeacon", "--lat", "12.9"]).is_err());
        assert!(AppConfig::try_parse_from(["sosbeacon", "--lng", "77.6"]).is_err());
    }

    #[test]
    fn negative_coordinates_parse() {
        let config = AppConfig::parse_from(["sosbeacon", "--lat", "-33.9", "--lng", "-70.6"]);
        assert_eq!(config.static_fix(), Some((-33.9, -70.6)));
    }
}
