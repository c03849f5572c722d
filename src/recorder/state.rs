//! Capture state management
//!
//! Defines the per-camera capture state machine, the run configuration and
//! the reports produced by a run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::export::{ExportSettings, VideoCodec};
use crate::utils::{AppError, AppResult, ErrorResponse};

/// Where a camera is in its capture-and-export cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    /// No device attached to the session
    Disconnected,
    /// Connected, not streaming
    Connected,
    /// Streaming frames
    Capturing,
    /// Streaming stopped, frames buffered
    Stopped,
    /// Writing one of the export passes
    Exporting(VideoCodec),
    /// All export passes attempted
    Done,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl CaptureState {
    /// Whether `next` may follow `self`
    pub fn can_transition_to(&self, next: CaptureState) -> bool {
        use CaptureState::*;

        match (*self, next) {
            (_, Disconnected) => true,
            (Disconnected, Connected) => true,
            (Connected, Capturing) => true,
            (Capturing, Stopped) => true,
            (Stopped, Exporting(VideoCodec::Uncompressed)) => true,
            (Exporting(VideoCodec::Uncompressed), Exporting(VideoCodec::Mjpg)) => true,
            (Exporting(VideoCodec::Mjpg), Exporting(VideoCodec::H264)) => true,
            (Exporting(VideoCodec::H264), Done) => true,
            _ => false,
        }
    }

    /// Move to `next`, rejecting out-of-order moves
    pub fn transition(&mut self, next: CaptureState) -> AppResult<()> {
        if !self.can_transition_to(next) {
            return Err(AppError::InvalidState(format!("{:?} -> {:?}", self, next)));
        }
        tracing::debug!("Capture state {:?} -> {:?}", self, next);
        *self = next;
        Ok(())
    }
}

fn default_num_images() -> usize {
    100
}

fn default_fallback_frame_rate() -> f32 {
    15.0
}

fn default_max_file_size_mb() -> u64 {
    2048
}

fn default_mjpg_quality() -> u32 {
    75
}

fn default_h264_bitrate() -> u32 {
    1_000_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    "camstash".to_string()
}

/// Configuration for a capture run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Retrieve attempts per camera
    #[serde(default = "default_num_images")]
    pub num_images: usize,

    /// Frame rate used when the camera does not report one
    #[serde(default = "default_fallback_frame_rate")]
    pub fallback_frame_rate: f32,

    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    #[serde(default = "default_mjpg_quality")]
    pub mjpg_quality: u32,

    /// H.264 target bitrate in bits per second
    #[serde(default = "default_h264_bitrate")]
    pub h264_bitrate: u32,

    /// Directory the video files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            num_images: default_num_images(),
            fallback_frame_rate: default_fallback_frame_rate(),
            max_file_size_mb: default_max_file_size_mb(),
            mjpg_quality: default_mjpg_quality(),
            h264_bitrate: default_h264_bitrate(),
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl CaptureConfig {
    /// Base path (without extension) for one camera and codec
    pub fn output_base(&self, codec: VideoCodec, serial_number: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}-{}-{}", self.file_prefix, codec.label(), serial_number))
    }

    pub fn export_settings(&self, frame_rate: f32) -> ExportSettings {
        ExportSettings {
            frame_rate,
            max_file_size_mb: self.max_file_size_mb,
            mjpg_quality: self.mjpg_quality,
            h264_bitrate: self.h264_bitrate,
        }
    }
}

/// Files written by one completed export pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub codec: VideoCodec,
    /// Files written by the pass
    pub files: Vec<PathBuf>,
}

/// Result of running one camera
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRunReport {
    pub serial_number: String,

    /// Retrieve attempts made
    pub attempted: usize,

    /// Frames buffered
    pub captured: usize,

    pub failed_retrievals: usize,

    /// Frame rate the videos were encoded at
    pub frame_rate: f32,

    /// One entry per export pass, in export order
    pub outputs: Vec<ExportOutcome>,
}

impl CameraRunReport {
    pub fn output_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.outputs.iter().flat_map(|o| o.files.iter())
    }
}

/// A camera that could not be run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraFailure {
    pub index: usize,
    pub error: ErrorResponse,
}

/// Result of a run over every camera on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub camera_count: usize,
    pub reports: Vec<CameraRunReport>,
    pub failures: Vec<CameraFailure>,
}

impl RunSummary {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
