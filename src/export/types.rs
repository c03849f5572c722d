//! Export types and configuration
//!
//! This module defines the codecs the exporter can produce, the per-codec
//! encoder options, and export errors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Video codec/container combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoCodec {
    /// Raw frames in an AVI container
    Uncompressed,
    /// Motion JPEG in an AVI container
    Mjpg,
    /// H.264 in an MP4 container (or the container named by the extension)
    H264,
}

impl VideoCodec {
    /// Every codec, in export order
    pub const ALL: [VideoCodec; 3] = [VideoCodec::Uncompressed, VideoCodec::Mjpg, VideoCodec::H264];

    /// Tag used in output file names
    pub fn label(&self) -> &'static str {
        match self {
            VideoCodec::Uncompressed => "Uncompressed",
            VideoCodec::Mjpg => "Mjpg",
            VideoCodec::H264 => "H264",
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            VideoCodec::Uncompressed | VideoCodec::Mjpg => "avi",
            VideoCodec::H264 => "mp4",
        }
    }

    /// Extension actually used for `path`.
    ///
    /// AVI codecs ignore any extension the caller gave; H.264 honours it.
    pub fn resolve_extension(&self, path: &Path) -> String {
        self.split_output_path(path).1
    }

    /// Split `path` into the file stem and the extension to write.
    ///
    /// Only a known container extension counts as an extension, so dots in
    /// a prefix or serial number stay part of the stem.
    pub fn split_output_path(&self, path: &Path) -> (PathBuf, String) {
        let given = path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|ext| is_container_extension(ext));

        let stem = match given {
            Some(_) => path.with_extension(""),
            None => path.to_path_buf(),
        };
        let extension = match (self, given) {
            (VideoCodec::H264, Some(ext)) => ext.to_string(),
            _ => self.default_extension().to_string(),
        };
        (stem, extension)
    }

    /// Encoder options for this codec. H.264 takes the stream dimensions
    /// from `dimensions`; the other codecs ignore them.
    pub fn options(
        &self,
        frame_rate: f32,
        quality: u32,
        bitrate: u32,
        dimensions: (u32, u32),
    ) -> VideoOptions {
        match self {
            VideoCodec::Uncompressed => VideoOptions::Avi { frame_rate },
            VideoCodec::Mjpg => VideoOptions::Mjpg {
                frame_rate,
                quality,
            },
            VideoCodec::H264 => VideoOptions::H264 {
                frame_rate,
                bitrate,
                width: dimensions.0,
                height: dimensions.1,
            },
        }
    }
}

const CONTAINER_EXTENSIONS: [&str; 6] = ["avi", "mp4", "m4v", "mkv", "mov", "ts"];

fn is_container_extension(ext: &str) -> bool {
    CONTAINER_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Encoder configuration passed to `VideoEncoder::open`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "codec")]
pub enum VideoOptions {
    Avi {
        frame_rate: f32,
    },
    Mjpg {
        frame_rate: f32,
        /// JPEG quality, 1 (worst) to 100 (best)
        quality: u32,
    },
    H264 {
        frame_rate: f32,
        /// Target bitrate in bits per second
        bitrate: u32,
        width: u32,
        height: u32,
    },
}

impl VideoOptions {
    pub fn codec(&self) -> VideoCodec {
        match self {
            VideoOptions::Avi { .. } => VideoCodec::Uncompressed,
            VideoOptions::Mjpg { .. } => VideoCodec::Mjpg,
            VideoOptions::H264 { .. } => VideoCodec::H264,
        }
    }

    pub fn frame_rate(&self) -> f32 {
        match self {
            VideoOptions::Avi { frame_rate }
            | VideoOptions::Mjpg { frame_rate, .. }
            | VideoOptions::H264 { frame_rate, .. } => *frame_rate,
        }
    }

    /// Reject values no encoder can honour
    pub fn validate(&self) -> Result<(), ExportError> {
        let frame_rate = self.frame_rate();
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(ExportError::InvalidConfig(format!(
                "frame rate must be positive, got {}",
                frame_rate
            )));
        }

        match self {
            VideoOptions::Mjpg { quality, .. } if !(1..=100).contains(quality) => Err(
                ExportError::InvalidConfig(format!("MJPEG quality must be 1-100, got {}", quality)),
            ),
            VideoOptions::H264 { bitrate: 0, .. } => Err(ExportError::InvalidConfig(
                "H.264 bitrate must be positive".to_string(),
            )),
            VideoOptions::H264 { width, height, .. } if *width == 0 || *height == 0 => {
                Err(ExportError::InvalidConfig(format!(
                    "H.264 dimensions must be non-zero, got {}x{}",
                    width, height
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Encoder is not open")]
    NotOpen,

    #[error("Encoder is already open: {0:?}")]
    AlreadyOpen(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame mismatch: {0}")]
    FrameMismatch(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}
