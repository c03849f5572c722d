//! Video export module
//!
//! This module turns buffered frames into video files: the encoder trait,
//! the ffmpeg-backed encoder, and the per-codec export pass.

pub mod encoder;
pub mod ffmpeg;
pub mod pipeline;
pub mod types;

pub use encoder::VideoEncoder;
pub use ffmpeg::{ffmpeg_available, ffmpeg_has_encoder, FfmpegVideoEncoder};
pub use pipeline::{save_video, ExportSettings};
pub use types::{ExportError, VideoCodec, VideoOptions};
