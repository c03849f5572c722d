//! Capture-and-export module
//!
//! This module implements the per-camera workflow:
//! - CaptureState machine for one camera session
//! - FrameBuffer holding the copied frames
//! - CaptureDriver running every camera and every export pass

pub mod buffer;
pub mod driver;
pub mod state;

pub use buffer::FrameBuffer;
pub use driver::{CaptureDriver, EncoderFactory};
pub use state::{
    CameraFailure, CameraRunReport, CaptureConfig, CaptureState, ExportOutcome, RunSummary,
};
