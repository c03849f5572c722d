//! Capture trait definitions
//!
//! Backend-agnostic types for enumerating cameras and pulling frames.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::frame::Frame;

/// Opaque identifier of an attached camera
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Information about a connected camera
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    pub serial_number: String,
    pub model_name: String,
    pub vendor_name: String,
    pub sensor_info: String,
    pub sensor_resolution: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*** CAMERA INFORMATION ***")?;
        writeln!(f, "Serial number - {}", self.serial_number)?;
        writeln!(f, "Camera model - {}", self.model_name)?;
        writeln!(f, "Camera vendor - {}", self.vendor_name)?;
        writeln!(f, "Sensor - {}", self.sensor_info)?;
        write!(f, "Resolution - {}", self.sensor_resolution)
    }
}

/// Camera properties that can be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    Brightness,
    FrameRate,
    Shutter,
    Gain,
}

/// Capabilities of a property on a specific camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    /// The camera exposes this property at all
    pub present: bool,
    /// Absolute (unit) values are supported
    pub abs_supported: bool,
    pub abs_min: f32,
    pub abs_max: f32,
}

/// Current value of a property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub property_type: PropertyType,
    pub auto_mode: bool,
    pub abs_control: bool,
    pub abs_value: f32,
}

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Camera is not connected")]
    NotConnected,

    #[error("Camera is not capturing")]
    NotCapturing,

    #[error("Failed to retrieve buffer: {0}")]
    Retrieve(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Property not supported: {0:?}")]
    Unsupported(PropertyType),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Enumerates attached cameras and hands out sessions to talk to them
pub trait BusManager {
    /// Short backend name for logs
    fn name(&self) -> &str;

    fn camera_count(&self) -> CaptureResult<usize>;

    fn camera_from_index(&self, index: usize) -> CaptureResult<DeviceId>;

    /// A fresh, disconnected session
    fn create_session(&self) -> Box<dyn CameraSession>;
}

/// One connection to one camera
pub trait CameraSession {
    fn connect(&mut self, device: &DeviceId) -> CaptureResult<()>;

    fn camera_info(&self) -> CaptureResult<CameraInfo>;

    fn start_capture(&mut self) -> CaptureResult<()>;

    /// Wait for the next image.
    ///
    /// The returned frame lives in a buffer owned by the session and is
    /// overwritten by the next call; clone it to keep it.
    fn retrieve_buffer(&mut self) -> CaptureResult<&Frame>;

    fn stop_capture(&mut self) -> CaptureResult<()>;

    fn property_info(&self, property: PropertyType) -> CaptureResult<PropertyInfo>;

    fn property(&self, property: PropertyType) -> CaptureResult<Property>;

    fn disconnect(&mut self) -> CaptureResult<()>;
}
