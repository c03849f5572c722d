//! Camera capture
//!
//! Traits describing a camera bus and camera sessions, plus the backends
//! that implement them.

pub mod frame;
pub mod synthetic;
pub mod traits;

#[cfg(feature = "webcam")]
pub mod webcam;

pub use frame::{Frame, PixelFormat};
pub use synthetic::{SyntheticBus, SyntheticCamera};
pub use traits::{
    BusManager, CameraInfo, CameraSession, CaptureError, CaptureResult, DeviceId, Property,
    PropertyInfo, PropertyType,
};

#[cfg(feature = "webcam")]
pub use webcam::WebcamBus;
