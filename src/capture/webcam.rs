//! Webcam capture using nokhwa
//!
//! Enumerates cameras through the platform backend (V4L2, AVFoundation or
//! Media Foundation) and decodes every buffer to packed RGB.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use super::frame::{Frame, PixelFormat};
use super::traits::{
    BusManager, CameraInfo, CameraSession, CaptureError, CaptureResult, DeviceId, Property,
    PropertyInfo, PropertyType,
};

fn to_device_id(index: &CameraIndex) -> DeviceId {
    match index {
        CameraIndex::Index(i) => DeviceId(i.to_string()),
        CameraIndex::String(s) => DeviceId(s.clone()),
    }
}

fn to_camera_index(device: &DeviceId) -> CameraIndex {
    match device.0.parse::<u32>() {
        Ok(idx) => CameraIndex::Index(idx),
        Err(_) => CameraIndex::String(device.0.clone()),
    }
}

/// Bus manager over the cameras nokhwa can see
#[derive(Default)]
pub struct WebcamBus;

impl WebcamBus {
    pub fn new() -> Self {
        Self
    }

    fn query(&self) -> CaptureResult<Vec<nokhwa::utils::CameraInfo>> {
        nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CaptureError::Device(format!("Failed to enumerate cameras: {}", e)))
    }
}

impl BusManager for WebcamBus {
    fn name(&self) -> &str {
        "webcam"
    }

    fn camera_count(&self) -> CaptureResult<usize> {
        Ok(self.query()?.len())
    }

    fn camera_from_index(&self, index: usize) -> CaptureResult<DeviceId> {
        self.query()?
            .get(index)
            .map(|info| to_device_id(info.index()))
            .ok_or_else(|| CaptureError::DeviceNotFound(format!("index {}", index)))
    }

    fn create_session(&self) -> Box<dyn CameraSession> {
        Box::new(WebcamSession {
            camera: None,
            capturing: false,
            buffer: None,
        })
    }
}

struct WebcamSession {
    camera: Option<Camera>,
    capturing: bool,
    buffer: Option<Frame>,
}

impl WebcamSession {
    fn camera(&self) -> CaptureResult<&Camera> {
        self.camera.as_ref().ok_or(CaptureError::NotConnected)
    }
}

impl CameraSession for WebcamSession {
    fn connect(&mut self, device: &DeviceId) -> CaptureResult<()> {
        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let camera = Camera::new(to_camera_index(device), format)
            .map_err(|e| CaptureError::Device(format!("Failed to open camera {}: {}", device, e)))?;

        let camera_format = camera.camera_format();
        tracing::info!(
            "Webcam {} opened: {}x{} @ {}fps, format={:?}",
            device,
            camera_format.resolution().width(),
            camera_format.resolution().height(),
            camera_format.frame_rate(),
            camera_format.format()
        );

        self.camera = Some(camera);
        self.buffer = None;
        Ok(())
    }

    fn camera_info(&self) -> CaptureResult<CameraInfo> {
        let camera = self.camera()?;
        let info = camera.info();
        let resolution = camera.resolution();

        Ok(CameraInfo {
            serial_number: to_device_id(info.index()).0,
            model_name: info.human_name(),
            vendor_name: info.description().to_string(),
            sensor_info: info.misc(),
            sensor_resolution: format!("{}x{}", resolution.width(), resolution.height()),
        })
    }

    fn start_capture(&mut self) -> CaptureResult<()> {
        let camera = self.camera.as_mut().ok_or(CaptureError::NotConnected)?;
        camera
            .open_stream()
            .map_err(|e| CaptureError::Device(format!("Failed to open camera stream: {}", e)))?;
        self.capturing = true;
        Ok(())
    }

    fn retrieve_buffer(&mut self) -> CaptureResult<&Frame> {
        let camera = self.camera.as_mut().ok_or(CaptureError::NotConnected)?;
        if !self.capturing {
            return Err(CaptureError::NotCapturing);
        }

        let buffer = camera
            .frame()
            .map_err(|e| CaptureError::Retrieve(e.to_string()))?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Retrieve(format!("Failed to decode frame: {}", e)))?;

        let (width, height) = (image.width(), image.height());
        let frame = Frame::new(width, height, PixelFormat::Rgb8, image.into_raw())?;

        Ok(&*self.buffer.insert(frame))
    }

    fn stop_capture(&mut self) -> CaptureResult<()> {
        let camera = self.camera.as_mut().ok_or(CaptureError::NotConnected)?;
        if !self.capturing {
            return Err(CaptureError::NotCapturing);
        }
        camera
            .stop_stream()
            .map_err(|e| CaptureError::Device(format!("Failed to stop camera stream: {}", e)))?;
        self.capturing = false;
        Ok(())
    }

    fn property_info(&self, property: PropertyType) -> CaptureResult<PropertyInfo> {
        let camera = self.camera()?;
        let info = match property {
            PropertyType::FrameRate => {
                let fps = camera.frame_rate() as f32;
                PropertyInfo {
                    present: fps > 0.0,
                    abs_supported: true,
                    abs_min: fps,
                    abs_max: fps,
                }
            }
            _ => PropertyInfo::default(),
        };
        Ok(info)
    }

    fn property(&self, property: PropertyType) -> CaptureResult<Property> {
        let camera = self.camera()?;
        match property {
            PropertyType::FrameRate => Ok(Property {
                property_type: property,
                auto_mode: false,
                abs_control: true,
                abs_value: camera.frame_rate() as f32,
            }),
            other => Err(CaptureError::Unsupported(other)),
        }
    }

    fn disconnect(&mut self) -> CaptureResult<()> {
        if let Some(mut camera) = self.camera.take() {
            if self.capturing {
                if let Err(e) = camera.stop_stream() {
                    tracing::warn!("Error stopping camera stream: {}", e);
                }
            }
        }
        self.capturing = false;
        self.buffer = None;
        Ok(())
    }
}
