//! Synthetic test-pattern cameras
//!
//! An in-process bus that behaves like real hardware: cameras must be
//! connected and started before frames can be retrieved, and individual
//! retrieves can be scripted to fail.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::frame::{Frame, PixelFormat};
use super::traits::{
    BusManager, CameraInfo, CameraSession, CaptureError, CaptureResult, DeviceId, Property,
    PropertyInfo, PropertyType,
};

const DEVICE_PREFIX: &str = "synthetic-";

/// Description of one simulated camera
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    pub serial_number: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// `None` means the camera does not expose a frame rate property
    pub frame_rate: Option<f32>,
    /// Zero-based retrieve attempts that fail
    pub failing_retrieves: BTreeSet<usize>,
    /// Refuse connections
    pub unreachable: bool,
}

impl SyntheticCamera {
    pub fn new(serial_number: u32) -> Self {
        Self {
            serial_number,
            width: 320,
            height: 240,
            pixel_format: PixelFormat::Rgb8,
            frame_rate: Some(30.0),
            failing_retrieves: BTreeSet::new(),
            unreachable: false,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_pixel_format(mut self, pixel_format: PixelFormat) -> Self {
        self.pixel_format = pixel_format;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: Option<f32>) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn failing_at(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.failing_retrieves.extend(attempts);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    fn device_id(&self) -> DeviceId {
        DeviceId(format!("{}{}", DEVICE_PREFIX, self.serial_number))
    }
}

/// Bus manager over a fixed list of synthetic cameras
pub struct SyntheticBus {
    cameras: Arc<Vec<SyntheticCamera>>,
}

impl SyntheticBus {
    pub fn new(cameras: Vec<SyntheticCamera>) -> Self {
        Self {
            cameras: Arc::new(cameras),
        }
    }

    /// `count` default cameras with consecutive serial numbers
    pub fn with_cameras(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|i| SyntheticCamera::new(16_000_000 + i as u32))
                .collect(),
        )
    }
}

impl BusManager for SyntheticBus {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn camera_count(&self) -> CaptureResult<usize> {
        Ok(self.cameras.len())
    }

    fn camera_from_index(&self, index: usize) -> CaptureResult<DeviceId> {
        self.cameras
            .get(index)
            .map(SyntheticCamera::device_id)
            .ok_or_else(|| CaptureError::DeviceNotFound(format!("index {}", index)))
    }

    fn create_session(&self) -> Box<dyn CameraSession> {
        Box::new(SyntheticSession {
            bus: self.cameras.clone(),
            camera: None,
            capturing: false,
            attempts: 0,
            buffer: None,
        })
    }
}

struct SyntheticSession {
    bus: Arc<Vec<SyntheticCamera>>,
    camera: Option<SyntheticCamera>,
    capturing: bool,
    attempts: usize,
    buffer: Option<Frame>,
}

impl SyntheticSession {
    fn camera(&self) -> CaptureResult<&SyntheticCamera> {
        self.camera.as_ref().ok_or(CaptureError::NotConnected)
    }
}

impl CameraSession for SyntheticSession {
    fn connect(&mut self, device: &DeviceId) -> CaptureResult<()> {
        let camera = self
            .bus
            .iter()
            .find(|c| c.device_id() == *device)
            .ok_or_else(|| CaptureError::DeviceNotFound(device.to_string()))?;

        if camera.unreachable {
            return Err(CaptureError::Device(format!("{} did not respond", device)));
        }

        self.camera = Some(camera.clone());
        self.attempts = 0;
        self.buffer = None;
        Ok(())
    }

    fn camera_info(&self) -> CaptureResult<CameraInfo> {
        let camera = self.camera()?;
        Ok(CameraInfo {
            serial_number: camera.serial_number.to_string(),
            model_name: "Synthetic Test Pattern".to_string(),
            vendor_name: "camstash".to_string(),
            sensor_info: format!("{:?}", camera.pixel_format),
            sensor_resolution: format!("{}x{}", camera.width, camera.height),
        })
    }

    fn start_capture(&mut self) -> CaptureResult<()> {
        self.camera()?;
        self.capturing = true;
        Ok(())
    }

    fn retrieve_buffer(&mut self) -> CaptureResult<&Frame> {
        let camera = self.camera.as_ref().ok_or(CaptureError::NotConnected)?;
        if !self.capturing {
            return Err(CaptureError::NotCapturing);
        }

        let attempt = self.attempts;
        self.attempts += 1;

        if camera.failing_retrieves.contains(&attempt) {
            return Err(CaptureError::Retrieve(format!(
                "simulated timeout on attempt {}",
                attempt
            )));
        }

        if self.buffer.is_none() {
            let pixels = camera.width as usize * camera.height as usize;
            let len = pixels * camera.pixel_format.bytes_per_pixel();
            self.buffer = Some(Frame::new(
                camera.width,
                camera.height,
                camera.pixel_format,
                vec![0; len],
            )?);
        }

        let frame = self.buffer.as_mut().ok_or(CaptureError::NotCapturing)?;
        paint_pattern(frame, attempt);
        Ok(&*frame)
    }

    fn stop_capture(&mut self) -> CaptureResult<()> {
        if !self.capturing {
            return Err(CaptureError::NotCapturing);
        }
        self.capturing = false;
        Ok(())
    }

    fn property_info(&self, property: PropertyType) -> CaptureResult<PropertyInfo> {
        let camera = self.camera()?;
        let info = match property {
            PropertyType::FrameRate if camera.frame_rate.is_some() => PropertyInfo {
                present: true,
                abs_supported: true,
                abs_min: 1.0,
                abs_max: 240.0,
            },
            PropertyType::Brightness => PropertyInfo {
                present: true,
                abs_supported: true,
                abs_min: 0.0,
                abs_max: 255.0,
            },
            _ => PropertyInfo::default(),
        };
        Ok(info)
    }

    fn property(&self, property: PropertyType) -> CaptureResult<Property> {
        let camera = self.camera()?;
        let abs_value = match property {
            PropertyType::FrameRate => camera.frame_rate,
            PropertyType::Brightness => Some(128.0),
            _ => None,
        }
        .ok_or(CaptureError::Unsupported(property))?;

        Ok(Property {
            property_type: property,
            auto_mode: true,
            abs_control: true,
            abs_value,
        })
    }

    fn disconnect(&mut self) -> CaptureResult<()> {
        self.capturing = false;
        self.camera = None;
        self.buffer = None;
        Ok(())
    }
}

/// Diagonal gradient that shifts with every frame
fn paint_pattern(frame: &mut Frame, sequence: usize) {
    let width = frame.width() as usize;
    let bpp = frame.pixel_format().bytes_per_pixel();
    let shift = sequence.wrapping_mul(4);

    for (i, pixel) in frame.data_mut().chunks_exact_mut(bpp).enumerate() {
        let x = i % width;
        let y = i / width;
        for (channel, value) in pixel.iter_mut().enumerate() {
            *value = (x + y + shift + channel * 85) as u8;
        }
    }
}
