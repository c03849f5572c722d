//! Owned image frames

use serde::{Deserialize, Serialize};

use super::traits::CaptureError;

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit grayscale
    Mono8,
    /// Packed 8-bit RGB
    Rgb8,
    /// Packed 8-bit BGR
    Bgr8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Mono8 => 1,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
        }
    }

    /// FFmpeg `-pix_fmt` name for raw input in this layout
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            PixelFormat::Mono8 => "gray",
            PixelFormat::Rgb8 => "rgb24",
            PixelFormat::Bgr8 => "bgr24",
        }
    }
}

/// A single captured image that owns its pixel data
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a pixel buffer, checking that its length matches the geometry
    pub fn new(
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * pixel_format.bytes_per_pixel();
        if width == 0 || height == 0 || data.len() != expected {
            return Err(CaptureError::InvalidFrame(format!(
                "{}x{} {:?} needs {} bytes, got {}",
                width,
                height,
                pixel_format,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pixel_format,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access for producers that refill a buffer in place
    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_is_validated() {
        assert!(Frame::new(4, 2, PixelFormat::Rgb8, vec![0; 24]).is_ok());
        assert!(Frame::new(4, 2, PixelFormat::Rgb8, vec![0; 8]).is_err());
        assert!(Frame::new(0, 2, PixelFormat::Mono8, vec![]).is_err());

        let mono = Frame::new(4, 2, PixelFormat::Mono8, vec![7; 8]).unwrap();
        assert_eq!(mono.dimensions(), (4, 2));
        assert_eq!(mono.data().len(), 8);
    }
}
