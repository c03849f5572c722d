//! Export pass orchestration
//!
//! Drives one `VideoEncoder` session over a buffered frame list.

use std::path::{Path, PathBuf};

use crate::capture::Frame;
use crate::export::encoder::VideoEncoder;
use crate::export::types::{ExportError, VideoCodec};

/// Encoder parameters shared by every export pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSettings {
    pub frame_rate: f32,
    pub max_file_size_mb: u64,
    pub mjpg_quality: u32,
    pub h264_bitrate: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            frame_rate: 15.0,
            max_file_size_mb: 2048,
            mjpg_quality: 75,
            h264_bitrate: 1_000_000,
        }
    }
}

/// Encode `frames` with `codec` into files starting at `base_path`.
///
/// The encoder is closed exactly once after it has been opened, even when an
/// append fails. The first error wins.
pub fn save_video(
    encoder: &mut dyn VideoEncoder,
    codec: VideoCodec,
    frames: &[Frame],
    base_path: &Path,
    settings: &ExportSettings,
) -> Result<Vec<PathBuf>, ExportError> {
    let dimensions = match (codec, frames.first()) {
        (_, Some(first)) => first.dimensions(),
        (VideoCodec::H264, None) => {
            return Err(ExportError::InvalidConfig(
                "H.264 export needs at least one frame".to_string(),
            ))
        }
        (_, None) => (0, 0),
    };

    let options = codec.options(
        settings.frame_rate,
        settings.mjpg_quality,
        settings.h264_bitrate,
        dimensions,
    );

    encoder.set_maximum_file_size(settings.max_file_size_mb);
    encoder.open(base_path, &options)?;

    tracing::info!(
        "Appending {} images to {} file {:?}",
        frames.len(),
        codec.label(),
        base_path
    );

    let appended = frames.iter().enumerate().try_for_each(|(index, frame)| {
        encoder.append(frame).map_err(|e| {
            tracing::error!("Error appending image {} to {} video: {}", index, codec.label(), e);
            e
        })
    });

    let closed = encoder.close();

    match (appended, closed) {
        (Err(e), _) => Err(e),
        (Ok(()), Err(e)) => {
            tracing::error!("Error closing {} video: {}", codec.label(), e);
            Err(e)
        }
        (Ok(()), Ok(files)) => {
            tracing::info!("Saved {} video: {:?}", codec.label(), files);
            Ok(files)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::capture::PixelFormat;
    use crate::export::types::VideoOptions;

    /// Encoder that records every call
    #[derive(Default)]
    pub(crate) struct RecordingEncoder {
        pub max_file_size: Option<u64>,
        pub opened: Vec<(PathBuf, VideoOptions)>,
        pub appended: Vec<u8>,
        pub closes: usize,
        pub fail_append_at: Option<usize>,
        pub fail_close: bool,
    }

    impl VideoEncoder for RecordingEncoder {
        fn set_maximum_file_size(&mut self, megabytes: u64) {
            self.max_file_size = Some(megabytes);
        }

        fn open(&mut self, path: &Path, options: &VideoOptions) -> Result<(), ExportError> {
            self.opened.push((path.to_path_buf(), options.clone()));
            Ok(())
        }

        fn append(&mut self, frame: &Frame) -> Result<(), ExportError> {
            if self.fail_append_at == Some(self.appended.len()) {
                return Err(ExportError::Encoding("scripted append failure".to_string()));
            }
            // First byte identifies the frame
            self.appended.push(frame.data()[0]);
            Ok(())
        }

        fn close(&mut self) -> Result<Vec<PathBuf>, ExportError> {
            self.closes += 1;
            if self.fail_close {
                return Err(ExportError::Ffmpeg("scripted close failure".to_string()));
            }
            let (path, _) = self.opened.last().ok_or(ExportError::NotOpen)?;
            Ok(vec![path.clone()])
        }
    }

    fn numbered_frames(count: u8) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame::new(2, 2, PixelFormat::Mono8, vec![i; 4]).unwrap())
            .collect()
    }

    #[test]
    fn test_appends_every_frame_in_order() {
        let frames = numbered_frames(5);
        let mut encoder = RecordingEncoder::default();

        let files = save_video(
            &mut encoder,
            VideoCodec::Mjpg,
            &frames,
            Path::new("out/cam-Mjpg-1"),
            &ExportSettings::default(),
        )
        .unwrap();

        assert_eq!(files, vec![PathBuf::from("out/cam-Mjpg-1")]);
        assert_eq!(encoder.appended, vec![0, 1, 2, 3, 4]);
        assert_eq!(encoder.closes, 1);
        assert_eq!(encoder.max_file_size, Some(2048));
        assert_eq!(
            encoder.opened[0].1,
            VideoOptions::Mjpg {
                frame_rate: 15.0,
                quality: 75
            }
        );
    }

    #[test]
    fn test_h264_uses_first_frame_dimensions() {
        let frames = numbered_frames(2);
        let mut encoder = RecordingEncoder::default();
        let settings = ExportSettings {
            frame_rate: 30.0,
            ..ExportSettings::default()
        };

        save_video(&mut encoder, VideoCodec::H264, &frames, Path::new("v"), &settings).unwrap();

        assert_eq!(
            encoder.opened[0].1,
            VideoOptions::H264 {
                frame_rate: 30.0,
                bitrate: 1_000_000,
                width: 2,
                height: 2
            }
        );
    }

    #[test]
    fn test_close_runs_once_after_append_failure() {
        let frames = numbered_frames(5);
        let mut encoder = RecordingEncoder {
            fail_append_at: Some(2),
            fail_close: true,
            ..RecordingEncoder::default()
        };

        let result = save_video(
            &mut encoder,
            VideoCodec::Uncompressed,
            &frames,
            Path::new("v"),
            &ExportSettings::default(),
        );

        // The append error is reported, not the later close error
        assert!(matches!(result, Err(ExportError::Encoding(_))));
        assert_eq!(encoder.appended, vec![0, 1]);
        assert_eq!(encoder.closes, 1);
    }

    #[test]
    fn test_close_failure_is_reported() {
        let frames = numbered_frames(1);
        let mut encoder = RecordingEncoder {
            fail_close: true,
            ..RecordingEncoder::default()
        };

        let result = save_video(
            &mut encoder,
            VideoCodec::Mjpg,
            &frames,
            Path::new("v"),
            &ExportSettings::default(),
        );
        assert!(matches!(result, Err(ExportError::Ffmpeg(_))));
    }

    #[test]
    fn test_empty_frame_list() {
        let mut encoder = RecordingEncoder::default();
        let result = save_video(
            &mut encoder,
            VideoCodec::H264,
            &[],
            Path::new("v"),
            &ExportSettings::default(),
        );
        assert!(matches!(result, Err(ExportError::InvalidConfig(_))));
        assert!(encoder.opened.is_empty());

        save_video(
            &mut encoder,
            VideoCodec::Uncompressed,
            &[],
            Path::new("v"),
            &ExportSettings::default(),
        )
        .unwrap();
        assert!(encoder.appended.is_empty());
        assert_eq!(encoder.closes, 1);
    }
}
