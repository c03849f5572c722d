//! Capture-and-export driver
//!
//! Runs every camera on a bus: grab a fixed number of frames, then write
//! them out once per codec.

use chrono::Utc;

use crate::capture::{BusManager, CameraSession, DeviceId, PropertyType};
use crate::export::{save_video, FfmpegVideoEncoder, VideoCodec, VideoEncoder};
use crate::utils::{AppError, AppResult, ErrorResponse};

use super::buffer::FrameBuffer;
use super::state::{
    CameraFailure, CameraRunReport, CaptureConfig, CaptureState, ExportOutcome, RunSummary,
};

/// Builds a fresh encoder for each export pass
pub type EncoderFactory = Box<dyn Fn() -> Box<dyn VideoEncoder>>;

/// Drives capture and export over the cameras of one bus
pub struct CaptureDriver {
    bus: Box<dyn BusManager>,
    config: CaptureConfig,
    encoder_factory: EncoderFactory,
}

impl CaptureDriver {
    /// Create a driver that encodes with ffmpeg
    pub fn new(bus: Box<dyn BusManager>, config: CaptureConfig) -> Self {
        Self {
            bus,
            config,
            encoder_factory: Box::new(|| {
                Box::new(FfmpegVideoEncoder::new()) as Box<dyn VideoEncoder>
            }),
        }
    }

    pub fn with_encoder_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn VideoEncoder> + 'static,
    {
        self.encoder_factory = Box::new(factory);
        self
    }

    /// Run every camera on the bus in index order
    pub fn run_all(&self) -> AppResult<RunSummary> {
        let started_at = Utc::now();
        let camera_count = self.bus.camera_count()?;

        println!("Number of cameras detected: {}", camera_count);
        if camera_count == 0 {
            return Err(AppError::NoCameras);
        }

        tracing::info!(
            "Running {} camera(s) on the {} bus",
            camera_count,
            self.bus.name()
        );

        let mut reports = Vec::new();
        let mut failures = Vec::new();

        for index in 0..camera_count {
            let result = self
                .bus
                .camera_from_index(index)
                .map_err(AppError::from)
                .and_then(|device| self.run_camera(&device));

            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!("Camera {} failed: {}", index, e);
                    failures.push(CameraFailure {
                        index,
                        error: ErrorResponse::from(&e),
                    });
                }
            }
        }

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            camera_count,
            reports,
            failures,
        })
    }

    /// Capture and export one camera. The session is disconnected on every
    /// path once it has been connected.
    pub fn run_camera(&self, device: &DeviceId) -> AppResult<CameraRunReport> {
        let mut session = self.bus.create_session();
        let mut state = CaptureState::default();

        session.connect(device)?;
        state.transition(CaptureState::Connected)?;

        let result = self.capture_and_export(session.as_mut(), &mut state);

        if let Err(e) = session.disconnect() {
            tracing::warn!("Error disconnecting {}: {}", device, e);
        }
        state.transition(CaptureState::Disconnected)?;

        result
    }

    fn capture_and_export(
        &self,
        session: &mut dyn CameraSession,
        state: &mut CaptureState,
    ) -> AppResult<CameraRunReport> {
        let info = session.camera_info()?;
        println!("{}", info);

        session.start_capture()?;
        state.transition(CaptureState::Capturing)?;

        let attempted = self.config.num_images;
        let mut frames = FrameBuffer::with_capacity(attempted);
        let mut failed_retrievals = 0;

        for index in 0..attempted {
            match session.retrieve_buffer() {
                Ok(frame) => {
                    tracing::debug!(
                        "Grabbed image {}: {}x{}",
                        index,
                        frame.width(),
                        frame.height()
                    );
                    frames.push_copy(frame);
                }
                Err(e) => {
                    failed_retrievals += 1;
                    tracing::warn!("Error retrieving image {}: {}", index, e);
                }
            }
        }

        session.stop_capture()?;
        state.transition(CaptureState::Stopped)?;

        if frames.is_empty() {
            tracing::warn!("No images captured from camera {}", info.serial_number);
        }

        tracing::info!(
            "Buffered {} of {} images ({} bytes) from camera {}",
            frames.len(),
            attempted,
            frames.byte_size(),
            info.serial_number
        );

        let frame_rate = self.frame_rate(session);
        let settings = self.config.export_settings(frame_rate);
        let mut outputs = Vec::with_capacity(VideoCodec::ALL.len());

        // The first failed pass ends this camera; files from earlier passes
        // are already closed and stay on disk.
        for codec in VideoCodec::ALL {
            state.transition(CaptureState::Exporting(codec))?;

            let base = self.config.output_base(codec, &info.serial_number);
            let mut encoder = (self.encoder_factory)();

            let files = save_video(encoder.as_mut(), codec, frames.as_slice(), &base, &settings)
                .map_err(|e| {
                    tracing::error!(
                        "{} export for camera {} failed: {}",
                        codec.label(),
                        info.serial_number,
                        e
                    );
                    e
                })?;
            outputs.push(ExportOutcome { codec, files });
        }

        state.transition(CaptureState::Done)?;

        Ok(CameraRunReport {
            serial_number: info.serial_number,
            attempted,
            captured: frames.len(),
            failed_retrievals,
            frame_rate,
            outputs,
        })
    }

    /// Frame rate reported by the camera, or the configured fallback
    fn frame_rate(&self, session: &dyn CameraSession) -> f32 {
        let fallback = self.config.fallback_frame_rate;

        let present = match session.property_info(PropertyType::FrameRate) {
            Ok(info) => info.present,
            Err(e) => {
                tracing::warn!("Error querying frame rate property: {}", e);
                false
            }
        };

        if !present {
            tracing::info!("Frame rate not reported, using {} fps", fallback);
            return fallback;
        }

        match session.property(PropertyType::FrameRate) {
            Ok(property) if property.abs_value > 0.0 => {
                tracing::info!("Using frame rate of {} fps", property.abs_value);
                property.abs_value
            }
            Ok(_) => fallback,
            Err(e) => {
                tracing::warn!("Error reading frame rate property: {}", e);
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use crate::capture::{Frame, PixelFormat, SyntheticBus, SyntheticCamera};
    use crate::export::{ExportError, VideoOptions};

    /// Everything the mock encoders saw, shared across passes
    #[derive(Default)]
    struct EncoderLog {
        opened: Vec<(PathBuf, VideoOptions)>,
        appended: Vec<Vec<u8>>,
        closes: usize,
    }

    struct MockEncoder {
        log: Rc<RefCell<EncoderLog>>,
        fail_codec: Option<VideoCodec>,
        codec: Option<VideoCodec>,
    }

    impl VideoEncoder for MockEncoder {
        fn set_maximum_file_size(&mut self, _megabytes: u64) {}

        fn open(&mut self, path: &Path, options: &VideoOptions) -> Result<(), ExportError> {
            self.codec = Some(options.codec());
            self.log
                .borrow_mut()
                .opened
                .push((path.to_path_buf(), options.clone()));
            Ok(())
        }

        fn append(&mut self, frame: &Frame) -> Result<(), ExportError> {
            if self.codec == self.fail_codec {
                return Err(ExportError::Encoding("scripted".to_string()));
            }
            self.log.borrow_mut().appended.push(frame.data().to_vec());
            Ok(())
        }

        fn close(&mut self) -> Result<Vec<PathBuf>, ExportError> {
            let mut log = self.log.borrow_mut();
            log.closes += 1;
            let (path, _) = log.opened.last().ok_or(ExportError::NotOpen)?;
            Ok(vec![path.clone()])
        }
    }

    fn driver(
        bus: SyntheticBus,
        config: CaptureConfig,
        fail_codec: Option<VideoCodec>,
    ) -> (CaptureDriver, Rc<RefCell<EncoderLog>>) {
        let log = Rc::new(RefCell::new(EncoderLog::default()));
        let shared = log.clone();
        let driver = CaptureDriver::new(Box::new(bus), config).with_encoder_factory(move || {
            Box::new(MockEncoder {
                log: shared.clone(),
                fail_codec,
                codec: None,
            }) as Box<dyn VideoEncoder>
        });
        (driver, log)
    }

    fn config(num_images: usize) -> CaptureConfig {
        CaptureConfig {
            num_images,
            output_dir: PathBuf::from("out"),
            ..CaptureConfig::default()
        }
    }

    #[test]
    fn test_failed_retrieves_are_skipped() {
        let bus = SyntheticBus::new(vec![SyntheticCamera::new(7)
            .with_resolution(4, 4)
            .failing_at([1, 3])]);
        let (driver, log) = driver(bus, config(6), None);

        let summary = driver.run_all().unwrap();
        let report = &summary.reports[0];

        assert_eq!(report.attempted, 6);
        assert_eq!(report.captured, 4);
        assert_eq!(report.failed_retrievals, 2);

        // Three passes, each appending the same 4 frames in order
        let log = log.borrow();
        assert_eq!(log.appended.len(), 12);
        assert_eq!(log.closes, 3);
        assert_eq!(log.appended[0..4], log.appended[4..8]);
        assert_ne!(log.appended[0], log.appended[1]);
    }

    #[test]
    fn test_passes_in_export_order() {
        let bus = SyntheticBus::new(vec![SyntheticCamera::new(16_000_001)]);
        let (driver, log) = driver(bus, config(2), None);

        let summary = driver.run_all().unwrap();
        let codecs: Vec<VideoCodec> =
            summary.reports[0].outputs.iter().map(|o| o.codec).collect();
        assert_eq!(codecs, VideoCodec::ALL.to_vec());

        let paths: Vec<PathBuf> = log.borrow().opened.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("out/camstash-Uncompressed-16000001"),
                PathBuf::from("out/camstash-Mjpg-16000001"),
                PathBuf::from("out/camstash-H264-16000001"),
            ]
        );
    }

    #[test]
    fn test_frame_rate_fallback() {
        let bus = SyntheticBus::new(vec![
            SyntheticCamera::new(1).with_frame_rate(None),
            SyntheticCamera::new(2).with_frame_rate(Some(60.0)),
        ]);
        let (driver, log) = driver(bus, config(1), None);

        let summary = driver.run_all().unwrap();
        assert_eq!(summary.reports[0].frame_rate, 15.0);
        assert_eq!(summary.reports[1].frame_rate, 60.0);
        assert_eq!(log.borrow().opened[0].1.frame_rate(), 15.0);
        assert_eq!(log.borrow().opened[3].1.frame_rate(), 60.0);
    }

    #[test]
    fn test_failed_camera_does_not_stop_run() {
        let bus = SyntheticBus::new(vec![
            SyntheticCamera::new(1).unreachable(),
            SyntheticCamera::new(2),
        ]);
        let (driver, _log) = driver(bus, config(3), None);

        let summary = driver.run_all().unwrap();
        assert_eq!(summary.camera_count, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].index, 0);
        assert_eq!(summary.failures[0].error.code, "DEVICE_ERROR");
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].serial_number, "2");
    }

    #[test]
    fn test_no_cameras() {
        let (driver, _log) = driver(SyntheticBus::new(Vec::new()), config(3), None);
        assert!(matches!(driver.run_all(), Err(AppError::NoCameras)));
    }

    #[test]
    fn test_export_failure_ends_camera() {
        let bus = SyntheticBus::new(vec![SyntheticCamera::new(5), SyntheticCamera::new(6)]);
        let (driver, log) = driver(bus, config(2), Some(VideoCodec::Mjpg));

        let summary = driver.run_all().unwrap();

        assert!(summary.reports.is_empty());
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.failures[0].error.code, "EXPORT_ERROR");

        // Uncompressed completed and was closed, Mjpg failed, H264 never ran
        let log = log.borrow();
        let codecs: Vec<VideoCodec> = log.opened.iter().map(|(_, o)| o.codec()).collect();
        assert_eq!(
            codecs,
            vec![
                VideoCodec::Uncompressed,
                VideoCodec::Mjpg,
                VideoCodec::Uncompressed,
                VideoCodec::Mjpg,
            ]
        );
        assert_eq!(log.opened[0].0, PathBuf::from("out/camstash-Uncompressed-5"));
        assert_eq!(log.closes, 4);
        assert_eq!(log.appended.len(), 4);
    }

    #[test]
    fn test_mono_camera() {
        let bus = SyntheticBus::new(vec![SyntheticCamera::new(3)
            .with_resolution(8, 6)
            .with_pixel_format(PixelFormat::Mono8)]);
        let (driver, log) = driver(bus, config(2), None);

        let summary = driver.run_all().unwrap();
        assert_eq!(summary.reports[0].captured, 2);

        let log = log.borrow();
        assert_eq!(log.appended.len(), 6);
        assert!(log.appended.iter().all(|data| data.len() == 8 * 6));
    }

    #[test]
    fn test_every_retrieve_failing() {
        let bus = SyntheticBus::new(vec![SyntheticCamera::new(4).failing_at(0..3)]);
        let (driver, log) = driver(bus, config(3), None);

        let summary = driver.run_all().unwrap();

        // The AVI passes run empty; H264 rejects an empty list before opening
        assert!(summary.reports.is_empty());
        assert_eq!(summary.failures[0].error.code, "EXPORT_ERROR");
        let log = log.borrow();
        assert_eq!(log.opened.len(), 2);
        assert_eq!(log.closes, 2);
        assert!(log.appended.is_empty());
    }

    #[test]
    fn test_connect_error_propagates() {
        let bus = SyntheticBus::new(vec![SyntheticCamera::new(9).unreachable()]);
        let (driver, _log) = driver(bus, config(1), None);

        let result = driver.run_camera(&DeviceId("synthetic-9".to_string()));
        assert!(matches!(result, Err(AppError::Device(_))));
    }
}
