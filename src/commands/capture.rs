//! `capture` command

use std::path::Path;

use crate::capture::{BusManager, SyntheticBus};
use crate::commands::args::{Backend, CaptureArgs};
use crate::commands::system::print_build_info;
use crate::export::{ffmpeg_available, ffmpeg_has_encoder};
use crate::recorder::{CaptureConfig, CaptureDriver, RunSummary};
use crate::utils::fs::ensure_writable;
use crate::utils::{AppError, AppResult};

/// Read a JSON capture configuration. Missing keys take their defaults.
pub fn load_config(path: &Path) -> AppResult<CaptureConfig> {
    let contents = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&contents)?;
    tracing::info!("Loaded capture configuration from {:?}", path);
    Ok(config)
}

/// Configuration file (if any) with command-line overrides applied
pub fn resolve_config(args: &CaptureArgs) -> AppResult<CaptureConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => CaptureConfig::default(),
    };

    if let Some(num_images) = args.num_images {
        config.num_images = num_images;
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }

    Ok(config)
}

fn create_bus(args: &CaptureArgs) -> AppResult<Box<dyn BusManager>> {
    match args.backend {
        Backend::Synthetic => Ok(Box::new(SyntheticBus::with_cameras(args.cameras))),
        #[cfg(feature = "webcam")]
        Backend::Webcam => Ok(Box::new(crate::capture::WebcamBus::new())),
        #[cfg(not(feature = "webcam"))]
        Backend::Webcam => Err(AppError::Device(crate::capture::CaptureError::Device(
            "webcam support not compiled in (enable the `webcam` feature)".to_string(),
        ))),
    }
}

/// Capture from every camera and export the videos
pub fn capture(args: &CaptureArgs) -> AppResult<RunSummary> {
    print_build_info();

    let config = resolve_config(args)?;
    ensure_writable(&config.output_dir)?;

    let ffmpeg = Path::new("ffmpeg");
    if !ffmpeg_available(ffmpeg) {
        tracing::warn!("ffmpeg was not found on PATH, export passes will fail");
    } else if !ffmpeg_has_encoder(ffmpeg, "libx264") {
        tracing::warn!("ffmpeg has no libx264 encoder, the H264 pass will fail");
    }

    let bus = create_bus(args)?;
    let driver = CaptureDriver::new(bus, config);
    let summary = driver.run_all()?;

    print_summary(&summary);
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Finished {} camera(s) in {} ms",
        summary.camera_count,
        summary.duration_ms()
    );

    for report in &summary.reports {
        println!(
            "Camera {}: {} of {} images at {} fps",
            report.serial_number, report.captured, report.attempted, report.frame_rate
        );
        for outcome in &report.outputs {
            for file in &outcome.files {
                println!("  {:<12} {}", outcome.codec.label(), file.display());
            }
        }
    }

    for failure in &summary.failures {
        println!(
            "Camera {} failed [{}]: {}",
            failure.index, failure.error.code, failure.error.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn args() -> CaptureArgs {
        CaptureArgs {
            backend: Backend::Synthetic,
            cameras: 1,
            num_images: None,
            output_dir: None,
            config: None,
        }
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(&path, r#"{ "numImages": 20, "mjpgQuality": 90, "filePrefix": "lab" }"#)
            .unwrap();

        let config = resolve_config(&CaptureArgs {
            num_images: Some(5),
            config: Some(path),
            ..args()
        })
        .unwrap();

        assert_eq!(config.num_images, 5);
        assert_eq!(config.mjpg_quality, 90);
        assert_eq!(config.file_prefix, "lab");
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_bad_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = resolve_config(&CaptureArgs {
            config: Some(path),
            ..args()
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_unwritable_output_dir() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let result = capture(&CaptureArgs {
            output_dir: Some(file),
            ..args()
        });
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[test]
    fn test_no_cameras() {
        let dir = tempdir().unwrap();
        let result = capture(&CaptureArgs {
            cameras: 0,
            output_dir: Some(dir.path().to_path_buf()),
            ..args()
        });
        assert!(matches!(result, Err(AppError::NoCameras)));
    }

    #[test]
    fn test_capture_synthetic_end_to_end() {
        if !ffmpeg_available(Path::new("ffmpeg")) {
            eprintln!("ffmpeg not found, skipping");
            return;
        }

        let dir = tempdir().unwrap();
        let summary = capture(&CaptureArgs {
            cameras: 2,
            num_images: Some(5),
            output_dir: Some(dir.path().to_path_buf()),
            ..args()
        })
        .unwrap();

        if ffmpeg_has_encoder(Path::new("ffmpeg"), "libx264") {
            assert_eq!(summary.reports.len(), 2);
            for report in &summary.reports {
                assert_eq!(report.captured, 5);
                assert_eq!(report.output_files().count(), 3);
                assert!(report.output_files().all(|file| file.exists()));
            }
            assert!(dir.path().join("camstash-H264-16000001-0000.mp4").exists());
        } else {
            // The H264 pass fails each camera after the AVI files are written
            assert_eq!(summary.failures.len(), 2);
        }

        // The AVI passes only need ffmpeg's built-in encoders
        assert!(dir
            .path()
            .join("camstash-Uncompressed-16000000-0000.avi")
            .exists());
        assert!(dir.path().join("camstash-Mjpg-16000001-0000.avi").exists());
    }
}
