//! FFmpeg video encoder
//!
//! Raw frames are piped into an `ffmpeg` child process which handles the
//! codec and container. Output files are numbered (`name-0000.avi`,
//! `name-0001.avi`, ...) so a size limit can roll over to a new file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::capture::{Frame, PixelFormat};
use crate::export::encoder::VideoEncoder;
use crate::export::types::{ExportError, VideoOptions};

const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Check whether the given ffmpeg binary can be executed
pub fn ffmpeg_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Check whether the given ffmpeg binary was built with an encoder
pub fn ffmpeg_has_encoder(binary: &Path, encoder: &str) -> bool {
    Command::new(binary)
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output()
        .map(|output| {
            String::from_utf8_lossy(&output.stdout)
                .split_whitespace()
                .any(|word| word == encoder)
        })
        .unwrap_or(false)
}

/// Map a 1-100 JPEG quality onto ffmpeg's 2-31 `-q:v` scale (lower is better)
fn mjpeg_qscale(quality: u32) -> u32 {
    let quality = quality.clamp(1, 100);
    2 + (100 - quality) * 29 / 99
}

/// Build the ffmpeg command line for one output file
fn build_args(
    options: &VideoOptions,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    output: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostats".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        pixel_format.ffmpeg_name().to_string(),
        "-s".to_string(),
        format!("{}x{}", width, height),
        "-r".to_string(),
        options.frame_rate().to_string(),
        "-i".to_string(),
        "-".to_string(),
    ];

    match options {
        VideoOptions::Avi { .. } => {
            let raw_format = match pixel_format {
                PixelFormat::Mono8 => "gray",
                PixelFormat::Rgb8 | PixelFormat::Bgr8 => "bgr24",
            };
            args.extend([
                "-c:v".to_string(),
                "rawvideo".to_string(),
                "-pix_fmt".to_string(),
                raw_format.to_string(),
            ]);
        }
        VideoOptions::Mjpg { quality, .. } => {
            args.extend([
                "-c:v".to_string(),
                "mjpeg".to_string(),
                "-q:v".to_string(),
                mjpeg_qscale(*quality).to_string(),
                "-pix_fmt".to_string(),
                "yuvj420p".to_string(),
            ]);
        }
        VideoOptions::H264 { bitrate, .. } => {
            args.extend([
                "-c:v".to_string(),
                "libx264".to_string(),
                "-b:v".to_string(),
                bitrate.to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
            ]);
        }
    }

    args.push(output.to_string_lossy().to_string());
    args
}

/// Path of the `index`-th file of a session
fn segment_path(stem: &Path, index: u32, extension: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_owned();
    name.push(format!("-{:04}.{}", index, extension));
    PathBuf::from(name)
}

/// One running ffmpeg process writing one file
struct FfmpegProcess {
    process: Child,
    stdin: ChildStdin,
    path: PathBuf,
    frame_count: u64,
}

impl FfmpegProcess {
    fn spawn(binary: &Path, args: &[String], path: PathBuf) -> Result<Self, ExportError> {
        tracing::debug!("Starting FFmpeg encoder: {:?}", args);

        let mut process = Command::new(binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::Ffmpeg(format!("Failed to start FFmpeg encoder: {}", e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| ExportError::Ffmpeg("Failed to capture FFmpeg stdin".to_string()))?;

        Ok(Self {
            process,
            stdin,
            path,
            frame_count: 0,
        })
    }

    fn write_frame(&mut self, data: &[u8]) -> Result<(), ExportError> {
        self.stdin
            .write_all(data)
            .map_err(|e| ExportError::Encoding(format!("Failed to write frame: {}", e)))?;
        self.frame_count += 1;
        Ok(())
    }

    /// Bytes ffmpeg has flushed to the output so far
    fn output_size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    fn finish(self) -> Result<PathBuf, ExportError> {
        // Close stdin to signal EOF to FFmpeg
        drop(self.stdin);

        let output = self
            .process
            .wait_with_output()
            .map_err(|e| ExportError::Ffmpeg(format!("Failed to wait for FFmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExportError::Ffmpeg(format!(
                "FFmpeg exited with error: {}",
                stderr.trim()
            )));
        }

        tracing::debug!(
            "FFmpeg encoder finished: {} frames written to {:?}",
            self.frame_count,
            self.path
        );
        Ok(self.path)
    }

    fn kill(mut self) {
        drop(self.stdin);
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// State of an open encoder session
struct Session {
    stem: PathBuf,
    extension: String,
    options: VideoOptions,
    geometry: Option<(u32, u32, PixelFormat)>,
    current: Option<FfmpegProcess>,
    next_index: u32,
    files: Vec<PathBuf>,
}

impl Session {
    fn check_frame(&mut self, frame: &Frame) -> Result<(), ExportError> {
        let geometry = (frame.width(), frame.height(), frame.pixel_format());

        if let VideoOptions::H264 { width, height, .. } = self.options {
            if (width, height) != frame.dimensions() {
                return Err(ExportError::FrameMismatch(format!(
                    "H.264 stream is {}x{} but frame is {}x{}",
                    width,
                    height,
                    frame.width(),
                    frame.height()
                )));
            }
        }

        match self.geometry {
            None => {
                self.geometry = Some(geometry);
                Ok(())
            }
            Some(expected) if expected == geometry => Ok(()),
            Some((w, h, format)) => Err(ExportError::FrameMismatch(format!(
                "session started with {}x{} {:?}, got {}x{} {:?}",
                w,
                h,
                format,
                frame.width(),
                frame.height(),
                frame.pixel_format()
            ))),
        }
    }
}

/// `VideoEncoder` backed by the ffmpeg command-line tool
pub struct FfmpegVideoEncoder {
    binary: PathBuf,
    max_file_size: u64,
    session: Option<Session>,
}

impl Default for FfmpegVideoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegVideoEncoder {
    /// Encoder using `ffmpeg` from `PATH`
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            max_file_size: 0,
            session: None,
        }
    }
}

impl VideoEncoder for FfmpegVideoEncoder {
    fn set_maximum_file_size(&mut self, megabytes: u64) {
        self.max_file_size = megabytes.saturating_mul(BYTES_PER_MEGABYTE);
    }

    fn open(&mut self, path: &Path, options: &VideoOptions) -> Result<(), ExportError> {
        if let Some(session) = &self.session {
            return Err(ExportError::AlreadyOpen(session.stem.clone()));
        }
        options.validate()?;

        let codec = options.codec();
        let (stem, extension) = codec.split_output_path(path);

        if let Some(parent) = stem.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(
            "Opened {} encoder session at {:?} ({} fps)",
            codec.label(),
            stem,
            options.frame_rate()
        );

        self.session = Some(Session {
            stem,
            extension,
            options: options.clone(),
            geometry: None,
            current: None,
            next_index: 0,
            files: Vec::new(),
        });
        Ok(())
    }

    fn append(&mut self, frame: &Frame) -> Result<(), ExportError> {
        let session = self.session.as_mut().ok_or(ExportError::NotOpen)?;
        session.check_frame(frame)?;

        if session.current.is_none() {
            let path = segment_path(&session.stem, session.next_index, &session.extension);
            let args = build_args(
                &session.options,
                frame.width(),
                frame.height(),
                frame.pixel_format(),
                &path,
            );
            session.current = Some(FfmpegProcess::spawn(&self.binary, &args, path)?);
            session.next_index += 1;
        }

        let process = session.current.as_mut().ok_or(ExportError::NotOpen)?;
        process.write_frame(frame.data())?;

        if self.max_file_size > 0 && process.output_size() >= self.max_file_size {
            if let Some(full) = session.current.take() {
                tracing::info!("{:?} reached the size limit, starting a new file", full.path);
                session.files.push(full.finish()?);
            }
        }

        Ok(())
    }

    fn close(&mut self) -> Result<Vec<PathBuf>, ExportError> {
        let mut session = self.session.take().ok_or(ExportError::NotOpen)?;

        if let Some(process) = session.current.take() {
            session.files.push(process.finish()?);
        }

        tracing::info!(
            "Closed {} encoder session: {} file(s)",
            session.options.codec().label(),
            session.files.len()
        );
        Ok(session.files)
    }
}

impl Drop for FfmpegVideoEncoder {
    fn drop(&mut self) {
        if let Some(process) = self.session.take().and_then(|mut s| s.current.take()) {
            process.kill();
        }
    }
}
