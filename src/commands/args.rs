//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "camstash", version, about = "Capture camera frames and export them as video")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Grab frames from every camera and write them out as video
    Capture(CaptureArgs),
    /// Inspect or change the persistent camera settings
    Settings(SettingsArgs),
}

/// Camera bus implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Generated test patterns
    Synthetic,
    /// Cameras attached to this machine
    Webcam,
}

#[derive(Debug, Args)]
pub struct CaptureArgs {
    #[arg(long, value_enum, default_value_t = Backend::Synthetic)]
    pub backend: Backend,

    /// Number of synthetic cameras
    #[arg(long, default_value_t = 1)]
    pub cameras: usize,

    /// Retrieve attempts per camera
    #[arg(long)]
    pub num_images: Option<usize>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// JSON capture configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Settings file (defaults to camstash-settings.xml in the working directory)
    #[arg(long)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the stored settings
    Show,
    /// Change individual settings and save
    Set(SettingsUpdate),
    /// Restore defaults and save
    Reset,
}

#[derive(Debug, Default, Args)]
pub struct SettingsUpdate {
    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    #[arg(long)]
    pub disable: bool,

    #[arg(long)]
    pub use_max_image_size: Option<bool>,

    #[arg(long)]
    pub brightness: Option<f32>,

    #[arg(long)]
    pub brightness_auto: Option<bool>,

    #[arg(long)]
    pub frame_rate: Option<f32>,

    #[arg(long)]
    pub frame_rate_auto: Option<bool>,
}
