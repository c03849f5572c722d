//! Persistent camera settings
//!
//! A small preference record (brightness, frame rate, video mode flags)
//! saved as XML next to the application.

pub mod schema;
pub mod store;

pub use schema::{CustomVideoModeSettings, PersistentSettings, PropertySettings, SETTINGS_VERSION};
pub use store::{LoadOutcome, SettingsError, SettingsStore, SETTINGS_FILE_NAME};
