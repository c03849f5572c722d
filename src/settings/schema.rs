//! Persistent settings schema
//!
//! The record is stored as XML, one element per field:
//!
//! ```xml
//! <PersistentSettings XMLVersion="1">
//!   <EnableSettings>false</EnableSettings>
//!   <CustomVideo>
//!     <UseMaxImageSize>true</UseMaxImageSize>
//!   </CustomVideo>
//!   <Brightness>
//!     <AutoMode>true</AutoMode>
//!     <AbsControl>true</AbsControl>
//!     <Value>255</Value>
//!   </Brightness>
//!   <FrameRate>...</FrameRate>
//! </PersistentSettings>
//! ```

use serde::{Deserialize, Serialize};

/// Format tag written to the `XMLVersion` attribute
pub const SETTINGS_VERSION: f32 = 1.0;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

pub const DEFAULT_BRIGHTNESS: f32 = 255.0;
pub const DEFAULT_FRAME_RATE: f32 = 150.0;

fn default_true() -> bool {
    true
}

fn settings_version() -> f32 {
    SETTINGS_VERSION
}

// =============================================================================
// Property Types
// =============================================================================

/// Custom video mode (format 7 style) preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomVideoModeSettings {
    #[serde(rename = "UseMaxImageSize", default = "default_true")]
    pub use_max_image_size: bool,
}

impl Default for CustomVideoModeSettings {
    fn default() -> Self {
        Self {
            use_max_image_size: true,
        }
    }
}

/// A camera property with auto/absolute control flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySettings {
    /// Let the camera drive the value
    #[serde(rename = "AutoMode", default = "default_true")]
    pub auto_mode: bool,

    /// Interpret `value` in absolute units instead of raw register values
    #[serde(rename = "AbsControl", default = "default_true")]
    pub abs_control: bool,

    #[serde(rename = "Value")]
    pub value: f32,
}

impl PropertySettings {
    pub fn with_value(value: f32) -> Self {
        Self {
            auto_mode: true,
            abs_control: true,
            value,
        }
    }
}

fn default_brightness() -> PropertySettings {
    PropertySettings::with_value(DEFAULT_BRIGHTNESS)
}

fn default_frame_rate() -> PropertySettings {
    PropertySettings::with_value(DEFAULT_FRAME_RATE)
}

// =============================================================================
// Settings Record
// =============================================================================

/// The persisted preference record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "PersistentSettings")]
pub struct PersistentSettings {
    #[serde(rename = "@XMLVersion", default = "settings_version")]
    version: f32,

    #[serde(rename = "EnableSettings", default)]
    pub enable_settings: bool,

    #[serde(rename = "CustomVideo", default)]
    pub custom_video_mode: CustomVideoModeSettings,

    #[serde(rename = "Brightness", default = "default_brightness")]
    pub brightness: PropertySettings,

    #[serde(rename = "FrameRate", default = "default_frame_rate")]
    pub frame_rate: PropertySettings,
}

impl Default for PersistentSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            enable_settings: false,
            custom_video_mode: CustomVideoModeSettings::default(),
            brightness: default_brightness(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl PersistentSettings {
    /// Format version. Fixed; whatever a file declares is ignored.
    pub fn version(&self) -> f32 {
        self.version
    }

    /// Render the record as an XML document
    pub fn to_xml(&self) -> Result<String, quick_xml::DeError> {
        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut body);
        serializer.indent(' ', 2);
        self.serialize(serializer)?;

        Ok(format!("{}\n{}\n", XML_DECLARATION, body))
    }

    /// Parse a record from an XML document
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::DeError> {
        let mut settings: PersistentSettings = quick_xml::de::from_str(xml)?;
        settings.version = SETTINGS_VERSION;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PersistentSettings::default();
        assert_eq!(settings.version(), 1.0);
        assert!(!settings.enable_settings);
        assert!(settings.custom_video_mode.use_max_image_size);
        assert!(settings.brightness.auto_mode);
        assert!(settings.brightness.abs_control);
        assert_eq!(settings.brightness.value, 255.0);
        assert!(settings.frame_rate.auto_mode);
        assert!(settings.frame_rate.abs_control);
        assert_eq!(settings.frame_rate.value, 150.0);
    }

    #[test]
    fn test_xml_layout() {
        let xml = PersistentSettings::default().to_xml().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<PersistentSettings XMLVersion=\"1"));
        assert!(xml.contains("<EnableSettings>false</EnableSettings>"));
        assert!(xml.contains("<UseMaxImageSize>true</UseMaxImageSize>"));
        assert!(xml.contains("<Brightness>"));
        assert!(xml.contains("<FrameRate>"));
        assert!(xml.contains("<Value>150"));
    }

    #[test]
    fn test_parse_ignores_declared_version() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<PersistentSettings XMLVersion="7.5">
  <EnableSettings>true</EnableSettings>
  <CustomVideo><UseMaxImageSize>false</UseMaxImageSize></CustomVideo>
  <Brightness><AutoMode>false</AutoMode><AbsControl>true</AbsControl><Value>12.5</Value></Brightness>
  <FrameRate><AutoMode>true</AutoMode><AbsControl>false</AbsControl><Value>30</Value></FrameRate>
</PersistentSettings>"#;

        let settings = PersistentSettings::from_xml(xml).unwrap();
        assert_eq!(settings.version(), SETTINGS_VERSION);
        assert!(settings.enable_settings);
        assert!(!settings.custom_video_mode.use_max_image_size);
        assert!(!settings.brightness.auto_mode);
        assert_eq!(settings.brightness.value, 12.5);
        assert!(!settings.frame_rate.abs_control);
        assert_eq!(settings.frame_rate.value, 30.0);
    }

    #[test]
    fn test_parse_fills_missing_sections_with_defaults() {
        let xml = "<PersistentSettings><EnableSettings>true</EnableSettings></PersistentSettings>";
        let settings = PersistentSettings::from_xml(xml).unwrap();
        assert!(settings.enable_settings);
        assert_eq!(settings.brightness, PropertySettings::with_value(255.0));
        assert_eq!(settings.frame_rate, PropertySettings::with_value(150.0));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let xml = "<PersistentSettings><EnableSettings>maybe</EnableSettings></PersistentSettings>";
        assert!(PersistentSettings::from_xml(xml).is_err());
    }
}
