//! Engine settings
//!
//! Handles loading/saving of the engine's XML settings file and supplies
//! defaults when none exists.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::video::{OutputFormat, ScalingQuality, SeekMode};

fn default_fallback_frame_rate() -> f64 {
    30.0
}

/// Decode and presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "PlaybackEngine")]
pub struct EngineSettings {
    /// Pixel layout of the display buffer
    #[serde(rename = "outputFormat", default)]
    pub output_format: OutputFormat,

    /// Interpolation used for pixel-format conversion
    #[serde(rename = "scaling", default)]
    pub scaling: ScalingQuality,

    /// Keyframe-snapped (fast) or exact seeking
    #[serde(rename = "seekMode", default)]
    pub seek_mode: SeekMode,

    /// Frame rate assumed when the stream does not report one (1-240)
    #[serde(rename = "fallbackFrameRate", default = "default_fallback_frame_rate")]
    pub fallback_frame_rate: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            scaling: ScalingQuality::default(),
            seek_mode: SeekMode::default(),
            fallback_frame_rate: default_fallback_frame_rate(),
        }
    }
}

impl EngineSettings {
    /// Clamp the fallback frame rate to 1-240
    pub fn clamp_frame_rate(&mut self) {
        if !self.fallback_frame_rate.is_finite() {
            self.fallback_frame_rate = default_fallback_frame_rate();
        }
        self.fallback_frame_rate = self.fallback_frame_rate.clamp(1.0, 240.0);
    }

    /// Default settings file: `<config dir>/ImmersivePlayback/engine.xml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("ImmersivePlayback");
            p.push("engine.xml");
            p
        })
    }

    /// Load from the default settings file, falling back to defaults
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let mut settings: Self = from_str(&contents)?;
        settings.clamp_frame_rate();
        Ok(settings)
    }

    /// Save settings to an XML file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let xml = to_string(self)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, formatted)?;
        Ok(())
    }

    /// Save to the default settings file
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to_file(&path)
    }
}

/// Settings-related errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),
    #[error("Could not find config directory")]
    NoConfigDir,
}
