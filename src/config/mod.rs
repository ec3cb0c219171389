//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::overlay::widgets::OverlayStyle;
use crate::vision::ocr::{PageSegmentationMode, RecognitionConfig, ALPHABET_WHITELIST};
use crate::vision::{FilterConfig, MotionConfig};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Video source settings
    pub source: SourceSettings,
    /// Motion gate settings
    pub motion: MotionConfig,
    /// Recognition engine settings
    pub recognition: RecognitionSettings,
    /// Cycle cadence
    pub schedule: ScheduleConfig,
    /// Overlay look
    pub overlay: OverlayStyle,
    /// Where results go
    pub output: OutputSettings,
}

/// Video source settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceSettings {
    /// Directory of still frames played back as video
    pub frames_dir: Option<PathBuf>,
    /// Playback frame rate
    pub fps: f32,
    /// Restart from the first frame after the last one
    pub looping: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            frames_dir: None,
            fps: 30.0,
            looping: true,
        }
    }
}

/// Recognition engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Path or name of the tesseract executable
    pub tesseract_path: PathBuf,
    /// Tesseract language pack
    pub language: String,
    /// Characters the engine may emit
    pub character_whitelist: String,
    /// Page segmentation mode
    pub page_segmentation_mode: PageSegmentationMode,
    /// Candidates must score strictly above this (0 - 100)
    pub min_confidence: f32,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            character_whitelist: ALPHABET_WHITELIST.to_string(),
            page_segmentation_mode: PageSegmentationMode::SparseText,
            min_confidence: 50.0,
        }
    }
}

impl RecognitionSettings {
    /// Settings handed to the engine at initialization
    pub fn engine_config(&self) -> RecognitionConfig {
        RecognitionConfig {
            character_whitelist: self.character_whitelist.clone(),
            page_segmentation_mode: self.page_segmentation_mode,
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            min_confidence: self.min_confidence,
        }
    }
}

/// Delays between cycles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Wait after a cycle that saw no motion (or no frame)
    pub idle_delay_ms: u64,
    /// Wait after a cycle that ran recognition
    pub cycle_delay_ms: u64,
    /// Wait before retrying while an earlier recognition is still in flight
    pub busy_retry_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: 100,
            cycle_delay_ms: 1000,
            busy_retry_ms: 16,
        }
    }
}

impl ScheduleConfig {
    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_millis(self.cycle_delay_ms)
    }

    pub fn busy_retry(&self) -> Duration {
        Duration::from_millis(self.busy_retry_ms)
    }
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Write a PNG of the overlay every time it changes
    pub snapshot_dir: Option<PathBuf>,
    /// Print detections as JSON lines on stdout
    pub json: bool,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        // Check source defaults
        assert!(config.source.frames_dir.is_none());
        assert!((config.source.fps - 30.0).abs() < 0.01);
        assert!(config.source.looping);

        // Check motion defaults
        assert_eq!(config.motion.sample_stride, 10);
        assert_eq!(config.motion.pixel_threshold, 30);
        assert!((config.motion.min_changed_fraction - 0.01).abs() < 1e-6);

        // Check recognition defaults
        assert_eq!(config.recognition.language, "eng");
        assert_eq!(config.recognition.page_segmentation_mode, PageSegmentationMode::SparseText);
        assert!((config.recognition.min_confidence - 50.0).abs() < 0.01);

        // Check schedule defaults
        assert_eq!(config.schedule.idle_delay(), Duration::from_millis(100));
        assert_eq!(config.schedule.cycle_delay(), Duration::from_millis(1000));
        assert_eq!(config.schedule.busy_retry(), Duration::from_millis(16));

        // Check overlay defaults
        assert_eq!(config.overlay.label_prefix, "Alphabet detected: ");
        assert!(config.output.snapshot_dir.is_none());
        assert!(!config.output.json);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [motion]
            sample_stride = 4

            [recognition]
            page_segmentation_mode = "single_char"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.motion.sample_stride, 4);
        assert_eq!(parsed.motion.pixel_threshold, 30);
        assert_eq!(parsed.recognition.page_segmentation_mode, PageSegmentationMode::SingleChar);
        assert_eq!(parsed.recognition.language, "eng");
        assert_eq!(parsed.schedule, ScheduleConfig::default());
    }

    #[test]
    fn test_config_with_custom_values() {
        let mut config = AppConfig::default();
        config.source.frames_dir = Some(PathBuf::from("/tmp/frames"));
        config.schedule.cycle_delay_ms = 250;
        config.output.snapshot_dir = Some(PathBuf::from("/tmp/out"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.source.frames_dir, Some(PathBuf::from("/tmp/frames")));
        assert_eq!(parsed.schedule.cycle_delay(), Duration::from_millis(250));
        assert_eq!(parsed.output.snapshot_dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_engine_and_filter_config() {
        let mut settings = RecognitionSettings::default();
        settings.character_whitelist = "XYZ".to_string();
        settings.min_confidence = 70.0;

        let engine = settings.engine_config();
        assert_eq!(engine.character_whitelist, "XYZ");
        assert_eq!(engine.page_segmentation_mode, PageSegmentationMode::SparseText);
        assert!((settings.filter_config().min_confidence - 70.0).abs() < 0.01);
    }

    #[test]
    fn test_save_and_load_config() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
