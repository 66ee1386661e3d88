//! Player settings: JSON file defaults, overridden by command-line flags.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use yuvview_core::deinterlace::{DEFAULT_BLOCK_SIZE, DEFAULT_THRESHOLD};
use yuvview_core::{DeinterlaceMode, SequencerConfig};

pub const DEFAULT_FPS: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Source frame rate; deinterlaced playback shows twice as many pictures
    pub fps: f64,
    pub deinterlace: DeinterlaceMode,
    pub threshold: u64,
    pub block_size: usize,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            deinterlace: DeinterlaceMode::Progressive,
            threshold: DEFAULT_THRESHOLD,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl PlayerSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        let settings: PlayerSettings = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            anyhow::bail!("fps must be a positive number, got {}", self.fps);
        }
        Ok(())
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            mode: self.deinterlace,
            threshold: self.threshold,
            block_size: self.block_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_command_line_defaults() {
        let settings = PlayerSettings::default();
        assert_eq!(settings.fps, 25.0);
        assert_eq!(settings.sequencer_config(), SequencerConfig::default());
    }

    #[test]
    fn loads_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yuvview.json");
        fs::write(&path, r#"{ "deinterlace": "adaptive", "threshold": 1200 }"#).unwrap();

        let settings = PlayerSettings::load(&path).unwrap();
        assert_eq!(settings.deinterlace, DeinterlaceMode::Adaptive);
        assert_eq!(settings.threshold, 1200);
        assert_eq!(settings.block_size, 16);
        assert_eq!(settings.fps, 25.0);
    }

    #[test]
    fn rejects_bad_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "deinterlace": "yadif" }"#).unwrap();
        assert!(PlayerSettings::load(&path).is_err());

        fs::write(&path, r#"{ "fps": 0 }"#).unwrap();
        assert!(PlayerSettings::load(&path).is_err());

        assert!(PlayerSettings::load(dir.path().join("missing.json")).is_err());
    }
}
