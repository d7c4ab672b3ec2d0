//! Persistent picking settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::bvh::{BuildOptions, DEFAULT_EPSILON, DEFAULT_LEAF_THRESHOLD};
use crate::util::{Error, Result};

/// Settings that persist between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // BVH
    pub leaf_threshold: usize,

    // Triangle test tolerance
    pub epsilon: f32,

    // Build mesh trees on the rayon pool
    pub parallel_build: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            leaf_threshold: DEFAULT_LEAF_THRESHOLD,
            epsilon: DEFAULT_EPSILON,
            parallel_build: true,
        }
    }
}

impl Settings {
    /// Get settings file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("meshpick");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the user config dir, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(path = %path.display(), "Ignoring settings: {err}");
                Self::default()
            }
        }
    }

    /// Load settings from `path`; out-of-range values are reset
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&text)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Save settings to the user config dir
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| Error::other("no config directory"))?;
        self.save_to(path)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check values without touching them
    pub fn validate(&self) -> Result<()> {
        if self.leaf_threshold == 0 {
            return Err(Error::InvalidSettings("leaf_threshold must be at least 1".into()));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(Error::InvalidSettings(format!("epsilon {} is not a finite non-negative number", self.epsilon)));
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        if self.leaf_threshold == 0 {
            tracing::warn!("leaf_threshold 0 in settings, using {DEFAULT_LEAF_THRESHOLD}");
            self.leaf_threshold = DEFAULT_LEAF_THRESHOLD;
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            tracing::warn!("epsilon {} in settings, using {DEFAULT_EPSILON}", self.epsilon);
            self.epsilon = DEFAULT_EPSILON;
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            leaf_threshold: self.leaf_threshold,
            epsilon: self.epsilon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            leaf_threshold: 4,
            epsilon: 1e-5,
            parallel_build: false,
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "leaf_threshold": 16 }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.leaf_threshold, 16);
        assert_eq!(settings.epsilon, DEFAULT_EPSILON);
        assert!(settings.parallel_build);
    }

    #[test]
    fn test_invalid_values_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "leaf_threshold": 0, "epsilon": -1.0 }"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.leaf_threshold, DEFAULT_LEAF_THRESHOLD);
        assert_eq!(settings.epsilon, DEFAULT_EPSILON);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(Settings::load_from(&missing), Err(Error::FileNotFound(_))));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(Settings::load_from(&broken), Err(Error::Json(_))));
    }

    #[test]
    fn test_validate() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());
        settings.leaf_threshold = 0;
        assert!(matches!(settings.validate(), Err(Error::InvalidSettings(_))));
    }

    #[test]
    fn test_build_options() {
        let settings = Settings {
            leaf_threshold: 3,
            ..Default::default()
        };
        let options = settings.build_options();
        assert_eq!(options.leaf_threshold, 3);
        assert_eq!(options.epsilon, DEFAULT_EPSILON);
    }
}
