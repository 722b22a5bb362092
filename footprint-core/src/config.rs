/// Layout configuration.
///
/// All fields have defaults, so an empty JSON object is a valid config file.
use std::path::Path;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::slice::Plane;
use crate::transform::{DisplayScale, DEFAULT_SCALE};

/// ISO sheet sizes, always used in landscape orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    A0,
    A1,
    A2,
    #[default]
    A3,
    A4,
}

impl PageSize {
    /// Landscape (width, height) in millimeters
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            PageSize::A0 => (1189.0, 841.0),
            PageSize::A1 => (841.0, 594.0),
            PageSize::A2 => (594.0, 420.0),
            PageSize::A3 => (420.0, 297.0),
            PageSize::A4 => (297.0, 210.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page: PageSize,
    /// Display units per millimeter
    pub scale: f64,
    pub plane_origin: [f64; 3],
    pub plane_normal: [f64; 3],
    /// Base name offered for exports
    pub export_name: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page: PageSize::A3,
            scale: DEFAULT_SCALE,
            plane_origin: [0.0, 0.0, 0.0],
            plane_normal: [0.0, 0.0, 1.0],
            export_name: "layout".to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if Vector3::from(self.plane_normal).norm() < f64::EPSILON {
            return Err(ConfigError::Invalid(
                "plane_normal must be non-zero".to_string(),
            ));
        }
        if self.export_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "export_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn display_scale(&self) -> DisplayScale {
        DisplayScale::new(self.scale)
    }

    pub fn plane(&self) -> Plane {
        Plane::new(
            Point3::from(self.plane_origin),
            Vector3::from(self.plane_normal),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LayoutConfig::default();
        assert_eq!(config.page.dimensions_mm(), (420.0, 297.0));
        assert_eq!(config.scale, 5.0);
        assert_eq!(config.plane(), Plane::xy());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = LayoutConfig::from_json(r#"{ "page": "A4", "scale": 2.5 }"#).unwrap();
        assert_eq!(config.page, PageSize::A4);
        assert_eq!(config.scale, 2.5);
        assert_eq!(config.export_name, "layout");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            LayoutConfig::from_json(r#"{ "scale": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LayoutConfig::from_json(r#"{ "plane_normal": [0, 0, 0] }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LayoutConfig::from_json(r#"{ "page": "Letter" }"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
