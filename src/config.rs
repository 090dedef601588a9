//! Loading simulation settings from files
//!
//! A settings file holds a partial [`SettingsUpdate`] in YAML (`.yaml`,
//! `.yml`) or JSON (`.json`), using the camelCase field names. Fields that
//! are left out keep their defaults.
//!
//! ```yaml
//! collideRadius: 8
//! linkDistance: 60
//! chargeStrength: -30
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult, InvalidSetting};
use crate::settings::{SettingsUpdate, SimulationSettings};

/// Format of a settings document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Yaml,
    Json,
}

impl SettingsFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read a settings file and merge it onto the defaults
pub fn load_settings(path: &Path) -> ConfigResult<SimulationSettings> {
    let format = SettingsFormat::from_path(path)?;
    let text = fs::read_to_string(path)?;
    let update = parse_update(&text, format)?;
    debug!(path = %path.display(), "loaded settings");
    Ok(SimulationSettings::from_update(&update))
}

/// Parse and validate a partial settings document
pub fn parse_update(text: &str, format: SettingsFormat) -> ConfigResult<SettingsUpdate> {
    let update: SettingsUpdate = match format {
        // An empty YAML document means "no overrides"
        SettingsFormat::Yaml if text.trim().is_empty() => SettingsUpdate::default(),
        SettingsFormat::Yaml => serde_yaml::from_str(text)?,
        SettingsFormat::Json => serde_json::from_str(text)?,
    };
    validate(&update)?;
    Ok(update)
}

/// Reject values the simulation cannot make progress with
pub fn validate(update: &SettingsUpdate) -> Result<(), InvalidSetting> {
    fn check(
        field: &'static str,
        value: Option<f64>,
        ok: impl Fn(f64) -> bool,
        reason: &str,
    ) -> Result<(), InvalidSetting> {
        match value {
            Some(v) if !v.is_finite() => Err(InvalidSetting {
                field,
                reason: "must be finite".to_string(),
            }),
            Some(v) if !ok(v) => Err(InvalidSetting {
                field,
                reason: reason.to_string(),
            }),
            _ => Ok(()),
        }
    }

    check("alpha", update.alpha, |v| v >= 0.0, "must not be negative")?;
    check("alphaMin", update.alpha_min, |v| v > 0.0, "must be positive")?;
    check(
        "alphaDecay",
        update.alpha_decay,
        |v| v > 0.0 && v <= 1.0,
        "must be in (0, 1]",
    )?;
    check("alphaTarget", update.alpha_target, |v| v >= 0.0, "must not be negative")?;
    check(
        "velocityDecay",
        update.velocity_decay,
        |v| (0.0..1.0).contains(&v),
        "must be in [0, 1)",
    )?;
    check("centeringForce", update.centering_force, |v| v >= 0.0, "must not be negative")?;
    check("collideRadius", update.collide_radius, |v| v >= 0.0, "must not be negative")?;
    check("collideForce", update.collide_force, |v| v >= 0.0, "must not be negative")?;
    check("linkDistance", update.link_distance, |v| v > 0.0, "must be positive")?;
    check("chargeStrength", update.charge_strength.flatten(), |_| true, "")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            SettingsFormat::from_path(Path::new("a.yaml")).unwrap(),
            SettingsFormat::Yaml
        );
        assert_eq!(
            SettingsFormat::from_path(Path::new("a.YML")).unwrap(),
            SettingsFormat::Yaml
        );
        assert_eq!(
            SettingsFormat::from_path(Path::new("a.json")).unwrap(),
            SettingsFormat::Json
        );
        assert!(matches!(
            SettingsFormat::from_path(Path::new("a.toml")),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "collideRadius: 8\nlinkDistance: 60\nchargeStrength: -30\n").unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.collide_radius, 8.0);
        assert_eq!(settings.link_distance, 60.0);
        assert_eq!(settings.charge_strength, Some(-30.0));
        assert_eq!(settings.velocity_decay, 0.6);
    }

    #[test]
    fn json_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"velocityDecay": 0.4}"#).unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.velocity_decay, 0.4);
    }

    #[test]
    fn empty_yaml_is_all_defaults() {
        let update = parse_update("  \n", SettingsFormat::Yaml).unwrap();
        assert_eq!(update, SettingsUpdate::default());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_settings(&PathBuf::from("does/not/exist.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_documents_are_parse_errors() {
        assert!(matches!(
            parse_update("collideRadius: [1, 2", SettingsFormat::Yaml),
            Err(ConfigError::Yaml(_))
        ));
        assert!(matches!(
            parse_update("{", SettingsFormat::Json),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = parse_update("velocityDecay: 1.0", SettingsFormat::Yaml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(InvalidSetting {
                field: "velocityDecay",
                ..
            })
        ));

        let err = parse_update(r#"{"linkDistance": 0}"#, SettingsFormat::Json).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(InvalidSetting {
                field: "linkDistance",
                ..
            })
        ));

        let err = parse_update("alphaMin: .nan", SettingsFormat::Yaml).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for `alphaMin`: must be finite");
    }
}
