//! Configuration file resolution
//!
//! Order: an explicit `--config` path, then `<config dir>/lapstat/config.json`
//! when it exists, then the built-in defaults. A file that exists but does
//! not parse is an error, never silently replaced by defaults.

use anyhow::{Context, Result};
use lapstat_core::config::AnalysisConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.json";

/// `<config dir>/lapstat/config.json`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("lapstat").join(CONFIG_FILE_NAME))
}

/// Read and parse one config file
pub fn load_from_file(path: &Path) -> Result<AnalysisConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config file {}", path.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("Could not parse config file {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Resolve the configuration for this run
pub fn load(explicit: Option<&Path>) -> Result<AnalysisConfig> {
    if let Some(path) = explicit {
        return load_from_file(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => load_from_file(&path),
        _ => {
            debug!("No config file found, using built-in defaults");
            Ok(AnalysisConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapstat_core::config::IncidentRule;
    use std::io::Write;

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "companion_dir": "dumps",
                "incident_rule": {{ "mode": "codes", "codes": [1, 1025] }}
            }}"#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.companion_dir, "dumps");
        assert_eq!(config.incident_rule, IncidentRule::contact());
        assert!(config.tracks.track("misano").is_some());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Could not parse config file"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.json"))).is_err());
    }
}
