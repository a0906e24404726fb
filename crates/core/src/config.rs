//! Controller configuration
//!
//! Settings can be built programmatically, read from environment variables, or
//! loaded from a JSON file. Anything left unset keeps its default.

use crate::error::ConfigError;
use marginalia_storage::{
    default_store_with, AnnotationSerializer, AnnotationStore, FileBackend, JsonSerializer,
    KeyValueStore, CURRENT_FORMAT_VERSION,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Quiet period before a change is written; stores may override it.
    pub debounce: Duration,
    /// Directory for file-backed stores; platform data directory when `None`.
    pub storage_dir: Option<PathBuf>,
    /// Envelope version written by the JSON serializer.
    pub serializer_version: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            storage_dir: None,
            serializer_version: CURRENT_FORMAT_VERSION,
        }
    }
}

/// On-disk layout of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    debounce_ms: Option<u64>,
    storage_dir: Option<PathBuf>,
    serializer_version: Option<u32>,
}

impl ControllerConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_storage_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.storage_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// - `MARGINALIA_DEBOUNCE_MS`: write debounce in milliseconds (default: 150)
    /// - `MARGINALIA_STORAGE_DIR`: directory for stored annotations
    /// - `MARGINALIA_SERIALIZER_VERSION`: envelope version to write (default: 1)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MARGINALIA_DEBOUNCE_MS") {
            let millis = parse_value::<u64>("MARGINALIA_DEBOUNCE_MS", &val)?;
            config.debounce = Duration::from_millis(millis);
        }

        if let Ok(val) = std::env::var("MARGINALIA_STORAGE_DIR") {
            if !val.is_empty() {
                config.storage_dir = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("MARGINALIA_SERIALIZER_VERSION") {
            let version = parse_value::<u32>("MARGINALIA_SERIALIZER_VERSION", &val)?;
            config.serializer_version = checked_version("MARGINALIA_SERIALIZER_VERSION", version)?;
        }

        Ok(config)
    }

    /// Loads configuration from a JSON file.
    ///
    /// ```json
    /// { "debounce_ms": 150, "storage_dir": "/path/to/annotations", "serializer_version": 1 }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(contents)?;
        let mut config = Self::default();

        if let Some(millis) = file.debounce_ms {
            config.debounce = Duration::from_millis(millis);
        }
        if let Some(dir) = file.storage_dir {
            config.storage_dir = Some(dir);
        }
        if let Some(version) = file.serializer_version {
            config.serializer_version = checked_version("serializer_version", version)?;
        }

        Ok(config)
    }

    /// File-backed store for `key` under this configuration.
    pub fn store_for(&self, key: &str) -> Arc<dyn AnnotationStore> {
        let serializer: Arc<dyn AnnotationSerializer> =
            Arc::new(JsonSerializer::new(self.serializer_version));
        match &self.storage_dir {
            Some(dir) => Arc::new(
                KeyValueStore::new(Arc::new(FileBackend::with_root(dir)), key)
                    .with_serializer(serializer),
            ),
            None => default_store_with(key, serializer),
        }
    }
}

/// Version 0 predates the envelope format and is never written.
fn checked_version(key: &str, version: u32) -> Result<u32, ConfigError> {
    if version == 0 {
        return Err(ConfigError::InvalidValue { key: key.to_owned() });
    }
    Ok(version)
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue { key: key.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("MARGINALIA_DEBOUNCE_MS");
        std::env::remove_var("MARGINALIA_STORAGE_DIR");
        std::env::remove_var("MARGINALIA_SERIALIZER_VERSION");
    }

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(150));
        assert_eq!(config.storage_dir, None);
        assert_eq!(config.serializer_version, 1);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        std::env::set_var("MARGINALIA_DEBOUNCE_MS", "40");
        std::env::set_var("MARGINALIA_STORAGE_DIR", "/tmp/marginalia-test");

        let config = ControllerConfig::from_env().expect("env config should parse");
        assert_eq!(config.debounce, Duration::from_millis(40));
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/marginalia-test")));
        assert_eq!(config.serializer_version, 1);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_value() {
        clear_env();
        std::env::set_var("MARGINALIA_DEBOUNCE_MS", "soon");

        let err = ControllerConfig::from_env().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key } if key == "MARGINALIA_DEBOUNCE_MS")
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_version() {
        clear_env();
        std::env::set_var("MARGINALIA_SERIALIZER_VERSION", "0");

        let err = ControllerConfig::from_env().unwrap_err();
        let expected = "MARGINALIA_SERIALIZER_VERSION";
        assert!(matches!(err, ConfigError::InvalidValue { ref key } if key == expected));

        clear_env();
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("marginalia.json");
        std::fs::write(&path, r#"{ "debounce_ms": 500, "serializer_version": 2 }"#)
            .expect("write config");

        let config = ControllerConfig::from_file(&path).expect("file config should parse");
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.serializer_version, 2);
        assert_eq!(config.storage_dir, None);
    }

    #[test]
    fn test_from_json_rejects_unknown_keys_and_zero_version() {
        assert!(matches!(
            ControllerConfig::from_json(r#"{ "debounce": 1 }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ControllerConfig::from_json(r#"{ "serializer_version": 0 }"#),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_for_uses_storage_dir() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let config = ControllerConfig::default().with_storage_dir(temp.path());

        let store = config.store_for("doc");
        store.save(&[]).await.expect("save should succeed");

        assert_eq!(store.has_data().await.expect("has_data"), Some(true));
        assert!(temp.path().join("doc.json").exists());
    }

    #[tokio::test]
    async fn test_store_for_writes_configured_version() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let config = ControllerConfig { serializer_version: 4, ..ControllerConfig::default() }
            .with_storage_dir(temp.path());

        config.store_for("doc").save(&[]).await.expect("save should succeed");

        let raw = std::fs::read_to_string(temp.path().join("doc.json")).expect("written file");
        let envelope: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(envelope["version"], 4);
    }
}
