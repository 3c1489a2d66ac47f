/*
 * Manages the tunable settings of the search core: debounce and coalescing
 * windows, the preview cap, the scan worker count, and the supported
 * document extensions. This module defines how those settings are persisted
 * and retrieved, abstracting the underlying storage (a JSON file in a
 * standard user directory).
 *
 * It uses a trait-based approach (`ConfigManagerOperations`) to allow for
 * different storage backends or mock implementations for testing. The
 * concrete implementation (`CoreConfigManager`) handles file system
 * interactions via the shared path utility for the base configuration
 * directory. The UI layer's own settings (theme, window geometry, persisted
 * scope choice) are not this module's concern.
 */
use crate::core::path_utils;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;

const TUNING_FILENAME: &str = "search_tuning.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    NoConfigDirectory,
    Malformed(serde_json::Error),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Malformed(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::NoConfigDirectory => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::Malformed(e) => write!(f, "Configuration file malformed: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/*
 * The tunable parameters of the search core. Defaults follow the design
 * recommendations: a 200 ms input debounce, a 200 ms change-coalescing
 * window, three preview lines per document, and a bounded four-worker scan
 * pool.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTuning {
    pub debounce_ms: u64,
    pub coalesce_ms: u64,
    pub preview_lines_per_document: usize,
    pub scan_workers: usize,
    pub supported_extensions: Vec<String>,
}

impl Default for SearchTuning {
    fn default() -> Self {
        SearchTuning {
            debounce_ms: 200,
            coalesce_ms: 200,
            preview_lines_per_document: 3,
            scan_workers: 4,
            supported_extensions: vec![
                "md".to_string(),
                "markdown".to_string(),
                "mdown".to_string(),
                "txt".to_string(),
                "text".to_string(),
            ],
        }
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_tuning(&self, app_name: &str) -> Result<SearchTuning>;
    fn save_tuning(&self, app_name: &str, tuning: &SearchTuning) -> Result<()>;
}

pub struct CoreConfigManager {}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {}
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn tuning_file_path(app_name: &str) -> Result<PathBuf> {
    let config_dir = path_utils::get_base_app_config_local_dir(app_name)
        .ok_or(ConfigError::NoConfigDirectory)?;
    Ok(config_dir.join(TUNING_FILENAME))
}

impl ConfigManagerOperations for CoreConfigManager {
    /*
     * Loads the search tuning for a given application. A missing file is not
     * an error: first launches fall back to `SearchTuning::default()`.
     */
    fn load_tuning(&self, app_name: &str) -> Result<SearchTuning> {
        log::trace!("CoreConfigManager: Loading search tuning for app '{app_name}'");
        let file_path = tuning_file_path(app_name)?;

        if !file_path.exists() {
            log::debug!("CoreConfigManager: Tuning file {file_path:?} does not exist; defaults.");
            return Ok(SearchTuning::default());
        }

        let contents = fs::read_to_string(&file_path)?;
        let tuning: SearchTuning = serde_json::from_str(&contents)?;
        log::debug!("CoreConfigManager: Loaded search tuning from {file_path:?}.");
        Ok(tuning)
    }

    fn save_tuning(&self, app_name: &str, tuning: &SearchTuning) -> Result<()> {
        log::trace!("CoreConfigManager: Saving search tuning for app '{app_name}'");
        let file_path = tuning_file_path(app_name)?;
        let serialized = serde_json::to_string_pretty(tuning)?;
        fs::write(&file_path, serialized)?;
        log::debug!("CoreConfigManager: Saved search tuning to {file_path:?}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    // Test helper that stores the tuning file in a caller-chosen directory
    // instead of the real platform config dir.
    struct TestConfigManager {
        mock_config_dir: PathBuf,
    }

    impl TestConfigManager {
        fn new(mock_config_dir: PathBuf) -> Self {
            if !mock_config_dir.exists() {
                fs::create_dir_all(&mock_config_dir)
                    .expect("Failed to create mock config dir for test");
            }
            TestConfigManager { mock_config_dir }
        }

        fn file_path(&self) -> PathBuf {
            self.mock_config_dir.join(TUNING_FILENAME)
        }
    }

    impl ConfigManagerOperations for TestConfigManager {
        fn load_tuning(&self, _app_name: &str) -> Result<SearchTuning> {
            let file_path = self.file_path();
            if !file_path.exists() {
                return Ok(SearchTuning::default());
            }
            let contents = fs::read_to_string(file_path)?;
            Ok(serde_json::from_str(&contents)?)
        }

        fn save_tuning(&self, _app_name: &str, tuning: &SearchTuning) -> Result<()> {
            fs::write(self.file_path(), serde_json::to_string_pretty(tuning)?)?;
            Ok(())
        }
    }

    #[test]
    fn test_default_tuning_values() {
        let tuning = SearchTuning::default();
        assert_eq!(tuning.debounce_ms, 200);
        assert_eq!(tuning.coalesce_ms, 200);
        assert_eq!(tuning.preview_lines_per_document, 3);
        assert_eq!(tuning.scan_workers, 4);
        assert!(tuning.supported_extensions.contains(&"md".to_string()));
        assert!(tuning.supported_extensions.contains(&"txt".to_string()));
    }

    #[test]
    fn test_save_and_load_round_trips_tuning() {
        let dir = tempdir().unwrap();
        let manager = TestConfigManager::new(dir.path().to_path_buf());
        let tuning = SearchTuning {
            debounce_ms: 150,
            coalesce_ms: 300,
            preview_lines_per_document: 5,
            scan_workers: 2,
            supported_extensions: vec!["md".to_string()],
        };

        manager.save_tuning("AnyApp", &tuning).unwrap();
        let loaded = manager.load_tuning("AnyApp").unwrap();
        assert_eq!(loaded, tuning);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let manager = TestConfigManager::new(dir.path().to_path_buf());

        let loaded = manager.load_tuning("AnyApp").unwrap();
        assert_eq!(loaded, SearchTuning::default());
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let manager = TestConfigManager::new(dir.path().to_path_buf());
        fs::write(dir.path().join(TUNING_FILENAME), "{ not json").unwrap();

        match manager.load_tuning("AnyApp") {
            Err(ConfigError::Malformed(_)) => {}
            other => panic!("Expected Malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_core_config_manager_save_and_load() {
        let unique_app_name = format!("TestApp_MarkScout_Config_{}", rand::random::<u64>());
        let manager = CoreConfigManager::new();
        let tuning = SearchTuning {
            debounce_ms: 250,
            ..SearchTuning::default()
        };

        manager.save_tuning(&unique_app_name, &tuning).unwrap();
        let loaded = manager.load_tuning(&unique_app_name).unwrap();
        assert_eq!(loaded, tuning);

        // Cleanup the test app's config directory.
        if let Some(config_dir) = path_utils::get_base_app_config_local_dir(&unique_app_name) {
            let _ = fs::remove_dir_all(&config_dir);
        }
    }
}
