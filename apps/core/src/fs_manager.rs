use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Default on-disk locations for intent definitions and model artifacts.
pub struct PortablePathManager;

impl PortablePathManager {
    /// Application root: `apps/core` during development, the executable's
    /// directory in release builds.
    pub fn root_dir() -> PathBuf {
        let exe_dir = match std::env::current_exe() {
            Ok(mut path) => {
                path.pop();
                path
            }
            Err(e) => {
                warn!("Failed to get current exe path: {}. Falling back to current_dir.", e);
                return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            }
        };

        if cfg!(debug_assertions) {
            // target/debug/<exe> -> workspace root
            if let Some(workspace) = exe_dir.parent().and_then(|p| p.parent()) {
                let core_path = workspace.join("apps").join("core");
                if core_path.exists() {
                    return core_path;
                }
            }
        }
        exe_dir
    }

    /// Main data directory (./data).
    pub fn data_dir() -> PathBuf {
        Self::root_dir().join("data")
    }

    /// Intent definitions and other configuration (./data/config).
    pub fn config_dir() -> PathBuf {
        Self::data_dir().join("config")
    }

    /// Default intent definition source.
    pub fn intents_file() -> PathBuf {
        Self::config_dir().join("intent_mapping.json")
    }

    /// Model artifacts (./data/models).
    pub fn models_dir() -> PathBuf {
        Self::data_dir().join("models")
    }

    /// Creates the data, config and models directories if missing.
    pub fn init() -> Result<(), std::io::Error> {
        for dir in [Self::data_dir(), Self::config_dir(), Self::models_dir()] {
            if !dir.exists() {
                info!("Creating directory: {:?}", dir);
                fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}
