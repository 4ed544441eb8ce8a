//! Where the driver keeps its local state.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Preview cache file name inside the data directory.
const PREVIEW_CACHE_FILE: &str = "preview_cache.json";

/// Resolved locations of local state.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub preview_cache_path: PathBuf,
}

impl DataPaths {
    /// Resolve paths, creating the data directory when missing.
    ///
    /// An explicit cache path wins over `data_dir`, which wins over the platform default.
    pub fn resolve(
        data_dir: Option<PathBuf>,
        preview_cache_path: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => Self::default_data_dir(),
        };
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)?;
            info!("Created data directory: {}", data_dir.display());
        }

        let preview_cache_path = match preview_cache_path {
            Some(path) => {
                Self::log_path_override(&path, &data_dir);
                path
            }
            None => data_dir.join(PREVIEW_CACHE_FILE),
        };

        Ok(Self {
            data_dir,
            preview_cache_path,
        })
    }

    fn default_data_dir() -> PathBuf {
        if Path::new("/.dockerenv").exists() {
            info!("Docker environment detected, using ./data/ for storage");
            return PathBuf::from("./data");
        }

        match ProjectDirs::from("", "", "navgraph") {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => {
                warn!("Could not determine user data directory, falling back to ./data/");
                PathBuf::from("./data")
            }
        }
    }

    fn log_path_override(path: &Path, data_dir: &Path) {
        let default = data_dir.join(PREVIEW_CACHE_FILE);
        if path != default {
            info!(
                "Using custom preview cache path: {} (overriding default: {})",
                path.display(),
                default.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_lives_in_data_dir_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("state");

        let paths = DataPaths::resolve(Some(data_dir.clone()), None).unwrap();
        assert!(data_dir.exists());
        assert_eq!(paths.preview_cache_path, data_dir.join("preview_cache.json"));
    }

    #[test]
    fn test_explicit_cache_path_wins() {
        let temp_dir = TempDir::new().unwrap();
        let cache = temp_dir.path().join("elsewhere.json");

        let paths =
            DataPaths::resolve(Some(temp_dir.path().to_path_buf()), Some(cache.clone())).unwrap();
        assert_eq!(paths.preview_cache_path, cache);
    }
}
