//! Filesystem locations the service reads and writes.

use std::env;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.yml";
const SECRETS_FILE: &str = "secrets.yaml";
const LOG_DIR: &str = "logs";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_file: PathBuf,
    pub secrets_file: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Everything lives under `RAGLINE_DATA_DIR`, or the working directory
    /// when it is unset.
    pub fn from_env() -> Self {
        let data_dir = env::var_os("RAGLINE_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::under(&data_dir)
    }

    pub fn under(data_dir: &Path) -> Self {
        Self {
            config_file: data_dir.join(CONFIG_FILE),
            secrets_file: data_dir.join(SECRETS_FILE),
            log_dir: data_dir.join(LOG_DIR),
        }
    }
}
