pub mod chat;
pub mod init;
pub mod knowledge;
pub mod serve;
pub mod status;

use std::path::{Path, PathBuf};
use stemchat_config::AppConfig;

/// The config file in use: `--config` when given, else the default location.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path)
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = config_file(path);
    AppConfig::load_with_env(&path)
        .map_err(|e| format!("Failed to load config: {e}").into())
}
