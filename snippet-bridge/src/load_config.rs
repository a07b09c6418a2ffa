/// `load_config` module: reads the optional YAML file that points the tool at
/// non-default service instances and tunes the guard timer.
///
/// The file never carries secrets. Unknown keys (including any attempt to put
/// a token in the file) are rejected; missing keys take their defaults, and an
/// empty file is the default configuration.
///
/// ```yaml
/// gitlab_api_base: https://git.example.com/api/v4
/// guard_timeout_secs: 60
/// snippet_file_limit: 10
/// request_timeout_secs: 20
/// ```
///
/// # Errors
/// Read and parse failures are `anyhow::Error`s naming the file, surfaced at
/// the CLI boundary.
use anyhow::Result;
use snippet_bridge_core::config::ServiceConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path_ref.display(),
                e
            ));
        }
    };

    if config_content.trim().is_empty() {
        info!(config_path = ?path_ref, "Config file is empty, using defaults");
        return Ok(ServiceConfig::default());
    }

    let config: ServiceConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!(
                "Failed to parse config YAML {}: {e}",
                path_ref.display()
            ));
        }
    };

    if config.snippet_file_limit == 0 {
        return Err(anyhow::anyhow!(
            "Invalid config {}: snippet_file_limit must be at least 1",
            path_ref.display()
        ));
    }

    Ok(config)
}

/// The file at `path` if given, the defaults otherwise.
pub fn resolve_config(path: Option<&Path>) -> Result<ServiceConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ServiceConfig::default()),
    }
}
