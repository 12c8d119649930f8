//! Config file loading and target resolution.

use crate::config::{DEFAULT_TARGET_NAME, HarnessConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for config loading operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Failed to parse TOML.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    /// File extension is not one of the supported formats.
    #[error("unsupported config format: {0:?} (expected .yaml, .yml, or .toml)")]
    UnsupportedFormat(String),
    /// The running executable's path is unknown, so no default target exists.
    #[error("cannot locate the harness executable: {0}")]
    CurrentExe(std::io::Error),
}

/// Load a harness config from a YAML or TOML file.
///
/// A relative `target` is resolved against the file's directory.
pub fn load_config(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config: HarnessConfig = match ext {
        "yaml" | "yml" => serde_yaml::from_str(&contents)?,
        "toml" => toml::from_str(&contents)?,
        other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
    };

    if let Some(target) = &config.target
        && target.is_relative()
        && let Some(dir) = path.parent()
    {
        config.target = Some(dir.join(target));
    }
    Ok(config)
}

/// Where the target lives when nothing else says so: one directory above
/// the directory holding `exe`, under the fixed binary name.
pub fn default_target_path(exe: &Path) -> PathBuf {
    let exe_dir = exe.parent().unwrap_or(Path::new("."));
    let base = exe_dir.parent().unwrap_or(exe_dir);
    base.join(DEFAULT_TARGET_NAME)
}

/// Pick the target path: explicit flag, then config, then the default
/// location next to the running harness.
pub fn resolve_target(
    flag: Option<&Path>,
    config: &HarnessConfig,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &config.target {
        return Ok(path.clone());
    }
    let exe = std::env::current_exe().map_err(ConfigError::CurrentExe)?;
    Ok(default_target_path(&exe))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_yaml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shellprobe.yaml");
        std::fs::write(&path, "timeout: 9\nshutdown: exit\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.timeout, 9);
        assert_eq!(config.shutdown, "exit");
        assert_eq!(config.target, None);
    }

    #[test]
    fn load_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shellprobe.toml");
        std::fs::write(
            &path,
            r#"
prompt = "smash> "
args = ["--no-color"]
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.prompt, "smash> ");
        assert_eq!(config.args, vec!["--no-color".to_string()]);
    }

    #[test]
    fn relative_target_resolves_against_config_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shellprobe.yaml");
        std::fs::write(&path, "target: bin/smash\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.target, Some(dir.path().join("bin/smash")));
    }

    #[test]
    fn absolute_target_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shellprobe.yaml");
        std::fs::write(&path, "target: /opt/smash\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.target, Some(PathBuf::from("/opt/smash")));
    }

    #[test]
    fn load_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "invalid: [yaml: {").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "timeout = [toml").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unsupported_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.txt");
        std::fs::write(&path, "").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_config(Path::new("/nonexistent/shellprobe.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn default_target_is_one_directory_up() {
        assert_eq!(
            default_target_path(Path::new("/work/project/tests/shellprobe")),
            PathBuf::from("/work/project/smash")
        );
    }

    #[test]
    fn flag_beats_config() {
        let config = HarnessConfig {
            target: Some(PathBuf::from("/from/config")),
            ..HarnessConfig::default()
        };
        assert_eq!(
            resolve_target(Some(Path::new("/from/flag")), &config).unwrap(),
            PathBuf::from("/from/flag")
        );
        assert_eq!(
            resolve_target(None, &config).unwrap(),
            PathBuf::from("/from/config")
        );
    }
}
