//! Configuration service for loading and generating config files.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{
    default_log_path_for_config_dir, default_savings_path_for_config_dir, expand_home,
};
use super::Config;

/// Configuration service.
pub struct ConfigService;

impl ConfigService {
    /// Get the default configuration file path.
    /// Always uses ~/.config/token-saver/config.toml for cross-platform consistency.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("token-saver")
            .join("config.toml")
    }

    /// Load configuration from file, then apply environment overrides.
    ///
    /// If `path` is `None`, uses the default path. A missing file is created
    /// with the commented defaults. Log path defaults to the config file's
    /// directory.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// [`ConfigService::load`] with an explicit environment lookup.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if !path.exists() {
            Self::generate_at(&path)?;
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Unset log_path follows the config file's directory
        if config.log_path == default_log_path_for_config_dir(None) {
            config.log_path = default_log_path_for_config_dir(path.parent());
        } else {
            config.log_path = expand_home(&config.log_path.to_string_lossy());
        }
        if config.savings_path == default_savings_path_for_config_dir(None) {
            config.savings_path = default_savings_path_for_config_dir(path.parent());
        } else {
            config.savings_path = expand_home(&config.savings_path.to_string_lossy());
        }

        // Logging is not initialized yet, so report on stderr
        for ignored in config.apply_env_overrides(lookup) {
            eprintln!("token-saver: ignoring invalid environment override {}", ignored);
        }

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    /// Generate default configuration file at the default path.
    pub fn generate_default() -> Result<()> {
        Self::generate_at(&Self::default_path())
    }

    /// Generate default configuration file at the specified path.
    pub fn generate_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Default configuration content with comments.
    fn default_config_content() -> &'static str {
        r#"# token-saver configuration file

# Enable debug logging to file (default: false)
debug = false

# Path to log directory (default: same directory as config.toml/logs)
# If --config is specified, logs go to that directory/logs
# log_path = "~/.config/token-saver/logs"

# wrap: outputs shorter than this many bytes are printed untouched (default: 200)
min_input_length = 200

# wrap: minimum fraction of bytes a compression must save (default: 0.10)
min_compression_ratio = 0.10

# Generic fallback: outputs with more lines than this are truncated (default: 100)
generic_truncate_threshold = 100

# Generic fallback: lines kept from the start and the end (default: 40 each)
# generic_keep_head + generic_keep_tail must be less than the threshold
generic_keep_head = 40
generic_keep_tail = 40

# wrap: seconds a command may run before it is killed, 0 disables (default: 300)
wrap_timeout = 300

# Record compressions applied by wrap, shown by `token-saver stats` (default: true)
track_savings = true

# Savings records (default: same directory as config.toml/savings.jsonl)
# savings_path = "~/.config/token-saver/savings.jsonl"

# Every key can be overridden with an environment variable named
# TOKEN_SAVER_<KEY>, for example TOKEN_SAVER_MIN_INPUT_LENGTH=500
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("token-saver-config-{}-{}", name, std::process::id()))
            .join("config.toml")
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_is_generated() {
        let path = temp_config("generated");
        let _ = fs::remove_file(&path);

        let config = ConfigService::load_with_env(Some(path.as_path()), no_env).unwrap();

        assert!(path.exists());
        assert_eq!(config.min_input_length, 200);
        assert_eq!(config.log_path, path.parent().unwrap().join("logs"));
        assert_eq!(
            config.savings_path,
            path.parent().unwrap().join("savings.jsonl")
        );
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_default_content_parses_to_defaults() {
        let parsed: Config = toml::from_str(ConfigService::default_config_content()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.min_input_length, defaults.min_input_length);
        assert_eq!(
            parsed.generic_truncate_threshold,
            defaults.generic_truncate_threshold
        );
        assert_eq!(parsed.generic_keep_head, defaults.generic_keep_head);
        assert_eq!(parsed.generic_keep_tail, defaults.generic_keep_tail);
        assert_eq!(parsed.wrap_timeout, defaults.wrap_timeout);
        assert_eq!(parsed.track_savings, defaults.track_savings);
    }

    #[test]
    fn test_env_override_wins_over_file() {
        let path = temp_config("env");
        ConfigService::generate_at(&path).unwrap();

        let config = ConfigService::load_with_env(Some(path.as_path()), |name| {
            (name == "TOKEN_SAVER_MIN_INPUT_LENGTH").then(|| "1".to_string())
        })
        .unwrap();

        assert_eq!(config.min_input_length, 1);
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_invalid_file_rejected() {
        let path = temp_config("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "min_compression_ratio = 4.0\n").unwrap();

        let err = ConfigService::load_with_env(Some(path.as_path()), no_env).unwrap_err();
        assert!(format!("{:#}", err).contains("min_compression_ratio"));
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
