//! Configuration data types.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::validation;

/// Prefix of environment variables overriding config keys.
pub const ENV_PREFIX: &str = "TOKEN_SAVER_";

/// Keys that can be overridden from the environment.
const ENV_KEYS: &[&str] = &[
    "debug",
    "log_path",
    "min_input_length",
    "min_compression_ratio",
    "generic_truncate_threshold",
    "generic_keep_head",
    "generic_keep_tail",
    "wrap_timeout",
    "track_savings",
    "savings_path",
];

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enable debug logging to file
    pub debug: bool,

    /// Path to log directory
    pub log_path: PathBuf,

    /// Outputs shorter than this many bytes are never compressed by `wrap`
    pub min_input_length: usize,

    /// Minimum fraction of bytes a compression must save to be used by `wrap`
    pub min_compression_ratio: f64,

    /// Line count above which the generic processor truncates
    pub generic_truncate_threshold: usize,

    /// Head lines kept by the generic processor
    pub generic_keep_head: usize,

    /// Tail lines kept by the generic processor
    pub generic_keep_tail: usize,

    /// Seconds `wrap` lets a command run before killing it (0 disables)
    pub wrap_timeout: u64,

    /// Record each compression applied by `wrap`
    pub track_savings: bool,

    /// JSON Lines file holding savings records
    pub savings_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            log_path: default_log_path(),
            min_input_length: 200,
            min_compression_ratio: 0.10,
            generic_truncate_threshold: 100,
            generic_keep_head: 40,
            generic_keep_tail: 40,
            wrap_timeout: 300,
            track_savings: true,
            savings_path: default_savings_path(),
        }
    }
}

impl Config {
    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Apply `TOKEN_SAVER_<KEY>` overrides found through `lookup`.
    ///
    /// Returns the `NAME=value` pairs that failed to parse; those keys keep
    /// their previous value.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ignored = Vec::new();

        for key in ENV_KEYS {
            let name = format!("{}{}", ENV_PREFIX, key.to_ascii_uppercase());
            let Some(value) = lookup(&name) else {
                continue;
            };

            let applied = match *key {
                "debug" => match parse_bool(&value) {
                    Some(debug) => {
                        self.debug = debug;
                        true
                    }
                    None => false,
                },
                "log_path" if !value.trim().is_empty() => {
                    self.log_path = expand_home(value.trim());
                    true
                }
                "min_input_length" => set_parsed(&mut self.min_input_length, &value),
                "min_compression_ratio" => set_parsed(&mut self.min_compression_ratio, &value),
                "generic_truncate_threshold" => {
                    set_parsed(&mut self.generic_truncate_threshold, &value)
                }
                "generic_keep_head" => set_parsed(&mut self.generic_keep_head, &value),
                "generic_keep_tail" => set_parsed(&mut self.generic_keep_tail, &value),
                "wrap_timeout" => set_parsed(&mut self.wrap_timeout, &value),
                "track_savings" => match parse_bool(&value) {
                    Some(track) => {
                        self.track_savings = track;
                        true
                    }
                    None => false,
                },
                "savings_path" if !value.trim().is_empty() => {
                    self.savings_path = expand_home(value.trim());
                    true
                }
                _ => false,
            };

            if !applied {
                ignored.push(format!("{}={}", name, value));
            }
        }

        ignored
    }
}

fn set_parsed<T: FromStr>(slot: &mut T, value: &str) -> bool {
    match value.trim().parse() {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => false,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Get default log path (relative to config directory).
/// This returns a placeholder; the actual path is set by ConfigService based on config file location.
pub fn default_log_path() -> PathBuf {
    default_log_path_for_config_dir(None)
}

/// Get log path based on config directory.
pub fn default_log_path_for_config_dir(config_dir: Option<&Path>) -> PathBuf {
    config_dir_or_default(config_dir).join("logs")
}

pub fn default_savings_path() -> PathBuf {
    default_savings_path_for_config_dir(None)
}

/// Savings file next to the config file.
pub fn default_savings_path_for_config_dir(config_dir: Option<&Path>) -> PathBuf {
    config_dir_or_default(config_dir).join("savings.jsonl")
}

fn config_dir_or_default(config_dir: Option<&Path>) -> PathBuf {
    config_dir.map(|d| d.to_path_buf()).unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("token-saver")
    })
}
