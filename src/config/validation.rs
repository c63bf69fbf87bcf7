//! Configuration validation.

use anyhow::{bail, Result};

use super::Config;

/// Validate configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.log_path.to_string_lossy().contains('\0') {
        bail!("Invalid log_path: contains null character");
    }

    if config.savings_path.to_string_lossy().contains('\0') {
        bail!("Invalid savings_path: contains null character");
    }

    if !(0.0..=1.0).contains(&config.min_compression_ratio) {
        bail!(
            "min_compression_ratio must be between 0.0 and 1.0, got {}",
            config.min_compression_ratio
        );
    }

    if config.generic_truncate_threshold == 0 {
        bail!("generic_truncate_threshold must be greater than 0");
    }

    let kept = config
        .generic_keep_head
        .saturating_add(config.generic_keep_tail);
    if kept >= config.generic_truncate_threshold {
        bail!(
            "generic_keep_head + generic_keep_tail ({}) must be less than generic_truncate_threshold ({})",
            kept,
            config.generic_truncate_threshold
        );
    }

    Ok(())
}
