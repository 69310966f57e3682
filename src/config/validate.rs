// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, StackrunError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::StackrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_runner(cfg)?;
    validate_progress(cfg)?;
    validate_cdk(cfg)?;
    Ok(())
}

fn validate_runner(cfg: &RawConfigFile) -> Result<()> {
    if cfg.runner.program.trim().is_empty() {
        return Err(StackrunError::ConfigError(
            "[runner].program must not be empty".to_string(),
        ));
    }

    if cfg.runner.tool_alias.trim().is_empty() {
        return Err(StackrunError::ConfigError(
            "[runner].tool_alias must not be empty".to_string(),
        ));
    }

    if cfg.runner.event_buffer == 0 {
        return Err(StackrunError::ConfigError(
            "[runner].event_buffer must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_progress(cfg: &RawConfigFile) -> Result<()> {
    if cfg.progress.poll_interval_ms == 0 {
        return Err(StackrunError::ConfigError(
            "[progress].poll_interval_ms must be > 0 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_cdk(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cdk.output_dir_prefix.contains(['/', '\\']) {
        return Err(StackrunError::ConfigError(format!(
            "[cdk].output_dir_prefix must be a plain name, got '{}'",
            cfg.cdk.output_dir_prefix
        )));
    }
    Ok(())
}
