// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::consts::{DEFAULT_CHANNEL_CAPACITY, FALLBACK_THREAD_COUNT};
use crate::engine::ExecutionMode;
use crate::errors::{ConfigError, DataErrorPolicy};

/// Engine and environment settings. Every field has a default.
///
/// ```yaml
/// execution_mode: multi_threaded
/// thread_count: 8
/// channel_capacity: 128
/// data_error_policy: pass_through
/// properties:
///   job: nightly
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub execution_mode: ExecutionMode,
    /// Defaults to the available parallelism.
    pub thread_count: Option<usize>,
    pub channel_capacity: Option<usize>,
    /// Applied by builder-created map, flat map and source operators.
    pub data_error_policy: DataErrorPolicy,
    pub properties: BTreeMap<String, String>,
}

impl EngineConfig {
    pub fn thread_count(&self) -> usize {
        self.thread_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_THREAD_COUNT)
        })
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = Some(thread_count);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_count == Some(0) {
            return Err(ConfigError::Invalid("thread_count must be at least 1".into()));
        }
        if self.channel_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load a config from a YAML (`.yaml`, `.yml`) or TOML (`.toml`) file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match extension.as_deref() {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        Some("toml") => Ok(toml::from_str(&content)?),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load a config and reject values the engine cannot run with
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;
    cfg.validate()?;
    Ok(cfg)
}
