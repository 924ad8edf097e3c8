// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed operator configuration.
//!
//! Values are carried as the user wrote them and validated when the operator is built,
//! so a bad value surfaces as `InvalidConfiguration` from construction rather than as
//! a deserialization error.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// Configuration for one typed operator, tagged by `type`.
///
/// ```yaml
/// type: window
/// size: 5s
/// slide: 1s
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperatorConfig {
    Source(SourceConfig),
    KeyBy(KeyByConfig),
    Window(WindowConfig),
    Aggregate(AggregateConfig),
    TopK(TopKConfig),
}

/// A fixed list of text messages.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeyByConfig {
    /// `hash` or `round_robin`.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    /// Metadata field holding the key, when no selector closure is supplied.
    #[serde(default)]
    pub field: Option<String>,
}

impl Default for KeyByConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            partitions: default_partitions(),
            field: None,
        }
    }
}

fn default_strategy() -> String {
    "hash".to_string()
}

fn default_partitions() -> usize {
    1
}

/// A plain integer is a count window; `ms`, `s` or `m` suffixes make an event-time window.
/// `slide` defaults to `size` (tumbling).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindowConfig {
    pub size: String,
    #[serde(default)]
    pub slide: Option<String>,
}

impl WindowConfig {
    pub fn tumbling(size: impl Into<String>) -> Self {
        Self {
            size: size.into(),
            slide: None,
        }
    }

    pub fn sliding(size: impl Into<String>, slide: impl Into<String>) -> Self {
        Self {
            size: size.into(),
            slide: Some(slide.into()),
        }
    }
}

/// Field name to one or more operations (`count`, `sum`, `avg`, `min`, `max`).
///
/// ```yaml
/// operations:
///   content_length: sum
///   latency: [avg, max]
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AggregateConfig {
    #[serde(deserialize_with = "one_or_many")]
    pub operations: BTreeMap<String, Vec<String>>,
    /// Group by the `key` metadata written by key by.
    #[serde(default)]
    pub group_by_key: bool,
}

impl AggregateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        let operations = self.operations.entry(field.into()).or_default();
        if !operations.contains(&operation) {
            operations.push(operation);
        }
        self
    }

    pub fn grouped(mut self) -> Self {
        self.group_by_key = true;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(field, ops)| match ops {
            OneOrMany::One(op) => (field, vec![op]),
            OneOrMany::Many(ops) => (field, ops),
        })
        .collect())
}

/// Keeps the `k` highest scores per record. Without `field` the quality score is used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopKConfig {
    pub k: usize,
    #[serde(default)]
    pub field: Option<String>,
}
