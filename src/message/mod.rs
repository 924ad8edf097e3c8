// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The unit of data flowing through a graph.
//!
//! A [`Message`] is owned by exactly one pipeline stage at a time. Stages receive
//! messages by value and hand them on by value; nothing in the engine keeps a
//! reference to a message after the call that received it returns.
//!
//! Operators exchange [`Record`]s, an ordered batch of messages. Most operators
//! emit single-message records; windows emit one record per window.

mod record;

pub use record::Record;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Discriminant of a message's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Binary,
    Structured,
    Embedding,
    MetadataOnly,
}

/// Message payload. The engine routes it opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
    Structured(serde_json::Value),
    Embedding(Vec<f32>),
    MetadataOnly,
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Text(_) => ContentKind::Text,
            Content::Binary(_) => ContentKind::Binary,
            Content::Structured(_) => ContentKind::Structured,
            Content::Embedding(_) => ContentKind::Embedding,
            Content::MetadataOnly => ContentKind::MetadataOnly,
        }
    }

    /// Size of the payload in its natural unit (bytes, chars of JSON text, vector length).
    pub fn len(&self) -> usize {
        match self {
            Content::Text(text) => text.len(),
            Content::Binary(bytes) => bytes.len(),
            Content::Structured(value) => value.to_string().len(),
            Content::Embedding(vector) => vector.len(),
            Content::MetadataOnly => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    uid: u64,
    content: Content,
    timestamp_ms: u64,
    metadata: HashMap<String, String>,
    processing_trace: Vec<String>,
    quality_score: Option<f32>,
    embedding: Option<Vec<f32>>,
}

impl Message {
    /// Create a message with an explicit uid. Prefer
    /// [`UidGenerator::message`](crate::metrics::UidGenerator::message) so uids stay unique.
    pub fn with_uid(uid: u64, content: Content) -> Self {
        Self {
            uid,
            content,
            timestamp_ms: now_millis(),
            metadata: HashMap::new(),
            processing_trace: Vec::new(),
            quality_score: None,
            embedding: None,
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn kind(&self) -> ContentKind {
        self.content.kind()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Content {
        &mut self.content
    }

    pub fn set_content(&mut self, content: Content) {
        self.content = content;
    }

    /// Text payload, if this is a text message.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content = Content::Text(text.into());
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_metadata(key, value);
        self
    }

    pub fn processing_trace(&self) -> &[String] {
        &self.processing_trace
    }

    /// Append-only.
    pub fn push_trace(&mut self, operator: &str) {
        self.processing_trace.push(operator.to_string());
    }

    pub fn quality_score(&self) -> Option<f32> {
        self.quality_score
    }

    /// Stores the score clamped to `[0.0, 1.0]`. NaN clears it.
    pub fn set_quality_score(&mut self, score: f32) {
        self.quality_score = if score.is_nan() {
            None
        } else {
            Some(score.clamp(0.0, 1.0))
        };
    }

    pub fn with_quality_score(mut self, score: f32) -> Self {
        self.set_quality_score(score);
        self
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn set_embedding(&mut self, embedding: Vec<f32>) {
        self.embedding = Some(embedding);
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
