// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Count and event-time windows.
//!
//! Event-time windows start at multiples of the slide and cover `[start, start + size)`
//! on `timestamp_ms`. A window fires once a message at or past its end arrives; messages
//! older than the earliest open window are dropped as late. With `slide < size` a
//! message belongs to several windows and is cloned into each.

use crate::errors::OperatorError;
use crate::message::{Message, Record};
use crate::observability::messages::operator::LateMessageDropped;
use crate::observability::messages::StructuredLog;
use crate::operator::{OperatorKind, WindowConfig};
use crate::traits::{Emitter, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extent {
    Count(u64),
    Millis(u64),
}

fn parse_extent(value: &str) -> Result<Extent, String> {
    let value = value.trim();
    let (digits, scale) = if let Some(ms) = value.strip_suffix("ms") {
        (ms, Some(1))
    } else if let Some(secs) = value.strip_suffix('s') {
        (secs, Some(1_000))
    } else if let Some(mins) = value.strip_suffix('m') {
        (mins, Some(60_000))
    } else {
        (value, None)
    };

    let amount: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid window extent '{value}'"))?;
    if amount == 0 {
        return Err(format!("window extent '{value}' must be positive"));
    }
    Ok(match scale {
        Some(scale) => Extent::Millis(amount.saturating_mul(scale)),
        None => Extent::Count(amount),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowSpec {
    Count { size: usize, slide: usize },
    Time { size_ms: u64, slide_ms: u64 },
}

impl WindowSpec {
    fn parse(config: &WindowConfig) -> Result<Self, String> {
        let size = parse_extent(&config.size)?;
        let slide = match &config.slide {
            Some(slide) => parse_extent(slide)?,
            None => size,
        };
        match (size, slide) {
            (Extent::Count(size), Extent::Count(slide)) if slide <= size => Ok(WindowSpec::Count {
                size: size as usize,
                slide: slide as usize,
            }),
            (Extent::Millis(size_ms), Extent::Millis(slide_ms)) if slide_ms <= size_ms => {
                Ok(WindowSpec::Time { size_ms, slide_ms })
            }
            (Extent::Count(_), Extent::Count(_)) | (Extent::Millis(_), Extent::Millis(_)) => {
                Err("slide must not exceed size".to_string())
            }
            _ => Err("size and slide must both be counts or both be durations".to_string()),
        }
    }
}

/// Groups messages into windows and emits each complete window as one record.
/// Partial windows are flushed on close.
pub struct WindowOperator {
    name: String,
    spec: WindowSpec,
    buffer: Vec<Message>,
    /// Start of the earliest open event-time window.
    window_start: Option<u64>,
}

impl WindowOperator {
    pub fn new(name: impl Into<String>, config: &WindowConfig) -> Result<Self, OperatorError> {
        let name = name.into();
        let spec = WindowSpec::parse(config)
            .map_err(|reason| OperatorError::invalid_config(&name, reason))?;
        Ok(Self {
            name,
            spec,
            buffer: Vec::new(),
            window_start: None,
        })
    }

    fn push_counted(&mut self, message: Message, size: usize, slide: usize, out: &mut Emitter) {
        self.buffer.push(message);
        if self.buffer.len() < size {
            return;
        }
        if slide == size {
            out.emit(Record::new(std::mem::take(&mut self.buffer)));
        } else {
            out.emit(Record::new(self.buffer.clone()));
            self.buffer.drain(..slide);
        }
    }

    fn push_timed(&mut self, message: Message, size_ms: u64, slide_ms: u64, out: &mut Emitter) {
        let timestamp = message.timestamp_ms();
        let start = *self
            .window_start
            .get_or_insert_with(|| first_window_containing(timestamp, size_ms, slide_ms));

        if timestamp < start {
            LateMessageDropped {
                operator: &self.name,
                uid: message.uid(),
                timestamp_ms: timestamp,
                window_start_ms: start,
            }
            .log();
            return;
        }
        self.buffer.push(message);

        let watermark = self
            .buffer
            .iter()
            .map(Message::timestamp_ms)
            .max()
            .unwrap_or(timestamp);

        while let Some(start) = self.window_start {
            let end = start.saturating_add(size_ms);
            if watermark < end {
                break;
            }
            self.fire(start, end, start.saturating_add(slide_ms), out);
            self.advance(start.saturating_add(slide_ms), size_ms, slide_ms);
        }
    }

    /// Emits the window `[start, end)`, keeping messages that also belong to later windows.
    fn fire(&mut self, start: u64, end: u64, next_start: u64, out: &mut Emitter) {
        let mut window = Vec::new();
        let mut keep = Vec::new();
        for message in std::mem::take(&mut self.buffer) {
            let timestamp = message.timestamp_ms();
            if timestamp >= end {
                keep.push(message);
            } else if timestamp >= next_start {
                window.push(message.clone());
                keep.push(message);
            } else if timestamp >= start {
                window.push(message);
            }
        }
        self.buffer = keep;
        out.emit(Record::new(window));
    }

    /// Moves to the next window start, skipping windows no buffered message falls into.
    fn advance(&mut self, next_start: u64, size_ms: u64, slide_ms: u64) {
        self.window_start = self
            .buffer
            .iter()
            .map(Message::timestamp_ms)
            .min()
            .map(|earliest| next_start.max(first_window_containing(earliest, size_ms, slide_ms)));
    }
}

/// Earliest window start (a multiple of `slide_ms`) whose window contains `timestamp`.
fn first_window_containing(timestamp: u64, size_ms: u64, slide_ms: u64) -> u64 {
    if timestamp < size_ms {
        0
    } else {
        ((timestamp - size_ms) / slide_ms + 1) * slide_ms
    }
}

impl Operator for WindowOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Window
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        let before = out.len();
        for message in input {
            match self.spec {
                WindowSpec::Count { size, slide } => self.push_counted(message, size, slide, out),
                WindowSpec::Time { size_ms, slide_ms } => {
                    self.push_timed(message, size_ms, slide_ms, out)
                }
            }
        }
        Ok(out.len() > before)
    }

    fn close(&mut self, out: &mut Emitter) -> Result<(), OperatorError> {
        self.window_start = None;
        out.emit(Record::new(std::mem::take(&mut self.buffer)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::UidGenerator;

    fn sizes(records: &[Record]) -> Vec<usize> {
        records.iter().map(Record::len).collect()
    }

    fn timestamps(record: &Record) -> Vec<u64> {
        record.messages().iter().map(Message::timestamp_ms).collect()
    }

    #[test]
    fn test_tumbling_count_window() {
        let uids = UidGenerator::new();
        let mut window = WindowOperator::new("w", &WindowConfig::tumbling("2")).unwrap();
        let mut out = Emitter::new();
        for text in ["a", "b", "c", "d", "e"] {
            window.process(Record::single(uids.text(text)), &mut out).unwrap();
        }
        window.close(&mut out).unwrap();
        assert_eq!(sizes(&out.into_records()), [2, 2, 1]);
    }

    #[test]
    fn test_sliding_count_window_overlaps() {
        let uids = UidGenerator::new();
        let mut window = WindowOperator::new("w", &WindowConfig::sliding("3", "1")).unwrap();
        let mut out = Emitter::new();
        for text in ["a", "b", "c", "d"] {
            window.process(Record::single(uids.text(text)), &mut out).unwrap();
        }
        let records = out.into_records();
        assert_eq!(sizes(&records), [3, 3]);
        let second: Vec<_> = records[1].messages().iter().map(|m| m.text().unwrap()).collect();
        assert_eq!(second, ["b", "c", "d"]);
    }

    #[test]
    fn test_tumbling_event_time_window() {
        let uids = UidGenerator::new();
        let mut window = WindowOperator::new("w", &WindowConfig::tumbling("100ms")).unwrap();
        let mut out = Emitter::new();
        for ts in [10, 50, 120, 250, 260] {
            let message = uids.text("x").with_timestamp(ts);
            window.process(Record::single(message), &mut out).unwrap();
        }
        window.close(&mut out).unwrap();

        let records = out.into_records();
        assert_eq!(timestamps(&records[0]), [10, 50]);
        assert_eq!(timestamps(&records[1]), [120]);
        assert_eq!(timestamps(&records[2]), [250, 260]);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_sliding_event_time_window_clones_into_each_window() {
        let uids = UidGenerator::new();
        let mut window = WindowOperator::new("w", &WindowConfig::sliding("1s", "500ms")).unwrap();
        let mut out = Emitter::new();
        for ts in [100, 700, 1200, 2100] {
            let message = uids.text("x").with_timestamp(ts);
            window.process(Record::single(message), &mut out).unwrap();
        }

        let records = out.into_records();
        // [0, 1000), [500, 1500), [1000, 2000)
        assert_eq!(timestamps(&records[0]), [100, 700]);
        assert_eq!(timestamps(&records[1]), [700, 1200]);
        assert_eq!(timestamps(&records[2]), [1200]);
    }

    #[test]
    fn test_late_message_dropped() {
        let uids = UidGenerator::new();
        let mut window = WindowOperator::new("w", &WindowConfig::tumbling("100ms")).unwrap();
        let mut out = Emitter::new();
        for ts in [150, 210, 90] {
            let message = uids.text("x").with_timestamp(ts);
            window.process(Record::single(message), &mut out).unwrap();
        }
        window.close(&mut out).unwrap();
        let records = out.into_records();
        assert_eq!(timestamps(&records[0]), [150]);
        assert_eq!(timestamps(&records[1]), [210]);
    }

    #[test]
    fn test_invalid_window_configs() {
        for (size, slide) in [
            ("0", None),
            ("abc", None),
            ("2", Some("3")),
            ("1s", Some("2")),
            ("500ms", Some("1s")),
        ] {
            let config = WindowConfig {
                size: size.to_string(),
                slide: slide.map(str::to_string),
            };
            assert!(
                matches!(
                    WindowOperator::new("w", &config),
                    Err(OperatorError::InvalidConfiguration { .. })
                ),
                "expected rejection for size={size} slide={slide:?}"
            );
        }
    }
}
