use std::fmt;

use serde::Serialize;

/// Discriminant of an operator's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Source,
    Map,
    Filter,
    FlatMap,
    KeyBy,
    Window,
    Aggregate,
    TopK,
    Join,
    Union,
    Sink,
}

impl OperatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::Source => "source",
            OperatorKind::Map => "map",
            OperatorKind::Filter => "filter",
            OperatorKind::FlatMap => "flat_map",
            OperatorKind::KeyBy => "key_by",
            OperatorKind::Window => "window",
            OperatorKind::Aggregate => "aggregate",
            OperatorKind::TopK => "top_k",
            OperatorKind::Join => "join",
            OperatorKind::Union => "union",
            OperatorKind::Sink => "sink",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
