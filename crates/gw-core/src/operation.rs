use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of text-processing jobs the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Summarize,
    Sentiment,
    KeyPoints,
    Questions,
    Qa,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Summarize,
        Operation::Sentiment,
        Operation::KeyPoints,
        Operation::Questions,
        Operation::Qa,
    ];

    /// Wire/display name, matching the `snake_case` serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Summarize => "summarize",
            Operation::Sentiment => "sentiment",
            Operation::KeyPoints => "key_points",
            Operation::Questions => "questions",
            Operation::Qa => "qa",
        }
    }

    /// `qa` is the only operation that requires a `question` field.
    pub fn requires_question(self) -> bool {
        matches!(self, Operation::Qa)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summarize" => Ok(Operation::Summarize),
            "sentiment" => Ok(Operation::Sentiment),
            "key_points" => Ok(Operation::KeyPoints),
            "questions" => Ok(Operation::Questions),
            "qa" => Ok(Operation::Qa),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown operation: {0}")]
pub struct UnknownOperation(pub String);
