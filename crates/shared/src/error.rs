use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{PartIndex, SegmentIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidSegment,
    NotActiveSegment,
    InvalidPart,
    InvalidConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    #[error("segment {index} is outside the indicator (segment count {segment_count})")]
    InvalidSegmentIndex {
        index: SegmentIndex,
        segment_count: usize,
    },
    #[error("segment {index} is not the active segment (active: {active:?})")]
    NotActiveSegment {
        index: SegmentIndex,
        active: Option<SegmentIndex>,
    },
    #[error("story part {part} has no phase (total parts {total_parts})")]
    InvalidPart { part: PartIndex, total_parts: usize },
    #[error("invalid story configuration: {0}")]
    InvalidConfig(String),
}

impl SequencerError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SequencerError::InvalidSegmentIndex { .. } => ErrorCode::InvalidSegment,
            SequencerError::NotActiveSegment { .. } => ErrorCode::NotActiveSegment,
            SequencerError::InvalidPart { .. } => ErrorCode::InvalidPart,
            SequencerError::InvalidConfig(_) => ErrorCode::InvalidConfig,
        }
    }
}
