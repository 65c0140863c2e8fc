// Sampling actions, explicit interval state and the persisted per-key record

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConductorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingAction {
    Begin,
    End,
}

impl SamplingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingAction::Begin => "begin",
            SamplingAction::End => "end",
        }
    }
}

impl fmt::Display for SamplingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the exact strings "begin" and "end" are accepted.
impl FromStr for SamplingAction {
    type Err = ConductorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "begin" => Ok(SamplingAction::Begin),
            "end" => Ok(SamplingAction::End),
            other => Err(ConductorError::Validation(format!(
                "unknown action: {:?}",
                other
            ))),
        }
    }
}

/// Interval state for one (network, snapshot). Idle = never sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingState {
    Idle,
    Open,
    Closed,
}

impl SamplingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SamplingState::Idle => "idle",
            SamplingState::Open => "open",
            SamplingState::Closed => "closed",
        }
    }

    /// Parse the value stored in the `state` column.
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(SamplingState::Idle),
            "open" => Some(SamplingState::Open),
            "closed" => Some(SamplingState::Closed),
            _ => None,
        }
    }
}

/// Single versioned record holding both markers and the explicit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingRecord {
    pub network: String,
    pub snapshot: String,
    pub state: SamplingState,
    pub begin: Option<i64>,
    pub end: Option<i64>,
    /// Bumped on every transition; 0 means nothing has been persisted yet.
    #[serde(skip)]
    pub version: i64,
}

impl SamplingRecord {
    pub fn idle(network: &str, snapshot: &str) -> Self {
        Self {
            network: network.to_string(),
            snapshot: snapshot.to_string(),
            state: SamplingState::Idle,
            begin: None,
            end: None,
            version: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == SamplingState::Open
    }

    pub fn marker(&self, action: SamplingAction) -> Option<i64> {
        match action {
            SamplingAction::Begin => self.begin,
            SamplingAction::End => self.end,
        }
    }
}

/// Result of a successful begin/end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub network: String,
    pub snapshot: String,
    pub action: SamplingAction,
    pub timestamp: i64,
}
