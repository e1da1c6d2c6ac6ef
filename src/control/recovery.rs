// src/control/recovery.rs
//
// What to do when the line disappears:
//   FOLLOWING --(no line for lost_timeout)--> SEARCHING_A
//   SEARCHING_A --(search_a elapsed)--> SEARCHING_B (direction reversed)
//   SEARCHING_B --(search_b elapsed since search start)--> LOST (halt)
// A detection returns to FOLLOWING from anywhere except LOST, which only
// an external reset or recalibration leaves (see LineFollower).

use crate::config::RecoveryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDirection {
    Left,
    Right,
}

impl SearchDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Sign of the steering control that turns this way.
    pub fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryPhase {
    Following,
    SearchingA,
    SearchingB,
    Lost,
}

impl RecoveryPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Following => "FOLLOWING",
            Self::SearchingA => "SEARCHING_A",
            Self::SearchingB => "SEARCHING_B",
            Self::Lost => "LOST",
        }
    }

    pub fn is_searching(&self) -> bool {
        matches!(self, Self::SearchingA | Self::SearchingB)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecoveryState {
    pub phase: RecoveryPhase,
    /// Set when SEARCHING_A is entered; both search timeouts count from it.
    pub search_started_at: Option<Duration>,
    /// Last positive detection, or the first cycle seen when there was none.
    pub last_seen_at: Option<Duration>,
}

impl Default for RecoveryState {
    fn default() -> Self {
        Self {
            phase: RecoveryPhase::Following,
            search_started_at: None,
            last_seen_at: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryStateMachine {
    lost_timeout: Duration,
    search_a: Duration,
    search_b: Duration,
    first_direction: SearchDirection,
}

impl RecoveryStateMachine {
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            lost_timeout: Duration::from_millis(config.lost_timeout_ms),
            search_a: Duration::from_millis(config.search_a_ms),
            search_b: Duration::from_millis(config.search_b_ms),
            first_direction: config.first_search_direction,
        }
    }

    /// Next state given this cycle's detection outcome. At most one
    /// transition happens per call.
    pub fn advance(&self, state: RecoveryState, detected: bool, now: Duration) -> RecoveryState {
        if state.phase == RecoveryPhase::Lost {
            return state;
        }

        if detected {
            return RecoveryState {
                phase: RecoveryPhase::Following,
                search_started_at: None,
                last_seen_at: Some(now),
            };
        }

        match state.phase {
            RecoveryPhase::Following => {
                let Some(last_seen) = state.last_seen_at else {
                    return RecoveryState {
                        last_seen_at: Some(now),
                        ..state
                    };
                };
                if now.saturating_sub(last_seen) >= self.lost_timeout {
                    RecoveryState {
                        phase: RecoveryPhase::SearchingA,
                        search_started_at: Some(now),
                        ..state
                    }
                } else {
                    state
                }
            }
            RecoveryPhase::SearchingA => {
                if self.search_elapsed(&state, now) >= self.search_a {
                    RecoveryState {
                        phase: RecoveryPhase::SearchingB,
                        ..state
                    }
                } else {
                    state
                }
            }
            RecoveryPhase::SearchingB => {
                if self.search_elapsed(&state, now) >= self.search_b {
                    RecoveryState {
                        phase: RecoveryPhase::Lost,
                        ..state
                    }
                } else {
                    state
                }
            }
            RecoveryPhase::Lost => state,
        }
    }

    /// Turn direction for a search phase, `None` outside of searching.
    pub fn search_direction(&self, phase: RecoveryPhase) -> Option<SearchDirection> {
        match phase {
            RecoveryPhase::SearchingA => Some(self.first_direction),
            RecoveryPhase::SearchingB => Some(self.first_direction.opposite()),
            _ => None,
        }
    }

    fn search_elapsed(&self, state: &RecoveryState, now: Duration) -> Duration {
        state
            .search_started_at
            .map(|start| now.saturating_sub(start))
            .unwrap_or(Duration::ZERO)
    }
}
