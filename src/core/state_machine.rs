//! State machine for the publish workflow
//!
//! The workflow is a single linear pass: `Init -> Authenticated -> Published
//! -> Verified -> (Subscribed) -> Done`, with `Failed` reachable from any
//! non-terminal state. Transitions outside that chain are rejected.

use crate::core::error::PublishError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Init,
    Authenticated,
    Published,
    Verified,
    Subscribed,
    Done,
    Failed,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Authenticated => "AUTHENTICATED",
            Self::Published => "PUBLISHED",
            Self::Verified => "VERIFIED",
            Self::Subscribed => "SUBSCRIBED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One recorded state transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub timestamp: DateTime<Utc>,
}

/// Tracks the workflow's progress through its states
pub struct WorkflowStateMachine {
    current_state: WorkflowState,
    transitions: Vec<StateTransition>,
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: WorkflowState::Init,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new state, rejecting anything outside the workflow chain
    pub fn transition(&mut self, to: WorkflowState) -> Result<(), PublishError> {
        if !self.is_legal(to) {
            return Err(PublishError::IllegalTransition {
                from: self.current_state.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
        });
        self.current_state = to;

        Ok(())
    }

    /// Short-circuit to `Failed` from any non-terminal state
    pub fn fail(&mut self) {
        if !self.current_state.is_terminal() {
            self.transitions.push(StateTransition {
                from: self.current_state,
                to: WorkflowState::Failed,
                timestamp: Utc::now(),
            });
            self.current_state = WorkflowState::Failed;
        }
    }

    pub fn current(&self) -> WorkflowState {
        self.current_state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Elapsed milliseconds between the first and last transition
    pub fn elapsed_ms(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Transition history as a human-readable string
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                format!(
                    "{}: {} -> {}",
                    t.timestamp.to_rfc3339(),
                    t.from.as_str(),
                    t.to.as_str()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_legal(&self, to: WorkflowState) -> bool {
        use WorkflowState::*;

        if to == Failed {
            return !self.current_state.is_terminal();
        }

        matches!(
            (self.current_state, to),
            (Init, Authenticated)
                | (Authenticated, Published)
                | (Published, Verified)
                | (Verified, Subscribed)
                | (Verified, Done)
                | (Subscribed, Done)
        )
    }
}
