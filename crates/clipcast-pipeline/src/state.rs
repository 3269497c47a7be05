//! The run's stage machine.
//!
//! Stages advance strictly forward, one step at a time. `Failed` is reachable
//! from any non-terminal stage and absorbs everything after it.

use std::fmt;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    Synced,
    Analyzed,
    Selected,
    Generated,
    Published,
    Finalized,
    Failed,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Synced => "synced",
            Stage::Analyzed => "analyzed",
            Stage::Selected => "selected",
            Stage::Generated => "generated",
            Stage::Published => "published",
            Stage::Finalized => "finalized",
            Stage::Failed => "failed",
        }
    }

    /// The next stage on the success path, if any.
    #[must_use]
    pub fn successor(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::Synced),
            Stage::Synced => Some(Stage::Analyzed),
            Stage::Analyzed => Some(Stage::Selected),
            Stage::Selected => Some(Stage::Generated),
            Stage::Generated => Some(Stage::Published),
            Stage::Published => Some(Stage::Finalized),
            Stage::Finalized | Stage::Failed => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Finalized | Stage::Failed)
    }

    #[must_use]
    pub fn can_transition_to(self, next: Stage) -> bool {
        if next == Stage::Failed {
            return !self.is_terminal();
        }
        self.successor() == Some(next)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Tracks the current stage and the path taken to reach it.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: Stage,
    history: Vec<Stage>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Stage::Init,
            history: vec![Stage::Init],
        }
    }

    #[must_use]
    pub fn current(&self) -> Stage {
        self.current
    }

    #[must_use]
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Moves to `next` if the transition is legal.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] for skips, backward
    /// moves, and anything leaving a terminal stage.
    pub fn advance(&mut self, next: Stage) -> Result<(), PipelineError> {
        if !self.current.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.current,
                to: next,
            });
        }
        self.current = next;
        self.history.push(next);
        Ok(())
    }

    /// Enters `Failed`. A no-op when already terminal.
    pub fn fail(&mut self) {
        if !self.current.is_terminal() {
            self.current = Stage::Failed;
            self.history.push(Stage::Failed);
        }
    }
}
