//! Dispatch lifecycle states

use std::fmt;
use tracing::debug;

/// `Idle → Resolving → Substituting → Invoking → Normalizing → Done`,
/// with `Failed` reachable from every non-terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStage {
    Idle,
    Resolving,
    Substituting,
    Invoking,
    Normalizing,
    Done,
    Failed,
}

impl DispatchStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchStage::Done | DispatchStage::Failed)
    }

    /// Next stage on the success path, if any
    pub fn successor(&self) -> Option<DispatchStage> {
        match self {
            DispatchStage::Idle => Some(DispatchStage::Resolving),
            DispatchStage::Resolving => Some(DispatchStage::Substituting),
            DispatchStage::Substituting => Some(DispatchStage::Invoking),
            DispatchStage::Invoking => Some(DispatchStage::Normalizing),
            DispatchStage::Normalizing => Some(DispatchStage::Done),
            DispatchStage::Done | DispatchStage::Failed => None,
        }
    }

    pub fn can_advance_to(&self, next: DispatchStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == DispatchStage::Failed || self.successor() == Some(next)
    }

    /// Move to `next` if the transition is legal; returns whether it moved
    pub fn advance(&mut self, next: DispatchStage) -> bool {
        if !self.can_advance_to(next) {
            debug!("Refusing stage transition {} -> {}", self, next);
            return false;
        }
        *self = next;
        true
    }
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DispatchStage::Idle => "idle",
            DispatchStage::Resolving => "resolving",
            DispatchStage::Substituting => "substituting",
            DispatchStage::Invoking => "invoking",
            DispatchStage::Normalizing => "normalizing",
            DispatchStage::Done => "done",
            DispatchStage::Failed => "failed",
        };
        f.write_str(name)
    }
}
