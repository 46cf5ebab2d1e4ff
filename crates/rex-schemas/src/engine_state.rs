use serde::{Deserialize, Serialize};

/// Process-wide, single-writer state. Only the scheduler ever mutates this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Running,
    PausedPriceFeed,
    PausedSolReserve,
    PausedExecErrors,
    Stopped,
}

impl EngineState {
    pub fn is_running(&self) -> bool {
        matches!(self, EngineState::Running)
    }
}
