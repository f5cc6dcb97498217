//! Maps an error kind to its default recovery strategy.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StateCorruption,
    ConcurrentActionConflict,
    InvalidGameState,
    PersistenceFailure,
    NetworkError,
    ValidationError,
    TimeoutError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    RollbackToSnapshot,
    FirstActionWins,
    RetryOperation,
    DmResolution,
    PauseAndNotify,
    ForceComplete,
}

/// The default strategy for an error kind, before any escalation rules are
/// applied.
pub fn default_strategy(kind: ErrorKind) -> RecoveryStrategy {
    use ErrorKind::*;
    use RecoveryStrategy::*;
    match kind {
        StateCorruption | InvalidGameState => RollbackToSnapshot,
        ConcurrentActionConflict => FirstActionWins,
        PersistenceFailure | NetworkError => RetryOperation,
        ValidationError => PauseAndNotify,
        TimeoutError => DmResolution,
    }
}

/// Applies escalation: past `max_retry_attempts` prior failures for the
/// same error, a retryable strategy downgrades to `PauseAndNotify`; past
/// `max_retry_attempts * 2` it downgrades further to `ForceComplete`.
pub fn escalate(strategy: RecoveryStrategy, prior_failures: u32, max_retry_attempts: u32) -> RecoveryStrategy {
    if !matches!(strategy, RecoveryStrategy::RetryOperation) {
        return strategy;
    }
    if prior_failures >= max_retry_attempts * 2 {
        RecoveryStrategy::ForceComplete
    } else if prior_failures >= max_retry_attempts {
        RecoveryStrategy::PauseAndNotify
    } else {
        strategy
    }
}
