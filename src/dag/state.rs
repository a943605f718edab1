// src/dag/state.rs

//! Per-run stage state register.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a stage within one run.
///
/// ```text
/// Pending -> Running -> Succeeded | Skipped | FailedOptional | Failed
/// ```
///
/// There is no way back from a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StageState {
    /// Not reached yet, or never reached because a dependency failed.
    Pending = 0,
    /// Claimed by exactly one task; gates or handler in progress.
    Running = 1,
    Succeeded = 2,
    /// Platform mismatch, an `unless` condition held, or an optional
    /// stage's required command was missing.
    Skipped = 3,
    /// Optional stage whose handler failed; recorded as a warning.
    FailedOptional = 4,
    /// Mandatory stage failure. Dependents never run.
    Failed = 5,
}

impl StageState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, StageState::Pending | StageState::Running)
    }

    /// Whether a dependency in this state lets its dependents run.
    pub fn satisfies_dependents(self) -> bool {
        matches!(
            self,
            StageState::Succeeded | StageState::Skipped | StageState::FailedOptional
        )
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => StageState::Pending,
            1 => StageState::Running,
            2 => StageState::Succeeded,
            3 => StageState::Skipped,
            4 => StageState::FailedOptional,
            _ => StageState::Failed,
        }
    }
}

/// Atomic holder for one stage's [`StageState`].
///
/// All accesses are `SeqCst`: two predecessors of a shared dependent each
/// store their own terminal state and then load the other's, and at least
/// one of them must observe both.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(StageState::Pending as u8))
    }

    pub(crate) fn load(&self) -> StageState {
        StageState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move `Pending -> Running`. Only one caller per run ever gets `true`.
    pub(crate) fn claim(&self) -> bool {
        self.0
            .compare_exchange(
                StageState::Pending as u8,
                StageState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub(crate) fn finish(&self, state: StageState) {
        debug_assert!(state.is_terminal());
        self.0.store(state as u8, Ordering::SeqCst);
    }
}
