//! Explicit stage machine for an update run.
//!
//! ```text
//! Validated -> BinaryReady -> AncestorReady -> OriginalReady -> UpgradeReady
//!   -> MergeBranchCreated -> MergeAttempted -> Merged | Conflicted
//!   -> Squashed -> Published
//! ```
//!
//! The stage reached tells a user which branches exist after a failure.

use std::fmt;

use crate::core::UpdateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateStage {
    Validated,
    BinaryReady,
    AncestorReady,
    OriginalReady,
    UpgradeReady,
    MergeBranchCreated,
    MergeAttempted,
    Merged,
    Conflicted,
    Squashed,
    Published,
}

impl UpdateStage {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::BinaryReady => "binary-ready",
            Self::AncestorReady => "ancestor-ready",
            Self::OriginalReady => "original-ready",
            Self::UpgradeReady => "upgrade-ready",
            Self::MergeBranchCreated => "merge-branch-created",
            Self::MergeAttempted => "merge-attempted",
            Self::Merged => "merged",
            Self::Conflicted => "conflicted",
            Self::Squashed => "squashed",
            Self::Published => "published",
        }
    }

    /// Whether `next` directly follows `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Validated, Self::BinaryReady)
                | (Self::BinaryReady, Self::AncestorReady)
                | (Self::AncestorReady, Self::OriginalReady)
                | (Self::OriginalReady, Self::UpgradeReady)
                | (Self::UpgradeReady, Self::MergeBranchCreated)
                | (Self::MergeBranchCreated, Self::MergeAttempted)
                | (Self::MergeAttempted, Self::Merged | Self::Conflicted)
                | (Self::Merged | Self::Conflicted, Self::Squashed)
                | (Self::Squashed, Self::Published)
        )
    }

    /// Moves to `next`, rejecting anything but a direct successor.
    pub fn advance(&mut self, next: Self) -> Result<(), UpdateError> {
        if !self.can_advance_to(next) {
            return Err(UpdateError::InvalidStageTransition {
                from: self.name().to_string(),
                to: next.name().to_string(),
            });
        }
        tracing::debug!("Update stage: {} -> {}", self, next);
        *self = next;
        Ok(())
    }

    /// Whether the merge step has produced its outcome.
    #[must_use]
    pub const fn merge_finished(self) -> bool {
        matches!(self, Self::Merged | Self::Conflicted | Self::Squashed | Self::Published)
    }
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut stage = UpdateStage::Validated;
        for next in [
            UpdateStage::BinaryReady,
            UpdateStage::AncestorReady,
            UpdateStage::OriginalReady,
            UpdateStage::UpgradeReady,
            UpdateStage::MergeBranchCreated,
            UpdateStage::MergeAttempted,
            UpdateStage::Conflicted,
            UpdateStage::Squashed,
            UpdateStage::Published,
        ] {
            stage.advance(next).unwrap();
        }
        assert_eq!(stage, UpdateStage::Published);
        assert!(stage.merge_finished());
    }

    #[test]
    fn test_rejects_skipping_stages() {
        let mut stage = UpdateStage::Validated;
        let err = stage.advance(UpdateStage::MergeAttempted).unwrap_err();
        assert!(matches!(err, UpdateError::InvalidStageTransition { .. }));
        assert_eq!(stage, UpdateStage::Validated);

        let mut stage = UpdateStage::Merged;
        assert!(stage.advance(UpdateStage::Conflicted).is_err());
        assert!(stage.advance(UpdateStage::Published).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(UpdateStage::MergeBranchCreated.to_string(), "merge-branch-created");
    }
}
