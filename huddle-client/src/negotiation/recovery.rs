use crate::negotiation::Role;

/// Ways a description exchange can go wrong for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// An offer arrived in a state that cannot take it.
    OfferConflict,
    /// An answer arrived in a state that cannot take it, or the link rejected it.
    AnswerConflict,
    /// Applying an offer or producing the answer failed.
    AcceptFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStep {
    /// Revert the pending description on the current link.
    Rollback,
    /// Discard the link and build a fresh one in the given role.
    Recreate(Role),
}

/// Steps to try, in order, until one lets negotiation resume.
///
/// A link may refuse `Rollback` for a pending remote offer (the `webrtc`
/// adapter always does); the ladder then falls through to `Recreate`.
pub fn recovery_ladder(class: FailureClass) -> &'static [RecoveryStep] {
    match class {
        FailureClass::OfferConflict => &[
            RecoveryStep::Rollback,
            RecoveryStep::Recreate(Role::Responder),
        ],
        FailureClass::AnswerConflict => &[
            RecoveryStep::Rollback,
            RecoveryStep::Recreate(Role::Initiator),
        ],
        FailureClass::AcceptFailed => &[RecoveryStep::Recreate(Role::Responder)],
    }
}
