//! Workflow phase machines.
//!
//! Phases are advanced strictly in order by the coordinator; they exist as
//! types so transitions show up in traces and can be asserted in tests.

use serde::{Deserialize, Serialize};

/// Phases of the creation workflow.
///
/// ```text
/// Draft ──► Pricing ──► Priced ──► Persisted ──► CreditAttempted ──► Completed
/// ```
///
/// Pricing always advances (partial results allowed); persistence failure
/// aborts; the credit step never prevents `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CreationPhase {
    #[default]
    Draft,
    Pricing,
    Priced,
    Persisted,
    CreditAttempted,
    Completed,
}

impl CreationPhase {
    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreationPhase::Draft => "Draft",
            CreationPhase::Pricing => "Pricing",
            CreationPhase::Priced => "Priced",
            CreationPhase::Persisted => "Persisted",
            CreationPhase::CreditAttempted => "CreditAttempted",
            CreationPhase::Completed => "Completed",
        }
    }

    /// Returns the phase that follows this one, if any.
    pub fn next(&self) -> Option<CreationPhase> {
        match self {
            CreationPhase::Draft => Some(CreationPhase::Pricing),
            CreationPhase::Pricing => Some(CreationPhase::Priced),
            CreationPhase::Priced => Some(CreationPhase::Persisted),
            CreationPhase::Persisted => Some(CreationPhase::CreditAttempted),
            CreationPhase::CreditAttempted => Some(CreationPhase::Completed),
            CreationPhase::Completed => None,
        }
    }

    /// Returns true if this is the terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CreationPhase::Completed)
    }
}

impl std::fmt::Display for CreationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phases of the redemption workflow.
///
/// ```text
/// Requested ──► BalanceChecked ──► DiscountComputed ──► LocallyApplied ──┬──► LedgerDebited
///                                                                        └──► Compensated
/// ```
///
/// Everything before `LocallyApplied` aborts without mutation; after it, a
/// debit failure triggers the compensating reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RedemptionPhase {
    #[default]
    Requested,
    BalanceChecked,
    DiscountComputed,
    LocallyApplied,
    LedgerDebited,
    Compensated,
}

impl RedemptionPhase {
    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedemptionPhase::Requested => "Requested",
            RedemptionPhase::BalanceChecked => "BalanceChecked",
            RedemptionPhase::DiscountComputed => "DiscountComputed",
            RedemptionPhase::LocallyApplied => "LocallyApplied",
            RedemptionPhase::LedgerDebited => "LedgerDebited",
            RedemptionPhase::Compensated => "Compensated",
        }
    }

    /// Returns true if no local mutation has happened yet in this phase.
    pub fn can_abort_cleanly(&self) -> bool {
        matches!(
            self,
            RedemptionPhase::Requested
                | RedemptionPhase::BalanceChecked
                | RedemptionPhase::DiscountComputed
        )
    }

    /// Returns true if this is a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RedemptionPhase::LedgerDebited | RedemptionPhase::Compensated
        )
    }
}

impl std::fmt::Display for RedemptionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_phase_order() {
        let mut phase = CreationPhase::default();
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            phase = next;
            seen.push(phase);
        }
        assert_eq!(seen, vec![
            CreationPhase::Draft,
            CreationPhase::Pricing,
            CreationPhase::Priced,
            CreationPhase::Persisted,
            CreationPhase::CreditAttempted,
            CreationPhase::Completed,
        ]);
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_redemption_clean_abort_window() {
        assert!(RedemptionPhase::Requested.can_abort_cleanly());
        assert!(RedemptionPhase::BalanceChecked.can_abort_cleanly());
        assert!(RedemptionPhase::DiscountComputed.can_abort_cleanly());
        assert!(!RedemptionPhase::LocallyApplied.can_abort_cleanly());
        assert!(!RedemptionPhase::LedgerDebited.can_abort_cleanly());
        assert!(!RedemptionPhase::Compensated.can_abort_cleanly());
    }

    #[test]
    fn test_redemption_terminal_phases() {
        assert!(RedemptionPhase::LedgerDebited.is_terminal());
        assert!(RedemptionPhase::Compensated.is_terminal());
        assert!(!RedemptionPhase::LocallyApplied.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(CreationPhase::Pricing.to_string(), "Pricing");
        assert_eq!(RedemptionPhase::BalanceChecked.to_string(), "BalanceChecked");
    }
}
