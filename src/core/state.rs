//! Invoice lifecycle.
//!
//! ```text
//! BROUILLON ─send─▶ ENVOYE ─┬─ payment ─▶ PARTIELLEMENT_PAYE ─▶ PAYE
//!                           └─ due date passed ─▶ EN_RETARD
//! any non-terminal ─cancel─▶ ANNULE
//! ```
//!
//! `PAYE` and `ANNULE` are terminal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::FacturationError;
use super::types::Invoice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[serde(rename = "BROUILLON")]
    Draft,
    #[serde(rename = "ENVOYE")]
    Sent,
    #[serde(rename = "PARTIELLEMENT_PAYE")]
    PartiallyPaid,
    #[serde(rename = "PAYE")]
    Paid,
    #[serde(rename = "EN_RETARD")]
    Overdue,
    #[serde(rename = "ANNULE")]
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 6] = [
        Self::Draft,
        Self::Sent,
        Self::PartiallyPaid,
        Self::Paid,
        Self::Overdue,
        Self::Cancelled,
    ];

    /// Wire/storage code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Draft => "BROUILLON",
            Self::Sent => "ENVOYE",
            Self::PartiallyPaid => "PARTIELLEMENT_PAYE",
            Self::Paid => "PAYE",
            Self::Overdue => "EN_RETARD",
            Self::Cancelled => "ANNULE",
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Brouillon",
            Self::Sent => "Envoyée",
            Self::PartiallyPaid => "Partiellement payée",
            Self::Paid => "Payée",
            Self::Overdue => "En retard",
            Self::Cancelled => "Annulée",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Whether `next` is reachable from `self` in one step.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        match (self, next) {
            (Paid | Cancelled, _) => false,
            (_, Cancelled) => true,
            (Draft, Sent) => true,
            (Sent | PartiallyPaid, Overdue) => true,
            (_, PartiallyPaid | Paid) => true,
            _ => false,
        }
    }

    fn transition(self, next: InvoiceStatus) -> Result<InvoiceStatus, FacturationError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(FacturationError::IllegalStateTransition(format!(
                "{} → {} is not permitted",
                self.code(),
                next.code()
            )))
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of an overdue check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverdueOutcome {
    /// Status moved to `EN_RETARD`.
    Marked,
    /// Already `EN_RETARD`; nothing changed.
    AlreadyOverdue,
    /// Not due yet, nothing left to pay, or not in a payable state.
    NotApplicable,
}

impl Invoice {
    /// BROUILLON → ENVOYE. Lines are locked afterwards.
    pub fn send(&mut self, at: DateTime<Utc>) -> Result<(), FacturationError> {
        if self.status != InvoiceStatus::Draft {
            return Err(FacturationError::IllegalStateTransition(format!(
                "invoice {} can only be sent from {}, it is {}",
                self.number,
                InvoiceStatus::Draft,
                self.status
            )));
        }
        self.status = self.status.transition(InvoiceStatus::Sent)?;
        self.sent_at = Some(at);
        Ok(())
    }

    /// Any non-terminal state → ANNULE.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), FacturationError> {
        self.status = self.status.transition(InvoiceStatus::Cancelled)?;
        self.cancelled_at = Some(at);
        Ok(())
    }

    /// ENVOYE / PARTIELLEMENT_PAYE → EN_RETARD when the due date is past and
    /// a balance remains. Re-running on an overdue invoice is a no-op.
    pub fn mark_overdue(&mut self, today: NaiveDate) -> OverdueOutcome {
        if self.status == InvoiceStatus::Overdue {
            return OverdueOutcome::AlreadyOverdue;
        }
        let past_due = self.due_date.is_some_and(|due| due < today);
        if !past_due || !self.amount_remaining.is_positive() {
            return OverdueOutcome::NotApplicable;
        }
        match self.status.transition(InvoiceStatus::Overdue) {
            Ok(next) => {
                self.status = next;
                OverdueOutcome::Marked
            }
            Err(_) => OverdueOutcome::NotApplicable,
        }
    }

    /// Status implied by the remaining balance after a settlement.
    pub(crate) fn settle_status(&mut self) -> Result<(), FacturationError> {
        let next = if self.amount_remaining.is_zero() {
            InvoiceStatus::Paid
        } else if self.amount_remaining < self.montant_total() {
            InvoiceStatus::PartiallyPaid
        } else {
            return Ok(());
        };
        if next != self.status {
            self.status = self.status.transition(next)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_go_nowhere() {
        for from in [InvoiceStatus::Paid, InvoiceStatus::Cancelled] {
            for to in InvoiceStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} → {to}");
            }
        }
    }

    #[test]
    fn every_non_terminal_can_cancel() {
        for from in InvoiceStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(from.can_transition_to(InvoiceStatus::Cancelled));
        }
    }

    #[test]
    fn overdue_only_from_sent_or_partial() {
        assert!(InvoiceStatus::Sent.can_transition_to(InvoiceStatus::Overdue));
        assert!(InvoiceStatus::PartiallyPaid.can_transition_to(InvoiceStatus::Overdue));
        assert!(!InvoiceStatus::Draft.can_transition_to(InvoiceStatus::Overdue));
        assert!(!InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Sent));
    }

    #[test]
    fn codes_round_trip() {
        for s in InvoiceStatus::ALL {
            assert_eq!(InvoiceStatus::from_code(s.code()), Some(s));
        }
        assert_eq!(InvoiceStatus::from_code("PAID"), None);
    }

    #[test]
    fn serde_uses_codes() {
        let json = serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap();
        assert_eq!(json, "\"PARTIELLEMENT_PAYE\"");
    }
}
