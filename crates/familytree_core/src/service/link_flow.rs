//! Caller-side sequencing for the two-step link flow.
//!
//! # Responsibility
//! - Discard validation results superseded by a newer validation request.
//! - Tell the caller when a link call may be issued for a token.
//!
//! # Invariants
//! - Only the most recently issued ticket can complete (last request wins).
//! - `ready_to_link` holds only for the token of the latest successful
//!   validation; any new validation request clears it.

use crate::service::link_service::JoinIdValidation;

/// Handle for one in-flight validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTicket {
    sequence: u64,
    token: String,
}

impl ValidationTicket {
    /// Trimmed token this request validates.
    pub fn token(&self) -> &str {
        self.token.as_str()
    }
}

/// Per-screen link flow state. One instance per linking UI session.
#[derive(Debug, Default)]
pub struct LinkFlow {
    issued: u64,
    confirmed_token: Option<String>,
}

impl LinkFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a validation request, superseding any request in flight.
    pub fn begin_validation(&mut self, token: &str) -> ValidationTicket {
        self.issued += 1;
        self.confirmed_token = None;
        ValidationTicket {
            sequence: self.issued,
            token: token.trim().to_string(),
        }
    }

    /// Completes a validation request.
    ///
    /// Returns `None` when the ticket was superseded; the result must then be
    /// discarded by the caller.
    pub fn complete_validation(
        &mut self,
        ticket: ValidationTicket,
        result: JoinIdValidation,
    ) -> Option<JoinIdValidation> {
        if ticket.sequence != self.issued {
            return None;
        }
        if result.is_valid {
            self.confirmed_token = Some(ticket.token);
        }
        Some(result)
    }

    /// Returns whether `link_family` may be issued for `token`.
    pub fn ready_to_link(&self, token: &str) -> bool {
        self.confirmed_token.as_deref() == Some(token.trim())
    }

    /// Clears confirmation, e.g. after a link call or when the dialog closes.
    pub fn reset(&mut self) {
        self.confirmed_token = None;
    }
}
