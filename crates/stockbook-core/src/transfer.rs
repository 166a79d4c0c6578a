//! # Transfer State Machine
//!
//! The only mutable part of a ledger row is the status of a transfer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  Transfer Lifecycle                                 │
//! │                                                                     │
//! │              ┌──── complete ────► Completed (terminal)              │
//! │   Pending ───┤                                                      │
//! │              └──── cancel ──────► Cancelled (terminal)              │
//! │                                                                     │
//! │   Completing applies the stock moves exactly once.                  │
//! │   Cancelling has no stock effect.                                   │
//! │   Everything else is InvalidTransition - including completing       │
//! │   an already-completed transfer (double-application guard).         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The db layer re-enforces this with a conditional UPDATE on the
//! status column, so a lost race surfaces as the same error.

use crate::error::{CoreError, CoreResult};
use crate::types::TransferStatus;

/// Whether a status change is legal.
#[inline]
pub const fn can_transition(from: TransferStatus, to: TransferStatus) -> bool {
    matches!(
        (from, to),
        (TransferStatus::Pending, TransferStatus::Completed)
            | (TransferStatus::Pending, TransferStatus::Cancelled)
    )
}

/// Validates a status change for the given transfer.
///
/// Returns the target status on success so call sites read as
/// `let status = transfer::transition(id, current, target)?;`.
pub fn transition(
    transfer_id: &str,
    from: TransferStatus,
    to: TransferStatus,
) -> CoreResult<TransferStatus> {
    if can_transition(from, to) {
        Ok(to)
    } else {
        Err(CoreError::InvalidTransition {
            transfer_id: transfer_id.to_string(),
            from,
            to,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
