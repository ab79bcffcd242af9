//! Reversing entries for posted journal entries.
//!
//! A reversal never edits the original. It builds a new entry whose lines
//! swap debit and credit, dated in an open period, referencing the
//! original's code.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::{DraftInput, EntryStatus, LineInput, Reference, SourceType};

/// Reference type carried by every reversing entry.
pub const REVERSAL_REFERENCE_TYPE: &str = "REVERSAL";

/// Prefix added to line descriptions on the reversing entry.
pub const REVERSAL_LINE_PREFIX: &str = "Reversal: ";

/// What the reversal needs to know about the original entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalEntry {
    /// Entry code, e.g. `JE-2025-11-0001`.
    pub code: String,
    /// Current status.
    pub status: EntryStatus,
    /// True if a reversing entry is already linked.
    pub has_reversal: bool,
    /// Lines in line order.
    pub lines: Vec<LineInput>,
}

/// Checks the original can be reversed and the reason is usable.
///
/// # Errors
///
/// - `ReasonRequired` for a blank reason
/// - `NotPosted` for a draft
/// - `AlreadyReversed` for a reversed or already linked entry
pub fn check_reversible(original: &OriginalEntry, reason: &str) -> Result<(), LedgerError> {
    if reason.trim().is_empty() {
        return Err(LedgerError::ReasonRequired);
    }
    match original.status {
        EntryStatus::Draft => Err(LedgerError::NotPosted(original.code.clone())),
        EntryStatus::Reversed => Err(LedgerError::AlreadyReversed(original.code.clone())),
        EntryStatus::Posted if original.has_reversal => {
            Err(LedgerError::AlreadyReversed(original.code.clone()))
        }
        EntryStatus::Posted => Ok(()),
    }
}

/// Swaps debit and credit on every line.
#[must_use]
pub fn reverse_lines(lines: &[LineInput]) -> Vec<LineInput> {
    lines
        .iter()
        .map(|line| LineInput {
            account_id: line.account_id,
            debit: line.credit,
            credit: line.debit,
            description: Some(format!(
                "{REVERSAL_LINE_PREFIX}{}",
                line.description.as_deref().unwrap_or_default()
            )),
        })
        .collect()
}

/// Builds the reversing draft for `original`, dated `entry_date`.
///
/// # Errors
///
/// Same as [`check_reversible`].
pub fn build_reversal(
    original: &OriginalEntry,
    reason: &str,
    entry_date: NaiveDate,
) -> Result<DraftInput, LedgerError> {
    check_reversible(original, reason)?;

    Ok(DraftInput {
        entry_date,
        description: format!("Reversal of {}: {}", original.code, reason.trim()),
        reference: Some(Reference::new(REVERSAL_REFERENCE_TYPE, original.code.clone())),
        source_type: SourceType::Reversal,
        lines: reverse_lines(&original.lines),
    })
}
