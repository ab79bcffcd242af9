//! Ledger domain types for journal creation and validation.
//!
//! This module defines the core types used for creating and validating
//! journal entries in the double-entry bookkeeping system.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use erp_ledger_shared::types::{AccountId, Money};

use super::error::LedgerError;

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owner's residual interest.
    Equity,
    /// Income for the period.
    Revenue,
    /// Costs for the period.
    Expense,
}

impl AccountType {
    /// All account types, in chart-of-accounts order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
    ];

    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ASSET" => Some(Self::Asset),
            "LIABILITY" => Some(Self::Liability),
            "EQUITY" => Some(Self::Equity),
            "REVENUE" => Some(Self::Revenue),
            "EXPENSE" => Some(Self::Expense),
            _ => None,
        }
    }

    /// Side on which this account type increases. Derived, never stored.
    #[must_use]
    pub const fn normal_balance(&self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Revenue and expense accounts are zeroed by period closing.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Revenue | Self::Expense)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Debit-normal or credit-normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Asset, Expense: balance += debit - credit.
    Debit,
    /// Liability, Equity, Revenue: balance += credit - debit.
    Credit,
}

/// Journal entry status.
///
/// Valid transitions:
/// - Draft → Posted (post)
/// - Posted → Reversed (reverse, via a linked reversing entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    /// Editable, no effect on balances.
    Draft,
    /// Applied to balances (immutable).
    Posted,
    /// Posted and later offset by a reversing entry (immutable).
    Reversed,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Reversed => "REVERSED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "POSTED" => Some(Self::Posted),
            "REVERSED" => Some(Self::Reversed),
            _ => None,
        }
    }

    /// Returns true if the entry can still be modified.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the entry's lines are reflected in stored balances.
    ///
    /// A reversed entry stays in the replay; its reversing entry offsets it.
    #[must_use]
    pub const fn affects_balances(&self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a journal entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Keyed in directly.
    Manual,
    /// Posted by a collaborator module (sales, purchase, payment, ...).
    BusinessEvent,
    /// Compensating entry created by a reversal.
    Reversal,
    /// Generated by period closing.
    Closing,
}

impl SourceType {
    /// Returns the string representation of the source type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::BusinessEvent => "BUSINESS_EVENT",
            Self::Reversal => "REVERSAL",
            Self::Closing => "CLOSING",
        }
    }

    /// Parses a source type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MANUAL" => Some(Self::Manual),
            "BUSINESS_EVENT" => Some(Self::BusinessEvent),
            "REVERSAL" => Some(Self::Reversal),
            "CLOSING" => Some(Self::Closing),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One journal line as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit amount (zero on a credit line).
    pub debit: Money,
    /// Credit amount (zero on a debit line).
    pub credit: Money,
    /// Optional line description.
    pub description: Option<String>,
}

impl LineInput {
    /// A debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Money::ZERO,
            description: None,
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            debit: Money::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Builds a line from decimal amounts already rounded to the minor unit.
    pub fn from_decimal(
        account_id: AccountId,
        debit: Decimal,
        credit: Decimal,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            account_id,
            debit: Money::from_decimal(debit)?,
            credit: Money::from_decimal(credit)?,
            description: None,
        })
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Source document reference, e.g. `PURCHASE` / `123`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Source document type.
    pub reference_type: String,
    /// Source document identifier.
    pub reference_id: String,
}

impl Reference {
    /// Creates a reference.
    #[must_use]
    pub fn new(reference_type: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            reference_type: reference_type.into(),
            reference_id: reference_id.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.reference_type, self.reference_id)
    }
}

/// Input for creating or replacing a draft entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftInput {
    /// Accounting date of the entry.
    pub entry_date: NaiveDate,
    /// Header description.
    pub description: String,
    /// Optional source document reference.
    pub reference: Option<Reference>,
    /// Origin of the entry.
    pub source_type: SourceType,
    /// Lines, at least two.
    pub lines: Vec<LineInput>,
}

impl DraftInput {
    /// A manual entry without reference.
    #[must_use]
    pub fn manual(entry_date: NaiveDate, description: impl Into<String>, lines: Vec<LineInput>) -> Self {
        Self {
            entry_date,
            description: description.into(),
            reference: None,
            source_type: SourceType::Manual,
            lines,
        }
    }

    /// Attaches a source document reference.
    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// A financial fact reported by a collaborator module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessEvent {
    /// Source document type, e.g. `SALE`.
    pub reference_type: String,
    /// Source document identifier.
    pub reference_id: String,
    /// Lines to post.
    pub lines: Vec<LineInput>,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Header description.
    pub description: String,
}

impl BusinessEvent {
    /// Converts the event into a draft.
    #[must_use]
    pub fn to_draft(&self) -> DraftInput {
        DraftInput {
            entry_date: self.entry_date,
            description: self.description.clone(),
            reference: Some(Reference::new(
                self.reference_type.clone(),
                self.reference_id.clone(),
            )),
            source_type: SourceType::BusinessEvent,
            lines: self.lines.clone(),
        }
    }

    /// Total debit of the event, used for approval limits.
    #[must_use]
    pub fn total_debit(&self) -> Money {
        self.lines.iter().map(|l| l.debit).sum()
    }
}

/// What validation needs to know about an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Account ID.
    pub id: AccountId,
    /// Account code.
    pub code: String,
    /// Account type.
    pub account_type: AccountType,
    /// Aggregation node that never takes lines.
    pub is_header: bool,
    /// Inactive or soft-deleted accounts take no lines.
    pub is_active: bool,
}

/// Debit and credit sums of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Total debit.
    pub debit: Money,
    /// Total credit.
    pub credit: Money,
}

impl EntryTotals {
    /// Creates totals.
    #[must_use]
    pub const fn new(debit: Money, credit: Money) -> Self {
        Self { debit, credit }
    }

    /// Zero tolerance: equal in minor units.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }

    /// Debit minus credit.
    #[must_use]
    pub fn imbalance(&self) -> Money {
        self.debit - self.credit
    }
}
