//! Journal repository: drafts, posting, reversal and business events.
//!
//! Every mutation runs in one database transaction under the configured
//! deadline. The entry row is locked before any status change, so two
//! concurrent posts of the same draft serialize and the second one sees
//! `AlreadyPosted`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use erp_ledger_core::audit::{AuditEntity, AuditOperation, AuditRecord};
use erp_ledger_core::auth::{Actor, Capability, authorize};
use erp_ledger_core::ledger::{
    BusinessEvent, DraftInput, EntryStatus, EntryTotals, LedgerError, LineInput, OriginalEntry,
    SourceType, build_reversal, format_entry_code, sequence_scope, validate_accounts,
    validate_draft, validate_lines,
};
use erp_ledger_shared::types::{AccountId, JournalEntryId, JournalLineId, Money, PageRequest, PageResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict, Query},
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::account::load_snapshots;
use super::audit;
use super::balance::apply_lines;
use super::context::{LedgerContext, with_deadline};
use super::error::{StoreError, StoreResult};
use super::period::ensure_posting_period;
use crate::entities::{journal_entries, journal_lines, journal_sequences, sea_orm_active_enums};

/// A journal entry with its lines in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntryWithLines {
    /// The entry header.
    pub entry: journal_entries::Model,
    /// The lines.
    pub lines: Vec<journal_lines::Model>,
}

impl JournalEntryWithLines {
    /// Typed entry id.
    #[must_use]
    pub const fn id(&self) -> JournalEntryId {
        JournalEntryId::from_uuid(self.entry.id)
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        self.entry.status.into()
    }

    /// Lines as ledger inputs.
    #[must_use]
    pub fn line_inputs(&self) -> Vec<LineInput> {
        to_line_inputs(&self.lines)
    }
}

/// Filter options for querying entries.
#[derive(Debug, Clone, Default)]
pub struct JournalFilter {
    /// Filter by status.
    pub status: Option<EntryStatus>,
    /// Entries dated on or after.
    pub date_from: Option<NaiveDate>,
    /// Entries dated on or before.
    pub date_to: Option<NaiveDate>,
    /// Entries with at least one line on this account.
    pub account_id: Option<AccountId>,
    /// Filter by reference type.
    pub reference_type: Option<String>,
    /// Filter by reference id.
    pub reference_id: Option<String>,
    /// Filter by source type.
    pub source_type: Option<SourceType>,
    /// Substring of code, description or reference id.
    pub search: Option<String>,
}

/// Header fields for a new entry row.
pub(crate) struct NewEntry<'a> {
    pub input: &'a DraftInput,
    pub totals: EntryTotals,
    pub status: EntryStatus,
    pub reverses_entry_id: Option<Uuid>,
    pub reversal_reason: Option<String>,
}

impl<'a> NewEntry<'a> {
    pub(crate) const fn new(input: &'a DraftInput, totals: EntryTotals, status: EntryStatus) -> Self {
        Self {
            input,
            totals,
            status,
            reverses_entry_id: None,
            reversal_reason: None,
        }
    }
}

/// Journal repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    ctx: Arc<LedgerContext>,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, ctx: Arc<LedgerContext>) -> Self {
        Self { db, ctx }
    }

    /// Creates a DRAFT entry. Balances and periods are not touched.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending line, or
    /// `Unbalanced` with the imbalance.
    #[instrument(skip(self, actor, input), fields(actor = %actor.user_id, date = %input.entry_date))]
    pub async fn create_draft(
        &self,
        actor: &Actor,
        input: DraftInput,
    ) -> StoreResult<JournalEntryWithLines> {
        with_deadline("create_draft", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let created = create_draft_in_txn(&txn, &self.ctx, actor, &input).await?;
            txn.commit().await?;
            info!(code = %created.entry.code, "draft created");
            Ok(created)
        })
        .await
    }

    /// Replaces the header and lines of a DRAFT entry. The code is kept.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` once the entry left DRAFT.
    #[instrument(skip(self, actor, input), fields(actor = %actor.user_id, entry = %entry_id))]
    pub async fn update_draft(
        &self,
        actor: &Actor,
        entry_id: JournalEntryId,
        input: DraftInput,
    ) -> StoreResult<JournalEntryWithLines> {
        authorize(actor, Capability::CreateEntry)?;
        let totals = validate_draft(&input)?;

        with_deadline("update_draft", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let entry = lock_entry(&txn, entry_id).await?;
            ensure_draft(&entry)?;
            check_accounts(&txn, &input.lines).await?;

            journal_lines::Entity::delete_many()
                .filter(journal_lines::Column::EntryId.eq(entry.id))
                .exec(&txn)
                .await?;

            let (reference_type, reference_id) = split_reference(&input);
            let mut active = entry.into_active_model();
            active.entry_date = Set(input.entry_date);
            active.description = Set(input.description.trim().to_string());
            active.reference_type = Set(reference_type);
            active.reference_id = Set(reference_id);
            active.total_debit = Set(totals.debit.minor());
            active.total_credit = Set(totals.credit.minor());
            active.updated_at = Set(Utc::now().into());
            let entry = active.update(&txn).await?;
            let lines = insert_lines(&txn, entry.id, &input.lines).await?;

            audit::record(
                &txn,
                AuditRecord::new(actor, AuditOperation::UpdateDraft, AuditEntity::JournalEntry, entry.id)
                    .transition(EntryStatus::Draft, EntryStatus::Draft)
                    .details(entry.code.clone()),
            )
            .await?;

            txn.commit().await?;
            Ok(JournalEntryWithLines { entry, lines })
        })
        .await
    }

    /// Deletes a DRAFT entry and its lines.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyPosted` once the entry left DRAFT.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id, entry = %entry_id))]
    pub async fn discard_draft(&self, actor: &Actor, entry_id: JournalEntryId) -> StoreResult<()> {
        authorize(actor, Capability::CreateEntry)?;

        with_deadline("discard_draft", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let entry = lock_entry(&txn, entry_id).await?;
            ensure_draft(&entry)?;

            journal_lines::Entity::delete_many()
                .filter(journal_lines::Column::EntryId.eq(entry.id))
                .exec(&txn)
                .await?;
            journal_entries::Entity::delete_by_id(entry.id).exec(&txn).await?;

            audit::record(
                &txn,
                AuditRecord::new(actor, AuditOperation::DiscardDraft, AuditEntity::JournalEntry, entry.id)
                    .transition(EntryStatus::Draft, "DISCARDED")
                    .details(entry.code.clone()),
            )
            .await?;

            txn.commit().await?;
            info!(code = %entry.code, "draft discarded");
            Ok(())
        })
        .await
    }

    /// Posts a DRAFT entry and applies it to balances.
    ///
    /// # Errors
    ///
    /// - `AlreadyPosted` if the entry is not DRAFT
    /// - `UnbalancedEntry` if the stored lines no longer balance
    /// - `PeriodClosed` naming the period of the entry date
    /// - `PostingDateOutOfRange` if no period exists and none may be opened
    #[instrument(skip(self, actor), fields(actor = %actor.user_id, entry = %entry_id))]
    pub async fn post(
        &self,
        actor: &Actor,
        entry_id: JournalEntryId,
    ) -> StoreResult<JournalEntryWithLines> {
        with_deadline("post_entry", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let posted = post_in_txn(&txn, &self.ctx, actor, entry_id).await?;
            txn.commit().await?;
            info!(code = %posted.entry.code, "entry posted");
            Ok(posted)
        })
        .await
    }

    /// Reverses a POSTED entry with a new entry dated today.
    ///
    /// Returns the reversing entry.
    ///
    /// # Errors
    ///
    /// - `ReasonRequired` for a blank reason
    /// - `NotPosted` for a draft, `AlreadyReversed` for a reversed entry
    /// - `PeriodClosed` if today's period is closed
    /// - a validation error if an account of the entry was deactivated since
    #[instrument(skip(self, actor, reason), fields(actor = %actor.user_id, entry = %entry_id))]
    pub async fn reverse(
        &self,
        actor: &Actor,
        entry_id: JournalEntryId,
        reason: &str,
    ) -> StoreResult<JournalEntryWithLines> {
        authorize(actor, Capability::ReverseEntry)?;

        with_deadline("reverse_entry", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let reversal = reverse_in_txn(&txn, &self.ctx, actor, entry_id, reason).await?;
            txn.commit().await?;
            info!(code = %reversal.entry.code, "entry reversed");
            Ok(reversal)
        })
        .await
    }

    /// Creates and posts an entry for a business event in one transaction.
    ///
    /// A reference that was already posted is rejected with
    /// `DuplicateReference`, so a caller may retry safely.
    #[instrument(
        skip(self, actor, event),
        fields(actor = %actor.user_id, reference = %event.reference_type, id = %event.reference_id)
    )]
    pub async fn post_business_event(
        &self,
        actor: &Actor,
        event: &BusinessEvent,
    ) -> StoreResult<JournalEntryWithLines> {
        let result = with_deadline("post_business_event", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let posted = post_business_event_in_txn(&txn, &self.ctx, actor, event).await?;
            txn.commit().await?;
            Ok(posted)
        })
        .await;

        match result {
            Err(err) if err.is_unique_violation() => {
                // Lost a race on the business reference index.
                let existing =
                    find_business_reference(&self.db, &event.reference_type, &event.reference_id)
                        .await?;
                Err(match existing {
                    Some(entry) => duplicate_reference(event, entry.code).into(),
                    None => err,
                })
            }
            other => other,
        }
    }

    /// Finds an entry by ID, with lines.
    pub async fn get(&self, entry_id: JournalEntryId) -> StoreResult<JournalEntryWithLines> {
        let entry = journal_entries::Entity::find_by_id(entry_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::entry_not_found(entry_id))?;
        with_lines(&self.db, entry).await
    }

    /// Finds an entry by code, with lines.
    pub async fn get_by_code(&self, code: &str) -> StoreResult<JournalEntryWithLines> {
        let entry = journal_entries::Entity::find()
            .filter(journal_entries::Column::Code.eq(code))
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::EntryNotFound(code.to_string()))?;
        with_lines(&self.db, entry).await
    }

    /// Queries entry headers, newest first.
    pub async fn query(
        &self,
        filter: JournalFilter,
        page: PageRequest,
    ) -> StoreResult<PageResponse<journal_entries::Model>> {
        let mut query = journal_entries::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(
                journal_entries::Column::Status.eq(sea_orm_active_enums::EntryStatus::from(status)),
            );
        }
        if let Some(from) = filter.date_from {
            query = query.filter(journal_entries::Column::EntryDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(journal_entries::Column::EntryDate.lte(to));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(
                journal_entries::Column::Id.in_subquery(
                    Query::select()
                        .column(journal_lines::Column::EntryId)
                        .from(journal_lines::Entity)
                        .and_where(journal_lines::Column::AccountId.eq(account_id.into_inner()))
                        .to_owned(),
                ),
            );
        }
        if let Some(reference_type) = filter.reference_type {
            query = query.filter(journal_entries::Column::ReferenceType.eq(reference_type));
        }
        if let Some(reference_id) = filter.reference_id {
            query = query.filter(journal_entries::Column::ReferenceId.eq(reference_id));
        }
        if let Some(source_type) = filter.source_type {
            query = query.filter(
                journal_entries::Column::SourceType
                    .eq(sea_orm_active_enums::SourceType::from(source_type)),
            );
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(journal_entries::Column::Code.contains(search))
                    .add(journal_entries::Column::Description.contains(search))
                    .add(journal_entries::Column::ReferenceId.contains(search)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let entries = query
            .order_by_desc(journal_entries::Column::EntryDate)
            .order_by_desc(journal_entries::Column::Code)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(entries, page, total))
    }
}

// ============================================================
// Transaction-scoped building blocks, shared with periods and approvals
// ============================================================

pub(crate) async fn create_draft_in_txn(
    txn: &DatabaseTransaction,
    ctx: &LedgerContext,
    actor: &Actor,
    input: &DraftInput,
) -> StoreResult<JournalEntryWithLines> {
    authorize(actor, Capability::CreateEntry)?;
    let totals = validate_draft(input)?;
    check_accounts(txn, &input.lines).await?;

    let entry = insert_entry(txn, ctx, actor, NewEntry::new(input, totals, EntryStatus::Draft)).await?;
    let lines = insert_lines(txn, entry.id, &input.lines).await?;

    audit::record(
        txn,
        AuditRecord::new(actor, AuditOperation::CreateDraft, AuditEntity::JournalEntry, entry.id)
            .created(EntryStatus::Draft)
            .details(entry.code.clone()),
    )
    .await?;

    Ok(JournalEntryWithLines { entry, lines })
}

pub(crate) async fn post_in_txn(
    txn: &DatabaseTransaction,
    ctx: &LedgerContext,
    actor: &Actor,
    entry_id: JournalEntryId,
) -> StoreResult<JournalEntryWithLines> {
    authorize(actor, Capability::PostEntry)?;

    let entry = lock_entry(txn, entry_id).await?;
    if EntryStatus::from(entry.status) != EntryStatus::Draft {
        warn!(code = %entry.code, status = ?entry.status, "post rejected, entry not in draft");
        return Err(LedgerError::AlreadyPosted(entry.code).into());
    }

    let lines = load_lines(txn, entry.id).await?;
    let inputs = to_line_inputs(&lines);
    let totals = revalidate(&entry, &inputs)?;
    check_accounts(txn, &inputs).await?;

    let period = ensure_posting_period(txn, ctx, entry.entry_date).await?;

    let now = Utc::now();
    let code = entry.code.clone();
    let mut active = entry.into_active_model();
    active.status = Set(EntryStatus::Posted.into());
    active.posted_by = Set(Some(actor.user_id.into_inner()));
    active.posted_at = Set(Some(now.into()));
    active.total_debit = Set(totals.debit.minor());
    active.total_credit = Set(totals.credit.minor());
    active.updated_at = Set(now.into());
    let entry = active.update(txn).await?;

    apply_lines(txn, &inputs).await?;

    audit::record(
        txn,
        AuditRecord::new(actor, AuditOperation::PostEntry, AuditEntity::JournalEntry, entry.id)
            .transition(EntryStatus::Draft, EntryStatus::Posted)
            .details(format!("{code} in period {}", period.name)),
    )
    .await?;

    Ok(JournalEntryWithLines { entry, lines })
}

async fn reverse_in_txn(
    txn: &DatabaseTransaction,
    ctx: &LedgerContext,
    actor: &Actor,
    entry_id: JournalEntryId,
    reason: &str,
) -> StoreResult<JournalEntryWithLines> {
    let original = lock_entry(txn, entry_id).await?;
    let original_lines = load_lines(txn, original.id).await?;

    let draft = build_reversal(
        &OriginalEntry {
            code: original.code.clone(),
            status: original.status.into(),
            has_reversal: original.reversed_by_entry_id.is_some(),
            lines: to_line_inputs(&original_lines),
        },
        reason,
        ctx.today(),
    )
    .inspect_err(|err| warn!(code = %original.code, %err, "reversal rejected"))?;
    let totals = validate_lines(&draft.lines)?;
    check_accounts(txn, &draft.lines)
        .await
        .inspect_err(|err| warn!(code = %original.code, %err, "reversal rejected"))?;
    let reason = reason.trim().to_string();

    let period = ensure_posting_period(txn, ctx, draft.entry_date).await?;

    let reversal = insert_entry(
        txn,
        ctx,
        actor,
        NewEntry {
            reverses_entry_id: Some(original.id),
            reversal_reason: Some(reason.clone()),
            ..NewEntry::new(&draft, totals, EntryStatus::Posted)
        },
    )
    .await?;
    let lines = insert_lines(txn, reversal.id, &draft.lines).await?;
    apply_lines(txn, &draft.lines).await?;

    let original_code = original.code.clone();
    let mut active = original.into_active_model();
    active.status = Set(EntryStatus::Reversed.into());
    active.reversed_by_entry_id = Set(Some(reversal.id));
    active.reversal_reason = Set(Some(reason.clone()));
    active.updated_at = Set(Utc::now().into());
    let original = active.update(txn).await?;

    audit::record(
        txn,
        AuditRecord::new(actor, AuditOperation::ReverseEntry, AuditEntity::JournalEntry, original.id)
            .transition(EntryStatus::Posted, EntryStatus::Reversed)
            .reason(Some(&reason))
            .details(format!("reversed by {}", reversal.code)),
    )
    .await?;
    audit::record(
        txn,
        AuditRecord::new(actor, AuditOperation::PostEntry, AuditEntity::JournalEntry, reversal.id)
            .created(EntryStatus::Posted)
            .reason(Some(&reason))
            .details(format!("reverses {original_code} in period {}", period.name)),
    )
    .await?;

    Ok(JournalEntryWithLines {
        entry: reversal,
        lines,
    })
}

pub(crate) async fn post_business_event_in_txn(
    txn: &DatabaseTransaction,
    ctx: &LedgerContext,
    actor: &Actor,
    event: &BusinessEvent,
) -> StoreResult<JournalEntryWithLines> {
    if let Some(existing) =
        find_business_reference(txn, &event.reference_type, &event.reference_id).await?
    {
        warn!(code = %existing.code, "business event already posted");
        return Err(duplicate_reference(event, existing.code).into());
    }

    let draft = create_draft_in_txn(txn, ctx, actor, &event.to_draft()).await?;
    post_in_txn(txn, ctx, actor, draft.id()).await
}

/// Inserts an entry header with a freshly allocated code.
pub(crate) async fn insert_entry(
    txn: &DatabaseTransaction,
    ctx: &LedgerContext,
    actor: &Actor,
    new: NewEntry<'_>,
) -> StoreResult<journal_entries::Model> {
    let code = allocate_code(txn, &ctx.config().entry_code_prefix, new.input.entry_date).await?;
    let (reference_type, reference_id) = split_reference(new.input);
    let now = Utc::now();
    let posted = new.status == EntryStatus::Posted;

    let entry = journal_entries::ActiveModel {
        id: Set(JournalEntryId::new().into_inner()),
        code: Set(code),
        entry_date: Set(new.input.entry_date),
        description: Set(new.input.description.trim().to_string()),
        reference_type: Set(reference_type),
        reference_id: Set(reference_id),
        source_type: Set(new.input.source_type.into()),
        status: Set(new.status.into()),
        total_debit: Set(new.totals.debit.minor()),
        total_credit: Set(new.totals.credit.minor()),
        created_by: Set(actor.user_id.into_inner()),
        posted_by: Set(posted.then(|| actor.user_id.into_inner())),
        posted_at: Set(posted.then(|| now.into())),
        reverses_entry_id: Set(new.reverses_entry_id),
        reversed_by_entry_id: Set(None),
        reversal_reason: Set(new.reversal_reason),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(entry.insert(txn).await?)
}

/// Inserts lines numbered from 0, matching the indexes in validation errors.
pub(crate) async fn insert_lines(
    txn: &DatabaseTransaction,
    entry_id: Uuid,
    lines: &[LineInput],
) -> StoreResult<Vec<journal_lines::Model>> {
    let mut inserted = Vec::with_capacity(lines.len());
    for (line_no, line) in (0..).zip(lines) {
        let row = journal_lines::ActiveModel {
            id: Set(JournalLineId::new().into_inner()),
            entry_id: Set(entry_id),
            line_no: Set(line_no),
            account_id: Set(line.account_id.into_inner()),
            debit: Set(line.debit.minor()),
            credit: Set(line.credit.minor()),
            description: Set(line.description.clone()),
        };
        inserted.push(row.insert(txn).await?);
    }
    Ok(inserted)
}

/// Next code in the entry month's sequence.
///
/// The sequence row is created on first use and row-locked while it is
/// incremented, so codes are unique and increase within a scope.
async fn allocate_code(
    txn: &DatabaseTransaction,
    prefix: &str,
    entry_date: NaiveDate,
) -> StoreResult<String> {
    let scope = sequence_scope(prefix, entry_date);
    let now = Utc::now();

    journal_sequences::Entity::insert(journal_sequences::ActiveModel {
        scope: Set(scope.clone()),
        last_value: Set(0),
        updated_at: Set(now.into()),
    })
    .on_conflict(
        OnConflict::column(journal_sequences::Column::Scope)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(txn)
    .await?;

    let sequence = journal_sequences::Entity::find_by_id(scope.clone())
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| LedgerError::Internal(format!("sequence {scope} missing")))?;

    let next = sequence.last_value + 1;
    journal_sequences::Entity::update_many()
        .col_expr(journal_sequences::Column::LastValue, Expr::value(next))
        .col_expr(journal_sequences::Column::UpdatedAt, Expr::value(now))
        .filter(journal_sequences::Column::Scope.eq(scope.clone()))
        .exec(txn)
        .await?;

    Ok(format_entry_code(&scope, next))
}

pub(crate) async fn lock_entry(
    txn: &DatabaseTransaction,
    entry_id: JournalEntryId,
) -> StoreResult<journal_entries::Model> {
    journal_entries::Entity::find_by_id(entry_id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| LedgerError::entry_not_found(entry_id).into())
}

pub(crate) async fn load_lines<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
) -> StoreResult<Vec<journal_lines::Model>> {
    Ok(journal_lines::Entity::find()
        .filter(journal_lines::Column::EntryId.eq(entry_id))
        .order_by_asc(journal_lines::Column::LineNo)
        .all(conn)
        .await?)
}

async fn with_lines<C: ConnectionTrait>(
    conn: &C,
    entry: journal_entries::Model,
) -> StoreResult<JournalEntryWithLines> {
    let lines = load_lines(conn, entry.id).await?;
    Ok(JournalEntryWithLines { entry, lines })
}

/// Checks that every line's account exists, is postable and active.
pub(crate) async fn check_accounts<C: ConnectionTrait>(
    conn: &C,
    lines: &[LineInput],
) -> StoreResult<()> {
    let snapshots = load_snapshots(conn, lines.iter().map(|l| l.account_id)).await?;
    validate_accounts(lines, &snapshots)?;
    Ok(())
}

async fn find_business_reference<C: ConnectionTrait>(
    conn: &C,
    reference_type: &str,
    reference_id: &str,
) -> StoreResult<Option<journal_entries::Model>> {
    Ok(journal_entries::Entity::find()
        .filter(
            journal_entries::Column::SourceType
                .eq(sea_orm_active_enums::SourceType::from(SourceType::BusinessEvent)),
        )
        .filter(journal_entries::Column::ReferenceType.eq(reference_type))
        .filter(journal_entries::Column::ReferenceId.eq(reference_id))
        .one(conn)
        .await?)
}

fn duplicate_reference(event: &BusinessEvent, entry_code: String) -> LedgerError {
    LedgerError::DuplicateReference {
        reference_type: event.reference_type.clone(),
        reference_id: event.reference_id.clone(),
        entry_code,
    }
}

fn ensure_draft(entry: &journal_entries::Model) -> Result<(), LedgerError> {
    if EntryStatus::from(entry.status).is_editable() {
        Ok(())
    } else {
        warn!(code = %entry.code, status = ?entry.status, "draft change rejected");
        Err(LedgerError::AlreadyPosted(entry.code.clone()))
    }
}

/// Re-checks stored lines before posting.
fn revalidate(entry: &journal_entries::Model, lines: &[LineInput]) -> StoreResult<EntryTotals> {
    let entry_id = JournalEntryId::from_uuid(entry.id);
    let unbalanced = |debit: Money, credit: Money| {
        error!(%entry_id, code = %entry.code, %debit, %credit, "stored entry failed balance re-validation");
        StoreError::from(LedgerError::UnbalancedEntry {
            entry_id,
            debit,
            credit,
        })
    };

    let totals = match validate_lines(lines) {
        Ok(totals) => totals,
        Err(LedgerError::Unbalanced { debit, credit, .. }) => return Err(unbalanced(debit, credit)),
        Err(other) => return Err(other.into()),
    };

    let header = EntryTotals::new(
        Money::from_minor(entry.total_debit),
        Money::from_minor(entry.total_credit),
    );
    if header != totals {
        return Err(unbalanced(header.debit, header.credit));
    }
    Ok(totals)
}

fn split_reference(input: &DraftInput) -> (Option<String>, Option<String>) {
    input.reference.as_ref().map_or((None, None), |r| {
        (
            Some(r.reference_type.trim().to_string()),
            Some(r.reference_id.trim().to_string()),
        )
    })
}

fn to_line_inputs(lines: &[journal_lines::Model]) -> Vec<LineInput> {
    lines
        .iter()
        .map(|l| LineInput {
            account_id: AccountId::from_uuid(l.account_id),
            debit: Money::from_minor(l.debit),
            credit: Money::from_minor(l.credit),
            description: l.description.clone(),
        })
        .collect()
}
