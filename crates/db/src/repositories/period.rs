//! Period repository: monthly periods, closing, reopening and locking.
//!
//! Closing runs as one transaction: ordering and draft checks, replay of
//! revenue and expense as of the period end, the closing entry, the status
//! change with snapshots, provisioning of the next period and the audit
//! record. Any failure rolls all of it back.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use erp_ledger_core::audit::{AuditEntity, AuditOperation, AuditRecord};
use erp_ledger_core::auth::{Actor, Capability, authorize};
use erp_ledger_core::ledger::{
    AccountType, DraftInput, EntryStatus, LedgerError, Reference, SourceType, validate_lines,
};
use erp_ledger_core::period::{
    ClosingBalance, ClosingPlan, ClosingPreview, PeriodAction, PeriodStatus, YearMonth,
    build_closing_plan, closing_description, ensure_open, validate_status_transition,
};
use erp_ledger_shared::types::{AccountId, Money, PageRequest, PageResponse, PeriodId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::OnConflict,
};
use tracing::{info, instrument, warn};

use super::account::find_account_by_code;
use super::audit;
use super::balance::{apply_lines, replayed_balances};
use super::context::{LedgerContext, with_deadline};
use super::error::{StoreError, StoreResult};
use super::journal::{NewEntry, check_accounts, insert_entry, insert_lines};
use crate::entities::{accounting_periods, accounts, journal_entries, sea_orm_active_enums};

/// Reference type carried by closing entries.
pub const CLOSING_REFERENCE_TYPE: &str = "PERIOD_CLOSE";

/// Options for closing a period.
#[derive(Debug, Clone)]
pub struct CloseOptions {
    /// Free-text notes, stored on the audit record.
    pub notes: Option<String>,
    /// Open the following period as part of the close.
    pub provision_next: bool,
}

impl Default for CloseOptions {
    fn default() -> Self {
        Self {
            notes: None,
            provision_next: true,
        }
    }
}

/// Outcome of a period close.
#[derive(Debug, Clone)]
pub struct PeriodCloseResult {
    /// The period after the close.
    pub period: accounting_periods::Model,
    /// The closing entry, absent when nothing needed closing.
    pub closing_entry: Option<journal_entries::Model>,
    /// Revenue closed by this run.
    pub total_revenue: Money,
    /// Expense closed by this run.
    pub total_expense: Money,
    /// Net income moved to retained earnings by this run.
    pub net_income: Money,
    /// Revenue and expense accounts zeroed by this run.
    pub accounts_closed: usize,
}

/// Entry counts and totals for a period.
#[derive(Debug, Clone)]
pub struct PeriodSummary {
    /// The period.
    pub period: accounting_periods::Model,
    /// Entries still in draft.
    pub draft_count: u64,
    /// Posted entries.
    pub posted_count: u64,
    /// Reversed entries.
    pub reversed_count: u64,
    /// Total debit of posted and reversed entries.
    pub total_debit: Money,
    /// Total credit of posted and reversed entries.
    pub total_credit: Money,
}

impl PeriodSummary {
    /// True if posted debits equal posted credits.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// The most recent closed period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastClosingInfo {
    /// Period name.
    pub period: String,
    /// Last day of the period.
    pub end_date: NaiveDate,
    /// First day after it.
    pub next_start_date: NaiveDate,
    /// Net income snapshot.
    pub net_income: Money,
}

/// Filter options for listing periods.
#[derive(Debug, Clone, Default)]
pub struct PeriodFilter {
    /// Filter by year.
    pub year: Option<i32>,
    /// Filter by status.
    pub status: Option<PeriodStatus>,
}

/// Period repository.
#[derive(Debug, Clone)]
pub struct PeriodRepository {
    db: DatabaseConnection,
    ctx: Arc<LedgerContext>,
}

impl PeriodRepository {
    /// Creates a new period repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, ctx: Arc<LedgerContext>) -> Self {
        Self { db, ctx }
    }

    /// The period containing today, created OPEN if missing.
    ///
    /// Safe under concurrent callers: the insert ignores a conflicting row.
    pub async fn get_or_create_current_period(&self) -> StoreResult<accounting_periods::Model> {
        let month = YearMonth::from_date(self.ctx.today());
        with_deadline("get_or_create_current_period", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let period = provision_period(&txn, month).await?;
            txn.commit().await?;
            Ok(period)
        })
        .await
    }

    /// Finds a period.
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound`.
    pub async fn get_period(&self, year: i32, month: u32) -> StoreResult<accounting_periods::Model> {
        let month = year_month(year, month)?;
        find_period(&self.db, month)
            .await?
            .ok_or_else(|| LedgerError::PeriodNotFound(month.name()).into())
    }

    /// Closes a period.
    ///
    /// # Errors
    ///
    /// - `InsufficientPermission` without `ClosePeriod`
    /// - `PeriodNotFound`, `AlreadyClosed`
    /// - `EarlierPeriodsOpen`, `DraftEntriesPending`
    /// - `RetainedEarningsMissing` if there is income to close
    #[instrument(skip(self, actor, options), fields(actor = %actor.user_id))]
    pub async fn close_period(
        &self,
        actor: &Actor,
        year: i32,
        month: u32,
        options: CloseOptions,
    ) -> StoreResult<PeriodCloseResult> {
        authorize(actor, Capability::ClosePeriod)?;
        let month = year_month(year, month)?;

        with_deadline("close_period", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let result = close_in_txn(&txn, &self.ctx, actor, month, &options).await?;
            txn.commit().await?;
            info!(
                period = %result.period.name,
                net_income = %result.net_income,
                closing_entry = ?result.closing_entry.as_ref().map(|e| e.code.as_str()),
                "period closed"
            );
            Ok(result)
        })
        .await
    }

    /// Reopens a CLOSED period. The closing entry stays in place.
    ///
    /// # Errors
    ///
    /// - `ReasonRequired` for a blank reason
    /// - `PeriodLocked` for a LOCKED period, `PeriodNotClosed` for an OPEN one
    #[instrument(skip(self, actor, reason), fields(actor = %actor.user_id))]
    pub async fn reopen_period(
        &self,
        actor: &Actor,
        year: i32,
        month: u32,
        reason: &str,
    ) -> StoreResult<accounting_periods::Model> {
        authorize(actor, Capability::ReopenPeriod)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ReasonRequired.into());
        }
        let month = year_month(year, month)?;

        with_deadline("reopen_period", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let period = lock_period_row(&txn, month).await?;
            let from = PeriodStatus::from(period.status);
            let to = transition(&period.name, from, PeriodAction::Reopen)?;

            let now = Utc::now();
            let mut active = period.into_active_model();
            active.status = Set(to.into());
            active.reopened_at = Set(Some(now.into()));
            active.reopened_by = Set(Some(actor.user_id.into_inner()));
            active.reopen_reason = Set(Some(reason.to_string()));
            active.updated_at = Set(now.into());
            let period = active.update(&txn).await?;

            audit::record(
                &txn,
                AuditRecord::new(actor, AuditOperation::ReopenPeriod, AuditEntity::AccountingPeriod, period.id)
                    .transition(from, to)
                    .reason(Some(reason)),
            )
            .await?;

            txn.commit().await?;
            warn!(period = %period.name, reason, "period reopened");
            Ok(period)
        })
        .await
    }

    /// Locks a CLOSED period permanently.
    ///
    /// # Errors
    ///
    /// `PeriodLocked` if already locked, `PeriodNotClosed` for an OPEN one.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn lock_period(
        &self,
        actor: &Actor,
        year: i32,
        month: u32,
    ) -> StoreResult<accounting_periods::Model> {
        authorize(actor, Capability::LockPeriod)?;
        let month = year_month(year, month)?;

        with_deadline("lock_period", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let period = lock_period_row(&txn, month).await?;
            let from = PeriodStatus::from(period.status);
            let to = transition(&period.name, from, PeriodAction::Lock)?;

            let now = Utc::now();
            let mut active = period.into_active_model();
            active.status = Set(to.into());
            active.locked_at = Set(Some(now.into()));
            active.locked_by = Set(Some(actor.user_id.into_inner()));
            active.updated_at = Set(now.into());
            let period = active.update(&txn).await?;

            audit::record(
                &txn,
                AuditRecord::new(actor, AuditOperation::LockPeriod, AuditEntity::AccountingPeriod, period.id)
                    .transition(from, to),
            )
            .await?;

            txn.commit().await?;
            info!(period = %period.name, "period locked");
            Ok(period)
        })
        .await
    }

    /// Entry counts and posted totals for a period.
    pub async fn get_period_summary(&self, year: i32, month: u32) -> StoreResult<PeriodSummary> {
        let period = self.get_period(year, month).await?;

        let entries = journal_entries::Entity::find()
            .filter(journal_entries::Column::EntryDate.gte(period.start_date))
            .filter(journal_entries::Column::EntryDate.lte(period.end_date))
            .all(&self.db)
            .await?;

        let mut summary = PeriodSummary {
            period,
            draft_count: 0,
            posted_count: 0,
            reversed_count: 0,
            total_debit: Money::ZERO,
            total_credit: Money::ZERO,
        };
        for entry in entries {
            let status = EntryStatus::from(entry.status);
            match status {
                EntryStatus::Draft => summary.draft_count += 1,
                EntryStatus::Posted => summary.posted_count += 1,
                EntryStatus::Reversed => summary.reversed_count += 1,
            }
            if status.affects_balances() {
                summary.total_debit += Money::from_minor(entry.total_debit);
                summary.total_credit += Money::from_minor(entry.total_credit);
            }
        }

        Ok(summary)
    }

    /// What closing the period would do, and what blocks it.
    pub async fn preview_closing(&self, year: i32, month: u32) -> StoreResult<ClosingPreview> {
        let month = year_month(year, month)?;
        let period = find_period(&self.db, month)
            .await?
            .ok_or_else(|| LedgerError::PeriodNotFound(month.name()))?;

        let mut blockers = Vec::new();
        let status = PeriodStatus::from(period.status);
        if status != PeriodStatus::Open {
            blockers.push(format!("period {} is {status}", period.name));
        }
        if let Some(earlier) = earliest_open_before(&self.db, month).await? {
            blockers.push(format!("earlier period {} is still open", earlier.name));
        }
        let drafts = count_drafts(&self.db, &period).await?;
        if drafts > 0 {
            blockers.push(format!("{drafts} draft entries pending"));
        }

        let balances = closing_balances(&self.db, period.end_date).await?;
        let has_income = balances.iter().any(|b| !b.balance.is_zero());
        let re_code = &self.ctx.config().retained_earnings_code;
        if has_income {
            match find_account_by_code(&self.db, re_code).await {
                Err(StoreError::Ledger(LedgerError::AccountNotFound(_))) => {
                    blockers.push(format!("retained earnings account {re_code} not found"));
                }
                other => {
                    other?;
                }
            }
        }

        Ok(ClosingPreview::new(period.name, &balances, blockers))
    }

    /// The latest CLOSED or LOCKED period, if any.
    pub async fn last_closing_info(&self) -> StoreResult<Option<LastClosingInfo>> {
        let latest = latest_closed(&self.db).await?;
        Ok(latest.map(|p| LastClosingInfo {
            next_start_date: p.end_date.succ_opt().unwrap_or(p.end_date),
            end_date: p.end_date,
            net_income: Money::from_minor(p.net_income.unwrap_or_default()),
            period: p.name,
        }))
    }

    /// True if the date falls in a CLOSED or LOCKED period.
    pub async fn is_date_in_closed_period(&self, date: NaiveDate) -> StoreResult<bool> {
        let period = find_period(&self.db, YearMonth::from_date(date)).await?;
        Ok(period.is_some_and(|p| PeriodStatus::from(p.status).is_closed()))
    }

    /// Lists periods, newest first.
    pub async fn list_periods(
        &self,
        filter: PeriodFilter,
        page: PageRequest,
    ) -> StoreResult<PageResponse<accounting_periods::Model>> {
        let mut query = accounting_periods::Entity::find();
        if let Some(year) = filter.year {
            query = query.filter(accounting_periods::Column::Year.eq(year));
        }
        if let Some(status) = filter.status {
            query = query.filter(
                accounting_periods::Column::Status.eq(sea_orm_active_enums::PeriodStatus::from(status)),
            );
        }

        let total = query.clone().count(&self.db).await?;
        let periods = query
            .order_by_desc(accounting_periods::Column::Year)
            .order_by_desc(accounting_periods::Column::Month)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(periods, page, total))
    }
}

async fn close_in_txn(
    txn: &DatabaseTransaction,
    ctx: &LedgerContext,
    actor: &Actor,
    month: YearMonth,
    options: &CloseOptions,
) -> StoreResult<PeriodCloseResult> {
    let period = lock_period_row(txn, month).await?;
    let from = PeriodStatus::from(period.status);
    let to = transition(&period.name, from, PeriodAction::Close)?;

    if let Some(earlier) = earliest_open_before(txn, month).await? {
        warn!(period = %period.name, earlier = %earlier.name, "close rejected, earlier period open");
        return Err(LedgerError::EarlierPeriodsOpen {
            period: period.name,
            earliest_open: earlier.name,
        }
        .into());
    }

    let drafts = count_drafts(txn, &period).await?;
    if drafts > 0 {
        warn!(period = %period.name, drafts, "close rejected, drafts pending");
        return Err(LedgerError::DraftEntriesPending {
            period: period.name,
            count: drafts,
        }
        .into());
    }

    let balances = closing_balances(txn, period.end_date).await?;
    let plan = if balances.iter().all(|b| b.balance.is_zero()) {
        ClosingPlan::default()
    } else {
        let re_code = &ctx.config().retained_earnings_code;
        let retained = match find_account_by_code(txn, re_code).await {
            Err(StoreError::Ledger(LedgerError::AccountNotFound(_))) => {
                return Err(LedgerError::RetainedEarningsMissing(re_code.clone()).into());
            }
            other => other?,
        };
        build_closing_plan(&balances, AccountId::from_uuid(retained.id))?
    };

    let closing_entry = if plan.is_empty() {
        None
    } else {
        Some(post_closing_entry(txn, ctx, actor, &period, &plan).await?)
    };

    let now = Utc::now();
    let accumulate = |prior: Option<i64>, amount: Money| prior.unwrap_or_default() + amount.minor();
    let net_income = accumulate(period.net_income, plan.net_income);
    let total_revenue = accumulate(period.total_revenue, plan.total_revenue);
    let total_expense = accumulate(period.total_expense, plan.total_expense);
    let prior_closing = period.closing_entry_id;

    let mut active = period.into_active_model();
    active.status = Set(to.into());
    active.closed_at = Set(Some(now.into()));
    active.closed_by = Set(Some(actor.user_id.into_inner()));
    active.net_income = Set(Some(net_income));
    active.total_revenue = Set(Some(total_revenue));
    active.total_expense = Set(Some(total_expense));
    active.closing_entry_id = Set(closing_entry.as_ref().map(|e| e.id).or(prior_closing));
    active.updated_at = Set(now.into());
    let period = active.update(txn).await?;

    let mut details = format!(
        "revenue {}, expense {}, net income {}",
        plan.total_revenue, plan.total_expense, plan.net_income
    );
    if let Some(entry) = &closing_entry {
        details.push_str(&format!(", closing entry {}", entry.code));
    }
    audit::record(
        txn,
        AuditRecord::new(actor, AuditOperation::ClosePeriod, AuditEntity::AccountingPeriod, period.id)
            .transition(from, to)
            .reason(options.notes.as_deref())
            .details(details),
    )
    .await?;

    if options.provision_next {
        provision_period(txn, month.next()).await?;
    }

    Ok(PeriodCloseResult {
        period,
        closing_entry,
        total_revenue: plan.total_revenue,
        total_expense: plan.total_expense,
        net_income: plan.net_income,
        accounts_closed: plan.accounts_closed,
    })
}

/// Posts the closing entry on the period end date.
async fn post_closing_entry(
    txn: &DatabaseTransaction,
    ctx: &LedgerContext,
    actor: &Actor,
    period: &accounting_periods::Model,
    plan: &ClosingPlan,
) -> StoreResult<journal_entries::Model> {
    let draft = DraftInput {
        entry_date: period.end_date,
        description: closing_description(&period.name),
        reference: Some(Reference::new(CLOSING_REFERENCE_TYPE, period.name.clone())),
        source_type: SourceType::Closing,
        lines: plan.lines.clone(),
    };
    let totals = validate_lines(&draft.lines)?;
    check_accounts(txn, &draft.lines).await?;

    let entry = insert_entry(txn, ctx, actor, NewEntry::new(&draft, totals, EntryStatus::Posted)).await?;
    insert_lines(txn, entry.id, &draft.lines).await?;
    apply_lines(txn, &draft.lines).await?;

    audit::record(
        txn,
        AuditRecord::new(actor, AuditOperation::PostEntry, AuditEntity::JournalEntry, entry.id)
            .created(EntryStatus::Posted)
            .details(format!("closing entry {} for period {}", entry.code, period.name)),
    )
    .await?;

    Ok(entry)
}

/// Finds the OPEN period for a posting date, provisioning it if missing.
///
/// An existing period is read under a shared lock so a concurrent close
/// waits for the posting transaction.
pub(crate) async fn ensure_posting_period(
    txn: &DatabaseTransaction,
    ctx: &LedgerContext,
    date: NaiveDate,
) -> StoreResult<accounting_periods::Model> {
    let month = YearMonth::from_date(date);

    let existing = period_query(month).lock_shared().one(txn).await?;
    if let Some(period) = existing {
        ensure_open(&period.name, period.status.into())
            .inspect_err(|_| warn!(period = %period.name, %date, "posting rejected, period closed"))?;
        return Ok(period);
    }

    let latest_closed_end = latest_closed(txn).await?.map(|p| p.end_date);
    ctx.window()
        .check(date, ctx.today(), latest_closed_end)
        .inspect_err(|_| warn!(%date, "posting rejected, date outside posting window"))?;

    let period = provision_period(txn, month).await?;
    ensure_open(&period.name, period.status.into())?;
    Ok(period)
}

/// Inserts the period OPEN unless it exists, then returns the stored row.
async fn provision_period(
    txn: &DatabaseTransaction,
    month: YearMonth,
) -> StoreResult<accounting_periods::Model> {
    let now = Utc::now();
    let inserted = accounting_periods::Entity::insert(accounting_periods::ActiveModel {
        id: Set(PeriodId::new().into_inner()),
        year: Set(month.year()),
        month: Set(month_number(month)),
        name: Set(month.name()),
        start_date: Set(month.start_date()),
        end_date: Set(month.end_date()),
        status: Set(PeriodStatus::Open.into()),
        closed_at: Set(None),
        closed_by: Set(None),
        net_income: Set(None),
        total_revenue: Set(None),
        total_expense: Set(None),
        closing_entry_id: Set(None),
        reopened_at: Set(None),
        reopened_by: Set(None),
        reopen_reason: Set(None),
        locked_at: Set(None),
        locked_by: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    })
    .on_conflict(
        OnConflict::columns([
            accounting_periods::Column::Year,
            accounting_periods::Column::Month,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(txn)
    .await?;

    if inserted > 0 {
        info!(period = %month, "period provisioned");
    }

    find_period(txn, month)
        .await?
        .ok_or_else(|| StoreError::from(LedgerError::Internal(format!("period {month} missing after insert"))))
}

fn period_query(month: YearMonth) -> sea_orm::Select<accounting_periods::Entity> {
    accounting_periods::Entity::find()
        .filter(accounting_periods::Column::Year.eq(month.year()))
        .filter(accounting_periods::Column::Month.eq(month_number(month)))
}

async fn find_period<C: ConnectionTrait>(
    conn: &C,
    month: YearMonth,
) -> StoreResult<Option<accounting_periods::Model>> {
    Ok(period_query(month).one(conn).await?)
}

async fn lock_period_row(
    txn: &DatabaseTransaction,
    month: YearMonth,
) -> StoreResult<accounting_periods::Model> {
    period_query(month)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| LedgerError::PeriodNotFound(month.name()).into())
}

async fn earliest_open_before<C: ConnectionTrait>(
    conn: &C,
    month: YearMonth,
) -> StoreResult<Option<accounting_periods::Model>> {
    let before = Condition::any()
        .add(accounting_periods::Column::Year.lt(month.year()))
        .add(
            Condition::all()
                .add(accounting_periods::Column::Year.eq(month.year()))
                .add(accounting_periods::Column::Month.lt(month_number(month))),
        );

    Ok(accounting_periods::Entity::find()
        .filter(before)
        .filter(
            accounting_periods::Column::Status
                .eq(sea_orm_active_enums::PeriodStatus::from(PeriodStatus::Open)),
        )
        .order_by_asc(accounting_periods::Column::Year)
        .order_by_asc(accounting_periods::Column::Month)
        .one(conn)
        .await?)
}

async fn latest_closed<C: ConnectionTrait>(conn: &C) -> StoreResult<Option<accounting_periods::Model>> {
    let closed: Vec<sea_orm_active_enums::PeriodStatus> =
        vec![PeriodStatus::Closed.into(), PeriodStatus::Locked.into()];

    Ok(accounting_periods::Entity::find()
        .filter(accounting_periods::Column::Status.is_in(closed))
        .order_by_desc(accounting_periods::Column::Year)
        .order_by_desc(accounting_periods::Column::Month)
        .one(conn)
        .await?)
}

async fn count_drafts<C: ConnectionTrait>(
    conn: &C,
    period: &accounting_periods::Model,
) -> StoreResult<u64> {
    Ok(journal_entries::Entity::find()
        .filter(
            journal_entries::Column::Status
                .eq(sea_orm_active_enums::EntryStatus::from(EntryStatus::Draft)),
        )
        .filter(journal_entries::Column::EntryDate.gte(period.start_date))
        .filter(journal_entries::Column::EntryDate.lte(period.end_date))
        .count(conn)
        .await?)
}

/// Revenue and expense balances replayed as of `end_date`.
async fn closing_balances<C: ConnectionTrait>(
    conn: &C,
    end_date: NaiveDate,
) -> StoreResult<Vec<ClosingBalance>> {
    let temporary: Vec<sea_orm_active_enums::AccountType> =
        vec![AccountType::Revenue.into(), AccountType::Expense.into()];

    let accounts = accounts::Entity::find()
        .filter(accounts::Column::IsHeader.eq(false))
        .filter(accounts::Column::AccountType.is_in(temporary))
        .order_by_asc(accounts::Column::Code)
        .all(conn)
        .await?;
    let replayed = replayed_balances(conn, &accounts, end_date).await?;

    Ok(accounts
        .into_iter()
        .map(|a| ClosingBalance {
            account_id: AccountId::from_uuid(a.id),
            balance: replayed.get(&a.id).copied().unwrap_or(Money::ZERO),
            account_type: a.account_type.into(),
            code: a.code,
        })
        .collect())
}

fn transition(
    period_name: &str,
    from: PeriodStatus,
    action: PeriodAction,
) -> Result<PeriodStatus, LedgerError> {
    validate_status_transition(period_name, from, action).inspect_err(|err| {
        warn!(period = period_name, action = action.as_str(), %err, "period transition rejected");
    })
}

fn year_month(year: i32, month: u32) -> Result<YearMonth, LedgerError> {
    YearMonth::new(year, month)
        .ok_or_else(|| LedgerError::invalid(format!("invalid period {year}-{month:02}")))
}

fn month_number(month: YearMonth) -> i32 {
    i32::try_from(month.month()).unwrap_or_default()
}
