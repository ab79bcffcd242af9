//! Balance engine.
//!
//! `accounts.balance` is a cache of posted journal lines. It changes only
//! through [`apply_lines`] inside a posting transaction and is checked
//! against a full replay of the journal by the reconciliation methods.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use erp_ledger_core::audit::{AuditEntity, AuditOperation, AuditRecord};
use erp_ledger_core::auth::{Actor, Capability, authorize};
use erp_ledger_core::ledger::{
    AccountType, BalanceCheck, EntryStatus, LedgerError, LineInput, TrialBalance, TrialBalanceRow,
    aggregate_by_account, replay,
};
use erp_ledger_shared::types::{AccountId, Money};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
    sea_query::{Expr, JoinType},
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::account::{find_account, rollup};
use super::audit;
use super::context::{LedgerContext, with_deadline};
use super::error::StoreResult;
use crate::entities::{accounts, journal_entries, journal_lines, sea_orm_active_enums};

/// Applies posted lines to stored balances.
///
/// Lines are aggregated per account and accounts are row-locked in
/// ascending id order before their balance is adjusted by the normal-side
/// delta. Must run inside the posting transaction.
pub(crate) async fn apply_lines(txn: &DatabaseTransaction, lines: &[LineInput]) -> StoreResult<()> {
    let totals = aggregate_by_account(lines)?;
    let now = Utc::now();

    for (account_id, sums) in totals {
        let account = accounts::Entity::find_by_id(account_id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(account_id))?;

        let delta = sums.delta_for(account.account_type.into());
        if delta.is_zero() {
            continue;
        }
        Money::from_minor(account.balance)
            .checked_add(delta)
            .ok_or(LedgerError::BalanceOverflow(account_id))?;

        accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(delta.minor()),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
            .filter(accounts::Column::Id.eq(account.id))
            .exec(txn)
            .await?;

        debug!(account = %account.code, delta = %delta, "balance applied");
    }

    Ok(())
}

/// Lines of posted or reversed entries, optionally for one account and up
/// to a date.
async fn posted_lines<C: ConnectionTrait>(
    conn: &C,
    account_id: Option<Uuid>,
    as_of: Option<NaiveDate>,
) -> StoreResult<Vec<journal_lines::Model>> {
    let posted: Vec<sea_orm_active_enums::EntryStatus> =
        vec![EntryStatus::Posted.into(), EntryStatus::Reversed.into()];

    let mut query = journal_lines::Entity::find()
        .join(JoinType::InnerJoin, journal_lines::Relation::JournalEntries.def())
        .filter(journal_entries::Column::Status.is_in(posted));

    if let Some(account_id) = account_id {
        query = query.filter(journal_lines::Column::AccountId.eq(account_id));
    }
    if let Some(as_of) = as_of {
        query = query.filter(journal_entries::Column::EntryDate.lte(as_of));
    }

    Ok(query.all(conn).await?)
}

/// Replays balances of `accounts` from `lines`; lines on other accounts
/// are ignored.
fn replay_all(
    accounts: &[accounts::Model],
    lines: &[journal_lines::Model],
) -> HashMap<Uuid, Money> {
    let types: HashMap<Uuid, AccountType> = accounts
        .iter()
        .map(|a| (a.id, AccountType::from(a.account_type)))
        .collect();

    let mut pairs: HashMap<Uuid, Vec<(Money, Money)>> = HashMap::new();
    for line in lines {
        pairs
            .entry(line.account_id)
            .or_default()
            .push((Money::from_minor(line.debit), Money::from_minor(line.credit)));
    }

    pairs
        .into_iter()
        .filter_map(|(id, pairs)| types.get(&id).map(|ty| (id, replay(*ty, pairs))))
        .collect()
}

/// Replayed balances of `accounts` as of `as_of`, keyed by account id.
pub(crate) async fn replayed_balances<C: ConnectionTrait>(
    conn: &C,
    accounts: &[accounts::Model],
    as_of: NaiveDate,
) -> StoreResult<HashMap<Uuid, Money>> {
    let lines = posted_lines(conn, None, Some(as_of)).await?;
    Ok(replay_all(accounts, &lines))
}

/// Recomputes one non-header account inside `conn`.
async fn recompute_leaf<C: ConnectionTrait>(
    conn: &C,
    account: &accounts::Model,
    as_of: Option<NaiveDate>,
) -> StoreResult<Money> {
    let lines = posted_lines(conn, Some(account.id), as_of).await?;
    Ok(replay(
        account.account_type.into(),
        lines
            .iter()
            .map(|l| (Money::from_minor(l.debit), Money::from_minor(l.credit))),
    ))
}

fn check_of(account: &accounts::Model, recomputed: Money) -> BalanceCheck {
    BalanceCheck {
        account_id: AccountId::from_uuid(account.id),
        code: account.code.clone(),
        stored: Money::from_minor(account.balance),
        recomputed,
    }
}

/// Reconciliation and reporting over stored balances.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
    ctx: Arc<LedgerContext>,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, ctx: Arc<LedgerContext>) -> Self {
        Self { db, ctx }
    }

    /// Replays the balance of an account from posted lines dated on or
    /// before `as_of`.
    ///
    /// Reversed entries are included; their reversing entries offset them.
    /// A header account returns the sum over its non-header descendants.
    pub async fn recompute_from_scratch(
        &self,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> StoreResult<Money> {
        let account = find_account(&self.db, account_id).await?;
        if !account.is_header {
            return recompute_leaf(&self.db, &account, Some(as_of)).await;
        }

        let all = accounts::Entity::find().all(&self.db).await?;
        let lines = posted_lines(&self.db, None, Some(as_of)).await?;
        let replayed = replay_all(&all, &lines);

        // Roll the replayed values up the same tree the stored balances use.
        let replayed_tree: Vec<accounts::Model> = all
            .into_iter()
            .map(|mut a| {
                a.balance = replayed.get(&a.id).copied().unwrap_or(Money::ZERO).minor();
                a
            })
            .collect();
        Ok(rollup(account.id, &replayed_tree))
    }

    /// Stored versus recomputed balance of one non-header account.
    pub async fn check_account(&self, account_id: AccountId) -> StoreResult<BalanceCheck> {
        let account = find_account(&self.db, account_id).await?;
        if account.is_header {
            return Err(LedgerError::invalid(format!(
                "account {} is a header account and has no stored balance",
                account.code
            ))
            .into());
        }
        let recomputed = recompute_leaf(&self.db, &account, None).await?;
        Ok(check_of(&account, recomputed))
    }

    /// Every non-header account whose stored balance drifted from the
    /// journal, ordered by code.
    #[instrument(skip(self))]
    pub async fn find_inconsistent_accounts(&self) -> StoreResult<Vec<BalanceCheck>> {
        let all = accounts::Entity::find()
            .filter(accounts::Column::IsHeader.eq(false))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await?;
        let lines = posted_lines(&self.db, None, None).await?;
        let replayed = replay_all(&all, &lines);

        let drifted: Vec<BalanceCheck> = all
            .iter()
            .map(|a| check_of(a, replayed.get(&a.id).copied().unwrap_or(Money::ZERO)))
            .filter(|check| !check.is_consistent())
            .collect();

        for check in &drifted {
            warn!(
                account = %check.code,
                stored = %check.stored,
                recomputed = %check.recomputed,
                "stored balance drifted from journal"
            );
        }
        Ok(drifted)
    }

    /// Overwrites drifted stored balances with the replayed value.
    ///
    /// Each account is row-locked in ascending id order and recomputed
    /// inside the transaction; one audit record is written per repaired
    /// account. Returns the accounts that were repaired.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientPermission` without `RepairBalances`.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id))]
    pub async fn repair_balances(&self, actor: &Actor) -> StoreResult<Vec<BalanceCheck>> {
        authorize(actor, Capability::RepairBalances)?;

        with_deadline("repair_balances", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;

            let ids: Vec<Uuid> = accounts::Entity::find()
                .select_only()
                .column(accounts::Column::Id)
                .filter(accounts::Column::IsHeader.eq(false))
                .order_by_asc(accounts::Column::Id)
                .into_tuple()
                .all(&txn)
                .await?;

            let mut repaired = Vec::new();
            for id in ids {
                let Some(account) = accounts::Entity::find_by_id(id)
                    .lock_exclusive()
                    .one(&txn)
                    .await?
                else {
                    continue;
                };

                let recomputed = recompute_leaf(&txn, &account, None).await?;
                let check = check_of(&account, recomputed);
                if check.is_consistent() {
                    continue;
                }

                accounts::Entity::update_many()
                    .col_expr(accounts::Column::Balance, Expr::value(recomputed.minor()))
                    .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(accounts::Column::Id.eq(account.id))
                    .exec(&txn)
                    .await?;

                audit::record(
                    &txn,
                    AuditRecord::new(actor, AuditOperation::RepairBalance, AuditEntity::Account, account.id)
                        .details(format!(
                            "account {}: stored {} replaced by recomputed {}",
                            check.code, check.stored, check.recomputed
                        )),
                )
                .await?;

                warn!(
                    account = %check.code,
                    stored = %check.stored,
                    recomputed = %check.recomputed,
                    "stored balance repaired"
                );
                repaired.push(check);
            }

            txn.commit().await?;
            info!(repaired = repaired.len(), "balance repair finished");
            Ok(repaired)
        })
        .await
    }

    /// Trial balance over all non-header accounts, ordered by code.
    pub async fn trial_balance(&self) -> StoreResult<TrialBalance> {
        let rows = accounts::Entity::find()
            .filter(accounts::Column::IsHeader.eq(false))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|a| {
                TrialBalanceRow::from_balance(
                    AccountId::from_uuid(a.id),
                    a.code,
                    a.name,
                    a.account_type.into(),
                    Money::from_minor(a.balance),
                )
            })
            .collect();

        Ok(TrialBalance::from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(ty: sea_orm_active_enums::AccountType) -> accounts::Model {
        let now = Utc::now().into();
        accounts::Model {
            id: Uuid::now_v7(),
            code: "X".into(),
            name: "X".into(),
            account_type: ty,
            parent_id: None,
            is_header: false,
            balance: 0,
            is_active: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(account_id: Uuid, debit: i64, credit: i64) -> journal_lines::Model {
        journal_lines::Model {
            id: Uuid::now_v7(),
            entry_id: Uuid::nil(),
            line_no: 0,
            account_id,
            debit,
            credit,
            description: None,
        }
    }

    #[test]
    fn test_replay_all_uses_normal_side() {
        let cash = account(sea_orm_active_enums::AccountType::Asset);
        let sales = account(sea_orm_active_enums::AccountType::Revenue);
        let lines = vec![
            line(cash.id, 1_000, 0),
            line(sales.id, 0, 1_000),
            line(cash.id, 0, 250),
        ];

        let replayed = replay_all(&[cash.clone(), sales.clone()], &lines);
        assert_eq!(replayed[&cash.id], Money::from_minor(750));
        assert_eq!(replayed[&sales.id], Money::from_minor(1_000));
    }

    #[test]
    fn test_check_of_reports_drift() {
        let mut cash = account(sea_orm_active_enums::AccountType::Asset);
        cash.balance = 1_100;
        let check = check_of(&cash, Money::from_minor(1_000));
        assert!(!check.is_consistent());
        assert_eq!(check.drift(), Money::from_minor(100));
    }
}
