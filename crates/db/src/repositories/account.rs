//! Account repository for chart of accounts database operations.

use std::collections::HashMap;

use chrono::Utc;
use erp_ledger_core::ledger::{AccountSnapshot, AccountType, EntryStatus, LedgerError};
use erp_ledger_core::period::PeriodStatus;
use erp_ledger_shared::types::{AccountId, Money};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    sea_query::JoinType,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::error::StoreResult;
use crate::entities::{
    accounting_periods, accounts, journal_entries, journal_lines, sea_orm_active_enums,
};

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Account code, unique across the chart.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Parent header account.
    pub parent_id: Option<AccountId>,
    /// Aggregation node that never takes lines.
    pub is_header: bool,
}

impl CreateAccountInput {
    /// A postable account.
    #[must_use]
    pub fn leaf(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            parent_id: None,
            is_header: false,
        }
    }

    /// A header account.
    #[must_use]
    pub fn header(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            is_header: true,
            ..Self::leaf(code, name, account_type)
        }
    }

    /// Places the account under a header.
    #[must_use]
    pub const fn under(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Filter by account type.
    pub account_type: Option<AccountType>,
    /// Filter by header flag.
    pub is_header: Option<bool>,
    /// Filter by active status.
    pub is_active: Option<bool>,
    /// Filter by parent ID (`Some(None)` = root accounts only).
    pub parent_id: Option<Option<AccountId>>,
    /// Case-sensitive substring of code or name.
    pub search: Option<String>,
    /// Include soft-deleted accounts.
    pub include_deleted: bool,
}

/// Account repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub async fn get(&self, id: AccountId) -> StoreResult<accounts::Model> {
        find_account(&self.db, id).await
    }

    /// Finds an account by code.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub async fn get_by_code(&self, code: &str) -> StoreResult<accounts::Model> {
        find_account_by_code(&self.db, code).await
    }

    /// Lists accounts ordered by code.
    pub async fn list(&self, filter: AccountFilter) -> StoreResult<Vec<accounts::Model>> {
        let mut query = accounts::Entity::find().order_by_asc(accounts::Column::Code);

        if let Some(account_type) = filter.account_type {
            query = query.filter(
                accounts::Column::AccountType.eq(sea_orm_active_enums::AccountType::from(account_type)),
            );
        }
        if let Some(is_header) = filter.is_header {
            query = query.filter(accounts::Column::IsHeader.eq(is_header));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(accounts::Column::IsActive.eq(is_active));
        }
        match filter.parent_id {
            Some(Some(parent)) => {
                query = query.filter(accounts::Column::ParentId.eq(parent.into_inner()));
            }
            Some(None) => query = query.filter(accounts::Column::ParentId.is_null()),
            None => {}
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(accounts::Column::Code.contains(search))
                    .add(accounts::Column::Name.contains(search)),
            );
        }
        if !filter.include_deleted {
            query = query.filter(accounts::Column::DeletedAt.is_null());
        }

        Ok(query.all(&self.db).await?)
    }

    /// Creates a new account.
    ///
    /// # Errors
    ///
    /// - `DuplicateAccountCode` if the code is taken
    /// - `AccountNotFound` if the parent does not exist
    /// - `Validation` if the parent is not a header account
    pub async fn create_account(&self, input: CreateAccountInput) -> StoreResult<accounts::Model> {
        let code = input.code.trim().to_string();
        let name = input.name.trim().to_string();
        if code.is_empty() || name.is_empty() {
            return Err(LedgerError::invalid("account code and name are required").into());
        }

        let existing = accounts::Entity::find()
            .filter(accounts::Column::Code.eq(&code))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(LedgerError::DuplicateAccountCode(code).into());
        }

        if let Some(parent_id) = input.parent_id {
            let parent = find_account(&self.db, parent_id).await?;
            if !parent.is_header {
                return Err(LedgerError::invalid(format!(
                    "parent account {} is not a header account",
                    parent.code
                ))
                .into());
            }
        }

        let now = Utc::now().into();
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            code: Set(code),
            name: Set(name),
            account_type: Set(input.account_type.into()),
            parent_id: Set(input.parent_id.map(AccountId::into_inner)),
            is_header: Set(input.is_header),
            balance: Set(0),
            is_active: Set(true),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let account = account.insert(&self.db).await?;
        info!(account_id = %account.id, code = %account.code, "account created");
        Ok(account)
    }

    /// Changes an account's type while no posted line references it.
    ///
    /// # Errors
    ///
    /// Returns `AccountTypeLocked` once a posted or reversed entry uses
    /// the account.
    pub async fn change_account_type(
        &self,
        id: AccountId,
        account_type: AccountType,
    ) -> StoreResult<accounts::Model> {
        let account = find_account(&self.db, id).await?;
        if AccountType::from(account.account_type) == account_type {
            return Ok(account);
        }

        let posted_lines = journal_lines::Entity::find()
            .join(JoinType::InnerJoin, journal_lines::Relation::JournalEntries.def())
            .filter(journal_lines::Column::AccountId.eq(id.into_inner()))
            .filter(
                journal_entries::Column::Status
                    .ne(sea_orm_active_enums::EntryStatus::from(EntryStatus::Draft)),
            )
            .count(&self.db)
            .await?;
        if posted_lines > 0 {
            return Err(LedgerError::AccountTypeLocked(account.code).into());
        }

        let mut active = account.into_active_model();
        active.account_type = Set(account_type.into());
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Renames an account.
    pub async fn rename_account(&self, id: AccountId, name: &str) -> StoreResult<accounts::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::invalid("account name is required").into());
        }

        let mut active = find_account(&self.db, id).await?.into_active_model();
        active.name = Set(name.to_string());
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Soft-deletes an account. Its history stays; it takes no new lines.
    ///
    /// Posted lines dated outside every closed period may still be picked
    /// up by a closing entry, so the account must not have any.
    ///
    /// # Errors
    ///
    /// Returns a validation error while the stored balance is not zero or
    /// the account has activity in a period that is not closed.
    pub async fn deactivate_account(&self, id: AccountId) -> StoreResult<accounts::Model> {
        let account = find_account(&self.db, id).await?;
        if account.balance != 0 {
            return Err(LedgerError::invalid(format!(
                "account {} has a non-zero balance of {}",
                account.code,
                Money::from_minor(account.balance)
            ))
            .into());
        }

        let unclosed = count_unclosed_lines(&self.db, account.id).await?;
        if unclosed > 0 {
            warn!(code = %account.code, unclosed, "deactivation rejected, activity not closed");
            return Err(LedgerError::invalid(format!(
                "account {} has {unclosed} posted line(s) in periods that are not closed",
                account.code
            ))
            .into());
        }

        let now = Utc::now();
        let mut active = account.into_active_model();
        active.is_active = Set(false);
        active.deleted_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());
        let account = active.update(&self.db).await?;
        info!(account_id = %account.id, code = %account.code, "account deactivated");
        Ok(account)
    }

    /// Balance of an account; for a header, the sum over its non-header
    /// descendants.
    pub async fn header_balance(&self, id: AccountId) -> StoreResult<Money> {
        let root = find_account(&self.db, id).await?;
        if !root.is_header {
            return Ok(Money::from_minor(root.balance));
        }

        let all = accounts::Entity::find().all(&self.db).await?;
        Ok(rollup(root.id, &all))
    }
}

/// Sums non-header descendants of `root` using the parent links in `all`.
pub(crate) fn rollup(root: Uuid, all: &[accounts::Model]) -> Money {
    let mut children: HashMap<Uuid, Vec<&accounts::Model>> = HashMap::new();
    for account in all {
        if let Some(parent) = account.parent_id {
            children.entry(parent).or_default().push(account);
        }
    }

    let mut total = Money::ZERO;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        for child in children.get(&node).map(Vec::as_slice).unwrap_or_default() {
            if child.is_header {
                stack.push(child.id);
            } else {
                total += Money::from_minor(child.balance);
            }
        }
    }
    total
}

/// Posted or reversed lines on `account_id` dated outside every CLOSED or
/// LOCKED period.
async fn count_unclosed_lines<C: ConnectionTrait>(conn: &C, account_id: Uuid) -> StoreResult<u64> {
    let closed: Vec<sea_orm_active_enums::PeriodStatus> =
        vec![PeriodStatus::Closed.into(), PeriodStatus::Locked.into()];
    let closed_periods = accounting_periods::Entity::find()
        .filter(accounting_periods::Column::Status.is_in(closed))
        .all(conn)
        .await?;

    let outside_closed = closed_periods
        .iter()
        .fold(Condition::all(), |cond, p| {
            cond.add(journal_entries::Column::EntryDate.not_between(p.start_date, p.end_date))
        });

    Ok(journal_lines::Entity::find()
        .join(JoinType::InnerJoin, journal_lines::Relation::JournalEntries.def())
        .filter(journal_lines::Column::AccountId.eq(account_id))
        .filter(
            journal_entries::Column::Status
                .ne(sea_orm_active_enums::EntryStatus::from(EntryStatus::Draft)),
        )
        .filter(outside_closed)
        .count(conn)
        .await?)
}

pub(crate) async fn find_account<C: ConnectionTrait>(
    conn: &C,
    id: AccountId,
) -> StoreResult<accounts::Model> {
    accounts::Entity::find_by_id(id.into_inner())
        .one(conn)
        .await?
        .ok_or_else(|| LedgerError::account_not_found(id).into())
}

pub(crate) async fn find_account_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> StoreResult<accounts::Model> {
    accounts::Entity::find()
        .filter(accounts::Column::Code.eq(code))
        .one(conn)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()).into())
}

/// Loads validation snapshots for the given accounts.
pub(crate) async fn load_snapshots<C: ConnectionTrait>(
    conn: &C,
    ids: impl IntoIterator<Item = AccountId>,
) -> StoreResult<HashMap<AccountId, AccountSnapshot>> {
    let ids: Vec<Uuid> = ids.into_iter().map(AccountId::into_inner).collect();
    let rows = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(ids))
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = AccountId::from_uuid(row.id);
            (id, snapshot(row))
        })
        .collect())
}

/// Validation view of an account row.
pub(crate) fn snapshot(row: accounts::Model) -> AccountSnapshot {
    AccountSnapshot {
        id: AccountId::from_uuid(row.id),
        code: row.code,
        account_type: row.account_type.into(),
        is_header: row.is_header,
        is_active: row.is_active && row.deleted_at.is_none(),
    }
}
