//! Append-only audit trail.
//!
//! Records are written inside the transaction of the change they describe,
//! so a rolled-back change leaves no audit row behind.

use chrono::Utc;
use erp_ledger_core::audit::{AuditEntity, AuditRecord};
use erp_ledger_shared::types::{AuditLogId, PageRequest, PageResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::error::StoreResult;
use crate::entities::audit_logs;

/// Filter options for listing audit records.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Only this entity type.
    pub entity: Option<AuditEntity>,
    /// Only records by this actor.
    pub actor_id: Option<Uuid>,
    /// Only this operation, e.g. `CLOSE_PERIOD`.
    pub operation: Option<String>,
}

/// Appends an audit record using the caller's connection or transaction.
pub(crate) async fn record<C>(conn: &C, record: AuditRecord) -> StoreResult<audit_logs::Model>
where
    C: ConnectionTrait,
{
    let row = audit_logs::ActiveModel {
        id: Set(AuditLogId::new().into_inner()),
        actor_id: Set(record.actor_id.into_inner()),
        actor_role: Set(record.actor_role.as_str().to_string()),
        occurred_at: Set(Utc::now().into()),
        operation: Set(record.operation.as_str().to_string()),
        entity_type: Set(record.entity.as_str().to_string()),
        entity_id: Set(record.entity_id),
        before_status: Set(record.before_status),
        after_status: Set(record.after_status),
        reason: Set(record.reason),
        details: Set(record.details),
    };
    Ok(row.insert(conn).await?)
}

/// Read access to the audit trail. There is no update or delete.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends a record outside any ledger transaction.
    pub async fn insert(&self, entry: AuditRecord) -> StoreResult<audit_logs::Model> {
        record(&self.db, entry).await
    }

    /// All records for one entity, oldest first.
    pub async fn list_for_entity(
        &self,
        entity: AuditEntity,
        entity_id: Uuid,
    ) -> StoreResult<Vec<audit_logs::Model>> {
        let rows = audit_logs::Entity::find()
            .filter(audit_logs::Column::EntityType.eq(entity.as_str()))
            .filter(audit_logs::Column::EntityId.eq(entity_id))
            .order_by_asc(audit_logs::Column::OccurredAt)
            .order_by_asc(audit_logs::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    /// Paginated records, newest first.
    pub async fn list(
        &self,
        filter: AuditFilter,
        page: PageRequest,
    ) -> StoreResult<PageResponse<audit_logs::Model>> {
        let mut query = audit_logs::Entity::find();

        if let Some(entity) = filter.entity {
            query = query.filter(audit_logs::Column::EntityType.eq(entity.as_str()));
        }
        if let Some(actor_id) = filter.actor_id {
            query = query.filter(audit_logs::Column::ActorId.eq(actor_id));
        }
        if let Some(operation) = filter.operation {
            query = query.filter(audit_logs::Column::Operation.eq(operation));
        }

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(audit_logs::Column::OccurredAt)
            .order_by_desc(audit_logs::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(rows, page, total))
    }
}
