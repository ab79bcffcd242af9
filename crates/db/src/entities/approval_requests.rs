//! `SeaORM` Entity for approval_requests table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ApprovalStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "approval_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reference_type: String,
    pub reference_id: String,
    pub entry_date: Date,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// JSON-encoded `Vec<LineInput>`.
    #[sea_orm(column_type = "Text")]
    pub lines_json: String,
    pub total_amount: i64,
    pub status: ApprovalStatus,
    pub requested_by: Uuid,
    pub submitted_at: Option<DateTimeWithTimeZone>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub decision_note: Option<String>,
    pub journal_entry_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
