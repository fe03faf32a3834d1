//! `SeaORM` Entity for cash_sessions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{CashSessionStatus, RecordState};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub sequence_number: i64,
    pub operator_id: Uuid,
    pub opened_at: DateTimeWithTimeZone,
    pub closed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub opening_amount: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub opening_note: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub closing_note: Option<String>,
    pub status: CashSessionStatus,
    pub record_state: RecordState,
    /// Last movement number issued; advanced under the row lock.
    pub last_movement_number: i64,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cash_movements::Entity")]
    CashMovements,
    #[sea_orm(has_many = "super::cash_closing_declared_values::Entity")]
    CashClosingDeclaredValues,
}

impl Related<super::cash_movements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashMovements.def()
    }
}

impl Related<super::cash_closing_declared_values::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashClosingDeclaredValues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
