//! PostgreSQL enum types backing status columns.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Session status (`cash_session_status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cash_session_status")]
pub enum CashSessionStatus {
    /// Accepting movements.
    #[sea_orm(string_value = "open")]
    Open,
    /// Closed with declared counts.
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Soft-delete marker (`record_state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "record_state")]
pub enum RecordState {
    /// Live row.
    #[sea_orm(string_value = "active")]
    Active,
    /// Soft-deleted row.
    #[sea_orm(string_value = "deleted")]
    Deleted,
}

/// Movement kind (`cash_movement_kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "cash_movement_kind")]
pub enum CashMovementKind {
    /// Cash taken out of the till.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Cash put into the till.
    #[sea_orm(string_value = "supply")]
    Supply,
    /// Settled payment.
    #[sea_orm(string_value = "payment")]
    Payment,
}
