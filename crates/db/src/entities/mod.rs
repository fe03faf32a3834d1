//! `SeaORM` entity definitions for the cash register schema.

pub mod cash_closing_declared_values;
pub mod cash_movements;
pub mod cash_register_counters;
pub mod cash_sessions;
pub mod payment_methods;
pub mod sea_orm_active_enums;
