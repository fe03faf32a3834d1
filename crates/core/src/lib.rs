//! Core cash register logic for Caixa.
//!
//! Domain types, validation rules and reconciliation math live here with
//! no web or database dependencies. Persistence is reached through the
//! [`cash_register::LedgerStore`] trait.

pub mod cash_register;
