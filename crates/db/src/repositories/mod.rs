//! Repository abstractions for data access.
//!
//! Repositories hide the `SeaORM` details behind the core persistence traits.

pub mod cash_register;

pub use cash_register::CashRegisterRepository;
