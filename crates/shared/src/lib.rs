//! Shared types, errors, and configuration for Caixa.
//!
//! This crate provides common types used across all other crates:
//! - Positive monetary amounts with decimal precision
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, CashRegisterConfig, DatabaseConfig};
pub use error::{AppError, AppResult, ErrorKind};
