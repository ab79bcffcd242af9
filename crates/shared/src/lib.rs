//! Shared types, errors, and configuration for the ERP ledger.
//!
//! This crate provides common types used across all other crates:
//! - Money in integer minor units
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - The user-facing error type
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
