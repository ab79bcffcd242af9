//! Common types used across the ledger.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{Money, MoneyError};
pub use pagination::{PageMeta, PageRequest, PageResponse};
