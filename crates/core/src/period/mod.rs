//! Accounting periods.
//!
//! One period per calendar month. Periods close in chronological order;
//! closing moves net income into retained earnings.

pub mod calendar;
pub mod closing;
pub mod status;

#[cfg(test)]
mod props;

pub use calendar::{BusinessCalendar, PostingWindow, YearMonth, last_day_of_month};
pub use closing::{
    ClosingBalance, ClosingPlan, ClosingPreview, build_closing_plan, closing_description,
};
pub use status::{PeriodAction, PeriodStatus, ensure_open, validate_status_transition};
