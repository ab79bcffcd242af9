//! Settings shared by the repositories and the transaction deadline.

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use erp_ledger_core::ledger::LedgerError;
use erp_ledger_core::period::{BusinessCalendar, PostingWindow};
use erp_ledger_shared::config::LedgerConfig;
use tracing::warn;

use super::error::{StoreError, StoreResult};

/// Ledger settings resolved from [`LedgerConfig`].
#[derive(Debug, Clone)]
pub struct LedgerContext {
    config: LedgerConfig,
    calendar: BusinessCalendar,
    window: PostingWindow,
    pinned_today: Option<NaiveDate>,
}

impl LedgerContext {
    /// Resolves the configured timezone and posting window.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown timezone.
    pub fn from_config(config: LedgerConfig) -> Result<Self, LedgerError> {
        let calendar = BusinessCalendar::from_name(&config.timezone)?;
        let window = PostingWindow {
            max_backdate_months: config.max_backdate_months,
            max_future_days: config.max_future_days,
        };
        Ok(Self {
            config,
            calendar,
            window,
            pinned_today: None,
        })
    }

    /// Pins the business date instead of reading the clock.
    ///
    /// Used when replaying a historical batch and in tests.
    #[must_use]
    pub const fn with_today(mut self, today: NaiveDate) -> Self {
        self.pinned_today = Some(today);
        self
    }

    /// Business date in the configured timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.pinned_today.unwrap_or_else(|| self.calendar.today())
    }

    /// Raw configuration.
    #[must_use]
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Window in which a posting may provision a missing period.
    #[must_use]
    pub const fn window(&self) -> PostingWindow {
        self.window
    }

    /// Deadline for one ledger transaction.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.config.transaction_timeout()
    }
}

impl Default for LedgerContext {
    fn default() -> Self {
        Self {
            config: LedgerConfig::default(),
            calendar: BusinessCalendar::default(),
            window: PostingWindow::default(),
            pinned_today: None,
        }
    }
}

/// Runs `fut` under a deadline.
///
/// On expiry the future is dropped, which rolls back any open database
/// transaction it owns.
pub(crate) async fn with_deadline<T, F>(op: &'static str, limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    if let Ok(result) = tokio::time::timeout(limit, fut).await {
        result
    } else {
        warn!(op, limit_secs = limit.as_secs(), "ledger transaction timed out, rolled back");
        Err(StoreError::Timeout { op, limit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_rejects_unknown_timezone() {
        let config = LedgerConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..LedgerConfig::default()
        };
        assert!(LedgerContext::from_config(config).is_err());
    }

    #[test]
    fn test_pinned_today() {
        let day = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let ctx = LedgerContext::default().with_today(day);
        assert_eq!(ctx.today(), day);
        assert_eq!(ctx.timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_deadline_elapsed() {
        let result: StoreResult<()> = with_deadline("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout { op: "slow", .. })));
    }

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let result = with_deadline("fast", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
