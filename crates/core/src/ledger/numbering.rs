//! Journal entry codes: `{PREFIX}-{YYYY}-{MM}-{NNNN}`.
//!
//! Sequences are scoped per prefix and entry month. The counter itself
//! lives in the `journal_sequences` table; this module only names scopes
//! and formats codes.

use chrono::{Datelike, NaiveDate};

/// Minimum width of the sequence number.
pub const SEQUENCE_WIDTH: usize = 4;

/// Sequence scope for an entry date, e.g. `JE-2025-11`.
#[must_use]
pub fn sequence_scope(prefix: &str, entry_date: NaiveDate) -> String {
    format!("{prefix}-{:04}-{:02}", entry_date.year(), entry_date.month())
}

/// Formats the `n`th code in a scope. Numbers past 9999 widen.
#[must_use]
pub fn format_entry_code(scope: &str, n: i64) -> String {
    format!("{scope}-{n:0width$}", width = SEQUENCE_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_and_code() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let scope = sequence_scope("JE", date);
        assert_eq!(scope, "JE-2025-03");
        assert_eq!(format_entry_code(&scope, 1), "JE-2025-03-0001");
        assert_eq!(format_entry_code(&scope, 12_345), "JE-2025-03-12345");
    }

    #[test]
    fn test_codes_sort_within_scope() {
        let scope = "JE-2025-11";
        let mut codes: Vec<_> = [10, 2, 1, 9].iter().map(|n| format_entry_code(scope, *n)).collect();
        codes.sort();
        assert_eq!(codes[0], "JE-2025-11-0001");
        assert_eq!(codes[3], "JE-2025-11-0010");
    }
}
