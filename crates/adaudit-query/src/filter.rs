use chrono::NaiveDate;

use adaudit_utils::error::AuditError;
use adaudit_utils::types::StatusFilter;

use crate::row::ResultItem;

/// Conjunction of the optional result filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultFilter {
    /// Exact account match.
    pub account_id: Option<String>,
    pub status: StatusFilter,
    /// Exact match on the row's creation date.
    pub date: Option<NaiveDate>,
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

impl ResultFilter {
    /// Build a filter from raw query-string values. Blank values disable
    /// their filter.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unknown status or a date that is not
    /// `YYYY-MM-DD`.
    pub fn parse(
        account_id: Option<&str>,
        status: Option<&str>,
        date: Option<&str>,
    ) -> Result<Self, AuditError> {
        let status = match non_blank(status) {
            Some(raw) => raw.parse()?,
            None => StatusFilter::All,
        };
        let date = non_blank(date)
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    AuditError::invalid_argument(format!("date '{raw}' is not YYYY-MM-DD"))
                })
            })
            .transpose()?;
        Ok(Self {
            account_id: non_blank(account_id).map(str::to_string),
            status,
            date,
        })
    }

    #[must_use]
    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn matches(&self, item: &ResultItem) -> bool {
        self.account_id
            .as_deref()
            .is_none_or(|account| account == item.account_id)
            && self.status.matches(item.compliance)
            && self.date.is_none_or(|date| date == item.created_on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaudit_utils::types::Compliance;

    #[test]
    fn test_parse_blank_values_disable_filters() {
        let filter = ResultFilter::parse(Some(" "), Some(""), None).unwrap();
        assert_eq!(filter, ResultFilter::default());
    }

    #[test]
    fn test_parse_values() {
        let filter =
            ResultFilter::parse(Some("acct-1"), Some("passed"), Some("2024-06-15")).unwrap();
        assert_eq!(filter.account_id.as_deref(), Some("acct-1"));
        assert_eq!(filter.status, StatusFilter::Only(Compliance::Passed));
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2024, 6, 15));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            ResultFilter::parse(None, Some("approved-ish"), None)
                .unwrap_err()
                .api_code(),
            400
        );
        assert!(ResultFilter::parse(None, None, Some("15/06/2024")).is_err());
    }
}
