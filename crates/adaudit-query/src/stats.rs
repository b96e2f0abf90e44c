use serde::Serialize;

use adaudit_store::AuditState;
use adaudit_utils::types::Compliance;

use crate::filter::ResultFilter;
use crate::row::result_rows;

/// Aggregates over the result rows of one account, or all rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total: usize,
    /// Rows with compliance `passed`.
    pub approved: usize,
    /// Rows with compliance `failed`.
    pub rejected: usize,
    pub pending: usize,
    /// Percentage of `approved` in `total`, one decimal place.
    pub approval_rate: f64,
    pub total_spend: f64,
    pub avg_ctr: f64,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[must_use]
pub fn stats(state: &AuditState, account_id: Option<&str>) -> AuditStats {
    let filter = ResultFilter {
        account_id: account_id.map(str::to_string),
        ..ResultFilter::default()
    };
    let rows: Vec<_> = result_rows(state)
        .into_iter()
        .filter(|row| filter.matches(row))
        .collect();

    let total = rows.len();
    let count = |wanted: Compliance| rows.iter().filter(|r| r.compliance == wanted).count();
    let approved = count(Compliance::Passed);
    let rejected = count(Compliance::Failed);
    let pending = count(Compliance::Pending);
    let total_spend: f64 = rows.iter().map(|r| r.spend).sum();
    let (approval_rate, avg_ctr) = if total == 0 {
        (0.0, 0.0)
    } else {
        let ctr_sum: f64 = rows.iter().map(|r| r.ctr).sum();
        (
            approved as f64 / total as f64 * 100.0,
            ctr_sum / total as f64,
        )
    };

    AuditStats {
        total,
        approved,
        rejected,
        pending,
        approval_rate: round_to(approval_rate, 1),
        total_spend: round_to(total_spend, 2),
        avg_ctr: round_to(avg_ctr, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaudit_store::seed::load_demo_materials;

    #[test]
    fn test_empty_state() {
        let stats = stats(&AuditState::new(), None);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.approval_rate, 0.0);
        assert_eq!(stats.avg_ctr, 0.0);
    }

    #[test]
    fn test_demo_catalog_counts() {
        let mut state = AuditState::new();
        load_demo_materials(&mut state).unwrap();
        let all = stats(&state, None);
        assert_eq!(all.total, 12);
        assert_eq!(all.approved, 5);
        assert_eq!(all.rejected, 3);
        assert_eq!(all.pending, 4);
        assert_eq!(all.approval_rate, 41.7);
        assert_eq!(all.total_spend, 11_310.0);

        let client_a = stats(&state, Some("client-a"));
        assert_eq!(client_a.total, 3);
        assert_eq!(client_a.approval_rate, 100.0);
        assert_eq!(client_a.avg_ctr, 4.27);
    }
}
