//! Summary metrics and churn-rate aggregation over customer records

use polars::prelude::*;

use crate::data::{RecordSet, CHURN, CUSTOMER_ID, TENURE, TOTAL_SPEND, USAGE_FREQUENCY};
use crate::error::DashboardError;

/// Headline numbers shown on the dashboard cards
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMetrics {
    /// Number of distinct `CustomerID` values
    pub distinct_customers: usize,
    pub median_tenure: f64,
    pub mean_total_spend: f64,
    pub mean_usage_frequency: f64,
}

/// Churn rate of all customers sharing one value of the grouping column
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRate {
    pub key: f64,
    /// Mean of `Churn` within the group, always in [0, 1]
    pub rate: f64,
    pub customers: u64,
}

/// Retained vs. churned customer counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChurnDistribution {
    pub retained: u64,
    pub churned: u64,
}

impl ChurnDistribution {
    pub fn total(&self) -> u64 {
        self.retained + self.churned
    }

    /// Overall churn rate, `None` when there are no customers
    pub fn churn_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.churned as f64 / total as f64),
        }
    }
}

/// Compute the summary metrics for a record set
///
/// # Returns
/// * `SummaryMetrics`, or `EmptyInput` when there are no records
pub fn summary(records: &RecordSet) -> crate::Result<SummaryMetrics> {
    if records.is_empty() {
        return Err(DashboardError::empty_input(
            "cannot summarize an empty record set",
        ));
    }

    let distinct_customers = records
        .column(CUSTOMER_ID)?
        .n_unique()
        .map_err(|e| DashboardError::invalid_column(CUSTOMER_ID, e.to_string()))?;

    let metrics = SummaryMetrics {
        distinct_customers,
        median_tenure: statistic(records, TENURE, |s| s.median())?,
        mean_total_spend: statistic(records, TOTAL_SPEND, |s| s.mean())?,
        mean_usage_frequency: statistic(records, USAGE_FREQUENCY, |s| s.mean())?,
    };
    tracing::debug!(?metrics, "computed summary metrics");
    Ok(metrics)
}

/// Churn rate per distinct value of `group_column`, ascending by value
///
/// Groups are formed by exact value equality. The column may be any numeric
/// column of the record set, required or not.
///
/// # Arguments
/// * `records` - Loaded customer records
/// * `group_column` - Name of the column to partition by
///
/// # Returns
/// * One `GroupRate` per distinct value, sorted by key
pub fn churn_rate_by(records: &RecordSet, group_column: &str) -> crate::Result<Vec<GroupRate>> {
    let keys = records.column(group_column)?;
    if records.is_empty() {
        return Err(DashboardError::empty_input(format!(
            "cannot group an empty record set by '{group_column}'"
        )));
    }
    if keys.null_count() > 0 {
        return Err(DashboardError::invalid_column(
            group_column,
            "contains missing values",
        ));
    }

    let keys = keys
        .strict_cast(&DataType::Float64)
        .map_err(|_| DashboardError::invalid_column(group_column, "values are not numeric"))?
        .with_name("key");
    let churn = records.column(CHURN)?.clone().with_name("churn");

    let grouped = DataFrame::new(vec![keys, churn])
        .and_then(|frame| {
            frame
                .lazy()
                .group_by([col("key")])
                .agg([
                    col("churn").mean().alias("rate"),
                    col("churn").count().alias("customers"),
                ])
                .collect()
        })
        .map_err(|e| DashboardError::invalid_column(group_column, e.to_string()))?;

    let (group_keys, rates, counts) = grouped_columns(&grouped)
        .map_err(|e| DashboardError::invalid_column(group_column, e.to_string()))?;

    let mut series: Vec<GroupRate> = group_keys
        .into_iter()
        .zip(rates)
        .zip(counts)
        .map(|((key, rate), customers)| GroupRate {
            key,
            rate,
            customers: customers as u64,
        })
        .collect();
    series.sort_by(|a, b| a.key.total_cmp(&b.key));

    tracing::debug!(column = group_column, groups = series.len(), "computed churn rates");
    Ok(series)
}

/// Count retained and churned customers
pub fn churn_distribution(records: &RecordSet) -> crate::Result<ChurnDistribution> {
    let churned = records
        .numeric_column(CHURN)?
        .into_iter()
        .filter(|&v| v == 1.0)
        .count() as u64;

    Ok(ChurnDistribution {
        retained: records.len() as u64 - churned,
        churned,
    })
}

fn grouped_columns(grouped: &DataFrame) -> PolarsResult<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let as_f64 = |name: &str| -> PolarsResult<Vec<f64>> {
        let series = grouped.column(name)?.cast(&DataType::Float64)?;
        let values = series.f64()?.into_no_null_iter().collect();
        Ok(values)
    };
    Ok((as_f64("key")?, as_f64("rate")?, as_f64("customers")?))
}

fn statistic(
    records: &RecordSet,
    name: &str,
    reduce: impl Fn(&Series) -> Option<f64>,
) -> crate::Result<f64> {
    reduce(records.column(name)?)
        .ok_or_else(|| DashboardError::empty_input(format!("no values in column '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GENDER_MALE, PAYMENT_DELAY, SUPPORT_CALLS};

    /// Rows of (customer id, tenure, support calls, total spend, churn)
    fn records_from(rows: &[(i64, i64, i64, f64, i64)]) -> RecordSet {
        let n = rows.len();
        let frame = df!(
            CUSTOMER_ID => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            TENURE => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            USAGE_FREQUENCY => (0..n).map(|i| (i as f64) * 2.0 + 1.0).collect::<Vec<_>>(),
            SUPPORT_CALLS => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            PAYMENT_DELAY => vec![10.0; n],
            TOTAL_SPEND => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            GENDER_MALE => vec![0i64; n],
            CHURN => rows.iter().map(|r| r.4).collect::<Vec<_>>(),
            "Segment" => vec![1i64; n],
            "Plan" => vec!["Basic"; n]
        )
        .unwrap();
        RecordSet::from_frame(frame).unwrap()
    }

    fn sample_records() -> RecordSet {
        records_from(&[
            (1, 10, 1, 100.0, 0),
            (2, 20, 5, 300.0, 1),
            (3, 10, 9, 500.0, 1),
            (4, 30, 1, 200.0, 0),
            (5, 20, 5, 400.0, 0),
        ])
    }

    #[test]
    fn test_summary() {
        let metrics = summary(&sample_records()).unwrap();

        assert_eq!(metrics.distinct_customers, 5);
        assert_eq!(metrics.median_tenure, 20.0);
        assert!((metrics.mean_total_spend - 300.0).abs() < 1e-9);
        // usage frequency is 1, 3, 5, 7, 9
        assert!((metrics.mean_usage_frequency - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_three_customers() {
        let records = records_from(&[(1, 5, 0, 10.0, 0), (2, 6, 1, 20.0, 1), (3, 7, 2, 30.0, 1)]);

        assert_eq!(summary(&records).unwrap().distinct_customers, 3);

        let overall = churn_rate_by(&records, "Segment").unwrap();
        assert_eq!(overall.len(), 1);
        assert_eq!(overall[0].customers, 3);
        assert!((overall[0].rate - 0.667).abs() < 1e-3);
    }

    #[test]
    fn test_summary_empty_input() {
        let records = records_from(&[]);
        let err = summary(&records).unwrap_err();
        assert!(matches!(err, DashboardError::EmptyInput(_)));
    }

    #[test]
    fn test_churn_rate_by_sorted_and_bounded() {
        let rates = churn_rate_by(&sample_records(), TENURE).unwrap();

        let keys: Vec<f64> = rates.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec![10.0, 20.0, 30.0]);
        assert!(rates.iter().all(|g| (0.0..=1.0).contains(&g.rate)));

        assert_eq!(rates[0].rate, 0.5);
        assert_eq!(rates[0].customers, 2);
        assert_eq!(rates[2].rate, 0.0);
    }

    #[test]
    fn test_churn_rate_by_support_calls() {
        let rates = churn_rate_by(&sample_records(), SUPPORT_CALLS).unwrap();

        assert_eq!(
            rates,
            vec![
                GroupRate { key: 1.0, rate: 0.0, customers: 2 },
                GroupRate { key: 5.0, rate: 0.5, customers: 2 },
                GroupRate { key: 9.0, rate: 1.0, customers: 1 },
            ]
        );
    }

    #[test]
    fn test_churn_rate_by_ignores_row_order() {
        let rows = [
            (1, 10, 1, 100.0, 0),
            (2, 20, 5, 300.0, 1),
            (3, 10, 9, 500.0, 1),
            (4, 30, 1, 200.0, 0),
            (5, 20, 5, 400.0, 0),
        ];
        let mut reversed = rows;
        reversed.reverse();

        for column in [TENURE, SUPPORT_CALLS, TOTAL_SPEND] {
            assert_eq!(
                churn_rate_by(&records_from(&rows), column).unwrap(),
                churn_rate_by(&records_from(&reversed), column).unwrap()
            );
        }
    }

    #[test]
    fn test_churn_rate_by_exact_equality() {
        let records = records_from(&[
            (1, 1, 0, 100.0, 1),
            (2, 1, 0, 100.000_000_001, 0),
            (3, 1, 0, 100.0, 1),
        ]);
        let rates = churn_rate_by(&records, TOTAL_SPEND).unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].key, 100.0);
        assert_eq!(rates[0].rate, 1.0);
        assert_eq!(rates[1].rate, 0.0);
    }

    #[test]
    fn test_churn_rate_by_unknown_column() {
        let err = churn_rate_by(&sample_records(), "Region").unwrap_err();
        assert!(matches!(err, DashboardError::UnknownColumn(_)));
    }

    #[test]
    fn test_churn_rate_by_non_numeric_column() {
        let err = churn_rate_by(&sample_records(), "Plan").unwrap_err();
        assert!(matches!(err, DashboardError::InvalidColumn { .. }));
    }

    #[test]
    fn test_churn_rate_by_empty_input() {
        let err = churn_rate_by(&records_from(&[]), TENURE).unwrap_err();
        assert!(matches!(err, DashboardError::EmptyInput(_)));
    }

    #[test]
    fn test_churn_distribution() {
        let distribution = churn_distribution(&sample_records()).unwrap();

        assert_eq!(distribution, ChurnDistribution { retained: 3, churned: 2 });
        assert_eq!(distribution.total(), 5);
        assert_eq!(distribution.churn_rate(), Some(0.4));
        assert_eq!(ChurnDistribution::default().churn_rate(), None);
    }
}
