//! Customer record loading and column access using Polars

use std::collections::HashSet;
use std::path::Path;

use polars::prelude::*;

use crate::error::DashboardError;

pub const CUSTOMER_ID: &str = "CustomerID";
pub const TENURE: &str = "Tenure";
pub const USAGE_FREQUENCY: &str = "Usage Frequency";
pub const SUPPORT_CALLS: &str = "Support Calls";
pub const PAYMENT_DELAY: &str = "Payment Delay";
pub const TOTAL_SPEND: &str = "Total Spend";
pub const GENDER: &str = "Gender";
pub const GENDER_MALE: &str = "Gender_Male";
pub const CHURN: &str = "Churn";

/// Columns every dataset must provide (after `Gender` normalization)
pub const REQUIRED_COLUMNS: [&str; 8] = [
    CUSTOMER_ID,
    TENURE,
    USAGE_FREQUENCY,
    SUPPORT_CALLS,
    PAYMENT_DELAY,
    TOTAL_SPEND,
    GENDER_MALE,
    CHURN,
];

/// One customer row with the typed fields the dashboard relies on
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: f64,
    pub tenure: f64,
    pub usage_frequency: f64,
    pub support_calls: f64,
    pub payment_delay: f64,
    pub total_spend: f64,
    /// 1.0 for male customers, 0.0 otherwise
    pub gender_male: f64,
    /// 0.0 = retained, 1.0 = churned
    pub churn: f64,
}

impl CustomerRecord {
    pub fn churned(&self) -> bool {
        self.churn == 1.0
    }
}

/// Validated, read-only customer table
///
/// Required columns are stored as `Float64`; any extra columns of the
/// source artifact are kept untouched so they stay available for grouping.
#[derive(Debug, Clone)]
pub struct RecordSet {
    frame: DataFrame,
}

impl RecordSet {
    /// Validate an in-memory frame and wrap it as a record set
    pub fn from_frame(mut frame: DataFrame) -> crate::Result<Self> {
        normalize_gender(&mut frame)?;

        for name in REQUIRED_COLUMNS {
            let numeric = {
                let series = frame.column(name).map_err(|_| {
                    DashboardError::load(format!("missing required column '{name}'"))
                })?;
                if series.null_count() > 0 {
                    return Err(DashboardError::load(format!(
                        "column '{name}' contains missing values"
                    )));
                }
                series.strict_cast(&DataType::Float64).map_err(|_| {
                    DashboardError::load(format!("column '{name}' contains non-numeric values"))
                })?
            };
            let non_finite = numeric
                .f64()
                .map_err(|e| DashboardError::load(e.to_string()))?
                .into_no_null_iter()
                .find(|v| !v.is_finite());
            if let Some(bad) = non_finite {
                return Err(DashboardError::load(format!(
                    "column '{name}' contains non-finite value {bad}"
                )));
            }
            frame
                .with_column(numeric)
                .map_err(|e| DashboardError::load(e.to_string()))?;
        }

        let ids = float_values(&frame, CUSTOMER_ID)?;
        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            // -0.0 and 0.0 are the same customer
            if !seen.insert((id + 0.0).to_bits()) {
                return Err(DashboardError::load(format!("duplicate CustomerID {id}")));
            }
        }

        if let Some(bad) = float_values(&frame, CHURN)?
            .into_iter()
            .find(|&v| v != 0.0 && v != 1.0)
        {
            return Err(DashboardError::load(format!(
                "Churn must be 0 or 1, found {bad}"
            )));
        }

        Ok(Self { frame })
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Underlying frame, for read-only Polars queries
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// All values of one column in row order
    pub fn column(&self, name: &str) -> crate::Result<&Series> {
        self.frame
            .column(name)
            .map_err(|_| DashboardError::unknown_column(name))
    }

    /// Column values as `f64`, in row order
    ///
    /// Fails with `InvalidColumn` if the column holds nulls or values that
    /// cannot be read as numbers.
    pub fn numeric_column(&self, name: &str) -> crate::Result<Vec<f64>> {
        let series = self.column(name)?;
        if series.null_count() > 0 {
            return Err(DashboardError::invalid_column(
                name,
                "contains missing values",
            ));
        }
        let numeric = series
            .strict_cast(&DataType::Float64)
            .map_err(|_| DashboardError::invalid_column(name, "values are not numeric"))?;
        let values = numeric
            .f64()
            .map_err(|e| DashboardError::invalid_column(name, e.to_string()))?
            .into_no_null_iter()
            .collect();
        Ok(values)
    }

    /// Typed view of every row
    pub fn records(&self) -> crate::Result<Vec<CustomerRecord>> {
        let customer_id = self.numeric_column(CUSTOMER_ID)?;
        let tenure = self.numeric_column(TENURE)?;
        let usage_frequency = self.numeric_column(USAGE_FREQUENCY)?;
        let support_calls = self.numeric_column(SUPPORT_CALLS)?;
        let payment_delay = self.numeric_column(PAYMENT_DELAY)?;
        let total_spend = self.numeric_column(TOTAL_SPEND)?;
        let gender_male = self.numeric_column(GENDER_MALE)?;
        let churn = self.numeric_column(CHURN)?;

        Ok((0..self.len())
            .map(|i| CustomerRecord {
                customer_id: customer_id[i],
                tenure: tenure[i],
                usage_frequency: usage_frequency[i],
                support_calls: support_calls[i],
                payment_delay: payment_delay[i],
                total_spend: total_spend[i],
                gender_male: gender_male[i],
                churn: churn[i],
            })
            .collect())
    }
}

/// Load a customer CSV and validate it into a `RecordSet`
///
/// # Arguments
/// * `path` - Path to the CSV artifact
///
/// # Returns
/// * `RecordSet` with the required columns cast to `Float64`
pub fn load_records(path: impl AsRef<Path>) -> crate::Result<RecordSet> {
    let path = path.as_ref();
    let frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| DashboardError::load(format!("failed to read {}: {e}", path.display())))?;

    let records = RecordSet::from_frame(frame)?;
    tracing::info!(
        path = %path.display(),
        customers = records.len(),
        "loaded customer records"
    );
    Ok(records)
}

/// Derive `Gender_Male` from a textual `Gender` column when needed
fn normalize_gender(frame: &mut DataFrame) -> crate::Result<()> {
    if frame.column(GENDER_MALE).is_ok() {
        return Ok(());
    }
    let gender = frame.column(GENDER).map_err(|_| {
        DashboardError::load(format!(
            "missing required column '{GENDER_MALE}' (or '{GENDER}')"
        ))
    })?;

    let labels = gender.str().map_err(|_| {
        DashboardError::load(format!("column '{GENDER}' must hold Male/Female labels"))
    })?;
    let indicator = labels
        .into_iter()
        .map(|label| match label.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "male" => Ok(1.0),
            Some(s) if s == "female" => Ok(0.0),
            other => Err(DashboardError::load(format!(
                "unrecognized {GENDER} value {other:?}"
            ))),
        })
        .collect::<crate::Result<Vec<f64>>>()?;

    frame
        .with_column(Series::new(GENDER_MALE, indicator))
        .map_err(|e| DashboardError::load(e.to_string()))?;
    tracing::debug!("derived {GENDER_MALE} from {GENDER}");
    Ok(())
}

fn float_values(frame: &DataFrame, name: &str) -> crate::Result<Vec<f64>> {
    let values = frame
        .column(name)
        .and_then(|s| s.f64().map(|ca| ca.into_no_null_iter().collect()))
        .map_err(|e| DashboardError::load(e.to_string()))?;
    Ok(values)
}
