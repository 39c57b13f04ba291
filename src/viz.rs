//! Dashboard charts rendered with Plotters, plus console metric cards

use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::aggregate::{ChurnDistribution, GroupRate, SummaryMetrics};
use crate::dashboard::Dashboard;
use crate::importance::FeatureImportance;
use crate::model::PredictionResult;

const RETAINED_COLOR: RGBColor = RGBColor(255, 228, 196);
const CHURNED_COLOR: RGBColor = RED;
const RATE_COLOR: RGBColor = RGBColor(178, 34, 34);

/// Horizontal bar chart of feature importance, smallest score at the bottom
pub fn create_importance_chart(importance: &FeatureImportance, output_path: &Path) -> anyhow::Result<()> {
    let mut entries = importance.ranked();
    entries.reverse();
    let names: Vec<String> = entries.iter().map(|(name, _)| name.to_string()).collect();
    let max_score = entries.iter().map(|(_, s)| *s).fold(0.0, f64::max);
    let x_max = if max_score > 0.0 { max_score * 1.1 } else { 1.0 };

    let root = BitMapBackend::new(output_path, (700, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Feature Importance", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(140)
        .build_cartesian_2d(0f64..x_max, -0.5f64..(entries.len() as f64 - 0.5).max(0.5))?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(names.len().max(1))
        .y_label_formatter(&|y| category_label(&names, *y))
        .x_desc("Importance")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(entries.iter().enumerate().map(|(i, (_, score))| {
        let y = i as f64;
        Rectangle::new([(0.0, y - 0.4), (*score, y + 0.4)], BLUE.filled())
    }))?;

    root.present()?;
    tracing::info!(path = %output_path.display(), "feature importance chart saved");
    Ok(())
}

/// Bar chart of retained vs. churned customer counts
pub fn create_distribution_chart(distribution: &ChurnDistribution, output_path: &Path) -> anyhow::Result<()> {
    let labels = vec!["Not Churned".to_string(), "Churned".to_string()];
    let max_count = distribution.retained.max(distribution.churned).max(1) as f64;

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Churn Rate Distribution", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..1.5f64, 0f64..(max_count * 1.1))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(2)
        .x_label_formatter(&|x| category_label(&labels, *x))
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let bars = [
        (0.0, distribution.retained, RETAINED_COLOR),
        (1.0, distribution.churned, CHURNED_COLOR),
    ];
    chart.draw_series(bars.iter().map(|(x, count, color)| {
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *count as f64)], color.filled())
    }))?;

    root.present()?;
    tracing::info!(path = %output_path.display(), "churn distribution chart saved");
    Ok(())
}

/// Line chart of churn rate against the values of one column
pub fn create_churn_rate_chart(column: &str, rates: &[GroupRate], output_path: &Path) -> anyhow::Result<()> {
    let x_range = axis_range(rates.iter().map(|g| g.key));

    let root = BitMapBackend::new(output_path, (700, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Churn Rate by {column}"), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, 0f64..1.05f64)?;

    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("Churn Rate")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(LineSeries::new(
        rates.iter().map(|g| (g.key, g.rate)),
        &RATE_COLOR,
    ))?;
    chart.draw_series(
        rates
            .iter()
            .map(|g| Circle::new((g.key, g.rate), 3, RATE_COLOR.filled())),
    )?;

    root.present()?;
    tracing::info!(path = %output_path.display(), column, "churn rate chart saved");
    Ok(())
}

/// Render every dashboard chart into `output_dir`
///
/// A grouping column that cannot be aggregated is reported and skipped;
/// the remaining charts are still rendered.
///
/// # Returns
/// * Paths of the charts that were written
pub fn generate_dashboard_charts(dashboard: &Dashboard, output_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    let path = output_dir.join("feature_importance.png");
    create_importance_chart(dashboard.importance(), &path)?;
    written.push(path);

    let path = output_dir.join("churn_distribution.png");
    create_distribution_chart(&dashboard.churn_distribution()?, &path)?;
    written.push(path);

    for column in &dashboard.config().group_columns {
        match dashboard.churn_rate_by(column) {
            Ok(rates) => {
                let path = output_dir.join(format!("churn_rate_by_{}.png", file_slug(column)));
                create_churn_rate_chart(column, &rates, &path)?;
                written.push(path);
            }
            Err(e) => {
                tracing::warn!(column = column.as_str(), error = %e, "skipping churn rate chart");
                println!("✗ Churn rate by {column}: {e}");
            }
        }
    }

    Ok(written)
}

/// Print the four headline metric cards
pub fn print_summary(metrics: &SummaryMetrics, distribution: &ChurnDistribution) {
    println!("\n=== Customer Churn Dashboard ===");
    println!("Total Customers:   {}", metrics.distinct_customers);
    println!("Median Tenure:     {:.2} Days", metrics.median_tenure);
    println!("Average Spending:  ${:.2}", metrics.mean_total_spend);
    println!(
        "Usage Frequency:   {} times/month",
        metrics.mean_usage_frequency.trunc()
    );

    println!("\nChurn distribution:");
    println!("  Not Churned: {}", distribution.retained);
    println!("  Churned:     {}", distribution.churned);
    if let Some(rate) = distribution.churn_rate() {
        println!("  Churn rate:  {:.1}%", rate * 100.0);
    }
}

/// Print a ranked feature importance table
pub fn print_importance(importance: &FeatureImportance) {
    println!("\nFeature importance:");
    println!("  {:<20} | Importance", "Feature");
    println!("  {:-<20}-|-----------", "");
    for (name, score) in importance.ranked() {
        println!("  {:<20} | {:10.4}", name, score);
    }
}

pub fn print_prediction(result: &PredictionResult) {
    println!(
        "\n✓ Prediction: {} (Probability: {:.2}, threshold {:.2})",
        result.label(),
        result.probability,
        result.threshold
    );
}

/// Axis range covering `values` with a little padding on both sides
fn axis_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if min > max {
        return 0.0..1.0;
    }
    let padding = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - padding)..(max + padding)
}

/// Label for integer tick positions of a categorical axis
fn category_label(labels: &[String], position: f64) -> String {
    let index = position.round();
    if (position - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

/// Column name turned into a file-name friendly lowercase slug
fn file_slug(column: &str) -> String {
    let slug: String = column
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    slug.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_range_pads_values() {
        let range = axis_range([10.0, 30.0, 20.0].into_iter());
        assert!((range.start - 9.0).abs() < 1e-9);
        assert!((range.end - 31.0).abs() < 1e-9);
    }

    #[test]
    fn test_axis_range_degenerate_inputs() {
        assert_eq!(axis_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(axis_range([5.0].into_iter()), 4.0..6.0);
        assert_eq!(axis_range([f64::NAN, 2.0].into_iter()), 1.0..3.0);
    }

    #[test]
    fn test_category_label() {
        let labels = vec!["Not Churned".to_string(), "Churned".to_string()];

        assert_eq!(category_label(&labels, 0.0), "Not Churned");
        assert_eq!(category_label(&labels, 1.0), "Churned");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(category_label(&labels, -1.0), "");
    }

    #[test]
    fn test_file_slug() {
        assert_eq!(file_slug("Support Calls"), "support_calls");
        assert_eq!(file_slug("Tenure"), "tenure");
        assert_eq!(file_slug("(Total Spend)"), "total_spend");
    }
}
