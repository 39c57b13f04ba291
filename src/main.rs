//! churnboard: customer churn dashboard CLI
//!
//! This is the main entrypoint that loads the artifacts, prints the summary
//! metrics, answers what-if predictions and renders the charts.

use anyhow::{Context, Result};
use churnboard::{viz, Args, Dashboard, FeatureVector};
use clap::Parser;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.resolve_config().context("invalid configuration")?;
    // Reject malformed --predict input before loading anything
    let overrides = args.prediction_overrides()?;

    let start_time = Instant::now();
    let dashboard = Dashboard::load(config).context("failed to load dashboard artifacts")?;
    tracing::info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "dashboard artifacts loaded"
    );

    run_summary(&dashboard);

    if let Some(overrides) = overrides {
        run_prediction(&dashboard, overrides);
    }

    if args.no_charts {
        tracing::debug!("chart rendering disabled");
    } else {
        run_charts(&dashboard)?;
    }

    if args.verbose {
        println!(
            "\nTotal processing time: {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Print metric cards and the feature importance table
fn run_summary(dashboard: &Dashboard) {
    match (dashboard.summary(), dashboard.churn_distribution()) {
        (Ok(metrics), Ok(distribution)) => viz::print_summary(&metrics, &distribution),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "summary unavailable");
            println!("✗ Summary unavailable: {e}");
        }
    }
    viz::print_importance(dashboard.importance());
}

/// Run one what-if prediction; failures are reported, not fatal
fn run_prediction(dashboard: &Dashboard, overrides: FeatureVector) {
    println!("\n=== Churn Probability ===");
    for (name, value) in dashboard.what_if_inputs(overrides.clone()).iter() {
        println!("  {name}: {value}");
    }

    match dashboard.what_if(overrides) {
        Ok(result) => viz::print_prediction(&result),
        Err(e) => {
            tracing::warn!(error = %e, "prediction rejected");
            println!("\n✗ Prediction failed: {e}");
        }
    }
}

/// Render all charts into the configured output directory
fn run_charts(dashboard: &Dashboard) -> Result<()> {
    let output_dir = &dashboard.config().output_dir;
    let viz_start = Instant::now();

    let written = viz::generate_dashboard_charts(dashboard, output_dir)
        .with_context(|| format!("failed to render charts into {}", output_dir.display()))?;

    println!("\n✓ {} charts saved to {}", written.len(), output_dir.display());
    tracing::debug!(
        elapsed_ms = viz_start.elapsed().as_millis() as u64,
        "charts rendered"
    );
    Ok(())
}
