use anyhow::{Context, Result};
use clap::Parser;
use histcmp::cli::{Cli, OutputFormat};
use histcmp::collection::{compare_sets_with, HistogramSet};
use histcmp::comparison::{Comparator, CompareOptions};
use histcmp::metrics::TestKind;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Build comparison options from the config file and --tests list
fn build_options(args: &Cli) -> Result<CompareOptions> {
    let mut options = match &args.config {
        Some(path) => CompareOptions::from_file(path)?,
        None => CompareOptions::default(),
    };

    // An explicit test list replaces the configured battery
    if let Some(tests) = &args.tests {
        let mut selected = CompareOptions {
            min_common_nonzero_bins: options.min_common_nonzero_bins,
            short_timeout_ms: options.short_timeout_ms,
            long_timeout_ms: options.long_timeout_ms,
            ..CompareOptions::none()
        };
        for name in tests.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let kind = TestKind::from_name(name).with_context(|| {
                let known: Vec<_> = TestKind::ALL.iter().map(|k| k.flag()).collect();
                format!("Unknown test '{}' (expected one of: {})", name, known.join(", "))
            })?;
            selected = selected.with_test(kind, true);
        }
        options = selected;
    }

    Ok(options)
}

/// Compare a single histogram present in both files
fn run_single(
    comparator: &Comparator,
    left: &HistogramSet,
    right: &HistogramSet,
    name: &str,
    format: OutputFormat,
) -> Result<()> {
    let h1 = left
        .get(name)
        .with_context(|| format!("Histogram '{}' not found in left file", name))?;
    let h2 = right
        .get(name)
        .with_context(|| format!("Histogram '{}' not found in right file", name))?;

    let result = comparator.compare(h1, h2)?;
    match format {
        OutputFormat::Text => {
            println!("{}", name);
            print!("{}", result.to_report_string());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let options = build_options(&args)?;
    let comparator = Comparator::new(options)?;

    let left = HistogramSet::from_file(&args.left)?;
    let right = HistogramSet::from_file(&args.right)?;

    if let Some(name) = &args.name {
        return run_single(&comparator, &left, &right, name, args.format);
    }

    let comparison = compare_sets_with(&comparator, &left, &right)?;
    match args.format {
        OutputFormat::Text => print!("{}", comparison.to_report_string()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&comparison)?),
    }

    Ok(())
}
