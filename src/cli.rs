//! CLI argument parsing for histcmp

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for comparison results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "histcmp")]
#[command(version)]
#[command(
    about = "Compare histograms from two production runs with a battery of statistical tests",
    long_about = None
)]
pub struct Cli {
    /// Histograms of the run under test (JSON record, array or object)
    #[arg(value_name = "FILE_A")]
    pub left: PathBuf,

    /// Histograms of the reference run
    #[arg(value_name = "FILE_B")]
    pub right: PathBuf,

    /// Compare only the histogram with this name
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Comparison options from a TOML file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run exactly these tests (e.g. --tests chisq,ks,anderson_darling)
    #[arg(short = 't', long = "tests", value_name = "LIST", value_delimiter = ',')]
    pub tests: Option<Vec<String>>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_files() {
        let cli = Cli::parse_from(["histcmp", "run.json", "reference.json"]);
        assert_eq!(cli.left, PathBuf::from("run.json"));
        assert_eq!(cli.right, PathBuf::from("reference.json"));
        assert!(cli.name.is_none());
        assert!(cli.config.is_none());
        assert!(cli.tests.is_none());
    }

    #[test]
    fn test_cli_requires_two_files() {
        assert!(Cli::try_parse_from(["histcmp", "run.json"]).is_err());
    }

    #[test]
    fn test_cli_format_default_text() {
        let cli = Cli::parse_from(["histcmp", "a.json", "b.json"]);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from(["histcmp", "--format", "json", "a.json", "b.json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["histcmp", "--format", "csv", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_cli_tests_list() {
        let cli = Cli::parse_from(["histcmp", "--tests", "chisq,ks,AD", "a.json", "b.json"]);
        assert_eq!(
            cli.tests,
            Some(vec!["chisq".to_string(), "ks".to_string(), "AD".to_string()])
        );
    }

    #[test]
    fn test_cli_name_and_config() {
        let cli = Cli::parse_from([
            "histcmp",
            "-n",
            "PrimaryEnergy",
            "--config",
            "options.toml",
            "a.json",
            "b.json",
        ]);
        assert_eq!(cli.name.as_deref(), Some("PrimaryEnergy"));
        assert_eq!(cli.config, Some(PathBuf::from("options.toml")));
    }

    #[test]
    fn test_cli_debug_flag() {
        let cli = Cli::parse_from(["histcmp", "--debug", "a.json", "b.json"]);
        assert!(cli.debug);
    }
}
