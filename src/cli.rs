//! CLI argument parsing for stackscrub

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Format of the trace read from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Printed stack trace text (default)
    Text,
    /// JSON throwable record, as written by `--format json`
    Json,
}

/// Format of the cleaned trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Printed stack trace text (default)
    Text,
    /// JSON throwable record for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "stackscrub")]
#[command(version)]
#[command(about = "Strip assertion-library and test-runner noise from failure stack traces", long_about = None)]
pub struct Cli {
    /// Read the trace from FILE instead of stdin
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Input format
    #[arg(long = "input-format", value_enum, default_value = "text")]
    pub input_format: InputFormat,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// TOML table of class supertypes used to recognize custom subjects and runners
    #[arg(long = "types", value_name = "FILE")]
    pub types: Option<PathBuf>,

    /// Class-name suffix marking test classes that are never hidden (repeatable, default: Test)
    #[arg(long = "test-suffix", value_name = "SUFFIX")]
    pub test_suffixes: Vec<String>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["stackscrub"]);
        assert!(cli.input.is_none());
        assert_eq!(cli.input_format, InputFormat::Text);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.types.is_none());
        assert!(cli.test_suffixes.is_empty());
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_input_file() {
        let cli = Cli::parse_from(["stackscrub", "-i", "trace.txt"]);
        assert_eq!(cli.input, Some(PathBuf::from("trace.txt")));
    }

    #[test]
    fn test_cli_json_formats() {
        let cli = Cli::parse_from(["stackscrub", "--input-format", "json", "--format", "json"]);
        assert_eq!(cli.input_format, InputFormat::Json);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_repeated_test_suffix() {
        let cli = Cli::parse_from(["stackscrub", "--test-suffix", "Test", "--test-suffix", "Spec"]);
        assert_eq!(cli.test_suffixes, vec!["Test".to_string(), "Spec".to_string()]);
    }

    #[test]
    fn test_cli_types_and_debug() {
        let cli = Cli::parse_from(["stackscrub", "--types", "types.toml", "--debug"]);
        assert_eq!(cli.types, Some(PathBuf::from("types.toml")));
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["stackscrub", "--format", "xml"]).is_err());
    }
}
