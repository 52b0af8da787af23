//! CLI argument definitions for the semsearch binary.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use semsearch_core::config::SemsearchConfig;

/// Queries run when none are given on the command line.
pub const SAMPLE_QUERIES: [&str; 3] = [
    "Is Microsoft Office 365 any good?",
    "Tell me about the reviews for Photoshop",
    "Does Paint Shop work well?",
];

/// Dataset read when neither `--data` nor `SEMSEARCH_DATA` is set.
pub const DEFAULT_DATA_FILE: &str = "Software_5.json";

/// semsearch - semantic search over a JSON Lines review corpus.
#[derive(Parser, Debug)]
#[command(name = "semsearch", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// JSON Lines dataset, one record per line.
    #[arg(short = 'd', long = "data")]
    pub data: Option<PathBuf>,

    /// Maximum number of records to load.
    #[arg(short = 'n', long = "limit")]
    pub limit: Option<usize>,

    /// Number of results per query.
    #[arg(short = 'k', long = "top-k")]
    pub top_k: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Queries to run. Defaults to three sample queries.
    pub queries: Vec<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SEMSEARCH_CONFIG env var > ~/.semsearch/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SEMSEARCH_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the dataset path.
    ///
    /// Priority: --data flag > SEMSEARCH_DATA env var > `Software_5.json`.
    pub fn resolve_data_path(&self) -> PathBuf {
        if let Some(ref p) = self.data {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SEMSEARCH_DATA") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_DATA_FILE)
    }

    /// Resolve the record limit: --limit flag > config file value.
    pub fn resolve_limit(&self, config: &SemsearchConfig) -> usize {
        self.limit.unwrap_or(config.corpus.limit)
    }

    /// Resolve results per query: --top-k flag > config file value.
    pub fn resolve_top_k(&self, config: &SemsearchConfig) -> usize {
        self.top_k.unwrap_or(config.search.default_top_k)
    }

    /// Resolve the log level: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Queries given on the command line, or the sample queries.
    pub fn resolve_queries(&self) -> Vec<String> {
        if self.queries.is_empty() {
            SAMPLE_QUERIES.iter().map(|q| q.to_string()).collect()
        } else {
            self.queries.clone()
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".semsearch").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".semsearch").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("semsearch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_fall_back_to_config() {
        let args = parse(&[]);
        let mut config = SemsearchConfig::default();
        config.corpus.limit = 42;
        config.search.default_top_k = 7;

        assert_eq!(args.resolve_limit(&config), 42);
        assert_eq!(args.resolve_top_k(&config), 7);
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&["--limit", "10", "-k", "3", "--log-level", "debug"]);
        let config = SemsearchConfig::default();

        assert_eq!(args.resolve_limit(&config), 10);
        assert_eq!(args.resolve_top_k(&config), 3);
        assert_eq!(args.resolve_log_level("info"), "debug");
    }

    #[test]
    fn test_explicit_paths_win() {
        let args = parse(&["--config", "/tmp/custom.toml", "--data", "/tmp/reviews.jsonl"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/custom.toml"));
        assert_eq!(args.resolve_data_path(), PathBuf::from("/tmp/reviews.jsonl"));
    }

    #[test]
    fn test_sample_queries_when_none_given() {
        let queries = parse(&[]).resolve_queries();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "Is Microsoft Office 365 any good?");
    }

    #[test]
    fn test_positional_queries() {
        let args = parse(&["-k", "2", "antivirus", "tax software"]);
        assert_eq!(args.resolve_queries(), vec!["antivirus", "tax software"]);
    }

    #[test]
    fn test_rejects_non_numeric_limit() {
        assert!(CliArgs::try_parse_from(["semsearch", "--limit", "many"]).is_err());
    }
}
