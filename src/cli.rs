//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// PaperSift - LLM-assisted paper screening for systematic literature reviews
///
/// Scan a directory of research papers, score each one against the
/// review protocol using an OpenAI-compatible model, and generate
/// tabular and narrative reports.
///
/// Examples:
///   papersift --papers ./papers
///   papersift --papers ./papers --model gpt-4o-mini --top 5
///   papersift --papers ./papers --dry-run
///   papersift --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing the papers to screen
    ///
    /// Scanned recursively for PDF (and plain-text) files.
    /// Not required when using --init-config.
    #[arg(short, long, value_name = "DIR", required_unless_present = "init_config")]
    pub papers: Option<PathBuf>,

    /// Model to use for analysis
    ///
    /// Any model name accepted by the configured chat-completions endpoint.
    /// Can also be set via PAPERSIFT_MODEL env var or .papersift.toml config.
    #[arg(
        short,
        long,
        default_value = "gpt-4-0125-preview",
        env = "PAPERSIFT_MODEL"
    )]
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, default_value = "https://api.openai.com/v1", env = "OPENAI_BASE_URL")]
    pub api_url: String,

    /// Output path for the tabular CSV export
    #[arg(long, value_name = "FILE")]
    pub csv_output: Option<PathBuf>,

    /// Output path for the narrative Markdown review
    #[arg(long, value_name = "FILE")]
    pub review_output: Option<PathBuf>,

    /// Output path for the full JSON report
    ///
    /// No JSON is written unless this is set here or in the config file.
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .papersift.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum number of papers to analyze
    #[arg(long, value_name = "COUNT")]
    pub max_papers: Option<usize>,

    /// Maximum PDF pages to extract per paper
    ///
    /// The opening pages usually carry the abstract, introduction, and
    /// conclusions, which is what the screening needs.
    #[arg(long, value_name = "PAGES")]
    pub max_pages: Option<usize>,

    /// File extensions to include (comma-separated)
    ///
    /// Example: --extensions pdf,txt
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Directory names to exclude from the scan (comma-separated)
    ///
    /// Example: --exclude "drafts,duplicates"
    #[arg(long, value_name = "DIRS", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Temperature for LLM responses (0.0 - 1.0)
    ///
    /// Lower values produce more consistent/deterministic output
    #[arg(long, default_value = "0.1")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of papers detailed in the narrative review
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Dry run: scan the papers directory without calling the model
    ///
    /// Shows which files would be analyzed and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .papersift.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate API URL format (not needed for dry-run)
        if !self.dry_run
            && !self.api_url.starts_with("http://")
            && !self.api_url.starts_with("https://")
        {
            return Err("API URL must start with 'http://' or 'https://'".to_string());
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(max_papers) = self.max_papers {
            if max_papers == 0 {
                return Err("Max papers must be at least 1".to_string());
            }
        }

        if let Some(max_pages) = self.max_pages {
            if max_pages == 0 {
                return Err("Max pages must be at least 1".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Validate papers directory
        match self.papers {
            Some(ref dir) => {
                if !dir.exists() {
                    return Err(format!("Papers directory does not exist: {}", dir.display()));
                }
                if !dir.is_dir() {
                    return Err(format!("Papers path is not a directory: {}", dir.display()));
                }
            }
            None => return Err("A papers directory is required".to_string()),
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            papers: Some(PathBuf::from(".")),
            model: "test-model".to_string(),
            api_url: "https://api.openai.com/v1".to_string(),
            csv_output: None,
            review_output: None,
            json_output: None,
            config: None,
            verbose: false,
            quiet: false,
            max_papers: None,
            max_pages: None,
            extensions: None,
            exclude: None,
            temperature: 0.1,
            timeout: None,
            top: None,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        let args = make_args();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_api_url() {
        let mut args = make_args();
        args.api_url = "localhost:8080".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_papers_dir() {
        let mut args = make_args();
        args.papers = Some(PathBuf::from("/nonexistent/papers"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut args = make_args();
        args.temperature = 1.5;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
