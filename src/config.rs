//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.papersift.toml` files, including the review protocol that drives
//! prompting and aggregation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// The review protocol: research questions and criteria.
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output path for the tabular CSV export.
    #[serde(default = "default_csv_output")]
    pub csv_output: String,

    /// Output path for the narrative Markdown review.
    #[serde(default = "default_review_output")]
    pub review_output: String,

    /// Optional output path for the full JSON report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            csv_output: default_csv_output(),
            review_output: default_review_output(),
            json_output: None,
            verbose: false,
        }
    }
}

fn default_csv_output() -> String {
    "paper_analysis.csv".to_string()
}

fn default_review_output() -> String {
    "detailed_review.md".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name sent to the chat-completions endpoint.
    #[serde(default = "default_model")]
    pub name: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on transport failure.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Delay between successive API calls, in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Maximum characters of paper text sent per request.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_url: default_api_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            request_delay_ms: default_request_delay_ms(),
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

fn default_model() -> String {
    "gpt-4-0125-preview".to_string()
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> usize {
    3
}

fn default_request_delay_ms() -> u64 {
    500 // courtesy pause between calls to respect rate limits
}

fn default_max_prompt_chars() -> usize {
    7000 // abstract, intro, and conclusion fit comfortably
}

/// Paper scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum papers to analyze.
    #[serde(default = "default_max_papers")]
    pub max_papers: usize,

    /// Maximum PDF pages to extract per paper.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names to exclude from the walk.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_papers: default_max_papers(),
            max_pages: default_max_pages(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_papers() -> usize {
    200
}

fn default_max_pages() -> usize {
    10
}

fn default_extensions() -> Vec<String> {
    vec!["pdf", "txt"].into_iter().map(String::from).collect()
}

fn default_excludes() -> Vec<String> {
    vec!["excluded", "duplicates", "drafts"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> usize {
    50 * 1024 * 1024 // 50MB
}

/// A single research question in the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuestion {
    /// Short identifier used as the `rq_scores` key (e.g. "RQ1").
    pub id: String,
    /// The full question text.
    pub text: String,
}

/// The systematic-review protocol.
///
/// Supplied once per run and treated as immutable; every aggregation
/// call receives it by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Title of the review.
    #[serde(default = "default_protocol_title")]
    pub title: String,

    /// Ordered inclusion criteria.
    #[serde(default = "default_inclusion_criteria")]
    pub inclusion_criteria: Vec<String>,

    /// Ordered exclusion criteria.
    #[serde(default = "default_exclusion_criteria")]
    pub exclusion_criteria: Vec<String>,

    /// Publication time period covered by the review.
    #[serde(default = "default_time_period")]
    pub time_period: String,

    /// Fields the oracle is asked to extract from each paper.
    #[serde(default = "default_extraction_fields")]
    pub data_extraction_fields: Vec<String>,

    /// The research questions papers are scored against.
    #[serde(default = "default_research_questions")]
    pub research_questions: Vec<ResearchQuestion>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            title: default_protocol_title(),
            research_questions: default_research_questions(),
            inclusion_criteria: default_inclusion_criteria(),
            exclusion_criteria: default_exclusion_criteria(),
            time_period: default_time_period(),
            data_extraction_fields: default_extraction_fields(),
        }
    }
}

impl ProtocolConfig {
    /// The configured research-question ids, in protocol order.
    pub fn rq_ids(&self) -> Vec<String> {
        self.research_questions
            .iter()
            .map(|rq| rq.id.clone())
            .collect()
    }
}

fn default_protocol_title() -> String {
    "Healthcare AI Implementation Analysis: A Systematic Literature Review".to_string()
}

fn default_research_questions() -> Vec<ResearchQuestion> {
    vec![
        ResearchQuestion {
            id: "RQ1".to_string(),
            text: "What are the current implementations and applications of AI technologies \
                   across different healthcare domains?"
                .to_string(),
        },
        ResearchQuestion {
            id: "RQ2".to_string(),
            text: "How do AI-driven systems impact clinical decision-making and patient care \
                   outcomes?"
                .to_string(),
        },
        ResearchQuestion {
            id: "RQ3".to_string(),
            text: "What are the key challenges and success factors in implementing AI solutions \
                   in healthcare settings?"
                .to_string(),
        },
    ]
}

fn default_inclusion_criteria() -> Vec<String> {
    vec![
        "IC1: Studies focusing on practical AI implementation in healthcare settings",
        "IC2: Research presenting empirical evidence or case studies of AI applications",
        "IC3: Papers discussing technical implementation details or deployment strategies",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_exclusion_criteria() -> Vec<String> {
    vec![
        "EC1: Non-peer-reviewed materials (books, keynotes, technical reports, theses)",
        "EC2: Literature reviews or survey papers",
        "EC3: Duplicate studies or similar papers by same authors",
        "EC4: Theoretical papers without practical implementation",
        "EC5: Studies not focused on healthcare applications",
        "EC6: Grey literature, editorials, or opinion pieces",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_time_period() -> String {
    "2019-2025".to_string()
}

fn default_extraction_fields() -> Vec<String> {
    vec![
        "AI techniques used",
        "Healthcare domain",
        "Implementation scope",
        "Technical infrastructure",
        "Performance metrics",
        "Clinical impact",
        "Implementation challenges",
        "Success factors",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of papers detailed in the narrative review.
    #[serde(default = "default_top_papers")]
    pub top_papers: usize,

    /// Include per-paper summary paragraphs in the narrative review.
    #[serde(default = "default_true")]
    pub include_summaries: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_papers: default_top_papers(),
            include_summaries: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_top_papers() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".papersift.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Model settings - always override since they have defaults in CLI
        self.model.name = args.model.clone();
        self.model.api_url = args.api_url.clone();
        self.model.temperature = args.temperature;

        // Optional settings - only override if explicitly provided
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(max_papers) = args.max_papers {
            self.scanner.max_papers = max_papers;
        }
        if let Some(max_pages) = args.max_pages {
            self.scanner.max_pages = max_pages;
        }
        if let Some(ref extensions) = args.extensions {
            self.scanner.extensions = extensions.clone();
        }
        if let Some(ref excludes) = args.exclude {
            self.scanner.excludes = excludes.clone();
        }
        if let Some(top) = args.top {
            self.report.top_papers = top;
        }
        if let Some(ref csv_output) = args.csv_output {
            self.general.csv_output = csv_output.display().to_string();
        }
        if let Some(ref review_output) = args.review_output {
            self.general.review_output = review_output.display().to_string();
        }
        if let Some(ref json_output) = args.json_output {
            self.general.json_output = Some(json_output.display().to_string());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
