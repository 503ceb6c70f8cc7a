//! Data models for the paper screener.
//!
//! This module contains all the core data structures used throughout
//! the application for representing analyzed papers, aggregate
//! statistics, and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The oracle's include/exclude recommendation for a paper.
///
/// Carried alongside the `included` flag: `included` records whether
/// the paper passed the inclusion criteria, while the recommendation is
/// the model's overall verdict for the review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Include,
    Exclude,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Include => write!(f, "Include"),
            Recommendation::Exclude => write!(f, "Exclude"),
        }
    }
}

impl From<&str> for Recommendation {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "include" | "included" => Recommendation::Include,
            _ => Recommendation::Exclude,
        }
    }
}

/// One analyzed paper, as returned by the analysis oracle.
///
/// Records are immutable once produced: the aggregation layer consumes
/// them read-only and never mutates the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Path to the paper relative to the papers root. Unique per batch.
    pub id: String,
    /// Whether the paper passed the inclusion criteria.
    pub included: bool,
    /// Why the paper met or failed the inclusion criteria.
    pub inclusion_justification: String,
    /// Relevance score per research-question id, each in [0, 100].
    /// Keys must be exactly the configured research-question set.
    pub rq_scores: HashMap<String, f64>,
    /// Quality of the reported implementation, in [0, 100].
    /// Oracle-supplied; not derived from the other scores.
    pub implementation_quality: f64,
    /// Overall value for the review, in [0, 100]. Oracle-supplied and
    /// independent of `rq_scores`.
    pub overall_score: f64,
    /// Domain label (e.g. "Radiology", "Clinical decision support").
    pub domain: String,
    /// Techniques used in the paper.
    pub techniques: Vec<String>,
    /// Implementation challenges the paper identifies.
    pub challenges: Vec<String>,
    /// Success factors the paper identifies.
    pub success_factors: Vec<String>,
    /// 2-3 sentence summary of the paper.
    pub summary: String,
    /// Key findings, in the oracle's words.
    pub key_findings: String,
    /// Description of the implementation approach.
    pub implementation_details: String,
    /// The oracle's overall verdict.
    pub recommendation: Recommendation,
}

/// Validation failure for a batch of records.
///
/// A single malformed record rejects the whole batch rather than being
/// defaulted or dropped; a review built on silently-skewed aggregates
/// is worse than no review.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("paper `{id}` has no score for research question `{rq}`")]
    MissingRqScore { id: String, rq: String },

    #[error("paper `{id}` scores unknown research question `{rq}`")]
    UnknownRq { id: String, rq: String },

    #[error("paper `{id}`: {field} score {value} is outside [0, 100]")]
    ScoreOutOfRange {
        id: String,
        field: String,
        value: f64,
    },

    #[error("duplicate paper id `{id}`")]
    DuplicateId { id: String },
}

/// A label frequency table preserving first-appearance order.
///
/// Kept as a vector of pairs rather than a map so the report listing
/// order matches the order labels first occur across the batch.
pub type LabelCounts = Vec<(String, usize)>;

/// Aggregate statistics derived from a batch of records.
///
/// Stateless and recomputed from scratch each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Records ordered by `overall_score` descending; ties keep the
    /// input order (stable sort).
    pub ranking: Vec<PaperRecord>,
    /// Mean score per research question over included records only.
    /// `None` when no records are included: "no data", not zero.
    pub rq_coverage: HashMap<String, Option<f64>>,
    /// Papers per domain label.
    pub domain_counts: LabelCounts,
    /// Papers per technique label.
    pub technique_counts: LabelCounts,
    /// Papers per challenge label.
    pub challenge_counts: LabelCounts,
    /// Papers per success-factor label.
    pub success_factor_counts: LabelCounts,
}

impl AggregateReport {
    /// Records that passed the inclusion criteria, in ranking order.
    pub fn included(&self) -> impl Iterator<Item = &PaperRecord> {
        self.ranking.iter().filter(|r| r.included)
    }

    /// Number of records that passed the inclusion criteria.
    pub fn included_count(&self) -> usize {
        self.ranking.iter().filter(|r| r.included).count()
    }
}

/// Metadata about a screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Directory the papers were loaded from.
    pub papers_dir: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Name of the model used.
    pub model_used: String,
    /// Number of paper files found by the scanner.
    pub papers_scanned: usize,
    /// Number of papers successfully analyzed.
    pub papers_analyzed: usize,
    /// Number of papers that failed extraction or analysis.
    pub papers_failed: usize,
    /// Number of analyzed papers that passed inclusion criteria.
    pub papers_included: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete screening report: metadata plus aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    pub metadata: ReportMetadata,
    pub aggregate: AggregateReport,
}
