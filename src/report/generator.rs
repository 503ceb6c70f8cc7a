//! Report generation.
//!
//! Three emitters over the same aggregate data: a CSV export with one
//! row per paper plus its derived rank, a narrative Markdown review,
//! and a JSON dump of the full report.

use crate::config::ProtocolConfig;
use crate::models::{LabelCounts, PaperRecord, ReviewReport};
use anyhow::Result;

/// Generate the tabular CSV export: one row per record, in ranking
/// order, with the rank as the first column.
pub fn generate_csv_report(report: &ReviewReport, protocol: &ProtocolConfig) -> String {
    let mut output = String::new();

    let mut header: Vec<String> = vec!["Rank".into(), "File".into(), "Included".into()];
    for rq in &protocol.research_questions {
        header.push(format!("{} Score", rq.id));
    }
    header.extend([
        "Implementation Quality".to_string(),
        "Overall Score".to_string(),
        "Recommendation".to_string(),
        "Domain".to_string(),
        "Techniques".to_string(),
        "Summary".to_string(),
    ]);
    output.push_str(&csv_row(&header));

    for (i, record) in report.aggregate.ranking.iter().enumerate() {
        let mut row: Vec<String> = vec![
            (i + 1).to_string(),
            record.id.clone(),
            record.included.to_string(),
        ];
        for rq in &protocol.research_questions {
            let score = record.rq_scores.get(&rq.id).copied().unwrap_or(0.0);
            row.push(format_score(score));
        }
        row.extend([
            format_score(record.implementation_quality),
            format_score(record.overall_score),
            record.recommendation.to_string(),
            record.domain.clone(),
            record.techniques.join("; "),
            record.summary.clone(),
        ]);
        output.push_str(&csv_row(&row));
    }

    output
}

/// Format one CSV row with quoting where needed.
fn csv_row(fields: &[String]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_escape(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push('\n');
    row
}

/// Quote a CSV field if it contains a delimiter, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render a score without a trailing `.0` for whole numbers.
fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{:.1}", score)
    }
}

/// Generate the narrative Markdown review.
pub fn generate_markdown_report(
    report: &ReviewReport,
    protocol: &ProtocolConfig,
    top_papers: usize,
    include_summaries: bool,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}: Detailed Paper Review\n\n", protocol.title));
    output.push_str(&format!(
        "*Generated on {}*\n\n",
        report.metadata.analysis_date.format("%Y-%m-%d")
    ));

    output.push_str(&generate_protocol_section(protocol));
    output.push_str(&generate_run_section(report));
    output.push_str(&generate_coverage_section(report, protocol));
    output.push_str(&generate_top_papers_section(
        report,
        protocol,
        top_papers,
        include_summaries,
    ));
    output.push_str(&generate_findings_section(report));

    output
}

/// Generate the research-questions header section.
fn generate_protocol_section(protocol: &ProtocolConfig) -> String {
    let mut section = String::new();

    section.push_str("## Research Questions\n\n");
    for rq in &protocol.research_questions {
        section.push_str(&format!("- {}: {}\n", rq.id, rq.text));
    }
    section.push('\n');

    section
}

/// Generate the screening-run summary section.
fn generate_run_section(report: &ReviewReport) -> String {
    let meta = &report.metadata;
    let mut section = String::new();

    section.push_str("## Screening Summary\n\n");
    section.push_str(&format!("- **Papers Directory:** {}\n", meta.papers_dir));
    section.push_str(&format!("- **Model Used:** `{}`\n", meta.model_used));
    section.push_str(&format!("- **Papers Scanned:** {}\n", meta.papers_scanned));
    section.push_str(&format!("- **Papers Analyzed:** {}\n", meta.papers_analyzed));
    if meta.papers_failed > 0 {
        section.push_str(&format!("- **Papers Failed:** {}\n", meta.papers_failed));
    }
    section.push_str(&format!("- **Papers Included:** {}\n", meta.papers_included));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        meta.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the per-research-question coverage section.
fn generate_coverage_section(report: &ReviewReport, protocol: &ProtocolConfig) -> String {
    let mut section = String::new();

    section.push_str("## Research Question Coverage\n\n");
    section.push_str("Mean relevance across included papers:\n\n");

    for rq in &protocol.research_questions {
        match report.aggregate.rq_coverage.get(&rq.id) {
            Some(Some(mean)) => {
                section.push_str(&format!("- {}: {:.1}/100\n", rq.id, mean));
            }
            _ => {
                section.push_str(&format!("- {}: no included papers\n", rq.id));
            }
        }
    }
    section.push('\n');

    section
}

/// Generate the ranked top-papers section.
fn generate_top_papers_section(
    report: &ReviewReport,
    protocol: &ProtocolConfig,
    top_papers: usize,
    include_summaries: bool,
) -> String {
    let mut section = String::new();

    section.push_str("## Top Papers for Inclusion\n\n");

    let included: Vec<&PaperRecord> = report.aggregate.included().take(top_papers).collect();

    if included.is_empty() {
        section.push_str("No papers met the inclusion criteria.\n\n");
        return section;
    }

    for (i, record) in included.iter().enumerate() {
        section.push_str(&format!("### {}. {}\n\n", i + 1, record.id));
        section.push_str(&format!(
            "**Overall Score:** {}/100\n\n",
            format_score(record.overall_score)
        ));

        if include_summaries && !record.summary.is_empty() {
            section.push_str(&format!("**Summary:** {}\n\n", record.summary));
        }

        section.push_str("**Research Question Relevance:**\n");
        for rq in &protocol.research_questions {
            let score = record.rq_scores.get(&rq.id).copied().unwrap_or(0.0);
            section.push_str(&format!("- {}: {}/100\n", rq.id, format_score(score)));
        }
        section.push('\n');

        section.push_str("**Implementation Details:**\n");
        section.push_str(&format!(
            "- Domain: {}\n",
            non_empty_or(&record.domain, "Not specified")
        ));
        section.push_str(&format!(
            "- Techniques: {}\n",
            if record.techniques.is_empty() {
                "Not specified".to_string()
            } else {
                record.techniques.join(", ")
            }
        ));
        section.push_str(&format!(
            "- Approach: {}\n",
            non_empty_or(&record.implementation_details, "Not described")
        ));
        section.push_str(&format!(
            "- Implementation Quality: {}/100\n\n",
            format_score(record.implementation_quality)
        ));

        section.push_str("**Key Findings:**\n");
        section.push_str(&format!(
            "{}\n\n",
            non_empty_or(&record.key_findings, "Not described")
        ));

        if !record.challenges.is_empty() {
            section.push_str("**Challenges Identified:**\n");
            for challenge in &record.challenges {
                section.push_str(&format!("- {}\n", challenge));
            }
            section.push('\n');
        }

        if !record.success_factors.is_empty() {
            section.push_str("**Success Factors:**\n");
            for factor in &record.success_factors {
                section.push_str(&format!("- {}\n", factor));
            }
            section.push('\n');
        }

        section.push_str("---\n\n");
    }

    section
}

/// Generate the cross-paper frequency listings.
fn generate_findings_section(report: &ReviewReport) -> String {
    let mut section = String::new();

    section.push_str("## Summary of Findings\n\n");
    section.push_str(&generate_count_listing(
        "Domains Covered",
        &report.aggregate.domain_counts,
    ));
    section.push_str(&generate_count_listing(
        "Techniques Used",
        &report.aggregate.technique_counts,
    ));
    section.push_str(&generate_count_listing(
        "Common Implementation Challenges",
        &report.aggregate.challenge_counts,
    ));
    section.push_str(&generate_count_listing(
        "Reported Success Factors",
        &report.aggregate.success_factor_counts,
    ));

    section
}

/// Render one frequency listing, in first-appearance order.
fn generate_count_listing(title: &str, counts: &LabelCounts) -> String {
    if counts.is_empty() {
        return String::new();
    }

    let mut listing = String::new();
    listing.push_str(&format!("### {}\n\n", title));
    for (label, count) in counts {
        listing.push_str(&format!(
            "- {}: {} papers\n",
            non_empty_or(label, "Unspecified"),
            count
        ));
    }
    listing.push('\n');

    listing
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ReviewReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
