//! Prompt construction for the paper analyzer.

use crate::config::ProtocolConfig;

/// Build the system prompt from the review protocol.
///
/// The prompt embeds the research questions, criteria, and the exact
/// JSON shape the model must reply with. Keys of `rq_scores` are the
/// configured research-question ids, so the reply lines up with the
/// aggregation layer without any remapping.
pub fn system_prompt(protocol: &ProtocolConfig) -> String {
    let research_questions = protocol
        .research_questions
        .iter()
        .map(|rq| format!("{}: {}", rq.id, rq.text))
        .collect::<Vec<_>>()
        .join("\n");

    let rq_score_keys = protocol
        .research_questions
        .iter()
        .map(|rq| format!("\"{}\": <0-100>", rq.id))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are an expert reviewer for a systematic literature review. Your task is to evaluate research papers for inclusion and score them against the review protocol below.

SYSTEMATIC LITERATURE REVIEW INFORMATION:
Title: {title}

Research Questions:
{research_questions}

Inclusion Criteria:
{inclusion}

Exclusion Criteria:
{exclusion}

Time Period: {time_period}

Data Extraction Fields: {extraction_fields}

Analyze the paper content to determine:
1. If it meets the inclusion criteria and avoids exclusion criteria
2. How well it addresses each research question
3. The quality and relevance of the implementation details
4. The overall value for this literature review

Output your analysis as a JSON object with the following structure:
{{
  "meets_inclusion_criteria": true/false,
  "inclusion_justification": "Brief explanation of why it meets or fails inclusion criteria",
  "rq_scores": {{{rq_score_keys}}},
  "implementation_quality": <0-100>,
  "summary": "2-3 sentence summary of the paper",
  "techniques": ["technique1", "technique2"],
  "domain": "The specific domain addressed",
  "implementation_details": "Brief description of implementation approach",
  "key_findings": "Brief summary of key findings",
  "challenges": ["challenge1", "challenge2"],
  "success_factors": ["factor1", "factor2"],
  "overall_score": <0-100>,
  "recommendation": "Include" or "Exclude"
}}

Every score must be between 0 and 100. Only output valid JSON, no explanations or markdown."#,
        title = protocol.title,
        research_questions = research_questions,
        inclusion = protocol.inclusion_criteria.join("\n"),
        exclusion = protocol.exclusion_criteria.join("\n"),
        time_period = protocol.time_period,
        extraction_fields = protocol.data_extraction_fields.join(", "),
    )
}

/// Build the user prompt carrying the (truncated) paper text.
pub fn user_prompt(paper_text: &str, max_chars: usize) -> String {
    format!(
        "Here is a research paper to analyze (extracted content from the beginning of the paper):\n\n{}",
        truncate_chars(paper_text, max_chars)
    )
}

/// Truncate a string to at most `max_chars` characters.
///
/// Counts characters rather than bytes so multibyte text never gets cut
/// mid-codepoint.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
