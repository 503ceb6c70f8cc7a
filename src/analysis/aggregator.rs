//! Record aggregation and statistics.
//!
//! This module turns a batch of per-paper records into ranked and
//! cross-tabulated summaries. Everything here is a pure transformation:
//! no I/O, no shared state, and the input batch is never mutated, so
//! every operation can be called repeatedly with identical results.

use crate::config::ProtocolConfig;
use crate::models::{AggregateReport, LabelCounts, PaperRecord, ValidationError};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Which record field a tally counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyField {
    /// Single label per record.
    Domain,
    /// Multi-label fields: counted with per-record set semantics.
    Techniques,
    Challenges,
    SuccessFactors,
}

/// Validate a whole batch of records against the configured
/// research-question ids.
///
/// The first malformed record fails the batch; aggregates built from a
/// partially-valid batch would be silently skewed.
pub fn validate_records(
    records: &[PaperRecord],
    rq_ids: &[String],
) -> Result<(), ValidationError> {
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for record in records {
        if !seen_ids.insert(record.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: record.id.clone(),
            });
        }
        validate_record(record, rq_ids)?;
    }

    Ok(())
}

/// Validate a single record: exact research-question key set and all
/// scores within [0, 100].
pub fn validate_record(record: &PaperRecord, rq_ids: &[String]) -> Result<(), ValidationError> {
    for rq in rq_ids {
        match record.rq_scores.get(rq) {
            None => {
                return Err(ValidationError::MissingRqScore {
                    id: record.id.clone(),
                    rq: rq.clone(),
                })
            }
            Some(&score) if !(0.0..=100.0).contains(&score) => {
                return Err(ValidationError::ScoreOutOfRange {
                    id: record.id.clone(),
                    field: rq.clone(),
                    value: score,
                })
            }
            Some(_) => {}
        }
    }

    for rq in record.rq_scores.keys() {
        if !rq_ids.contains(rq) {
            return Err(ValidationError::UnknownRq {
                id: record.id.clone(),
                rq: rq.clone(),
            });
        }
    }

    if !(0.0..=100.0).contains(&record.overall_score) {
        return Err(ValidationError::ScoreOutOfRange {
            id: record.id.clone(),
            field: "overall".to_string(),
            value: record.overall_score,
        });
    }

    if !(0.0..=100.0).contains(&record.implementation_quality) {
        return Err(ValidationError::ScoreOutOfRange {
            id: record.id.clone(),
            field: "implementation quality".to_string(),
            value: record.implementation_quality,
        });
    }

    Ok(())
}

/// Rank records by `overall_score`, highest first.
///
/// The sort is stable: equal scores keep their relative input order, so
/// repeated runs over the same batch reproduce the same ranking.
pub fn rank(records: &[PaperRecord]) -> Vec<PaperRecord> {
    let mut ranked = records.to_vec();
    ranked.sort_by(|a, b| {
        b.overall_score
            .partial_cmp(&a.overall_score)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

/// Mean score per research question over included records only.
///
/// With zero included records every question maps to `None`: the
/// distinction between "no data" and "scored zero" matters downstream.
pub fn coverage(records: &[PaperRecord], rq_ids: &[String]) -> HashMap<String, Option<f64>> {
    let included: Vec<&PaperRecord> = records.iter().filter(|r| r.included).collect();

    rq_ids
        .iter()
        .map(|rq| {
            let scores: Vec<f64> = included
                .iter()
                .filter_map(|r| r.rq_scores.get(rq).copied())
                .collect();

            let mean = if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            };

            (rq.clone(), mean)
        })
        .collect()
}

/// Count how many records carry each label of the selected field.
///
/// Multi-label fields are deduplicated per record first, so a paper
/// that mentions the same technique twice still counts it once. Output
/// order is the order labels first appear across the input.
pub fn tally(records: &[PaperRecord], field: TallyField) -> LabelCounts {
    let mut counts: LabelCounts = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let labels: Vec<&str> = match field {
            TallyField::Domain => vec![record.domain.as_str()],
            TallyField::Techniques => record.techniques.iter().map(String::as_str).collect(),
            TallyField::Challenges => record.challenges.iter().map(String::as_str).collect(),
            TallyField::SuccessFactors => {
                record.success_factors.iter().map(String::as_str).collect()
            }
        };

        let mut seen: HashSet<&str> = HashSet::new();
        for label in labels {
            if !seen.insert(label) {
                continue;
            }
            match index.get(label) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(label.to_string(), counts.len());
                    counts.push((label.to_string(), 1));
                }
            }
        }
    }

    counts
}

/// Validate a batch and assemble the full aggregate report.
///
/// Returns an error naming the offending record if any record is
/// malformed; no partial report is produced.
pub fn build_report(
    records: &[PaperRecord],
    protocol: &ProtocolConfig,
) -> Result<AggregateReport, ValidationError> {
    let rq_ids = protocol.rq_ids();
    validate_records(records, &rq_ids)?;

    Ok(AggregateReport {
        ranking: rank(records),
        rq_coverage: coverage(records, &rq_ids),
        domain_counts: tally(records, TallyField::Domain),
        technique_counts: tally(records, TallyField::Techniques),
        challenge_counts: tally(records, TallyField::Challenges),
        success_factor_counts: tally(records, TallyField::SuccessFactors),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recommendation;

    fn record(id: &str, overall: f64, included: bool) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            included,
            inclusion_justification: String::new(),
            rq_scores: [
                ("RQ1".to_string(), 50.0),
                ("RQ2".to_string(), 60.0),
                ("RQ3".to_string(), 70.0),
            ]
            .into_iter()
            .collect(),
            implementation_quality: 50.0,
            overall_score: overall,
            domain: "Radiology".to_string(),
            techniques: vec!["CNN".to_string()],
            challenges: vec![],
            success_factors: vec![],
            summary: String::new(),
            key_findings: String::new(),
            implementation_details: String::new(),
            recommendation: if included {
                Recommendation::Include
            } else {
                Recommendation::Exclude
            },
        }
    }

    fn rq_ids() -> Vec<String> {
        vec!["RQ1".to_string(), "RQ2".to_string(), "RQ3".to_string()]
    }

    #[test]
    fn test_rank_orders_by_score_descending() {
        let records = vec![
            record("a.pdf", 40.0, true),
            record("b.pdf", 90.0, true),
            record("c.pdf", 70.0, true),
        ];

        let ranked = rank(&records);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b.pdf", "c.pdf", "a.pdf"]);
    }

    #[test]
    fn test_rank_tie_break_preserves_input_order() {
        let records = vec![
            record("first.pdf", 92.0, true),
            record("tied-early.pdf", 85.0, true),
            record("tied-late.pdf", 85.0, true),
        ];

        let ranked = rank(&records);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first.pdf", "tied-early.pdf", "tied-late.pdf"]);
    }

    #[test]
    fn test_rank_empty_input() {
        assert!(rank(&[]).is_empty());
    }

    #[test]
    fn test_rank_is_a_permutation() {
        let records = vec![
            record("a.pdf", 10.0, true),
            record("b.pdf", 99.0, false),
            record("c.pdf", 55.0, true),
        ];

        let ranked = rank(&records);
        assert_eq!(ranked.len(), records.len());
        for r in &records {
            assert!(ranked.iter().any(|x| x.id == r.id));
        }
        for pair in ranked.windows(2) {
            assert!(pair[0].overall_score >= pair[1].overall_score);
        }
    }

    #[test]
    fn test_coverage_means_over_included_only() {
        let mut excluded = record("out.pdf", 95.0, false);
        excluded.rq_scores.insert("RQ1".to_string(), 100.0);

        let mut a = record("a.pdf", 80.0, true);
        a.rq_scores.insert("RQ1".to_string(), 40.0);
        let mut b = record("b.pdf", 70.0, true);
        b.rq_scores.insert("RQ1".to_string(), 60.0);

        let cov = coverage(&[excluded, a, b], &rq_ids());
        assert_eq!(cov.get("RQ1"), Some(&Some(50.0)));
    }

    #[test]
    fn test_coverage_zero_included_is_undefined_not_zero() {
        let records = vec![record("a.pdf", 80.0, false), record("b.pdf", 60.0, false)];

        let cov = coverage(&records, &rq_ids());
        for rq in rq_ids() {
            assert_eq!(cov.get(&rq), Some(&None));
        }
    }

    #[test]
    fn test_tally_dedupes_labels_within_a_record() {
        let mut r = record("a.pdf", 50.0, true);
        r.techniques = vec!["ML".to_string(), "ML".to_string(), "NLP".to_string()];

        let counts = tally(&[r], TallyField::Techniques);
        assert_eq!(
            counts,
            vec![("ML".to_string(), 1), ("NLP".to_string(), 1)]
        );
    }

    #[test]
    fn test_tally_preserves_first_appearance_order() {
        let mut a = record("a.pdf", 50.0, true);
        a.techniques = vec!["ML".to_string()];
        let mut b = record("b.pdf", 50.0, true);
        b.techniques = vec!["LR".to_string(), "ML".to_string()];

        let counts = tally(&[a, b], TallyField::Techniques);
        assert_eq!(
            counts,
            vec![("ML".to_string(), 2), ("LR".to_string(), 1)]
        );
    }

    #[test]
    fn test_tally_domain_counts_one_label_per_record() {
        let mut a = record("a.pdf", 50.0, true);
        a.domain = "Radiology".to_string();
        let mut b = record("b.pdf", 50.0, true);
        b.domain = "Oncology".to_string();
        let mut c = record("c.pdf", 50.0, true);
        c.domain = "Radiology".to_string();

        let counts = tally(&[a, b, c], TallyField::Domain);
        assert_eq!(
            counts,
            vec![("Radiology".to_string(), 2), ("Oncology".to_string(), 1)]
        );
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let records = vec![
            record("a.pdf", 92.0, true),
            record("b.pdf", 85.0, true),
            record("c.pdf", 85.0, false),
        ];
        let ids = rq_ids();

        let first: Vec<String> = rank(&records).iter().map(|r| r.id.clone()).collect();
        let second: Vec<String> = rank(&records).iter().map(|r| r.id.clone()).collect();
        assert_eq!(first, second);

        assert_eq!(coverage(&records, &ids), coverage(&records, &ids));
        assert_eq!(
            tally(&records, TallyField::Techniques),
            tally(&records, TallyField::Techniques)
        );
    }

    #[test]
    fn test_validate_missing_rq_fails_the_batch() {
        let good = record("good.pdf", 50.0, true);
        let mut bad = record("bad.pdf", 50.0, true);
        bad.rq_scores.remove("RQ2");

        let err = validate_records(&[good, bad], &rq_ids()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingRqScore {
                id: "bad.pdf".to_string(),
                rq: "RQ2".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_overall_score_out_of_range() {
        let bad = record("bad.pdf", 101.0, true);

        let err = validate_records(&[bad], &rq_ids()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ScoreOutOfRange { ref id, ref field, .. }
                if id == "bad.pdf" && field == "overall"
        ));
    }

    #[test]
    fn test_validate_unknown_rq_rejected() {
        let mut bad = record("bad.pdf", 50.0, true);
        bad.rq_scores.insert("RQ9".to_string(), 10.0);

        let err = validate_records(&[bad], &rq_ids()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownRq {
                id: "bad.pdf".to_string(),
                rq: "RQ9".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_duplicate_id_rejected() {
        let a = record("same.pdf", 50.0, true);
        let b = record("same.pdf", 60.0, true);

        let err = validate_records(&[a, b], &rq_ids()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DuplicateId {
                id: "same.pdf".to_string(),
            }
        );
    }

    #[test]
    fn test_build_report_end_to_end() {
        let records = vec![
            record("top.pdf", 92.0, true),
            record("tied-early.pdf", 85.0, true),
            record("tied-late.pdf", 85.0, true),
        ];
        let protocol = ProtocolConfig::default();

        let report = build_report(&records, &protocol).unwrap();

        let ids: Vec<&str> = report.ranking.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["top.pdf", "tied-early.pdf", "tied-late.pdf"]);
        assert_eq!(report.included_count(), 3);
        assert_eq!(report.rq_coverage.get("RQ1"), Some(&Some(50.0)));
        assert_eq!(report.domain_counts, vec![("Radiology".to_string(), 3)]);
    }

    #[test]
    fn test_build_report_rejects_malformed_batch() {
        let mut bad = record("bad.pdf", 50.0, true);
        bad.rq_scores.remove("RQ1");

        let err = build_report(&[bad], &ProtocolConfig::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad.pdf"));
        assert!(msg.contains("RQ1"));
    }
}
