//! Completeness scoring for parse results.
//!
//! Used to A/B compare extraction strategies before committing a bulk
//! re-parse. The weighting is configurable rather than fixed; tune it
//! against real documents.

use crate::models::config::ScoreConfig;
use crate::models::job::{JobRecord, ParseResult};

/// Weighted completeness scorer.
pub struct QualityScorer {
    activity: f32,
    address: f32,
    postcode: f32,
}

impl QualityScorer {
    /// Build a scorer from configured weights, normalized to sum to 1.
    pub fn new(config: &ScoreConfig) -> Self {
        let total = config.activity_weight + config.address_weight + config.postcode_weight;
        let total = if total > 0.0 { total } else { 1.0 };
        Self {
            activity: config.activity_weight / total,
            address: config.address_weight / total,
            postcode: config.postcode_weight / total,
        }
    }

    /// Weighted completeness of a single record.
    pub fn record_completeness(&self, record: &JobRecord) -> f32 {
        let mut score = 0.0;
        if record.activity.is_some() {
            score += self.activity;
        }
        if record.address.is_some() {
            score += self.address;
        }
        if record.postcode.is_some() {
            score += self.postcode;
        }
        score
    }

    /// Weighted completeness over a set of accepted records.
    ///
    /// Empty input scores zero: a parse that accepted nothing has no
    /// demonstrated completeness.
    pub fn score(&self, records: &[JobRecord]) -> f32 {
        if records.is_empty() {
            return 0.0;
        }
        let sum: f32 = records.iter().map(|r| self.record_completeness(r)).sum();
        sum / records.len() as f32
    }

    /// Compare two strategies' results over the same document.
    pub fn compare(&self, table: &ParseResult, line: &ParseResult) -> StrategyComparison {
        StrategyComparison {
            table_score: table.completeness_score,
            table_accepted: table.accepted.len(),
            line_score: line.completeness_score,
            line_accepted: line.accepted.len(),
        }
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(&ScoreConfig::default())
    }
}

/// Side-by-side strategy comparison for one document.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyComparison {
    pub table_score: f32,
    pub table_accepted: usize,
    pub line_score: f32,
    pub line_accepted: usize,
}

impl StrategyComparison {
    /// The strategy this comparison favors. Ties prefer table mode, the
    /// higher-fidelity extraction.
    pub fn preferred(&self) -> &'static str {
        if self.line_score > self.table_score {
            "line"
        } else {
            "table"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(activity: bool, address: bool, postcode: bool) -> JobRecord {
        let mut record = JobRecord::new("4269797", NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        record.activity = activity.then(|| "SURVEY".to_string());
        record.address = address.then(|| "MANCHESTER".to_string());
        record.postcode = postcode.then(|| "M1 1AA".to_string());
        record
    }

    #[test]
    fn test_full_record_scores_one() {
        let scorer = QualityScorer::default();
        let score = scorer.score(&[record(true, true, true)]);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_batch_scores_zero() {
        let scorer = QualityScorer::default();
        assert_eq!(scorer.score(&[]), 0.0);
    }

    #[test]
    fn test_weights_apply() {
        let config = ScoreConfig {
            activity_weight: 1.0,
            address_weight: 0.0,
            postcode_weight: 0.0,
        };
        let scorer = QualityScorer::new(&config);

        assert!((scorer.score(&[record(true, false, false)]) - 1.0).abs() < 1e-6);
        assert_eq!(scorer.score(&[record(false, true, true)]), 0.0);
    }

    #[test]
    fn test_partial_batch() {
        let scorer = QualityScorer::default();
        let score = scorer.score(&[record(true, true, true), record(false, false, false)]);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_comparison_prefers_table_on_tie() {
        let comparison = StrategyComparison {
            table_score: 0.8,
            table_accepted: 10,
            line_score: 0.8,
            line_accepted: 10,
        };
        assert_eq!(comparison.preferred(), "table");
    }
}
