//! Manufacturability score: severity-weighted deductions from 100

use crate::core::rulebook::RuleBook;
use crate::entities::issue::ManufacturingIssue;
use crate::entities::response::Rating;

/// Score in [0, 100]; there is no normalization by issue count
pub fn score(issues: &[ManufacturingIssue], rules: &RuleBook) -> f64 {
    let deduction: f64 = issues
        .iter()
        .map(|i| rules.severity_weights.weight(i.severity))
        .sum();
    (100.0 - deduction).clamp(0.0, 100.0)
}

pub fn rate(score: f64, rules: &RuleBook) -> Rating {
    rules.rating_thresholds.rate(score)
}

/// Round to one decimal place for reporting
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
