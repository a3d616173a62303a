//! Session-level aggregation of per-question records.

use crate::record::EvaluationRecord;
use std::fmt;

/// Totals folded across every rated question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsSummary {
    pub questions: usize,
    pub actionable: usize,

    pub total_essential_ground_truth: usize,
    pub covered_essential_ground_truth: usize,
    pub total_optional_ground_truth: usize,
    pub covered_optional_ground_truth: usize,
    pub total_safety_critical_ground_truth: usize,
    pub covered_safety_critical_ground_truth: usize,

    pub total_essential_model: usize,
    pub accurate_essential_model: usize,
    pub inaccurate_essential_model: usize,
    pub not_mentioned_essential_model: usize,
    pub total_optional_model: usize,
    pub accurate_optional_model: usize,
    pub inaccurate_optional_model: usize,
    pub not_mentioned_optional_model: usize,

    pub relevant_essential_model: usize,
    pub relevant_optional_model: usize,
}

impl ResultsSummary {
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        let mut summary = Self {
            questions: records.len(),
            ..Self::default()
        };

        for record in records {
            if record.is_actionable {
                summary.actionable += 1;
            }

            summary.total_essential_ground_truth += record.total_essential_ground_truth;
            summary.covered_essential_ground_truth += record.covered_essential_ground_truth;
            summary.total_optional_ground_truth += record.total_optional_ground_truth;
            summary.covered_optional_ground_truth += record.covered_optional_ground_truth;
            summary.total_safety_critical_ground_truth +=
                record.total_safety_critical_ground_truth;
            summary.covered_safety_critical_ground_truth +=
                record.covered_safety_critical_ground_truth;

            summary.total_essential_model += record.total_essential_model;
            summary.accurate_essential_model += record.accurate_essential_model;
            summary.inaccurate_essential_model += record.inaccurate_essential_model;
            summary.not_mentioned_essential_model += record.not_mentioned_essential_model;
            summary.total_optional_model += record.total_optional_model;
            summary.accurate_optional_model += record.accurate_optional_model;
            summary.inaccurate_optional_model += record.inaccurate_optional_model;
            summary.not_mentioned_optional_model += record.not_mentioned_optional_model;

            summary.relevant_essential_model += record.relevant_essential_model;
            summary.relevant_optional_model += record.relevant_optional_model;
        }

        summary
    }

    /// Print the summary block to stdout.
    pub fn print_summary(&self) {
        println!("{}", self);
    }
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

impl fmt::Display for ResultsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "─".repeat(60))?;
        writeln!(f, "Evaluation Summary")?;
        writeln!(f, "{}", "─".repeat(60))?;
        writeln!(f, "Questions rated:    {}", self.questions)?;
        writeln!(
            f,
            "Actionable answers: {}/{} ({:.1}%)",
            self.actionable,
            self.questions,
            pct(self.actionable, self.questions)
        )?;
        writeln!(f)?;
        writeln!(f, "Ground-truth coverage:")?;
        writeln!(
            f,
            "  Essential:             {}/{} ({:.1}%)",
            self.covered_essential_ground_truth,
            self.total_essential_ground_truth,
            pct(
                self.covered_essential_ground_truth,
                self.total_essential_ground_truth
            )
        )?;
        writeln!(
            f,
            "  Optional:              {}/{} ({:.1}%)",
            self.covered_optional_ground_truth,
            self.total_optional_ground_truth,
            pct(
                self.covered_optional_ground_truth,
                self.total_optional_ground_truth
            )
        )?;
        writeln!(
            f,
            "  Safety-critical (auto): {}/{} ({:.1}%)",
            self.covered_safety_critical_ground_truth,
            self.total_safety_critical_ground_truth,
            pct(
                self.covered_safety_critical_ground_truth,
                self.total_safety_critical_ground_truth
            )
        )?;
        writeln!(f)?;
        writeln!(f, "Model fact accuracy (essential):")?;
        writeln!(
            f,
            "  Accurate:      {}/{} ({:.1}%)",
            self.accurate_essential_model,
            self.total_essential_model,
            pct(self.accurate_essential_model, self.total_essential_model)
        )?;
        writeln!(f, "  Inaccurate:    {}", self.inaccurate_essential_model)?;
        writeln!(f, "  Not mentioned: {}", self.not_mentioned_essential_model)?;
        writeln!(f, "Model fact accuracy (optional):")?;
        writeln!(
            f,
            "  Accurate:      {}/{} ({:.1}%)",
            self.accurate_optional_model,
            self.total_optional_model,
            pct(self.accurate_optional_model, self.total_optional_model)
        )?;
        writeln!(f, "  Inaccurate:    {}", self.inaccurate_optional_model)?;
        writeln!(f, "  Not mentioned: {}", self.not_mentioned_optional_model)?;
        writeln!(f)?;
        writeln!(f, "Relevance:")?;
        writeln!(
            f,
            "  Essential: {}/{} relevant",
            self.relevant_essential_model, self.total_essential_model
        )?;
        writeln!(
            f,
            "  Optional:  {}/{} relevant",
            self.relevant_optional_model, self.total_optional_model
        )?;
        write!(f, "{}", "─".repeat(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::UnitId;

    fn record(id: i64) -> EvaluationRecord {
        EvaluationRecord {
            question_id: UnitId::Int(id),
            question_text: format!("question {}", id),
            total_essential_ground_truth: 4,
            covered_essential_ground_truth: 3,
            total_optional_ground_truth: 2,
            covered_optional_ground_truth: 1,
            total_safety_critical_ground_truth: 1,
            covered_safety_critical_ground_truth: 1,
            total_essential_model: 3,
            accurate_essential_model: 2,
            inaccurate_essential_model: 1,
            not_mentioned_essential_model: 0,
            total_optional_model: 2,
            accurate_optional_model: 0,
            inaccurate_optional_model: 0,
            not_mentioned_optional_model: 2,
            relevant_essential_model: 3,
            irrelevant_essential_model: 0,
            relevant_optional_model: 1,
            irrelevant_optional_model: 1,
            is_actionable: id % 2 == 0,
        }
    }

    #[test]
    fn test_summary_sums_across_records() {
        let summary = ResultsSummary::from_records(&[record(1), record(2)]);

        assert_eq!(summary.questions, 2);
        assert_eq!(summary.actionable, 1);
        assert_eq!(summary.total_essential_ground_truth, 8);
        assert_eq!(summary.covered_essential_ground_truth, 6);
        assert_eq!(summary.covered_safety_critical_ground_truth, 2);
        assert_eq!(summary.accurate_essential_model, 4);
        assert_eq!(summary.not_mentioned_optional_model, 4);
        assert_eq!(summary.relevant_optional_model, 2);
    }

    #[test]
    fn test_summary_of_no_records_is_all_zero() {
        let summary = ResultsSummary::from_records(&[]);

        assert_eq!(summary, ResultsSummary::default());
        // Rendering must not divide by zero.
        let rendered = summary.to_string();
        assert!(rendered.contains("Questions rated:    0"));
        assert!(rendered.contains("0/0 (0.0%)"));
    }

    #[test]
    fn test_summary_rendering_mentions_every_section() {
        let rendered = ResultsSummary::from_records(&[record(1)]).to_string();

        assert!(rendered.contains("Ground-truth coverage"));
        assert!(rendered.contains("Safety-critical (auto): 1/1 (100.0%)"));
        assert!(rendered.contains("Model fact accuracy (essential)"));
        assert!(rendered.contains("Accurate:      2/3 (66.7%)"));
        assert!(rendered.contains("Relevance"));
    }
}
