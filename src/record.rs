//! Per-question result records.
//!
//! A record is recomputed from scratch out of the unit's fact lists and the
//! rater's current selections every time a unit is left or the session is
//! saved, so re-visiting and re-rating a question can never double-count.
//! Records accumulate in an insertion-ordered ledger keyed by question id;
//! the persisted results file is the ledger's records as one JSON array.

use crate::choice::AccuracyLabel;
use crate::dataset::EvaluationUnit;
use crate::session::UnitSelections;
use crate::sources::UnitId;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Flat evaluation counts for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct EvaluationRecord {
    pub question_id: UnitId,
    pub question_text: String,

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
    pub irrelevant_essential_model: usize,
    pub relevant_optional_model: usize,
    pub irrelevant_optional_model: usize,

    pub is_actionable: bool,
}

/// Whether a safety-critical fact is covered by the model answer.
///
/// Lowercases the fact, splits on whitespace, keeps tokens longer than
/// three characters, and counts the fact covered when at least 70% of the
/// kept tokens appear as substrings of the lowercased answer. A fact with
/// no kept tokens is never covered. Approximate on purpose; safety
/// coverage is scored automatically, not by the rater.
pub fn safety_fact_covered(fact: &str, model_answer: &str) -> bool {
    let fact = fact.to_lowercase();
    let tokens: Vec<&str> = fact
        .split_whitespace()
        .filter(|token| token.chars().count() > 3)
        .collect();
    if tokens.is_empty() {
        return false;
    }

    let answer = model_answer.to_lowercase();
    let hits = tokens.iter().filter(|&&token| answer.contains(token)).count();
    hits as f64 >= 0.7 * tokens.len() as f64
}

/// Fold a unit's fact lists and the rater's selections into a record.
///
/// Pure and idempotent: totals come from list lengths, counts from summing
/// the current indicator state.
pub fn finalize_record(unit: &EvaluationUnit, selections: &UnitSelections) -> EvaluationRecord {
    fn count_true(flags: &[bool]) -> usize {
        flags.iter().filter(|&&flag| flag).count()
    }
    fn count_label(labels: &[AccuracyLabel], want: AccuracyLabel) -> usize {
        labels.iter().filter(|&&label| label == want).count()
    }

    let truth = &unit.ground_truth_facts;
    let model = &unit.model_facts;

    let covered_safety_critical = truth
        .safety_critical
        .iter()
        .filter(|fact| safety_fact_covered(fact, &unit.model_answer))
        .count();

    let relevant_essential = count_true(&selections.relevant_essential);
    let relevant_optional = count_true(&selections.relevant_optional);

    EvaluationRecord {
        question_id: unit.id.clone(),
        question_text: unit.question.clone(),

        total_essential_ground_truth: truth.essential.len(),
        covered_essential_ground_truth: count_true(&selections.covered_essential),
        total_optional_ground_truth: truth.optional.len(),
        covered_optional_ground_truth: count_true(&selections.covered_optional),
        total_safety_critical_ground_truth: truth.safety_critical.len(),
        covered_safety_critical_ground_truth: covered_safety_critical,

        total_essential_model: model.essential.len(),
        accurate_essential_model: count_label(
            &selections.accuracy_essential,
            AccuracyLabel::Accurate,
        ),
        inaccurate_essential_model: count_label(
            &selections.accuracy_essential,
            AccuracyLabel::Inaccurate,
        ),
        not_mentioned_essential_model: count_label(
            &selections.accuracy_essential,
            AccuracyLabel::NotMentioned,
        ),
        total_optional_model: model.optional.len(),
        accurate_optional_model: count_label(
            &selections.accuracy_optional,
            AccuracyLabel::Accurate,
        ),
        inaccurate_optional_model: count_label(
            &selections.accuracy_optional,
            AccuracyLabel::Inaccurate,
        ),
        not_mentioned_optional_model: count_label(
            &selections.accuracy_optional,
            AccuracyLabel::NotMentioned,
        ),

        relevant_essential_model: relevant_essential,
        irrelevant_essential_model: model.essential.len() - relevant_essential,
        relevant_optional_model: relevant_optional,
        irrelevant_optional_model: model.optional.len() - relevant_optional,

        is_actionable: selections.actionable,
    }
}

/// Insertion-ordered collection of records, one per rated question.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ResultsLedger {
    records: Vec<EvaluationRecord>,
}

impl ResultsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, or replace an existing record for the same
    /// question in place. First-insertion order is preserved.
    pub fn upsert(&mut self, record: EvaluationRecord) {
        match self
            .records
            .iter_mut()
            .find(|existing| existing.question_id == record.question_id)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn get(&self, id: &UnitId) -> Option<&EvaluationRecord> {
        self.records.iter().find(|record| &record.question_id == id)
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
