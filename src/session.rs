//! Evaluation session engine.
//!
//! The engine owns the sampled units, the rater's per-unit selections, and
//! the results ledger. The presentation surface feeds it one event at a
//! time through [`SessionEngine::handle_event`] and redraws from engine
//! state when told to; no rating decision lives outside this module.
//!
//! Leaving a unit (navigation or finish) folds its selections into a
//! record, upserts the ledger, and persists the whole ledger through the
//! configured sink. A failed write is reported as a warning on the outcome
//! rather than an error: the ledger is kept in memory and the next save
//! event retries, so a broken disk costs the rater nothing but a retry.

use crate::choice::{resolve_exclusive, AccuracyLabel};
use crate::dataset::EvaluationUnit;
use crate::error::{RaterError, Result};
use crate::persistence::{ResultsSink, SessionSnapshot};
use crate::record::{finalize_record, ResultsLedger};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which fact list within a unit an event addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub enum FactTier {
    Essential,
    Optional,
}

impl fmt::Display for FactTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactTier::Essential => write!(f, "essential"),
            FactTier::Optional => write!(f, "optional"),
        }
    }
}

/// The rater's live state for one unit.
///
/// Indicator vectors are index-aligned with the unit's fact lists. Ground
/// truth coverage starts uncovered, model facts start `NotMentioned` and
/// relevant, the unit starts not actionable. Safety-critical facts carry
/// no live state; their coverage is computed at finalize time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct UnitSelections {
    pub covered_essential: Vec<bool>,
    pub covered_optional: Vec<bool>,
    pub accuracy_essential: Vec<AccuracyLabel>,
    pub accuracy_optional: Vec<AccuracyLabel>,
    pub relevant_essential: Vec<bool>,
    pub relevant_optional: Vec<bool>,
    pub actionable: bool,
}

impl UnitSelections {
    /// Default selections sized to a unit's fact lists.
    pub fn for_unit(unit: &EvaluationUnit) -> Self {
        Self {
            covered_essential: vec![false; unit.ground_truth_facts.essential.len()],
            covered_optional: vec![false; unit.ground_truth_facts.optional.len()],
            accuracy_essential: vec![AccuracyLabel::default(); unit.model_facts.essential.len()],
            accuracy_optional: vec![AccuracyLabel::default(); unit.model_facts.optional.len()],
            relevant_essential: vec![true; unit.model_facts.essential.len()],
            relevant_optional: vec![true; unit.model_facts.optional.len()],
            actionable: false,
        }
    }

    fn matches_unit(&self, unit: &EvaluationUnit) -> bool {
        self.covered_essential.len() == unit.ground_truth_facts.essential.len()
            && self.covered_optional.len() == unit.ground_truth_facts.optional.len()
            && self.accuracy_essential.len() == unit.model_facts.essential.len()
            && self.accuracy_optional.len() == unit.model_facts.optional.len()
            && self.relevant_essential.len() == unit.model_facts.essential.len()
            && self.relevant_optional.len() == unit.model_facts.optional.len()
    }
}

/// One rater input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Flip the covered flag of a ground-truth fact.
    CoverageToggled { tier: FactTier, index: usize },
    /// A snapshot of the three accuracy checkboxes for one model fact, in
    /// label order (Accurate, Inaccurate, NotMentioned).
    AccuracySignals {
        tier: FactTier,
        index: usize,
        signals: [bool; 3],
    },
    /// Flip the relevant flag of a model fact.
    RelevanceToggled { tier: FactTier, index: usize },
    /// Flip the unit's actionability flag.
    ActionabilityToggled,
    Next,
    Previous,
    Finish,
}

/// What the surface must do after an event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventOutcome {
    /// Engine state changed in a way the surface must re-render.
    pub redraw: bool,
    /// The session ended with a successful final save.
    pub finished: bool,
    /// Non-fatal persistence warning to show the rater.
    pub warning: Option<String>,
}

/// State machine for one rating session.
pub struct SessionEngine<S: ResultsSink> {
    units: Vec<EvaluationUnit>,
    current: usize,
    selections: Vec<UnitSelections>,
    results: ResultsLedger,
    sink: S,
}

impl<S: ResultsSink> SessionEngine<S> {
    /// Start a fresh session over the sampled units.
    pub fn new(units: Vec<EvaluationUnit>, sink: S) -> Result<Self> {
        if units.is_empty() {
            return Err(RaterError::InvalidConfig(
                "cannot start a session with no units".to_string(),
            ));
        }
        let selections = units.iter().map(UnitSelections::for_unit).collect();
        Ok(Self {
            units,
            current: 0,
            selections,
            results: ResultsLedger::new(),
            sink,
        })
    }

    /// Rebuild a session from a saved snapshot.
    pub fn from_snapshot(snapshot: SessionSnapshot, sink: S) -> Result<Self> {
        let SessionSnapshot {
            units,
            current_index,
            selections,
            results,
        } = snapshot;

        let consistent = !units.is_empty()
            && current_index < units.len()
            && selections.len() == units.len()
            && units
                .iter()
                .zip(&selections)
                .all(|(unit, sel)| sel.matches_unit(unit));
        if !consistent {
            return Err(RaterError::Serialization(
                "session snapshot does not match its units".to_string(),
            ));
        }

        Ok(Self {
            units,
            current: current_index,
            selections,
            results,
            sink,
        })
    }

    /// Capture the full session state for later resumption.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            units: self.units.clone(),
            current_index: self.current,
            selections: self.selections.clone(),
            results: self.results.clone(),
        }
    }

    pub fn current_unit(&self) -> &EvaluationUnit {
        &self.units[self.current]
    }

    pub fn current_selections(&self) -> &UnitSelections {
        &self.selections[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.units.len()
    }

    pub fn results(&self) -> &ResultsLedger {
        &self.results
    }

    /// Apply one event and report what the surface should do next.
    ///
    /// Events are strictly sequential: each is fully resolved before the
    /// next is accepted. Navigation at the ends of the unit list is a
    /// no-op.
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<EventOutcome> {
        match event {
            SessionEvent::CoverageToggled { tier, index } => {
                let flags = match tier {
                    FactTier::Essential => &mut self.selections[self.current].covered_essential,
                    FactTier::Optional => &mut self.selections[self.current].covered_optional,
                };
                let flag = flags.get_mut(index).ok_or_else(|| {
                    RaterError::InvalidSelection(format!(
                        "no {} ground-truth fact at index {}",
                        tier, index
                    ))
                })?;
                *flag = !*flag;
                Ok(EventOutcome {
                    redraw: true,
                    ..EventOutcome::default()
                })
            }
            SessionEvent::AccuracySignals {
                tier,
                index,
                signals,
            } => {
                let labels = match tier {
                    FactTier::Essential => &mut self.selections[self.current].accuracy_essential,
                    FactTier::Optional => &mut self.selections[self.current].accuracy_optional,
                };
                let label = labels.get_mut(index).ok_or_else(|| {
                    RaterError::InvalidSelection(format!(
                        "no {} model fact at index {}",
                        tier, index
                    ))
                })?;
                *label = resolve_exclusive(*label, &signals);
                Ok(EventOutcome {
                    redraw: true,
                    ..EventOutcome::default()
                })
            }
            SessionEvent::RelevanceToggled { tier, index } => {
                let flags = match tier {
                    FactTier::Essential => &mut self.selections[self.current].relevant_essential,
                    FactTier::Optional => &mut self.selections[self.current].relevant_optional,
                };
                let flag = flags.get_mut(index).ok_or_else(|| {
                    RaterError::InvalidSelection(format!(
                        "no {} model fact at index {}",
                        tier, index
                    ))
                })?;
                *flag = !*flag;
                Ok(EventOutcome {
                    redraw: true,
                    ..EventOutcome::default()
                })
            }
            SessionEvent::ActionabilityToggled => {
                let selections = &mut self.selections[self.current];
                selections.actionable = !selections.actionable;
                Ok(EventOutcome {
                    redraw: true,
                    ..EventOutcome::default()
                })
            }
            SessionEvent::Next => {
                if self.is_last() {
                    return Ok(EventOutcome::default());
                }
                let warning = self.commit_current();
                self.current += 1;
                Ok(EventOutcome {
                    redraw: true,
                    finished: false,
                    warning,
                })
            }
            SessionEvent::Previous => {
                if self.is_first() {
                    return Ok(EventOutcome::default());
                }
                let warning = self.commit_current();
                self.current -= 1;
                Ok(EventOutcome {
                    redraw: true,
                    finished: false,
                    warning,
                })
            }
            SessionEvent::Finish => {
                let warning = self.commit_current();
                Ok(EventOutcome {
                    redraw: false,
                    finished: warning.is_none(),
                    warning,
                })
            }
        }
    }

    /// Finalize the current unit into the ledger and persist everything.
    ///
    /// The record is recomputed from current state, so committing the same
    /// unit repeatedly overwrites rather than accumulates. Returns a
    /// warning message when the write failed; the ledger keeps the record
    /// either way.
    fn commit_current(&mut self) -> Option<String> {
        let record = finalize_record(&self.units[self.current], &self.selections[self.current]);
        self.results.upsert(record);
        match self.sink.persist(self.results.records()) {
            Ok(()) => None,
            Err(e) => Some(format!("results were not saved: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EvaluationRecord;
    use crate::sources::{ManualKeyFacts, ModelKeyFacts, UnitId};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Sink that remembers every persisted ledger state.
    #[derive(Clone, Default)]
    struct MemorySink {
        writes: Rc<RefCell<Vec<Vec<EvaluationRecord>>>>,
        failures_left: Rc<Cell<usize>>,
    }

    impl MemorySink {
        fn failing(times: usize) -> Self {
            let sink = Self::default();
            sink.failures_left.set(times);
            sink
        }

        fn write_count(&self) -> usize {
            self.writes.borrow().len()
        }

        fn last_write(&self) -> Vec<EvaluationRecord> {
            self.writes.borrow().last().cloned().unwrap_or_default()
        }
    }

    impl ResultsSink for MemorySink {
        fn persist(&mut self, records: &[EvaluationRecord]) -> Result<()> {
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(RaterError::Serialization("disk full".to_string()));
            }
            self.writes.borrow_mut().push(records.to_vec());
            Ok(())
        }
    }

    fn unit(id: i64) -> EvaluationUnit {
        EvaluationUnit {
            id: UnitId::Int(id),
            question: format!("question {}", id),
            manual_answer: "manual".to_string(),
            model_answer: "model".to_string(),
            ground_truth_facts: ManualKeyFacts {
                essential: vec!["truth a".to_string(), "truth b".to_string()],
                optional: vec!["truth c".to_string()],
                safety_critical: vec![],
            },
            model_facts: ModelKeyFacts {
                essential: vec!["claim a".to_string(), "claim b".to_string()],
                optional: vec!["claim c".to_string()],
            },
        }
    }

    fn engine(n: i64) -> (SessionEngine<MemorySink>, MemorySink) {
        let sink = MemorySink::default();
        let engine = SessionEngine::new((0..n).map(unit).collect(), sink.clone()).unwrap();
        (engine, sink)
    }

    #[test]
    fn test_empty_session_is_rejected() {
        assert!(SessionEngine::new(vec![], MemorySink::default()).is_err());
    }

    #[test]
    fn test_defaults_for_fresh_unit() {
        let (engine, _) = engine(1);
        let selections = engine.current_selections();

        assert_eq!(selections.covered_essential, vec![false, false]);
        assert_eq!(selections.accuracy_essential, vec![AccuracyLabel::NotMentioned; 2]);
        assert_eq!(selections.relevant_essential, vec![true, true]);
        assert!(!selections.actionable);
    }

    #[test]
    fn test_accuracy_signals_resolve_to_one_label() {
        let (mut engine, _) = engine(1);

        let outcome = engine
            .handle_event(SessionEvent::AccuracySignals {
                tier: FactTier::Essential,
                index: 0,
                signals: [true, false, true],
            })
            .unwrap();

        assert!(outcome.redraw);
        assert_eq!(
            engine.current_selections().accuracy_essential[0],
            AccuracyLabel::Accurate
        );
    }

    #[test]
    fn test_clearing_accuracy_falls_back_to_not_mentioned() {
        let (mut engine, _) = engine(1);
        engine
            .handle_event(SessionEvent::AccuracySignals {
                tier: FactTier::Optional,
                index: 0,
                signals: [false, true, false],
            })
            .unwrap();
        engine
            .handle_event(SessionEvent::AccuracySignals {
                tier: FactTier::Optional,
                index: 0,
                signals: [false, false, false],
            })
            .unwrap();

        assert_eq!(
            engine.current_selections().accuracy_optional[0],
            AccuracyLabel::NotMentioned
        );
    }

    #[test]
    fn test_toggles_flip_state() {
        let (mut engine, _) = engine(1);

        engine
            .handle_event(SessionEvent::CoverageToggled {
                tier: FactTier::Essential,
                index: 1,
            })
            .unwrap();
        engine
            .handle_event(SessionEvent::RelevanceToggled {
                tier: FactTier::Essential,
                index: 0,
            })
            .unwrap();
        engine.handle_event(SessionEvent::ActionabilityToggled).unwrap();

        let selections = engine.current_selections();
        assert_eq!(selections.covered_essential, vec![false, true]);
        assert_eq!(selections.relevant_essential, vec![false, true]);
        assert!(selections.actionable);
    }

    #[test]
    fn test_out_of_range_fact_index_is_rejected() {
        let (mut engine, _) = engine(1);

        let err = engine
            .handle_event(SessionEvent::CoverageToggled {
                tier: FactTier::Optional,
                index: 5,
            })
            .unwrap_err();

        assert!(matches!(err, RaterError::InvalidSelection(_)));
    }

    #[test]
    fn test_toggles_do_not_persist() {
        let (mut engine, sink) = engine(2);
        engine.handle_event(SessionEvent::ActionabilityToggled).unwrap();

        assert_eq!(sink.write_count(), 0);
    }

    #[test]
    fn test_next_finalizes_and_persists() {
        let (mut engine, sink) = engine(2);
        engine.handle_event(SessionEvent::ActionabilityToggled).unwrap();

        let outcome = engine.handle_event(SessionEvent::Next).unwrap();

        assert!(outcome.redraw);
        assert!(outcome.warning.is_none());
        assert_eq!(engine.current_index(), 1);
        assert_eq!(sink.write_count(), 1);
        let saved = sink.last_write();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].question_id, UnitId::Int(0));
        assert!(saved[0].is_actionable);
    }

    #[test]
    fn test_boundary_navigation_is_a_noop() {
        let (mut engine, sink) = engine(2);

        let outcome = engine.handle_event(SessionEvent::Previous).unwrap();
        assert_eq!(outcome, EventOutcome::default());

        engine.handle_event(SessionEvent::Next).unwrap();
        let outcome = engine.handle_event(SessionEvent::Next).unwrap();
        assert_eq!(outcome, EventOutcome::default());

        assert_eq!(engine.current_index(), 1);
        assert_eq!(sink.write_count(), 1);
    }

    #[test]
    fn test_back_navigation_rehydrates_selections() {
        let (mut engine, _) = engine(2);
        engine
            .handle_event(SessionEvent::AccuracySignals {
                tier: FactTier::Essential,
                index: 1,
                signals: [false, true, true],
            })
            .unwrap();
        engine
            .handle_event(SessionEvent::CoverageToggled {
                tier: FactTier::Optional,
                index: 0,
            })
            .unwrap();

        engine.handle_event(SessionEvent::Next).unwrap();
        engine.handle_event(SessionEvent::Previous).unwrap();

        let selections = engine.current_selections();
        assert_eq!(selections.accuracy_essential[1], AccuracyLabel::Inaccurate);
        assert_eq!(selections.covered_optional, vec![true]);
    }

    #[test]
    fn test_revisiting_overwrites_instead_of_accumulating() {
        let (mut engine, sink) = engine(2);
        engine
            .handle_event(SessionEvent::CoverageToggled {
                tier: FactTier::Essential,
                index: 0,
            })
            .unwrap();
        engine.handle_event(SessionEvent::Next).unwrap();
        engine.handle_event(SessionEvent::Previous).unwrap();
        engine
            .handle_event(SessionEvent::CoverageToggled {
                tier: FactTier::Essential,
                index: 1,
            })
            .unwrap();
        engine.handle_event(SessionEvent::Next).unwrap();

        let saved = sink.last_write();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].question_id, UnitId::Int(0));
        assert_eq!(saved[0].covered_essential_ground_truth, 2);
        assert_eq!(engine.results().len(), 2);
    }

    #[test]
    fn test_failed_write_warns_and_keeps_ledger() {
        let sink = MemorySink::failing(1);
        let mut engine =
            SessionEngine::new((0..3).map(unit).collect(), sink.clone()).unwrap();

        let outcome = engine.handle_event(SessionEvent::Next).unwrap();

        assert!(outcome.warning.is_some());
        assert_eq!(engine.current_index(), 1, "navigation proceeds despite the failure");
        assert_eq!(engine.results().len(), 1);
        assert_eq!(sink.write_count(), 0);

        // The next navigation retries with both records intact.
        let outcome = engine.handle_event(SessionEvent::Next).unwrap();
        assert!(outcome.warning.is_none());
        assert_eq!(sink.last_write().len(), 2);
    }

    #[test]
    fn test_finish_reports_finished_only_on_successful_save() {
        let (mut engine, sink) = engine(1);
        let outcome = engine.handle_event(SessionEvent::Finish).unwrap();
        assert!(outcome.finished);
        assert!(outcome.warning.is_none());
        assert_eq!(sink.last_write().len(), 1);

        let failing = MemorySink::failing(1);
        let mut engine = SessionEngine::new(vec![unit(0)], failing.clone()).unwrap();
        let outcome = engine.handle_event(SessionEvent::Finish).unwrap();
        assert!(!outcome.finished);
        assert!(outcome.warning.is_some());
        assert_eq!(engine.results().len(), 1, "record retained for retry");

        let outcome = engine.handle_event(SessionEvent::Finish).unwrap();
        assert!(outcome.finished);
        assert_eq!(engine.results().len(), 1);
    }

    #[test]
    fn test_snapshot_roundtrip_restores_session() {
        let (mut engine, sink) = engine(3);
        engine
            .handle_event(SessionEvent::AccuracySignals {
                tier: FactTier::Essential,
                index: 0,
                signals: [true, false, true],
            })
            .unwrap();
        engine.handle_event(SessionEvent::Next).unwrap();
        engine.handle_event(SessionEvent::ActionabilityToggled).unwrap();

        let snapshot = engine.snapshot();
        let restored = SessionEngine::from_snapshot(snapshot, sink).unwrap();

        assert_eq!(restored.current_index(), 1);
        assert_eq!(restored.unit_count(), 3);
        assert!(restored.current_selections().actionable);
        assert_eq!(restored.results().len(), 1);
        assert_eq!(
            restored.selections[0].accuracy_essential[0],
            AccuracyLabel::Accurate
        );
    }

    #[test]
    fn test_inconsistent_snapshot_is_rejected() {
        let (engine, sink) = engine(2);
        let mut snapshot = engine.snapshot();
        snapshot.current_index = 7;

        assert!(SessionEngine::from_snapshot(snapshot, sink.clone()).is_err());

        let (engine, _) = self::engine(2);
        let mut snapshot = engine.snapshot();
        snapshot.selections.pop();
        assert!(SessionEngine::from_snapshot(snapshot, sink).is_err());
    }
}
