//! QA Rater - A terminal tool for human evaluation of AI-generated answers.
//!
//! This library rates AI assistant answers against a manually curated
//! answer key. A human rater steps through a sampled set of questions and
//! judges, fact by fact, how well the AI answer covers the ground truth
//! and how trustworthy its own claims are.
//!
//! # Overview
//!
//! The tool works in three stages:
//! 1. Joins the manual answer key with the AI-extracted key facts on
//!    `(id, question)` and deterministically samples a fraction of the
//!    joined set
//! 2. Steps the rater through each sampled question, collecting coverage,
//!    accuracy, relevance, and actionability judgments as input events
//! 3. Folds every judgment into a flat per-question record, accumulated in
//!    an insertion-ordered ledger and persisted as a JSON results file
//!
//! # Quick Start
//!
//! ```no_run
//! use qa_rater::{
//!     config::Config,
//!     dataset,
//!     persistence::JsonFileSink,
//!     session::{SessionEngine, SessionEvent},
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     // Prepare the sampled evaluation units
//!     let units = dataset::prepare(&config)?;
//!
//!     // Run a session, feeding rater input to the engine as events
//!     let sink = JsonFileSink::new(&config.output.results_file);
//!     let mut engine = SessionEngine::new(units, sink)?;
//!
//!     engine.handle_event(SessionEvent::ActionabilityToggled)?;
//!     let outcome = engine.handle_event(SessionEvent::Finish)?;
//!     assert!(outcome.finished);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Dataset preparer**: joins the two fact sources and draws the
//!   seeded session sample
//! - **SessionEngine**: state machine applying rater events, one at a
//!   time, with exclusive-choice resolution for accuracy labels
//! - **EvaluationRecord**: flat per-question counts, recomputed
//!   idempotently whenever a question is left or saved
//! - **Persistence**: full-overwrite JSON results file plus JSON/bincode
//!   session snapshots for pausing and resuming
//! - **ResultsSummary**: cross-question aggregation for reporting

pub mod choice;
pub mod config;
pub mod dataset;
pub mod error;
pub mod persistence;
pub mod record;
pub mod report;
pub mod session;
pub mod sources;

// Re-export commonly used types
pub use choice::{resolve_exclusive, AccuracyLabel, ExclusiveChoice};
pub use config::Config;
pub use dataset::{prepare, EvaluationUnit};
pub use error::{RaterError, Result};
pub use persistence::{load_records, save_records, JsonFileSink, ResultsSink, SessionSnapshot};
pub use record::{finalize_record, EvaluationRecord, ResultsLedger};
pub use report::ResultsSummary;
pub use session::{EventOutcome, FactTier, SessionEngine, SessionEvent, UnitSelections};
pub use sources::UnitId;
