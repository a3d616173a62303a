//! Dataset preparation: join the two fact sources and draw the session
//! sample.
//!
//! The manual and model sources are inner-joined on `(id, question)`; a
//! question missing from either side is dropped. From the joined set a
//! deterministic fraction is drawn with a seeded RNG, so the same inputs,
//! fraction, and seed always produce the same session in the same order.

use crate::config::Config;
use crate::error::{RaterError, Result};
use crate::sources::{
    load_manual_source, load_model_source, ManualKeyFacts, ManualRecord, ModelKeyFacts,
    ModelRecord, UnitId,
};
use bincode::{Decode, Encode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// One question to be rated: both answers plus both fact lists, merged
/// from the two sources.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct EvaluationUnit {
    pub id: UnitId,
    pub question: String,
    pub manual_answer: String,
    pub model_answer: String,
    /// Ground-truth facts from the manual answer key.
    pub ground_truth_facts: ManualKeyFacts,
    /// Facts extracted from the model answer.
    pub model_facts: ModelKeyFacts,
}

/// Inner-join the two sources on `(id, question)`, preserving the manual
/// source's record order.
///
/// A join key appearing more than once in either source is rejected: the
/// sources are expected to hold one record per question, and silently
/// multiplying rows would corrupt the counts downstream.
pub fn join_records(
    manual: Vec<ManualRecord>,
    model: Vec<ModelRecord>,
    manual_path: &Path,
    model_path: &Path,
) -> Result<Vec<EvaluationUnit>> {
    let mut model_by_key: HashMap<(UnitId, String), ModelRecord> =
        HashMap::with_capacity(model.len());
    for record in model {
        let key = (record.id.clone(), record.question.clone());
        if let Some(previous) = model_by_key.insert(key, record) {
            return Err(RaterError::malformed(
                model_path,
                format!(
                    "duplicate join key (id={}, question={:?})",
                    previous.id, previous.question
                ),
            ));
        }
    }

    let mut seen_manual: HashSet<(UnitId, String)> = HashSet::with_capacity(manual.len());
    let mut units = Vec::new();
    for record in manual {
        let key = (record.id.clone(), record.question.clone());
        if !seen_manual.insert(key.clone()) {
            return Err(RaterError::malformed(
                manual_path,
                format!(
                    "duplicate join key (id={}, question={:?})",
                    record.id, record.question
                ),
            ));
        }
        if let Some(model_record) = model_by_key.remove(&key) {
            units.push(EvaluationUnit {
                id: record.id,
                question: record.question,
                manual_answer: record.manual_answer,
                model_answer: model_record.model_answer,
                ground_truth_facts: record.key_facts,
                model_facts: model_record.key_facts,
            });
        }
    }

    Ok(units)
}

/// Draw `round(fraction * len)` units with a seeded RNG.
///
/// The draw order becomes the session order. Sampling is without
/// replacement, and the same seed over the same joined set always yields
/// the same selection.
pub fn sample_units(
    units: Vec<EvaluationUnit>,
    fraction: f64,
    seed: u64,
) -> Result<Vec<EvaluationUnit>> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(RaterError::InvalidConfig(format!(
            "sample fraction must be in (0, 1], got {}",
            fraction
        )));
    }

    let count = (fraction * units.len() as f64).round() as usize;
    if count == 0 {
        return Err(RaterError::EmptySample {
            joined: units.len(),
            fraction,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let sampled = rand::seq::index::sample(&mut rng, units.len(), count)
        .into_iter()
        .map(|i| units[i].clone())
        .collect();

    Ok(sampled)
}

/// Full preparation pipeline: load both sources, join, sample.
pub fn prepare(config: &Config) -> Result<Vec<EvaluationUnit>> {
    let manual = load_manual_source(&config.sources.manual_file)?;
    let model = load_model_source(&config.sources.model_file)?;
    let joined = join_records(
        manual,
        model,
        &config.sources.manual_file,
        &config.sources.model_file,
    )?;
    sample_units(joined, config.sample.fraction, config.sample.seed)
}
