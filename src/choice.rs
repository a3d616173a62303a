//! Exclusive-choice resolution.
//!
//! A rating like accuracy is presented as one checkbox per label, but only
//! one label may hold at a time. Instead of letting the surface enforce
//! that, the engine stores the single resolved label and re-derives it from
//! a snapshot of the checkbox signals after every input event. The caller
//! redraws so the boxes are reconciled to `[label == resolved]` before the
//! next event; a zero-selected or multi-selected state is never observable.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A small set of mutually exclusive labels.
pub trait ExclusiveChoice: Copy + Eq + Sized + 'static {
    /// All labels, in the order their signals are presented.
    const LABELS: &'static [Self];

    /// The label adopted when the rater clears the active option.
    fn fallback() -> Self;
}

/// Resolve the stored label against a snapshot of per-label signals.
///
/// `signals[i]` is the requested toggle state of `LABELS[i]`. When exactly
/// one label other than `current` is signaled, it wins (the box for
/// `current` may still read true in the same snapshot). When every signal
/// is withdrawn, the choice falls back to the domain default. Anything
/// else leaves the state unchanged.
pub fn resolve_exclusive<C: ExclusiveChoice>(current: C, signals: &[bool]) -> C {
    let mut newly_signaled = C::LABELS
        .iter()
        .zip(signals)
        .filter(|&(label, &on)| on && *label != current)
        .map(|(label, _)| *label);

    match (newly_signaled.next(), newly_signaled.next()) {
        (Some(label), None) => label,
        (Some(_), Some(_)) => current,
        (None, _) => {
            if signals.iter().any(|&on| on) {
                current
            } else {
                C::fallback()
            }
        }
    }
}

/// Accuracy judgment for one model-extracted fact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode,
)]
pub enum AccuracyLabel {
    Accurate,
    Inaccurate,
    #[default]
    NotMentioned,
}

impl ExclusiveChoice for AccuracyLabel {
    const LABELS: &'static [Self] = &[
        AccuracyLabel::Accurate,
        AccuracyLabel::Inaccurate,
        AccuracyLabel::NotMentioned,
    ];

    fn fallback() -> Self {
        AccuracyLabel::NotMentioned
    }
}

impl fmt::Display for AccuracyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccuracyLabel::Accurate => "Accurate",
            AccuracyLabel::Inaccurate => "Inaccurate",
            AccuracyLabel::NotMentioned => "Not Mentioned",
        };
        write!(f, "{}", name)
    }
}
