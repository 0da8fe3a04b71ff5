//! Turns a raw per-option selection-count vector into a verdict. Pure
//! functions, no transport anywhere near them.

/// What the selection counts say, before comparing against the correct
/// option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Exactly one option was picked.
    Unique(usize),
    /// More than one option was picked.
    Ambiguous,
    /// Nothing was picked.
    NoAnswer,
}

/// Final call on one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerVerdict {
    Correct,
    Incorrect { chosen: usize },
    Ambiguous,
    NoAnswer,
}

/// Classify a selection-count vector, one count per presented option.
///
/// Only a count of exactly 1 marks a choice. The delivery side already
/// subtracts its own seeding of the options, so 0 means untouched and
/// anything above 1 means several people piled onto the same option,
/// which no single user can claim as an answer.
pub fn classify(counts: &[u32]) -> Selection {
    let mut picked = counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 1)
        .map(|(index, _)| index);
    match (picked.next(), picked.next()) {
        (Some(index), None) => Selection::Unique(index),
        (Some(_), Some(_)) => Selection::Ambiguous,
        (None, _) => Selection::NoAnswer,
    }
}

/// Classify and compare against the correct option's position.
pub fn evaluate(counts: &[u32], correct_index: usize) -> AnswerVerdict {
    match classify(counts) {
        Selection::Unique(chosen) if chosen == correct_index => AnswerVerdict::Correct,
        Selection::Unique(chosen) => AnswerVerdict::Incorrect { chosen },
        Selection::Ambiguous => AnswerVerdict::Ambiguous,
        Selection::NoAnswer => AnswerVerdict::NoAnswer,
    }
}
