pub mod delivery;
pub mod evaluator;
pub mod pool;
pub mod registry;
pub mod sampler;
pub mod session;

use std::fmt;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::pool::AssetRef;

/// Identity of the conversation a quiz belongs to. At most one running
/// quiz per key, enforced by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ChatKey(pub i64);

impl fmt::Display for ChatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat {}", self.0)
    }
}

/// One quiz question: the correct callout plus its distractors.
///
/// The correct label is always element 0 here. That order is bookkeeping
/// only; the session shuffles the options right before presenting them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Question {
    options: Vec<String>,
    asset: AssetRef,
}

impl Question {
    pub fn new(correct: String, distractors: Vec<String>, asset: AssetRef) -> Self {
        let mut options = Vec::with_capacity(1 + distractors.len());
        options.push(correct);
        options.extend(distractors);
        Self { options, asset }
    }

    pub fn correct(&self) -> &str {
        &self.options[0]
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn asset(&self) -> &AssetRef {
        &self.asset
    }

    /// Shuffle the options for presentation, keeping track of where the
    /// correct one ended up.
    pub fn shuffled<R: Rng>(&self, rng: &mut R) -> PresentedQuestion {
        let mut options = self.options.clone();
        options.shuffle(rng);
        let correct_index = options
            .iter()
            .position(|option| option == self.correct())
            // The shuffled vec is a permutation of the original, so the
            // correct label is always in there
            .unwrap();
        PresentedQuestion {
            options,
            correct_index,
        }
    }
}

/// A question in the order the user actually sees it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PresentedQuestion {
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl PresentedQuestion {
    pub fn correct(&self) -> &str {
        &self.options[self.correct_index]
    }
}

/// How answers come back from the chat platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DeliveryMode {
    /// Group-channel style: nobody's answer is captured, the correct
    /// callout is revealed after the full deadline.
    Broadcast,
    /// DM style: one user's selection is polled until the deadline.
    Interactive,
}

/// Everything needed to build one session. Created from a start trigger,
/// consumed by the engine, discarded after.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuizSpec {
    pub chat: ChatKey,
    pub topic: String,
    pub questions: usize,
    pub deadline: Duration,
    pub mode: DeliveryMode,
}

/// How a session run ended. Broadcast sessions carry no score because
/// nothing is ever evaluated in that mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { score: Option<usize>, total: usize },
    Cancelled,
}
