use std::time::Duration;

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::quiz::pool::AssetRef;
use crate::quiz::{ChatKey, PresentedQuestion};

/// Opaque id of one presented question, minted by the delivery side
/// (usually a message id) and handed back when polling for answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresentationHandle(pub u64);

/// What the session tells the chat once a question is closed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionReport {
    /// The unique selection hit the correct option.
    Correct,
    /// The unique selection missed.
    Incorrect { chosen: String, correct: String },
    /// The deadline passed with no selection.
    TimedOut { correct: String, position: usize },
    /// Several options were selected at once. The correct label stays
    /// hidden on purpose; the quiz just moves on.
    Ambiguous,
    /// Broadcast reveal after the full wait, nothing was evaluated.
    Elapsed { correct: String, position: usize },
}

/// Session lifecycle messages around the question loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Starting {
        topic: String,
        questions: usize,
        deadline: Duration,
        starts_in: Duration,
    },
    Finished {
        score: Option<usize>,
        total: usize,
    },
    Cancelled,
}

/// The chat-facing half of a quiz: shows questions, reveals answers.
/// Implemented by bot front-ends and by test fakes; the engine itself
/// never touches a chat platform.
#[async_trait]
pub trait QuestionDelivery: Send + Sync {
    /// Show one question: the shuffled options plus the illustrating
    /// image. May fail with `AssetUnavailable` when the image cannot be
    /// located, in which case the session retries with the placeholder.
    async fn present(
        &self,
        chat: ChatKey,
        question: &PresentedQuestion,
        asset: &AssetRef,
    ) -> Result<PresentationHandle, DeliveryError>;

    async fn reveal(&self, chat: ChatKey, report: &QuestionReport) -> Result<(), DeliveryError>;

    async fn announce(&self, chat: ChatKey, notice: &SessionNotice) -> Result<(), DeliveryError>;
}

/// Where interactive answers come from: a per-option selection-count
/// vector in presentation order, polled once per tick.
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn selection_counts(
        &self,
        handle: PresentationHandle,
    ) -> Result<Vec<u32>, DeliveryError>;
}
