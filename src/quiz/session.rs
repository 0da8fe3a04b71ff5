use std::sync::Arc;
use std::time::Duration;

use rand::thread_rng;
use tokio::time::{sleep, Instant};

use crate::config::QuizConfig;
use crate::error::DeliveryError;
use crate::quiz::delivery::{
    AnswerSource, PresentationHandle, QuestionDelivery, QuestionReport, SessionNotice,
};
use crate::quiz::evaluator::{self, AnswerVerdict, Selection};
use crate::quiz::pool::AssetRef;
use crate::quiz::registry::SessionRegistry;
use crate::quiz::{DeliveryMode, PresentedQuestion, Question, QuizSpec, SessionOutcome};

enum WaitExit {
    /// The wait ran its course or a unique selection showed up early.
    Done,
    /// A cancel request arrived mid-wait.
    Cancelled,
}

/// One quiz run for one chat: Pending (start delay) -> Running (question
/// loop) -> Completed or Cancelled.
///
/// The session owns its questions and only talks to the outside world
/// through the delivery and answer-source traits, so the same machine
/// drives a group channel, a DM or a test fake. Its registry slot is
/// freed on every exit path before anything else happens.
#[derive(Debug)]
pub struct QuizSession {
    spec: QuizSpec,
    questions: Vec<Question>,
    registry: Arc<SessionRegistry>,
    start_delay: Duration,
    poll_interval: Duration,
}

impl QuizSession {
    pub(crate) fn new(
        spec: QuizSpec,
        questions: Vec<Question>,
        registry: Arc<SessionRegistry>,
        config: &QuizConfig,
    ) -> Self {
        Self {
            spec,
            questions,
            registry,
            start_delay: config.start_delay,
            poll_interval: config.poll_interval,
        }
    }

    pub fn spec(&self) -> &QuizSpec {
        &self.spec
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Drive the whole quiz. Runs on its own task, one per chat key.
    pub async fn run<D, A>(self, delivery: &D, answers: &A) -> SessionOutcome
    where
        D: QuestionDelivery + ?Sized,
        A: AnswerSource + ?Sized,
    {
        let chat = self.spec.chat;
        let total = self.questions.len();
        log::info!(
            "quiz starting in {}: {} on {} questions",
            chat,
            self.spec.topic,
            total
        );
        self.announce(
            delivery,
            &SessionNotice::Starting {
                topic: self.spec.topic.clone(),
                questions: total,
                deadline: self.spec.deadline,
                starts_in: self.start_delay,
            },
        )
        .await;

        // Pending: the heads-up countdown before the first question. A
        // cancel here ends the session with zero questions sent.
        if self.wait_observing_cancel(self.start_delay).await {
            return self.end_cancelled(delivery).await;
        }

        let mut score = 0usize;
        for (number, question) in self.questions.iter().enumerate() {
            if self.registry.is_cancelling(chat) {
                return self.end_cancelled(delivery).await;
            }
            let presented = question.shuffled(&mut thread_rng());
            let handle = match self
                .present_with_fallback(delivery, &presented, question.asset())
                .await
            {
                Some(handle) => handle,
                None => continue,
            };
            log::debug!("question {}/{} out to {}", number + 1, total, chat);

            match self.spec.mode {
                DeliveryMode::Broadcast => {
                    // Nobody's answer is captured in a shared channel, so
                    // just wait the window out and tell everyone.
                    if self.wait_observing_cancel(self.spec.deadline).await {
                        return self.end_cancelled(delivery).await;
                    }
                    self.reveal(
                        delivery,
                        &QuestionReport::Elapsed {
                            correct: presented.correct().to_string(),
                            position: presented.correct_index + 1,
                        },
                    )
                    .await;
                }
                DeliveryMode::Interactive => {
                    if let WaitExit::Cancelled = self.wait_for_selection(answers, handle).await {
                        // silent stop, the pending answer stays unrevealed
                        return self.end_cancelled(delivery).await;
                    }
                    let report = self.judge(answers, handle, &presented).await;
                    if let QuestionReport::Correct = report {
                        score += 1;
                    }
                    self.reveal(delivery, &report).await;
                }
            }
        }

        self.registry.finish(chat);
        let score = match self.spec.mode {
            DeliveryMode::Interactive => Some(score),
            DeliveryMode::Broadcast => None,
        };
        log::info!("quiz finished in {}: {:?} of {}", chat, score, total);
        self.announce(delivery, &SessionNotice::Finished { score, total })
            .await;
        SessionOutcome::Completed { score, total }
    }

    /// Take the final reading and turn it into the question's report.
    async fn judge<A>(
        &self,
        answers: &A,
        handle: PresentationHandle,
        presented: &PresentedQuestion,
    ) -> QuestionReport
    where
        A: AnswerSource + ?Sized,
    {
        let mut counts = match answers.selection_counts(handle).await {
            Ok(counts) => counts,
            Err(err) => {
                log::debug!("answer readback failed in {}: {err}", self.spec.chat);
                Vec::new()
            }
        };
        // a collaborator sending more counts than options cannot name an
        // option we never presented
        counts.truncate(presented.options.len());
        match evaluator::evaluate(&counts, presented.correct_index) {
            AnswerVerdict::Correct => QuestionReport::Correct,
            AnswerVerdict::Incorrect { chosen } => QuestionReport::Incorrect {
                chosen: presented.options[chosen].clone(),
                correct: presented.correct().to_string(),
            },
            AnswerVerdict::Ambiguous => QuestionReport::Ambiguous,
            AnswerVerdict::NoAnswer => QuestionReport::TimedOut {
                correct: presented.correct().to_string(),
                position: presented.correct_index + 1,
            },
        }
    }

    async fn present_with_fallback<D>(
        &self,
        delivery: &D,
        presented: &PresentedQuestion,
        asset: &AssetRef,
    ) -> Option<PresentationHandle>
    where
        D: QuestionDelivery + ?Sized,
    {
        match delivery.present(self.spec.chat, presented, asset).await {
            Ok(handle) => Some(handle),
            Err(DeliveryError::AssetUnavailable(missing)) => {
                log::warn!("no quiz picture for {missing}, sending the placeholder");
                match delivery
                    .present(self.spec.chat, presented, &AssetRef::not_found())
                    .await
                {
                    Ok(handle) => Some(handle),
                    Err(err) => {
                        log::warn!("skipping a question in {}: {err}", self.spec.chat);
                        None
                    }
                }
            }
            Err(err) => {
                log::warn!("skipping a question in {}: {err}", self.spec.chat);
                None
            }
        }
    }

    /// Sleep `total`, in poll-interval ticks, so an external cancel is
    /// noticed within one tick instead of after the whole wait. Returns
    /// whether cancellation was requested.
    async fn wait_observing_cancel(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.registry.is_cancelling(self.spec.chat) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// The interactive answer wait: poll until the deadline, leaving
    /// early once exactly one option is selected or a cancel arrives.
    async fn wait_for_selection<A>(&self, answers: &A, handle: PresentationHandle) -> WaitExit
    where
        A: AnswerSource + ?Sized,
    {
        let deadline = Instant::now() + self.spec.deadline;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return WaitExit::Done;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
            if self.registry.is_cancelling(self.spec.chat) {
                return WaitExit::Cancelled;
            }
            match answers.selection_counts(handle).await {
                Ok(counts) => {
                    if let Selection::Unique(_) = evaluator::classify(&counts) {
                        return WaitExit::Done;
                    }
                }
                Err(err) => {
                    log::debug!("answer poll failed in {}: {err}", self.spec.chat)
                }
            }
        }
    }

    async fn end_cancelled<D>(&self, delivery: &D) -> SessionOutcome
    where
        D: QuestionDelivery + ?Sized,
    {
        // free the key first so a new quiz can start right away
        self.registry.finish(self.spec.chat);
        log::info!("quiz cancelled in {}", self.spec.chat);
        self.announce(delivery, &SessionNotice::Cancelled).await;
        SessionOutcome::Cancelled
    }

    // Lost notices and reveals are a chat problem, not a reason to kill
    // the quiz.
    async fn announce<D>(&self, delivery: &D, notice: &SessionNotice)
    where
        D: QuestionDelivery + ?Sized,
    {
        if let Err(err) = delivery.announce(self.spec.chat, notice).await {
            log::warn!("notice dropped for {}: {err}", self.spec.chat);
        }
    }

    async fn reveal<D>(&self, delivery: &D, report: &QuestionReport)
    where
        D: QuestionDelivery + ?Sized,
    {
        if let Err(err) = delivery.reveal(self.spec.chat, report).await {
            log::warn!("reveal dropped for {}: {err}", self.spec.chat);
        }
    }
}
