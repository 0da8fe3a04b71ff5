use std::io::Read;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rand::thread_rng;

use crate::config::QuizConfig;
use crate::error::{PoolError, StartError};
use crate::quiz::pool::CalloutPool;
use crate::quiz::registry::{CancelOutcome, SessionRegistry};
use crate::quiz::sampler::sample_questions;
use crate::quiz::session::QuizSession;
use crate::quiz::{ChatKey, DeliveryMode, QuizSpec};

/// The facade front-ends talk to: owns the callout pool, the per-chat
/// session registry and the configuration.
///
/// A start trigger is validated here the same way the bot handlers always
/// did it: check the map name, clamp the numbers, claim the chat key, only
/// then build the questions. The returned session still has to be run by
/// the caller (one task per session); its chat key stays claimed until
/// that run ends.
pub struct QuizEngine {
    pool: RwLock<CalloutPool>,
    registry: Arc<SessionRegistry>,
    config: QuizConfig,
}

impl QuizEngine {
    pub fn new(pool: CalloutPool, config: QuizConfig) -> Self {
        Self {
            pool: RwLock::new(pool),
            registry: Arc::new(SessionRegistry::new()),
            config,
        }
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    /// Begin a quiz in `chat`, or explain why not.
    ///
    /// `count` and `deadline` fall back to the configured defaults; a zero
    /// count is treated as unset and the deadline is capped at the
    /// configured maximum, so a chat command cannot park a session on a
    /// five-minute question.
    pub fn start_quiz(
        &self,
        chat: ChatKey,
        topic: &str,
        count: Option<usize>,
        deadline: Option<Duration>,
        mode: DeliveryMode,
    ) -> Result<QuizSession, StartError> {
        // locks are never held across an await, the sampling below is
        // synchronous
        let pool = self.pool.read().unwrap();
        let topic = pool
            .find_topic(topic)
            .ok_or_else(|| StartError::UnknownTopic(topic.to_string()))?;

        let count = count.filter(|n| *n > 0).unwrap_or(self.config.questions);
        let deadline = deadline
            .unwrap_or(self.config.question_deadline)
            .min(self.config.max_question_deadline);

        if !self.registry.try_start(chat) {
            log::debug!("start refused in {chat}, a quiz is already running");
            return Err(StartError::AlreadyRunning);
        }

        let questions = sample_questions(topic, count, self.config.distractors, &mut thread_rng());
        log::info!(
            "claimed {chat} for {} questions on {}",
            questions.len(),
            topic.name()
        );
        let spec = QuizSpec {
            chat,
            topic: topic.name().to_string(),
            questions: questions.len(),
            deadline,
            mode,
        };
        Ok(QuizSession::new(
            spec,
            questions,
            self.registry.clone(),
            &self.config,
        ))
    }

    /// Ask the running session in `chat` to stop at its next check.
    pub fn cancel_quiz(&self, chat: ChatKey) -> CancelOutcome {
        let outcome = self.registry.request_cancel(chat);
        log::info!("cancel requested in {chat}: {outcome:?}");
        outcome
    }

    /// Canonical map listing for the "which maps are there" command.
    pub fn topics(&self) -> Vec<String> {
        self.pool
            .read()
            .unwrap()
            .topics()
            .map(|name| name.to_string())
            .collect()
    }

    /// Swap the pool contents without a restart. On malformed data the
    /// pool comes back empty and the error is returned for the front-end
    /// to show; running sessions keep the questions they already sampled.
    pub fn reload(&self, reader: impl Read) -> Result<(), PoolError> {
        let result = self.pool.write().unwrap().load(reader);
        match &result {
            Ok(()) => log::info!("callout pool reloaded"),
            Err(err) => log::warn!("callout pool reload failed, pool is now empty: {err}"),
        }
        result
    }
}
