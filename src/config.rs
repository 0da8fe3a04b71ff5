use std::time::Duration;

// Defaults mirror the numbers the quiz has always used: 5 questions with
// 5 wrong options each, 10 seconds to answer, 3 seconds heads-up before
// the first question, answers polled once a second.
const DEFAULT_QUESTIONS: usize = 5;
const DEFAULT_DISTRACTORS: usize = 5;
const DEFAULT_DEADLINE_SECS: u64 = 10;
const MAX_DEADLINE_SECS: u64 = 30;
const START_DELAY_SECS: u64 = 3;
const POLL_INTERVAL_MILLIS: u64 = 1000;

/// Numeric knobs of the quiz engine. Consumed by the engine, owned by the
/// front-end that builds it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QuizConfig {
    pub questions: usize,
    pub distractors: usize,
    pub question_deadline: Duration,
    pub max_question_deadline: Duration,
    pub start_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            questions: DEFAULT_QUESTIONS,
            distractors: DEFAULT_DISTRACTORS,
            question_deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            max_question_deadline: Duration::from_secs(MAX_DEADLINE_SECS),
            start_delay: Duration::from_secs(START_DELAY_SECS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MILLIS),
        }
    }
}

impl QuizConfig {
    /// Defaults overridden by environment variables where set. Call
    /// `dotenv()` first if the overrides live in a .env file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = read_var("QUIZ_QUESTIONS") {
            config.questions = n;
        }
        if let Some(n) = read_var("QUIZ_DISTRACTORS") {
            config.distractors = n;
        }
        if let Some(secs) = read_var("QUIZ_DEADLINE_SECS") {
            config.question_deadline = Duration::from_secs(secs);
        }
        if let Some(secs) = read_var("QUIZ_MAX_DEADLINE_SECS") {
            config.max_question_deadline = Duration::from_secs(secs);
        }
        config
    }
}

fn read_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {name}={raw}, not a number");
            None
        }
    }
}
