use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dotenv::dotenv;
use tokio::sync::mpsc;

use callout_quiz::quiz::delivery::{
    AnswerSource, PresentationHandle, QuestionDelivery, QuestionReport, SessionNotice,
};
use callout_quiz::quiz::pool::{AssetRef, CalloutPool};
use callout_quiz::quiz::PresentedQuestion;
use callout_quiz::{
    CancelOutcome, ChatKey, DeliveryError, DeliveryMode, QuizConfig, QuizEngine, StartError,
};

// The terminal is one conversation, so one chat key covers it.
const CONSOLE_CHAT: ChatKey = ChatKey(0);

const HELP_TEXT: &str = "commands:
  maps              list the available maps
  quiz <map> [n]    start a quiz (map can be \"random\" for all maps)
  cancel            stop the running quiz
  reload            re-read the callout file
  quit              leave
While a question is open, type the number of your answer.";

/// Line-based stand-in for a chat platform: questions go to stdout and a
/// numeric line typed while one is open counts as a selection on it.
/// Exists so both delivery modes can be exercised without any bot token.
struct ConsoleChat {
    selections: Mutex<HashMap<PresentationHandle, Vec<u32>>>,
    open: Mutex<Option<PresentationHandle>>,
    next_handle: AtomicU64,
}

impl ConsoleChat {
    fn new() -> Self {
        Self {
            selections: Mutex::new(HashMap::new()),
            open: Mutex::new(None),
            next_handle: AtomicU64::new(1),
        }
    }

    /// A typed number lands on the currently open question, if any.
    fn record_selection(&self, option: usize) {
        let open = self.open.lock().unwrap();
        let Some(handle) = *open else {
            println!("no question is open right now");
            return;
        };
        let mut selections = self.selections.lock().unwrap();
        let counts = selections.get_mut(&handle).unwrap();
        // options are shown 1-based, 0 wraps out of range on purpose
        let index = option.wrapping_sub(1);
        if index < counts.len() {
            counts[index] += 1;
        } else {
            println!("pick a number between 1 and {}", counts.len());
        }
    }
}

#[async_trait]
impl QuestionDelivery for ConsoleChat {
    async fn present(
        &self,
        _chat: ChatKey,
        question: &PresentedQuestion,
        asset: &AssetRef,
    ) -> Result<PresentationHandle, DeliveryError> {
        println!("\nWhere is this callout? [picture: {asset}]");
        for (index, option) in question.options.iter().enumerate() {
            println!("  {}. {}", index + 1, option);
        }
        let handle = PresentationHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.selections
            .lock()
            .unwrap()
            .insert(handle, vec![0; question.options.len()]);
        *self.open.lock().unwrap() = Some(handle);
        Ok(handle)
    }

    async fn reveal(&self, _chat: ChatKey, report: &QuestionReport) -> Result<(), DeliveryError> {
        *self.open.lock().unwrap() = None;
        match report {
            QuestionReport::Correct => println!("Good job!"),
            QuestionReport::Incorrect { chosen, correct } => {
                println!("Nope, \"{chosen}\" is wrong. It was \"{correct}\".")
            }
            QuestionReport::TimedOut { correct, position } => {
                println!("Time's out! The answer was {position}. {correct}")
            }
            QuestionReport::Ambiguous => {
                println!("Just one answer is allowed, moving on.")
            }
            QuestionReport::Elapsed { correct, position } => {
                println!("The answer was {position}. {correct}")
            }
        }
        Ok(())
    }

    async fn announce(&self, _chat: ChatKey, notice: &SessionNotice) -> Result<(), DeliveryError> {
        match notice {
            SessionNotice::Starting {
                topic,
                questions,
                deadline,
                starts_in,
            } => println!(
                "Quiz on {topic}: {questions} questions, {}s each. Starting in {}s...",
                deadline.as_secs(),
                starts_in.as_secs()
            ),
            SessionNotice::Finished { score, total } => match score {
                Some(score) => println!("\nQuiz finished! You got {score} of {total}."),
                None => println!("\nQuiz finished, {total} callouts shown."),
            },
            SessionNotice::Cancelled => {
                *self.open.lock().unwrap() = None;
                println!("\nQuiz cancelled.")
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AnswerSource for ConsoleChat {
    async fn selection_counts(
        &self,
        handle: PresentationHandle,
    ) -> Result<Vec<u32>, DeliveryError> {
        self.selections
            .lock()
            .unwrap()
            .get(&handle)
            .cloned()
            .ok_or_else(|| DeliveryError::Failed(format!("unknown question #{}", handle.0)))
    }
}

fn load_pool(path: &str) -> CalloutPool {
    let mut pool = CalloutPool::default();
    match File::open(path) {
        Ok(file) => {
            if let Err(err) = pool.load(file) {
                log::warn!("could not read callouts from {path}: {err}");
            }
        }
        Err(err) => log::warn!("could not open {path}: {err}"),
    }
    pool
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting the callout quiz console...");

    let pool_path =
        std::env::var("QUIZ_POOL_FILE").unwrap_or_else(|_| "files/quiz.json".to_string());
    let mode = match std::env::var("QUIZ_BROADCAST").as_deref() {
        Ok("1") => DeliveryMode::Broadcast,
        _ => DeliveryMode::Interactive,
    };

    println!("Loading callouts from {pool_path}...");
    let engine = Arc::new(QuizEngine::new(load_pool(&pool_path), QuizConfig::from_env()));
    match engine.topics().len() {
        0 => println!("No maps available. Fix the callout file and `reload`."),
        n => println!("{n} maps loaded."),
    }
    println!("{HELP_TEXT}");

    let chat = Arc::new(ConsoleChat::new());

    // Stdin stays on a plain thread; lines are fed into the async side.
    let (lines_tx, mut lines) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });

    while let Some(line) = lines.recv().await {
        let mut words = line.split_whitespace();
        match words.next() {
            None => {}
            Some("maps") => {
                let topics = engine.topics();
                if topics.is_empty() {
                    println!("No maps available.");
                } else {
                    println!("{}", topics.join(", "));
                }
            }
            Some("quiz") => {
                let Some(topic) = words.next() else {
                    println!("quiz <map> [questions]");
                    continue;
                };
                let count = words.next().and_then(|raw| raw.parse().ok());
                match engine.start_quiz(CONSOLE_CHAT, topic, count, None, mode) {
                    Ok(session) => {
                        let delivery = chat.clone();
                        let answers = chat.clone();
                        tokio::spawn(async move {
                            session.run(delivery.as_ref(), answers.as_ref()).await
                        });
                    }
                    Err(StartError::UnknownTopic(name)) => {
                        println!(
                            "No map called \"{name}\". Try one of: {}",
                            engine.topics().join(", ")
                        );
                    }
                    Err(StartError::AlreadyRunning) => {
                        println!("A quiz is already running here. `cancel` it first.");
                    }
                }
            }
            Some("cancel") => match engine.cancel_quiz(CONSOLE_CHAT) {
                CancelOutcome::CancelAccepted => println!("Stopping the quiz..."),
                CancelOutcome::AlreadyCancelling => println!("Already stopping."),
                CancelOutcome::NotRunning => println!("No quiz is running here."),
            },
            Some("reload") => match File::open(&pool_path) {
                Ok(file) => match engine.reload(file) {
                    Ok(()) => println!("{} maps loaded.", engine.topics().len()),
                    Err(err) => println!("Reload failed: {err}"),
                },
                Err(err) => println!("Could not open {pool_path}: {err}"),
            },
            Some("quit") | Some("exit") => break,
            Some(word) => match word.parse::<usize>() {
                Ok(option) => chat.record_selection(option),
                Err(_) => println!("{HELP_TEXT}"),
            },
        }
    }
    log::info!("console closed, bye");
}
