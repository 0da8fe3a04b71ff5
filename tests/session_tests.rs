//! End-to-end runs of the quiz engine against fake chat collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use callout_quiz::quiz::delivery::{
    AnswerSource, PresentationHandle, QuestionDelivery, QuestionReport, SessionNotice,
};
use callout_quiz::quiz::pool::{AssetRef, CalloutPool};
use callout_quiz::quiz::PresentedQuestion;
use callout_quiz::{
    CancelOutcome, ChatKey, DeliveryError, DeliveryMode, QuizConfig, QuizEngine, SessionOutcome,
    StartError,
};

const CHAT: ChatKey = ChatKey(1);

const BANK_SIX: &str = r#"{"BANK": {
    "vault": "vault.png",
    "lobby": "lobby.png",
    "garage": "garage.png",
    "archives": "archives.png",
    "tellers": "tellers.png",
    "server room": "server_room.png"
}}"#;

const BANK_TWO: &str = r#"{"BANK": {"vault": "vault.png", "lobby": "lobby.png"}}"#;

fn engine(pool_json: &str) -> QuizEngine {
    let pool = CalloutPool::from_reader(pool_json.as_bytes()).unwrap();
    QuizEngine::new(pool, QuizConfig::default())
}

/// How the fake user behaves on every question.
#[derive(Clone, Copy)]
enum Answering {
    Correctly,
    Wrongly,
    Never,
    DoubleSelecting,
}

/// Records everything the session sends and answers questions according
/// to a fixed behavior, standing in for a whole chat platform.
struct FakeChat {
    answering: Answering,
    broken_assets: bool,
    presented: Mutex<Vec<(PresentedQuestion, AssetRef)>>,
    reveals: Mutex<Vec<QuestionReport>>,
    notices: Mutex<Vec<SessionNotice>>,
    polls: AtomicUsize,
}

impl FakeChat {
    fn new(answering: Answering) -> Arc<Self> {
        Arc::new(Self {
            answering,
            broken_assets: false,
            presented: Mutex::new(Vec::new()),
            reveals: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        })
    }

    /// Every real image is reported missing, only the placeholder works.
    fn with_broken_assets(answering: Answering) -> Arc<Self> {
        let mut chat = Self::new(answering);
        Arc::get_mut(&mut chat).unwrap().broken_assets = true;
        chat
    }

    fn presented(&self) -> Vec<(PresentedQuestion, AssetRef)> {
        self.presented.lock().unwrap().clone()
    }

    fn reveals(&self) -> Vec<QuestionReport> {
        self.reveals.lock().unwrap().clone()
    }

    fn notices(&self) -> Vec<SessionNotice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionDelivery for FakeChat {
    async fn present(
        &self,
        _chat: ChatKey,
        question: &PresentedQuestion,
        asset: &AssetRef,
    ) -> Result<PresentationHandle, DeliveryError> {
        if self.broken_assets && *asset != AssetRef::not_found() {
            return Err(DeliveryError::AssetUnavailable(asset.clone()));
        }
        let mut presented = self.presented.lock().unwrap();
        presented.push((question.clone(), asset.clone()));
        Ok(PresentationHandle(presented.len() as u64))
    }

    async fn reveal(&self, _chat: ChatKey, report: &QuestionReport) -> Result<(), DeliveryError> {
        self.reveals.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn announce(&self, _chat: ChatKey, notice: &SessionNotice) -> Result<(), DeliveryError> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

#[async_trait]
impl AnswerSource for FakeChat {
    async fn selection_counts(
        &self,
        handle: PresentationHandle,
    ) -> Result<Vec<u32>, DeliveryError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let presented = self.presented.lock().unwrap();
        let (question, _) = presented
            .get(handle.0 as usize - 1)
            .ok_or_else(|| DeliveryError::Failed(format!("unknown question #{}", handle.0)))?;
        let len = question.options.len();
        let mut counts = vec![0u32; len];
        match self.answering {
            Answering::Correctly => counts[question.correct_index] = 1,
            Answering::Wrongly => counts[(question.correct_index + 1) % len] = 1,
            Answering::Never => {}
            Answering::DoubleSelecting => {
                counts[question.correct_index] = 1;
                counts[(question.correct_index + 1) % len] = 1;
            }
        }
        Ok(counts)
    }
}

#[tokio::test(start_paused = true)]
async fn interactive_quiz_scores_every_correct_answer() {
    let engine = engine(BANK_SIX);
    let chat = FakeChat::new(Answering::Correctly);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(5), None, DeliveryMode::Interactive)
        .unwrap();

    let outcome = session.run(chat.as_ref(), chat.as_ref()).await;

    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            score: Some(5),
            total: 5
        }
    );
    let presented = chat.presented();
    assert_eq!(presented.len(), 5);
    for (question, _) in &presented {
        // every question is a clean permutation of six distinct callouts
        let mut options = question.options.clone();
        options.sort();
        options.dedup();
        assert_eq!(options.len(), 6);
    }
    let mut corrects: Vec<_> = presented.iter().map(|(q, _)| q.correct()).collect();
    corrects.sort();
    corrects.dedup();
    assert_eq!(corrects.len(), 5);
    assert!(chat
        .reveals()
        .iter()
        .all(|r| matches!(r, QuestionReport::Correct)));
    assert!(matches!(
        chat.notices().last(),
        Some(SessionNotice::Finished {
            score: Some(5),
            total: 5
        })
    ));
    // the chat key is free again
    assert!(engine
        .start_quiz(CHAT, "BANK", None, None, DeliveryMode::Interactive)
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn wrong_answers_reveal_the_correct_callout() {
    let engine = engine(BANK_SIX);
    let chat = FakeChat::new(Answering::Wrongly);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(3), None, DeliveryMode::Interactive)
        .unwrap();

    let outcome = session.run(chat.as_ref(), chat.as_ref()).await;

    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            score: Some(0),
            total: 3
        }
    );
    let reveals = chat.reveals();
    assert_eq!(reveals.len(), 3);
    for reveal in &reveals {
        let QuestionReport::Incorrect { chosen, correct } = reveal else {
            panic!("expected an incorrect reveal, got {reveal:?}");
        };
        assert_ne!(chosen, correct);
    }
}

#[tokio::test(start_paused = true)]
async fn unanswered_questions_time_out_with_a_reveal() {
    let engine = engine(BANK_SIX);
    let chat = FakeChat::new(Answering::Never);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(2), None, DeliveryMode::Interactive)
        .unwrap();

    let outcome = session.run(chat.as_ref(), chat.as_ref()).await;

    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            score: Some(0),
            total: 2
        }
    );
    assert!(chat
        .reveals()
        .iter()
        .all(|r| matches!(r, QuestionReport::TimedOut { .. })));
}

#[tokio::test(start_paused = true)]
async fn double_selections_withhold_the_reveal() {
    let engine = engine(BANK_SIX);
    let chat = FakeChat::new(Answering::DoubleSelecting);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(2), None, DeliveryMode::Interactive)
        .unwrap();

    let outcome = session.run(chat.as_ref(), chat.as_ref()).await;

    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            score: Some(0),
            total: 2
        }
    );
    // the correct label never leaks when the answer is ambiguous
    assert!(chat
        .reveals()
        .iter()
        .all(|r| matches!(r, QuestionReport::Ambiguous)));
}

#[tokio::test(start_paused = true)]
async fn broadcast_mode_reveals_without_ever_polling() {
    let engine = engine(BANK_SIX);
    let chat = FakeChat::new(Answering::Correctly);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(4), None, DeliveryMode::Broadcast)
        .unwrap();

    let outcome = session.run(chat.as_ref(), chat.as_ref()).await;

    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            score: None,
            total: 4
        }
    );
    assert_eq!(chat.polls.load(Ordering::SeqCst), 0);
    let reveals = chat.reveals();
    assert_eq!(reveals.len(), 4);
    assert!(reveals
        .iter()
        .all(|r| matches!(r, QuestionReport::Elapsed { .. })));
}

#[tokio::test(start_paused = true)]
async fn cancel_during_the_start_delay_sends_no_questions() {
    let engine = engine(BANK_SIX);
    let chat = FakeChat::new(Answering::Correctly);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(5), None, DeliveryMode::Interactive)
        .unwrap();
    assert_eq!(engine.cancel_quiz(CHAT), CancelOutcome::CancelAccepted);

    let outcome = session.run(chat.as_ref(), chat.as_ref()).await;

    assert_eq!(outcome, SessionOutcome::Cancelled);
    assert!(chat.presented().is_empty());
    assert!(chat.reveals().is_empty());
    assert!(chat.notices().contains(&SessionNotice::Cancelled));
    // the key went back to Idle the moment the cancel was honored
    assert!(engine
        .start_quiz(CHAT, "BANK", None, None, DeliveryMode::Interactive)
        .is_ok());
}

#[tokio::test(start_paused = true)]
async fn cancel_mid_question_stops_without_a_reveal() {
    let engine = Arc::new(engine(BANK_SIX));
    let chat = FakeChat::new(Answering::Never);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(5), None, DeliveryMode::Interactive)
        .unwrap();

    let task = {
        let chat = chat.clone();
        tokio::spawn(async move { session.run(chat.as_ref(), chat.as_ref()).await })
    };
    // land inside the first question's answer wait (3s delay + 10s deadline)
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.cancel_quiz(CHAT), CancelOutcome::CancelAccepted);
    assert_eq!(engine.cancel_quiz(CHAT), CancelOutcome::AlreadyCancelling);

    let outcome = task.await.unwrap();
    assert_eq!(outcome, SessionOutcome::Cancelled);
    // the open question was presented but never resolved
    assert_eq!(chat.presented().len(), 1);
    assert!(chat.reveals().is_empty());
}

#[tokio::test(start_paused = true)]
async fn a_second_start_while_running_is_refused() {
    let engine = Arc::new(engine(BANK_SIX));
    let chat = FakeChat::new(Answering::Never);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(5), None, DeliveryMode::Interactive)
        .unwrap();

    let task = {
        let chat = chat.clone();
        tokio::spawn(async move { session.run(chat.as_ref(), chat.as_ref()).await })
    };
    tokio::time::sleep(Duration::from_secs(5)).await;

    let err = engine
        .start_quiz(CHAT, "BANK", None, None, DeliveryMode::Interactive)
        .unwrap_err();
    assert!(matches!(err, StartError::AlreadyRunning));

    engine.cancel_quiz(CHAT);
    assert_eq!(task.await.unwrap(), SessionOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn missing_assets_fall_back_to_the_placeholder() {
    let engine = engine(BANK_SIX);
    let chat = FakeChat::with_broken_assets(Answering::Correctly);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(3), None, DeliveryMode::Interactive)
        .unwrap();

    let outcome = session.run(chat.as_ref(), chat.as_ref()).await;

    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            score: Some(3),
            total: 3
        }
    );
    let presented = chat.presented();
    assert_eq!(presented.len(), 3);
    assert!(presented
        .iter()
        .all(|(_, asset)| *asset == AssetRef::not_found()));
}

#[tokio::test(start_paused = true)]
async fn small_topics_cut_the_quiz_short() {
    let engine = engine(BANK_TWO);
    let chat = FakeChat::new(Answering::Correctly);
    let session = engine
        .start_quiz(CHAT, "BANK", Some(5), None, DeliveryMode::Interactive)
        .unwrap();
    assert_eq!(session.questions().len(), 2);

    let outcome = session.run(chat.as_ref(), chat.as_ref()).await;

    assert_eq!(
        outcome,
        SessionOutcome::Completed {
            score: Some(2),
            total: 2
        }
    );
}
