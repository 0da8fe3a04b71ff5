use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::pool::Topic;
use crate::quiz::Question;

/// Draw up to `count` questions from a topic, each with one correct
/// callout and up to `distractor_width` wrong options.
///
/// Correct labels never repeat within one call; when the topic runs out
/// of fresh labels the list is simply cut short. The rng comes from the
/// caller, so a seeded one makes the output reproducible.
pub fn sample_questions<R: Rng>(
    topic: &Topic,
    count: usize,
    distractor_width: usize,
    rng: &mut R,
) -> Vec<Question> {
    let labels: Vec<&str> = topic.labels().collect();
    let true_count = count.min(labels.len());
    let mut chosen: Vec<&str> = Vec::with_capacity(true_count);
    let mut questions = Vec::with_capacity(true_count);
    for _ in 0..true_count {
        let remaining: Vec<&str> = labels
            .iter()
            .copied()
            .filter(|label| !chosen.contains(label))
            .collect();
        let correct = match remaining.choose(rng) {
            Some(label) => *label,
            // every label already used up, return what we have
            None => break,
        };
        let others: Vec<&str> = labels
            .iter()
            .copied()
            .filter(|label| *label != correct)
            .collect();
        let width = distractor_width.min(others.len());
        let distractors: Vec<String> = others
            .choose_multiple(rng, width)
            .map(|label| label.to_string())
            .collect();
        let asset = topic
            .resolve(correct)
            // safe, the label was just taken from this very topic
            .unwrap()
            .clone();
        chosen.push(correct);
        questions.push(Question::new(correct.to_string(), distractors, asset));
    }
    questions
}
