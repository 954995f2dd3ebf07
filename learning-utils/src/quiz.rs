use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    clock::Clock,
    clustering::{ACTIVE_CLUSTER_NAME, AT_RISK_CLUSTER_NAME, MODERATE_CLUSTER_NAME},
    error::Error,
    storage::{MemoryStorage, Storage},
};

/// Class size reported with every non-empty performance read
pub const REPORTED_CLASS_SIZE: u32 = 32;
const RECENT_RESPONDERS: usize = 10;

/// Placeholder per-cluster split: (cluster, share of answered, share of correct, reported percentage).
/// Not derived from cluster membership.
const SYNTHETIC_BREAKDOWN: [(&str, f64, f64, f64); 3] = [
    (ACTIVE_CLUSTER_NAME, 0.6, 0.7, 83.3),
    (MODERATE_CLUSTER_NAME, 0.3, 0.25, 62.5),
    (AT_RISK_CLUSTER_NAME, 0.1, 0.05, 0.0),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_answer: usize,
    pub difficulty: Difficulty,
    pub category: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub id: Option<String>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<usize>,
    pub difficulty: Option<Difficulty>,
    pub category: Option<String>,
}

/// Catalog of questions answers are graded against
pub struct QuestionBank<S = MemoryStorage<String, Question>> {
    storage: Mutex<S>,
    clock: Arc<dyn Clock>,
}

impl QuestionBank {
    /// In-memory bank seeded with the three neural-network questions
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mut storage = MemoryStorage::new();
        for question in seed_questions() {
            storage.set(question.id.clone(), question);
        }
        Self::with_storage(storage, clock)
    }
}

impl<S> QuestionBank<S>
where
    S: Storage<String, Question>,
{
    pub fn with_storage(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: Mutex::new(storage),
            clock,
        }
    }

    pub fn find(&self, id: &str) -> Option<Question> {
        self.storage.lock().get(&id.to_string())
    }

    pub fn list(&self) -> Vec<Question> {
        self.storage.lock().list()
    }

    pub fn create(&self, new: NewQuestion) -> Result<Question, Error> {
        let text = new
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| Error::Validation("question text is required".to_string()))?;
        let options = new.options.unwrap_or_default();
        if options.len() < 2 {
            return Err(Error::Validation(
                "a question needs at least two options".to_string(),
            ));
        }
        let correct_answer = new
            .correct_answer
            .ok_or_else(|| Error::Validation("correctAnswer is required".to_string()))?;
        if correct_answer >= options.len() {
            return Err(Error::Validation(format!(
                "correctAnswer {correct_answer} is out of range for {} options",
                options.len()
            )));
        }

        let mut storage = self.storage.lock();
        let id = match new.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let mut candidate = self.clock.now().timestamp_millis();
                while storage.contains(&candidate.to_string()) {
                    candidate += 1;
                }
                candidate.to_string()
            }
        };

        let question = Question {
            id: id.clone(),
            question: text,
            options,
            correct_answer,
            difficulty: new.difficulty.unwrap_or_default(),
            category: new.category.unwrap_or_default(),
        };
        storage.set(id, question.clone());
        Ok(question)
    }
}

fn seed_questions() -> Vec<Question> {
    let seed = |id: &str, question: &str, options: [&str; 4], difficulty| Question {
        id: id.to_string(),
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: 1,
        difficulty,
        category: "Neural Networks".to_string(),
    };

    vec![
        seed(
            "1",
            "What is the primary purpose of backpropagation in neural networks?",
            [
                "To initialize weights randomly",
                "To update weights based on error gradients",
                "To add more layers to the network",
                "To visualize the network structure",
            ],
            Difficulty::Medium,
        ),
        seed(
            "2",
            "Which activation function is commonly used in hidden layers?",
            ["Sigmoid", "ReLU", "Linear", "Step function"],
            Difficulty::Easy,
        ),
        seed(
            "3",
            "What is the main advantage of using dropout in neural networks?",
            [
                "Increases training speed",
                "Prevents overfitting",
                "Reduces model size",
                "Improves accuracy on all datasets",
            ],
            Difficulty::Hard,
        ),
    ]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: String,
    pub answer_index: i64,
    /// Seconds
    pub time_taken: f64,
    pub student_id: String,
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub question_id: String,
    pub answer_index: i64,
    pub time_taken: f64,
    pub student_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub success: bool,
    pub is_correct: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterPerformance {
    pub cluster_name: String,
    pub answered: u32,
    pub correct: u32,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderSummary {
    pub student_name: String,
    pub is_correct: bool,
    pub time_taken: f64,
}

/// Read model over the answers to one question within one session
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPerformance {
    pub total_students: u32,
    pub answered_students: u32,
    pub correct_answers: u32,
    pub average_time: f64,
    pub correct_percentage: f64,
    pub performance_by_cluster: Vec<ClusterPerformance>,
    pub top_performers: Vec<ResponderSummary>,
}

/// Answers keyed by question id. One lock guards the whole store.
pub struct QuizStore<S = MemoryStorage<String, Vec<QuizAnswer>>> {
    answers: Mutex<S>,
    questions: Arc<QuestionBank>,
    clock: Arc<dyn Clock>,
}

impl QuizStore {
    pub fn new(questions: Arc<QuestionBank>, clock: Arc<dyn Clock>) -> Self {
        Self::with_storage(MemoryStorage::new(), questions, clock)
    }
}

impl<S> QuizStore<S>
where
    S: Storage<String, Vec<QuizAnswer>>,
{
    pub fn with_storage(storage: S, questions: Arc<QuestionBank>, clock: Arc<dyn Clock>) -> Self {
        Self {
            answers: Mutex::new(storage),
            questions,
            clock,
        }
    }

    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    /// Appends the answer. Resubmissions are kept as separate answers.
    ///
    /// An unknown question is graded incorrect rather than rejected.
    pub fn submit_answer(&self, submission: AnswerSubmission) -> SubmitOutcome {
        let is_correct = self
            .questions
            .find(&submission.question_id)
            .is_some_and(|q| is_correct(&q, submission.answer_index));

        let answer = QuizAnswer {
            question_id: submission.question_id,
            answer_index: submission.answer_index,
            time_taken: submission.time_taken,
            student_id: submission.student_id,
            session_id: submission.session_id,
            timestamp: self.clock.now(),
        };

        let mut answers = self.answers.lock();
        let mut for_question = answers.get(&answer.question_id).unwrap_or_default();
        let question_id = answer.question_id.clone();
        for_question.push(answer);
        answers.set(question_id, for_question);

        SubmitOutcome {
            success: true,
            is_correct,
        }
    }

    pub fn get_performance(
        &self,
        question_id: &str,
        session_id: &str,
    ) -> Result<QuizPerformance, Error> {
        let session_answers: Vec<QuizAnswer> = self
            .answers
            .lock()
            .get(&question_id.to_string())
            .unwrap_or_default()
            .into_iter()
            .filter(|a| a.session_id == session_id)
            .collect();

        if session_answers.is_empty() {
            return Ok(QuizPerformance::default());
        }

        let question = self
            .questions
            .find(question_id)
            .ok_or_else(|| Error::NotFound(format!("question {question_id} not found")))?;

        let answered = session_answers.len() as u32;
        let correct = session_answers
            .iter()
            .filter(|a| is_correct(&question, a.answer_index))
            .count() as u32;
        let average_time =
            session_answers.iter().map(|a| a.time_taken).sum::<f64>() / answered as f64;

        let top_performers = session_answers
            .iter()
            .skip(session_answers.len().saturating_sub(RECENT_RESPONDERS))
            .map(|a| ResponderSummary {
                student_name: format!(
                    "Student {}",
                    a.student_id.chars().take(8).collect::<String>()
                ),
                is_correct: is_correct(&question, a.answer_index),
                time_taken: a.time_taken,
            })
            .collect();

        let performance_by_cluster = SYNTHETIC_BREAKDOWN
            .iter()
            .map(
                |(name, answered_share, correct_share, percentage)| ClusterPerformance {
                    cluster_name: name.to_string(),
                    answered: (answered as f64 * answered_share).floor() as u32,
                    correct: (correct as f64 * correct_share).floor() as u32,
                    percentage: *percentage,
                },
            )
            .collect();

        Ok(QuizPerformance {
            total_students: REPORTED_CLASS_SIZE,
            answered_students: answered,
            correct_answers: correct,
            average_time,
            correct_percentage: correct as f64 / answered as f64 * 100.0,
            performance_by_cluster,
            top_performers,
        })
    }

    /// Starts a fresh round: drops this session's answers to the question
    pub fn trigger_question(&self, question_id: &str, session_id: &str) -> bool {
        let mut answers = self.answers.lock();
        let key = question_id.to_string();
        let remaining: Vec<QuizAnswer> = answers
            .get(&key)
            .unwrap_or_default()
            .into_iter()
            .filter(|a| a.session_id != session_id)
            .collect();
        answers.set(key, remaining);
        debug!(question = %question_id, session = %session_id, "question triggered");
        true
    }
}

fn is_correct(question: &Question, answer_index: i64) -> bool {
    usize::try_from(answer_index).is_ok_and(|i| i == question.correct_answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn store() -> QuizStore {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        QuizStore::new(Arc::new(QuestionBank::new(clock.clone())), clock)
    }

    fn answer(question: &str, index: i64, student: &str, session: &str) -> AnswerSubmission {
        AnswerSubmission {
            question_id: question.to_string(),
            answer_index: index,
            time_taken: 10.0,
            student_id: student.to_string(),
            session_id: session.to_string(),
        }
    }

    #[test]
    fn grading_uses_the_question_bank() {
        let store = store();

        assert!(store.submit_answer(answer("1", 1, "s", "x")).is_correct);
        assert!(!store.submit_answer(answer("1", 0, "s", "x")).is_correct);
        assert!(!store.submit_answer(answer("1", -1, "s", "x")).is_correct);
        let unknown = store.submit_answer(answer("nope", 1, "s", "x"));
        assert!(unknown.success);
        assert!(!unknown.is_correct);
    }

    #[test]
    fn empty_performance_is_all_zero() {
        let performance = store().get_performance("1", "s1").unwrap();
        assert_eq!(performance, QuizPerformance::default());
    }

    #[test]
    fn performance_aggregates_session_answers() {
        let store = store();
        for i in 0..8 {
            let index = if i < 6 { 1 } else { 2 };
            store.submit_answer(AnswerSubmission {
                time_taken: (i + 1) as f64,
                ..answer("2", index, &format!("student-number-{i}"), "s1")
            });
        }
        // Other sessions are ignored
        store.submit_answer(answer("2", 0, "other", "s2"));

        let p = store.get_performance("2", "s1").unwrap();

        assert_eq!(p.total_students, REPORTED_CLASS_SIZE);
        assert_eq!(p.answered_students, 8);
        assert_eq!(p.correct_answers, 6);
        assert_eq!(p.average_time, 4.5);
        assert_eq!(p.correct_percentage, 75.0);
        assert_eq!(p.top_performers.len(), 8);
        assert_eq!(p.top_performers[0].student_name, "Student student-");

        let answered: Vec<u32> = p.performance_by_cluster.iter().map(|c| c.answered).collect();
        let correct: Vec<u32> = p.performance_by_cluster.iter().map(|c| c.correct).collect();
        assert_eq!(answered, vec![4, 2, 0]);
        assert_eq!(correct, vec![4, 1, 0]);
        assert_eq!(p.performance_by_cluster[0].cluster_name, "Active Participants");
        assert_eq!(p.performance_by_cluster[1].percentage, 62.5);
    }

    #[test]
    fn top_performers_are_the_ten_most_recent() {
        let store = store();
        for i in 0..12 {
            store.submit_answer(answer("1", 1, &format!("s{i:02}"), "s1"));
        }

        let p = store.get_performance("1", "s1").unwrap();

        assert_eq!(p.top_performers.len(), 10);
        assert_eq!(p.top_performers[0].student_name, "Student s02");
        assert_eq!(p.top_performers[9].student_name, "Student s11");
    }

    #[test]
    fn resubmissions_are_not_deduplicated() {
        let store = store();
        store.submit_answer(answer("1", 0, "same", "s1"));
        store.submit_answer(answer("1", 1, "same", "s1"));

        let p = store.get_performance("1", "s1").unwrap();
        assert_eq!(p.answered_students, 2);
        assert_eq!(p.correct_answers, 1);
    }

    #[test]
    fn trigger_resets_only_that_session() {
        let store = store();
        store.submit_answer(answer("1", 1, "a", "s1"));
        store.submit_answer(answer("1", 1, "b", "s2"));

        assert!(store.trigger_question("1", "s1"));

        assert_eq!(store.get_performance("1", "s1").unwrap().answered_students, 0);
        assert_eq!(store.get_performance("1", "s2").unwrap().answered_students, 1);
    }

    #[test]
    fn performance_for_unknown_question_is_not_found() {
        let store = store();
        store.submit_answer(answer("ghost", 0, "a", "s1"));

        let err = store.get_performance("ghost", "s1").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn question_bank_is_seeded_and_validates_new_questions() {
        let bank = QuestionBank::new(Arc::new(SystemClock));
        assert_eq!(bank.list().len(), 3);
        assert_eq!(bank.find("2").unwrap().options[1], "ReLU");

        let err = bank
            .create(NewQuestion {
                question: Some("Pick one".into()),
                options: Some(vec!["a".into(), "b".into()]),
                correct_answer: Some(2),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let created = bank
            .create(NewQuestion {
                id: Some("q-4".into()),
                question: Some("Pick one".into()),
                options: Some(vec!["a".into(), "b".into()]),
                correct_answer: Some(0),
                difficulty: Some(Difficulty::Easy),
                category: None,
            })
            .unwrap();
        assert_eq!(bank.find("q-4"), Some(created));
    }
}
