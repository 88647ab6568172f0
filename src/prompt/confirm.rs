use super::PromptQueue;
use crate::error::PromptError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Yes/no question asked at most once per subject
///
/// Concurrent callers for the same subject share one in-flight prompt and all
/// receive its answer. A failed prompt leaves the subject unanswered so the
/// next caller asks again.
pub struct ConfirmLoader {
    question: String,
    queue: Arc<PromptQueue>,
    answers: Mutex<HashMap<String, Arc<OnceCell<bool>>>>,
}

impl ConfirmLoader {
    pub fn new(question: impl Into<String>, queue: Arc<PromptQueue>) -> Self {
        Self {
            question: question.into(),
            queue,
            answers: Mutex::new(HashMap::new()),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Answer for `subject`, prompting if nobody asked yet
    pub async fn ask(&self, subject: &str) -> Result<bool, PromptError> {
        let cell = self.cell(subject);
        cell.get_or_try_init(|| self.queue.confirm(&self.question, subject))
            .await
            .copied()
    }

    fn cell(&self, subject: &str) -> Arc<OnceCell<bool>> {
        let mut answers = self
            .answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        answers
            .entry(subject.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}
