use super::Prompter;
use crate::error::PromptError;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Capacity-one queue in front of a [`Prompter`]
///
/// The tokio mutex is fair, so waiting prompts are shown in arrival order and
/// never more than one at a time.
pub struct PromptQueue {
    prompter: Arc<dyn Prompter>,
    slot: Mutex<()>,
}

impl PromptQueue {
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self {
            prompter,
            slot: Mutex::new(()),
        }
    }

    pub async fn confirm(&self, question: &str, subject: &str) -> Result<bool, PromptError> {
        let _slot = self.slot.lock().await;
        log::debug!("asking '{}' for {}", question, subject);
        self.prompter.confirm(question, subject).await
    }

    pub async fn input(
        &self,
        question: &str,
        subject: &str,
        default: Option<&str>,
    ) -> Result<String, PromptError> {
        let _slot = self.slot.lock().await;
        log::debug!("asking '{}' for {}", question, subject);
        self.prompter.input(question, subject, default).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Overlap {
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl Prompter for Overlap {
        async fn confirm(&self, _question: &str, _subject: &str) -> Result<bool, PromptError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn input(
            &self,
            _question: &str,
            _subject: &str,
            default: Option<&str>,
        ) -> Result<String, PromptError> {
            Ok(default.unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn test_one_prompt_at_a_time() {
        let prompter = Arc::new(Overlap::default());
        let queue = Arc::new(PromptQueue::new(prompter.clone()));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let queue = queue.clone();
            tasks.spawn(async move { queue.confirm("ok?", &format!("pkg-{}", i)).await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().unwrap());
        }
        assert_eq!(prompter.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_input_passes_default() {
        let queue = PromptQueue::new(Arc::new(Overlap::default()));
        let answer = queue.input("name?", "pkg", Some("pkgName")).await.unwrap();
        assert_eq!(answer, "pkgName");
    }
}
